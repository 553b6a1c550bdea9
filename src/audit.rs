//! Admin activity trail in `audit_logs`.
use serde_json::Value;
use sqlx::PgPool;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AuditAction {
    Login,
    Logout,
    PageCreated,
    PageUpdated,
    PageDeleted,
    PageActivated,
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    TemplateActivated,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Login => "admin.login",
            AuditAction::Logout => "admin.logout",
            AuditAction::PageCreated => "page.created",
            AuditAction::PageUpdated => "page.updated",
            AuditAction::PageDeleted => "page.deleted",
            AuditAction::PageActivated => "page.activated",
            AuditAction::TemplateCreated => "template.created",
            AuditAction::TemplateUpdated => "template.updated",
            AuditAction::TemplateDeleted => "template.deleted",
            AuditAction::TemplateActivated => "template.activated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appends one entry. A failed write is logged and otherwise ignored; the
/// action it describes has already happened.
pub async fn record_audit_event(pool: &PgPool, actor: Option<&str>, action: AuditAction, context: Value) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor, action, context)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action.as_str())
    .bind(context)
    .execute(pool)
    .await;

    if let Err(error) = result {
        warn!(%action, ?error, "failed to record audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_are_namespaced_by_subject() {
        assert_eq!(AuditAction::Login.to_string(), "admin.login");
        assert_eq!(AuditAction::PageDeleted.as_str(), "page.deleted");
        assert_eq!(AuditAction::TemplateActivated.as_str(), "template.activated");
    }
}
