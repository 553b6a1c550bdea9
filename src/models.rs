use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::numbering::{CategoryCode, Numbered};

#[derive(Debug, Serialize, Deserialize, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PageType {
    Manual,
    Template,
}

impl PageType {
    pub const fn as_str(self) -> &'static str {
        match self {
            PageType::Manual => "MANUAL",
            PageType::Template => "TEMPLATE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Some(PageType::Manual),
            "TEMPLATE" => Some(PageType::Template),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub original_name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub start: i32,
    pub end: i32,
}

impl From<CategoryCode> for CategoryInfo {
    fn from(code: CategoryCode) -> Self {
        let range = code.range();
        Self {
            original_name: code.as_str(),
            category: code.label(),
            description: code.description(),
            start: range.start,
            end: range.end,
        }
    }
}

/// Stored page joined with the source of its backing template, if any.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: Uuid,
    pub page_number: i32,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
    pub source: Option<String>,
    pub is_active: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    pub fn kind(&self) -> Option<PageType> {
        PageType::parse(&self.page_type)
    }
}

impl Numbered for Page {
    fn page_number(&self) -> Option<i32> {
        Some(self.page_number)
    }

    fn template_id(&self) -> Option<Uuid> {
        self.template_id
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: Uuid,
    pub page_number: i32,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
}

impl Numbered for PageSummary {
    fn page_number(&self) -> Option<i32> {
        Some(self.page_number)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub title: String,
    pub description: Option<String>,
    pub additional_data: Value,
    pub source: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub page_number: i32,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub category: String,
    pub content: PageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    #[serde(rename = "type")]
    pub page_type: Option<String>,
    pub page_number: Option<Value>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageRequest {
    pub page_number: Option<Value>,
    pub title: Option<String>,
    #[serde(alias = "categoryName")]
    pub category: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub source: String,
    pub category: String,
    pub config_json: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub name: String,
    pub source: String,
    pub category: String,
    pub config_json: Value,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageStat {
    pub page_number: i32,
    pub views: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Formats a JSON page number the way users typed it, so `"150"` and `150` validate alike.
pub fn page_number_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_type_parsing() {
        assert_eq!(PageType::parse("manual"), Some(PageType::Manual));
        assert_eq!(PageType::parse("TEMPLATE"), Some(PageType::Template));
        assert_eq!(PageType::parse("other"), None);
    }

    #[test]
    fn category_info_serializes_like_public_listing() {
        let info = serde_json::to_value(CategoryInfo::from(CategoryCode::News)).unwrap();
        assert_eq!(info["originalName"], "NEWS");
        assert_eq!(info["category"], "News");
        assert_eq!(info["start"], 101);
        assert_eq!(info["end"], 199);
    }

    #[test]
    fn page_number_text_accepts_numbers_and_strings() {
        assert_eq!(page_number_text(&json!(150)), "150");
        assert_eq!(page_number_text(&json!("150")), "150");
        assert_eq!(page_number_text(&json!(150.5)), "150.5");
    }
}
