use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hex::encode as hex_encode;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::{
    audit::{record_audit_event, AuditAction},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    /// Unique per issued token so a fresh login never reproduces a revoked one.
    pub jti: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin {
    pub username: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for AuthenticatedAdmin {
    type Rejection = (StatusCode, String);

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let jwt_secret = state.jwt_secret.clone();
        let pool = state.pool.clone();
        let token = bearer_token(&parts.headers).map(str::to_string);
        async move {
            let token = token?;
            let claims = decode_token(&jwt_secret, &token)?;
            let token_hash = hash_token(&token);

            let revoked: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1
                    FROM revoked_tokens
                    WHERE token_hash = $1
                )
                "#,
            )
            .bind(&token_hash)
            .fetch_one(&pool)
            .await
            .map_err(internal_error)?;

            if revoked {
                return Err((StatusCode::UNAUTHORIZED, "Token revoked".into()));
            }

            let expires_at = expiry_of(&claims);
            Ok(Self {
                username: claims.sub,
                token_hash,
                expires_at,
            })
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Username and password are required".into()));
    }

    let record = sqlx::query(
        r#"
        SELECT username, password_hash
        FROM admins
        WHERE username = $1
        "#,
    )
    .bind(&username)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".into()))?;

    let password_hash: String = record.try_get("password_hash").map_err(internal_error)?;
    verify_password(&payload.password, &password_hash)?;

    record_audit_event(
        &state.pool,
        Some(&username),
        AuditAction::Login,
        serde_json::json!({ "username": username }),
    )
    .await;

    let token = issue_token(&state.jwt_secret, &username)?;
    Ok(Json(AuthResponse { token, username }))
}

pub async fn logout(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
) -> Result<StatusCode, (StatusCode, String)> {
    sqlx::query(
        r#"
        INSERT INTO revoked_tokens (token_hash, expires_at)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&admin.token_hash)
    .bind(admin.expires_at)
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::Logout,
        serde_json::json!({}),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn verify(admin: AuthenticatedAdmin) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        username: admin.username,
        expires_at: admin.expires_at,
    })
}

/// Creates the configured admin account on first start. An existing account
/// keeps its password.
pub async fn ensure_admin(pool: &PgPool, username: &str, password: &str) -> Result<(), sqlx::Error> {
    let password_hash = hash_password(password).map_err(|(_, message)| sqlx::Error::Protocol(message))?;
    let result = sqlx::query(
        r#"
        INSERT INTO admins (id, username, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(password_hash)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(username, "admin account created");
    }
    Ok(())
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, (StatusCode, String)> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing auth header".into()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid auth header".into()))
}

pub fn issue_token(secret: &str, username: &str) -> Result<String, (StatusCode, String)> {
    let exp = (Utc::now() + Duration::days(7)).timestamp() as usize;
    let claims = Claims {
        sub: username.to_string(),
        exp,
        jti: Uuid::new_v4(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(internal_error)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, (StatusCode, String)> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid token".into()))
}

fn expiry_of(claims: &Claims) -> DateTime<Utc> {
    Utc.timestamp_opt(claims.exp as i64, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex_encode(hasher.finalize())
}

fn hash_password(password: &str) -> Result<String, (StatusCode, String)> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(internal_error)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> Result<(), (StatusCode, String)> {
    let parsed = PasswordHash::new(hash).map_err(internal_error)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid credentials".into()))
}

pub fn internal_error<E: std::fmt::Display>(error: E) -> (StatusCode, String) {
    tracing::error!(%error, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

pub async fn ensure_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn issued_tokens_decode_with_same_secret_only() {
        let token = issue_token("secret", "admin").unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(expiry_of(&claims) > Utc::now() + Duration::days(6));

        let (status, _) = decode_token("other", &token).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let first = issue_token("secret", "admin").unwrap();
        let second = issue_token("secret", "admin").unwrap();
        assert_ne!(first, second);
        assert_ne!(hash_token(&first), hash_token(&second));
        assert_ne!(
            decode_token("secret", &first).unwrap().jti,
            decode_token("secret", &second).unwrap().jti
        );
    }

    #[test]
    fn bearer_header_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap_err().1, "Missing auth header");

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers).unwrap_err().1, "Invalid auth header");

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let hash = hash_token("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc"));
        assert_ne!(hash, hash_token("abd"));
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).is_ok());
        assert_eq!(
            verify_password("wrong", &hash).unwrap_err().0,
            StatusCode::UNAUTHORIZED
        );
    }
}
