//! Authentication and authorization
//!
//! Bearer JWTs carry roles. Roles are resolved into capabilities here, at
//! the boundary; the arrears core only ever sees the resulting
//! [`RequestContext`].

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{Principal, RequestContext};

use crate::error::ApiError;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    /// Builds the request context the core operates under
    pub fn to_context(&self, correlation_id: Option<String>) -> RequestContext {
        let principal = Principal::user(self.sub.clone(), capabilities_for(&self.roles));
        let ctx = RequestContext::new(principal);
        match correlation_id {
            Some(id) => ctx.with_correlation_id(id),
            None => ctx,
        }
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: &str,
    roles: Vec<String>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expiration_secs as i64);

    let claims = Claims {
        sub: user_id.to_string(),
        roles,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Capability definitions
pub mod permissions {
    pub const LEASE_WRITE: &str = "lease:write";
    pub const BILLING_WRITE: &str = "billing:write";
    pub const PAYMENT_WRITE: &str = "payment:write";
    pub const ARREARS_READ: &str = "arrears:read";
    pub const ACCRUAL_RUN: &str = "accrual:run";

    pub const ALL: [&str; 5] = [LEASE_WRITE, BILLING_WRITE, PAYMENT_WRITE, ARREARS_READ, ACCRUAL_RUN];
}

/// Resolves roles into capabilities
///
/// `admin` grants everything. Unknown roles grant nothing; a role spelled
/// like a capability (`payment:write`) grants exactly that capability.
pub fn capabilities_for(roles: &[String]) -> Vec<String> {
    use permissions::*;

    let mut capabilities: Vec<String> = Vec::new();
    for role in roles {
        let granted: Vec<&str> = match role.as_str() {
            "admin" => ALL.to_vec(),
            "market_officer" => vec![LEASE_WRITE, BILLING_WRITE, ARREARS_READ],
            "collector" => vec![PAYMENT_WRITE, ARREARS_READ],
            "tenant" => vec![ARREARS_READ],
            other if ALL.contains(&other) => vec![other],
            _ => Vec::new(),
        };
        for capability in granted {
            if !capabilities.iter().any(|c| c == capability) {
                capabilities.push(capability.to_string());
            }
        }
    }
    capabilities
}

/// Fails with `403` unless the caller holds `capability`
pub fn require(ctx: &RequestContext, capability: &str) -> Result<(), ApiError> {
    if ctx.has_capability(capability) {
        Ok(())
    } else {
        Err(AuthError::MissingPermission(capability.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_round_trip() {
        let token = create_token("officer-1", vec!["collector".to_string()], SECRET, 60).unwrap();
        let claims = validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "officer-1");
        assert_eq!(claims.roles, vec!["collector".to_string()]);
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token("officer-1", vec![], SECRET, 60).unwrap();
        assert!(matches!(validate_token(&token, "other"), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_admin_grants_every_capability() {
        let caps = capabilities_for(&["admin".to_string()]);
        assert_eq!(caps.len(), permissions::ALL.len());
    }

    #[test]
    fn test_roles_merge_without_duplicates() {
        let caps = capabilities_for(&["collector".to_string(), "tenant".to_string()]);
        assert_eq!(caps, vec![permissions::PAYMENT_WRITE.to_string(), permissions::ARREARS_READ.to_string()]);
    }

    #[test]
    fn test_capability_named_role_and_unknown_role() {
        let caps = capabilities_for(&["accrual:run".to_string(), "janitor".to_string()]);
        assert_eq!(caps, vec![permissions::ACCRUAL_RUN.to_string()]);
    }

    #[test]
    fn test_require_checks_context() {
        let claims = Claims {
            sub: "tenant-9".to_string(),
            roles: vec!["tenant".to_string()],
            exp: 0,
            iat: 0,
        };
        let ctx = claims.to_context(Some("req-1".to_string()));
        assert_eq!(ctx.correlation_id.as_deref(), Some("req-1"));
        assert!(require(&ctx, permissions::ARREARS_READ).is_ok());
        assert!(require(&ctx, permissions::PAYMENT_WRITE).is_err());
    }
}
