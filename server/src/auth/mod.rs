//! 认证模块
//!
//! The identity provider is external; this module only validates its
//! JWTs and exposes the caller's identity and role to handlers.
//!
//! - [`JwtService`] - token validation (HS256, shared secret)
//! - [`CurrentUser`] - extractor for protected handlers
//! - [`Role`] - coarse role ladder used for authorization checks

mod extractor;
mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

use serde::{Deserialize, Serialize};
use shared::AppError;

/// Caller role, ordered by privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    Operator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Driver => "driver",
            Self::Operator => "operator",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "driver" => Ok(Self::Driver),
            "operator" => Ok(Self::Operator),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller identity
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Require at least the given role
    pub fn require_role(&self, required: Role) -> Result<(), AppError> {
        if self.role >= required {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "{} role required",
                required.as_str()
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = claims.role.parse()?;
        Ok(Self {
            id: claims.sub,
            name: claims.name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ladder() {
        let operator = CurrentUser {
            id: "e1".into(),
            name: "Op".into(),
            role: Role::Operator,
        };
        assert!(operator.require_role(Role::Operator).is_ok());
        assert!(operator.require_role(Role::Driver).is_ok());
        assert!(operator.require_role(Role::Admin).is_err());
    }

    #[test]
    fn claims_with_unknown_role_rejected() {
        let claims = Claims {
            sub: "u1".into(),
            name: "X".into(),
            role: "superuser".into(),
            exp: 0,
            iat: 0,
        };
        assert!(CurrentUser::try_from(claims).is_err());
    }
}
