// Role names and role-based access checks

use std::fmt;

use crate::error::ApiError;

/// Authorization tiers seeded in the roles table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleName {
    Admin,
    Customer,
}

impl RoleName {
    pub const ADMIN: &'static str = "ADMIN";
    pub const CUSTOMER: &'static str = "CUSTOMER";

    /// Role given to every self-registered user
    pub const DEFAULT: RoleName = RoleName::Customer;

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => Self::ADMIN,
            RoleName::Customer => Self::CUSTOMER,
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True iff `role_name` is one of `allowed`. Names compare exactly.
pub fn is_allowed(role_name: &str, allowed: &[RoleName]) -> bool {
    allowed.iter().any(|role| role.as_str() == role_name)
}

/// `is_allowed`, failing with `InsufficientAccess` for the caller's role
pub fn authorize(role_name: &str, allowed: &[RoleName]) -> Result<(), ApiError> {
    if is_allowed(role_name, allowed) {
        Ok(())
    } else {
        Err(ApiError::InsufficientAccess {
            role: role_name.to_string(),
        })
    }
}
