//! Role domain model.
//!
//! Roles form a closed set. Each role maps to exactly one default
//! landing area, which the route guard uses as the redirect target for
//! unauthorized navigation.

use serde::{Deserialize, Serialize};

/// The closed set of roles known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Platform operator, not scoped to any company.
    Superadmin,
    /// Company owner.
    Directeur,
    /// Store manager.
    Gerant,
    /// Sales clerk.
    Vendeur,
    /// Warehouse clerk.
    Magasinier,
}

impl Role {
    /// Stable uppercase name used as the `role_name` token claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "SUPERADMIN",
            Role::Directeur => "DIRECTEUR",
            Role::Gerant => "GERANT",
            Role::Vendeur => "VENDEUR",
            Role::Magasinier => "MAGASINIER",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SUPERADMIN" => Ok(Role::Superadmin),
            "DIRECTEUR" => Ok(Role::Directeur),
            "GERANT" => Ok(Role::Gerant),
            "VENDEUR" => Ok(Role::Vendeur),
            "MAGASINIER" => Ok(Role::Magasinier),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_name_roundtrip() {
        for role in [
            Role::Superadmin,
            Role::Directeur,
            Role::Gerant,
            Role::Vendeur,
            Role::Magasinier,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("ADMIN".parse::<Role>().is_err());
    }
}
