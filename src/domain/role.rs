//! Closed set of platform roles and what each may do.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Company,
    Regulator,
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    IssueCertificate,
    ViewCertificates,
    ManageCertificates,
    AdministerLedger,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Regulator => "regulator",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Accepts the snake_case name as well as the hyphenated form used by older clients.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "company" => Some(Role::Company),
            "regulator" => Some(Role::Regulator),
            "super_admin" | "super-admin" | "superadmin" => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::SuperAdmin, _) => true,
            (Role::Company, Capability::AdministerLedger) => false,
            (Role::Company, _) => true,
            (Role::Regulator, Capability::ViewCertificates) => true,
            (Role::Regulator, _) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_matrix() {
        assert!(Role::Company.can(Capability::IssueCertificate));
        assert!(Role::Company.can(Capability::ManageCertificates));
        assert!(!Role::Company.can(Capability::AdministerLedger));

        assert!(Role::Regulator.can(Capability::ViewCertificates));
        assert!(!Role::Regulator.can(Capability::IssueCertificate));
        assert!(!Role::Regulator.can(Capability::ManageCertificates));

        assert!(Role::SuperAdmin.can(Capability::AdministerLedger));
        assert!(Role::SuperAdmin.can(Capability::IssueCertificate));
    }

    #[test]
    fn parse_accepts_legacy_spelling() {
        assert_eq!(Role::parse("super-admin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse(" Company "), Some(Role::Company));
        assert_eq!(Role::parse("auditor"), None);
    }
}
