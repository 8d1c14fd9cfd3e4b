//! Core data types: principals, roles, profiles and navigation targets.

mod phone;
mod profile;

pub use phone::{CountryCode, PhoneNumber};
pub use profile::{UserProfile, USERS_COLLECTION};

use serde::{Deserialize, Serialize};

/// Authenticated identity issued by the identity provider.
///
/// Read-only to this crate; its lifetime is the provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Account role chosen at sign-up. Closed set; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Farmer,
    Buyer,
    #[serde(rename = "MSME")]
    Msme,
    Logistics,
    FieldAgent,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Farmer,
        Role::Buyer,
        Role::Msme,
        Role::Logistics,
        Role::FieldAgent,
    ];

    /// Parse a stored role string. Unrecognized values yield `None` so that
    /// routing can fall back instead of failing.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "Farmer" => Some(Role::Farmer),
            "Buyer" => Some(Role::Buyer),
            "MSME" => Some(Role::Msme),
            "Logistics" => Some(Role::Logistics),
            "FieldAgent" => Some(Role::FieldAgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Farmer => "Farmer",
            Role::Buyer => "Buyer",
            Role::Msme => "MSME",
            Role::Logistics => "Logistics",
            Role::FieldAgent => "FieldAgent",
        }
    }
}

/// How the account was originally created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupMethod {
    Email,
    Phone,
}

impl SignupMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignupMethod::Email => "email",
            SignupMethod::Phone => "phone",
        }
    }
}

/// Navigation targets the core can request. The actual URL scheme belongs to
/// the routing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Home,
    Login,
    Signup,
    FarmerDashboard,
    BuyerDashboard,
}

impl Destination {
    pub fn as_path(&self) -> &'static str {
        match self {
            Destination::Home => "/",
            Destination::Login => "/login",
            Destination::Signup => "/signup",
            Destination::FarmerDashboard => "/farmer",
            Destination::BuyerDashboard => "/buyer",
        }
    }

    /// Role-based redirect target. Anything outside the two dashboard roles,
    /// including an absent or unrecognized role, lands on the home page.
    pub fn for_role(role: Option<Role>) -> Destination {
        match role {
            Some(Role::Farmer) => Destination::FarmerDashboard,
            Some(Role::Buyer) => Destination::BuyerDashboard,
            _ => Destination::Home,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_unknown_role_parses_to_none() {
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("farmer"), None, "role strings are case-sensitive");
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_value(Role::Msme).unwrap(), "MSME");
        assert_eq!(serde_json::to_value(Role::FieldAgent).unwrap(), "FieldAgent");
        assert_eq!(
            serde_json::to_value(SignupMethod::Phone).unwrap(),
            "phone"
        );
    }

    #[test]
    fn test_role_based_redirect() {
        assert_eq!(
            Destination::for_role(Some(Role::Farmer)),
            Destination::FarmerDashboard
        );
        assert_eq!(
            Destination::for_role(Some(Role::Buyer)),
            Destination::BuyerDashboard
        );
        assert_eq!(Destination::for_role(Some(Role::Logistics)), Destination::Home);
        assert_eq!(Destination::for_role(Some(Role::Msme)), Destination::Home);
        assert_eq!(Destination::for_role(None), Destination::Home);
    }

    #[test]
    fn test_destination_paths() {
        assert_eq!(Destination::Home.as_path(), "/");
        assert_eq!(Destination::Login.as_path(), "/login");
        assert_eq!(Destination::Signup.as_path(), "/signup");
        assert_eq!(Destination::FarmerDashboard.as_path(), "/farmer");
        assert_eq!(Destination::BuyerDashboard.as_path(), "/buyer");
    }
}
