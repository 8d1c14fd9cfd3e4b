use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Role, SignupMethod};
use crate::error::StoreError;
use crate::kernel::BaseDocumentStore;

/// Collection holding one role record per authenticated account.
pub const USERS_COLLECTION: &str = "users";

/// Application-level role record, keyed by the principal's uid.
///
/// Created exactly once at first successful sign-up and never mutated
/// afterwards; routing reads it to pick the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(rename = "signupMethod")]
    pub signup_method: SignupMethod,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Document-store access - all profile reads/writes go through here
// =============================================================================

impl UserProfile {
    /// Find the profile for a uid. A stored document that does not parse as a
    /// profile (unknown role, missing fields) reads as `None`, so callers
    /// fall back to the default destination instead of failing.
    pub async fn find(
        uid: &str,
        store: &dyn BaseDocumentStore,
    ) -> Result<Option<UserProfile>, StoreError> {
        let Some(document) = store.get_document(USERS_COLLECTION, uid).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_value(document).ok())
    }

    /// Check whether any document exists for this uid, readable or not.
    /// The first-time profile write is gated on this, never on `find`, so a
    /// pre-existing record is never overwritten.
    pub async fn exists(uid: &str, store: &dyn BaseDocumentStore) -> Result<bool, StoreError> {
        Ok(store.get_document(USERS_COLLECTION, uid).await?.is_some())
    }

    /// Write the profile document (create-or-overwrite; used only for the
    /// first-time write after the existence check).
    pub async fn create(&self, store: &dyn BaseDocumentStore) -> Result<(), StoreError> {
        let document =
            serde_json::to_value(self).map_err(|e| StoreError::Malformed(e.to_string()))?;
        store.set_document(USERS_COLLECTION, &self.uid, document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> UserProfile {
        UserProfile {
            uid: "u-1".to_string(),
            name: Some("Asha".to_string()),
            email: Some("asha@example.com".to_string()),
            phone: None,
            role: Role::Farmer,
            signup_method: SignupMethod::Email,
            created_at: "2025-03-01T10:00:00Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_document_field_names() {
        let doc = serde_json::to_value(sample()).unwrap();
        assert_eq!(doc["uid"], "u-1");
        assert_eq!(doc["role"], "Farmer");
        assert_eq!(doc["signupMethod"], "email");
        assert_eq!(doc["createdAt"], "2025-03-01T10:00:00Z");
        assert!(doc.get("phone").is_none(), "absent fields are omitted");
    }

    #[test]
    fn test_document_round_trip() {
        let profile = sample();
        let doc = serde_json::to_value(&profile).unwrap();
        let parsed: UserProfile = serde_json::from_value(doc).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_unknown_role_fails_to_parse() {
        let doc = json!({
            "uid": "u-2",
            "role": "Admin",
            "signupMethod": "email",
            "createdAt": "2025-03-01T10:00:00Z",
        });
        assert!(serde_json::from_value::<UserProfile>(doc).is_err());
    }
}
