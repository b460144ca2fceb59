use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
    #[default]
    Citizen,
    Electrician,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Citizen => "CITIZEN",
            UserType::Electrician => "ELECTRICIAN",
            UserType::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CITIZEN" => Some(UserType::Citizen),
            "ELECTRICIAN" => Some(UserType::Electrician),
            "ADMIN" => Some(UserType::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(VerificationStatus::Pending),
            "VERIFIED" => Some(VerificationStatus::Verified),
            "REJECTED" => Some(VerificationStatus::Rejected),
            _ => None,
        }
    }
}

/// Marketplace account, maps to `users` joined with `electrician_profiles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub user_type: UserType,
    pub profile_image_url: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub verification_status: Option<VerificationStatus>,
    pub service_category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Zero-value record returned for unknown keys
    pub fn empty(id: EntityId) -> Self {
        Self {
            id,
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            user_type: UserType::default(),
            profile_image_url: None,
            is_verified: false,
            is_active: true,
            verification_status: None,
            service_category: None,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            full_name: if self.full_name.is_empty() {
                UserSummary::UNKNOWN_NAME.to_string()
            } else {
                self.full_name.clone()
            },
            profile_image_url: self.profile_image_url.clone(),
        }
    }

    /// Case-insensitive match on name and email, substring match on phone
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.full_name.to_lowercase().contains(&needle)
            || self.email.to_lowercase().contains(&needle)
            || self.phone.contains(term)
    }
}

/// Partial update shallow-merged into a stored [`User`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub user_type: Option<UserType>,
    pub profile_image_url: Option<String>,
    pub is_verified: Option<bool>,
    pub is_active: Option<bool>,
    pub verification_status: Option<VerificationStatus>,
    pub service_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: EntityId,
    pub full_name: String,
    pub profile_image_url: Option<String>,
}

impl UserSummary {
    pub const UNKNOWN_NAME: &'static str = "Unknown user";
}

/// Electrician awaiting document review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub user_id: EntityId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub service_category: Option<String>,
    pub verification_documents: Option<serde_json::Value>,
}

/// An administrator's decision on an electrician's documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationReview<'a> {
    pub user_id: &'a EntityId,
    pub status: VerificationStatus,
    pub reviewer_id: &'a EntityId,
    pub rejection_reason: Option<&'a str>,
}

impl VerificationReview<'_> {
    pub fn is_approval(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}

/// Admin listing filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// `None` lists every type
    pub user_type: Option<UserType>,
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(user_type) = self.user_type {
            if user.user_type != user_type {
                return false;
            }
        }
        match self.search.as_deref() {
            Some(term) if !term.is_empty() => user.matches_search(term),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: i64,
    pub electricians: i64,
    pub citizens: i64,
    pub pending_verifications: i64,
}
