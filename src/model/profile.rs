use crate::Result;
use anyhow::{bail, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The opaque identifier an identity provider hands out for a signed-in user.
///
/// It is used verbatim in document ids, so it may not be empty or contain whitespace or `/`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UserId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            bail!("A user ID cannot be empty");
        }
        if s.chars().any(|c| c.is_whitespace() || c == '/') {
            bail!("The user ID '{s}' contains whitespace or '/'");
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UserId::from_str(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
    }
}

/// Profile fields supplied by the identity provider or edited by the user.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            display_name: None,
            email: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update of a profile. Only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.display_name {
            ensure!(!name.trim().is_empty(), "The display name cannot be blank");
        }
        if let Some(email) = &self.email {
            ensure!(
                email.contains('@') && !email.starts_with('@') && !email.ends_with('@'),
                "'{email}' is not an email address"
            );
        }
        Ok(())
    }

    pub fn apply(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.display_name {
            profile.display_name = Some(name.clone());
        }
        if let Some(email) = &self.email {
            profile.email = Some(email.clone());
        }
        profile.updated_at = Utc::now();
    }
}
