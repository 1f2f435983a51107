//! User profiles and profile edits

use crate::core_community::types::UserId;
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
}

/// Profile of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identity (email)
    pub id: UserId,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub notes: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl UserProfile {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            phone_number: None,
            allergies: Vec::new(),
            notes: None,
            avatar_url: None,
            role: UserRole::Member,
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Onboarding is complete once a phone number is on file
    pub fn needs_onboarding(&self) -> bool {
        self.phone_number.as_deref().map_or(true, |p| p.trim().is_empty())
    }

    /// Single character shown in place of a missing avatar
    pub fn display_initial(&self) -> Option<char> {
        self.full_name
            .as_deref()
            .and_then(|name| name.chars().next())
            .or_else(|| {
                self.id
                    .as_str()
                    .chars()
                    .next()
                    .map(|c| c.to_ascii_uppercase())
            })
    }

    /// First word of the full name, for greetings
    pub fn first_name(&self) -> Option<&str> {
        self.full_name.as_deref().and_then(|n| n.split_whitespace().next())
    }
}

/// Editable profile fields. Built from the current profile and applied as a
/// whole; `None` clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub allergies: Vec<String>,
    pub notes: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    /// Start an edit from the current profile
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            phone_number: profile.phone_number.clone(),
            allergies: profile.allergies.clone(),
            notes: profile.notes.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }

    /// Add an allergy. Blank and already-listed entries are ignored.
    pub fn add_allergy(&mut self, raw: &str) -> bool {
        let allergy = raw.trim();
        if allergy.is_empty() || self.allergies.iter().any(|a| a == allergy) {
            return false;
        }
        self.allergies.push(allergy.to_string());
        true
    }

    pub fn remove_allergy(&mut self, allergy: &str) -> bool {
        let before = self.allergies.len();
        self.allergies.retain(|a| a != allergy);
        self.allergies.len() != before
    }

    /// Clear everything collected during onboarding
    pub fn reset_onboarding(&mut self) {
        self.phone_number = None;
        self.allergies.clear();
        self.notes = None;
    }

    /// Write the edited fields onto a profile
    pub fn apply_to(&self, profile: &mut UserProfile) {
        profile.phone_number = self.phone_number.clone();
        profile.allergies = self.allergies.clone();
        profile.notes = self.notes.clone();
        profile.avatar_url = self.avatar_url.clone();
    }
}
