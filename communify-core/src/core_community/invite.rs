//! Invitation codes for closed Communities

use serde::{Deserialize, Serialize};
use std::fmt;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;

/// A non-empty, trimmed invitation code.
///
/// Matching against stored codes is exact and case-sensitive; the only
/// normalization ever applied is the surrounding-whitespace trim done by
/// [`InvitationCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvitationCode(String);

impl InvitationCode {
    /// Parse user input into a code. Returns `None` for empty or
    /// whitespace-only input, in which case no join should be attempted.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(InvitationCode(trimmed.to_string()))
        }
    }

    /// Generate a random invite code
    pub fn generate() -> Self {
        use rand::Rng;

        let mut rng = rand::rng();
        let code = (0..CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();
        InvitationCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvitationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for InvitationCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        InvitationCode::parse(&value).ok_or_else(|| "invitation code is empty".to_string())
    }
}

impl From<InvitationCode> for String {
    fn from(code: InvitationCode) -> Self {
        code.0
    }
}
