//! User identity and profiles
//!
//! The signed-in user is never held in ambient state; callers resolve it
//! through an [`IdentityProvider`] and pass it explicitly.

pub mod profile;
pub mod provider;

pub use profile::{ProfileUpdate, UserProfile, UserRole};
pub use provider::{IdentityError, IdentityProvider, IdentityResult, SessionIdentity};
