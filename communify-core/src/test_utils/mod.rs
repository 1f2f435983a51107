//! Test utilities and helpers for Communify
//!
//! Fixtures, assertions and Directory wrappers that inject failures or
//! concurrent writers. Shared by unit tests and the integration tests.

pub mod assertions;
pub mod faulty_directory;
pub mod fixtures;

pub use assertions::*;
pub use faulty_directory::*;
pub use fixtures::*;
