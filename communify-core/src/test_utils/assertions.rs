//! Custom assertions for tests
//!
//! Provides expressive assertion helpers that improve test readability
//! and give better failure messages.

use crate::core_community::{CommunityDirectory, CommunityId, UserId};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that a Result is Err and return the error
pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(e) => e,
    }
}

/// Assert that the stored Community has exactly `expected` as members
pub async fn assert_members(
    directory: &dyn CommunityDirectory,
    id: &CommunityId,
    expected: &[&str],
) {
    let community = match directory.get(id).await {
        Ok(Some(community)) => community,
        Ok(None) => panic!("Community {} not found", id),
        Err(e) => panic!("Failed to load community {}: {:?}", id, e),
    };

    let mut actual: Vec<&UserId> = community.members.iter().collect();
    let mut wanted: Vec<UserId> = expected.iter().map(|u| UserId::from(*u)).collect();
    actual.sort();
    wanted.sort();
    wanted.dedup();

    if actual.len() != wanted.len() || actual.iter().zip(&wanted).any(|(a, b)| *a != b) {
        panic!(
            "Members of {} differ. expected: {:?}, actual: {:?}",
            id, wanted, actual
        );
    }
}
