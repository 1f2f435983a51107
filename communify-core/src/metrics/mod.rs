//! Metrics for membership operations
//!
//! Counters are recorded through the `metrics` facade; installing an
//! exporter is left to the embedding application.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const JOIN_JOINED: &str = "community.join.joined";
pub const JOIN_ALREADY_MEMBER: &str = "community.join.already_member";
pub const JOIN_INVALID_CODE: &str = "community.join.invalid_code";
pub const JOIN_CONFLICT: &str = "community.join.conflict";
pub const JOIN_FAILED: &str = "community.join.failed";
pub const JOIN_DURATION: &str = "community.join.duration_ms";
pub const DIRECTORY_WRITES: &str = "directory.members.write";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(JOIN_JOINED, "Joins that added the requester to a Community");
    describe_counter!(JOIN_ALREADY_MEMBER, "Joins by users who were already members");
    describe_counter!(JOIN_INVALID_CODE, "Joins with a code matching no Community");
    describe_counter!(JOIN_CONFLICT, "Member writes rejected by a version conflict");
    describe_counter!(JOIN_FAILED, "Joins that ended in an error");
    describe_histogram!(JOIN_DURATION, "Join duration in milliseconds");
    describe_counter!(DIRECTORY_WRITES, "Member list writes applied by a Directory");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
