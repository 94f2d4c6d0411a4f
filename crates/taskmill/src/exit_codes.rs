//! Exit codes for the CLI

/// Success
pub const SUCCESS: i32 = 0;

/// Task or action failure
pub const ERROR: i32 = 1;

/// Configuration error (bad config, bad manifest, cyclic or dangling dependencies)
pub const CONFIG_ERROR: i32 = 2;

/// Requested task is not registered
pub const UNKNOWN_TASK: i32 = 3;
