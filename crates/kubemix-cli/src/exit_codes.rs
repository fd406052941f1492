//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions. Usage errors are reported by clap
//! itself with code 2.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// Plan error - unreadable plan, bad step or bad --set value
pub const PLAN_ERROR: i32 = 3;

/// Assembly error - a helper rejected its input
pub const ASSEMBLY_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
