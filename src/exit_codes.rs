//! Exit code constants for the sdgflow CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, bad config, unrecognized directive)
//! - 2: Validation failure (schema, range, approval timeout)
//! - 3: Agent failure (collaborator error or timeout)
//! - 4: Lock acquisition failure (session busy)
//! - 5: Persistence failure (session state unreadable or unwritable)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or invalid command.
pub const USER_ERROR: i32 = 1;

/// Validation failure: artifact schema, parameter range, or approval cap.
pub const VALIDATION_FAILURE: i32 = 2;

/// Agent failure: the collaborator errored, timed out, or returned garbage.
pub const AGENT_FAILURE: i32 = 3;

/// Lock acquisition failure: another process holds the session.
pub const LOCK_FAILURE: i32 = 4;

/// Persistence failure: session state could not be read or written.
pub const PERSISTENCE_FAILURE: i32 = 5;
