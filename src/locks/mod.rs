//! Per-session lock files.
//!
//! A session is driven by one process at a time. Opening a session takes
//! `.sdgflow/locks/<session>.lock`, created with `create_new` so the second
//! process to arrive fails with a `LockError` instead of interleaving turns.
//!
//! The lock file holds JSON metadata (`owner` as `user@host`, `pid`,
//! `created_at`, `action`) so `sdgflow lock list` can say who holds it.
//! A lock older than `lock_stale_minutes` is flagged as stale but still
//! blocks; only `sdgflow lock clear --force` removes someone else's lock.
//!
//! [`LockGuard`] removes the file on drop, provided the file is still its
//! own. A failed removal is logged, never a panic.

mod guard;
mod metadata;
mod operations;

#[cfg(test)]
mod tests;

pub use guard::LockGuard;
pub(crate) use metadata::owner_string;
pub use operations::{acquire_session_lock, clear_lock, list_locks};

#[cfg(test)]
use metadata::LockMetadata;
