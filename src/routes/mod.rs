//! Routers grouped by who may call them. Paths are relative to `/api`.
//!
//! Grouping is for readability only: access control lives in the `AuthUser` extractor
//! (401) and in each handler's `authorize` call (403).

/// Anonymous callers allowed. Some handlers refine their output for signed-in callers.
pub mod public;

/// Any active account.
pub mod authenticated;

/// Handlers that require a specific permission.
pub mod admin;
