//! Data models for persistence and in-process callers.

/// Paste records and creation requests.
pub mod paste;
/// Derived per-user and site-wide counters.
pub mod stats;
/// User records, profiles, and profile overrides.
pub mod user;

#[cfg(test)]
mod tests;
