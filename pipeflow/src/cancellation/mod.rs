//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is a one-way, run-scoped flag. Each pipeline run
//! derives its own token from a caller-owned parent so that shutting down the
//! caller stops future work in every run, while one failing run never affects
//! its siblings.

mod token;

pub use token::CancellationToken;
