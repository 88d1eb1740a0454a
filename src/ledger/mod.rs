//! Append-mostly tables with fixed ordering and uniqueness rules.
//!
//! Writes take the pool and open their own immediate transaction. Reads take
//! a `Connection` so callers can run several of them on one snapshot.

pub mod comments;
pub mod posts;
pub mod reactions;
