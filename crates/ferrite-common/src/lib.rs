//! # ferrite-common
//!
//! Common types and constants for FerriteDB.
//!
//! This crate provides the foundational vocabulary shared by all FerriteDB
//! components:
//!
//! - **Types**: block identities ([`BlockId`]) and log sequence numbers
//!   ([`Lsn`])
//! - **Constants**: system-wide page and pool sizing defaults

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

pub use types::{BlockId, Lsn};
