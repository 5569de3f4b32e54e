//! # ferrite-storage
//!
//! Storage engine core for FerriteDB.
//!
//! This crate provides the page-level storage services the rest of the
//! database is built on:
//!
//! - **Buffer management**: a fixed-size pool of in-memory frames that
//!   caches disk blocks, with a concurrent pin/unpin protocol and
//!   second-chance replacement ([`buffer`])
//! - **Block file I/O**: synchronous, block-addressed access to the files
//!   of a database directory ([`file`])
//! - **WAL coupling**: the narrow interface the buffer pool uses to honor
//!   the write-ahead discipline ([`log`])

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool: frames, replacement, pin protocol
pub mod buffer;

/// Block-addressed file I/O
pub mod file;

/// Write-ahead-log collaborator interface
pub mod log;
