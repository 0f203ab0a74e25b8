//! Core types and error taxonomy for synk.
//!
//! This crate provides the foundational types shared by the synk workspace:
//!
//! - **Types**: overlay members, registry peers, sync attempt results,
//!   directory fingerprints and the coordinator announcement payload
//! - **Errors**: a single [`SynkError`] enum, classified into the four
//!   recovery kinds of [`ErrorKind`]
//!
//! # Example
//!
//! ```rust,ignore
//! use synk_core::{PeerNode, PeerStatus};
//! use chrono::{Duration, Utc};
//!
//! let node = PeerNode::new("node-b", "/shared");
//! assert_eq!(node.status(Utc::now(), Duration::minutes(10)), PeerStatus::Stale);
//! ```

mod error;
pub mod types;

pub use error::{ErrorKind, Result, SynkError};
pub use types::*;
