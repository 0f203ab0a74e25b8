//! HTTP clients used by synk.
//!
//! - [`CentralClient`] talks to the overlay network controller's management
//!   API (bearer-token authenticated) to list network members.
//! - [`CoordinatorClient`] pushes this host's announcement to the local
//!   sync coordinator.

mod client;
mod coordinator;
mod http;
pub mod api;

pub use client::{CentralClient, CentralClientBuilder};
pub use coordinator::CoordinatorClient;
pub use synk_core::{Result, SynkError};
