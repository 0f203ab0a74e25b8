//! API endpoint modules.

mod members;

pub use members::MembersApi;
