mod announce;
mod member;
mod peer;
mod sync;

pub use announce::*;
pub use member::*;
pub use peer::*;
pub use sync::*;
