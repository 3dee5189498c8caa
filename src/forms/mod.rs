mod chat;
mod stream;
mod sync;
mod usage;

pub use chat::*;
pub use stream::*;
pub use sync::*;
pub use usage::*;
