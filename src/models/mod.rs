mod chat;
mod message;
mod stream;
mod usage;
mod user;

pub use chat::*;
pub use message::*;
pub use stream::*;
pub use usage::*;
pub use user::*;
