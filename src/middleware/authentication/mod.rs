//! Caller identity.
//!
//! The service sits behind a gateway that has already authenticated the
//! caller and forwards `x-user-id` (and optionally `x-user-role`). Requests
//! outside the public paths must carry the id.

mod getheader;
mod manager;
mod manager_middleware;
mod method;

pub use getheader::*;
pub use manager::*;
pub use manager_middleware::*;
