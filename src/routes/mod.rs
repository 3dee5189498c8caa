pub(crate) mod chat;
pub mod health_checks;
pub(crate) mod stream;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod usage;

pub use health_checks::*;
