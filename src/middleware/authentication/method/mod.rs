mod f_anonym;
mod f_gateway;

pub use f_anonym::anonym;
pub use f_gateway::try_gateway;
