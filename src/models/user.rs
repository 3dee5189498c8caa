use serde::Deserialize;

pub const ADMIN_ROLE: &str = "admin";

/// Caller identity as forwarded by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
