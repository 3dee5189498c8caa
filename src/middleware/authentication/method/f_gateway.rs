use crate::middleware::authentication::get_header;
use crate::models;
use actix_web::{dev::ServiceRequest, HttpMessage};
use std::sync::Arc;

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";
const DEFAULT_ROLE: &str = "user";

#[tracing::instrument(name = "authenticate with gateway headers", skip(req))]
pub fn try_gateway(req: &mut ServiceRequest) -> Result<bool, String> {
    let user_id = match get_header::<String>(req, USER_ID_HEADER)? {
        Some(id) if !id.is_empty() => id,
        _ => return Ok(false),
    };
    let role = get_header::<String>(req, USER_ROLE_HEADER)?
        .filter(|role| !role.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    let user = models::User { id: user_id, role };
    if req.extensions_mut().insert(Arc::new(user)).is_some() {
        return Err("user already logged".to_string());
    }

    Ok(true)
}
