use crate::forms;
use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::usage::usage_error;
use crate::services::UsageTracker;
use actix_web::{put, web, Responder, Result};
use serde_valid::Validate;
use std::sync::Arc;

/// PUT /admin/usage/{user_id}/limits
#[tracing::instrument(name = "Admin set usage limits.", skip(usage))]
#[put("/{user_id}/limits")]
pub async fn admin_limits_handler(
    user: web::ReqData<Arc<models::User>>,
    path: web::Path<String>,
    form: web::Json<forms::LimitsForm>,
    usage: web::Data<UsageTracker>,
) -> Result<impl Responder> {
    if !user.is_admin() {
        return Err(JsonResponse::forbidden("Admin role required"));
    }
    if let Err(errors) = form.validate() {
        return Err(JsonResponse::<models::UsageLimits>::build().form_error(errors.to_string()));
    }

    let user_id = path.into_inner();
    usage
        .set_limits(&user_id, form.into_inner().into())
        .await
        .map(|limits| {
            JsonResponse::<models::UsageLimits>::build()
                .set_id(user_id)
                .set_item(limits)
                .ok("Limits updated")
        })
        .map_err(usage_error)
}
