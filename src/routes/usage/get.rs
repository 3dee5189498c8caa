use crate::helpers::JsonResponse;
use crate::models;
use crate::routes::usage::usage_error;
use crate::services::UsageTracker;
use actix_web::{get, web, Responder, Result};
use std::sync::Arc;

/// GET /api/usage
/// Caller's counters and limits for the current month.
#[tracing::instrument(name = "Get usage.", skip(usage))]
#[get("")]
pub async fn usage_handler(
    user: web::ReqData<Arc<models::User>>,
    usage: web::Data<UsageTracker>,
) -> Result<impl Responder> {
    usage
        .summary(&user.id)
        .await
        .map(|summary| {
            JsonResponse::<models::UsageSummary>::build()
                .set_item(summary)
                .ok("OK")
        })
        .map_err(usage_error)
}
