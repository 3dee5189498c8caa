mod get;
mod limits;

pub use get::*;
pub use limits::*;

use crate::helpers::JsonResponse;
use crate::services::UsageError;

pub(crate) fn usage_error(err: UsageError) -> actix_web::Error {
    match err {
        UsageError::LimitExceeded { .. } => JsonResponse::too_many_requests(err.to_string()),
        UsageError::Repository(msg) => {
            tracing::error!("Usage repository failure: {}", msg);
            JsonResponse::internal_server_error("Usage unavailable")
        }
    }
}
