mod cancel;
mod cleanup;
mod resume;
mod start;
mod status;

pub use cancel::*;
pub use cleanup::*;
pub use resume::*;
pub use start::*;
pub use status::*;

use crate::helpers::JsonResponse;
use crate::services::StreamError;

pub(crate) fn stream_error(err: StreamError) -> actix_web::Error {
    match err {
        StreamError::NotFound => JsonResponse::not_found("Stream not found"),
        StreamError::Forbidden => JsonResponse::forbidden("Not authorized for this stream"),
        err => {
            tracing::error!("Stream store failure: {}", err);
            JsonResponse::internal_server_error("Stream store failure")
        }
    }
}
