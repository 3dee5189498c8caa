use actix_web::error::{ErrorBadRequest, ErrorForbidden, ErrorInternalServerError, ErrorNotFound};
use actix_web::http::StatusCode;
use actix_web::web::Json;
use actix_web::{Error, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct JsonResponse<T> {
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) list: Option<Vec<T>>,
}

#[derive(Serialize, Default)]
pub struct JsonResponseBuilder<T>
where
    T: serde::Serialize + Default,
{
    message: String,
    id: Option<String>,
    item: Option<T>,
    list: Option<Vec<T>>,
}

impl<T> JsonResponseBuilder<T>
where
    T: serde::Serialize + Default,
{
    pub(crate) fn set_msg<I: Into<String>>(mut self, msg: I) -> Self {
        self.message = msg.into();
        self
    }

    pub(crate) fn set_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    pub(crate) fn set_id<I: Into<String>>(mut self, id: I) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn set_list(mut self, list: Vec<T>) -> Self {
        self.list = Some(list);
        self
    }

    fn to_json_response(self) -> JsonResponse<T> {
        JsonResponse {
            message: self.message,
            id: self.id,
            item: self.item,
            list: self.list,
        }
    }

    pub(crate) fn to_string(self) -> String {
        let json_response = self.to_json_response();
        serde_json::to_string(&json_response).unwrap_or_default()
    }

    pub(crate) fn ok<I: Into<String>>(self, msg: I) -> Json<JsonResponse<T>> {
        Json(self.set_msg(msg).to_json_response())
    }

    pub(crate) fn created<I: Into<String>>(self, msg: I) -> HttpResponse {
        HttpResponse::Created().json(self.set_msg(msg).to_json_response())
    }

    pub(crate) fn with_status<I: Into<String>>(self, status: StatusCode, msg: I) -> Error {
        let body = self.set_msg(msg).to_string();
        actix_web::error::InternalError::from_response(
            "",
            HttpResponse::build(status)
                .content_type("application/json")
                .body(body),
        )
        .into()
    }

    pub(crate) fn bad_request<I: Into<String>>(self, msg: I) -> Error {
        ErrorBadRequest(self.set_msg(msg).to_string())
    }

    pub(crate) fn form_error(self, msg: String) -> Error {
        self.with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub(crate) fn forbidden<I: Into<String>>(self, msg: I) -> Error {
        ErrorForbidden(self.set_msg(msg).to_string())
    }

    pub(crate) fn not_found<I: Into<String>>(self, msg: I) -> Error {
        ErrorNotFound(self.set_msg(msg).to_string())
    }

    pub(crate) fn internal_server_error<I: Into<String>>(self, msg: I) -> Error {
        ErrorInternalServerError(self.set_msg(msg).to_string())
    }
}

impl<T> JsonResponse<T>
where
    T: serde::Serialize + Default,
{
    pub fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder::default()
    }
}

impl JsonResponse<String> {
    pub fn bad_request<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().bad_request(msg.into())
    }

    pub fn forbidden<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().forbidden(msg.into())
    }

    pub fn not_found<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().not_found(msg.into())
    }

    pub fn internal_server_error<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().internal_server_error(msg.into())
    }

    pub fn gone<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().with_status(StatusCode::GONE, msg.into())
    }

    pub fn too_many_requests<I: Into<String>>(msg: I) -> Error {
        JsonResponse::<String>::build().with_status(StatusCode::TOO_MANY_REQUESTS, msg.into())
    }
}
