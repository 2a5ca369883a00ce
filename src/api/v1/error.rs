use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message, status) = if let Some(code) = err.find::<ApiErrorCode>() {
        (code.clone(), code.to_string(), StatusCode::OK)
    } else if err.is_not_found() {
        (
            ApiErrorCode::NotFound,
            ApiErrorCode::NotFound.to_string(),
            StatusCode::NOT_FOUND,
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            ApiErrorCode::InvalidInput,
            format!("Invalid request body: {e}"),
            StatusCode::BAD_REQUEST,
        )
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        (
            ApiErrorCode::NotFound,
            ApiErrorCode::NotFound.to_string(),
            StatusCode::METHOD_NOT_ALLOWED,
        )
    } else {
        (
            ApiErrorCode::InternalError,
            format!("Unhandled error: {:?}", err),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code, message));
    Ok(warp::reply::with_status(json, status))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("No such route")]
    NotFound,
    #[error("No mount with this handle")]
    UnknownHandle,
    #[error("Invalid input")]
    InvalidInput,
    #[error("Toggle is inert or has a call in flight")]
    Busy,
    #[error("Operation is not supported for this relation")]
    Unsupported,
    #[error("Remote call failed; state was rolled back")]
    RemoteFailed,
    #[error("Subscription could not be opened")]
    SubscribeFailed,
    #[error("Mount was released before the call finished")]
    Detached,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<RelationError> for ApiErrorCode {
    fn from(error: RelationError) -> Self {
        match error {
            RelationError::Remote(_) => ApiErrorCode::RemoteFailed,
            RelationError::Unsupported(_) => ApiErrorCode::Unsupported,
            RelationError::InvalidAttrs(_) => ApiErrorCode::InvalidInput,
            RelationError::Detached => ApiErrorCode::Detached,
        }
    }
}

impl From<ChatError> for ApiErrorCode {
    fn from(error: ChatError) -> Self {
        match error {
            ChatError::EmptyMessage | ChatError::EmptyImageUri => ApiErrorCode::InvalidInput,
            ChatError::Subscribe(_) => ApiErrorCode::SubscribeFailed,
            ChatError::Remote(_) => ApiErrorCode::RemoteFailed,
            ChatError::MessageNotFound(_) => ApiErrorCode::internal(error),
        }
    }
}
