use super::error::*;
use crate::application_impl::PendingMutation;
use crate::application_port::*;
use crate::client::*;
use crate::domain_model::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn reply<T: Serialize>(data: T) -> warp::reply::Json {
    warp::reply::json(&ApiResponse::ok(data))
}

#[derive(Debug, Serialize)]
pub struct Mounted<V> {
    pub handle: String,
    pub view: V,
}

/// `wait=true` holds the response until the remote call has settled.
#[derive(Debug, Default, Deserialize)]
pub struct SettleQuery {
    #[serde(default)]
    pub wait: bool,
}

fn toggle_of(client: &Client, handle: &str) -> Result<Arc<dyn MountedToggle>, warp::Rejection> {
    client
        .toggle(handle)
        .ok_or_else(|| reject::custom(ApiErrorCode::UnknownHandle))
}

fn stream_of(
    client: &Client,
    handle: &str,
) -> Result<Arc<crate::application_impl::MessageStream>, warp::Rejection> {
    client
        .stream(handle)
        .ok_or_else(|| reject::custom(ApiErrorCode::UnknownHandle))
}

async fn settle(
    toggle: &dyn MountedToggle,
    pending: Option<PendingMutation>,
    query: SettleQuery,
) -> Result<ToggleView, warp::Rejection> {
    let Some(pending) = pending else {
        return Err(reject::custom(ApiErrorCode::Busy));
    };
    if !query.wait {
        return Ok(toggle.view());
    }
    pending
        .settled()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)
}

// region toggles

pub async fn mount_toggle(
    body: ToggleMount,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (handle, view) = client.mount_toggle(&body);
    Ok(reply(Mounted { handle, view }))
}

pub async fn toggle_view(
    handle: String,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let toggle = toggle_of(&client, &handle)?;
    Ok(reply(toggle.view()))
}

pub async fn toggle(
    handle: String,
    query: SettleQuery,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let toggle = toggle_of(&client, &handle)?;
    let pending = toggle.toggle();
    let view = settle(toggle.as_ref(), pending, query).await?;
    Ok(reply(view))
}

#[derive(Debug, Deserialize)]
pub struct SyncCountRequest {
    pub count: u64,
}

pub async fn sync_count(
    handle: String,
    body: SyncCountRequest,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let toggle = toggle_of(&client, &handle)?;
    toggle.sync_count(body.count);
    Ok(reply(toggle.view()))
}

pub async fn edit_attrs(
    handle: String,
    query: SettleQuery,
    body: RelationAttrs,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let toggle = toggle_of(&client, &handle)?;
    let pending = toggle
        .edit(body)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    let view = settle(toggle.as_ref(), pending, query).await?;
    Ok(reply(view))
}

pub async fn unmount_toggle(
    handle: String,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !client.unmount_toggle(&handle) {
        return Err(reject::custom(ApiErrorCode::UnknownHandle));
    }
    Ok(reply(()))
}

// endregion

// region streams

pub async fn open_stream(
    body: StreamMount,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (handle, view) = client
        .open_stream(body)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(reply(Mounted { handle, view }))
}

pub async fn stream_view(
    handle: String,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    Ok(reply(stream.view()))
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendImageRequest {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct SharePostRequest {
    pub post_id: PostId,
}

#[derive(Debug, Deserialize)]
pub struct ShareEventRequest {
    pub event_id: EventId,
}

fn sent(result: Result<Message, ChatError>) -> Result<warp::reply::Json, warp::Rejection> {
    result
        .map(reply)
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)
}

pub async fn send_text(
    handle: String,
    body: SendTextRequest,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    sent(stream.send_text(&body.text).await)
}

pub async fn send_image(
    handle: String,
    body: SendImageRequest,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    sent(stream.send_image(&body.uri).await)
}

pub async fn send_post_share(
    handle: String,
    body: SharePostRequest,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    sent(stream.send_post_share(body.post_id).await)
}

pub async fn send_event_share(
    handle: String,
    body: ShareEventRequest,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    sent(stream.send_event_share(body.event_id).await)
}

pub async fn refresh_stream(
    handle: String,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let stream = stream_of(&client, &handle)?;
    stream
        .refresh()
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;
    Ok(reply(stream.view()))
}

pub async fn close_stream(
    handle: String,
    client: Arc<Client>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if !client.close_stream(&handle).await {
        return Err(reject::custom(ApiErrorCode::UnknownHandle));
    }
    Ok(reply(()))
}

// endregion

#[derive(Debug, Serialize)]
pub struct Notification {
    pub source: &'static str,
    pub message: String,
}

impl From<&EngineError> for Notification {
    fn from(error: &EngineError) -> Self {
        let source = match error {
            EngineError::Relation { .. } => "relation",
            EngineError::Chat { .. } => "chat",
        };
        Self {
            source,
            message: error.to_string(),
        }
    }
}

pub async fn drain_notifications(client: Arc<Client>) -> Result<impl warp::Reply, warp::Rejection> {
    let notifications: Vec<Notification> = client
        .drain_notifications()
        .iter()
        .map(Notification::from)
        .collect();
    Ok(reply(notifications))
}
