use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::infra_http::*;
use crate::logger::*;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl From<RemoteFailure> for RelationError {
    fn from(e: RemoteFailure) -> Self {
        RelationError::Remote(e.to_string())
    }
}

impl From<RemoteFailure> for ChatError {
    fn from(e: RemoteFailure) -> Self {
        ChatError::Remote(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct EdgeQuery {
    subject_id: UserId,
    object_type: &'static str,
    object_id: uuid::Uuid,
}

impl EdgeQuery {
    fn new(subject: UserId, object: ObjectRef) -> Self {
        let object_type = match object {
            ObjectRef::User(_) => "user",
            ObjectRef::Post(_) => "post",
        };
        Self {
            subject_id: subject,
            object_type,
            object_id: object.uuid(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EdgeBody<'a> {
    subject_id: UserId,
    object: ObjectRef,
    attrs: &'a RelationAttrs,
}

/// Remote store speaking the enveloped JSON API under `base_url`.
#[derive(Clone, Debug)]
pub struct HttpRemoteStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn try_new(base_url: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, RemoteFailure> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        trace!(status, len = body.len(), "remote response");
        decode_envelope(status, &body)
    }

    async fn call_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RemoteFailure> {
        self.call(request).await?.into_data()
    }

    async fn call_unit(&self, request: RequestBuilder) -> Result<(), RemoteFailure> {
        self.call::<serde_json::Value>(request)
            .await?
            .into_result()
            .map(|_| ())
    }
}

// region relation store

#[async_trait::async_trait]
impl RelationStore for HttpRemoteStore {
    async fn check_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<RelationStatus, RelationError> {
        let request = self
            .request(Method::GET, &format!("relations/{kind}/check"))
            .query(&EdgeQuery::new(subject, object));
        Ok(self.call_data(request).await?)
    }

    async fn create_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<RelationEdge, RelationError> {
        let request = self
            .request(Method::POST, &format!("relations/{kind}"))
            .json(&EdgeBody {
                subject_id: subject,
                object,
                attrs,
            });
        let edge = self.call_data(request).await?;
        debug!(%kind, %subject, %object, "relation created");
        Ok(edge)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
    ) -> Result<(), RelationError> {
        let request = self
            .request(Method::DELETE, &format!("relations/{kind}"))
            .query(&EdgeQuery::new(subject, object));
        self.call_unit(request).await?;
        debug!(%kind, %subject, %object, "relation deleted");
        Ok(())
    }

    async fn update_relation_attrs(
        &self,
        kind: RelationKind,
        subject: UserId,
        object: ObjectRef,
        attrs: &RelationAttrs,
    ) -> Result<(), RelationError> {
        let request = self
            .request(Method::PATCH, &format!("relations/{kind}"))
            .json(&EdgeBody {
                subject_id: subject,
                object,
                attrs,
            });
        Ok(self.call_unit(request).await?)
    }
}

// endregion

// region message store

#[async_trait::async_trait]
impl MessageStore for HttpRemoteStore {
    async fn fetch_messages(
        &self,
        conversation_id: ConversationId,
        limit: HistoryLimit,
    ) -> Result<Vec<Message>, ChatError> {
        let request = self
            .request(
                Method::GET,
                &format!("conversations/{conversation_id}/messages"),
            )
            .query(&[("limit", limit.0)]);
        Ok(self.call_data(request).await?)
    }

    async fn fetch_message(&self, message_id: MessageId) -> Result<Message, ChatError> {
        let request = self.request(Method::GET, &format!("messages/{message_id}"));
        match self.call_data(request).await {
            Ok(message) => Ok(message),
            Err(RemoteFailure::Status { status: 404 }) | Err(RemoteFailure::MissingData) => {
                Err(ChatError::MessageNotFound(message_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send_message(&self, draft: &MessageDraft) -> Result<Message, ChatError> {
        let request = self
            .request(
                Method::POST,
                &format!("conversations/{}/messages", draft.conversation_id),
            )
            .json(draft);
        Ok(self.call_data(request).await?)
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
    ) -> Result<(), ChatError> {
        let request = self
            .request(Method::POST, &format!("conversations/{conversation_id}/read"))
            .json(&json!({ "reader_id": reader }));
        Ok(self.call_unit(request).await?)
    }
}

// endregion
