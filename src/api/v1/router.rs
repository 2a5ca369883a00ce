use super::handler;
use super::handler::SettleQuery;
use crate::client::Client;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;

pub fn routes(
    client: Arc<Client>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    toggle_routes(client.clone())
        .or(stream_routes(client.clone()))
        .or(notifications(client))
}

fn toggle_routes(
    client: Arc<Client>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let mount = warp::path!("toggles")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::mount_toggle);

    let view = warp::path!("toggles" / String)
        .and(warp::get())
        .and(with(client.clone()))
        .and_then(handler::toggle_view);

    let toggle = warp::path!("toggles" / String / "toggle")
        .and(warp::post())
        .and(warp::query::<SettleQuery>())
        .and(with(client.clone()))
        .and_then(handler::toggle);

    let count = warp::path!("toggles" / String / "count")
        .and(warp::put())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::sync_count);

    let attrs = warp::path!("toggles" / String / "attrs")
        .and(warp::put())
        .and(warp::query::<SettleQuery>())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::edit_attrs);

    let unmount = warp::path!("toggles" / String)
        .and(warp::delete())
        .and(with(client))
        .and_then(handler::unmount_toggle);

    mount.or(view).or(toggle).or(count).or(attrs).or(unmount)
}

fn stream_routes(
    client: Arc<Client>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let open = warp::path!("streams")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::open_stream);

    let view = warp::path!("streams" / String)
        .and(warp::get())
        .and(with(client.clone()))
        .and_then(handler::stream_view);

    let text = warp::path!("streams" / String / "text")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::send_text);

    let image = warp::path!("streams" / String / "image")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::send_image);

    let post_share = warp::path!("streams" / String / "post")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::send_post_share);

    let event_share = warp::path!("streams" / String / "event")
        .and(warp::post())
        .and(warp::body::json())
        .and(with(client.clone()))
        .and_then(handler::send_event_share);

    let refresh = warp::path!("streams" / String / "refresh")
        .and(warp::post())
        .and(with(client.clone()))
        .and_then(handler::refresh_stream);

    let close = warp::path!("streams" / String)
        .and(warp::delete())
        .and(with(client))
        .and_then(handler::close_stream);

    open.or(view)
        .or(text)
        .or(image)
        .or(post_share)
        .or(event_share)
        .or(refresh)
        .or(close)
}

fn notifications(
    client: Arc<Client>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path!("notifications")
        .and(warp::get())
        .and(with(client))
        .and_then(handler::drain_notifications)
}

fn with<T>(value: Arc<T>) -> impl Filter<Extract = (Arc<T>,), Error = Infallible> + Clone
where
    T: Send + Sync + ?Sized,
{
    warp::any().map(move || value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1::recover_error;
    use crate::application_impl::MessageStreamConfig;
    use crate::infra_memory::*;
    use crate::test_support::*;
    use serde_json::{Value, json};
    use std::time::Duration;
    use warp::http::StatusCode;

    struct Sidecar {
        client: Arc<Client>,
        store: Arc<InMemoryRemoteStore>,
    }

    impl Sidecar {
        fn new() -> Self {
            let hub = InMemoryPushHub::new();
            let store = Arc::new(InMemoryRemoteStore::new(hub.clone()));
            let client = Arc::new(Client::from_parts(
                store.clone(),
                store.clone(),
                Arc::new(hub),
                MessageStreamConfig::default(),
            ));
            Self { client, store }
        }

        async fn call(&self, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
            let filter = routes(self.client.clone()).recover(recover_error);
            let mut request = warp::test::request().method(method).path(path);
            if let Some(body) = body {
                request = request.json(&body);
            }
            let response = request.reply(&filter).await;
            let status = response.status();
            let json = serde_json::from_slice(response.body()).unwrap();
            (status, json)
        }
    }

    #[tokio::test]
    async fn like_toggle_round_trip() {
        let sidecar = Sidecar::new();
        let (_, mounted) = sidecar
            .call(
                "POST",
                "/toggles",
                Some(json!({
                    "kind": "like",
                    "subject_id": user(1),
                    "object_id": post(1).0,
                    "initial_count": 10,
                })),
            )
            .await;
        assert_eq!(mounted["success"], true);
        let handle = mounted["data"]["handle"].as_str().unwrap().to_owned();
        sidecar.client.toggle(&handle).unwrap().settled().await;

        let (_, toggled) = sidecar
            .call("POST", &format!("/toggles/{handle}/toggle?wait=true"), None)
            .await;
        assert_eq!(toggled["data"]["active"], true);
        assert_eq!(toggled["data"]["count"], 11);
        assert_eq!(toggled["data"]["pending"], false);

        let (_, synced) = sidecar
            .call("PUT", &format!("/toggles/{handle}/count"), Some(json!({"count": 40})))
            .await;
        assert_eq!(synced["data"]["count"], 40);

        let (_, removed) = sidecar
            .call("DELETE", &format!("/toggles/{handle}"), None)
            .await;
        assert_eq!(removed["success"], true);
        let (status, gone) = sidecar.call("GET", &format!("/toggles/{handle}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gone["error"]["code"], "UnknownHandle");
    }

    #[tokio::test]
    async fn likes_have_no_editable_attrs() {
        let sidecar = Sidecar::new();
        let (_, mounted) = sidecar
            .call(
                "POST",
                "/toggles",
                Some(json!({"kind": "like", "subject_id": user(1), "object_id": post(2).0})),
            )
            .await;
        let handle = mounted["data"]["handle"].as_str().unwrap().to_owned();
        let toggle = sidecar.client.toggle(&handle).unwrap();
        toggle.settled().await;
        toggle.toggle().unwrap().settled().await.unwrap();

        let (_, edited) = sidecar
            .call(
                "PUT",
                &format!("/toggles/{handle}/attrs"),
                Some(json!({"kind": "follow", "is_close_friend": true})),
            )
            .await;
        assert_eq!(edited["success"], false);
        assert_eq!(edited["error"]["code"], "Unsupported");
    }

    #[tokio::test]
    async fn failed_toggle_is_reported_through_notifications() {
        let sidecar = Sidecar::new();
        let (_, mounted) = sidecar
            .call(
                "POST",
                "/toggles",
                Some(json!({"kind": "follow", "subject_id": user(1), "object_id": user(2).0})),
            )
            .await;
        let handle = mounted["data"]["handle"].as_str().unwrap().to_owned();
        sidecar.client.toggle(&handle).unwrap().settled().await;
        sidecar.store.fail_next_mutation("server unavailable");

        let (_, toggled) = sidecar
            .call("POST", &format!("/toggles/{handle}/toggle?wait=true"), None)
            .await;
        assert_eq!(toggled["error"]["code"], "RemoteFailed");

        let (_, notes) = sidecar.call("GET", "/notifications", None).await;
        let notes = notes["data"].as_array().unwrap().clone();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["source"], "relation");
    }

    #[tokio::test]
    async fn stream_send_and_merge() {
        let sidecar = Sidecar::new();
        let (_, opened) = sidecar
            .call(
                "POST",
                "/streams",
                Some(json!({"conversation_id": conversation(1), "me": user(1)})),
            )
            .await;
        assert_eq!(opened["data"]["view"]["loading"], true);
        let handle = opened["data"]["handle"].as_str().unwrap().to_owned();
        sidecar.client.stream(&handle).unwrap().loaded().await;

        let (_, blank) = sidecar
            .call("POST", &format!("/streams/{handle}/text"), Some(json!({"text": "   "})))
            .await;
        assert_eq!(blank["error"]["code"], "InvalidInput");

        let (_, sent) = sidecar
            .call("POST", &format!("/streams/{handle}/text"), Some(json!({"text": "hello"})))
            .await;
        assert_eq!(sent["data"]["payload"]["content"], "hello");

        let stream = sidecar.client.stream(&handle).unwrap();
        let mut rx = stream.watch();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|v| v.messages.len() == 1))
            .await
            .unwrap()
            .unwrap();
        drop(rx);
        drop(stream);

        let (_, view) = sidecar.call("GET", &format!("/streams/{handle}"), None).await;
        assert_eq!(view["data"]["messages"][0]["id"], sent["data"]["id"]);

        let (_, closed) = sidecar.call("DELETE", &format!("/streams/{handle}"), None).await;
        assert_eq!(closed["success"], true);
    }

    #[tokio::test]
    async fn unknown_route_and_bad_body() {
        let sidecar = Sidecar::new();
        let (status, _) = sidecar.call("GET", "/nowhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = sidecar
            .call("POST", "/toggles", Some(json!({"kind": "poke"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "InvalidInput");
    }
}
