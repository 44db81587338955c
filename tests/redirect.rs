//! Integration tests for internal response redirection.

use axum::body::Body;
use axum::http::{Response, StatusCode};

mod common;

fn redirecting_backend(
    target: &'static str,
) -> impl Fn(&common::RecordedRequest) -> Response<Body> + Send + Sync + 'static {
    move |_| {
        Response::builder()
            .status(StatusCode::OK)
            .header("x-internal-redirect", target)
            .header("content-type", "text/html")
            .header("content-length", "9")
            .body(Body::from("DISCARDED"))
            .unwrap()
    }
}

#[tokio::test]
async fn redirect_signal_substitutes_the_storage_response() {
    let root = tempfile::tempdir().unwrap();
    let (storage, storage_rec) = common::start_backend(|_| {
        Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "image/jpeg")
            .header("x-storage", "yes")
            .body(Body::from("jpeg-bytes"))
            .unwrap()
    })
    .await;
    let (primary, primary_rec) =
        common::start_backend(redirecting_backend("/storage/abc/def.jpg")).await;

    let config = common::config_with(
        vec![common::route("map", "map.dev", primary, Some(root.path()))],
        common::redirect_to(storage),
    );
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("map.dev", proxy);
    let res = client
        .get(common::host_url("map.dev", proxy, "/files/42"))
        .header("x-trace", "t1")
        .send()
        .await
        .unwrap();

    // the client sees only the storage response
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(res.headers().get("x-storage").unwrap(), "yes");
    assert!(res.headers().get("x-internal-redirect").is_none());
    assert_eq!(res.text().await.unwrap(), "jpeg-bytes");

    // the original request was replayed against storage, path rewritten
    assert_eq!(primary_rec.count(), 1);
    assert_eq!(storage_rec.count(), 1);
    let replayed = storage_rec.last().unwrap();
    assert_eq!(replayed.method, "GET");
    assert_eq!(replayed.path, "/abc/def.jpg");
    assert_eq!(replayed.headers.get("x-trace").unwrap(), "t1");
}

#[tokio::test]
async fn request_body_is_replayed_to_storage() {
    let root = tempfile::tempdir().unwrap();
    let (storage, storage_rec) =
        common::start_backend(|_| common::text_response(StatusCode::OK, "stored")).await;
    let (primary, _) = common::start_backend(redirecting_backend("/storage/inbox")).await;

    let config = common::config_with(
        vec![common::route("map", "map.dev", primary, Some(root.path()))],
        common::redirect_to(storage),
    );
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("map.dev", proxy);
    let res = client
        .post(common::host_url("map.dev", proxy, "/upload"))
        .body("file-contents")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let replayed = storage_rec.last().unwrap();
    assert_eq!(replayed.method, "POST");
    assert_eq!(replayed.path, "/inbox");
    assert_eq!(replayed.body, b"file-contents");
}

#[tokio::test]
async fn target_outside_the_prefix_is_inert_and_stripped() {
    let root = tempfile::tempdir().unwrap();
    let (storage, storage_rec) =
        common::start_backend(|_| common::text_response(StatusCode::OK, "stored")).await;
    let (primary, _) = common::start_backend(|_| {
        Response::builder()
            .status(StatusCode::OK)
            .header("x-internal-redirect", "/elsewhere/x")
            .body(Body::from("primary body"))
            .unwrap()
    })
    .await;

    let config = common::config_with(
        vec![common::route("map", "map.dev", primary, Some(root.path()))],
        common::redirect_to(storage),
    );
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("map.dev", proxy);
    let res = client
        .get(common::host_url("map.dev", proxy, "/page"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-internal-redirect").is_none());
    assert_eq!(res.text().await.unwrap(), "primary body");
    assert_eq!(storage_rec.count(), 0);
}

#[tokio::test]
async fn routes_opted_out_pass_the_header_through() {
    let (primary, _) = common::start_backend(redirecting_backend("/storage/abc")).await;
    let (storage, storage_rec) =
        common::start_backend(|_| common::text_response(StatusCode::OK, "stored")).await;

    let mut route = common::route("storage", "storage.dev", primary, None);
    route.internal_redirect = false;
    let config = common::config_with(vec![route], common::redirect_to(storage));
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("storage.dev", proxy);
    let res = client
        .get(common::host_url("storage.dev", proxy, "/x"))
        .send()
        .await
        .unwrap();

    // without the sink the header is ordinary backend output
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get("x-internal-redirect").unwrap(),
        "/storage/abc"
    );
    assert_eq!(storage_rec.count(), 0);
}

#[tokio::test]
async fn unreplayable_body_is_rejected_before_any_upstream_call() {
    let root = tempfile::tempdir().unwrap();
    let (storage, storage_rec) =
        common::start_backend(|_| common::text_response(StatusCode::OK, "stored")).await;
    let (primary, primary_rec) =
        common::start_backend(redirecting_backend("/storage/inbox")).await;

    let mut redirect = common::redirect_to(storage);
    redirect.max_replay_body_bytes = 8;
    let config = common::config_with(
        vec![common::route("map", "map.dev", primary, Some(root.path()))],
        redirect,
    );
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("map.dev", proxy);
    let res = client
        .post(common::host_url("map.dev", proxy, "/upload"))
        .body("definitely more than eight bytes")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(primary_rec.count(), 0);
    assert_eq!(storage_rec.count(), 0);
}

#[tokio::test]
async fn the_storage_response_is_never_reinspected() {
    let root = tempfile::tempdir().unwrap();
    // storage itself answers with a redirect header; it must pass through
    // verbatim rather than trigger a second substitution
    let (storage, storage_rec) = common::start_backend(|_| {
        Response::builder()
            .status(StatusCode::OK)
            .header("x-internal-redirect", "/storage/again")
            .body(Body::from("storage body"))
            .unwrap()
    })
    .await;
    let (primary, _) = common::start_backend(redirecting_backend("/storage/first")).await;

    let config = common::config_with(
        vec![common::route("map", "map.dev", primary, Some(root.path()))],
        common::redirect_to(storage),
    );
    let proxy = common::start_front_door(config).await;

    let client = common::client_for("map.dev", proxy);
    let res = client
        .get(common::host_url("map.dev", proxy, "/doc"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "storage body");
    assert_eq!(storage_rec.count(), 1);
    assert_eq!(storage_rec.last().unwrap().path, "/first");
}
