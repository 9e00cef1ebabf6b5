mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use brewdigest::server::router;
use helpers::{test_context, write_formula, CannedModel, DownModel, StaticSource};
use tempfile::TempDir;
use tower::ServiceExt;

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn predict_returns_text_after_thinking() {
    let tmp = TempDir::new().unwrap();
    let model = CannedModel::new("<think>\n\n</think>\n\nthere, how are you?");
    let app = router(test_context(StaticSource::with_added(&[]), model.clone(), tmp.path().into()));

    let res = app
        .oneshot(post_json("/predict", serde_json::json!({"prompt": "hi", "max_tokens": 5})))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, "there, how are you?");
    let requests = model.requests.lock().unwrap();
    assert_eq!(requests[0].max_tokens, 5);
    assert_eq!(requests[0].messages[0].content, "hi");
}

#[tokio::test]
async fn predict_defaults_max_tokens() {
    let tmp = TempDir::new().unwrap();
    let model = CannedModel::new("</think>ok");
    let app = router(test_context(StaticSource::with_added(&[]), model.clone(), tmp.path().into()));

    let res = app
        .oneshot(post_json("/predict", serde_json::json!({"prompt": "hi"})))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(model.requests.lock().unwrap()[0].max_tokens, 128);
}

#[tokio::test]
async fn ask_returns_full_reply() {
    let tmp = TempDir::new().unwrap();
    let model = CannedModel::new("<think>\n</think>\n\nBlue.");
    let app = router(test_context(StaticSource::with_added(&[]), model.clone(), tmp.path().into()));

    let res = app
        .oneshot(post_json(
            "/ask",
            serde_json::json!({"prompt": "What colour is the sky?", "max_tokens": 32}),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, "<think>\n</think>\n\nBlue.");
    assert_eq!(model.last_user_message(), "Q: What colour is the sky? \nA:");
}

#[tokio::test]
async fn model_failure_is_reported_as_text() {
    let tmp = TempDir::new().unwrap();
    let app = router(test_context(
        StaticSource::with_added(&[]),
        std::sync::Arc::new(DownModel),
        tmp.path().into(),
    ));

    let res = app
        .oneshot(post_json("/predict", serde_json::json!({"prompt": "hi"})))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let text = body_json(res).await;
    assert!(text
        .as_str()
        .unwrap()
        .starts_with("Unable to serve your request.\nError: model runtime not reachable"));
}

#[tokio::test]
async fn new_formula_with_nothing_added_still_has_prefix() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("homebrew-core")).unwrap();
    let model = CannedModel::new("</think>Quiet week on the tap, folks.");
    let app = router(test_context(StaticSource::with_added(&[]), model.clone(), tmp.path().into()));

    let res = app.oneshot(get("/newFormula")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let text = body_json(res).await.as_str().unwrap().to_string();
    assert!(text.starts_with(
        "Summarize the following list of newly added applications called Formula that have been added this past 1 week"
    ));
    assert!(text.ends_with("radio commentator.\n\n----\nQuiet week on the tap, folks."));
}

#[tokio::test]
async fn new_formula_summarizes_added_files() {
    let tmp = TempDir::new().unwrap();
    write_formula(
        tmp.path(),
        "Formula/a/abc.rb",
        "class Abc < Formula\n  desc \"Alphabet soup\"\n  homepage \"https://abc.example\"\n  license \"MIT\"\nend\n",
    );
    let source = StaticSource::with_added(&["Formula/a/abc.rb"]);
    let model = CannedModel::new("</think>Big news:\\nabc arrived.");
    let app = router(test_context(source.clone(), model.clone(), tmp.path().into()));

    let res = app.oneshot(get("/newFormula?since=3%20days")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let text = body_json(res).await.as_str().unwrap().to_string();
    assert!(text.contains("added this past 3 days"));
    assert!(text.contains("abc: Alphabet soup\n- License: MIT Link(s): https://abc.example "));
    // The literal `\n` from the model is decoded.
    assert!(text.ends_with("\n----\nBig news:\nabc arrived."));

    assert!(model.last_user_message().contains("abc: Alphabet soup"));
    assert_eq!(source.calls(), vec!["pull", "log 3 days"]);
    assert_eq!(model.requests.lock().unwrap()[0].max_tokens, 1024);
}

#[tokio::test]
async fn new_formula_clones_missing_mirror_first() {
    let tmp = TempDir::new().unwrap();
    let source = StaticSource::with_added(&[]);
    let app = router(test_context(
        source.clone(),
        CannedModel::new("</think>nothing"),
        tmp.path().join("repo"),
    ));

    let res = app.oneshot(get("/newFormula")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(source.calls(), vec!["clone", "repack", "fetch", "pull", "log 1 week"]);
}

#[tokio::test]
async fn health_reports_version() {
    let tmp = TempDir::new().unwrap();
    let app = router(test_context(
        StaticSource::with_added(&[]),
        CannedModel::new(""),
        tmp.path().into(),
    ));

    let res = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn index_serves_landing_page() {
    let tmp = TempDir::new().unwrap();
    let app = router(test_context(
        StaticSource::with_added(&[]),
        CannedModel::new(""),
        tmp.path().into(),
    ));

    let res = app.oneshot(get("/")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Mini LLM API"));
}
