//! Elasticsearch client tests against a local stub server.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use liftlog_core::{
    ElasticsearchClient, Exercise, IndexClient, IndexDocument, Liftlog, LiftlogError,
    SearchableModel,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StubState {
    /// namespace -> id -> document
    docs: BTreeMap<String, BTreeMap<String, Value>>,
    /// Last search body received.
    last_search: Option<Value>,
    /// Respond to every PUT with 503.
    reject_writes: bool,
}

type Shared = Arc<Mutex<StubState>>;

async fn put_doc(
    State(state): State<Shared>,
    Path((ns, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    if state.reject_writes {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "unavailable"})));
    }
    state.docs.entry(ns).or_default().insert(id, body);
    (StatusCode::OK, Json(json!({"result": "updated"})))
}

async fn delete_doc(
    State(state): State<Shared>,
    Path((ns, id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    let removed = state.docs.get_mut(&ns).and_then(|docs| docs.remove(&id));
    match removed {
        Some(_) => (StatusCode::OK, Json(json!({"result": "deleted"}))),
        None => (StatusCode::NOT_FOUND, Json(json!({"result": "not_found"}))),
    }
}

/// Returns every stored document of the namespace in id order.
async fn search(
    State(state): State<Shared>,
    Path(ns): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.last_search = Some(body.clone());
    let Some(docs) = state.docs.get(&ns) else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "index_not_found"})));
    };

    let from = body["from"].as_u64().unwrap_or(0) as usize;
    let size = body["size"].as_u64().unwrap_or(10) as usize;
    let hits: Vec<Value> = docs
        .keys()
        .skip(from)
        .take(size)
        .map(|id| json!({"_id": id, "_score": 1.0}))
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "hits": {"total": {"value": docs.len(), "relation": "eq"}, "hits": hits}
        })),
    )
}

async fn spawn_stub() -> (String, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/", get(|| async { Json(json!({"tagline": "You Know, for Search"})) }))
        .route("/:ns/_doc/:id", put(put_doc).delete(delete_doc))
        .route("/:ns/_search", post(search))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn doc(name: &str) -> IndexDocument {
    let mut fields = IndexDocument::new();
    fields.insert("name".to_string(), json!(name));
    fields
}

fn client(base: &str) -> ElasticsearchClient {
    ElasticsearchClient::new(url::Url::parse(base).unwrap()).unwrap()
}

#[tokio::test]
async fn test_index_and_delete_documents() {
    let (base, state) = spawn_stub().await;
    let es = client(&base);

    assert!(es.available().await);
    es.index("exercise", 4, &doc("Pull-up")).await.unwrap();
    es.index("exercise", 4, &doc("Weighted Pull-up")).await.unwrap();
    assert_eq!(
        state.lock().unwrap().docs["exercise"]["4"],
        json!({"name": "Weighted Pull-up"})
    );

    es.delete("exercise", 4).await.unwrap();
    // Already gone: the 404 is not an error.
    es.delete("exercise", 4).await.unwrap();
    assert!(state.lock().unwrap().docs["exercise"].is_empty());
}

#[tokio::test]
async fn test_search_request_and_pagination() {
    let (base, state) = spawn_stub().await;
    let es = client(&base);
    for (id, name) in [(1, "Squat"), (2, "Front Squat"), (3, "Split Squat")] {
        es.index("exercise", id, &doc(name)).await.unwrap();
    }

    let hits = es.search("exercise", "squat", 2, 2).await.unwrap();
    assert_eq!(hits.ids, vec![3]);
    assert_eq!(hits.total, 3);

    let body = state.lock().unwrap().last_search.clone().unwrap();
    assert_eq!(body["query"]["multi_match"]["query"], "squat");
    assert_eq!(body["query"]["multi_match"]["fields"], json!(["*"]));
    assert_eq!(body["from"], 2);
    assert_eq!(body["size"], 2);
}

#[tokio::test]
async fn test_missing_index_searches_empty() {
    let (base, _state) = spawn_stub().await;
    let hits = client(&base).search("workout", "legs", 1, 10).await.unwrap();
    assert!(hits.ids.is_empty());
    assert_eq!(hits.total, 0);
}

#[tokio::test]
async fn test_rejected_write_reports_status() {
    let (base, state) = spawn_stub().await;
    state.lock().unwrap().reject_writes = true;

    let err = client(&base)
        .index("exercise", 1, &doc("Dip"))
        .await
        .unwrap_err();
    match err {
        LiftlogError::Search {
            namespace,
            status_code,
            ..
        } => {
            assert_eq!(namespace, "exercise");
            assert_eq!(status_code, Some(503));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_commit_writes_through_to_elasticsearch() {
    let (base, state) = spawn_stub().await;
    let app = Liftlog::builder().search_url(base).build().unwrap();
    assert_eq!(app.search_index().backend_name(), "elasticsearch");

    let mut session = app.session();
    session.add(Exercise::new("Romanian Deadlift")).unwrap();
    session.add(Exercise::new("Sumo Deadlift")).unwrap();
    let summary = session.commit().await.unwrap();
    assert_eq!(summary.sync.upserted, 2);

    let (found, total) = app
        .search_records::<Exercise>("deadlift", 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 2);
    let names: Vec<_> = found.into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Romanian Deadlift", "Sumo Deadlift"]);

    state.lock().unwrap().docs.clear();
    assert_eq!(app.reindex::<Exercise>().await.unwrap(), 2);
    assert_eq!(state.lock().unwrap().docs["exercise"].len(), 2);

    let (query, _) = Exercise::search(app.search_index(), "deadlift", 1, 1)
        .await
        .unwrap();
    assert_eq!(query.ids(), &[1]);
}
