//! In-process stand-in for the job reporting REST API
//!
//! Serves `GET`/`PUT /rest/v1/{user}/jobs/{id}` from memory. A `PUT` merges
//! the patch into the stored job, like the real service does.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// An update the fake received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub user: String,
    pub session_id: String,
    pub body: Value,
}

#[derive(Default)]
struct FakeState {
    jobs: HashMap<String, Value>,
    updates: Vec<RecordedUpdate>,
    gets: usize,
}

/// Fake job service shared between the router and the test
#[derive(Clone, Default)]
pub struct FakeJobService {
    state: Arc<Mutex<FakeState>>,
}

impl FakeJobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the job created for a browser session
    pub fn insert_job(&self, session_id: &str, name: &str) {
        self.state.lock().jobs.insert(
            session_id.to_string(),
            json!({
                "id": session_id,
                "name": name,
                "passed": false,
                "status": "complete",
            }),
        );
    }

    pub fn job(&self, session_id: &str) -> Option<Value> {
        self.state.lock().jobs.get(session_id).cloned()
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.lock().updates.clone()
    }

    pub fn get_count(&self) -> usize {
        self.state.lock().gets
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/rest/v1/:user/jobs/:id", get(get_job).put(put_job))
            .with_state(self.clone())
    }
}

async fn get_job(
    State(fake): State<FakeJobService>,
    Path((_user, id)): Path<(String, String)>,
) -> Response {
    let mut state = fake.state.lock();
    state.gets += 1;
    match state.jobs.get(&id) {
        Some(job) => (StatusCode::OK, Json(job.clone())).into_response(),
        None => not_found(),
    }
}

async fn put_job(
    State(fake): State<FakeJobService>,
    Path((user, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = fake.state.lock();
    state.updates.push(RecordedUpdate {
        user,
        session_id: id.clone(),
        body: body.clone(),
    });

    let Some(Value::Object(job)) = state.jobs.get_mut(&id) else {
        return not_found();
    };
    if let Value::Object(patch) = body {
        job.extend(patch);
    }
    (StatusCode::OK, Json(Value::Object(job.clone()))).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Not found"})),
    )
        .into_response()
}
