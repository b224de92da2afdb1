//! Job reporting service client
//!
//! Remote jobs are addressed by the browser session id. Only the two calls
//! the reconciler needs are exposed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use specretry_common::{Error, Job, JobPatch, Result, SauceConfig, SpecRetryConfig};
use tracing::debug;

/// Remote job API
#[async_trait]
pub trait JobService: Send + Sync {
    /// Fetch the job created for a session
    async fn get_job(&self, user: &str, session_id: &str) -> Result<Job>;

    /// Patch the job created for a session
    async fn update_job(&self, user: &str, session_id: &str, patch: &JobPatch) -> Result<()>;
}

/// Sauce Labs REST client (`/rest/v1/{user}/jobs/{id}`)
#[derive(Debug, Clone)]
pub struct SauceLabsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    access_key: String,
}

impl SauceLabsClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        access_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            access_key: access_key.into(),
        })
    }

    /// Build a client from configuration; credentials are required
    pub fn from_config(config: &SpecRetryConfig) -> Result<Self> {
        let SauceConfig {
            username,
            access_key,
            ..
        } = &config.sauce;

        let username = username
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("SAUCE_USERNAME is not set".into()))?;
        let access_key = access_key
            .as_deref()
            .ok_or_else(|| Error::InvalidConfig("SAUCE_ACCESS_KEY is not set".into()))?;

        Self::new(
            config.sauce.base_url(),
            username,
            access_key,
            config.http_timeout(),
        )
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn job_url(&self, user: &str, session_id: &str) -> String {
        format!("{}/rest/v1/{}/jobs/{}", self.base_url, user, session_id)
    }
}

/// Map a non-success response to an error
async fn check_status(response: Response, session_id: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound {
            kind: "job".to_string(),
            id: session_id.to_string(),
        });
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::JobService {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl JobService for SauceLabsClient {
    async fn get_job(&self, user: &str, session_id: &str) -> Result<Job> {
        let url = self.job_url(user, session_id);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.access_key))
            .send()
            .await?;
        let job = check_status(response, session_id).await?.json::<Job>().await?;
        Ok(job)
    }

    async fn update_job(&self, user: &str, session_id: &str, patch: &JobPatch) -> Result<()> {
        let url = self.job_url(user, session_id);
        debug!("PUT {} name={:?} passed={}", url, patch.name, patch.passed);

        let response = self
            .http
            .put(&url)
            .basic_auth(&self.username, Some(&self.access_key))
            .json(patch)
            .send()
            .await?;
        check_status(response, session_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[derive(Default)]
    struct Seen {
        auth: Vec<String>,
        puts: Vec<(String, String, Value)>,
    }

    async fn get_job(
        State(seen): State<Arc<Mutex<Seen>>>,
        headers: HeaderMap,
        Path((user, id)): Path<(String, String)>,
    ) -> (StatusCode, Json<Value>) {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            seen.lock().auth.push(auth.to_string());
        }
        match id.as_str() {
            "missing" => (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))),
            "broken" => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"message": "boom"})),
            ),
            _ => (
                StatusCode::OK,
                Json(json!({"id": id, "name": format!("Build for {user}"), "passed": false})),
            ),
        }
    }

    async fn put_job(
        State(seen): State<Arc<Mutex<Seen>>>,
        Path((user, id)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        seen.lock().puts.push((user, id.clone(), body));
        Json(json!({"id": id}))
    }

    async fn spawn_fake() -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .route("/rest/v1/:user/jobs/:id", get(get_job).put(put_job))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/"), seen)
    }

    #[tokio::test]
    async fn test_get_job_sends_basic_auth() {
        let (url, seen) = spawn_fake().await;
        let client = SauceLabsClient::new(url, "ci-user", "secret", None).unwrap();

        let job = client.get_job("ci-user", "abc").await.unwrap();
        assert_eq!(job.id.as_deref(), Some("abc"));
        assert_eq!(job.name.as_deref(), Some("Build for ci-user"));
        assert_eq!(job.passed, Some(false));

        // base64("ci-user:secret")
        assert_eq!(seen.lock().auth, vec!["Basic Y2ktdXNlcjpzZWNyZXQ=".to_string()]);
    }

    #[tokio::test]
    async fn test_update_job_sends_patch() {
        let (url, seen) = spawn_fake().await;
        let client = SauceLabsClient::new(url, "ci-user", "secret", None).unwrap();

        let patch = JobPatch::succeeded_after_retry("My Build");
        client.update_job("ci-user", "abc", &patch).await.unwrap();

        let seen = seen.lock();
        let puts = &seen.puts;
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "ci-user");
        assert_eq!(puts[0].1, "abc");
        assert_eq!(
            puts[0].2,
            json!({"name": "❌ - My Build - Succeeded after retry", "passed": true})
        );
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (url, _seen) = spawn_fake().await;
        let client = SauceLabsClient::new(url, "ci-user", "secret", None).unwrap();

        let err = client.get_job("ci-user", "missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref id, .. } if id == "missing"));
        assert!(err.is_job_service());

        let err = client.get_job("ci-user", "broken").await.unwrap_err();
        match err {
            Error::JobService { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let mut config = SpecRetryConfig::default();
        assert!(matches!(
            SauceLabsClient::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));

        config.sauce.username = Some("ci-user".into());
        config.sauce.access_key = Some("secret".into());
        config.sauce.region = "eu".parse().unwrap();
        let client = SauceLabsClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://api.eu-central-1.saucelabs.com");
        assert_eq!(client.username(), "ci-user");
    }
}
