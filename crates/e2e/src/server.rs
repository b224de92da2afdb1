//! Server management - running and health checking in-process services

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Default time allowed for a service to answer its health check
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a service running on an ephemeral local port
pub struct ServerHandle {
    name: String,
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Serve `router` on 127.0.0.1 and wait until `health_path` answers
    pub async fn spawn(name: &str, router: Router, health_path: &str) -> E2eResult<Self> {
        Self::spawn_with_timeout(name, router, health_path, DEFAULT_STARTUP_TIMEOUT).await
    }

    pub async fn spawn_with_timeout(
        name: &str,
        router: Router,
        health_path: &str,
        startup_timeout: Duration,
    ) -> E2eResult<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| E2eError::ServerStartup(format!("{}: bind failed: {}", name, e)))?;
        let addr: SocketAddr = listener.local_addr()?;
        let base_url = format!("http://{}", addr);

        info!("Starting {} on {}", name, base_url);

        let (tx, rx) = oneshot::channel::<()>();
        let task_name = name.to_string();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("{} stopped with error: {}", task_name, e);
            }
        });

        let handle = ServerHandle {
            name: name.to_string(),
            base_url,
            shutdown: Some(tx),
            task: Some(task),
        };
        handle.wait_for_healthy(health_path, startup_timeout).await?;

        info!("{} is healthy at {}", handle.name, handle.base_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, health_path: &str, timeout: Duration) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url, health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("{} health check returned {}", self.name, resp.status());
                }
                Err(e) => {
                    // Connection refused is expected while the server is starting
                    if !e.is_connect() {
                        warn!("{} health check error: {}", self.name, e);
                    }
                }
            }

            sleep(Duration::from_millis(50)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("{} stopped", self.name);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_spawn_and_stop() {
        let router = Router::new().route("/health", get(|| async { "ok" }));
        let server = ServerHandle::spawn("probe", router, "/health").await.unwrap();
        let url = format!("{}/health", server.base_url());

        let body = reqwest::get(&url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unhealthy_server_times_out() {
        let router = Router::new();
        let handle = ServerHandle::spawn_with_timeout(
            "mute",
            router,
            "/health",
            Duration::from_millis(300),
        )
        .await;
        assert!(matches!(handle, Err(E2eError::ServerHealthCheck(_))));
    }
}
