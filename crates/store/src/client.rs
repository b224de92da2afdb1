//! HTTP client for the store service

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use specretry_common::{Error, Result, SharedStore};

use crate::api::{
    CasRequest, CasResponse, GetRequest, GetResponse, SetRequest, CAS_PATH, GET_PATH,
    HEALTH_PATH, SET_PATH,
};

/// [`SharedStore`] backed by a remote store service
#[derive(Debug, Clone)]
pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the service answers its health endpoint
    pub async fn health_check(&self) -> bool {
        match self
            .http
            .get(format!("{}{}", self.base_url, HEALTH_PATH))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!("{} returned {}: {}", path, status, text)));
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl SharedStore for HttpStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let resp: GetResponse = self
            .post(GET_PATH, &GetRequest { key: key.to_string() })
            .await?;
        Ok(resp.value)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _: Value = self
            .post(
                SET_PATH,
                &SetRequest {
                    key: key.to_string(),
                    value,
                },
            )
            .await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool> {
        let resp: CasResponse = self
            .post(
                CAS_PATH,
                &CasRequest {
                    key: key.to_string(),
                    expected: expected.cloned(),
                    value,
                },
            )
            .await?;
        Ok(resp.swapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::StoreServer;
    use serde_json::json;
    use specretry_common::MemoryStore;
    use std::sync::Arc;

    async fn spawn_server() -> (HttpStore, Arc<MemoryStore>) {
        let backing = Arc::new(MemoryStore::new());
        let server = StoreServer::new(backing.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(server.serve_listener(listener));

        (HttpStore::new(url, None).unwrap(), backing)
    }

    #[tokio::test]
    async fn test_round_trip_through_service() {
        let (store, backing) = spawn_server().await;
        assert!(store.health_check().await);

        assert_eq!(store.get("retriedSpecs").await.unwrap(), None);
        store.set("retriedSpecs", json!([])).await.unwrap();
        assert_eq!(store.get("retriedSpecs").await.unwrap(), Some(json!([])));
        assert_eq!(backing.write_count(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_set_through_service() {
        let (store, _backing) = spawn_server().await;

        assert!(store.compare_and_set("k", None, json!([1])).await.unwrap());
        assert!(!store.compare_and_set("k", None, json!([2])).await.unwrap());
        assert!(store
            .compare_and_set("k", Some(&json!([1])), json!([1, 2]))
            .await
            .unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind and drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let store = HttpStore::new(url, Some(Duration::from_secs(2))).unwrap();
        assert!(!store.health_check().await);
        assert!(matches!(store.get("k").await, Err(Error::Http(_))));
    }
}
