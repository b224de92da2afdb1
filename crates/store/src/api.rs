//! Wire types of the store service

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_PATH: &str = "/shared-store/get";
pub const SET_PATH: &str = "/shared-store/set";
pub const CAS_PATH: &str = "/shared-store/cas";
pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    /// `null` when the key is absent
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasRequest {
    pub key: String,
    /// `null` means the key must be absent
    #[serde(default)]
    pub expected: Option<Value>,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasResponse {
    pub swapped: bool,
}
