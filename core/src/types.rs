//! Default error payload decoded from 4xx/5xx response bodies.
//!
//! # Design
//! The engine is generic over its error payload; `ErrorResponse` is the
//! default and matches the common `{"code": .., "message": ..}` shape. Any
//! other fields the server sends are kept in `extra` rather than dropped, so
//! callers can inspect validation details without a custom payload type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
