//! 请求与响应的JSON编解码
//!
//! 线上格式为UTF-8 JSON。解码时区分三类坏数据：非法JSON、缺失字段、
//! 关联ID格式错误，调用方据此记录日志后丢弃。

use serde_json::Value;

use crate::errors::{RelayError, RelayResult};
use crate::models::{CorrelationId, Request, Response};

pub fn encode_request(request: &Request) -> RelayResult<String> {
    serde_json::to_string(request).map_err(|e| {
        RelayError::Serialization(format!(
            "Failed to serialize request {}: {e}",
            request.correlation_id
        ))
    })
}

pub fn decode_request(raw: &str) -> RelayResult<Request> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| RelayError::Serialization(format!("Failed to parse request JSON: {e}")))?;

    let raw_id = value
        .get("correlation_id")
        .ok_or_else(|| RelayError::MalformedRequest("missing correlation_id".to_string()))?
        .as_str()
        .ok_or_else(|| {
            RelayError::MalformedRequest("correlation_id must be a string".to_string())
        })?;
    raw_id.parse::<CorrelationId>()?;

    serde_json::from_value(value).map_err(|e| RelayError::MalformedRequest(e.to_string()))
}

pub fn encode_response(response: &Response) -> RelayResult<String> {
    serde_json::to_string(response).map_err(|e| {
        RelayError::Serialization(format!(
            "Failed to serialize response {}: {e}",
            response.correlation_id
        ))
    })
}

pub fn decode_response(raw: &str) -> RelayResult<Response> {
    serde_json::from_str(raw)
        .map_err(|e| RelayError::Serialization(format!("Failed to deserialize response: {e}")))
}
