//! Run handlers: start a specification, inspect runs, deliver events.

use axum::body::Bytes;
use axum::extract::{Path, State};
use serde_json::{Value, json};

use orcha_types::orchestration::EventResponse;

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// POST /api/v1/runs - Start a run from a specification body.
///
/// An empty or `null` body is rejected as an invalid payload.
pub async fn start_run(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<Value>, AppError> {
    let timer = RequestTimer::start();

    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Malformed JSON body: {e}")))?
    };
    let instance_id = state.host.start_run_value(payload)?;

    let self_link = format!("/api/v1/runs/{instance_id}");
    let events_link = format!("{self_link}/events/{{eventName}}");
    Ok(
        ApiResponse::accepted(json!({ "instanceId": instance_id }), &timer)
            .with_link("self", &self_link)
            .with_link("events", &events_link),
    )
}

/// GET /api/v1/runs - List top-level runs, oldest first.
pub async fn list_runs(State(state): State<AppState>) -> Result<ApiResponse<Value>, AppError> {
    let timer = RequestTimer::start();
    let runs = to_value(state.host.list_runs())?;
    Ok(ApiResponse::success(runs, &timer).with_link("self", "/api/v1/runs"))
}

/// GET /api/v1/runs/{instance_id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let timer = RequestTimer::start();
    let record = state
        .host
        .get_run(&instance_id)
        .ok_or_else(|| orcha_infra::host::HostError::RunNotFound(instance_id.clone()))?;

    let self_link = format!("/api/v1/runs/{instance_id}");
    let children_link = format!("{self_link}/children");
    Ok(ApiResponse::success(to_value(record)?, &timer)
        .with_link("self", &self_link)
        .with_link("children", &children_link))
}

/// GET /api/v1/runs/{instance_id}/children - Nested sub-workflow runs.
pub async fn list_children(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
) -> Result<ApiResponse<Value>, AppError> {
    let timer = RequestTimer::start();
    if state.host.get_run(&instance_id).is_none() {
        return Err(orcha_infra::host::HostError::RunNotFound(instance_id).into());
    }
    let children = to_value(state.host.sub_runs(&instance_id))?;
    Ok(ApiResponse::success(children, &timer)
        .with_link("parent", &format!("/api/v1/runs/{instance_id}")))
}

/// POST /api/v1/runs/{instance_id}/events/{event_name}
///
/// Body is `"Continue"` or `"Cancel"`, as a JSON string or plain text.
pub async fn raise_event(
    State(state): State<AppState>,
    Path((instance_id, event_name)): Path<(String, String)>,
    body: Bytes,
) -> Result<ApiResponse<Value>, AppError> {
    let timer = RequestTimer::start();
    let response = parse_event_body(&body)?;

    state.host.send_event(&instance_id, &event_name, response)?;
    tracing::info!(
        instance_id = instance_id.as_str(),
        event = event_name.as_str(),
        %response,
        "event accepted"
    );

    Ok(ApiResponse::accepted(
        json!({ "instanceId": instance_id, "eventName": event_name, "payload": response }),
        &timer,
    )
    .with_link("run", &format!("/api/v1/runs/{instance_id}")))
}

fn parse_event_body(body: &[u8]) -> Result<EventResponse, AppError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| AppError::Validation("Event payload must be UTF-8".to_string()))?;
    let raw = serde_json::from_str::<String>(text).unwrap_or_else(|_| text.trim().to_string());
    raw.parse::<EventResponse>().map_err(AppError::Validation)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_body_accepts_json_and_text() {
        assert_eq!(parse_event_body(br#""Cancel""#).unwrap(), EventResponse::Cancel);
        assert_eq!(parse_event_body(b"continue\n").unwrap(), EventResponse::Continue);
        assert!(parse_event_body(b"\"Later\"").is_err());
        assert!(parse_event_body(&[0xff, 0xfe]).is_err());
    }
}
