//! `POST /deliver`: internal dispatch endpoint for producers outside the
//! process.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use herald_core::{PushEnvelope, PushKind, UserId};
use herald_hub::{DeliveryOutcome, FailureReason};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::server::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    /// Receiver.
    pub user_id: UserId,
    /// Envelope kind.
    #[serde(rename = "type")]
    pub kind: PushKind,
    /// Envelope body.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Response body.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DeliverResponse {
    /// `delivered`, `offline`, or `failed`.
    pub outcome: &'static str,
    /// Why a delivery failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<DeliveryOutcome> for DeliverResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        let reason = match outcome {
            DeliveryOutcome::Failed(reason) => Some(FailureReason::as_str(reason)),
            DeliveryOutcome::Delivered | DeliveryOutcome::Offline => None,
        };
        Self {
            outcome: outcome.as_str(),
            reason,
        }
    }
}

/// Wrap the request in an envelope and deliver it.
pub async fn deliver_handler(
    State(state): State<AppState>,
    Json(request): Json<DeliverRequest>,
) -> Response {
    let envelope = PushEnvelope::new(request.kind, request.user_id, request.data);
    match state.hub.deliver_envelope(&envelope) {
        Ok(outcome) => Json(DeliverResponse::from(outcome)).into_response(),
        Err(err) => {
            error!(error = %err, "failed to serialize envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
