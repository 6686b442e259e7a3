//! HTTP surface for the face matching service.
//!
//! Three JSON routes over a shared [`FaceService`]:
//!
//! - `GET /health` reports readiness and the gallery size
//! - `POST /load-profiles` replaces the gallery with a new batch
//! - `POST /match-face` identifies the face in a base64 probe image
//!
//! Client mistakes map to 400 with `{error}`; everything else unexpected
//! maps to 500 with `{error}`. A probe without a face is not an error and
//! is answered with 200.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use dex_core::pipeline::decode_image_data;
use dex_core::{
    FaceService, FailureReason, LoadReport, MatchCandidate, MatchDecision, MatchError,
    MatchOutcome, Profile,
};

const NO_FACE_MESSAGE: &str = "No face detected in image";
const NO_MATCH_MESSAGE: &str = "No confident match found";

/// Build the application router.
pub fn router(service: Arc<FaceService>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/load-profiles", post(load_profiles))
        .route("/match-face", post(match_face))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Error response carrying a status code and a `{error}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(e: MatchError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Match failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse<'a> {
    status: &'static str,
    model: &'a str,
    profiles_loaded: usize,
}

async fn health(State(service): State<Arc<FaceService>>) -> Response {
    Json(HealthResponse {
        status: "healthy",
        model: service.model(),
        profiles_loaded: service.profiles_loaded(),
    })
    .into_response()
}

/// Entries stay raw JSON so one malformed record fails on its own.
#[derive(Deserialize)]
struct LoadRequest {
    #[serde(default)]
    profiles: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadFailure {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    reason: FailureReason,
    detail: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadResponse {
    success: bool,
    computed: usize,
    failed: usize,
    total: usize,
    failures: Vec<LoadFailure>,
}

impl From<LoadReport> for LoadResponse {
    fn from(report: LoadReport) -> Self {
        let failures = report
            .failures()
            .map(|(outcome, reason)| LoadFailure {
                index: outcome.index,
                profile_id: outcome.profile_id.clone(),
                name: outcome.name.clone(),
                reason: reason.clone(),
                detail: reason.to_string(),
            })
            .collect();
        Self {
            success: true,
            computed: report.computed,
            failed: report.failed,
            total: report.total,
            failures,
        }
    }
}

async fn load_profiles(
    State(service): State<Arc<FaceService>>,
    payload: Result<Json<LoadRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let profiles = match request.profiles {
        Some(profiles) if !profiles.is_empty() => profiles,
        _ => return Err(ApiError::bad_request("No profiles provided")),
    };

    let report = service.load_records(profiles).await;
    Ok(Json(LoadResponse::from(report)).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRequest {
    #[serde(default)]
    image_data: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchedResponse {
    matched_profile: Profile,
    confidence: f32,
    distance: f32,
    top3_candidates: Vec<MatchCandidate>,
    match_time: f64,
    success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoMatchResponse {
    matched_profile: Option<Profile>,
    message: &'static str,
    top3_candidates: Vec<MatchCandidate>,
    best_distance: Option<f32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoFaceResponse {
    matched_profile: Option<Profile>,
    error: &'static str,
}

async fn match_face(
    State(service): State<Arc<FaceService>>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let image_data = request
        .image_data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ApiError::bad_request("No image data provided"))?;

    let probe = decode_image_data(&image_data).map_err(MatchError::from)?;

    let response = match service.match_face(probe).await? {
        MatchOutcome::NoFace => Json(NoFaceResponse {
            matched_profile: None,
            error: NO_FACE_MESSAGE,
        })
        .into_response(),
        MatchOutcome::Decided { decision, elapsed } => match decision {
            MatchDecision::Matched { profile, best, top } => Json(MatchedResponse {
                matched_profile: profile,
                confidence: best.confidence,
                distance: best.distance,
                top3_candidates: top,
                match_time: elapsed.as_secs_f64(),
                success: true,
            })
            .into_response(),
            MatchDecision::NoConfidentMatch { best_distance, top } => Json(NoMatchResponse {
                matched_profile: None,
                message: NO_MATCH_MESSAGE,
                top3_candidates: top,
                best_distance,
            })
            .into_response(),
        },
    };
    Ok(response)
}
