//! JSON API for the chat front end.
//!
//! - `POST /api/chat`                      - run one chat turn
//! - `POST /api/reset`                     - reset a conversation
//! - `GET  /api/models`                    - configured models and years
//! - `GET  /api/models/{model}/accessories` - listing summary for a model/year
//! - `GET  /api/search?q=&model=&year=`    - accessory search
//! - `GET  /api/categories/types`          - backend accessory type list
//! - `GET  /api/categories/subtypes`       - backend accessory subtype list
//! - `GET  /api/sessions/{id}`             - conversation snapshot
//! - `DELETE /api/sessions/{id}`           - end a conversation

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use kitfinder_agent::{AssistantReply, AssistantRuntime};
use kitfinder_core::catalog::{CatalogError, CatalogSummary, FacetDescriptor, SearchResults};
use kitfinder_core::domain::model::{ModelSpec, DEFAULT_MODEL_YEAR};
use kitfinder_core::errors::{ApplicationError, InterfaceError};
use kitfinder_core::flows::ConversationSnapshot;
use kitfinder_core::session::SessionId;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AssistantRuntime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub session_id: SessionId,
    #[serde(flatten)]
    pub reply: AssistantReply,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    #[serde(flatten)]
    pub model: ModelSpec,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DescriptorsResponse {
    pub descriptors: Arc<[FacetDescriptor]>,
    pub count: usize,
}

impl From<Arc<[FacetDescriptor]>> for DescriptorsResponse {
    fn from(descriptors: Arc<[FacetDescriptor]>) -> Self {
        Self { count: descriptors.len(), descriptors }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub model: Option<String>,
    pub year: Option<u16>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub correlation_id: String,
}

/// HTTP rendering of an [`InterfaceError`].
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, Some(message.clone()))
            }
            InterfaceError::NotFound { message, .. } => {
                (StatusCode::NOT_FOUND, Some(message.clone()))
            }
            InterfaceError::ServiceUnavailable { .. } => (StatusCode::SERVICE_UNAVAILABLE, None),
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let body = ApiErrorBody {
            success: false,
            error: self.0.user_message(),
            detail,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(runtime: Arc<AssistantRuntime>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/reset", post(reset))
        .route("/api/models", get(models))
        .route("/api/models/{model}/accessories", get(model_accessories))
        .route("/api/search", get(search))
        .route("/api/categories/types", get(type_descriptors))
        .route("/api/categories/subtypes", get(subtype_descriptors))
        .route("/api/sessions/{id}", get(session_snapshot).delete(end_session))
        .with_state(ApiState { runtime })
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn invalid_input(message: &str, correlation_id: String) -> ApiError {
    ApplicationError::InvalidInput(message.to_string()).into_interface(correlation_id).into()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = correlation_id();
    if body.message.trim().is_empty() {
        return Err(invalid_input("message is required", correlation_id));
    }

    let session_id =
        non_blank(body.session_id).map(SessionId::from).unwrap_or_else(SessionId::generate);
    let reply = state.runtime.respond(&session_id, &body.message).await.map_err(|failure| {
        error!(
            event_name = "api.chat.failed",
            session_id = %session_id,
            correlation_id = %correlation_id,
            error = %failure,
            "chat turn failed"
        );
        ApiError::from(
            ApplicationError::Integration(failure.to_string()).into_interface(correlation_id.clone()),
        )
    })?;

    info!(
        event_name = "api.chat.completed",
        session_id = %session_id,
        correlation_id = %correlation_id,
        used_tool = reply.used_tool.as_deref().unwrap_or("none"),
        has_live_data = reply.has_live_data,
        "chat turn completed"
    );

    Ok(Json(ChatResponse {
        success: true,
        session_id,
        reply,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

async fn reset(
    State(state): State<ApiState>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    let Some(session_id) = non_blank(body.session_id).map(SessionId::from) else {
        return Err(invalid_input("sessionId is required", correlation_id()));
    };

    state.runtime.reset(&session_id).await;
    Ok(Json(ResetResponse {
        success: true,
        session_id,
        message: "Conversation reset successfully",
    }))
}

async fn models(State(state): State<ApiState>) -> Json<ModelsResponse> {
    let registry = state.runtime.conversations().catalog().registry();
    let models = registry
        .models()
        .iter()
        .map(|model| ModelSummary { display_name: model.display_name(), model: model.clone() })
        .collect::<Vec<_>>();

    Json(ModelsResponse { count: models.len(), models })
}

async fn model_accessories(
    State(state): State<ApiState>,
    Path(model): Path<String>,
    Query(query): Query<YearQuery>,
) -> Result<Json<CatalogSummary>, ApiError> {
    let year = query.year.unwrap_or(DEFAULT_MODEL_YEAR);
    let snapshot = state
        .runtime
        .conversations()
        .catalog()
        .load(&model.to_lowercase(), year)
        .await
        .map_err(|failure| ApplicationError::from(failure).into_interface(correlation_id()))?;

    Ok(Json(snapshot.summary()))
}

async fn search(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let term = query.q.trim();
    if term.is_empty() {
        return Err(invalid_input("search term (q) is required", correlation_id()));
    }

    let model = non_blank(query.model).map(|model| model.to_lowercase());
    let results = state
        .runtime
        .conversations()
        .catalog()
        .search(term, model.as_deref(), query.year)
        .await
        .map_err(|failure| ApplicationError::from(failure).into_interface(correlation_id()))?;

    Ok(Json(results))
}

async fn type_descriptors(
    State(state): State<ApiState>,
) -> Result<Json<DescriptorsResponse>, ApiError> {
    let listed = state.runtime.conversations().catalog().type_descriptors().await;
    descriptors_response(listed)
}

async fn subtype_descriptors(
    State(state): State<ApiState>,
) -> Result<Json<DescriptorsResponse>, ApiError> {
    let listed = state.runtime.conversations().catalog().subtype_descriptors().await;
    descriptors_response(listed)
}

fn descriptors_response(
    listed: Result<Arc<[FacetDescriptor]>, CatalogError>,
) -> Result<Json<DescriptorsResponse>, ApiError> {
    listed
        .map(|descriptors| Json(DescriptorsResponse::from(descriptors)))
        .map_err(|failure| ApplicationError::from(failure).into_interface(correlation_id()).into())
}

async fn session_snapshot(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSnapshot>, ApiError> {
    let session_id = SessionId::from(id);
    match state.runtime.conversations().snapshot(&session_id).await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err(ApplicationError::SessionNotFound(session_id.to_string())
            .into_interface(correlation_id())
            .into()),
    }
}

async fn end_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = SessionId::from(id);
    if state.runtime.conversations().end(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApplicationError::SessionNotFound(session_id.to_string())
            .into_interface(correlation_id())
            .into())
    }
}
