use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use kitfinder_agent::AssistantRuntime;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    runtime: Arc<AssistantRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub catalog: HealthCheck,
    pub llm: HealthCheck,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(runtime: Arc<AssistantRuntime>) -> Router {
    Router::new().route("/api/health", get(health)).with_state(HealthState { runtime })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let conversations = state.runtime.conversations();
    let catalog = conversations.catalog();

    let payload = HealthResponse {
        status: "healthy",
        catalog: HealthCheck {
            status: "ready",
            detail: format!(
                "{} strategy across {} models",
                catalog.strategy().as_str(),
                catalog.registry().len()
            ),
        },
        llm: if state.runtime.has_llm() {
            HealthCheck { status: "ready", detail: "language model configured".to_string() }
        } else {
            HealthCheck { status: "disabled", detail: "template replies only".to_string() }
        },
        active_sessions: conversations.len(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use kitfinder_core::catalog::fixtures::demo_source;
    use kitfinder_core::config::AppConfig;
    use kitfinder_core::session::SessionId;

    use crate::bootstrap::assemble;
    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_components_and_session_count() {
        let app = assemble(AppConfig::default(), Arc::new(demo_source())).expect("assemble");
        app.runtime.respond(&SessionId::from("one"), "venue 2023").await.expect("reply");

        let (status, Json(payload)) =
            health(State(HealthState { runtime: app.runtime.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "healthy");
        assert_eq!(payload.catalog.detail, "bulk strategy across 6 models");
        assert_eq!(payload.llm.status, "disabled");
        assert_eq!(payload.active_sessions, 1);
    }
}
