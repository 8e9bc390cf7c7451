use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::CatalogClient;
use crate::config::AppConfig;
use crate::flows::{
    ConversationSnapshot, FlowEngine, FlowError, FlowResult, ResponseBuilder, TurnOutcome,
};
use crate::session::{SessionId, SessionStore};

const ACTOR: &str = "flow-engine";

/// Entry point for callers: runs turns against session-keyed conversations.
pub struct ConversationService {
    engine: FlowEngine,
    responses: ResponseBuilder,
    sessions: SessionStore,
    audit: Arc<dyn AuditSink>,
}

impl ConversationService {
    pub fn new(
        engine: FlowEngine,
        responses: ResponseBuilder,
        sessions: SessionStore,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { engine, responses, sessions, audit }
    }

    pub fn from_config(
        catalog: Arc<CatalogClient>,
        config: &AppConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::new(
            FlowEngine::new(catalog),
            ResponseBuilder::from_config(&config.catalog),
            SessionStore::new(Duration::from_secs(config.sessions.idle_ttl_secs)),
            audit,
        )
    }

    pub fn catalog(&self) -> &CatalogClient {
        self.engine.catalog()
    }

    pub async fn advance(
        &self,
        session_id: &SessionId,
        utterance: &str,
    ) -> Result<FlowResult, FlowError> {
        let context =
            AuditContext::new(Some(session_id.to_string()), Uuid::new_v4().to_string(), ACTOR);
        let slot = self.sessions.checkout(session_id);
        let mut state = slot.state().lock().await;

        let turn = match self.engine.advance(&mut state, utterance).await {
            Ok(turn) => turn,
            Err(error) => {
                warn!(
                    event_name = "flow.turn.failed",
                    session_id = %session_id,
                    correlation_id = %context.correlation_id,
                    step = %state.step,
                    error = %error,
                    "flow turn failed"
                );
                self.audit.emit(
                    AuditEvent::new(&context, "flow.turn_failed", AuditCategory::Flow, AuditOutcome::Failed)
                        .with_metadata("step", state.step.as_str())
                        .with_metadata("error", error.to_string()),
                );
                slot.touch();
                return Err(error);
            }
        };

        let result = self.responses.build(&turn);
        self.record_turn(&context, &turn, &result);
        slot.touch();
        Ok(result)
    }

    /// Returns the session to its initial state. Resetting twice is the same as
    /// resetting once.
    pub async fn reset(&self, session_id: &SessionId) {
        let slot = self.sessions.checkout(session_id);
        slot.state().lock().await.reset();

        info!(event_name = "session.reset", session_id = %session_id, "conversation reset");
        let context =
            AuditContext::new(Some(session_id.to_string()), Uuid::new_v4().to_string(), ACTOR);
        self.audit.emit(AuditEvent::new(
            &context,
            "session.reset",
            AuditCategory::Session,
            AuditOutcome::Success,
        ));
    }

    pub async fn snapshot(&self, session_id: &SessionId) -> Option<ConversationSnapshot> {
        let slot = self.sessions.get(session_id)?;
        let state = slot.state().lock().await;
        Some(state.snapshot())
    }

    pub fn end(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            info!(event_name = "session.ended", session_id = %session_id, "session ended");
        }
        removed
    }

    pub fn evict_idle(&self) -> usize {
        let evicted = self.sessions.evict_idle();
        for session_id in &evicted {
            info!(event_name = "session.evicted", session_id = %session_id, "idle session evicted");
        }
        evicted.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn record_turn(&self, context: &AuditContext, turn: &TurnOutcome, result: &FlowResult) {
        let outcome = if result.success { AuditOutcome::Success } else { AuditOutcome::Rejected };
        info!(
            event_name = "flow.turn.applied",
            session_id = context.session_id.as_deref().unwrap_or("-"),
            correlation_id = %context.correlation_id,
            from = %turn.from,
            to = %turn.to,
            success = result.success,
            "flow turn applied"
        );

        let mut event =
            AuditEvent::new(context, "flow.turn_applied", AuditCategory::Flow, outcome)
                .with_metadata("from", turn.from.as_str())
                .with_metadata("to", turn.to.as_str());
        if let Some(error) = result.error {
            event = event.with_metadata("error", format!("{error:?}"));
        }
        self.audit.emit(event);
    }
}
