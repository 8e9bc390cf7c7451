use std::sync::Arc;

use anyhow::{bail, Result};
use kitfinder_core::flows::FlowResult;
use kitfinder_core::service::ConversationService;
use kitfinder_core::session::SessionId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::prompt::PromptBuilder;
use crate::template::TemplateResponder;

const FLOW_TOOL: &str = "conversation_flow";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_tool: Option<String>,
    pub has_live_data: bool,
    pub is_offline: bool,
    pub is_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowResult>,
}

pub struct AssistantRuntime {
    conversations: Arc<ConversationService>,
    llm: Option<Arc<dyn LlmClient>>,
    prompts: PromptBuilder,
    templates: TemplateResponder,
}

impl AssistantRuntime {
    pub fn new(conversations: Arc<ConversationService>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        let prompts = PromptBuilder::new(conversations.catalog().registry());
        Self { conversations, llm, prompts, templates: TemplateResponder }
    }

    pub fn conversations(&self) -> &Arc<ConversationService> {
        &self.conversations
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// One chat turn: advance the session's flow, then phrase the result.
    pub async fn respond(&self, session_id: &SessionId, message: &str) -> Result<AssistantReply> {
        let message = message.trim();
        if message.is_empty() {
            bail!("message must not be empty");
        }

        let flow = match self.conversations.advance(session_id, message).await {
            Ok(flow) => Some(flow),
            Err(error) => {
                warn!(
                    event_name = "assistant.flow.unavailable",
                    session_id = %session_id,
                    error = %error,
                    "flow turn failed; answering without live data"
                );
                None
            }
        };

        let response = self.phrase(session_id, message, flow.as_ref()).await;
        let is_offline = flow.as_ref().is_some_and(|flow| flow.is_offline);
        let is_empty = flow.as_ref().is_some_and(|flow| flow.is_empty);
        let has_live_data = flow.as_ref().is_some_and(|flow| flow.success || flow.is_empty);

        Ok(AssistantReply {
            response,
            used_tool: flow.as_ref().map(|_| FLOW_TOOL.to_string()),
            has_live_data,
            is_offline,
            is_empty,
            flow,
        })
    }

    pub async fn reset(&self, session_id: &SessionId) {
        self.conversations.reset(session_id).await;
    }

    async fn phrase(&self, session_id: &SessionId, message: &str, flow: Option<&FlowResult>) -> String {
        let Some(llm) = &self.llm else {
            return self.templates.render(flow);
        };

        let prompt = self.prompts.build(message, flow);
        match llm.complete(&prompt).await {
            Ok(text) => {
                info!(
                    event_name = "assistant.reply.generated",
                    session_id = %session_id,
                    "assistant reply generated by language model"
                );
                text
            }
            Err(error) => {
                warn!(
                    event_name = "assistant.llm.fallback",
                    session_id = %session_id,
                    error = %error,
                    "language model failed; using template reply"
                );
                self.templates.render(flow)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use kitfinder_core::audit::InMemoryAuditSink;
    use kitfinder_core::catalog::fixtures::demo_source;
    use kitfinder_core::catalog::memory::SourceMode;
    use kitfinder_core::catalog::CatalogClient;
    use kitfinder_core::config::CatalogStrategy;
    use kitfinder_core::domain::model::ModelRegistry;
    use kitfinder_core::flows::{FlowEngine, ResponseBuilder};
    use kitfinder_core::service::ConversationService;
    use kitfinder_core::session::{SessionId, SessionStore};
    use kitfinder_core::InMemoryCatalogSource;

    use crate::llm::LlmClient;
    use crate::runtime::AssistantRuntime;

    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("prompt lock").push(prompt.to_string());
            Ok("model reply".to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    fn conversations(source: Arc<InMemoryCatalogSource>) -> Arc<ConversationService> {
        let catalog = Arc::new(CatalogClient::new(
            source,
            ModelRegistry::default(),
            CatalogStrategy::Bulk,
            Duration::from_secs(300),
        ));
        Arc::new(ConversationService::new(
            FlowEngine::new(catalog),
            ResponseBuilder::default(),
            SessionStore::new(Duration::from_secs(60)),
            Arc::new(InMemoryAuditSink::default()),
        ))
    }

    #[tokio::test]
    async fn template_reply_without_llm() {
        let runtime = AssistantRuntime::new(conversations(Arc::new(demo_source())), None);

        let reply =
            runtime.respond(&SessionId::from("s1"), "i20 2018").await.expect("reply");

        assert!(reply.has_live_data);
        assert_eq!(reply.used_tool.as_deref(), Some("conversation_flow"));
        assert!(reply.response.contains("- Exteriors (4 items)"));
        assert!(!runtime.has_llm());
    }

    #[tokio::test]
    async fn llm_receives_live_data_prompt() {
        let llm = Arc::new(RecordingLlm::default());
        let client: Arc<dyn LlmClient> = llm.clone();
        let runtime = AssistantRuntime::new(conversations(Arc::new(demo_source())), Some(client));

        let reply = runtime.respond(&SessionId::from("s1"), "creta 2024").await.expect("reply");

        assert_eq!(reply.response, "model reply");
        let prompts = llm.prompts.lock().expect("prompt lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Real-time data"));
        assert!(prompts[0].contains("User query: \"creta 2024\""));
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_template() {
        let client: Arc<dyn LlmClient> = Arc::new(FailingLlm);
        let runtime = AssistantRuntime::new(conversations(Arc::new(demo_source())), Some(client));

        let reply = runtime.respond(&SessionId::from("s1"), "alcazar 2019").await.expect("reply");

        assert!(reply.is_empty);
        assert!(reply.has_live_data);
        assert!(reply.response.contains("Try ALCAZAR with years"));
    }

    #[tokio::test]
    async fn offline_catalog_is_flagged() {
        let source = Arc::new(demo_source());
        source.set_mode(SourceMode::Offline);
        let runtime = AssistantRuntime::new(conversations(source), None);

        let reply = runtime.respond(&SessionId::from("s1"), "venue 2023").await.expect("reply");

        assert!(reply.is_offline);
        assert!(!reply.has_live_data);
        assert!(reply.response.contains("currently unavailable"));
    }

    #[tokio::test]
    async fn protocol_failure_continues_without_flow_data() {
        let source = Arc::new(demo_source());
        source.set_mode(SourceMode::ProtocolFailure);
        let runtime = AssistantRuntime::new(conversations(source), None);

        let reply = runtime.respond(&SessionId::from("s1"), "venue 2023").await.expect("reply");

        assert!(reply.flow.is_none());
        assert!(reply.used_tool.is_none());
        assert!(reply.response.contains("car model and year"));
    }

    #[tokio::test]
    async fn empty_messages_are_rejected() {
        let runtime = AssistantRuntime::new(conversations(Arc::new(demo_source())), None);

        assert!(runtime.respond(&SessionId::from("s1"), "   ").await.is_err());
    }
}
