use std::sync::Arc;
use std::time::Duration;

use kitfinder_agent::{build_llm_client, AssistantRuntime};
use kitfinder_catalog::{HttpCatalogSource, HttpCatalogSourceConfig};
use kitfinder_core::audit::TracingAuditSink;
use kitfinder_core::catalog::{CatalogClient, CatalogError, CatalogSource};
use kitfinder_core::config::{AppConfig, ConfigError};
use kitfinder_core::service::ConversationService;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AssistantRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog client setup failed: {0}")]
    Catalog(#[source] CatalogError),
    #[error("llm client setup failed: {0}")]
    LlmClient(String),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        catalog_base_url = %config.catalog.base_url,
        strategy = config.catalog.strategy.as_str(),
        "starting application bootstrap"
    );

    let source = HttpCatalogSource::new(HttpCatalogSourceConfig::from(&config.catalog))
        .map_err(BootstrapError::Catalog)?;
    assemble(config, Arc::new(source))
}

/// Wires the catalog, conversation service and assistant runtime over an
/// already-built catalog source.
pub fn assemble(
    config: AppConfig,
    source: Arc<dyn CatalogSource>,
) -> Result<Application, BootstrapError> {
    let catalog = Arc::new(CatalogClient::from_config(source, &config.catalog));
    let conversations =
        Arc::new(ConversationService::from_config(catalog, &config, Arc::new(TracingAuditSink)));
    let llm = build_llm_client(&config.llm)
        .map_err(|error| BootstrapError::LlmClient(format!("{error:#}")))?;

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        model_count = config.catalog.models.len(),
        "application components assembled"
    );

    let runtime = Arc::new(AssistantRuntime::new(conversations, llm));
    Ok(Application { config, runtime })
}

/// Periodically drops conversations idle longer than the session TTL.
pub fn spawn_session_sweeper(
    conversations: Arc<ConversationService>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = conversations.evict_idle();
            if evicted > 0 {
                info!(
                    event_name = "session.sweep.completed",
                    evicted,
                    remaining = conversations.len(),
                    "idle session sweep completed"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kitfinder_core::catalog::fixtures::demo_source;
    use kitfinder_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};
    use kitfinder_core::session::SessionId;

    use crate::bootstrap::{
        assemble, bootstrap_with_config, spawn_session_sweeper, BootstrapError,
    };

    #[tokio::test]
    async fn bootstrap_builds_http_catalog_without_contacting_it() {
        let app = bootstrap_with_config(AppConfig::default()).await.expect("bootstrap");

        assert_eq!(app.config.server.port, 4000);
        assert!(app.runtime.conversations().is_empty());
    }

    #[test]
    fn invalid_config_surfaces_as_bootstrap_error() {
        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                catalog_base_url: Some("ftp://catalog.internal".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(BootstrapError::from)
        .err()
        .expect("invalid url is rejected");

        assert!(error.to_string().contains("catalog.base_url"));
    }

    #[tokio::test]
    async fn assembled_runtime_answers_from_the_catalog_source() {
        let app = assemble(AppConfig::default(), Arc::new(demo_source())).expect("assemble");

        let reply = app
            .runtime
            .respond(&SessionId::from("smoke"), "creta 2024")
            .await
            .expect("reply");

        assert!(reply.has_live_data);
        assert!(!app.runtime.has_llm());
    }

    #[tokio::test]
    async fn ollama_without_base_url_is_a_bootstrap_error() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Ollama;
        config.llm.base_url = None;

        assert!(assemble(config, Arc::new(demo_source())).is_err());
    }

    #[tokio::test]
    async fn sweeper_evicts_idle_sessions() {
        let mut config = AppConfig::default();
        config.sessions.idle_ttl_secs = 0;
        let app = assemble(config, Arc::new(demo_source())).expect("assemble");
        let conversations = app.runtime.conversations().clone();
        conversations.advance(&SessionId::from("idle"), "venue").await.expect("turn");

        let sweeper = spawn_session_sweeper(conversations.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.abort();

        assert!(conversations.is_empty());
    }
}
