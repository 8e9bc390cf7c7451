pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod service;
pub mod session;

pub use catalog::{
    CatalogClient, CatalogError, CatalogSnapshot, CatalogSource, CatalogSummary, Facet,
    FacetDescriptor, InMemoryCatalogSource, PriceRange, SearchResults,
};
pub use config::{AppConfig, CatalogStrategy, LlmProvider, LoadOptions, LogFormat};
pub use domain::accessory::{AccessoryList, AccessoryRecord};
pub use domain::model::{ModelRegistry, ModelSpec, DEFAULT_MODEL_YEAR};
pub use errors::{ApplicationError, InterfaceError};
pub use flows::{
    ConversationSnapshot, ConversationState, FlowEngine, FlowError, FlowErrorKind, FlowResult,
    FlowStep, ProductView, ResponseBuilder,
};
pub use service::ConversationService;
pub use session::{SessionId, SessionStore};
