pub mod engine;
pub mod matcher;
pub mod response;
pub mod states;

pub use engine::{FlowEngine, FlowError, FlowOutcome, TurnOutcome};
pub use matcher::Utterance;
pub use response::{FlowErrorKind, FlowResult, ProductView, ResponseBuilder};
pub use states::{ConversationSnapshot, ConversationState, FlowStep};
