//! Coach Module
//!
//! The question/answer side of the assistant:
//! - `client`: one HTTP exchange with the coach backend
//! - `session`: single-flight state machine driving the panel and speech
//! - `error`: classified request failures

pub mod client;
pub mod error;
pub mod session;

pub use client::{Coach, CoachClient};
pub use error::AskError;
pub use session::{AssistantSession, InteractionState, SubmitOutcome, FALLBACK_MESSAGE};
