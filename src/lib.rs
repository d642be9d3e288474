//! SariCoach - Store Coach Assistant Library
//!
//! The interaction engine behind the "Ask Coach" panel:
//! - Single-flight question session with an observable state
//! - HTTP client for the coach backend (`POST /api/coach/ask`)
//! - Spoken answers through a pluggable speech engine
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sari_coach::{AssistantSession, CoachClient, SpeechAnnouncer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CoachClient::new("http://127.0.0.1:8000")?;
//!     let session = AssistantSession::new(1, Arc::new(client), Arc::new(SpeechAnnouncer::silent()));
//!     session.submit("Why is revenue down?");
//!     println!("{:?}", session.settled().await);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod coach;
pub mod config;
pub mod voice;
pub mod cli;

// Re-export commonly used types for convenience
pub use coach::{
    AskError,
    AssistantSession,
    Coach,
    CoachClient,
    InteractionState,
    SubmitOutcome,
    FALLBACK_MESSAGE,
};

pub use config::Config;

pub use types::{Answer, Question};

pub use voice::{
    SpeechAnnouncer,
    SpeechEngine,
    SilentEngine,
    ProcessEngine,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Store Coach Assistant Library", NAME, VERSION)
}
