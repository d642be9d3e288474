//! Voice Module
//!
//! Spoken answers:
//! - `engine`: the platform speech capability (silent or process-backed)
//! - `announcer`: cancel-before-speak announcer with voice selection
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sari_coach::voice::{ProcessEngine, SpeechAnnouncer};
//!
//! let announcer = SpeechAnnouncer::new(Arc::new(ProcessEngine::new("espeak-ng")));
//! announcer.announce("Sales are up 8% this week.");
//! ```

pub mod announcer;
pub mod engine;

pub use announcer::{select_voice, AnnouncerConfig, SpeechAnnouncer};
pub use engine::{ProcessEngine, SilentEngine, SpeechEngine, Utterance, Voice};
