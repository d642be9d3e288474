//! Speech Announcer
//!
//! Speaks coach answers aloud. Best effort and fire-and-forget: a missing
//! engine or an engine error only means silence.
//!
//! At most one utterance is ever active. Every `announce` cancels whatever
//! is playing before starting the new one, so a quick second answer cuts
//! the first one off instead of queueing behind it.
//!
//! Announcements are ordered by ticket. A ticket is taken when an answer is
//! shown, and an announcement whose ticket has been overtaken by a newer one
//! is dropped, so an old answer is never heard over a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::config::SpeechConfig;
use crate::voice::engine::{ProcessEngine, SilentEngine, SpeechEngine, Utterance, Voice};

/// Slightly faster than normal speech
pub const DEFAULT_RATE: f32 = 1.1;

/// Neutral pitch
pub const DEFAULT_PITCH: f32 = 1.0;

/// Name fragments that mark a preferred voice, checked in order per voice
pub const DEFAULT_PREFERRED_VOICES: [&str; 2] = ["Google", "Female"];

/// Utterance settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncerConfig {
    pub rate: f32,
    pub pitch: f32,
    /// Case-sensitive substrings; a voice whose name contains any of them
    /// is preferred over the platform default
    pub preferred_voices: Vec<String>,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
            preferred_voices: DEFAULT_PREFERRED_VOICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl From<&SpeechConfig> for AnnouncerConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            preferred_voices: config.preferred_voices.clone(),
        }
    }
}

/// Announces answers through a speech engine
pub struct SpeechAnnouncer {
    engine: Arc<dyn SpeechEngine>,
    config: AnnouncerConfig,
    /// Latest ticket handed out
    issued: AtomicU64,
    /// Ticket of the last utterance given to the engine. Held from the
    /// staleness check through cancel and speak.
    spoken: Mutex<u64>,
}

impl SpeechAnnouncer {
    /// Create an announcer with default settings
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self::with_config(engine, AnnouncerConfig::default())
    }

    /// Create an announcer with custom settings
    pub fn with_config(engine: Arc<dyn SpeechEngine>, config: AnnouncerConfig) -> Self {
        Self {
            engine,
            config,
            issued: AtomicU64::new(0),
            spoken: Mutex::new(0),
        }
    }

    /// Announcer that never makes a sound
    pub fn silent() -> Self {
        Self::new(Arc::new(SilentEngine))
    }

    /// Build from the `[speech]` config section
    pub fn from_config(config: &SpeechConfig) -> Self {
        if !config.enabled {
            return Self::silent();
        }
        Self::with_config(
            Arc::new(ProcessEngine::new(&config.program)),
            AnnouncerConfig::from(config),
        )
    }

    pub fn config(&self) -> &AnnouncerConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn SpeechEngine> {
        &self.engine
    }

    /// Speak `text`, cutting off anything already playing
    pub fn announce(&self, text: &str) {
        let ticket = self.next_ticket();
        self.announce_ticket(ticket, text);
    }

    /// Reserve the next place in the announcement order.
    ///
    /// Taking a ticket makes every earlier, not yet spoken ticket stale.
    pub fn next_ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Speak `text` unless a newer ticket has been taken in the meantime.
    ///
    /// Blocks while the engine lists voices and starts playback; call it off
    /// the async executor.
    pub fn announce_ticket(&self, ticket: u64, text: &str) {
        if !self.engine.is_available() {
            debug!("No speech engine available, skipping announcement");
            return;
        }

        let mut spoken = self.spoken.lock().unwrap_or_else(|e| e.into_inner());
        if *spoken >= ticket || self.is_stale(ticket) {
            debug!(ticket, "Skipping superseded announcement");
            return;
        }

        let utterance = self.utterance_for(text);

        // Voice listing can be slow; a newer answer may have arrived meanwhile
        if self.is_stale(ticket) {
            debug!(ticket, "Skipping superseded announcement");
            return;
        }

        self.engine.cancel();

        debug!(
            ticket,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            chars = text.chars().count(),
            "Announcing answer"
        );

        if let Err(e) = self.engine.speak(utterance) {
            warn!("Speech playback failed: {:#}", e);
        }
        *spoken = ticket;
    }

    fn is_stale(&self, ticket: u64) -> bool {
        ticket < self.issued.load(Ordering::SeqCst)
    }

    /// Build the utterance `announce` would speak
    pub fn utterance_for(&self, text: &str) -> Utterance {
        let voices = self.engine.voices();
        Utterance {
            text: text.to_string(),
            voice: select_voice(&voices, &self.config.preferred_voices).cloned(),
            rate: self.config.rate,
            pitch: self.config.pitch,
        }
    }

    /// Voice the announcer would currently pick, `None` for the default
    pub fn chosen_voice(&self) -> Option<Voice> {
        let voices = self.engine.voices();
        select_voice(&voices, &self.config.preferred_voices).cloned()
    }
}

/// First voice whose name contains one of the markers.
///
/// An empty voice list (common right after start-up, before the platform has
/// loaded its voices) simply means the default voice.
pub fn select_voice<'a>(voices: &'a [Voice], markers: &[String]) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|voice| markers.iter().any(|m| voice.name.contains(m.as_str())))
}
