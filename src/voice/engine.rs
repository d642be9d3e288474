//! Speech Engine Capability
//!
//! The platform's speech synthesizer, seen through a small trait so the rest
//! of the crate never touches audio directly.
//!
//! # Engines
//!
//! - [`SilentEngine`]: no audio at all (headless hosts, tests)
//! - [`ProcessEngine`]: drives a command-line synthesizer such as `espeak-ng`,
//!   one child process per utterance

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Default synthesizer program
pub const DEFAULT_SPEECH_PROGRAM: &str = "espeak-ng";

/// espeak words-per-minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// espeak pitch (0-99) at pitch 1.0
const BASE_PITCH: f32 = 50.0;

/// A voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Display name, used for preference matching
    pub name: String,
    /// Language tag if the platform reports one
    pub language: Option<String>,
}

impl Voice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// One spoken rendering of a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` means the platform default voice
    pub voice: Option<Voice>,
    /// Speaking rate (1.0 = normal)
    pub rate: f32,
    /// Pitch (1.0 = neutral)
    pub pitch: f32,
}

/// Platform speech synthesis.
///
/// `speak` starts playback and returns immediately. Callers are expected to
/// `cancel` before speaking; engines do not queue. Methods may block on
/// child processes, so async callers go through `spawn_blocking`.
pub trait SpeechEngine: Send + Sync {
    /// Whether the host can produce speech at all
    fn is_available(&self) -> bool;

    /// Voices currently known to the platform. May be empty.
    fn voices(&self) -> Vec<Voice>;

    /// Stop whatever is speaking or queued
    fn cancel(&self);

    /// Start speaking an utterance
    fn speak(&self, utterance: Utterance) -> Result<()>;
}

/// Engine for hosts without audio output
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentEngine;

impl SpeechEngine for SilentEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn cancel(&self) {}

    fn speak(&self, _utterance: Utterance) -> Result<()> {
        Ok(())
    }
}

/// Command-line synthesizer engine (espeak-ng compatible flags)
pub struct ProcessEngine {
    program: String,
    resolved: Option<PathBuf>,
    active: Mutex<Option<Child>>,
}

impl ProcessEngine {
    /// Create an engine for the given program, resolved on `PATH`
    pub fn new(program: &str) -> Self {
        let resolved = find_on_path(program);
        match &resolved {
            Some(path) => info!("Speech engine: {}", path.display()),
            None => info!("Speech program '{}' not found, speech disabled", program),
        }

        Self {
            program: program.to_string(),
            resolved,
            active: Mutex::new(None),
        }
    }

    /// Program name as configured
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_for(&self, utterance: &Utterance) -> Option<Command> {
        let path = self.resolved.as_ref()?;
        let mut cmd = Command::new(path);
        cmd.arg("-s")
            .arg(words_per_minute(utterance.rate).to_string())
            .arg("-p")
            .arg(pitch_level(utterance.pitch).to_string());
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.name);
        }
        cmd.arg(&utterance.text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Some(cmd)
    }
}

impl SpeechEngine for ProcessEngine {
    fn is_available(&self) -> bool {
        self.resolved.is_some()
    }

    fn voices(&self) -> Vec<Voice> {
        let Some(path) = &self.resolved else {
            return Vec::new();
        };

        match Command::new(path).arg("--voices").output() {
            Ok(output) if output.status.success() => {
                parse_voice_table(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                debug!("Voice listing exited with {}", output.status);
                Vec::new()
            }
            Err(e) => {
                debug!("Voice listing failed: {}", e);
                Vec::new()
            }
        }
    }

    fn cancel(&self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut child) = active.take() {
            if let Ok(None) = child.try_wait() {
                debug!("Cancelling active utterance (pid {})", child.id());
                if let Err(e) = child.kill() {
                    warn!("Failed to stop speech process: {}", e);
                }
            }
            let _ = child.wait();
        }
    }

    fn speak(&self, utterance: Utterance) -> Result<()> {
        let Some(mut cmd) = self.command_for(&utterance) else {
            return Ok(());
        };

        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to start speech program '{}'", self.program))?;

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut previous) = active.replace(child) {
            // Only reached if a caller skipped cancel()
            let _ = previous.kill();
            let _ = previous.wait();
        }
        Ok(())
    }
}

/// Map a rate multiplier to espeak words per minute
pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate.clamp(0.1, 4.0)).round() as u32
}

/// Map a pitch multiplier to espeak's 0-99 scale
pub fn pitch_level(pitch: f32) -> u32 {
    (BASE_PITCH * pitch).clamp(0.0, 99.0).round() as u32
}

/// Parse the `--voices` table printed by espeak-ng.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
pub fn parse_voice_table(table: &str) -> Vec<Voice> {
    table
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 {
                return None;
            }
            Some(Voice::new(columns[3]).with_language(columns[1]))
        })
        .collect()
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = PathBuf::from(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}
