// Speech playback - hands text to the platform text-to-speech program

use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

/// Text-to-speech output
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking `text` in the given locale (e.g. `ja-JP`).
    /// Empty text is ignored.
    fn speak(&self, text: &str, locale: &str) -> Result<(), SpeechError>;
}

/// Runs an external TTS program per utterance, without waiting for it
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    /// `say` on macOS, `espeak-ng` elsewhere
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self {
                program: "say".to_string(),
                args: vec!["-v".to_string(), "{voice}".to_string()],
            }
        } else {
            Self {
                program: "espeak-ng".to_string(),
                args: vec!["-v".to_string(), "{voice}".to_string()],
            }
        }
    }

    /// Custom command line; `{locale}` and `{voice}` are substituted and
    /// the text is appended as the last argument
    pub fn from_command(command: &[String]) -> Result<Self, SpeechError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| SpeechError::InvalidCommand("empty speech command".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Program and arguments for one utterance
    pub fn command_line(&self, text: &str, locale: &str) -> (String, Vec<String>) {
        let voice = self.voice_for(locale);
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{locale}", locale).replace("{voice}", voice))
            .collect();
        args.push(text.to_string());
        (self.program.clone(), args)
    }

    fn voice_for(&self, locale: &str) -> &'static str {
        let say = self.program == "say";
        match (say, locale) {
            (true, "ja-JP") => "Kyoko",
            (true, "zh-CN") => "Tingting",
            (true, _) => "Samantha",
            (false, "ja-JP") => "ja",
            (false, "zh-CN") => "cmn",
            (false, _) => "en-us",
        }
    }
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn speak(&self, text: &str, locale: &str) -> Result<(), SpeechError> {
        if text.is_empty() {
            return Ok(());
        }

        let (program, args) = self.command_line(text, locale);
        debug!(%program, locale, "speaking");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Spawn(format!("{}: {}", program, e)))?;

        // reaped off-thread; the caller never waits on playback
        thread::spawn(move || {
            if let Err(e) = child.wait() {
                warn!(error = %e, "speech program did not exit cleanly");
            }
        });

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Invalid speech command: {0}")]
    InvalidCommand(String),

    #[error("Failed to start speech program: {0}")]
    Spawn(String),
}
