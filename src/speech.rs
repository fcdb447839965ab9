//! Speech synthesis seam used by guided exercises and meditations.

use std::io::Write;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SpeechError {
    #[error("speech rate {0} is outside 0.1..=10")]
    Rate(f32),
    #[error("speech volume {0} is outside 0..=1")]
    Volume(f32),
    #[error("narration output failed: {0}")]
    Output(String),
}

/// Voice parameters with the same ranges browser speech synthesis accepts.
/// `rate` scales narration pace: 2.0 halves every pause, 0.5 doubles it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSettings {
    pub rate: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 1.0,
        }
    }
}

impl VoiceSettings {
    pub fn new(rate: f32, volume: f32) -> Result<Self, SpeechError> {
        if !(0.1..=10.0).contains(&rate) {
            return Err(SpeechError::Rate(rate));
        }
        if !(0.0..=1.0).contains(&volume) {
            return Err(SpeechError::Volume(volume));
        }
        Ok(Self { rate, volume })
    }
}

pub trait Narrator {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;

    /// How long to hold a pause at this narrator's speaking rate.
    fn pace(&self, pause: Duration) -> Duration {
        pause
    }
}

/// Prints utterances as lines of text.
pub struct ConsoleNarrator<W: Write> {
    out: W,
    settings: VoiceSettings,
}

impl<W: Write> ConsoleNarrator<W> {
    pub fn new(out: W, settings: VoiceSettings) -> Self {
        tracing::debug!(?settings, "console narrator ready");
        Self { out, settings }
    }
}

impl<W: Write> Narrator for ConsoleNarrator<W> {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        // Zero volume mutes narration entirely.
        if self.settings.volume == 0.0 {
            return Ok(());
        }
        writeln!(self.out, "  {text}")
            .and_then(|_| self.out.flush())
            .map_err(|err| SpeechError::Output(err.to_string()))
    }

    fn pace(&self, pause: Duration) -> Duration {
        if self.settings.rate == 1.0 {
            return pause;
        }
        pause.div_f64(f64::from(self.settings.rate))
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNarrator {
    pub spoken: Vec<String>,
}

#[cfg(test)]
impl Narrator for RecordingNarrator {
    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.spoken.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_voice() {
        assert_eq!(VoiceSettings::new(0.0, 1.0), Err(SpeechError::Rate(0.0)));
        assert_eq!(VoiceSettings::new(12.0, 1.0), Err(SpeechError::Rate(12.0)));
        assert_eq!(VoiceSettings::new(1.0, 1.5), Err(SpeechError::Volume(1.5)));
        assert!(VoiceSettings::new(1.2, 0.5).is_ok());
    }

    #[test]
    fn rate_scales_pauses() {
        let normal = ConsoleNarrator::new(Vec::new(), VoiceSettings::default());
        assert_eq!(normal.pace(Duration::from_secs(4)), Duration::from_secs(4));

        let fast = ConsoleNarrator::new(Vec::new(), VoiceSettings::new(2.0, 1.0).expect("valid"));
        assert_eq!(fast.pace(Duration::from_secs(4)), Duration::from_secs(2));

        let slow = ConsoleNarrator::new(Vec::new(), VoiceSettings::new(0.5, 1.0).expect("valid"));
        assert_eq!(slow.pace(Duration::from_secs(4)), Duration::from_secs(8));
    }

    #[test]
    fn console_narrator_writes_lines() {
        let mut buffer = Vec::new();
        {
            let mut narrator = ConsoleNarrator::new(&mut buffer, VoiceSettings::default());
            narrator.speak("Breathe in").expect("speak");
            narrator.speak("Breathe out").expect("speak");
        }
        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(text, "  Breathe in\n  Breathe out\n");
    }

    #[test]
    fn muted_narrator_stays_silent() {
        let mut buffer = Vec::new();
        let muted = VoiceSettings::new(1.0, 0.0).expect("valid settings");
        ConsoleNarrator::new(&mut buffer, muted)
            .speak("Breathe in")
            .expect("speak");
        assert!(buffer.is_empty());
    }
}
