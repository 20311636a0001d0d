//! Speech dispatch.
//!
//! Approved announcements are handed to a `SpeechEngine` on a detached
//! thread. The frame loop never waits for synthesis or playback and never
//! sees their outcome; failures are logged and dropped.

mod command;

pub use command::{sanitize_text, CommandSpeechEngine};

use anyhow::{anyhow, Result};
use std::sync::Arc;

use crate::config::SpeechSettings;

/// Text-to-speech backend. Blocking; always called off the frame loop thread.
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize `text` in `language` and start playing it. Returns once
    /// playback has started; a newer utterance may cut the previous one off.
    fn synthesize_and_play(&self, text: &str, language: &str) -> Result<()>;
}

/// Engine that only logs the sentence. For headless runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSpeechEngine;

impl SpeechEngine for LogSpeechEngine {
    fn name(&self) -> &'static str {
        "log"
    }

    fn synthesize_and_play(&self, text: &str, language: &str) -> Result<()> {
        log::info!("LogSpeechEngine: [{}] {}", language, text);
        Ok(())
    }
}

/// Build the engine named in the configuration.
pub fn build_engine(settings: &SpeechSettings) -> Result<Arc<dyn SpeechEngine>> {
    match settings.engine.as_str() {
        "command" => Ok(Arc::new(CommandSpeechEngine::new(
            settings.synth_command.clone(),
            settings.player_command.clone(),
            settings.audio_path.clone(),
        )?)),
        "log" => Ok(Arc::new(LogSpeechEngine)),
        other => Err(anyhow!("unknown speech engine '{}'", other)),
    }
}

/// Fire-and-forget front end over a `SpeechEngine`.
pub struct SpeechDispatcher {
    engine: Arc<dyn SpeechEngine>,
    language: String,
    dispatched: u64,
}

impl SpeechDispatcher {
    pub fn new(engine: Arc<dyn SpeechEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
            dispatched: 0,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Number of utterances handed off so far (attempts, not successes).
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Speak `text` in the background. Returns immediately.
    pub fn speak(&mut self, text: &str) {
        self.dispatched += 1;
        let engine = Arc::clone(&self.engine);
        let language = self.language.clone();
        let text = text.to_string();
        let spawned = std::thread::Builder::new()
            .name(format!("speech-{}", self.dispatched))
            .spawn(move || {
                if let Err(err) = engine.synthesize_and_play(&text, &language) {
                    log::warn!(
                        "SpeechDispatcher: {} engine failed, announcement skipped: {:#}",
                        engine.name(),
                        err
                    );
                }
            });
        // The join handle is dropped on purpose: playback is never awaited.
        if let Err(err) = spawned {
            log::warn!("SpeechDispatcher: failed to spawn speech thread: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ChannelEngine {
        tx: Mutex<mpsc::Sender<(String, String)>>,
    }

    impl SpeechEngine for ChannelEngine {
        fn name(&self) -> &'static str {
            "channel"
        }

        fn synthesize_and_play(&self, text: &str, language: &str) -> Result<()> {
            self.tx
                .lock()
                .unwrap()
                .send((text.to_string(), language.to_string()))
                .unwrap();
            Ok(())
        }
    }

    struct SlowFailingEngine;

    impl SpeechEngine for SlowFailingEngine {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn synthesize_and_play(&self, _text: &str, _language: &str) -> Result<()> {
            std::thread::sleep(Duration::from_millis(500));
            Err(anyhow!("speaker unplugged"))
        }
    }

    #[test]
    fn speak_hands_text_and_language_to_engine() {
        let (tx, rx) = mpsc::channel();
        let engine = Arc::new(ChannelEngine { tx: Mutex::new(tx) });
        let mut dispatcher = SpeechDispatcher::new(engine, "fr");
        dispatcher.speak("I have detected book ahead, far");

        let (text, lang) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(text, "I have detected book ahead, far");
        assert_eq!(lang, "fr");
        assert_eq!(dispatcher.dispatched(), 1);
    }

    #[test]
    fn speak_does_not_wait_for_engine() {
        let mut dispatcher = SpeechDispatcher::new(Arc::new(SlowFailingEngine), "en");
        let started = std::time::Instant::now();
        dispatcher.speak("I have detected person ahead, near");
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(dispatcher.dispatched(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn slow_playback_does_not_delay_later_announcements() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let synth_log = dir.path().join("synth.log");
        let engine = CommandSpeechEngine::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo started >> \"$1\"; printf clip > \"$0\"".to_string(),
                "{audio}".to_string(),
                synth_log.to_string_lossy().into_owned(),
            ],
            vec!["sleep".to_string(), "1".to_string()],
            dir.path().join("output.wav"),
        )?;
        let mut dispatcher = SpeechDispatcher::new(Arc::new(engine), "en");

        let started = std::time::Instant::now();
        for _ in 0..3 {
            dispatcher.speak("I have detected person ahead, near");
        }

        let deadline = started + Duration::from_millis(900);
        loop {
            let synthesized = std::fs::read_to_string(&synth_log)
                .map(|log| log.lines().count())
                .unwrap_or(0);
            if synthesized == 3 {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "only {} of 3 announcements synthesized before the first clip ended",
                synthesized
            );
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    #[test]
    fn builds_named_engines() -> Result<()> {
        let mut settings = crate::config::SmartVisionConfig::default().speech;
        settings.engine = "log".into();
        assert_eq!(build_engine(&settings)?.name(), "log");
        settings.engine = "command".into();
        assert_eq!(build_engine(&settings)?.name(), "command");
        settings.engine = "morse".into();
        assert!(build_engine(&settings).is_err());
        Ok(())
    }
}
