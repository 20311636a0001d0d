use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use super::SpeechEngine;

const MAX_TEXT_CHARS: usize = 2_000;

/// Speech through external programs: a synthesizer that writes one audio
/// artifact, then a player started in the background.
///
/// Argument templates may use `{text}`, `{lang}` and `{audio}`. Text is passed
/// as a single argument, never through a shell. A new utterance stops the
/// clip that is still playing before the artifact is replaced, so speech
/// never lags behind the scene.
pub struct CommandSpeechEngine {
    synth_command: Vec<String>,
    player_command: Vec<String>,
    audio_path: PathBuf,
    // Player of the last utterance. Locked while the artifact is rewritten.
    player: Mutex<Option<Child>>,
}

impl CommandSpeechEngine {
    pub fn new(
        synth_command: Vec<String>,
        player_command: Vec<String>,
        audio_path: PathBuf,
    ) -> Result<Self> {
        if synth_command.is_empty() {
            return Err(anyhow!("synthesizer command must not be empty"));
        }
        Ok(Self {
            synth_command,
            player_command,
            audio_path,
            player: Mutex::new(None),
        })
    }

    fn expand(&self, template: &[String], text: &str, language: &str) -> Vec<String> {
        let audio = self.audio_path.to_string_lossy();
        template
            .iter()
            .map(|arg| {
                arg.replace("{audio}", &audio)
                    .replace("{lang}", language)
                    .replace("{text}", text)
            })
            .collect()
    }

    fn remove_previous_artifact(&self) -> Result<()> {
        match std::fs::remove_file(&self.audio_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove previous audio {}", self.audio_path.display())
            }),
        }
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn name(&self) -> &'static str {
        "command"
    }

    fn synthesize_and_play(&self, text: &str, language: &str) -> Result<()> {
        let text = sanitize_text(text)?;
        let mut player = self.player.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        stop_player(&mut player);

        self.remove_previous_artifact()?;
        let synth = self.expand(&self.synth_command, &text, language);
        run_to_completion(&synth).context("speech synthesis failed")?;

        if self.player_command.is_empty() {
            return Ok(());
        }
        let argv = self.expand(&self.player_command, &text, language);
        *player = Some(spawn_player(&argv).context("audio playback failed")?);
        Ok(())
    }
}

impl Drop for CommandSpeechEngine {
    fn drop(&mut self) {
        let player = self.player.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        stop_player(player);
    }
}

/// Reap the previous player, interrupting it if it is still playing.
fn stop_player(slot: &mut Option<Child>) {
    let Some(mut child) = slot.take() else {
        return;
    };
    match child.try_wait() {
        Ok(Some(status)) if !status.success() => {
            log::warn!("CommandSpeechEngine: player exited with {}", status);
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            log::debug!("CommandSpeechEngine: interrupting previous playback");
            if let Err(err) = child.kill() {
                log::debug!("CommandSpeechEngine: player already gone: {}", err);
            }
            if let Err(err) = child.wait() {
                log::warn!("CommandSpeechEngine: failed to reap player: {}", err);
            }
        }
        Err(err) => log::warn!("CommandSpeechEngine: failed to poll player: {}", err),
    }
}

/// Strip control and shell metacharacters and cap the length.
pub fn sanitize_text(text: &str) -> Result<String> {
    let sanitized: String = text
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, ';' | '|' | '&' | '$' | '`' | '<' | '>'))
        .take(MAX_TEXT_CHARS)
        .collect();
    let sanitized = sanitized.trim().to_string();
    if sanitized.is_empty() {
        return Err(anyhow!("text is empty after sanitization"));
    }
    Ok(sanitized)
}

fn spawn_player(argv: &[String]) -> Result<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command"))?;
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to start {}", program))
}

fn run_to_completion(argv: &[String]) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command"))?;
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {}", program))?;
    if !output.status.success() {
        return Err(anyhow!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}
