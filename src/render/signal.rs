use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative quit flag shared between signal sources and the frame loop.
///
/// The loop polls it once per cycle; raising it never interrupts a cycle.
#[derive(Clone, Debug, Default)]
pub struct QuitSignal {
    raised: Arc<AtomicBool>,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Raise on Ctrl-C / SIGTERM. Only one handler may be installed per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            log::info!("QuitSignal: interrupt received, stopping after this frame");
            signal.raise();
        })
        .context("failed to install interrupt handler")
    }

    /// Raise when a line consisting of `q` is read from stdin.
    pub fn watch_stdin(&self) -> Result<()> {
        let signal = self.clone();
        std::thread::Builder::new()
            .name("quit-stdin".to_string())
            .spawn(move || watch_lines(std::io::stdin().lock(), &signal))
            .context("failed to spawn stdin watcher")?;
        Ok(())
    }
}

fn watch_lines<R: BufRead>(reader: R, signal: &QuitSignal) {
    for line in reader.lines() {
        match line {
            Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                log::info!("QuitSignal: 'q' pressed, stopping after this frame");
                signal.raise();
                return;
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("QuitSignal: stdin watcher stopped: {}", err);
                return;
            }
        }
    }
}
