use super::buttons::ButtonProducer;
use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a key press means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Press(usize),
    Quit,
}

impl KeyCommand {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                c.to_digit(10).map(|digit| KeyCommand::Press(digit as usize))
            }
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyCommand::Quit),
            _ => None,
        }
    }
}

/// Holds the terminal in raw mode until dropped
struct RawMode;

impl RawMode {
    fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            error!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Terminal stand-in for the hardware buttons: digit keys press the button
/// with that index, `q` or Esc requests shutdown
pub struct KeyboardInputHandler {
    buttons: Arc<ButtonProducer>,
    shutdown: CancellationToken,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(buttons: Arc<ButtonProducer>, shutdown: CancellationToken) -> Self {
        Self {
            buttons,
            shutdown,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Spawn the blocking key reader
    pub async fn start(&self) -> Result<()> {
        info!("Keyboard buttons active: digits press, q quits");

        let buttons = Arc::clone(&self.buttons);
        let shutdown = self.shutdown.clone();
        let stop = self.cancellation_token.clone();
        let runtime = Handle::current();

        task::spawn_blocking(move || {
            let _raw = match RawMode::enter() {
                Ok(raw) => raw,
                Err(e) => {
                    error!("Keyboard buttons unavailable, raw mode failed: {}", e);
                    return;
                }
            };

            while !stop.is_cancelled() {
                let Some(command) = next_command() else {
                    continue;
                };
                match command {
                    KeyCommand::Press(index) => {
                        let buttons = Arc::clone(&buttons);
                        runtime.spawn(async move {
                            let outcome = buttons.press(index).await;
                            debug!(index, ?outcome, "key press");
                        });
                    }
                    KeyCommand::Quit => {
                        info!("Quit key pressed");
                        shutdown.cancel();
                        break;
                    }
                }
            }
            debug!("Keyboard reader finished");
        });

        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.cancellation_token.cancel();
        // Give the reader time to notice and drop its raw mode guard
        tokio::time::sleep(KEY_POLL * 2).await;
        Ok(())
    }
}

const KEY_POLL: Duration = Duration::from_millis(100);

/// Wait up to one poll period for a key press that maps to a command
fn next_command() -> Option<KeyCommand> {
    match event::poll(KEY_POLL) {
        Ok(true) => match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => KeyCommand::from_key(key.code),
            Ok(_) => None,
            Err(e) => {
                warn!("Keyboard read failed: {}", e);
                None
            }
        },
        Ok(false) => None,
        Err(e) => {
            warn!("Keyboard poll failed: {}", e);
            // Avoid spinning when the terminal is gone
            std::thread::sleep(KEY_POLL);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyCommand::from_key(KeyCode::Char('0')), Some(KeyCommand::Press(0)));
        assert_eq!(KeyCommand::from_key(KeyCode::Char('2')), Some(KeyCommand::Press(2)));
        assert_eq!(KeyCommand::from_key(KeyCode::Char('q')), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key(KeyCode::Esc), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key(KeyCode::Char(' ')), None);
        assert_eq!(KeyCommand::from_key(KeyCode::Enter), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let config = crate::config::AlarmviewConfig::default();
        let (fetch_tx, _fetch_rx) = crate::mailbox::mailbox("fetch", 1);
        let (render_tx, _render_rx) = crate::mailbox::mailbox("render", 1);
        let buttons = Arc::new(ButtonProducer::new(&config.buttons, fetch_tx, render_tx).unwrap());
        let shutdown = CancellationToken::new();
        let handler = KeyboardInputHandler::new(buttons, shutdown.clone());

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
        assert!(!shutdown.is_cancelled());
    }
}
