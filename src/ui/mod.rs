//! Terminal chat surface
//!
//! Crossterm event loop around a `PanelController`. The controller is pumped
//! once per tick; a send runs on its own task and further submissions are
//! suppressed until it completes.

pub mod composer;
pub mod render;

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, IsTerminal};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::PanelError;
use crate::panel::{BubbleLayout, PanelController, PanelState};

pub use composer::Composer;
pub use render::{bubble_side, draw, text_alignment, PanelView};

const TICK: Duration = Duration::from_millis(100);

/// What a key press asks the loop to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    Send(String),
    Restart,
}

/// Map a key press onto the composer and the panel state.
///
/// While an error blocks the surface only quit and (for retryable errors)
/// restart are accepted. Typing is ignored until the session is live.
pub fn handle_key(key: KeyEvent, composer: &mut Composer, state: &PanelState) -> UiAction {
    if key.kind != KeyEventKind::Press {
        return UiAction::None;
    }
    if key.code == KeyCode::Esc
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        return UiAction::Quit;
    }

    if let Some(error) = state.blocking_error() {
        return match key.code {
            KeyCode::Char('q') => UiAction::Quit,
            KeyCode::Char('r') if error.retryable => UiAction::Restart,
            _ => UiAction::None,
        };
    }
    if !state.is_live() {
        return UiAction::None;
    }

    match key.code {
        KeyCode::Char(c) => {
            composer.insert(c);
            UiAction::None
        }
        KeyCode::Backspace => {
            composer.backspace();
            UiAction::None
        }
        KeyCode::Enter => composer.submit().map_or(UiAction::None, UiAction::Send),
        _ => UiAction::None,
    }
}

/// Run the panel in the terminal until the user quits.
pub async fn run(mut controller: PanelController, layout: BubbleLayout) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        bail!("the chat panel requires a TTY");
    }

    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
    let mut cleanup = TerminalCleanup { enabled: true };
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut composer = Composer::default();
    let mut pending: Option<JoinHandle<Result<(), PanelError>>> = None;
    controller.mount();

    loop {
        controller.pump().await;

        if let Some(handle) = pending.take_if(|handle| handle.is_finished()) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(PanelError::Integration(format!("send task failed: {e}"))),
            };
            if let Err(e) = outcome {
                controller.report_send_error(e);
            }
            composer.finish();
        }

        let messages = controller.messages();
        let view = PanelView {
            state: controller.state(),
            messages: &messages,
            composer: &composer,
            layout,
            color_scheme: controller.color_scheme(),
            streaming: controller.is_streaming(),
        };
        terminal.draw(|frame| draw(frame, &view))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        match handle_key(key, &mut composer, controller.state()) {
            UiAction::None => {}
            UiAction::Quit => break,
            UiAction::Restart => {
                if let Some(handle) = pending.take() {
                    handle.abort();
                }
                composer.finish();
                let generation = controller.reset();
                info!(generation, "Chat restarted by user");
            }
            UiAction::Send(text) => match controller.session() {
                Some(session) => {
                    debug!(chars = text.chars().count(), "Sending message");
                    pending = Some(tokio::spawn(async move { session.send(&text).await }));
                }
                None => composer.finish(),
            },
        }
    }

    cleanup.disable();
    terminal.show_cursor()?;
    Ok(())
}

struct TerminalCleanup {
    enabled: bool,
}

impl TerminalCleanup {
    fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use crate::panel::PanelEvent;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn live_state() -> PanelState {
        let mut state = PanelState::new(true);
        let generation = state.generation();
        state.apply(generation, PanelEvent::CredentialObtained);
        state.apply(generation, PanelEvent::WidgetReady);
        state
    }

    fn type_text(text: &str, composer: &mut Composer, state: &PanelState) {
        for c in text.chars() {
            assert_eq!(
                handle_key(press(KeyCode::Char(c)), composer, state),
                UiAction::None
            );
        }
    }

    #[test]
    fn test_enter_sends_typed_text() {
        let state = live_state();
        let mut composer = Composer::default();
        type_text("hi there", &mut composer, &state);

        let action = handle_key(press(KeyCode::Enter), &mut composer, &state);
        assert_eq!(action, UiAction::Send("hi there".into()));
        assert!(composer.is_sending());
    }

    #[test]
    fn test_enter_while_sending_is_suppressed() {
        let state = live_state();
        let mut composer = Composer::default();
        type_text("one", &mut composer, &state);
        handle_key(press(KeyCode::Enter), &mut composer, &state);

        type_text("two", &mut composer, &state);
        assert_eq!(
            handle_key(press(KeyCode::Enter), &mut composer, &state),
            UiAction::None
        );
    }

    #[test]
    fn test_typing_ignored_while_initializing() {
        let state = PanelState::new(true);
        let mut composer = Composer::default();
        handle_key(press(KeyCode::Char('x')), &mut composer, &state);
        assert_eq!(composer.input(), "");
    }

    #[test]
    fn test_restart_only_for_retryable_errors() {
        let mut composer = Composer::default();

        let mut retryable = live_state();
        let generation = retryable.generation();
        retryable.apply(generation, PanelEvent::WidgetError("lost".into()));
        assert_eq!(
            handle_key(press(KeyCode::Char('r')), &mut composer, &retryable),
            UiAction::Restart
        );

        let mut fatal = PanelState::new(true);
        let generation = fatal.generation();
        fatal.apply(
            generation,
            PanelEvent::CredentialFailed(PanelError::Configuration("missing".into())),
        );
        assert_eq!(
            handle_key(press(KeyCode::Char('r')), &mut composer, &fatal),
            UiAction::None
        );
        assert_eq!(
            handle_key(press(KeyCode::Char('q')), &mut composer, &fatal),
            UiAction::Quit
        );
    }

    #[test]
    fn test_quit_keys() {
        let state = live_state();
        let mut composer = Composer::default();
        assert_eq!(
            handle_key(press(KeyCode::Esc), &mut composer, &state),
            UiAction::Quit
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ctrl_c, &mut composer, &state), UiAction::Quit);
    }

    #[test]
    fn test_release_events_ignored() {
        let state = live_state();
        let mut composer = Composer::default();
        let mut release = press(KeyCode::Char('a'));
        release.kind = KeyEventKind::Release;
        handle_key(release, &mut composer, &state);
        assert_eq!(composer.input(), "");
    }
}
