use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::Backend};
use tokio::sync::mpsc;

use super::{Screen, ScreenEvent, ScreenExit};

/// Frame interval; also how often queued sink events are picked up.
const TICK: Duration = Duration::from_millis(80);

/// Lines moved by PageUp/PageDown.
const PAGE: i32 = 10;

/// Set while raw mode and the alternate screen are in effect.
static TERMINAL_TAKEN: AtomicBool = AtomicBool::new(false);

/// Hands the terminal back to the shell if the screen still holds it.
/// Safe to call from a panic hook and more than once.
pub fn restore_terminal() {
    if TERMINAL_TAKEN.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Owns the terminal until the user leaves. The monitor task on the other
/// end of `rx` is the only thing issuing polls.
pub async fn run_screen(
    session_id: &str,
    rx: mpsc::UnboundedReceiver<ScreenEvent>,
) -> Result<ScreenExit> {
    enable_raw_mode()?;
    TERMINAL_TAKEN.store(true, Ordering::SeqCst);
    let _guard = TerminalGuard;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut screen = Screen::new(session_id);
    run_app(&mut terminal, &mut screen, rx).await
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    screen: &mut Screen,
    mut rx: mpsc::UnboundedReceiver<ScreenEvent>,
) -> Result<ScreenExit>
where
    <B as Backend>::Error: std::error::Error + Send + Sync + 'static,
{
    loop {
        loop {
            match rx.try_recv() {
                Ok(event) => screen.apply(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    // Monitor task ended without saying so (panic or abort).
                    if !screen.is_finished() {
                        screen.apply(ScreenEvent::Error(
                            "monitor task stopped unexpectedly".to_string(),
                        ));
                        screen.apply(ScreenEvent::Finished);
                    }
                    break;
                }
            }
        }

        if !screen.is_finished() {
            screen.advance_spinner();
        }

        terminal.draw(|f| screen.draw(f))?;

        // Keep the async runtime free while waiting for keys.
        let key_ready = tokio::task::block_in_place(|| event::poll(TICK))?;
        if !key_ready {
            tokio::task::yield_now().await;
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c =
                key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
            if ctrl_c || key.code == KeyCode::Char('q') || key.code == KeyCode::Esc {
                return Ok(if screen.is_finished() {
                    ScreenExit::Acknowledged
                } else {
                    ScreenExit::Aborted
                });
            }
            match key.code {
                KeyCode::Enter if screen.is_finished() => return Ok(ScreenExit::Acknowledged),
                KeyCode::Up => screen.scroll_by(-1),
                KeyCode::Down => screen.scroll_by(1),
                KeyCode::PageUp => screen.scroll_by(-PAGE),
                KeyCode::PageDown => screen.scroll_by(PAGE),
                _ => {}
            }
        }
    }
}
