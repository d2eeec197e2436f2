//! Console input glue: discard queued keypresses, wait for one more

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use eyre::{Context, Result};
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

pub const PRESS_ANY_KEY: &str = "\nPress any key to continue . . . ";

/// Raw mode for as long as this lives
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Drop any input that piled up while events were being printed
pub fn discard_pending_input() -> Result<()> {
    if !io::stdin().is_terminal() {
        return Ok(());
    }

    let _raw = RawMode::enable()?;
    let mut discarded = 0;
    while event::poll(Duration::ZERO).context("Failed to poll console input")? {
        event::read().context("Failed to read console input")?;
        discarded += 1;
    }
    log::debug!("Discarded {} pending console events", discarded);
    Ok(())
}

/// Print the prompt and block for one keypress
pub fn press_any_key() -> Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", PRESS_ANY_KEY)?;
    stdout.flush()?;

    if io::stdin().is_terminal() {
        let _raw = RawMode::enable()?;
        loop {
            if let Event::Key(key) = event::read().context("Failed to read console input")?
                && key.kind == KeyEventKind::Press
            {
                break;
            }
        }
    }

    writeln!(stdout)?;
    Ok(())
}
