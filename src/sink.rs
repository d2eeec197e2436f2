//! Timestamped console sink
//!
//! All sources write through one [`Sink`]. Each line is formatted up front and
//! written with a single call under the sink lock, so lines from concurrent
//! callback threads never interleave.

use chrono::{DateTime, Local};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use crate::event::NormalizedEvent;

/// `HH:MM:SS.mmm`, local time
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

pub struct Sink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Sink {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Write one line for `event`
    pub fn emit(&self, event: &NormalizedEvent, at: DateTime<Local>) {
        self.write_line(&event.to_string(), at);
    }

    /// Write one line for `event`, stamped with the current time
    pub fn emit_now(&self, event: &NormalizedEvent) {
        self.emit(event, Local::now());
    }

    /// Write a free-form status line such as "Event listeners started"
    pub fn message(&self, text: &str) {
        self.write_line(text, Local::now());
    }

    fn write_line(&self, text: &str, at: DateTime<Local>) {
        let line = format!("{} {}\n", at.format(TIMESTAMP_FORMAT), text);

        // A panicking writer on another thread must not silence the sink
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
            log::warn!("Failed to write event line: {}", e);
        }
    }
}
