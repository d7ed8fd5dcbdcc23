//! Serial provisioning console.
//!
//! A reader thread blocks on stdin (the UART / USB-CDC console under
//! ESP-IDF's VFS) and forwards complete lines through a bounded
//! `embassy-sync` channel, so the main loop only ever polls.  Lines typed
//! faster than the loop drains them are dropped and logged.

use std::io::BufRead;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::ConsolePort;

/// Stack for the reader thread; line handling is trivial.
const READER_STACK_SIZE: usize = 4096;

/// Lines buffered between the reader thread and the main loop.
pub const CONSOLE_LINE_DEPTH: usize = 4;

type ConsoleLines = Channel<CriticalSectionRawMutex, String, CONSOLE_LINE_DEPTH>;

pub struct StdioConsole {
    lines: Option<Arc<ConsoleLines>>,
}

impl StdioConsole {
    /// Start the stdin reader thread.  If the thread cannot be spawned
    /// the console stays silent.
    pub fn spawn() -> Self {
        let lines: Arc<ConsoleLines> = Arc::new(Channel::new());
        let producer = Arc::clone(&lines);
        let spawned = std::thread::Builder::new()
            .name("console".into())
            .stack_size(READER_STACK_SIZE)
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    forward_line(&producer, line);
                }
                info!("Console: input closed");
            });
        match spawned {
            Ok(_) => {
                info!("Console: ready (type 'show' or a JSON config object)");
                Self { lines: Some(lines) }
            }
            Err(e) => {
                warn!("Console: reader thread failed to start: {}", e);
                Self { lines: None }
            }
        }
    }
}

fn forward_line(lines: &ConsoleLines, line: String) {
    if lines.try_send(line).is_err() {
        warn!("Console: input queue full, line dropped");
    }
}

impl ConsolePort for StdioConsole {
    fn poll_line(&mut self) -> Option<String> {
        self.lines.as_ref()?.try_receive().ok()
    }

    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}
