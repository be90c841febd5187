//! Phase-tracking test logger.
//!
//! Writes `[test] phase` lines to stderr so a failing integration test shows
//! how far it got. Set `TEST_LOG_QUIET=1` to silence it.

use std::cell::RefCell;
use std::time::Instant;

pub struct TestLogger {
    name: String,
    started: Instant,
    phase: RefCell<String>,
    quiet: bool,
}

impl TestLogger {
    pub fn new(name: &str) -> Self {
        let log = Self {
            name: name.to_string(),
            started: Instant::now(),
            phase: RefCell::new("init".to_string()),
            quiet: std::env::var("TEST_LOG_QUIET").is_ok_and(|v| v == "1"),
        };
        log.emit("start");
        log
    }

    pub fn phase(&self, phase: &str) {
        *self.phase.borrow_mut() = phase.to_string();
        self.emit("phase");
    }

    pub fn info(&self, message: &str) {
        self.emit(message);
    }

    pub fn finish_ok(&self) {
        self.emit("ok");
    }

    fn emit(&self, message: &str) {
        if self.quiet {
            return;
        }
        eprintln!(
            "[{}] {:>6}ms {:<8} {}",
            self.name,
            self.started.elapsed().as_millis(),
            self.phase.borrow(),
            message
        );
    }
}
