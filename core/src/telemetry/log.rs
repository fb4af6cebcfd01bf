use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

const SECTION_RULE_WIDTH: usize = 50;

/// Routes workflow messages to the `log` facade and, optionally, appends
/// them to a plain-text workflow log.
pub struct LogManager {
    sink: Option<Mutex<File>>,
}

impl LogManager {
    pub fn new() -> Self {
        Self { sink: None }
    }

    pub fn with_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            sink: Some(Mutex::new(file)),
        })
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
        self.append(message);
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", message);
        self.append(&format!("WARNING: {}", message));
    }

    /// Writes a separator after a finished workflow step.
    pub fn close_section(&self) {
        self.append(&"-".repeat(SECTION_RULE_WIDTH));
    }

    fn append(&self, line: &str) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if let Ok(mut file) = sink.lock() {
            if let Err(err) = writeln!(file, "{}", line) {
                warn!("failed to append to workflow log: {}", err);
            }
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn log_manager_appends_messages_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workflow.log");
        {
            let logger = LogManager::with_file(&path).unwrap();
            logger.record("Running combined time series");
            logger.warn("station MAD1 skipped");
            logger.close_section();
        }
        let second = LogManager::with_file(&path).unwrap();
        second.record("second run");

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Running combined time series");
        assert_eq!(lines[1], "WARNING: station MAD1 skipped");
        assert_eq!(lines[2], "-".repeat(50));
        assert_eq!(lines[3], "second run");
    }

    #[test]
    fn log_manager_without_file_only_logs() {
        LogManager::default().record("no sink");
    }
}
