//! Append-only event log. Appends never fail from the caller's point of view.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub trait EventLog: Send + Sync {
    fn append(&self, event: &str, user_id: Option<&str>, domain: &str, date: Option<&str>);
}

/// `event,user,domain,date` with absent fields left empty.
pub fn format_event(event: &str, user_id: Option<&str>, domain: &str, date: Option<&str>) -> String {
    format!(
        "{},{},{},{}",
        event,
        user_id.unwrap_or_default(),
        domain,
        date.unwrap_or_default()
    )
}

/// Writes events to the `dnscap::events` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn append(&self, event: &str, user_id: Option<&str>, domain: &str, date: Option<&str>) {
        info!(target: "dnscap::events", "{}", format_event(event, user_id, domain, date));
    }
}

/// Appends one line per event to a file.
pub struct FileEventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileEventLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }
}

impl EventLog for FileEventLog {
    fn append(&self, event: &str, user_id: Option<&str>, domain: &str, date: Option<&str>) {
        let line = format_event(event, user_id, domain, date);
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{}", line) {
            warn!("Failed to append event to {}: {}", self.path.display(), e);
        }
    }
}

/// File log when `path` is set and can be opened, tracing log otherwise.
pub fn open_event_log(path: Option<&Path>) -> Box<dyn EventLog> {
    match path {
        Some(path) => match FileEventLog::open(path) {
            Ok(log) => Box::new(log),
            Err(e) => {
                warn!(
                    "Cannot open event log {}: {}; logging events to tracing",
                    path.display(),
                    e
                );
                Box::new(TracingEventLog)
            }
        },
        None => Box::new(TracingEventLog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line_format() {
        assert_eq!(
            format_event("chain", Some("42"), "example.com", Some("2024-05-01")),
            "chain,42,example.com,2024-05-01"
        );
        assert_eq!(format_event("chain", None, "example.com", None), "chain,,example.com,");
    }

    #[test]
    fn test_file_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");

        let log = FileEventLog::open(&path).unwrap();
        log.append("chain", Some("7"), "example.com", None);
        log.append("chain", None, "example.org", Some("2024-01-02"));
        drop(log);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "chain,7,example.com,\nchain,,example.org,2024-01-02\n");
    }

    #[test]
    fn test_unopenable_path_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for appending
        let log = open_event_log(Some(dir.path()));
        log.append("chain", None, "example.com", None);
    }
}
