//! Record format of the append-only alert log (one JSON object per line).

use crate::types::{AlertEvent, AlertKey, SnapshotRef};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub timestamp: NaiveDateTime,
    pub key: AlertKey,
    pub message: String,
    pub snapshot: Option<SnapshotRef>,
}

impl From<&AlertEvent> for AlertRecord {
    fn from(event: &AlertEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            key: event.key,
            message: event.message.clone(),
            snapshot: event.snapshot.clone(),
        }
    }
}

impl AlertRecord {
    /// Serialize as a single log line, newline included.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Read the newest `limit` records. Unparseable lines are skipped.
pub fn read_recent(path: &Path, limit: usize) -> std::io::Result<Vec<AlertRecord>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut records = Vec::new();
    for (n, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AlertRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping malformed alert log line"),
        }
    }

    let skip = records.len().saturating_sub(limit);
    Ok(records.split_off(skip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn record(minute: u32, key: AlertKey) -> AlertRecord {
        AlertRecord {
            timestamp: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap().and_hms_opt(10, minute, 0).unwrap(),
            key,
            message: format!("alert {minute}"),
            snapshot: None,
        }
    }

    #[test]
    fn test_read_recent_keeps_newest_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(record(1, AlertKey::MotionDetected).to_line().unwrap().as_bytes()).unwrap();
        file.write_all(b"{broken\n\n").unwrap();
        file.write_all(record(2, AlertKey::KnownPerson).to_line().unwrap().as_bytes()).unwrap();
        file.write_all(record(3, AlertKey::HighThreat).to_line().unwrap().as_bytes()).unwrap();

        let recent = read_recent(&path, 2).unwrap();
        assert_eq!(recent, vec![record(2, AlertKey::KnownPerson), record(3, AlertKey::HighThreat)]);
        assert_eq!(read_recent(&path, 10).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_recent(&dir.path().join("none.jsonl"), 5).unwrap().is_empty());
    }

    #[test]
    fn test_line_format_uses_snake_case_keys() {
        let line = record(0, AlertKey::GuestWithKnown).to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"key\":\"guest_with_known\""));
    }
}
