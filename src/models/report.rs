use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{RecordId, SessionIdentity};

/// Summary record sent once when a session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeReport {
    pub employee_id: String,
    pub task_id: Option<RecordId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    pub ip: String,
    pub mac: String,
}

/// Local network fingerprint attached to time reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub ip: String,
    pub mac: String,
}

/// One screenshot ready for upload. Dropped right after transmission.
#[derive(Debug, Clone)]
pub struct CaptureEvent {
    pub employee_id: String,
    pub employee_name: String,
    pub project_name: String,
    /// Capture time with `:` and `.` replaced, usable as a path segment.
    pub timestamp: String,
    pub png_bytes: Vec<u8>,
}

impl CaptureEvent {
    pub fn new(identity: &SessionIdentity, timestamp: String, png_bytes: Vec<u8>) -> Self {
        Self {
            employee_id: identity.employee_id.clone(),
            employee_name: identity.employee_name.clone(),
            project_name: identity.project_name.clone(),
            timestamp,
            png_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn time_report_serializes_camel_case_iso_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let report = TimeReport {
            employee_id: "E1".into(),
            task_id: Some(RecordId::Number(77)),
            start_time: start,
            end_time: start + chrono::Duration::seconds(25),
            duration_seconds: 25,
            ip: "10.0.0.5".into(),
            mac: "aa:bb:cc:dd:ee:ff".into(),
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["employeeId"], "E1");
        assert_eq!(value["taskId"], 77);
        assert_eq!(value["startTime"], "2024-05-01T09:00:00Z");
        assert_eq!(value["endTime"], "2024-05-01T09:00:25Z");
        assert_eq!(value["durationSeconds"], 25);
        assert_eq!(value["ip"], "10.0.0.5");
        assert_eq!(value["mac"], "aa:bb:cc:dd:ee:ff");
    }
}
