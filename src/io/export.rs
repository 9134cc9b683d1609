//! CSV and JSON export for schedules and cost reports.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::SchedError;
use crate::profile::{HOURS, HourlyProfile};
use crate::sched::{Assignment, CostReport};

/// Column header for the per-hour report CSV.
const REPORT_HEADER: &str = "hour,green_price,trad_price,green_supply,\
                             green_used,trad_used,utilization_pct";

/// Column header for the per-subtask assignment CSV.
const ASSIGNMENT_HEADER: &str = "subtask,priority,hour,green_used,trad_used";

/// Exports the per-hour report to a CSV file at the given path.
///
/// # Arguments
///
/// * `profile` - Profile the report was computed against
/// * `report` - Aggregated usage and utilization
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_report_csv(
    profile: &HourlyProfile,
    report: &CostReport,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_report_csv(profile, report, io::BufWriter::new(file))
}

/// Writes one row per hour: prices, supply, energy used and utilization.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_report_csv(
    profile: &HourlyProfile,
    report: &CostReport,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(REPORT_HEADER.split(',').map(str::trim))?;

    for h in 0..HOURS {
        wtr.write_record(&[
            h.to_string(),
            format!("{:.4}", profile.green_price(h)),
            format!("{:.4}", profile.trad_price(h)),
            format!("{:.4}", profile.green_supply(h)),
            format!("{:.4}", report.green_usage[h]),
            format!("{:.4}", report.trad_usage[h]),
            format!("{:.2}", report.utilization_pct[h]),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the per-subtask assignments to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_assignments_csv(assignments: &[Assignment], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_assignments_csv(assignments, io::BufWriter::new(file))
}

/// Writes one row per assignment, in the order given.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_assignments_csv(assignments: &[Assignment], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(ASSIGNMENT_HEADER.split(','))?;

    for a in assignments {
        wtr.write_record(&[
            a.subtask.0.to_string(),
            a.priority.to_string(),
            a.hour.to_string(),
            format!("{:.4}", a.green_used),
            format!("{:.4}", a.trad_used),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes cost reports as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns `SchedError::Json` if serialization fails (including write
/// failures inside the serializer), `SchedError::Io` otherwise.
pub fn write_json(reports: &[CostReport], mut writer: impl Write) -> Result<(), SchedError> {
    serde_json::to_writer_pretty(&mut writer, reports)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::{Priority, SubtaskId};

    fn fixture() -> (HourlyProfile, Vec<Assignment>, CostReport) {
        let profile = HourlyProfile::uniform(1.2, 0.3, 100.0);
        let assignments = vec![
            Assignment {
                subtask: SubtaskId(0),
                priority: Priority::High,
                hour: 9,
                green_used: 80.0,
                trad_used: 0.0,
            },
            Assignment {
                subtask: SubtaskId(1),
                priority: Priority::Low,
                hour: 2,
                green_used: 0.0,
                trad_used: 30.0,
            },
        ];
        let report = CostReport::from_assignments(&profile, &assignments);
        (profile, assignments, report)
    }

    #[test]
    fn report_has_header_and_one_row_per_hour() {
        let (profile, _, report) = fixture();
        let mut buf = Vec::new();
        write_report_csv(&profile, &report, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines.first().copied(),
            Some("hour,green_price,trad_price,green_supply,green_used,trad_used,utilization_pct")
        );
        assert_eq!(lines.len(), HOURS + 1);
        assert_eq!(
            lines.get(10).copied(),
            Some("9,0.3000,1.2000,100.0000,80.0000,0.0000,100.00")
        );
    }

    #[test]
    fn assignment_rows_follow_input_order() {
        let (_, assignments, _) = fixture();
        let mut buf = Vec::new();
        write_assignments_csv(&assignments, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0,high,9,80.0000,0.0000");
        assert_eq!(lines[2], "1,low,2,0.0000,30.0000");
    }

    #[test]
    fn json_report_is_parseable() {
        let (_, _, report) = fixture();
        let mut buf = Vec::new();
        assert!(write_json(&[report], &mut buf).is_ok());
        let value: Option<serde_json::Value> = serde_json::from_slice(&buf).ok();
        let first = value.as_ref().and_then(|v| v.get(0));
        assert!(first.and_then(|r| r.get("total_cost")).is_some());
        assert_eq!(
            first
                .and_then(|r| r.get("trad_usage"))
                .and_then(|u| u.as_array())
                .map(Vec::len),
            Some(HOURS)
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_write_failure_is_json_error() {
        let (_, _, report) = fixture();
        let result = write_json(&[report], BrokenPipe);
        assert!(matches!(result, Err(SchedError::Json(_))));
    }

    #[test]
    fn export_writes_to_disk() {
        let (profile, assignments, report) = fixture();
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.csv");
        let assign_path = dir.path().join("assignments.csv");
        assert!(export_report_csv(&profile, &report, &report_path).is_ok());
        assert!(export_assignments_csv(&assignments, &assign_path).is_ok());
        let text = std::fs::read_to_string(&assign_path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
