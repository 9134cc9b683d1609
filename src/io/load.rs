//! CSV loaders for the hourly profile and the raw task table.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;

use crate::demand::TaskRow;
use crate::error::SchedError;
use crate::profile::{HOURS, HourlyProfile};

/// One row of the profile CSV (`hour,trad_price,green_price,green_supply`).
#[derive(Debug, Deserialize)]
struct ProfileRow {
    hour: usize,
    trad_price: f64,
    green_price: f64,
    green_supply: f64,
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Reads an hourly profile; every hour 0..23 must appear exactly once.
///
/// Green supply is taken as already expressed in energy units.
///
/// # Errors
///
/// Returns `SchedError::Csv` on malformed CSV, `SchedError::InvalidProfile`
/// for an out-of-range hour or a negative value, and
/// `SchedError::IncompleteProfile` for a missing or repeated hour.
pub fn read_profile(input: impl Read) -> Result<HourlyProfile, SchedError> {
    let mut trad = [0.0; HOURS];
    let mut green = [0.0; HOURS];
    let mut supply = [0.0; HOURS];
    let mut seen = [false; HOURS];

    for row in reader(input).deserialize::<ProfileRow>() {
        let row = row?;
        if row.hour >= HOURS {
            return Err(SchedError::InvalidProfile {
                hour: row.hour,
                field: "hour",
                value: row.hour as f64,
            });
        }
        if seen[row.hour] {
            return Err(SchedError::IncompleteProfile { hour: row.hour });
        }
        seen[row.hour] = true;
        trad[row.hour] = row.trad_price;
        green[row.hour] = row.green_price;
        supply[row.hour] = row.green_supply;
    }

    if let Some(hour) = seen.iter().position(|s| !s) {
        return Err(SchedError::IncompleteProfile { hour });
    }
    HourlyProfile::new(trad, green, supply)
}

/// Reads an hourly profile from a CSV file.
///
/// # Errors
///
/// Returns `SchedError::Io` if the file cannot be opened, otherwise as
/// [`read_profile`].
pub fn load_profile(path: &Path) -> Result<HourlyProfile, SchedError> {
    read_profile(io::BufReader::new(File::open(path)?))
}

/// Reads raw task rows (`time_range,high,mid,low`).
///
/// Time ranges are kept as text; they are parsed during distribution so a
/// bad range only affects its own row.
///
/// # Errors
///
/// Returns `SchedError::Csv` on malformed CSV or non-numeric counts.
pub fn read_tasks(input: impl Read) -> Result<Vec<TaskRow>, SchedError> {
    reader(input)
        .deserialize::<TaskRow>()
        .map(|row| row.map_err(SchedError::from))
        .collect()
}

/// Reads raw task rows from a CSV file.
///
/// # Errors
///
/// Returns `SchedError::Io` if the file cannot be opened, otherwise as
/// [`read_tasks`].
pub fn load_tasks(path: &Path) -> Result<Vec<TaskRow>, SchedError> {
    read_tasks(io::BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_csv(skip: Option<usize>) -> String {
        let mut s = String::from("hour,trad_price,green_price,green_supply\n");
        for h in 0..HOURS {
            if Some(h) == skip {
                continue;
            }
            s.push_str(&format!("{h},1.0,0.5,{}\n", h * 10));
        }
        s
    }

    #[test]
    fn reads_complete_profile() {
        let profile = read_profile(profile_csv(None).as_bytes()).ok();
        assert_eq!(profile.as_ref().map(|p| p.green_supply(7)), Some(70.0));
        assert_eq!(profile.as_ref().map(|p| p.trad_price(0)), Some(1.0));
    }

    #[test]
    fn missing_hour_is_reported() {
        let result = read_profile(profile_csv(Some(13)).as_bytes());
        assert!(matches!(result, Err(SchedError::IncompleteProfile { hour: 13 })));
    }

    #[test]
    fn duplicate_hour_is_reported() {
        let mut csv = profile_csv(None);
        csv.push_str("4,1.0,0.5,10\n");
        let result = read_profile(csv.as_bytes());
        assert!(matches!(result, Err(SchedError::IncompleteProfile { hour: 4 })));
    }

    #[test]
    fn hour_out_of_range_is_reported() {
        let mut csv = profile_csv(None);
        csv.push_str("24,1.0,0.5,10\n");
        let result = read_profile(csv.as_bytes());
        assert!(matches!(
            result,
            Err(SchedError::InvalidProfile { field: "hour", .. })
        ));
    }

    #[test]
    fn negative_supply_is_rejected() {
        let csv = profile_csv(None).replace("3,1.0,0.5,30", "3,1.0,0.5,-30");
        let result = read_profile(csv.as_bytes());
        assert!(matches!(
            result,
            Err(SchedError::InvalidProfile { hour: 3, .. })
        ));
    }

    #[test]
    fn reads_task_rows_with_whitespace() {
        let csv = "time_range,high,mid,low\n 08:00-12:00 , 114, 72, 0\nbogus,1,2,3\n";
        let rows = read_tasks(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time_range, "08:00-12:00");
        assert_eq!(rows[0].high, 114.0);
        // Range text is not validated at load time.
        assert_eq!(rows[1].time_range, "bogus");
    }

    #[test]
    fn non_numeric_count_is_csv_error() {
        let csv = "time_range,high,mid,low\n08:00-12:00,many,1,1\n";
        assert!(matches!(read_tasks(csv.as_bytes()), Err(SchedError::Csv(_))));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        assert!(std::fs::write(&path, profile_csv(None)).is_ok());
        assert!(load_profile(&path).is_ok());
        assert!(matches!(
            load_tasks(&dir.path().join("missing.csv")),
            Err(SchedError::Io(_))
        ));
    }
}
