//! Built-in reference day: price curves, green supply and task table.

use crate::demand::TaskRow;
use crate::profile::{HOURS, HourlyProfile};

/// Traditional price per hour.
pub const REFERENCE_TRAD_PRICE: [f64; HOURS] = [
    0.5, 0.5, 0.5, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.2, 1.3, 1.3, //
    1.2, 1.1, 1.0, 1.0, 1.1, 1.2, 1.3, 1.2, 1.1, 1.0, 0.8, 0.6,
];

/// Green price per hour.
pub const REFERENCE_GREEN_PRICE: [f64; HOURS] = [
    0.6, 0.6, 0.6, 0.6, 0.5, 0.5, 0.4, 0.4, 0.4, 0.3, 0.3, 0.3, //
    0.3, 0.4, 0.5, 0.5, 0.5, 0.5, 0.6, 0.6, 0.6, 0.6, 0.6, 0.6,
];

/// Green supply per hour in MW; one MW over one hour is 1000 energy units.
pub const REFERENCE_GREEN_SUPPLY_MW: [f64; HOURS] = [
    0.0, 0.0, 0.0, 0.0, 0.5, 1.4, 1.8, 2.1, 2.4, 2.4, 2.8, 3.2, //
    3.4, 3.3, 3.1, 2.9, 2.6, 2.5, 2.3, 1.5, 1.0, 0.0, 0.0, 0.0,
];

/// Reference hourly profile, supply converted to energy units.
pub fn reference_profile() -> HourlyProfile {
    let supply = REFERENCE_GREEN_SUPPLY_MW.map(|mw| mw * 1000.0);
    HourlyProfile::new(REFERENCE_TRAD_PRICE, REFERENCE_GREEN_PRICE, supply)
        .unwrap_or_else(|_| HourlyProfile::uniform(0.0, 0.0, 0.0))
}

/// Reference task table.
pub fn reference_tasks() -> Vec<TaskRow> {
    vec![
        TaskRow::new("00:00-06:00", 0.0, 40.0, 60.0),
        TaskRow::new("06:00-08:00", 0.0, 55.0, 70.0),
        TaskRow::new("08:00-12:00", 114.0, 72.0, 0.0),
        TaskRow::new("12:00-14:00", 54.0, 95.0, 0.0),
        TaskRow::new("14:00-18:00", 152.0, 80.0, 0.0),
        TaskRow::new("18:00-22:00", 50.0, 50.0, 40.0),
        TaskRow::new("22:00-24:00", 0.0, 20.0, 15.0),
    ]
}
