//! Energy-cost-aware scheduling of prioritized compute tasks against hourly
//! green and traditional energy prices.

pub mod config;
pub mod dataset;
pub mod demand;
pub mod error;
pub mod io;
pub mod perturb;
pub mod profile;
pub mod runner;
pub mod sched;

pub use error::{FormatError, SchedError};
pub use profile::{HOURS, HourlyProfile};
