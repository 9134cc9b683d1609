//! CSV/JSON input loaders and report exporters.

pub mod export;
pub mod load;
