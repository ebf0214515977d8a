//! CLI library components for `calc-share`.

pub mod inspect;
pub mod logging;
pub mod report;
