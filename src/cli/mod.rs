//! Terminal rendering for the command-line front end

pub mod convert;
pub mod rates;
pub mod setup;
pub mod ui;
