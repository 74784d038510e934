//! Domain types and the pure parts of the rate pipeline

pub mod budget;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod log;
pub mod markup;
pub mod numeric;
pub mod quote;

// Re-export main types for cleaner imports
pub use config::FetchOptions;
pub use convert::{ConversionResult, RateInfo};
pub use error::RateError;
pub use quote::{BASE_CURRENCY, Provenance, QuoteTable, RateQuote, RatesPayload};
