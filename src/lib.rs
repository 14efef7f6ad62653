//! snrebin - supernova scaler rebinning
//!
//! DOMs report supernova scalers in 1.6384 ms slots; the analysis runs on a
//! 2 ms grid. This library rebins scaler payloads onto that grid without
//! losing hits, decodes SN payload files and stages the result per DOM.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod handler;
pub mod json_output;
pub mod payload;
pub mod rebin;
pub mod staging;
pub mod stats;

pub use rebin::{rebin_scalers, Cadence, Rebinned, RebinnedEvent, RAW_UDT, SCALER_UDT};
