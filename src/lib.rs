//! Village early disease warning: indicator extraction, risk scoring,
//! status classification and alert dispatch.

pub mod error;
pub mod extract;
pub mod generate;
pub mod models;
pub mod notify;
pub mod report;
pub mod risk;

pub use error::{Error, Result};
