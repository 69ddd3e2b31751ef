pub mod client;
pub mod error;
pub mod models;
pub mod provider;

pub use client::{DEFAULT_BASE_URL, StravaClient};
pub use error::{Result, StravaError};
pub use models::{AthleteDetailed, SegmentDetailed, SegmentEffort};
