//! RfmForge: a Rust CLI application for customer segmentation using RFM scores
//!
//! This library scores customers on Recency, Frequency and Monetary value using
//! quantile buckets and maps the RF code to one of ten behavioural segments.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod segment;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{DegenerateBinning, RfmConfig};
pub use data::{customers_dataframe, load_customers, rfm_dataframe, write_rfm_csv};
pub use error::{RfmError, RfmResult};
pub use model::{CustomerRecord, RfmRecord};
pub use pipeline::create_rfm;
pub use report::{channel_summary, segment_summary, select_audience, AudienceQuery};
pub use segment::{Segment, SegmentRules};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
