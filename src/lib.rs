//! Batch utilities for CGP image-optimization experiments
//!
//! This library splits and transforms labeled image datasets, builds HTML and
//! LaTeX reports from result trees, compares result versions and carries a
//! few small converters used around the experiments.

pub mod compare;
pub mod config;
pub mod connector;
pub mod dataset;
pub mod error;
pub mod label_config;
pub mod plot;
pub mod project_refs;
pub mod report;
pub mod sort_classes;
pub mod spreadsheet;
pub mod transform;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{Cli, Command};
pub use connector::Connector;
pub use dataset::{collect_pairs, process_split, split_pairs};
pub use error::{Error, Result};
pub use report::{generate_html, generate_tex};
pub use transform::process_transform;
pub use types::{ImagePair, SplitData, Transform, VersionStats};
