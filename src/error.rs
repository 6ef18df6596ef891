use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the cgpkit utilities.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{failed} of {total} pairs failed to copy, first failure: {source}")]
    CopyFailed {
        failed: usize,
        total: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no image found for region directory {}", .0.display())]
    MissingImage(PathBuf),

    #[error("{images} images but {labels} labels")]
    PairCountMismatch { images: usize, labels: usize },

    #[error("image {} does not match label {}", image.display(), label.display())]
    MismatchedPair { image: PathBuf, label: PathBuf },

    #[error("image {} is {image_size:?} but its label is {label_size:?}", image.display())]
    SizeMismatch {
        image: PathBuf,
        image_size: (u32, u32),
        label_size: (u32, u32),
    },

    #[error("label {} contains no region of interest", .0.display())]
    EmptyLabel(PathBuf),

    #[error("{} is empty", .0.display())]
    EmptyInput(PathBuf),

    #[error("no transformation requested")]
    NoTransform,

    #[error("invalid transformation: {0}")]
    InvalidTransform(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("a request is already waiting for its reply")]
    RequestPending,

    #[error("connection closed by peer")]
    Disconnected,

    #[error("connection interrupted")]
    Interrupted,

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
