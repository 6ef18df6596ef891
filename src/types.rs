use std::path::{Path, PathBuf};

// Supported image formats
pub const IMG_FORMATS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff"];

// Windows drops thumbnail caches (Thumbs.db) into image folders
pub const IGNORED_EXTENSION: &str = ".db";

/// An image file and the label file that annotates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl ImagePair {
    pub fn stem(&self) -> String {
        file_stem(&self.image)
    }
}

// Struct to hold the split datasets for training, validation, and testing
#[derive(Debug, Clone, Default)]
pub struct SplitData {
    pub train: Vec<ImagePair>,
    pub val: Vec<ImagePair>,
    pub test: Vec<ImagePair>,
}

impl SplitData {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Named subsets in output order.
    pub fn subsets(&self) -> [(&'static str, &[ImagePair]); 3] {
        [
            ("train", &self.train),
            ("val", &self.val),
            ("test", &self.test),
        ]
    }
}

/// One row of the report's table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub name: String,
    pub source: String,
    pub lowest: f64,
    pub highest: f64,
}

/// Image operations requested on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub crop_regions: bool,
    pub resize: Option<f32>,
    pub split: Option<u32>,
}

impl Transform {
    pub fn is_empty(&self) -> bool {
        !self.crop_regions && self.resize.is_none() && self.split.is_none()
    }

    /// Number of output pairs produced per input pair.
    pub fn outputs_per_pair(&self) -> usize {
        self.split.map_or(1, |n| n as usize)
    }
}

/// Comparison summary of one result version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionStats {
    pub version: String,
    pub mean: f64,
    pub std: f64,
    pub mean_difference: f64,
    pub min: f64,
    pub max: f64,
}

// Struct to hold copy statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub total_files_processed: usize,
    pub successful_copies: usize,
    pub failed_copies: usize,
}

impl ProcessingStats {
    pub fn print_summary(&self, label: &str) {
        log::info!("=== {} Summary ===", label);
        log::info!("Total files processed: {}", self.total_files_processed);
        log::info!("Successful copies: {}", self.successful_copies);
        if self.failed_copies > 0 {
            log::warn!("Failed copies: {}", self.failed_copies);
        }
    }
}

/// File stem as an owned string, empty when the path has none.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
