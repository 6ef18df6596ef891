//! Split a region-marker dataset into one dataset per class.
//!
//! Region files are named `<class>_<anything>` and live in
//! `regions/<image-stem>/`. Every class gets its own `images/` and
//! `regions/` folders so a pipeline can be trained per class.

use log::{info, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::file_stem;
use crate::utils::{copy_into, ensure_directory, file_name, is_image, list_dir_sorted, list_subdirs, require_directory};

/// Default output directory: `<parent>/<name>_split_and_sorted`
pub fn default_output_dir(input: &Path) -> PathBuf {
    let name = file_name(input);
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}_split_and_sorted", name))
}

/// Class name of a region file: everything before the first underscore
pub fn class_of(region_file: &str) -> &str {
    region_file.split('_').next().unwrap_or(region_file)
}

/// Copy every image and its per-class region files into `<out>/<class>/`.
/// Returns the image count written per class.
pub fn sort_by_class(input: &Path, output: &Path) -> Result<BTreeMap<String, usize>> {
    let images_path = input.join("images");
    let regions_path = input.join("regions");
    require_directory(&images_path)?;
    require_directory(&regions_path)?;
    ensure_directory(output)?;

    let images: Vec<PathBuf> = list_dir_sorted(&images_path)?
        .into_iter()
        .filter(|p| is_image(p))
        .collect();
    let region_dirs = list_subdirs(&regions_path)?;

    let region_stems: BTreeSet<String> = region_dirs.iter().map(|d| file_name(d)).collect();
    for image in &images {
        if !region_stems.contains(&file_stem(image)) {
            warn!("No regions for image {}, skipping it", image.display());
        }
    }

    let per_dir: Vec<Vec<String>> = region_dirs
        .par_iter()
        .map(|region_dir| sort_region_dir(region_dir, &images, output))
        .collect::<Result<_>>()?;

    let mut counts = BTreeMap::new();
    for class in per_dir.into_iter().flatten() {
        *counts.entry(class).or_insert(0) += 1;
    }
    for (class, count) in &counts {
        info!("Class {}: {} images", class, count);
    }
    Ok(counts)
}

// Returns the classes found in this region directory
fn sort_region_dir(region_dir: &Path, images: &[PathBuf], output: &Path) -> Result<Vec<String>> {
    let stem = file_name(region_dir);
    let image = images
        .iter()
        .find(|p| file_stem(p) == stem)
        .ok_or_else(|| Error::MissingImage(region_dir.to_path_buf()))?;

    let region_files = list_dir_sorted(region_dir)?;
    let mut by_class: BTreeMap<String, Vec<&PathBuf>> = BTreeMap::new();
    for file in &region_files {
        by_class
            .entry(class_of(&file_name(file)).to_string())
            .or_default()
            .push(file);
    }

    for (class, files) in &by_class {
        let class_images = ensure_directory(&output.join(class).join("images"))?;
        let class_regions = ensure_directory(&output.join(class).join("regions").join(&stem))?;
        // image only gets copied if it contains one of the classes
        copy_into(image, &class_images)?;
        for file in files {
            copy_into(file, &class_regions)?;
        }
    }
    Ok(by_class.into_keys().collect())
}
