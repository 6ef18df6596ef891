use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};
use log::{error, info};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

use crate::dataset::{collect_pairs, IMAGE_DIR_NAME, LABEL_DIR_NAME};
use crate::error::{Error, Result};
use crate::types::{ImagePair, Transform};
use crate::utils::{create_progress_bar, ensure_directory};

/// Reject pairs whose image and label differ in size
pub fn check_sizes(pairs: &[ImagePair]) -> Result<()> {
    for pair in pairs {
        let image_size = image::image_dimensions(&pair.image)?;
        let label_size = image::image_dimensions(&pair.label)?;
        if image_size != label_size {
            return Err(Error::SizeMismatch {
                image: pair.image.clone(),
                image_size,
                label_size,
            });
        }
    }
    Ok(())
}

/// Smallest rectangle `(x, y, width, height)` holding every non-zero label pixel
pub fn region_bounds(label: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in label.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Crop image and label to the label's region of interest
pub fn crop_to_regions(image: &DynamicImage, label: &DynamicImage) -> Option<(DynamicImage, DynamicImage)> {
    let (x, y, w, h) = region_bounds(&label.to_luma8())?;
    Some((image.crop_imm(x, y, w, h), label.crop_imm(x, y, w, h)))
}

/// Nearest-neighbour resize by `factor`, never below one pixel
pub fn resize_by(img: &DynamicImage, factor: f32) -> DynamicImage {
    let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
    let (w, h) = img.dimensions();
    img.resize_exact(scale(w), scale(h), FilterType::Nearest)
}

/// Cut `img` into `n` vertical tiles of equal width.
///
/// The width is zero-padded on the right up to the next multiple of `n`.
/// A tile count of zero is treated as one.
pub fn split_tiles(img: &DynamicImage, n: u32) -> Vec<DynamicImage> {
    let n = n.max(1);
    let (width, height) = img.dimensions();
    let padded_width = width.div_ceil(n) * n;
    let padded = if padded_width == width {
        img.clone()
    } else {
        let mut canvas = DynamicImage::new(padded_width, height, img.color());
        imageops::replace(&mut canvas, img, 0, 0);
        canvas
    };

    let tile = padded_width / n;
    (0..n).map(|k| padded.crop_imm(k * tile, 0, tile, height)).collect()
}

/// Output file stem for the given operations and tile index
pub fn output_stem(stem: &str, transform: &Transform, tile: Option<u32>) -> String {
    let mut name = stem.to_string();
    if transform.crop_regions {
        name.push_str("_crop");
    }
    if transform.resize.is_some() {
        name.push_str("_resize");
    }
    if let Some(k) = tile {
        name.push_str(&format!("_split_{}", k));
    }
    name
}

/// Apply crop, resize and split (in that order) to one pair and save the results.
/// Returns the number of pairs written.
pub fn transform_pair(pair: &ImagePair, transform: &Transform, images_dir: &Path, labels_dir: &Path) -> Result<usize> {
    validate_transform(transform)?;
    let mut image = image::open(&pair.image)?;
    let mut label = image::open(&pair.label)?;

    if transform.crop_regions {
        (image, label) =
            crop_to_regions(&image, &label).ok_or_else(|| Error::EmptyLabel(pair.label.clone()))?;
    }
    if let Some(factor) = transform.resize {
        image = resize_by(&image, factor);
        label = resize_by(&label, factor);
    }

    let tiles: Vec<(Option<u32>, DynamicImage, DynamicImage)> = match transform.split {
        Some(n) => split_tiles(&image, n)
            .into_iter()
            .zip(split_tiles(&label, n))
            .enumerate()
            .map(|(k, (i, l))| (Some(k as u32), i, l))
            .collect(),
        None => vec![(None, image, label)],
    };

    let stem = pair.stem();
    for (tile, image, label) in &tiles {
        let name = output_stem(&stem, transform, *tile);
        image.save(with_extension_of(images_dir, &name, &pair.image))?;
        label.save(with_extension_of(labels_dir, &name, &pair.label))?;
    }
    Ok(tiles.len())
}

// Keeps every dot of the stem, only the original extension is appended
fn with_extension_of(dir: &Path, stem: &str, original: &Path) -> std::path::PathBuf {
    let name = sanitize_filename::sanitize(stem);
    match original.extension() {
        Some(ext) => dir.join(format!("{}.{}", name, ext.to_string_lossy())),
        None => dir.join(name),
    }
}

/// Reject requests that name no operation or carry an unusable parameter
pub fn validate_transform(transform: &Transform) -> Result<()> {
    if transform.is_empty() {
        return Err(Error::NoTransform);
    }
    if transform.split == Some(0) {
        return Err(Error::InvalidTransform("split needs at least one tile".to_string()));
    }
    if let Some(factor) = transform.resize {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidTransform(format!("resize factor {} is not positive", factor)));
        }
    }
    Ok(())
}

/// Transform every pair of `<input>` into `<output>/{images,labels}`.
/// Returns the number of pairs written.
pub fn process_transform(input: &Path, output: &Path, transform: &Transform) -> Result<usize> {
    validate_transform(transform)?;
    let pairs = collect_pairs(input)?;
    check_sizes(&pairs)?;
    info!(
        "Transforming {} image/label pairs into {} outputs with {:?}",
        pairs.len(),
        pairs.len() * transform.outputs_per_pair(),
        transform
    );

    let images_dir = ensure_directory(&output.join(IMAGE_DIR_NAME))?;
    let labels_dir = ensure_directory(&output.join(LABEL_DIR_NAME))?;

    let pb = create_progress_bar(pairs.len() as u64, "Transform");
    let written = AtomicUsize::new(0);
    let results: Vec<Result<()>> = pairs
        .par_iter()
        .map(|pair| {
            let result = transform_pair(pair, transform, &images_dir, &labels_dir);
            pb.inc(1);
            match result {
                Ok(n) => {
                    written.fetch_add(n, Relaxed);
                    Ok(())
                }
                Err(e) => {
                    error!("Failed to transform {}: {}", pair.image.display(), e);
                    Err(e)
                }
            }
        })
        .collect();
    pb.finish_with_message("Transform complete");

    results.into_iter().collect::<Result<()>>()?;
    Ok(written.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_region_bounds_inclusive() {
        let mut label = GrayImage::new(10, 8);
        label.put_pixel(2, 3, Luma([255]));
        label.put_pixel(6, 5, Luma([1]));
        assert_eq!(region_bounds(&label), Some((2, 3, 5, 3)));
    }

    #[test]
    fn test_region_bounds_empty() {
        assert_eq!(region_bounds(&GrayImage::new(4, 4)), None);
    }

    #[test]
    fn test_split_tiles_pads_width() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 4, Luma([9])));
        let tiles = split_tiles(&img, 4);
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.dimensions() == (3, 4)));
        // last tile holds the two padding columns
        let last = tiles[3].to_luma8();
        assert_eq!(last.get_pixel(0, 0).0[0], 9);
        assert_eq!(last.get_pixel(2, 0).0[0], 0);
    }

    #[test]
    fn test_split_tiles_zero_count() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(5, 2));
        let tiles = split_tiles(&img, 0);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].dimensions(), (5, 2));
    }

    #[test]
    fn test_validate_transform() {
        let split = |n| Transform {
            split: Some(n),
            ..Transform::default()
        };
        let resize = |f| Transform {
            resize: Some(f),
            ..Transform::default()
        };
        assert!(validate_transform(&split(2)).is_ok());
        assert!(matches!(validate_transform(&split(0)), Err(Error::InvalidTransform(_))));
        assert!(matches!(validate_transform(&resize(0.0)), Err(Error::InvalidTransform(_))));
        assert!(matches!(validate_transform(&resize(f32::NAN)), Err(Error::InvalidTransform(_))));
        assert!(matches!(validate_transform(&Transform::default()), Err(Error::NoTransform)));
    }

    #[test]
    fn test_resize_by_rounds() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 51));
        assert_eq!(resize_by(&img, 0.8).dimensions(), (80, 41));
        assert_eq!(resize_by(&img, 0.001).dimensions(), (1, 1));
    }

    #[test]
    fn test_output_stem() {
        let t = Transform {
            crop_regions: true,
            resize: Some(0.5),
            split: Some(2),
        };
        assert_eq!(output_stem("a", &t, Some(1)), "a_crop_resize_split_1");
        assert_eq!(output_stem("a", &Transform::default(), None), "a");
    }
}
