#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs;
use std::path::Path;

/// Write an RGB image of the given size filled with one colour
pub fn write_rgb(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
        .save(path)
        .unwrap();
}

/// Write a grayscale label that is zero except for the given rectangle
pub fn write_label(path: &Path, width: u32, height: u32, region: (u32, u32, u32, u32)) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let (x0, y0, w, h) = region;
    let label = GrayImage::from_fn(width, height, |x, y| {
        if x >= x0 && x < x0 + w && y >= y0 && y < y0 + h {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    label.save(path).unwrap();
}

/// Dataset with `n` pairs named `img_<i>.png` in images/ and labels/
pub fn make_dataset(root: &Path, n: usize) {
    for i in 0..n {
        let name = format!("img_{:02}.png", i);
        write_rgb(&root.join("images").join(&name), 8, 6);
        write_label(&root.join("labels").join(&name), 8, 6, (2, 1, 3, 2));
    }
}

pub fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}
