//! Compare the best-fitness logs of two result versions.
//!
//! Layout per version: `<version>/<image>/overview.txt` with one line per
//! run (the fifth token is the run's best fitness) and
//! `<version>/<image>/Analyzer/<run>/BestIndividualFit.txt` with a header
//! line followed by one fitness value per generation.

use log::{info, warn};
use plotters::prelude::*;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CompareArgs;
use crate::error::{Error, Result};
use crate::plot::{bounds, padded, plot_err};
use crate::types::VersionStats;
use crate::utils::{ensure_directory, file_name, list_subdirs, require_directory};

const OVERVIEW_FILE: &str = "overview.txt";
const BEST_FIT_FILE: &str = "BestIndividualFit.txt";
const BEST_FITNESS_TOKEN: usize = 4;
const HISTOGRAM_BINS: usize = 10;

/// Fitness logs of one image under one version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRuns {
    pub image: String,
    /// Best fitness per run
    pub best: Vec<f64>,
    /// Fitness per generation, one vector per run
    pub generations: Vec<Vec<f64>>,
}

/// Images holding an `overview.txt` in both versions, and the ones missing from either
pub fn common_images(a: &Path, b: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let names = |dir: &Path| -> Result<BTreeSet<String>> {
        Ok(list_subdirs(dir)?.iter().map(|p| file_name(p)).collect())
    };
    let names_a = names(a)?;
    let names_b = names(b)?;

    let mut complete = Vec::new();
    let mut missing = Vec::new();
    for image in names_a.union(&names_b) {
        if a.join(image).join(OVERVIEW_FILE).is_file() && b.join(image).join(OVERVIEW_FILE).is_file() {
            complete.push(image.clone());
        } else {
            missing.push(image.clone());
        }
    }
    Ok((complete, missing))
}

/// Best fitness of the first `iterations` runs listed in an overview file
pub fn parse_overview(content: &str, iterations: usize) -> Result<Vec<f64>> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(iterations)
        .enumerate()
        .map(|(i, line)| {
            line.split_whitespace()
                .nth(BEST_FITNESS_TOKEN)
                .and_then(|t| t.parse::<f64>().ok())
                .ok_or_else(|| Error::Parse(format!("overview line {}: no best fitness in {:?}", i + 1, line)))
        })
        .collect()
}

/// Fitness per generation; the header line is skipped and unreadable values count as 0.0
pub fn parse_best_fit(content: &str) -> Vec<f64> {
    content
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            line.split_whitespace()
                .next()
                .and_then(|t| t.parse::<f64>().ok())
                .unwrap_or(0.0)
        })
        .collect()
}

/// Read the runs of one image
pub fn read_image_runs(image_dir: &Path, iterations: usize) -> Result<ImageRuns> {
    let best = parse_overview(&fs::read_to_string(image_dir.join(OVERVIEW_FILE))?, iterations)?;
    let mut generations = Vec::with_capacity(best.len());
    for run in 0..best.len() {
        let path = image_dir.join("Analyzer").join(run.to_string()).join(BEST_FIT_FILE);
        match fs::read_to_string(&path) {
            Ok(content) => generations.push(parse_best_fit(&content)),
            Err(e) => {
                warn!("Missing generation log {}: {}", path.display(), e);
                generations.push(Vec::new());
            }
        }
    }
    Ok(ImageRuns {
        image: file_name(image_dir),
        best,
        generations,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

pub fn version_stats(version: &str, images: &[ImageRuns]) -> VersionStats {
    let best: Vec<f64> = images.iter().flat_map(|i| i.best.iter().copied()).collect();
    let all: Vec<f64> = images
        .iter()
        .flat_map(|i| i.generations.iter().flatten().copied())
        .collect();
    let differences: Vec<f64> = all.iter().map(|f| 1.0 - f).collect();
    let (min, max) = bounds(all.iter().copied()).unwrap_or((0.0, 0.0));

    VersionStats {
        version: version.to_string(),
        mean: mean(&best),
        std: std_dev(&best),
        mean_difference: mean(&differences),
        min,
        max,
    }
}

pub fn format_stats(stats: &VersionStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Version: {}", stats.version);
    let _ = writeln!(out, "Mean: {}", stats.mean);
    let _ = writeln!(out, "Std: {}", stats.std);
    let _ = writeln!(out, "Mean difference overall: {}", stats.mean_difference);
    let _ = writeln!(out, "Min Fitness: {}", stats.min);
    let _ = writeln!(out, "Max Fitness: {}", stats.max);
    out
}

/// Normal density at `x`
pub fn normal_pdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    (-0.5 * z * z).exp() / (std * (2.0 * std::f64::consts::PI).sqrt())
}

/// Grid of fitness curves: one row per version, one column per image, one line per run
fn plot_fitness_curves(out: &Path, versions: &[(String, Vec<ImageRuns>)]) -> Result<()> {
    let cols = versions.iter().map(|(_, runs)| runs.len()).max().unwrap_or(1).max(1);
    let rows = versions.len().max(1);
    let root = SVGBackend::new(out, (400 * cols as u32, 320 * rows as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((rows, cols));

    for (r, (version, images)) in versions.iter().enumerate() {
        for (c, image) in images.iter().enumerate() {
            let area = &areas[r * cols + c];
            let longest = image.generations.iter().map(Vec::len).max().unwrap_or(0).max(1);
            let (lo, hi) = bounds(image.generations.iter().flatten().copied()).unwrap_or((0.0, 1.0));
            let (lo, hi) = padded(lo, hi);

            let mut chart = ChartBuilder::on(area)
                .caption(format!("Version: {} Image: {}", version, image.image), ("sans-serif", 14))
                .margin(8)
                .x_label_area_size(30)
                .y_label_area_size(40)
                .build_cartesian_2d(0f64..longest as f64, lo..hi)
                .map_err(plot_err)?;
            chart
                .configure_mesh()
                .x_desc("Generations")
                .y_desc("Fitness")
                .draw()
                .map_err(plot_err)?;

            for (run, fitness) in image.generations.iter().enumerate() {
                let color = Palette99::pick(run).to_rgba();
                chart
                    .draw_series(LineSeries::new(
                        fitness.iter().enumerate().map(|(g, &f)| (g as f64, f)),
                        color,
                    ))
                    .map_err(plot_err)?
                    .label(format!("Iteration: {}", run))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
            }
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(plot_err)?;
        }
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Histogram of the best fitness values with the fitted normal density
fn plot_distribution(out: &Path, stats: &VersionStats, best: &[f64]) -> Result<()> {
    let root = SVGBackend::new(out, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let (lo, hi) = bounds(best.iter().copied()).unwrap_or((0.0, 1.0));
    let (lo, hi) = if stats.std > 0.0 {
        (lo.min(stats.mean - 3.0 * stats.std), hi.max(stats.mean + 3.0 * stats.std))
    } else {
        padded(lo, hi)
    };
    let width = (hi - lo) / HISTOGRAM_BINS as f64;
    let mut counts = [0usize; HISTOGRAM_BINS];
    for &v in best {
        let bin = (((v - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    let tallest = counts.iter().copied().max().unwrap_or(0).max(1) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Normal distribution and Histogram of best fitness values (Version: {})", stats.version),
            ("sans-serif", 16),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0f64..tallest * 1.1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("Fitness")
        .y_desc("Frequency")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &n)| {
            let x0 = lo + i as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, n as f64)], BLUE.mix(0.5).filled())
        }))
        .map_err(plot_err)?;

    if stats.std > 0.0 {
        // density scaled to histogram counts
        let scale = best.len() as f64 * width;
        let steps = 100;
        chart
            .draw_series(LineSeries::new(
                (0..=steps).map(|s| {
                    let x = lo + (hi - lo) * s as f64 / steps as f64;
                    (x, normal_pdf(x, stats.mean, stats.std) * scale)
                }),
                RED,
            ))
            .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Run the comparison and write statistics plus charts below `<results>/CompareResults`
pub fn process_compare(args: &CompareArgs) -> Result<Vec<VersionStats>> {
    let dirs: Vec<PathBuf> = [&args.version_a, &args.version_b]
        .iter()
        .map(|v| args.data_dir.join(v))
        .collect();
    for dir in &dirs {
        require_directory(dir)?;
    }

    let (images, missing) = common_images(&dirs[0], &dirs[1])?;
    if !missing.is_empty() {
        warn!("Data missing for: {:?}", missing);
    }
    info!("Comparing {} images", images.len());

    let compare_dir = ensure_directory(&args.results_dir.join("CompareResults"))?;
    let pictures_dir = ensure_directory(&compare_dir.join("Bilder"))?;

    let mut versions = Vec::new();
    for (version, dir) in [&args.version_a, &args.version_b].into_iter().zip(&dirs) {
        let runs = images
            .iter()
            .map(|image| read_image_runs(&dir.join(image), args.iterations))
            .collect::<Result<Vec<_>>>()?;
        versions.push((version.clone(), runs));
    }

    let mut report = String::new();
    let mut all_stats = Vec::new();
    for (version, runs) in &versions {
        let stats = version_stats(version, runs);
        info!("Version {}: mean {} std {}", version, stats.mean, stats.std);
        report.push_str(&format_stats(&stats));
        report.push('\n');

        let best: Vec<f64> = runs.iter().flat_map(|r| r.best.iter().copied()).collect();
        let name = sanitize_filename::sanitize(format!("normal_distribution_{}.svg", version));
        plot_distribution(&pictures_dir.join(name), &stats, &best)?;
        all_stats.push(stats);
    }

    let report_name = sanitize_filename::sanitize(format!(
        "compareResults_version_{}_with_{}.txt",
        args.version_a, args.version_b
    ));
    fs::write(compare_dir.join(report_name), report)?;
    plot_fitness_curves(&pictures_dir.join("fitness_curves.svg"), &versions)?;
    Ok(all_stats)
}
