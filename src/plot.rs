//! Percent-error charts over frequency.
//!
//! `frequency.txt` holds the frequency axis in its first CSV row and
//! `pipelinePercentError.txt` one error series per row. Each series becomes
//! one panel of the output SVG.

use log::{info, warn};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use crate::config::PlotMode;
use crate::error::{Error, Result};
use crate::utils::ensure_directory;

const PANEL_WIDTH: u32 = 800;
const PANEL_HEIGHT: u32 = 500;

pub(crate) fn plot_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

fn parse_record(record: &csv::StringRecord, row: usize) -> Result<Vec<f64>> {
    record
        .iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|f| {
            f.parse::<f64>()
                .map_err(|_| Error::Parse(format!("row {}: {:?} is not a number", row + 1, f)))
        })
        .collect()
}

/// Every row of a headerless numeric CSV file
pub fn read_series(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        rows.push(parse_record(&record?, i)?);
    }
    Ok(rows)
}

/// First row of the frequency file
pub fn read_frequencies(path: &Path) -> Result<Vec<f64>> {
    read_series(path)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::EmptyInput(path.to_path_buf()))
}

/// Symmetric logarithm: `sign(y) * log10(1 + |y|)`
pub fn symlog(y: f64) -> f64 {
    y.signum() * (1.0 + y.abs()).log10()
}

pub fn inverse_symlog(v: f64) -> f64 {
    v.signum() * (10f64.powf(v.abs()) - 1.0)
}

/// Chart coordinates of one series. Points with non-positive frequency are
/// dropped since the frequency axis is logarithmic.
pub fn points(frequencies: &[f64], errors: &[f64], mode: PlotMode) -> Vec<(f64, f64)> {
    frequencies
        .iter()
        .zip(errors)
        .filter(|(f, e)| **f > 0.0 && e.is_finite())
        .map(|(&f, &e)| match mode {
            PlotMode::SemilogX => (f, e),
            PlotMode::LogLog | PlotMode::SemilogY => (f, symlog(e)),
        })
        .collect()
}

pub(crate) fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

// Widen a degenerate or tight range so the data does not sit on the frame
pub(crate) fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    } else {
        (lo - 1.0, hi + 1.0)
    }
}

fn format_value(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e4 || v.abs() < 1e-2) {
        format!("{:.0e}", v)
    } else {
        format!("{:.2}", v)
    }
}

/// Render every series as one panel of `out`
pub fn render(frequencies: &[f64], series: &[Vec<f64>], mode: PlotMode, out: &Path) -> Result<()> {
    let panels = series.len().max(1);
    let root = SVGBackend::new(out, (PANEL_WIDTH, PANEL_HEIGHT * panels as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    for (i, (area, errors)) in root.split_evenly((panels, 1)).iter().zip(series).enumerate() {
        let pts = points(frequencies, errors, mode);
        if pts.is_empty() {
            warn!("Series {} has no plottable points", i + 1);
            continue;
        }
        draw_panel(area, &pts, mode)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_panel(area: &DrawingArea<SVGBackend<'_>, Shift>, pts: &[(f64, f64)], mode: PlotMode) -> Result<()> {
    let (x_lo, x_hi) = match mode {
        // decade ticks 10^0 .. 10^10
        PlotMode::SemilogY => (1.0, 1e10),
        _ => {
            let (lo, hi) = bounds(pts.iter().map(|p| p.0)).unwrap_or((1.0, 10.0));
            if hi > lo {
                (lo, hi)
            } else {
                (lo / 10.0, hi * 10.0)
            }
        }
    };
    let (y_lo, y_hi) = padded_bounds(pts);

    let mut chart = ChartBuilder::on(area)
        .caption("% error", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), y_lo..y_hi)
        .map_err(plot_err)?;

    let symmetric = mode != PlotMode::SemilogX;
    let x_fmt = |v: &f64| format_value(*v);
    let y_fmt = move |v: &f64| {
        if symmetric {
            format_value(inverse_symlog(*v))
        } else {
            format_value(*v)
        }
    };
    chart
        .configure_mesh()
        .x_desc("f(Hz)")
        .y_desc("e'")
        .x_labels(if mode == PlotMode::SemilogY { 11 } else { 10 })
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(pts.iter().map(|&p| Cross::new(p, 4, RED)))
        .map_err(plot_err)?;
    Ok(())
}

fn padded_bounds(pts: &[(f64, f64)]) -> (f64, f64) {
    let (lo, hi) = bounds(pts.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    padded(lo, hi)
}

/// Read both input files and write `<out_dir>/<mode>.svg` for every mode
pub fn plot_errors(frequency_file: &Path, error_file: &Path, out_dir: &Path, modes: &[PlotMode]) -> Result<Vec<PathBuf>> {
    let frequencies = read_frequencies(frequency_file)?;
    let series = read_series(error_file)?;
    info!(
        "Plotting {} series over {} frequencies",
        series.len(),
        frequencies.len()
    );
    ensure_directory(out_dir)?;

    let mut written = Vec::new();
    for &mode in modes {
        let out = out_dir.join(mode.file_stem()).with_extension("svg");
        render(&frequencies, &series, mode, &out)?;
        info!("Wrote {}", out.display());
        written.push(out);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symlog_roundtrip_sign() {
        assert_eq!(symlog(0.0), 0.0);
        assert!((symlog(9.0) - 1.0).abs() < 1e-12);
        assert!((symlog(-99.0) + 2.0).abs() < 1e-12);
        assert!((inverse_symlog(symlog(-42.0)) + 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_points_drop_non_positive_frequency() {
        let pts = points(&[0.0, 10.0, 100.0], &[1.0, 2.0, 3.0, 4.0], PlotMode::SemilogX);
        assert_eq!(pts, vec![(10.0, 2.0), (100.0, 3.0)]);
    }

    #[test]
    fn test_padded_degenerate() {
        assert_eq!(padded(2.0, 2.0), (1.0, 3.0));
    }
}
