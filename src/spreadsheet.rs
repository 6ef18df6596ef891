use calamine::{open_workbook_auto, Data, Reader};
use glob::glob;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::file_stem;
use crate::utils::ensure_directory;

/// Convert the first sheet of every `.xls`/`.xlsx` file in `dir` to CSV.
/// Returns the number of files written.
pub fn convert_directory(dir: &Path, out_dir: &Path, extension: &str) -> Result<usize> {
    let pattern = format!("{}/*.xls*", glob::Pattern::escape(&dir.to_string_lossy()));
    let workbooks: Vec<PathBuf> = glob(&pattern)?.filter_map(|entry| entry.ok()).collect();
    if workbooks.is_empty() {
        warn!("No spreadsheets found in {}", dir.display());
        return Ok(0);
    }
    ensure_directory(out_dir)?;

    let mut converted = 0;
    for workbook in &workbooks {
        let target = out_dir.join(format!("{}.{}", file_stem(workbook), extension));
        let rows = convert_workbook(workbook, &target)?;
        info!("{} -> {} ({} rows)", workbook.display(), target.display(), rows);
        converted += 1;
    }
    Ok(converted)
}

/// Write the first sheet of `workbook` to `target`, returning the row count
pub fn convert_workbook(workbook: &Path, target: &Path) -> Result<usize> {
    let mut sheets = open_workbook_auto(workbook)?;
    let range = match sheets.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Err(Error::EmptyInput(workbook.to_path_buf())),
    };

    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(target)?;
    let mut rows = 0;
    for row in range.rows() {
        writer.write_record(row.iter().map(cell_to_string))?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Replace the first column of a CSV file by `10^x`, one value per row.
/// Returns the number of rows written.
pub fn exp10(input: &Path, output: &Path) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(input)?;
    let mut writer = csv::Writer::from_path(output)?;

    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        let field = record.get(0).unwrap_or_default().trim();
        let exponent: f64 = field
            .parse()
            .map_err(|_| Error::Parse(format!("row {}: {:?} is not a number", rows + 1, field)))?;
        writer.write_record([10f64.powf(exponent).to_string()])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}
