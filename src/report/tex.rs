use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use super::{batch_dirs, timestamp};
use crate::error::Result;
use crate::utils::{ensure_directory, file_name, list_dir_sorted};

const LISTED_DIRS: [&str; 4] = ["Analyzer", "Config", "Grid", "Images"];
const EMPTY: &str = "\\textbf{Empty}\n\n";

/// Write `<report_dir>/report.tex` summarising every batch in `results`
pub fn generate_tex(results: &Path, report_dir: &Path) -> Result<PathBuf> {
    let batches = batch_dirs(results)?;
    ensure_directory(report_dir)?;

    let mut tex = format!("\\section*{{PyCGP-SP Report {}}}\n", escape_latex(&timestamp()));
    for batch in &batches {
        tex.push_str(&report_details(batch));
    }

    let target = report_dir.join("report.tex");
    fs::write(&target, tex)?;
    info!("Wrote LaTeX report for {} batches to {}", batches.len(), target.display());
    Ok(target)
}

/// Escape LaTeX special characters
pub fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// `itemize` of the entry names in `path`
pub fn tex_list(path: &Path) -> String {
    let mut tex = String::from("\\begin{itemize}\n");
    for entry in list_dir_sorted(path).unwrap_or_default() {
        tex.push_str(&format!("\\item {}\n", escape_latex(&file_name(&entry))));
    }
    tex.push_str("\\end{itemize}\n");
    tex
}

fn report_details(batch: &Path) -> String {
    let mut tex = format!("\\subsection*{{Report {}}}\n\n", escape_latex(&file_name(batch)));
    for dirname in LISTED_DIRS {
        tex.push_str(&format!("\\paragraph{{{}}}\n", dirname));
        let dir = batch.join(dirname);
        if dir.is_dir() {
            tex.push_str(&tex_list(&dir));
            tex.push_str("\n\n");
        } else {
            tex.push_str(EMPTY);
        }
    }

    tex.push_str("\\paragraph{Log}\n");
    match fs::read_to_string(batch.join("Log").join("date.txt")) {
        Ok(date) => tex.push_str(&format!("\\textbf{{{}}}\n\n", escape_latex(date.trim_end()))),
        Err(_) => tex.push_str(EMPTY),
    }
    tex
}
