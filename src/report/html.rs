//! HTML report over a results tree, with Plotly fitness charts.

use log::{debug, info};
use quick_xml::escape::escape;
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{batch_dirs, read_json, summarize_batch, timestamp, DEFAULT_DIRS};
use crate::error::Result;
use crate::types::BatchSummary;
use crate::utils::{ensure_directory, file_name, list_dir_sorted, list_subdirs, relative_path};

const TITLE: &str = "CGP-IP Report";
const CONTENTS_ID: &str = "contents";
const MAX_THUMBNAILS: usize = 3;

/// Analyzer logs plotted per run: file name and the charted column
const ANALYZER_PLOTS: [(&str, &str); 3] = [
    ("AvgOffspringFit.json", "AverageOffspringFitness"),
    ("AvgPopulationFit.json", "AveragePopulationFitness"),
    ("BestIndividualFit.json", "BestIndividualFitness"),
];

const ANALYZER_LOGS: [&str; 2] = ["individual_evaluation_log.json", "loader_evaluation_log.json"];

/// Write `<report_dir>/index.html` for every batch in `results`
pub fn generate_html(results: &Path, report_dir: &Path) -> Result<PathBuf> {
    let batches = batch_dirs(results)?;
    ensure_directory(report_dir)?;
    let report = HtmlReport { report_dir };

    let mut html = html_head(TITLE);
    let summaries: Vec<BatchSummary> = batches.iter().map(|b| summarize_batch(b)).collect();
    html.push_str(&table_of_contents(&summaries));
    for (index, batch) in batches.iter().enumerate() {
        html.push_str(&report.test_batch(index, batch));
    }
    html.push_str("</div>\n</body>\n</html>");

    let index = report_dir.join("index.html");
    let mut file = fs::File::create(&index)?;
    file.write_all(html.as_bytes())?;
    info!("Wrote HTML report for {} batches to {}", batches.len(), index.display());
    Ok(index)
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(s: &str) -> String {
    escape(s).into_owned()
}

/// Element id derived from a directory name
pub fn html_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Element id of the `index`-th batch, unique even when names map to the same id
pub fn batch_id(index: usize, name: &str) -> String {
    format!("{}-{}", html_id(name), index)
}

pub fn txt_to_html(txt: &str) -> String {
    escape_html(txt)
        .replace('\n', "<br>")
        .replace('\t', "&nbsp;&nbsp;&nbsp;&nbsp; ")
}

pub fn to_list_element(s: &str) -> String {
    format!("<li>\n{}</li>\n", s)
}

pub fn to_list(s: &str) -> String {
    format!("<ul>\n{}</ul>\n", s)
}

pub fn make_collapsible(html: &str, summary: &str) -> String {
    format!(
        r#"<details>
    <summary>
        {summary}: &#x25BC;
    </summary>
    <div>
            {html}
    </div>
</details>
"#
    )
}

/// Render JSON as nested lists; `https://` strings become links
pub fn json_to_html(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut html = String::from("<ul>");
            for (key, item) in map {
                html.push_str(&to_list_element(&format!("{}: {}", escape_html(key), json_to_html(item))));
            }
            html.push_str("</ul>");
            html
        }
        Value::Array(items) => {
            let mut html = String::from("<ol>");
            for item in items {
                html.push_str(&to_list_element(&json_to_html(item)));
            }
            html.push_str("</ol>");
            html
        }
        Value::String(s) if s.starts_with("https://") => {
            format!(r#"<a href="{}">click here</a>"#, escape_html(s))
        }
        Value::String(s) => txt_to_html(s),
        other => txt_to_html(&other.to_string()),
    }
}

/// Bar colour for an MCC value
pub fn color_for(value: f64) -> &'static str {
    if value > 0.7 {
        "green"
    } else if value > 0.5 {
        "yellow"
    } else if value > 0.3 {
        "orange"
    } else {
        "red"
    }
}

fn color_bar(value: f64) -> String {
    let width = (value * 100.0).clamp(0.0, 100.0);
    format!(
        r#"
        <div class="colorbar1">
            <span style="width: {width}%; height: 10px; display: block; float: left; background-color: {color};"></span>
        </div>
        <br />
        {value}
        "#,
        color = color_for(value)
    )
}

pub fn table_of_contents(summaries: &[BatchSummary]) -> String {
    let mut html = format!(
        r#"
    <h3 id="{CONTENTS_ID}">Table of Contents</h3>
    <table class="table">
    <thead class="thead-dark">
        <tr>
            <th scope="col">#</th>
            <th scope="col">Source</th>
            <th scope="col">Run</th>
            <th scope="col">Lowest</th>
            <th scope="col">Highest</th>
        </tr>
    </thead>
    <tbody>
    "#
    );
    for (i, summary) in summaries.iter().enumerate() {
        let _ = write!(
            html,
            r##"
        <tr><th scope="row"> {i}</th>
            <td>{source}</td>
            <td><a href="#series{id}">{name}</a></td>
            <td>
                {lowest}
            </td>
            <td>
                {highest}
            </td>
        </tr>
        "##,
            source = escape_html(&summary.source),
            id = batch_id(i, &summary.name),
            name = escape_html(&summary.name),
            lowest = color_bar(summary.lowest),
            highest = color_bar(summary.highest),
        );
    }
    html.push_str("\n</tbody>\n</table><hr/>");
    html
}

/// Plotly line chart of `column` over `Generation`
pub fn line_chart(data: &[Value], column: &str, chart_id: &str) -> String {
    let xs: Vec<&Value> = data.iter().map(|d| d.get("Generation").unwrap_or(&Value::Null)).collect();
    let ys: Vec<&Value> = data.iter().map(|d| d.get(column).unwrap_or(&Value::Null)).collect();
    let xs = serde_json::to_string(&xs).unwrap_or_else(|_| "[]".to_string());
    let ys = serde_json::to_string(&ys).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"
        <div id="plot_{chart_id}" style="width:100%;max-width:700px"></div>
        <script>
        var xArray = {xs};
        var yArray = {ys};

        var data = [{{
            x: xArray,
            y: yArray,
            mode: "lines",
            type: "scatter"
        }}];

        var layout = {{
            xaxis: {{title: "Generation"}},
            yaxis: {{range: [-1, 1], title: "{column}"}},
            title: "Fitness Development"
        }};

        Plotly.newPlot("plot_{chart_id}", data, layout);
        </script>"#
    )
}

fn value_cell(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => escape_html(s),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Chart plus a two-row value table for one analyzer log
pub fn data_plot(file: &Path, column: &str, chart_id: &str) -> String {
    let Some(data) = read_json(file) else {
        return String::new();
    };
    let records = data.as_array().cloned().unwrap_or_default();
    let mut html = line_chart(&records, column, chart_id);
    html.push_str(r#"<table class ="table">"#);
    html.push_str("<tr><td>Generation</td>");
    for r in &records {
        let _ = write!(html, "<td>{}</td>", value_cell(r.get("Generation")));
    }
    let _ = write!(html, "</tr><tr><td>{}</td>", escape_html(column));
    for r in &records {
        let _ = write!(html, "<td>{}</td>", value_cell(r.get(column)));
    }
    html.push_str("</tr></table>");
    html
}

/// Whether `file_name` ends with one of the given extensions (with dot)
pub fn has_filetype(file_name: &str, filetypes: &[&str]) -> bool {
    filetypes.iter().any(|t| file_name.ends_with(t))
}

/// Inline SVG of a DOT graph via Graphviz, or its escaped source if `dot` is unavailable
pub fn dot_to_svg(dot_file: &Path) -> String {
    if !dot_file.exists() {
        return String::new();
    }
    match Command::new("dot").arg("-Tsvg").arg(dot_file).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).into_owned(),
        _ => {
            debug!("Graphviz unavailable, embedding DOT source of {}", dot_file.display());
            let source = fs::read_to_string(dot_file).unwrap_or_default();
            format!(r#"<pre class="dot">{}</pre>"#, escape_html(&source))
        }
    }
}

pub fn html_head(title: &str) -> String {
    format!(
        r#"
    <!doctype html>
    <html lang="en">
    <head>
        <meta charset="utf-8">
        <title>{title}</title>
        <meta name="description" content="Generated PyCGP Report"><meta name ="author" content="PyCGP">{style}
    </head>
    <link rel="stylesheet" href="https://maxcdn.bootstrapcdn.com/bootstrap/3.4.1/css/bootstrap.min.css">
    <script src="https://ajax.googleapis.com/ajax/libs/jquery/3.5.1/jquery.min.js"></script>
    <script src="https://maxcdn.bootstrapcdn.com/bootstrap/3.4.1/js/bootstrap.min.js"></script>
    <script src="https://cdn.plot.ly/plotly-latest.min.js"></script>
    <body>
        <div class="container">
        <h1 class="display-1">{title}</h1>
        <p>Generated {time}</p>
        "#,
        style = STYLE,
        time = timestamp(),
    )
}

const STYLE: &str = r#"
    <style>
    details > summary {
      padding: 4px;
      width: 200px;
      background-color: #eeeeee;
      border: 1px solid;
      border-radius: 5px;
      margin-bottom: 2px;
      box-shadow: 1px 1px 2px #bbbbbb;
      cursor: pointer;
    }

    details > div {
      background-color: #eeeeee;
      border: 1px solid;
      border-radius: 4px;
      padding: 4px;
      margin-bottom: 2px;
      box-shadow: 1px 1px 2px #bbbbbb;
    }
    </style>
    "#;

/// Sections that need the report location to link images
struct HtmlReport<'a> {
    report_dir: &'a Path,
}

impl HtmlReport<'_> {
    fn test_batch(&self, index: usize, batch: &Path) -> String {
        let name = file_name(batch);
        let id = batch_id(index, &name);
        let details = self.report_details(batch, &id);
        format!(
            r##"
        <h2 id="series{id}">Testseries of {title}</h2>
        <button class="btn btn-primary" type="button" data-toggle="collapse" data-target="#{id}" aria-expanded="false" aria-controls="{id}">Show</button>
        <div class="collapse" id="{id}">
        <div class="card card-body">
        {details}
        </div></div><hr/>
    "##,
            title = escape_html(&name),
        )
    }

    fn report_details(&self, batch: &Path, batch_key: &str) -> String {
        let mut html = String::new();
        for dirname in DEFAULT_DIRS {
            let section_id = format!("{}{}", dirname, batch_key);
            let _ = write!(
                html,
                r##"
        <h3 id="anchor{section_id}">Report {dirname}</h3>
        <p>
        <button class="btn btn-primary" type="button" data-toggle="collapse" data-target="#{section_id}" aria-expanded="false" aria-controls="{section_id}">Show</button>
        <a class="btn btn-primary" href="#{CONTENTS_ID}" role="button">To Contents</a>
        </p>
        <div class="collapse" id="{section_id}">
        <div class="card card-body">
        "##
            );
            let folder = batch.join(dirname);
            html.push_str(&match dirname {
                "Analyzer" => self.analyzer_section(&folder, batch_key),
                "Config" => self.config_section(&folder),
                "Grid" => self.grid_section(&folder),
                "Images" => self.items_section(&folder),
                _ => self.log_section(&folder),
            });
            let _ = writeln!(html, r##"<a href="#{CONTENTS_ID}">Up</a>"##);
            html.push_str("</div></div><hr/>\n");
        }
        html
    }

    fn insert_png(&self, path: &Path) -> String {
        let link = escape_html(&relative_path(path, self.report_dir).to_string_lossy());
        format!(r#"<img src="{link}" alt="{link}">"#)
    }

    /// Convert a file if its type is among `filetypes` (all supported types when `None`)
    fn convert_file_to_html(&self, path: &Path, filetypes: Option<&[&str]>) -> String {
        if !path.exists() {
            return to_list_element(&format!("<p>{} not found!</p>", escape_html(&path.to_string_lossy())));
        }
        let name = file_name(path);
        let eligible = |t: &str| filetypes.map_or(true, |types| types.contains(&t)) && name.ends_with(t);
        let html = if eligible(".json") {
            read_json(path).map(|j| json_to_html(&j)).unwrap_or_default()
        } else if eligible(".txt") {
            txt_to_html(&fs::read_to_string(path).unwrap_or_default())
        } else if eligible(".png") {
            self.insert_png(path)
        } else {
            return String::new();
        };
        make_collapsible(&html, &escape_html(&name))
    }

    fn directory_to_html_list(&self, folder: &Path, filetypes: &[&str]) -> String {
        let Ok(entries) = list_dir_sorted(folder) else {
            return "<p>Empty</p>\n".to_string();
        };
        let mut elements = String::new();
        for path in entries {
            if has_filetype(&file_name(&path), filetypes) {
                elements.push_str(&to_list_element(&self.convert_file_to_html(&path, None)));
            }
        }
        to_list(&elements)
    }

    fn analyzer_section(&self, folder: &Path, batch_key: &str) -> String {
        let mut html = String::from("<h4>Analyzer</h4>\n");
        let Ok(runs) = list_subdirs(folder) else {
            return html + "<p>Empty</p>\n";
        };
        for (run_index, run) in runs.iter().enumerate() {
            let run_name = file_name(run);
            let _ = write!(
                html,
                r#"<h4 style="background-color:#3379b7;color:white;">Run No. {}</h4>"#,
                escape_html(&run_name)
            );
            for (file, column) in ANALYZER_PLOTS {
                let chart_id = format!("{}{}_{}-{}", column, batch_key, html_id(&run_name), run_index);
                html.push_str(&data_plot(&run.join(file), column, &chart_id));
            }
            for log in ANALYZER_LOGS {
                if let Some(data) = read_json(&run.join(log)) {
                    html.push_str(&make_collapsible(&json_to_html(&data), log));
                }
            }
        }
        html
    }

    fn config_section(&self, folder: &Path) -> String {
        format!("<h4>Config</h4>\n{}", self.directory_to_html_list(folder, &[".txt"]))
    }

    fn grid_section(&self, folder: &Path) -> String {
        let html = String::from("<h4>Grid</h4>\n");
        let Ok(iterations) = list_subdirs(folder) else {
            return html + "<p>Empty</p>\n";
        };
        let mut items = String::new();
        for iteration in iterations {
            let listing = self.directory_to_html_list(&iteration, &[".json", ".txt"]);
            items.push_str(&to_list_element(&make_collapsible(
                &listing,
                &format!("Iteration {}", escape_html(&file_name(&iteration))),
            )));
            for graph in ["append_pipeline.txt", "pipeline.txt"] {
                items.push_str(&make_collapsible(&dot_to_svg(&iteration.join(graph)), graph));
            }
        }
        html + &to_list(&items)
    }

    fn items_section(&self, folder: &Path) -> String {
        let Ok(iterations) = list_subdirs(folder) else {
            return "<p>Empty</p>\n".to_string();
        };
        let mut html = String::new();
        for iteration in iterations {
            let listing = self.directory_to_html_list(&iteration, &[".png"]);
            html.push_str(&to_list_element(&format!(
                "Iteration {}: {}",
                escape_html(&file_name(&iteration)),
                listing
            )));
            html.push_str(&self.thumbnails(&iteration));
        }
        make_collapsible(&html, "<h4>Items</h4>")
    }

    fn thumbnails(&self, folder: &Path) -> String {
        list_dir_sorted(folder)
            .unwrap_or_default()
            .iter()
            .filter(|p| has_filetype(&file_name(p), &[".jpg", ".png"]))
            .take(MAX_THUMBNAILS)
            .map(|p| {
                let link = escape_html(&relative_path(p, self.report_dir).to_string_lossy());
                format!("<img src='{link}' width='25%' height='25%'><br />")
            })
            .collect()
    }

    fn log_section(&self, folder: &Path) -> String {
        if !folder.is_dir() {
            return "<h4>Log</h4>\n<p>Empty</p>\n".to_string();
        }
        let mut elements = String::new();
        for path in list_dir_sorted(folder).unwrap_or_default() {
            elements.push_str(&to_list_element(&self.convert_file_to_html(&path, Some(&[".txt"]))));
        }
        format!("<h4>Log</h4>\n{}", to_list(&elements))
    }
}
