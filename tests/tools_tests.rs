use cgpkit::compare::process_compare;
use cgpkit::config::{CompareArgs, PlotMode};
use cgpkit::label_config::write_config;
use cgpkit::plot::plot_errors;
use cgpkit::project_refs::{fix_references, rewrite_hint_paths};
use cgpkit::spreadsheet::{convert_directory, convert_workbook};
use cgpkit::Error;
use std::fs;
use std::path::Path;

const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="14.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup>
    <Reference Include="halcondotnet, Version=13.0.0.0, Culture=neutral">
      <HintPath>C:\Program Files\MVTec\HALCON-13.0\bin\dotnet35\halcondotnet.dll</HintPath>
    </Reference>
    <Reference Include="Newtonsoft.Json">
      <HintPath>..\packages\Newtonsoft.Json\bin\Newtonsoft.Json.dll</HintPath>
    </Reference>
    <Reference Include="System" />
  </ItemGroup>
</Project>
"#;

#[test]
fn test_rewrite_only_halcon_hint_path() {
    let (rewritten, replaced) = rewrite_hint_paths(PROJECT, "$(HALCONROOT)").unwrap();

    assert_eq!(replaced, 1);
    assert!(rewritten.contains(r"<HintPath>$(HALCONROOT)\bin\dotnet35\halcondotnet.dll</HintPath>"));
    assert!(rewritten.contains(r"<HintPath>..\packages\Newtonsoft.Json\bin\Newtonsoft.Json.dll</HintPath>"));
    assert!(rewritten.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
}

#[test]
fn test_fix_references_walks_project_dirs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let project_dir = temp_dir.path().join("Optimization");
    fs::create_dir_all(&project_dir).unwrap();
    fs::write(project_dir.join("Optimization.csproj"), PROJECT).unwrap();
    fs::write(temp_dir.path().join("Top.csproj"), PROJECT).unwrap();

    assert_eq!(fix_references(temp_dir.path(), "D:\\Halcon\\").unwrap(), 1);
    let fixed = fs::read_to_string(project_dir.join("Optimization.csproj")).unwrap();
    assert!(fixed.contains(r"D:\Halcon\bin\dotnet35\halcondotnet.dll"));
    // only one level below the root is scanned
    assert_eq!(fs::read_to_string(temp_dir.path().join("Top.csproj")).unwrap(), PROJECT);
}

#[test]
fn test_write_config_replaces_destination() {
    let temp_dir = tempfile::tempdir().unwrap();
    let csv = temp_dir.path().join("data.csv");
    let dest = temp_dir.path().join("label_studio_config.xml");
    fs::write(&csv, "t,speed\n0,1\n").unwrap();
    fs::write(&dest, "stale").unwrap();

    write_config(&csv, &dest, Some(3)).unwrap();
    let config = fs::read_to_string(&dest).unwrap();
    assert!(config.contains(r#"<TimeSeries name="ts" timeColumn="t""#));
    assert!(config.contains(r##"<Channel column="speed" strokeColor="#"##));
}

#[test]
fn test_plot_errors_writes_one_svg_per_mode() {
    let temp_dir = tempfile::tempdir().unwrap();
    let freq = temp_dir.path().join("frequency.txt");
    let errors = temp_dir.path().join("pipelinePercentError.txt");
    fs::write(&freq, "0,10,100,1000\n").unwrap();
    fs::write(&errors, "1,-2,3,40\n0.5,0.25,-0.1,7\n").unwrap();

    let out = temp_dir.path().join("plots");
    let written = plot_errors(&freq, &errors, &out, &[PlotMode::SemilogX, PlotMode::LogLog, PlotMode::SemilogY]).unwrap();

    assert_eq!(written.len(), 3);
    for name in ["semilogX.svg", "loglog.svg", "semilogY.svg"] {
        let svg = fs::read_to_string(out.join(name)).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("% error"));
    }
}

#[test]
fn test_plot_errors_rejects_text() {
    let temp_dir = tempfile::tempdir().unwrap();
    let freq = temp_dir.path().join("frequency.txt");
    let errors = temp_dir.path().join("errors.txt");
    fs::write(&freq, "1,2\n").unwrap();
    fs::write(&errors, "1,x\n").unwrap();

    assert!(matches!(
        plot_errors(&freq, &errors, temp_dir.path(), &[PlotMode::SemilogX]),
        Err(Error::Parse(_))
    ));
}

fn workbook_fixture() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/measurements.xlsx")
}

#[test]
fn test_convert_workbook_first_sheet() {
    let temp_dir = tempfile::tempdir().unwrap();
    let target = temp_dir.path().join("measurements.csv");

    assert_eq!(convert_workbook(&workbook_fixture(), &target).unwrap(), 3);
    assert_eq!(fs::read_to_string(&target).unwrap(), "time,value\n0.5,2.5\n1.5,-0.25\n");
}

#[test]
fn test_convert_directory_keeps_dotted_names() {
    let temp_dir = tempfile::tempdir().unwrap();
    for name in ["run.2020.xlsx", "run.2021.xlsx"] {
        fs::copy(workbook_fixture(), temp_dir.path().join(name)).unwrap();
    }
    fs::write(temp_dir.path().join("notes.txt"), "not a workbook").unwrap();

    let out = temp_dir.path().join("csv");
    assert_eq!(convert_directory(temp_dir.path(), &out, "csv").unwrap(), 2);
    let mut names: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["run.2020.csv", "run.2021.csv"]);
}

fn write_version(root: &Path, version: &str, image: &str, best: [f64; 2]) {
    let image_dir = root.join(version).join(image);
    fs::create_dir_all(&image_dir).unwrap();
    let overview: String = best
        .iter()
        .enumerate()
        .map(|(run, b)| format!("run {} best fitness {} seconds 10\n", run, b))
        .collect();
    fs::write(image_dir.join("overview.txt"), overview).unwrap();
    for (run, b) in best.iter().enumerate() {
        let analyzer = image_dir.join("Analyzer").join(run.to_string());
        fs::create_dir_all(&analyzer).unwrap();
        fs::write(
            analyzer.join("BestIndividualFit.txt"),
            format!("Fitness Generation\n{} 0\n{} 1\n", b / 2.0, b),
        )
        .unwrap();
    }
}

#[test]
fn test_compare_versions() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data = temp_dir.path().join("data");
    write_version(&data, "aaa111", "gear", [0.5, 1.0]);
    write_version(&data, "bbb222", "gear", [0.25, 0.75]);
    // only present in one version
    write_version(&data, "aaa111", "bolt", [0.1, 0.2]);

    let args = CompareArgs {
        data_dir: data,
        results_dir: temp_dir.path().join("results"),
        version_a: "aaa111".to_string(),
        version_b: "bbb222".to_string(),
        iterations: 2,
    };
    let stats = process_compare(&args).unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].version, "aaa111");
    assert_eq!(stats[0].mean, 0.75);
    assert_eq!(stats[0].max, 1.0);
    assert_eq!(stats[0].min, 0.25);
    assert_eq!(stats[1].mean, 0.5);

    let compare_dir = temp_dir.path().join("results/CompareResults");
    let summary = fs::read_to_string(compare_dir.join("compareResults_version_aaa111_with_bbb222.txt")).unwrap();
    assert!(summary.contains("Version: aaa111"));
    assert!(summary.contains("Version: bbb222"));
    assert!(compare_dir.join("Bilder/fitness_curves.svg").exists());
    assert!(compare_dir.join("Bilder/normal_distribution_aaa111.svg").exists());
}

#[test]
fn test_compare_missing_version() {
    let temp_dir = tempfile::tempdir().unwrap();
    let args = CompareArgs {
        data_dir: temp_dir.path().to_path_buf(),
        results_dir: temp_dir.path().join("results"),
        version_a: "x".to_string(),
        version_b: "y".to_string(),
        iterations: 5,
    };
    assert!(matches!(process_compare(&args), Err(Error::MissingDirectory(_))));
}
