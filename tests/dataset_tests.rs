mod common;

use cgpkit::config::SplitArgs;
use cgpkit::dataset::{collect_pairs, process_split, write_few_shot};
use cgpkit::sort_classes::sort_by_class;
use cgpkit::Error;
use std::collections::HashSet;
use std::fs;

use common::{count_files, make_dataset};

fn split_args(input: &std::path::Path, output: &std::path::Path) -> SplitArgs {
    SplitArgs {
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        val_size: 0.2,
        test_size: 0.2,
        seed: 42,
        shot_sizes: vec![1, 3],
        runs: 2,
    }
}

#[test]
fn test_collect_pairs_ignores_thumbnail_cache() {
    let temp_dir = tempfile::tempdir().unwrap();
    make_dataset(temp_dir.path(), 3);
    fs::write(temp_dir.path().join("images/Thumbs.db"), b"cache").unwrap();

    let pairs = collect_pairs(temp_dir.path()).unwrap();
    assert_eq!(pairs.len(), 3);
    assert!(pairs.iter().all(|p| p.image.file_stem() == p.label.file_stem()));
}

#[test]
fn test_collect_pairs_rejects_mismatch() {
    let temp_dir = tempfile::tempdir().unwrap();
    make_dataset(temp_dir.path(), 2);
    fs::rename(
        temp_dir.path().join("labels/img_01.png"),
        temp_dir.path().join("labels/other.png"),
    )
    .unwrap();

    assert!(matches!(
        collect_pairs(temp_dir.path()),
        Err(Error::MismatchedPair { .. })
    ));
}

#[test]
fn test_collect_pairs_rejects_count_mismatch() {
    let temp_dir = tempfile::tempdir().unwrap();
    make_dataset(temp_dir.path(), 2);
    fs::remove_file(temp_dir.path().join("labels/img_00.png")).unwrap();

    assert!(matches!(
        collect_pairs(temp_dir.path()),
        Err(Error::PairCountMismatch { images: 2, labels: 1 })
    ));
}

#[test]
fn test_split_covers_every_pair_once() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("data");
    let output = temp_dir.path().join("out");
    make_dataset(&input, 10);

    let split = process_split(&split_args(&input, &output)).unwrap();
    assert_eq!(split.len(), 10);
    assert_eq!(split.train.len(), 6);
    assert_eq!(split.val.len(), 2);
    assert_eq!(split.test.len(), 2);

    let mut seen = HashSet::new();
    for subset in ["train", "val", "test"] {
        let images = output.join(subset).join("images");
        let labels = output.join(subset).join("labels");
        assert_eq!(count_files(&images), count_files(&labels));
        for entry in fs::read_dir(&images).unwrap() {
            let name = entry.unwrap().file_name();
            assert!(labels.join(&name).exists());
            assert!(seen.insert(name), "pair copied twice");
        }
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn test_split_writes_few_shot_subsets() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("data");
    let output = temp_dir.path().join("out");
    make_dataset(&input, 10);

    process_split(&split_args(&input, &output)).unwrap();

    for (size, run) in [(1, 0), (1, 1), (3, 0), (3, 1)] {
        let dir = output
            .join("train_experiment")
            .join(size.to_string())
            .join(run.to_string())
            .join("train");
        assert_eq!(count_files(&dir.join("images")), size);
        assert_eq!(count_files(&dir.join("labels")), size);
    }
}

#[test]
fn test_few_shot_skips_oversized_subsets() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("data");
    make_dataset(&input, 4);
    let pairs = collect_pairs(&input).unwrap();

    let written = write_few_shot(&pairs, temp_dir.path(), &[1, 50], 2, 1).unwrap();
    assert_eq!(written, 2);
    assert!(!temp_dir.path().join("train_experiment/50").exists());
}

#[test]
fn test_sort_by_class() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("parts");
    common::write_rgb(&input.join("images/a.png"), 4, 4);
    common::write_rgb(&input.join("images/b.png"), 4, 4);
    fs::create_dir_all(input.join("regions/a")).unwrap();
    fs::create_dir_all(input.join("regions/b")).unwrap();
    fs::write(input.join("regions/a/scratch_0.hobj"), b"").unwrap();
    fs::write(input.join("regions/a/dent_0.hobj"), b"").unwrap();
    fs::write(input.join("regions/b/scratch_0.hobj"), b"").unwrap();
    fs::write(input.join("regions/b/scratch_1.hobj"), b"").unwrap();

    let output = temp_dir.path().join("sorted");
    let counts = sort_by_class(&input, &output).unwrap();

    assert_eq!(counts["scratch"], 2);
    assert_eq!(counts["dent"], 1);
    assert_eq!(count_files(&output.join("scratch/images")), 2);
    assert_eq!(count_files(&output.join("scratch/regions")), 2);
    assert_eq!(count_files(&output.join("scratch/regions/b")), 2);
    assert_eq!(count_files(&output.join("dent/images")), 1);
    assert!(output.join("dent/regions/a/dent_0.hobj").exists());
    assert!(!output.join("dent/regions/b").exists());
}

#[test]
fn test_sort_by_class_requires_region_marker_layout() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("images")).unwrap();

    assert!(matches!(
        sort_by_class(temp_dir.path(), &temp_dir.path().join("out")),
        Err(Error::MissingDirectory(_))
    ));
}
