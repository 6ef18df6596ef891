use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use std::path::Path;

use crate::config::SplitArgs;
use crate::error::{Error, Result};
use crate::types::{file_stem, ImagePair, SplitData};
use crate::utils::{copy_pairs_in_parallel, create_output_directory, create_progress_bar, list_dir_sorted};

pub const IMAGE_DIR_NAME: &str = "images";
pub const LABEL_DIR_NAME: &str = "labels";

/// Pair the sorted contents of `<dir>/images` and `<dir>/labels`.
///
/// Both folders must hold the same number of files and the n-th image must
/// share its stem with the n-th label.
pub fn collect_pairs(dir: &Path) -> Result<Vec<ImagePair>> {
    let image_dir = dir.join(IMAGE_DIR_NAME);
    let label_dir = dir.join(LABEL_DIR_NAME);
    for d in [&image_dir, &label_dir] {
        if !d.is_dir() {
            return Err(Error::MissingDirectory(d.clone()));
        }
    }

    let images = list_files(&image_dir)?;
    let labels = list_files(&label_dir)?;
    if images.len() != labels.len() {
        return Err(Error::PairCountMismatch {
            images: images.len(),
            labels: labels.len(),
        });
    }

    images
        .into_iter()
        .zip(labels)
        .map(|(image, label)| {
            if file_stem(&image) == file_stem(&label) {
                Ok(ImagePair { image, label })
            } else {
                Err(Error::MismatchedPair { image, label })
            }
        })
        .collect()
}

fn list_files(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    Ok(list_dir_sorted(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

/// Split the pairs into training, validation, and testing sets
pub fn split_pairs(mut pairs: Vec<ImagePair>, val_size: f32, test_size: f32, seed: u64) -> SplitData {
    let mut rng = StdRng::seed_from_u64(seed);
    pairs.shuffle(&mut rng);

    let total = pairs.len();
    let test_size = ((total as f32 * test_size).ceil() as usize).min(total);
    let val_size = ((total as f32 * val_size).ceil() as usize).min(total - test_size);

    let test = pairs.drain(0..test_size).collect();
    let val = pairs.drain(0..val_size).collect();

    SplitData {
        train: pairs,
        val,
        test,
    }
}

/// Copy each subset into `<out>/<subset>/{images,labels}`
pub fn write_split(split: &SplitData, out: &Path) -> Result<()> {
    for (name, pairs) in split.subsets() {
        let dest = create_output_directory(&out.join(name))?;
        let pb = create_progress_bar(pairs.len() as u64, name);
        let stats = copy_pairs_in_parallel(pairs, &dest, &pb)?;
        pb.finish_with_message(format!("{} copy complete", name));
        stats.print_summary(name);
    }
    Ok(())
}

/// Draw small training subsets for few-sample experiments.
///
/// For every size, `size * runs` distinct pairs are sampled from `train` and
/// chunk `r` lands in `<out>/train_experiment/<size>/<r>/train`.
/// Returns the number of subsets written.
pub fn write_few_shot(train: &[ImagePair], out: &Path, sizes: &[usize], runs: u32, seed: u64) -> Result<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let runs = runs as usize;
    let experiment_dir = out.join("train_experiment");
    let mut written = 0;

    for &size in sizes {
        let amount = size * runs;
        if size == 0 || amount > train.len() {
            warn!(
                "Skipping subset size {}: needs {} training pairs, only {} available",
                size,
                amount,
                train.len()
            );
            continue;
        }

        let picked = index::sample(&mut rng, train.len(), amount).into_vec();
        for (run, chunk) in picked.chunks(size).enumerate() {
            let dest = create_output_directory(&experiment_dir.join(size.to_string()).join(run.to_string()).join("train"))?;
            let subset: Vec<ImagePair> = chunk.iter().map(|&i| train[i].clone()).collect();
            let pb = create_progress_bar(subset.len() as u64, &format!("{}-shot run {}", size, run));
            copy_pairs_in_parallel(&subset, &dest, &pb)?;
            pb.finish_and_clear();
            written += 1;
        }
    }
    Ok(written)
}

/// Main dataset splitting pipeline
pub fn process_split(args: &SplitArgs) -> Result<SplitData> {
    let pairs = collect_pairs(&args.input_dir)?;
    info!("Found {} image/label pairs.", pairs.len());

    let split = split_pairs(pairs, args.val_size, args.test_size, args.seed);
    info!(
        "Split into {} train, {} val and {} test pairs.",
        split.train.len(),
        split.val.len(),
        split.test.len()
    );
    write_split(&split, &args.output_dir)?;

    let subsets = write_few_shot(
        &split.train,
        &args.output_dir,
        &args.shot_sizes,
        args.runs,
        args.seed,
    )?;
    info!("Wrote {} few-shot training subsets.", subsets);
    Ok(split)
}
