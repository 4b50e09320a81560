use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::config::{ModeConfig, RunConfig};
use crate::io::{FileSource, RecordSource};
use crate::selection::SelectionSet;
use crate::split::{self, NamePattern, PartitionLayout, Progress};

mod manifest;
pub use manifest::{OutputManifest, RunManifest};

/// Execute one run and return its manifest. The manifest is also written to
/// disk when the config names a path for it.
pub fn run(config: &RunConfig) -> Result<RunManifest> {
    config.validate()?;
    println!("Running {}: {}", config.mode.kind(), config.name);

    let source = FileSource::from_pattern(&config.input)
        .with_context(|| format!("Failed to resolve input: {}", config.input))?;
    println!("  Reading input from: {:?}", source.locations());

    let progress = if config.progress {
        Progress::visible()
    } else {
        Progress::hidden()
    };
    let declared = config.declared_count;

    let manifest = match &config.mode {
        ModeConfig::Split {
            selected,
            remainder,
            sample_size,
        } => {
            let seed = resolve_seed(config.seed);
            let selection =
                SelectionSet::draw(&mut StdRng::seed_from_u64(seed), declared, *sample_size)?;
            let report =
                split::split_two_way(&source, selected, remainder, declared, &selection, progress)
                    .context("Two-way split failed")?;

            println!(
                "  ✓ Wrote {} selected records to {}",
                report.selected,
                selected.display()
            );
            println!(
                "  ✓ Wrote {} remaining records to {}",
                report.remainder,
                remainder.display()
            );

            let mut manifest = new_manifest(config, &source, Some(seed));
            manifest.add_output("selected", selected, report.selected);
            manifest.add_output("remainder", remainder, report.remainder);
            manifest
        }
        ModeConfig::Sample {
            output,
            sample_size,
        } => {
            let seed = resolve_seed(config.seed);
            let selection =
                SelectionSet::draw(&mut StdRng::seed_from_u64(seed), declared, *sample_size)?;
            let report = split::sample(&source, output, declared, &selection, progress)
                .context("Sampling failed")?;

            if report.is_complete() {
                println!(
                    "  ✓ Wrote {} sampled records to {}",
                    report.written,
                    output.display()
                );
            } else {
                println!(
                    "  ! Input ended early: wrote {} of {} sampled records to {}",
                    report.written,
                    report.requested,
                    output.display()
                );
            }

            let mut manifest = new_manifest(config, &source, Some(seed));
            manifest.add_output("sample", output, report.written);
            manifest
        }
        ModeConfig::Partition {
            output_dir,
            parts,
            name_pattern,
            write_mode,
        } => {
            let name_pattern = match name_pattern {
                Some(pattern) => NamePattern::new(pattern)?,
                None => NamePattern::default(),
            };
            let layout = PartitionLayout::new(output_dir, *parts)
                .with_name_pattern(name_pattern)
                .with_write_mode(*write_mode);
            let report = split::partition_round_robin(&source, &layout, declared, progress)
                .context("Round-robin partition failed")?;

            println!(
                "  ✓ Wrote {} records into {} partition files under {}",
                report.total(),
                report.partitions.len(),
                output_dir.display()
            );

            let mut manifest = new_manifest(config, &source, None);
            for partition in &report.partitions {
                manifest.add_output(
                    format!("partition-{}", partition.part),
                    &partition.path,
                    partition.records,
                );
            }
            manifest
        }
    };

    info!(
        total = manifest.total_records_written,
        outputs = manifest.outputs.len(),
        "run complete"
    );

    if let Some(path) = &config.manifest {
        manifest
            .write_to_file(path)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        println!("  ✓ Manifest written to: {}", path.display());
    }

    Ok(manifest)
}

/// Count the records behind an input path or glob pattern.
pub fn count(input: &str) -> Result<usize> {
    let source = FileSource::from_pattern(input)
        .with_context(|| format!("Failed to resolve input: {}", input))?;
    let count = split::count_records(&source)
        .with_context(|| format!("Failed to count records in {}", input))?;
    Ok(count)
}

fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => seed,
        None => {
            let seed: u64 = rand::rng().random();
            info!(seed, "no seed configured, drew one");
            seed
        }
    }
}

fn new_manifest(config: &RunConfig, source: &FileSource, seed: Option<u64>) -> RunManifest {
    RunManifest::new(
        config.name.clone(),
        config.mode.kind(),
        source.locations(),
        config.declared_count,
        seed,
    )
}
