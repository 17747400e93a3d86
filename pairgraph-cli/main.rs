use std::path::PathBuf;

use pairgraph_cli::{
    import_bundle, load_config, prebundle_info, run_feature_detect, CliError, CliResult,
    FeatureDetectParams,
};
use pairgraph_core::{init_thread_pool, PipelineConfig};
use pairgraph_prebundle::BundleFormat;
use structopt::StructOpt;

/// Helper program to organize and run 3d reconstruction pipelines.
#[derive(Debug, StructOpt)]
#[structopt(name = "pairgraph")]
enum Command {
    /// Detect per-image features, match every image pair and write the
    /// surviving correspondences
    #[structopt(name = "FeatureDetect")]
    FeatureDetect {
        /// Directory containing the input images
        image_directory: PathBuf,
        /// Output matches file
        output: PathBuf,
        /// Persist a key-file per image into this directory
        #[structopt(long = "key-dir")]
        key_dir: Option<PathBuf>,
        /// Also save a prebundle checkpoint to this path
        #[structopt(long)]
        prebundle: Option<PathBuf>,
        /// Write keypoint overlay images into this directory
        #[structopt(long = "draw-dir")]
        draw_dir: Option<PathBuf>,
        /// TOML pipeline configuration file
        #[structopt(long)]
        config: Option<PathBuf>,
        /// Worker threads (defaults to available parallelism)
        #[structopt(long)]
        threads: Option<usize>,
    },
    /// Print statistics of a prebundle checkpoint file
    #[structopt(name = "PrebundleInfo")]
    PrebundleInfo { path: PathBuf },
    /// Parse a legacy bundle file (photosynther or bundler) and print
    /// its statistics
    #[structopt(name = "ImportBundle")]
    ImportBundle {
        format: BundleFormat,
        path: PathBuf,
    },
}

fn run(command: Command) -> CliResult<()> {
    match command {
        Command::FeatureDetect {
            image_directory,
            output,
            key_dir,
            prebundle,
            draw_dir,
            config,
            threads,
        } => {
            let mut cfg = match config {
                Some(path) => load_config(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(threads) = threads {
                cfg.n_threads = threads.max(1);
            }
            init_thread_pool(cfg.n_threads).map_err(CliError::ThreadPool)?;

            let report = run_feature_detect(&FeatureDetectParams {
                image_directory,
                output,
                key_dir,
                prebundle,
                draw_dir,
                config: cfg,
            })?;
            println!(
                "{} images, {} pairs matched, {} pairs retained, {} correspondences",
                report.image_count,
                report.pair_task_count,
                report.retained_pairs,
                report.total_matches
            );
        }
        Command::PrebundleInfo { path } => {
            let stats = prebundle_info(&path)?;
            println!(
                "{} viewports, {} features, {} pairs, {} correspondences",
                stats.viewport_count, stats.feature_count, stats.pair_count, stats.match_count
            );
        }
        Command::ImportBundle { format, path } => {
            let bundle = import_bundle(&path, format)?;
            println!(
                "{} cameras, {} features",
                bundle.cameras.len(),
                bundle.features.len()
            );
        }
    }
    Ok(())
}

fn main() {
    pretty_env_logger::init();
    if let Err(e) = run(Command::from_args()) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
