use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use coreg_core::align::{CancellationToken, StackAligner};
use coreg_core::config::AlignmentConfig;
use coreg_core::frame::{Frame, LayerKind, Stack};
use coreg_core::io::image_io::{load_image, load_labels, save_image, save_labels};
use indicatif::{ProgressBar, ProgressStyle};

use super::config::MethodArg;
use crate::summary::{print_config_summary, print_frame_table};

const IMAGE_LAYER: &str = "image";
const LABEL_LAYER: &str = "labels";

#[derive(Args)]
pub struct AlignArgs {
    /// Input images, in temporal order
    #[arg(required = true, num_args = 1..)]
    pub images: Vec<PathBuf>,

    /// Label rasters, one per input image, resampled as a categorical layer
    #[arg(long, num_args = 1..)]
    pub labels: Vec<PathBuf>,

    /// Alignment config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Registration algorithm (overrides the config file)
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Index of the reference frame (overrides the config file)
    #[arg(long)]
    pub reference: Option<usize>,

    /// Estimate and report transforms without writing aligned images
    #[arg(long)]
    pub dry_run: bool,

    /// Output directory
    #[arg(short, long, default_value = "aligned")]
    pub output: PathBuf,
}

pub fn run(args: &AlignArgs) -> Result<()> {
    let mut config = load_config(args)?;
    if !args.labels.is_empty() {
        if args.labels.len() != args.images.len() {
            bail!(
                "{} label rasters given for {} images",
                args.labels.len(),
                args.images.len()
            );
        }
        config = config.with_layer_kind(LABEL_LAYER, LayerKind::Categorical);
    }

    let stack = read_stack(args)?;
    let aligner = StackAligner::new(config).context("Invalid alignment config")?;
    print_config_summary(aligner.config(), stack.len(), stack.dim());

    let pb = ProgressBar::new(stack.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("Aligning [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let cancel = CancellationToken::new();
    let on_frame_done = |done: usize| pb.set_position(done as u64);

    if args.dry_run {
        let reports = aligner.estimate_with_progress(&stack, &cancel, on_frame_done)?;
        pb.finish();
        print_frame_table(&reports);
        return Ok(());
    }

    let outcome = aligner.align_with_progress(&stack, &cancel, on_frame_done)?;
    pb.finish();
    print_frame_table(&outcome.reports);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    for (i, frame) in outcome.stack.frames().iter().enumerate() {
        let stem = file_stem(&args.images[i], i);
        let image = frame.layer(IMAGE_LAYER)?;
        let path = args.output.join(format!("{stem}.tiff"));
        save_image(&image.channel(0), &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if let Ok(labels) = frame.layer(LABEL_LAYER) {
            let path = args.output.join(format!("{stem}_labels.png"));
            save_labels(&labels.channel(0), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    println!(
        "Saved {} frames to {}",
        outcome.stack.len(),
        args.output.display()
    );
    Ok(())
}

fn load_config(args: &AlignArgs) -> Result<AlignmentConfig> {
    let mut config: AlignmentConfig = if let Some(ref path) = args.config {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid alignment config")?
    } else {
        AlignmentConfig::default()
    };
    if let Some(method) = args.method {
        config.algorithm = method.to_method();
    }
    if let Some(reference) = args.reference {
        config.reference_index = reference;
    }
    Ok(config)
}

fn read_stack(args: &AlignArgs) -> Result<Stack> {
    println!("Reading {} images...", args.images.len());
    let mut frames = Vec::with_capacity(args.images.len());
    for (i, path) in args.images.iter().enumerate() {
        let image =
            load_image(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut frame = Frame::new().with_layer(IMAGE_LAYER, image);
        if let Some(label_path) = args.labels.get(i) {
            let labels = load_labels(label_path)
                .with_context(|| format!("Failed to read {}", label_path.display()))?;
            frame = frame.with_layer(LABEL_LAYER, labels);
        }
        frames.push(frame);
    }
    Ok(Stack::new(frames)?)
}

fn file_stem(path: &Path, index: usize) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("frame_{index:04}"))
}
