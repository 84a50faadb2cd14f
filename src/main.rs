//! colornet CLI - colorize grayscale images.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use colornet::model::{Device, ModelHandle, OnnxBackend, OnnxConfig, OperatorRegistry};
use colornet::{Colorizer, Config};

/// Colorize a grayscale image with a LAB-space colorization network.
#[derive(Parser, Debug)]
#[command(name = "colornet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path.
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Graph definition (ONNX model).
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    /// Weights file bound to the graph definition.
    #[arg(short, long, value_name = "PATH")]
    weights: PathBuf,

    /// Output format (png, jpg, ...). Defaults to the output file's extension.
    #[arg(short, long, value_name = "EXT")]
    format: Option<String>,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "95", value_name = "INT")]
    quality: u8,

    /// Name of the network's luminance input.
    #[arg(long, default_value = colornet::model::DEFAULT_INPUT_NAME, value_name = "NAME")]
    input_name: String,

    /// Name of the network's chrominance output.
    #[arg(long, default_value = colornet::model::DEFAULT_OUTPUT_NAME, value_name = "NAME")]
    output_name: String,

    /// Intra-op threads for inference (0 = automatic).
    #[arg(long, default_value = "0", value_name = "INT")]
    threads: usize,

    /// Run inference on this CUDA device, falling back to the CPU.
    #[arg(long, value_name = "ID")]
    cuda: Option<i32>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("colornet={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    let format = args
        .format
        .clone()
        .or_else(|| {
            args.output
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string)
        })
        .context("No output format given and the output path has no extension")?;

    let config = Config {
        input_name: args.input_name.clone(),
        output_name: args.output_name.clone(),
        jpeg_quality: args.quality,
        ..Config::default()
    };
    let colorizer = Colorizer::new(config).context("Invalid configuration")?;

    let backend = OnnxBackend::new(OnnxConfig {
        intra_threads: args.threads,
        device: args.cuda.map_or(Device::Cpu, Device::Cuda),
        ..OnnxConfig::default()
    });
    let model = ModelHandle::load(
        &backend,
        &OperatorRegistry::with_defaults(),
        &args.model,
        &args.weights,
    )
    .context("Failed to load model")?;

    let input = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let output = colorizer
        .infer(&input, Some(&model), Some(format.as_str()))
        .context("Failed to colorize image")?;

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Successfully colorized {} -> {}",
        args.input.display(),
        args.output.display()
    );

    Ok(())
}
