use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wardrobe::asset::{ImageAsset, check_image_file};
use wardrobe::config::{self, WardrobeConfig};
use wardrobe::imaging::{RustBackend, compress_image, get_dimensions};
use wardrobe::output;
use wardrobe::rate_limit::RateLimiter;
use wardrobe::service::{Credential, FalClient};
use wardrobe::transform::{BlendMode, QualityHint, TransformOptions, Transformer};

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(about = "Virtual try-on: put a garment photo onto a person photo")]
#[command(long_about = "\
Virtual try-on: put a garment photo onto a person photo

Both photos are checked locally, shrunk to fit 1024x1024, and sent to a
hosted image-edit model together with a fixed instruction. The result is
a generated image URL, optionally downloaded to a file.

The API key is read from the environment variable named in the config
(FAL_KEY by default). A .env file in the working directory is honored.

Run 'wardrobe gen-config' to generate a documented wardrobe.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; defaults apply when absent)
    #[arg(long, default_value = "wardrobe.toml", global = true)]
    config: PathBuf,

    /// Log debug detail to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct TransformArgs {
    /// Photo of the person to dress
    #[arg(long)]
    person: PathBuf,

    /// Photo of the garment to put on
    #[arg(long)]
    garment: PathBuf,

    /// Download the result image to this file
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = QualityHint::Standard)]
    quality: QualityHint,

    /// Allow the face and pose to change
    #[arg(long)]
    no_preserve_face: bool,

    #[arg(long, value_enum, default_value_t = BlendMode::Natural)]
    blend: BlendMode,

    /// Fixed seed for reproducible results
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args)]
struct CompressArgs {
    /// Image to compress
    file: PathBuf,

    /// Where to write the compressed image
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    /// Encoding quality, 1-100
    #[arg(long)]
    quality: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Dress the person in the garment
    Transform(TransformArgs),
    /// Validate image files without sending anything
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Shrink an image locally the way transform does before upload
    Compress(CompressArgs),
    /// Show credential and rate-limit state (no network)
    Status,
    /// Print a stock wardrobe.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // Before tracing, so RUST_LOG may come from .env. A missing file is fine.
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Transform(args) => {
            let config = config::load_config(&cli.config)?;
            run_transform(config, args).await?;
        }
        Command::Check { files } => {
            let config = config::load_config(&cli.config)?;
            if !run_check(&config, &files)? {
                std::process::exit(1);
            }
        }
        Command::Compress(args) => {
            let mut config = config::load_config(&cli.config)?;
            if let Some(w) = args.max_width {
                config.compression.max_width = w;
            }
            if let Some(h) = args.max_height {
                config.compression.max_height = h;
            }
            if let Some(q) = args.quality {
                config.compression.quality = q;
            }
            config.validate()?;
            run_compress(&config, &args.file, &args.out)?;
        }
        Command::Status => {
            let config = config::load_config(&cli.config)?;
            let transformer = build_transformer(&config)?;
            output::print_status(
                &config.service.endpoint(),
                &transformer.availability(),
                &config.limits.rate_limit(),
            );
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for command output.
fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("wardrobe=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn build_transformer(
    config: &WardrobeConfig,
) -> Result<Transformer<FalClient>, Box<dyn std::error::Error>> {
    let client = FalClient::new(&config.service)?;
    let limiter = Arc::new(RateLimiter::new(config.limits.rate_limit()));
    Ok(Transformer::new(
        config.clone(),
        limiter,
        Arc::new(RustBackend::new()),
        client,
        Credential::from_env(&config.service.credential_env),
    ))
}

async fn run_transform(
    config: WardrobeConfig,
    args: TransformArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let person = ImageAsset::from_path(&args.person)?;
    let garment = ImageAsset::from_path(&args.garment)?;
    let options = TransformOptions {
        quality: args.quality,
        preserve_face: !args.no_preserve_face,
        blend: args.blend,
        seed: args.seed,
    };

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_transform_event(&event) {
                println!("{}", line);
            }
        }
    });

    let downloader = FalClient::new(&config.service)?;
    let transformer = build_transformer(&config)?.with_events(tx);
    let result = transformer
        .transform(Some(&person), Some(&garment), &options)
        .await;

    // Closes the event channel so the printer drains and exits
    drop(transformer);
    let _ = printer.join();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            output::print_failure(&err);
            std::process::exit(1);
        }
    };
    output::print_outcome(&outcome);

    if let Some(path) = &args.output {
        match save_result(&downloader, &outcome.image, path).await {
            Ok(()) => output::print_save(path, None),
            Err(err) => {
                output::print_save(path, Some(&err.to_string()));
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

/// Download the generated image and write it to `path`.
async fn save_result(
    client: &FalClient,
    url: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    let image = client.download(url, &name).await?;
    std::fs::write(path, &image.bytes)?;
    Ok(())
}

/// Returns whether every file passed.
fn run_check(
    config: &WardrobeConfig,
    files: &[PathBuf],
) -> Result<bool, Box<dyn std::error::Error>> {
    let backend = RustBackend::new();
    let mut all_ok = true;

    for path in files {
        let asset = ImageAsset::from_path(path)?;
        let dimensions = get_dimensions(&backend, &asset).ok();
        let problem = match check_image_file(Some(&asset), &config.upload) {
            Err(e) => Some(e.to_string()),
            Ok(()) if dimensions.is_none() => Some("file does not decode as an image".to_string()),
            Ok(()) => None,
        };
        all_ok &= problem.is_none();
        output::print_check(&asset, dimensions, problem.as_deref());
    }

    Ok(all_ok)
}

fn run_compress(
    config: &WardrobeConfig,
    file: &Path,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = RustBackend::new();
    let original = ImageAsset::from_path(file)?;
    let original_dims = get_dimensions(&backend, &original)?;
    let compressed = compress_image(&backend, &original, &config.compression.compress())?;
    let compressed_dims = get_dimensions(&backend, &compressed)?;
    std::fs::write(out, &compressed.bytes)?;
    output::print_compress(&original, original_dims, &compressed, compressed_dims, out);
    Ok(())
}
