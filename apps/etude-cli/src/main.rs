use clap::{Parser, Subcommand};
use etude_stage::{ModelOutcome, SceneSummary, Stage, StageConfig, StageEvent};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "etude-cli", about = "Run the etude stage without a window")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage config file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Asset directory, overrides the config
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the freshly built scene
    Info,
    /// Advance the stage a number of frames
    Run {
        /// Number of frames to run
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Pointer position in surface pixels
        #[arg(long, num_args = 2, value_names = ["X", "Y"])]
        pointer: Option<Vec<f32>>,
        /// Surface size in pixels
        #[arg(long, num_args = 2, value_names = ["W", "H"])]
        size: Option<Vec<u32>>,
        /// Block until the model load resolves before the first frame
        #[arg(long)]
        wait_model: bool,
    },
    /// Print the effective config as YAML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    if let Some(root) = cli.assets {
        config = config.with_asset_root(root);
    }

    match cli.command {
        Commands::Info => {
            println!("etude-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", config.assets.root.display());
            let stage = Stage::new(config);
            print!("{}", SceneSummary::capture(&stage));
            stage.dispose();
        }
        Commands::Run {
            frames,
            pointer,
            size,
            wait_model,
        } => {
            let mut stage = Stage::new(config);
            if let Some([width, height]) = size.as_deref() {
                stage.handle(StageEvent::Resized {
                    width: *width,
                    height: *height,
                });
            }
            if let Some([x, y]) = pointer.as_deref() {
                stage.handle(StageEvent::PointerMoved { x: *x, y: *y });
            }
            if wait_model {
                report_model(stage.wait_for_model());
            }

            let mut total_hits = 0usize;
            for _ in 0..frames {
                let report = stage.frame();
                report_model(report.model);
                for event in &report.scene_events {
                    tracing::debug!(frame = report.frame, ?event, "scene changed");
                }
                total_hits += report.hits.len();
                if let Some(first) = report.hits.first() {
                    tracing::debug!(
                        frame = report.frame,
                        hits = report.hits.len(),
                        nearest = %first.name,
                        "pointer over scene"
                    );
                }
            }

            println!("Ran {frames} frames, {total_hits} intersections");
            print!("{}", SceneSummary::capture(&stage));
            stage.dispose();
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

fn report_model(outcome: Option<ModelOutcome>) {
    match outcome {
        Some(ModelOutcome::Loaded(id)) => println!("Model loaded as {id}"),
        Some(ModelOutcome::Failed(message)) => println!("Model failed: {message}"),
        None => {}
    }
}
