mod cricket;
mod llm;
mod x_api;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pitchside::config::BotConfig;
use pitchside::cycle::run_decision_cycle;
use pitchside::decision::{DecisionEngine, StyleBook};
use pitchside::feedback::run_feedback_cycle;
use pitchside::safety::{Pacing, RecentPosts};
use pitchside::store::PostStore;

use crate::cricket::CricketClient;
use crate::llm::{LlmClient, QUOTA_HELP};
use crate::x_api::XApiClient;

#[derive(Parser)]
#[command(
    name = "pitchside",
    about = "Cricket match watcher that drafts, ranks, and posts match moments"
)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the watch loop (and the feedback loop alongside it)
    Watch(WatchArgs),
    /// Run one feedback reconciliation cycle and exit
    Feedback(FeedbackArgs),
    /// Show average engagement per narrative label
    Stats,
}

#[derive(Args, Debug, Clone, Default)]
struct WatchArgs {
    /// Override the generation model
    #[arg(long)]
    model: Option<String>,
    /// Run a single decision cycle and exit
    #[arg(long)]
    once: bool,
    /// Disable the randomized publish delays
    #[arg(long)]
    no_pacing: bool,
}

#[derive(Args, Debug, Clone)]
struct FeedbackArgs {
    #[arg(long)]
    batch_size: Option<u32>,
    #[arg(long)]
    delay_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = BotConfig::load(cli.config)?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        info!(path = %path.display(), "loaded config");
    }

    let command = cli.command.unwrap_or(Command::Watch(WatchArgs::default()));
    match command {
        Command::Watch(args) => run_watch(config, args).await,
        Command::Feedback(args) => run_feedback(config, args).await,
        Command::Stats => run_stats(config).await,
    }
}

async fn run_watch(config: BotConfig, args: WatchArgs) -> Result<(), String> {
    let store = PostStore::connect(&config.storage.db_path)
        .await
        .map_err(|err| err.to_string())?;
    let source =
        CricketClient::from_env().ok_or_else(|| "CRICAPI_API_KEY is not set".to_string())?;
    let generator =
        LlmClient::from_env(args.model).ok_or_else(|| "OPENAI_API_KEY is not set".to_string())?;
    let style = StyleBook::load(Path::new(&config.generation.style_examples_path));
    let engine = DecisionEngine::new(generator, style);
    let sink = XApiClient::from_env().ok_or_else(|| "X_API_BEARER_TOKEN is not set".to_string())?;
    let mut guard = RecentPosts::new();
    let pacing = if args.no_pacing {
        Pacing::disabled()
    } else {
        Pacing::from_config(&config.pacing)
    };
    let candidates = config.generation.candidates;

    if args.once {
        let posted = run_decision_cycle(
            &source, &engine, &sink, &store, &mut guard, &pacing, candidates,
        )
        .await
        .map_err(generation_failure)?;
        info!(posted, "decision cycle complete");
        return Ok(());
    }

    let mut match_tick = tokio::time::interval(Duration::from_secs(config.watch.match_loop_secs));
    let mut feedback_tick =
        tokio::time::interval(Duration::from_secs(config.watch.feedback_loop_secs));
    let feedback_delay = Duration::from_secs(config.watch.feedback_delay_secs);

    loop {
        tokio::select! {
            _ = match_tick.tick() => {
                let result = run_decision_cycle(
                    &source, &engine, &sink, &store, &mut guard, &pacing, candidates,
                )
                .await;
                match result {
                    Ok(posted) => info!(posted, "decision cycle complete"),
                    Err(err) if err.is_quota_exhausted() => {
                        return Err(generation_failure(err));
                    }
                    Err(err) => warn!("rate limited, retrying on the next tick: {err}"),
                }
            }
            _ = feedback_tick.tick() => {
                match run_feedback_cycle(
                    &store, &sink, config.watch.feedback_batch_size, feedback_delay,
                )
                .await
                {
                    Ok(updated) => info!(updated, "feedback cycle complete"),
                    Err(err) => error!("feedback cycle failed: {err}"),
                }
            }
        }
    }
}

async fn run_feedback(config: BotConfig, args: FeedbackArgs) -> Result<(), String> {
    let store = PostStore::connect(&config.storage.db_path)
        .await
        .map_err(|err| err.to_string())?;
    let sink = XApiClient::from_env().ok_or_else(|| "X_API_BEARER_TOKEN is not set".to_string())?;
    let batch_size = args.batch_size.unwrap_or(config.watch.feedback_batch_size);
    let delay =
        Duration::from_secs(args.delay_secs.unwrap_or(config.watch.feedback_delay_secs));

    let updated = run_feedback_cycle(&store, &sink, batch_size, delay)
        .await
        .map_err(|err| err.to_string())?;
    println!("Updated engagement for {} posts", updated);
    Ok(())
}

async fn run_stats(config: BotConfig) -> Result<(), String> {
    let store = PostStore::connect(&config.storage.db_path)
        .await
        .map_err(|err| err.to_string())?;
    let averages = store
        .average_score_by_label()
        .await
        .map_err(|err| err.to_string())?;

    if averages.is_empty() {
        println!("No posts recorded yet.");
        return Ok(());
    }
    println!("Average composite score by narrative label:");
    for (label, average) in averages {
        println!("  {:<8} {:.1}", label, average);
    }
    Ok(())
}

/// Quota exhaustion gets the remediation message on stderr before the
/// non-zero exit; any other generation failure just becomes the exit error.
fn generation_failure(err: pitchside::GenerationError) -> String {
    if err.is_quota_exhausted() {
        eprintln!("{}", QUOTA_HELP);
    }
    err.to_string()
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
