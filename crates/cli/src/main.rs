mod config;
mod logging;
mod request;
mod serve;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use arena_pulse_core::{build_prompt, PredictionResult};
use arena_pulse_predict::{
    AnthropicClient, AnthropicConfig, LlmClient, PersistMode, PipelineOutcome,
    PredictionPipeline, UnavailableClient,
};
use arena_pulse_storage::{JsonlStore, PREDICTIONS_TABLE};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use crate::config::{AppConfig, Backend, GENERATION_KEY_ENV};
use crate::request::RequestArgs;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Arena Pulse stadium operations predictions.
#[derive(Parser)]
#[command(
    name = "arena-pulse",
    version,
    about = "Arena Pulse stadium operations predictions"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Path to the TOML config file (default: ./arena-pulse.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override the `[generation]` section.
#[derive(Debug, Clone, clap::Args)]
struct GenerationArgs {
    /// Model identifier sent to the generation service
    #[arg(long)]
    model: Option<String>,
    /// Generation service base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Upper bound on one generation call, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a prediction for one request
    Predict {
        #[command(flatten)]
        request: RequestArgs,
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// Print the prompt that would be sent for a request
    Prompt {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Start the Arena Pulse HTTP API server
    Serve {
        /// Port to listen on (overrides [server].port)
        #[arg(long)]
        port: Option<u16>,
        #[command(flatten)]
        generation: GenerationArgs,
    },

    /// List stored rows from the jsonl store
    History {
        /// Table to read
        #[arg(long, default_value = PREDICTIONS_TABLE)]
        table: String,
        /// Show only the most recent N rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let mut app_config = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Prompt { request } => cmd_prompt(&request, cli.output, cli.quiet),
        Commands::Predict {
            request,
            generation,
        } => {
            apply_generation_overrides(&mut app_config, &generation);
            // A one-shot process exits right after printing, so the write is awaited.
            app_config.persistence.mode = PersistMode::Await;
            let outcome = block_on(cmd_predict(&app_config, &request), cli.output, cli.quiet);
            print_prediction(&outcome, cli.output, cli.quiet);
        }
        Commands::Serve { port, generation } => {
            apply_generation_overrides(&mut app_config, &generation);
            if let Some(p) = port {
                app_config.server.port = p;
            }
            block_on(cmd_serve(&app_config), cli.output, cli.quiet);
        }
        Commands::History { table, limit } => {
            block_on(
                cmd_history(&app_config, &table, limit, cli.output),
                cli.output,
                cli.quiet,
            );
        }
    }
}

/// Run `future` on a fresh runtime; report its error and exit non-zero.
fn block_on<T>(
    future: impl std::future::Future<Output = Result<T, String>>,
    output: OutputFormat,
    quiet: bool,
) -> T {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };
    match rt.block_on(future) {
        Ok(value) => value,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn apply_generation_overrides(config: &mut AppConfig, args: &GenerationArgs) {
    if let Some(model) = &args.model {
        config.generation.model = model.clone();
    }
    if let Some(url) = &args.base_url {
        config.generation.base_url = Some(url.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config.generation.timeout_secs = secs;
    }
}

/// Build the generation client. Without credentials the pipeline still
/// runs and answers with the fallback record.
fn build_client(config: &AppConfig) -> Arc<dyn LlmClient> {
    let key = std::env::var(GENERATION_KEY_ENV).unwrap_or_default();
    let mut anthropic = AnthropicConfig::new(key);
    if let Some(url) = &config.generation.base_url {
        anthropic.base_url = url.clone();
    }
    anthropic.http_timeout = transport_timeout(config);

    match AnthropicClient::new(anthropic) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(
                error = %e,
                env = GENERATION_KEY_ENV,
                "Generation client unavailable; predictions will use the fallback"
            );
            Arc::new(UnavailableClient(e))
        }
    }
}

/// The transport gives up when the pipeline does, so an abandoned blocking
/// call never outlives the request it served.
fn transport_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.generation.timeout_secs)
}

async fn build_pipeline(config: &AppConfig) -> Result<PredictionPipeline, String> {
    let pipeline_config = config.pipeline_config().map_err(|e| e.to_string())?;
    let store = config.open_store().await.map_err(|e| e.to_string())?;
    Ok(PredictionPipeline::new(
        build_client(config),
        store,
        pipeline_config,
    ))
}

fn cmd_prompt(args: &RequestArgs, output: OutputFormat, quiet: bool) {
    let request = match args.resolve() {
        Ok(r) => r,
        Err(e) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };
    let prompt = build_prompt(&request);
    match output {
        OutputFormat::Text => println!("{}", prompt),
        OutputFormat::Json => println!("{}", serde_json::json!({ "prompt": prompt })),
    }
}

async fn cmd_predict(config: &AppConfig, args: &RequestArgs) -> Result<PipelineOutcome, String> {
    let request = args.resolve()?;
    let pipeline = build_pipeline(config).await?;
    Ok(pipeline.run(&request).await)
}

fn print_prediction(outcome: &PipelineOutcome, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&outcome.result)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization error: {}\"}}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            print!("{}", render_text(&outcome.result));
            if let Some(reason) = &outcome.fallback {
                if !quiet {
                    eprintln!("note: fallback prediction ({})", reason);
                }
            }
        }
    }
}

fn render_text(result: &PredictionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}  [{} impact, {}, {}]\n",
        result.title, result.impact_level, result.trend, result.icon_kind
    ));
    out.push_str(&format!("{}\n", result.description));
    out.push_str(&format!(
        "Accuracy: {}%  Window: {}  ({})\n",
        result.accuracy_percent, result.display_time, result.generated_label
    ));
    if !result.recommendations.is_empty() {
        out.push_str("Recommendations:\n");
        for r in &result.recommendations {
            out.push_str(&format!("  - {}\n", r));
        }
    }
    if !result.risk_factors.is_empty() {
        out.push_str("Risk factors:\n");
        for r in &result.risk_factors {
            out.push_str(&format!("  - {}\n", r));
        }
    }
    out.push_str(&format!("id: {}\n", result.id));
    out
}

async fn cmd_serve(config: &AppConfig) -> Result<(), String> {
    let pipeline = build_pipeline(config).await?;
    serve::start_server(config.server.port, pipeline)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

async fn cmd_history(
    config: &AppConfig,
    table: &str,
    limit: Option<usize>,
    output: OutputFormat,
) -> Result<(), String> {
    if config.persistence.backend != Backend::Jsonl {
        return Err(
            "history requires the jsonl backend ([persistence] backend = \"jsonl\")".to_string(),
        );
    }
    let dir: &Path = &config.persistence.path;
    let store = JsonlStore::open(dir).await.map_err(|e| e.to_string())?;
    let mut entries = store.entries(table).await.map_err(|e| e.to_string())?;
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("no rows in {} ({})", table, store.dir().display());
            }
            for entry in &entries {
                let row = &entry.row;
                let kind = row
                    .get("prediction_type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let title = row
                    .pointer("/result/title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("-");
                let confidence = row
                    .get("confidence_score")
                    .and_then(|v| v.as_f64())
                    .map(|c| format!("{:.2}", c))
                    .unwrap_or_else(|| "-".to_string());
                println!("{}  {}  {}  {}", entry.inserted_at, kind, confidence, title);
            }
        }
    }
    Ok(())
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
