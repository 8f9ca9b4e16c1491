use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod baseline;
mod classify;
mod curves;
mod fetch;
mod ingest;
mod models;
mod render;
mod report;
mod state;

use baseline::BaselineModel;
use fetch::ArtifactClient;
use models::{AnalysisMode, ChannelSummary};
use state::AppState;

#[derive(Parser)]
#[command(name = "channel-anomaly-watch")]
#[command(about = "Video performance anomaly tracker for watched channels", long_about = None)]
struct Cli {
    /// Extra multiplier applied on top of the baseline upper ratio.
    #[arg(long, global = true, default_value_t = baseline::DEFAULT_UPPER_MULT)]
    upper_mult: f64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the watched channels from the published index
    Channels,
    /// Rank a channel's anomalies and print the worst offenders
    Score {
        /// Channel id (UC...) or @handle
        #[arg(long)]
        channel: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report for one channel
    Report {
        #[arg(long)]
        channel: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the render-ready bundle (scatter, curves, top list) as JSON
    Export {
        #[arg(long)]
        channel: String,
        #[arg(long, value_enum, default_value_t = AnalysisMode::ViewsDays)]
        mode: AnalysisMode,
        #[arg(long, default_value = "render.json")]
        out: PathBuf,
    },
    /// Convert a CSV export of video stats into a points artifact
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Start an on-demand analysis and wait for its artifacts
    Trigger {
        /// Channel id (UC...) or @handle
        #[arg(long)]
        input: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_base_url = std::env::var("DATA_BASE_URL")
        .context("DATA_BASE_URL must point at the published data artifacts")?;
    let artifacts = ArtifactClient::new(&data_base_url);

    match cli.command {
        Commands::Channels => {
            let index = artifacts.fetch_index().await?;
            if index.is_empty() {
                println!("No channels in the index yet.");
                return Ok(());
            }
            for channel in index.iter() {
                let worst = if channel.max_anomaly_ratio.is_finite() {
                    format!("{:.2}", channel.max_anomaly_ratio)
                } else {
                    "?".to_string()
                };
                println!(
                    "- {} ({}) sticky RED {}, worst anomaly {}",
                    channel.title, channel.channel_id, channel.sticky_red_count, worst
                );
            }
        }
        Commands::Score { channel, limit } => {
            let summary = resolve_channel(&artifacts, &channel).await?;
            let mut app = AppState::new(AnalysisMode::ViewsDays);
            load_channel(&mut app, &artifacts, &summary.channel_id).await?;
            let bundle = app
                .current_bundle()
                .context("channel bundle missing after fetch")?;
            let model = BaselineModel::new(bundle.baseline.clone(), cli.upper_mult);

            let top = render::top_anomalies(bundle, &model, limit);
            if top.is_empty() {
                println!("No videos ranked above baseline for {}.", summary.title);
                return Ok(());
            }

            println!("Top anomalies for {}:", summary.title);
            for anomaly in top.iter() {
                let ratio = if anomaly.anomaly_ratio.is_finite() {
                    format!("{:.2}", anomaly.anomaly_ratio)
                } else {
                    "?".to_string()
                };
                println!(
                    "- [{}] {} ({}) anomaly ratio {}",
                    anomaly.label.as_str(),
                    anomaly.title,
                    render::video_url(&anomaly.video_id),
                    ratio
                );
            }
        }
        Commands::Report { channel, out } => {
            let summary = resolve_channel(&artifacts, &channel).await?;
            let mut app = AppState::new(AnalysisMode::ViewsDays);
            load_channel(&mut app, &artifacts, &summary.channel_id).await?;
            let bundle = app
                .current_bundle()
                .context("channel bundle missing after fetch")?;
            let model = BaselineModel::new(bundle.baseline.clone(), cli.upper_mult);

            let report = report::build_report(&summary, bundle, &model);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { channel, mode, out } => {
            let summary = resolve_channel(&artifacts, &channel).await?;
            let mut app = AppState::new(mode);
            load_channel(&mut app, &artifacts, &summary.channel_id).await?;
            let bundle = app
                .current_bundle()
                .context("channel bundle missing after fetch")?;
            let model = BaselineModel::new(bundle.baseline.clone(), cli.upper_mult);

            let payload = render::render_bundle(bundle, &model, app.mode(), render::TOP_LIST_LIMIT);
            let json = serde_json::to_string_pretty(&payload)?;
            std::fs::write(&out, json)?;
            println!(
                "Render bundle for {} written to {}.",
                summary.title,
                out.display()
            );
        }
        Commands::Import { csv, out } => {
            let imported = ingest::import_csv_points(&csv, &out)?;
            println!(
                "Wrote {imported} points from {} to {}.",
                csv.display(),
                out.display()
            );
        }
        Commands::Trigger { input } => {
            let endpoint = std::env::var("ONDEMAND_ENDPOINT")
                .context("ONDEMAND_ENDPOINT must be set to use on-demand analysis")?;
            let trigger = fetch::TriggerClient::new(&endpoint);

            let response = trigger.start(&input).await?;
            let channel_id = match response.channel_id {
                Some(id) => Some(id),
                None if input.starts_with("UC") => Some(input.clone()),
                None => fetch::wait_channel_in_index(&artifacts, &input).await?,
            };

            let Some(channel_id) = channel_id else {
                println!("Analysis started, but the channel never appeared in the index.");
                return Ok(());
            };

            if fetch::wait_channel_data_ready(&artifacts, &channel_id).await {
                println!("Channel {channel_id} is ready.");
            } else {
                println!("Analysis started, but data for {channel_id} is not ready yet.");
            }
        }
    }

    Ok(())
}

/// Resolve a channel id or @handle against the index. A raw UC... id is
/// accepted even before the index knows it.
async fn resolve_channel(
    artifacts: &ArtifactClient,
    input: &str,
) -> anyhow::Result<ChannelSummary> {
    let index = artifacts.fetch_index().await?;
    if let Some(channel) = fetch::match_channel(&index, input) {
        return Ok(channel.clone());
    }
    if input.starts_with("UC") {
        return Ok(ChannelSummary {
            channel_id: input.to_string(),
            title: input.to_string(),
            sticky_red_count: 0,
            max_anomaly_ratio: f64::NAN,
        });
    }
    anyhow::bail!("channel not found in index: {input}")
}

/// Fetch a channel's artifacts through the selection-token guard into the
/// app cache.
async fn load_channel(
    app: &mut AppState,
    artifacts: &ArtifactClient,
    channel_id: &str,
) -> anyhow::Result<()> {
    let token = app.select_channel(channel_id);
    let bundle = artifacts.fetch_bundle(channel_id).await?;
    app.complete_fetch(token, bundle);
    Ok(())
}
