use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use channel_transcriptor::analyze::{run_analysis, AnalyzeRequest};
use channel_transcriptor::channel::collect_channel_videos;
use channel_transcriptor::cli::{Cli, Commands, OutputFormat};
use channel_transcriptor::client::ExtractClient;
use channel_transcriptor::config::Config;
use channel_transcriptor::output;
use channel_transcriptor::pipeline::event::watch_url;
use channel_transcriptor::pipeline::RunOutcome;
use channel_transcriptor::providers::listing::InvidiousListing;
use channel_transcriptor::providers::summarize::GeminiSummarizer;
use channel_transcriptor::providers::transcript::CaptionTranscripts;
use channel_transcriptor::providers::{Summarizer, TranscriptSource, VideoListing};
use channel_transcriptor::server::{self, AppState};
use channel_transcriptor::{
    resolve_channel_reference, ExtractionEvent, ExtractionPipeline, ExtractionRequest, VideoResult,
};

/// Terminal progress display driven by extraction events.
struct ProgressReporter {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ProgressReporter {
    fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }

    fn handle(&mut self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::Total { count } => {
                let bar = if self.quiet {
                    ProgressBar::hidden()
                } else {
                    ProgressBar::new(*count as u64)
                };
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap()
                );
                self.bar = Some(bar);
            }
            ExtractionEvent::Progress { count, message, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(count.saturating_sub(1) as u64);
                    bar.set_message(message.clone());
                }
            }
            ExtractionEvent::Transcript { .. } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
            }
            ExtractionEvent::Error { .. } => {
                if let Some(bar) = &self.bar {
                    bar.abandon();
                }
            }
            ExtractionEvent::Done { message } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(message.clone());
                }
            }
        }
    }
}

async fn write_results(
    results: &[VideoResult],
    path: Option<&std::path::Path>,
    format: &OutputFormat,
) -> Result<()> {
    match path {
        Some(path) => {
            output::save_to_file(results, path, format).await?;
            println!("Transcripts saved to: {}", path.display());
        }
        None => {
            let content = match format {
                OutputFormat::Text => output::format_as_text(results),
                OutputFormat::Json => output::format_as_json(results)?,
            };
            println!("{}", content);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "channel_transcriptor=debug"
    } else {
        "channel_transcriptor=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;
    let quiet = cli.quiet;
    let remote = cli.server.clone();

    match cli.command {
        Commands::Extract {
            channel,
            language,
            date_filter,
            policy,
            output,
            format,
        } => {
            let request = ExtractionRequest {
                channel_reference: channel,
                language: language.unwrap_or_else(|| config.app.default_language.clone()),
                date_filter,
                policy: policy.unwrap_or(config.app.fetch_policy),
            };

            let (results, stream_error, cancelled) = match remote {
                Some(base_url) => {
                    extract_remote(&config, base_url, &request, quiet).await?
                }
                None => extract_local(&config, request, quiet).await?,
            };

            if let Some(message) = stream_error {
                anyhow::bail!(message);
            }
            if cancelled {
                println!(
                    "Extraction cancelled ({} transcripts received)",
                    results.len()
                );
                return Ok(());
            }
            write_results(&results, output.as_deref(), &format).await?;
        }
        Commands::Videos { channel } => match remote {
            Some(base_url) => {
                let client = ExtractClient::new(config.http_client()?, base_url);
                let videos = client.fetch_videos(&channel).await?;

                println!("Found {} videos:", videos.len());
                for (i, video) in videos.iter().enumerate() {
                    println!("{:>4}. {}", i + 1, video.title);
                    println!("      {}", video.url);
                }
            }
            None => {
                let client = config.http_client()?;
                let listing =
                    InvidiousListing::new(client, config.providers.instance_url.clone());

                let channel_id = resolve_channel_reference(&channel)?;
                let items = collect_channel_videos(&listing, &channel_id).await?;

                println!("Found {} videos:", items.len());
                for (i, item) in items.iter().enumerate() {
                    println!("{:>4}. {}", i + 1, item.title);
                    println!("      {}", watch_url(&item.video_id));
                }
            }
        },
        Commands::Analyze { input, prompt } => {
            let transcripts = output::load_from_file(&input)?;
            let request = AnalyzeRequest {
                transcripts,
                custom_prompt: prompt,
            };

            let analysis = match remote {
                Some(base_url) => {
                    let client = ExtractClient::new(config.http_client()?, base_url);
                    client.analyze(&request).await?
                }
                None => {
                    let api_key = config.gemini_api_key().context(
                        "No Gemini API key configured (set GEMINI_API_KEY or providers.gemini_api_key)",
                    )?;
                    let summarizer = GeminiSummarizer::new(
                        config.http_client()?,
                        api_key,
                        config.providers.gemini_model.clone(),
                    );
                    run_analysis(&summarizer, &request).await?.analysis
                }
            };
            println!("{}", analysis);
        }
        Commands::Serve { host, port } => {
            let client = config.http_client()?;
            let listing: Arc<dyn VideoListing> = Arc::new(InvidiousListing::new(
                client.clone(),
                config.providers.instance_url.clone(),
            ));
            let transcripts: Arc<dyn TranscriptSource> = Arc::new(CaptionTranscripts::new(
                client.clone(),
                config.providers.instance_url.clone(),
            ));
            let summarizer: Option<Arc<dyn Summarizer>> =
                config.gemini_api_key().map(|api_key| {
                    Arc::new(GeminiSummarizer::new(
                        client,
                        api_key,
                        config.providers.gemini_model.clone(),
                    )) as Arc<dyn Summarizer>
                });
            if summarizer.is_none() {
                tracing::warn!("no Gemini API key configured, /api/analyze is disabled");
            }

            let state = AppState {
                pipeline: Arc::new(ExtractionPipeline::new(listing.clone(), transcripts)),
                listing,
                summarizer,
                default_language: config.app.default_language.clone(),
                default_policy: config.app.fetch_policy,
            };

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            server::serve(state, &host, port).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written with current values.");
                config.display();
            }
        }
    }

    Ok(())
}

/// Run the extraction in-process, streaming events from a spawned pipeline
/// task. Ctrl-C cancels the run; whatever already arrived is kept.
async fn extract_local(
    config: &Config,
    request: ExtractionRequest,
    quiet: bool,
) -> Result<(Vec<VideoResult>, Option<String>, bool)> {
    let client = config.http_client()?;
    let listing: Arc<dyn VideoListing> = Arc::new(InvidiousListing::new(
        client.clone(),
        config.providers.instance_url.clone(),
    ));
    let transcripts: Arc<dyn TranscriptSource> = Arc::new(CaptionTranscripts::new(
        client,
        config.providers.instance_url.clone(),
    ));
    let pipeline = ExtractionPipeline::new(listing, transcripts);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            ctrl_c_cancel.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(32);
    let run = tokio::spawn(async move { pipeline.run(request, tx, cancel).await });

    let mut reporter = ProgressReporter::new(quiet);
    let mut results = Vec::new();
    let mut stream_error = None;

    while let Some(event) = rx.recv().await {
        reporter.handle(&event);
        match event {
            ExtractionEvent::Transcript { data } => results.push(data),
            ExtractionEvent::Error { message } => stream_error = Some(message),
            _ => {}
        }
    }

    let outcome = run.await.context("Extraction task failed")?;
    match outcome {
        RunOutcome::Completed => Ok((results, None, false)),
        RunOutcome::Cancelled => Ok((results, None, true)),
        RunOutcome::Failed => {
            let message = stream_error.unwrap_or_else(|| "Extraction failed".to_string());
            Ok((results, Some(message), false))
        }
    }
}

/// Run the extraction against a remote `chanscribe serve` instance.
async fn extract_remote(
    config: &Config,
    base_url: String,
    request: &ExtractionRequest,
    quiet: bool,
) -> Result<(Vec<VideoResult>, Option<String>, bool)> {
    let client = Arc::new(ExtractClient::new(config.http_client()?, base_url));

    let ctrl_c_client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            ctrl_c_client.cancel().await;
        }
    });

    let mut reporter = ProgressReporter::new(quiet);
    let state = client
        .run_extraction(request, |event| reporter.handle(event))
        .await?;

    Ok((state.transcripts, state.error, state.cancelled))
}
