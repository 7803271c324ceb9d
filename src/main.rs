//! Vidtrans - Video Upload & Translation Client
//!
//! Command-line entry point: uploads a video to the translation backend,
//! shows upload and translation progress, and prints the result.

use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidtrans::artifact::CaptionSelector;
use vidtrans::cli::{Args, Commands};
use vidtrans::config::Config;
use vidtrans::error::VidtransError;
use vidtrans::i18n::{I18n, LanguageCatalog, Localizer};
use vidtrans::job::{InputRef, Phase};
use vidtrans::orchestrator::Orchestrator;
use vidtrans::download::ArtifactDownloader;
use vidtrans::view::{phase_title_key, View};

const DEFAULT_CONFIG: &str = "vidtrans.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    let catalog = Arc::new(LanguageCatalog::with_extra(&config.languages)?);
    let mut localizer = Localizer::builtin()?;
    if let Some(dir) = &config.ui.locales_dir {
        localizer.load_dir(dir)?;
    }

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Languages => {
            println!("{:<6} {:<12} {:<12}", "Code", "Name", "Backend");
            println!("{}", "-".repeat(32));
            for language in catalog.iter() {
                println!(
                    "{:<6} {:<12} {:<12}",
                    language.code,
                    language.label(),
                    language.wire_name()
                );
            }
        }
        Commands::Strings { key, lang } => {
            let lang = lang.unwrap_or_else(|| config.ui.language.clone());
            let i18n = I18n::new(catalog.clone(), localizer, &lang)?;
            println!("{}", i18n.t(&key));
        }
        Commands::Translate {
            file,
            url,
            source,
            target,
            ui_lang,
            captions,
            download,
        } => {
            let ui_lang = ui_lang.unwrap_or_else(|| config.ui.language.clone());
            let i18n = I18n::new(catalog.clone(), localizer, &ui_lang)?;
            let input = match (file, url) {
                (Some(path), _) => InputRef::File(path),
                (None, Some(url)) => InputRef::Url(url),
                (None, None) => {
                    return Err(VidtransError::Validation(
                        "Either --file or --url is required".to_string(),
                    )
                    .into());
                }
            };
            let captions: CaptionSelector = captions.parse().unwrap_or_default();

            let orchestrator = Orchestrator::from_config(&config, catalog)?;
            run_translation(&orchestrator, &i18n, input, &source, &target).await?;

            let snapshot = orchestrator.snapshot();
            let view = View::from_snapshot(&snapshot, captions);
            println!("\n{}", view.render_text(&i18n));

            if snapshot.phase != Phase::Completed {
                let message = snapshot
                    .failure
                    .map(|f| f.message())
                    .unwrap_or_else(|| i18n.t("result.failed"));
                return Err(anyhow::anyhow!(message));
            }

            if let (Some(dest), Some(artifact)) = (download, snapshot.result_ref.as_ref()) {
                download_artifact(&config, &i18n, &artifact.video_path, &dest).await?;
            }
        }
    }

    Ok(())
}

/// Submit the job and follow its events until it settles. Ctrl-C cancels.
async fn run_translation(
    orchestrator: &Orchestrator,
    i18n: &I18n,
    input: InputRef,
    source: &str,
    target: &str,
) -> Result<()> {
    let mut events = orchestrator.observe_progress();
    let job_id = orchestrator.submit(input, source, target)?;
    info!("Submitted job {}", job_id);

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}%")?
            .progress_chars("#>-"),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelled = false;
    let mut phase = Phase::Idle;

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                if event.phase != phase {
                    phase = event.phase;
                    pb.set_message(i18n.t(phase_title_key(phase)));
                    pb.set_position(0);
                }
                pb.set_position(event.percent as u64);
            }
            _ = &mut ctrl_c, if !cancelled => {
                cancelled = true;
                if let Err(e) = orchestrator.cancel() {
                    warn!("Could not cancel job {}: {}", job_id, e);
                }
            }
        }
    }

    pb.finish_and_clear();
    Ok(())
}

/// Fetch the translated video with a byte progress bar.
async fn download_artifact(
    config: &Config,
    i18n: &I18n,
    video_path: &str,
    dest: &Path,
) -> Result<()> {
    let downloader = ArtifactDownloader::new(&config.submission)?;

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(i18n.t("translate.download"));

    let bar = pb.clone();
    let written = downloader
        .download(
            video_path,
            dest,
            Arc::new(move |sent, total| {
                bar.set_length(total);
                bar.set_position(sent);
            }),
        )
        .await?;

    pb.finish_with_message(format!("Downloaded {}", dest.display()));
    info!("Saved {} bytes to {}", written, dest.display());
    println!("{}: {}", i18n.t("translate.download"), dest.display());
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".vidtrans").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "vidtrans.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("vidtrans.log").display()
    );

    Ok(())
}
