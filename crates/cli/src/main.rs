use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use diascribe_cli::{Cli, Command, Service, build_direct, build_engine, chunk_dir_for, transcription_config};
use diascribe_config::Settings;
use diascribe_transcription::{AudioAsset, TranscriptionError, splitter};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "diascribe_cli=info,diascribe_transcription=info,diascribe_services=info".into()
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TranscriptionError>() {
                Some(te) => {
                    error!(kind = te.kind(), "{}", te);
                    eprintln!("{}: {}", te.kind(), te);
                }
                None => {
                    error!("{:#}", e);
                    eprintln!("Error: {:#}", e);
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load()?;

    match cli.command {
        Command::Transcribe {
            file,
            max_chunk_bytes,
            output,
            timeout_secs,
            keep_chunks,
            service,
        } => {
            let chunk_dir = keep_chunks.then(|| chunk_dir_for(&file));
            let config = transcription_config(&settings, max_chunk_bytes, chunk_dir);

            let cancel = CancellationToken::new();
            watch_for_cancel(cancel.clone(), timeout_secs.map(Duration::from_secs));

            let transcript = match service {
                Service::Azure => {
                    build_engine(&settings, config)?
                        .transcribe_file(&file, &cancel)
                        .await?
                }
                Service::Whisper => {
                    build_direct(&settings, &config)
                        .transcribe_file(&file, &cancel)
                        .await?
                }
            };
            if transcript.is_empty() {
                warn!(file = %file.display(), "No speech recognized");
            }

            let rendered = transcript.render();
            match output {
                Some(path) => {
                    tokio::fs::write(&path, format!("{}\n", rendered)).await?;
                    info!(path = %path.display(), speakers = transcript.speakers.len(), "Transcript written");
                }
                None => println!("{}", rendered),
            }
        }
        Command::Split {
            file,
            max_chunk_bytes,
            out_dir,
        } => {
            let max = max_chunk_bytes.unwrap_or(settings.pipeline.max_chunk_bytes);
            for path in split_file(&file, max, &out_dir).await? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

async fn split_file(file: &Path, max_chunk_bytes: u64, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let asset = AudioAsset::load(file).await?;
    let chunks = tokio::task::spawn_blocking(move || splitter::split(asset, max_chunk_bytes)).await??;
    let paths = splitter::write_chunks(out_dir, &chunks).await?;
    info!(chunks = paths.len(), dir = %out_dir.display(), "Chunks written");
    Ok(paths)
}

/// Cancels on Ctrl-C, or once `timeout` elapses.
fn watch_for_cancel(cancel: CancellationToken, timeout: Option<Duration>) {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::signal::ctrl_c() => warn!("Interrupted, cancelling"),
            _ = deadline => warn!(?timeout, "Timed out, cancelling"),
        }
        cancel.cancel();
    });
}
