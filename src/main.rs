//! Entry point for the shopdl installer.
//!
//! One pipeline regardless of where the payload comes from: load the
//! configuration blob, resolve the download target, fetch or locate the
//! ZIP, extract it under the install root, clean up the consumed source,
//! and hand a status token back to the caller. On failure the process
//! shows what went wrong and waits for an acknowledgment instead of
//! silently disappearing.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use shopdl::{
    Archive, Cli, ConfigBlob, ExtractionEngine, HttpFetcher, InstallError, NandStore,
    PayloadReference, ProgressSink, ReturnStatus, SilentSink, locator,
    title::CALLER_TITLE,
};

/// Directory under the install root where a fetched payload is staged.
const STAGING_DIR: &str = ".shopdl";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => {
            if !cli.is_very_quiet() {
                eprintln!("Install complete.");
            }
            println!("{}", ReturnStatus::SUCCESS.query());
            ExitCode::SUCCESS
        }
        Err(error) => {
            let status = ReturnStatus::failure(&error);
            eprintln!("{error} [{}]", status.token());

            // Don't vanish on failure: hold the message until the user
            // acknowledges it, unless told otherwise.
            if !cli.no_wait {
                eprintln!("Press ENTER to exit.");
                let mut ack = String::new();
                let _ = std::io::stdin().read_line(&mut ack);
            }

            println!("{}", status.query());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> shopdl::Result<()> {
    let nand = NandStore::new(&cli.nand);

    let target = match &cli.broadcast {
        Some(capture_path) => {
            let capture =
                std::fs::read(capture_path).map_err(InstallError::ConfigUnavailable)?;
            locator::resolve_from_broadcast(&capture)?
        }
        None => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| nand.data_file(CALLER_TITLE, "osc.cfg"));
            let blob = ConfigBlob::load(&config_path)?;
            locator::resolve_download_target(&blob)?
        }
    };

    // -q drops the per-chunk/per-entry progress, -qq the announcements too.
    let mut sink: Box<dyn ProgressSink> = if cli.is_quiet() {
        Box::new(SilentSink)
    } else {
        Box::new(ConsoleSink)
    };

    match target {
        PayloadReference::RemoteUrl(url) => {
            install_remote(cli, &url, sink.as_mut()).await?;
        }
        PayloadReference::StoredTitle {
            title,
            content_index,
        } => {
            if !cli.is_very_quiet() {
                eprintln!("Installing staged title {title}...");
            }
            let content = nand.staged_content(title, content_index)?;
            let archive = Archive::open_path(&content).await?;
            ExtractionEngine::new(&archive, &cli.dest)
                .run(sink.as_mut())
                .await?;
            drop(archive);

            if !cli.keep_source {
                nand.nullify(title, content_index)?;
            }
        }
    }

    Ok(())
}

/// Fetch a remote payload into the staging directory, extract it, and
/// drop the staged copy.
async fn install_remote(
    cli: &Cli,
    url: &str,
    sink: &mut dyn ProgressSink,
) -> shopdl::Result<()> {
    if !cli.is_very_quiet() {
        eprintln!("Downloading {url}...");
    }

    let staging = cli.dest.join(STAGING_DIR);
    tokio::fs::create_dir_all(&staging)
        .await
        .map_err(|source| InstallError::DirectoryCreateFailed {
            path: staging.clone(),
            source,
        })?;
    let zip_path: PathBuf = staging.join("temp.zip");

    let fetcher = HttpFetcher::new()?;
    fetcher.fetch_to_file(url, &zip_path, sink).await?;

    let archive = Archive::open_path(&zip_path).await?;
    ExtractionEngine::new(&archive, &cli.dest).run(sink).await?;
    drop(archive);

    if !cli.keep_source {
        // Reclaiming the staged copy is best-effort; the install itself
        // already finished.
        let _ = tokio::fs::remove_file(&zip_path).await;
    }

    Ok(())
}

/// Console progress: a download meter on one line, one line per entry.
struct ConsoleSink;

impl ProgressSink for ConsoleSink {
    fn fetched(&mut self, received: u64, total: u64) {
        eprint!("\rDownloading ({received}/{total})");
        if received >= total {
            eprintln!();
        }
    }

    fn entry_done(&mut self, completed: usize, total: usize, name: &str) {
        println!("  extracting: {name} ({completed}/{total})");
    }
}
