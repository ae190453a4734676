//! Execution of a single batch item

use crate::download::command;
use crate::download::parse::{self, LineKind};
use crate::download::process;
use crate::download::{DownloadReporter, DownloadRequest};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Context for running one item
pub struct ItemContext<'a> {
    pub reporter: &'a dyn DownloadReporter,
    pub history: &'a HistoryStore,
    pub cancel_rx: &'a mut mpsc::Receiver<()>,
    /// Where to dump the command line when the request has `debug` set
    pub command_log: Option<&'a Path>,
}

/// How one item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemResult {
    /// At least one result record was seen
    pub succeeded: bool,
    pub cancelled: bool,
    pub exit_code: Option<i32>,
}

/// Run the downloader for one URL and stream its output.
///
/// Success is decided solely by the presence of a result record; a
/// non-zero exit code is logged but does not change it.
pub async fn run_item(request: &DownloadRequest<'_>, ctx: ItemContext<'_>) -> Result<ItemResult> {
    let output_dir = request.options.output_dir.as_path();

    if request.options.debug {
        log_command(request, ctx.command_log);
    }

    let mut child = command::build_command(request)
        .spawn()
        .map_err(|source| Error::Launch {
            tool: request.options.ytdlp_path.clone(),
            source,
        })?;

    // Both streams feed one channel so progress and records interleave
    // in arrival order.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, line_tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, line_tx.clone()));
    }
    drop(line_tx);

    let mut result = ItemResult::default();
    let mut cancel_open = true;

    loop {
        tokio::select! {
            biased;

            msg = ctx.cancel_rx.recv(), if cancel_open => {
                cancel_open = false;
                if msg.is_some() {
                    info!("Cancelling download: {}", request.url);
                    result.cancelled = true;
                    if let Err(e) = process::terminate(&mut child).await {
                        error!("Failed to terminate downloader: {}", e);
                    }
                }
            }

            line = line_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                handle_line(&line, output_dir, &mut result, &ctx).await;
            }
        }
    }

    let status = child.wait().await?;
    result.exit_code = status.code();
    if !status.success() && !result.cancelled {
        error!("Return code {:?} for {}", status.code(), request.url);
    }

    Ok(result)
}

async fn handle_line(
    line: &str,
    output_dir: &Path,
    result: &mut ItemResult,
    ctx: &ItemContext<'_>,
) {
    match parse::classify(line, output_dir) {
        LineKind::Progress(event) => {
            if !result.cancelled {
                ctx.reporter.progress(event.percent());
            }
        }
        LineKind::Record(record) => {
            // The store does synchronous file I/O under its lock
            let history = ctx.history.clone();
            let entry = record.to_history_entry();
            match tokio::task::spawn_blocking(move || history.add(entry)).await {
                Ok(Ok(())) => ctx.reporter.history_changed(),
                Ok(Err(e)) => error!("History save error: {}", e),
                Err(e) => error!("History save task failed: {}", e),
            }
            info!("Download success: {}", record.path.display());
            result.succeeded = true;
        }
        LineKind::Info => debug!("{}", line),
    }
}

/// Read `reader` line by line into `tx` until EOF. Invalid UTF-8 is
/// replaced rather than ending the stream.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Error reading downloader output: {}", e);
                break;
            }
        }
    }
}

fn log_command(request: &DownloadRequest<'_>, command_log: Option<&Path>) {
    let program = request.options.ytdlp_path.to_string_lossy();
    let line = command::render_command_line(&program, &command::build_args(request));
    info!("DEBUG COMMAND: {}", line);

    if let Some(path) = command_log {
        if let Err(e) = std::fs::write(path, &line) {
            warn!("Could not write {:?}: {}", path, e);
        }
    }
}
