//! # chan-mirror
//!
//! Polls the configured board pages (and optionally the catalog) and keeps
//! the in-memory mirror current until interrupted.

use std::sync::Arc;
use std::time::Duration;

use configs::{BoardSettings, LogSettings, PollSettings, Settings};
use domains::{BoardInfo, MirrorError};
use services::{Board, Deadline, SharedThread};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use transport_adapters::HttpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    let transport = HttpTransport::new(
        &settings.http.user_agent,
        Duration::from_secs(settings.http.timeout_secs),
    )?;
    let board = Board::new(board_info(&settings.board), Arc::new(transport));
    info!(board = %board.info().name, pages = ?settings.poll.pages, catalog = settings.poll.catalog, "mirror starting");

    let mut ticker = tokio::time::interval(Duration::from_secs(settings.poll.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => poll_once(&board, &settings.poll).await,
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn board_info(settings: &BoardSettings) -> BoardInfo {
    BoardInfo {
        name: settings.name.clone(),
        https: settings.https,
        api_host: settings.api_host.clone(),
        image_host: settings.image_host.clone(),
        thumb_host: settings.thumb_host.clone(),
        web_host: settings.web_host.clone(),
    }
}

async fn poll_once(board: &Board, poll: &PollSettings) {
    let deadline = || Deadline::after(Duration::from_secs(poll.request_deadline_secs));

    for &page in &poll.pages {
        match board.get_threads_by_page(page, deadline()).await {
            Ok(threads) => report(&threads),
            Err(MirrorError::PageNotFound(page)) => warn!(page, "page does not exist"),
            Err(err) => warn!(page, error = %err, "page poll failed"),
        }
    }

    if poll.catalog {
        match board.get_catalog(deadline()).await {
            Ok(threads) => report(&threads),
            Err(err) => warn!(error = %err, "catalog poll failed"),
        }
    }
}

/// Logs every thread that received new data since it was last reported.
fn report(threads: &[SharedThread]) {
    for shared in threads {
        let mut thread = shared.write();
        if thread.take_wants_update() {
            info!(
                thread_id = thread.id(),
                replies = thread.replies().len(),
                omitted = thread.omitted_posts(),
                files = thread.files().len(),
                url = %thread.web_url(),
                "thread has new data"
            );
        }
    }
}
