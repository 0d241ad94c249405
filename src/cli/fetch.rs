use anyhow::{bail, Result};
use log::warn;
use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    crawler::{FetchOrchestrator, FetchOutcome},
    gql::GqlClient,
    histogram::GraphView,
    models::VideoId,
    settings::Settings,
};

use super::{progress_percent, FetchArgs};

/// One-shot fetch. Ctrl-C withdraws the video, which cancels the crawl.
pub async fn run(settings: Settings, args: FetchArgs) -> Result<bool> {
    let Some(video) = VideoId::from_path(&args.video) else {
        bail!("'{}' is not a video URL or id", args.video);
    };

    let (active_tx, active_rx) = watch::channel(Some(video.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling fetch");
            active_tx.send_replace(None);
        }
    });

    let transport = Arc::new(GqlClient::new(&settings)?);
    let orchestrator = FetchOrchestrator::new(transport, Arc::new(active_rx), settings.crawler.clone());

    let outcome = orchestrator
        .fetch_all(&video, |covered, total| {
            eprintln!("{}%", progress_percent(covered, total));
        })
        .await;

    let timeline = match outcome {
        FetchOutcome::Completed(timeline) => timeline,
        other => {
            eprintln!("Fetch of video {video} not completed ({other:?})");
            return Ok(false);
        }
    };

    println!(
        "Done: {} comments over {:.0}s",
        timeline.comment_count(),
        timeline.duration
    );

    if let Some(path) = &args.json {
        timeline.write_json(path)?;
        println!("Timeline written to {}", path.display());
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| format!("{video}.png").into());
    let mut view = GraphView::new(&settings.render);
    view.show(timeline);
    view.save_png(&output)?;
    println!("Graph written to {}", output.display());

    Ok(true)
}
