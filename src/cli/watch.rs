use anyhow::{anyhow, bail, Context, Result};
use std::{path::PathBuf, str::FromStr, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    crawler::{FetchOrchestrator, FetchOutcome},
    gql::{GqlClient, GqlTransport},
    histogram::GraphView,
    models::VideoId,
    settings::{CrawlerSettings, Settings},
    tracker::{PageEvent, TrackerChange, TrackerState, VideoTracker},
};

use super::{progress_percent, WatchArgs};

/// One line of stdin in watch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    Page(PageEvent),
    Fetch,
    Resize(u32, u32),
    State,
    Quit,
}

impl FromStr for WatchCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or_else(|| anyhow!("empty command"))?;

        let parsed = match command {
            "open" => {
                let target = words.next().ok_or_else(|| anyhow!("usage: open <url>"))?;
                WatchCommand::Page(PageEvent::Navigated(target.to_string()))
            }
            "player" => WatchCommand::Page(PageEvent::PlayerAttached),
            "detach" => WatchCommand::Page(PageEvent::PlayerDetached),
            "fetch" => WatchCommand::Fetch,
            "resize" => {
                let mut size = || -> Result<u32> {
                    words
                        .next()
                        .ok_or_else(|| anyhow!("usage: resize <width> <height>"))?
                        .parse::<u32>()
                        .context("size must be a whole number of pixels")
                };
                let width = size()?;
                let height = size()?;
                WatchCommand::Resize(width, height)
            }
            "state" => WatchCommand::State,
            "quit" | "exit" => WatchCommand::Quit,
            other => bail!("unknown command '{other}'"),
        };
        Ok(parsed)
    }
}

struct FetchDone {
    video: VideoId,
    outcome: FetchOutcome,
}

/// Page tracker plus the graph for the tracked video.
struct WatchSession {
    tracker: VideoTracker,
    view: GraphView,
    transport: Arc<dyn GqlTransport>,
    crawler: CrawlerSettings,
    output: PathBuf,
    in_flight: Option<VideoId>,
    done_tx: mpsc::UnboundedSender<FetchDone>,
}

impl WatchSession {
    fn new(
        transport: Arc<dyn GqlTransport>,
        settings: &Settings,
        output: PathBuf,
        done_tx: mpsc::UnboundedSender<FetchDone>,
    ) -> Self {
        Self {
            tracker: VideoTracker::new(),
            view: GraphView::new(&settings.render),
            transport,
            crawler: settings.crawler.clone(),
            output,
            in_flight: None,
            done_tx,
        }
    }

    /// Returns `false` once the session should end.
    fn apply(&mut self, command: WatchCommand) -> Result<bool> {
        match command {
            WatchCommand::Page(event) => self.on_page_event(event),
            WatchCommand::Fetch => self.start_fetch(),
            WatchCommand::Resize(width, height) => {
                self.view.resize(width, height);
                if self.view.timeline().is_some() {
                    self.save_graph();
                }
            }
            WatchCommand::State => {
                println!("{}", serde_json::to_string(self.tracker.state())?);
            }
            WatchCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn on_page_event(&mut self, event: PageEvent) {
        match self.tracker.handle(event) {
            TrackerChange::VideoChanged { current, .. } => {
                self.view.clear();
                self.in_flight = None;
                match current {
                    Some(video) => println!("Video {video}"),
                    None => println!("No video"),
                }
            }
            TrackerChange::Attached(video) => println!("Player ready for video {video}"),
            TrackerChange::Detached(video) => println!("Player gone for video {video}"),
            TrackerChange::None => {}
        }
    }

    fn start_fetch(&mut self) {
        let TrackerState::Tracking(video) = self.tracker.state() else {
            eprintln!("No player to attach a graph to");
            return;
        };
        if self.in_flight.is_some() {
            eprintln!("Fetch already running");
            return;
        }

        let video = video.clone();
        self.view.clear();
        self.in_flight = Some(video.clone());

        let orchestrator = FetchOrchestrator::new(
            Arc::clone(&self.transport),
            Arc::new(self.tracker.subscribe()),
            self.crawler.clone(),
        );
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = orchestrator
                .fetch_all(&video, |covered, total| {
                    println!("{}%", progress_percent(covered, total));
                })
                .await;
            let _ = done_tx.send(FetchDone { video, outcome });
        });
    }

    /// A failed export leaves the session running; the graph stays in memory.
    fn save_graph(&self) {
        if let Err(err) = self.view.save_png(&self.output) {
            eprintln!("{err:#}");
        }
    }

    fn finish(&mut self, done: FetchDone) {
        if self.in_flight.as_ref() == Some(&done.video) {
            self.in_flight = None;
        }

        match done.outcome {
            FetchOutcome::Completed(timeline) if self.tracker.current() == Some(&done.video) => {
                println!("Done: {} comments", timeline.comment_count());
                self.view.show(timeline);
                self.save_graph();
            }
            _ => println!("Fetch of video {} not completed", done.video),
        }
    }
}

pub async fn run(settings: Settings, args: WatchArgs) -> Result<()> {
    let transport: Arc<dyn GqlTransport> = Arc::new(GqlClient::new(&settings)?);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut session = WatchSession::new(transport, &settings, args.output, done_tx);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<WatchCommand>() {
                    Ok(command) => {
                        if !session.apply(command)? {
                            break;
                        }
                    }
                    Err(err) => eprintln!("{err:#}"),
                }
            }
            Some(done) = done_rx.recv() => session.finish(done),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::{node, EventTransport};

    fn session(dir: &tempfile::TempDir) -> (WatchSession, mpsc::UnboundedReceiver<FetchDone>) {
        session_saving_to(dir.path().join("graph.png"))
    }

    fn session_saving_to(output: PathBuf) -> (WatchSession, mpsc::UnboundedReceiver<FetchDone>) {
        let transport = Arc::new(EventTransport::new(
            Some(600.0),
            vec![node("a", 5.0), node("b", 300.0)],
        ));
        let mut settings = Settings::default();
        settings.render.width = 4;
        settings.render.height = 10;
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let session = WatchSession::new(transport, &settings, output, done_tx);
        (session, done_rx)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            "open https://www.twitch.tv/videos/9".parse::<WatchCommand>().unwrap(),
            WatchCommand::Page(PageEvent::Navigated("https://www.twitch.tv/videos/9".into()))
        );
        assert_eq!(
            "resize 640 48".parse::<WatchCommand>().unwrap(),
            WatchCommand::Resize(640, 48)
        );
        assert_eq!("quit".parse::<WatchCommand>().unwrap(), WatchCommand::Quit);
        assert!("resize 640".parse::<WatchCommand>().is_err());
        assert!("open".parse::<WatchCommand>().is_err());
        assert!("dance".parse::<WatchCommand>().is_err());
    }

    #[tokio::test]
    async fn fetch_needs_an_attached_player() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _done_rx) = session(&dir);

        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/1".into())))
            .unwrap();
        session.apply(WatchCommand::Fetch).unwrap();

        assert!(session.in_flight.is_none());
    }

    #[tokio::test]
    async fn completed_fetch_is_drawn_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, mut done_rx) = session(&dir);

        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/1".into())))
            .unwrap();
        session.apply(WatchCommand::Page(PageEvent::PlayerAttached)).unwrap();
        session.apply(WatchCommand::Fetch).unwrap();
        assert_eq!(session.in_flight, Some(VideoId::new("1")));

        let done = done_rx.recv().await.unwrap();
        session.finish(done);

        assert!(session.in_flight.is_none());
        assert_eq!(session.view.model().counts, vec![1, 1]);
        assert!(dir.path().join("graph.png").exists());

        session.apply(WatchCommand::Resize(8, 10)).unwrap();
        assert_eq!(session.view.model().counts, vec![1, 0, 1, 0]);
    }

    #[tokio::test]
    async fn result_for_a_previous_video_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _done_rx) = session(&dir);
        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/2".into())))
            .unwrap();

        let stale = crate::models::Timeline::new(VideoId::new("1"), 600.0, vec![5.0]);
        session
            .finish(FetchDone {
                video: VideoId::new("1"),
                outcome: FetchOutcome::Completed(stale),
            });

        assert!(session.view.timeline().is_none());
        assert!(!dir.path().join("graph.png").exists());
    }

    #[tokio::test]
    async fn video_change_clears_the_graph() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _done_rx) = session(&dir);
        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/1".into())))
            .unwrap();
        session.view.show(crate::models::Timeline::new(VideoId::new("1"), 600.0, vec![5.0]));

        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/3".into())))
            .unwrap();

        assert!(session.view.timeline().is_none());
        assert_eq!(session.tracker.state(), &TrackerState::Idle(VideoId::new("3")));
    }

    #[tokio::test]
    async fn unwritable_output_keeps_the_session_running() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("missing").join("graph.png");
        let (mut session, mut done_rx) = session_saving_to(output.clone());

        session
            .apply(WatchCommand::Page(PageEvent::Navigated("/videos/1".into())))
            .unwrap();
        session.apply(WatchCommand::Page(PageEvent::PlayerAttached)).unwrap();
        session.apply(WatchCommand::Fetch).unwrap();

        let done = done_rx.recv().await.unwrap();
        session.finish(done);
        assert_eq!(session.view.model().counts, vec![1, 1]);

        assert!(session.apply(WatchCommand::Resize(8, 10)).unwrap());
        assert_eq!(session.view.model().counts, vec![1, 0, 1, 0]);
        assert!(!output.exists());
    }
}
