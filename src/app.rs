use crate::attachment;
use crate::config::{api_key_from_env, load_settings, project_paths, AppConfig, Cli};
use crate::gateway::{Gateway, ReplyRequest};
use crate::gemini::GeminiClient;
use crate::input::{collect_input_nonblocking, map_event};
use crate::logging;
use crate::model::AppState;
use crate::render::{self, RenderOpts};
use crate::sim::{Effect, Event};
use anyhow::Result;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

/// One session-clock tick.
pub(crate) const MINUTE: Duration = Duration::from_secs(60);

type Term = Terminal<CrosstermBackend<Stdout>>;

pub(crate) struct App {
    state: AppState,
    opts: RenderOpts,
    frame_dt: Duration,
    gateway: Arc<Gateway>,
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
    should_quit: bool,
}

impl App {
    pub(crate) fn new(cfg: AppConfig, gateway: Arc<Gateway>) -> Self {
        let (tx, rx) = mpsc::channel::<Event>(64);
        Self {
            state: AppState::new(cfg.mode, cfg.appearance),
            opts: RenderOpts {
                braille: cfg.enable_braille,
                color: cfg.enable_color,
            },
            frame_dt: Duration::from_secs_f32(1.0 / cfg.fps_cap.max(1) as f32),
            gateway,
            tx,
            rx,
            should_quit: false,
        }
    }

    /// Applies one event and carries out whatever it asks for.
    fn dispatch(&mut self, event: Event) {
        if matches!(event, Event::ToggleRender) {
            self.opts.braille = !self.opts.braille;
            return;
        }
        for effect in self.state.update(event, Instant::now()) {
            match effect {
                Effect::RequestReply(request) => self.spawn_reply(request),
                Effect::LoadAttachment(path) => self.spawn_load(path),
                Effect::Quit => self.should_quit = true,
            }
        }
    }

    fn spawn_reply(&self, request: ReplyRequest) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let reply = gateway.respond(&request).await;
            tx.send(Event::ReplyReceived(reply)).await.ok();
        });
    }

    fn spawn_load(&self, path: PathBuf) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match attachment::load(&path).await {
                Ok(att) => Event::AttachmentLoaded(att),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "attachment rejected");
                    Event::AttachmentFailed(e.to_string())
                }
            };
            tx.send(event).await.ok();
        });
    }

    async fn run(&mut self, term: &mut Term) -> Result<()> {
        spawn_session_clock(self.tx.clone(), MINUTE);

        while !self.should_quit {
            // background results first so the frame reflects them
            while let Ok(ev) = self.rx.try_recv() {
                self.dispatch(ev);
            }
            self.dispatch(Event::Tick);

            let (st, opts) = (&self.state, self.opts);
            term.draw(|f| render::draw(f, st, opts))?;

            for ev in collect_input_nonblocking(self.frame_dt)? {
                if let Some(event) = map_event(&self.state.scene, ev) {
                    self.dispatch(event);
                }
                if self.should_quit {
                    break;
                }
            }

            // let spawned work make progress between frames
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

fn spawn_session_clock(tx: mpsc::Sender<Event>, every: Duration) {
    // first tick one full period after start
    let start = tokio::time::Instant::now() + every;
    tokio::spawn(async move {
        let mut t = tokio::time::interval_at(start, every);
        // a stalled runtime does not earn back the minutes it missed
        t.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            t.tick().await;
            if tx.send(Event::MinuteElapsed).await.is_err() {
                break;
            }
        }
    });
}

fn setup_terminal() -> Result<Term> {
    terminal::enable_raw_mode()?;
    let mut out = io::stdout();
    execute!(out, EnterAlternateScreen, cursor::Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(term: &mut Term) -> Result<()> {
    execute!(io::stdout(), cursor::Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    term.show_cursor()?;
    Ok(())
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let paths = project_paths()?;
    logging::init(&paths.log_path)?;

    let settings_path = cli.settings.clone().unwrap_or(paths.settings_path);
    let settings = load_settings(&settings_path);
    let cfg = AppConfig::resolve(&cli, settings, api_key_from_env());
    if cfg.gemini.api_key.is_empty() {
        tracing::warn!("no API key in GEMINI_API_KEY or API_KEY; replies will fail");
    }
    tracing::info!(
        model = %cfg.gemini.model,
        mode = %cfg.mode,
        pet = %cfg.appearance.name,
        "starting session"
    );

    let client = GeminiClient::new(cfg.gemini.clone())?;
    let gateway = Arc::new(Gateway::new(Arc::new(client)));
    let mut app = App::new(cfg, gateway);

    let mut term = setup_terminal()?;
    let result = app.run(&mut term).await;
    // restore even when the loop failed, then report the loop's error first
    let restored = restore_terminal(&mut term);
    result?;
    restored?;

    tracing::info!(
        minutes = app.state.stats.session_minutes,
        turns = app.state.conversation.len(),
        "session ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::gateway::testing::QueuedModel;
    use crate::model::Role;
    use clap::Parser;

    fn app_with(model: QueuedModel) -> App {
        let cfg = AppConfig::resolve(&Cli::parse_from(["nexuspet"]), Settings::default(), None);
        App::new(cfg, Arc::new(Gateway::new(Arc::new(model))))
    }

    #[tokio::test]
    async fn submit_round_trips_through_the_gateway() {
        let mut app = app_with(QueuedModel::new().with(Ok(Some("Yay! (^_^)".into()))));
        for ch in "hi".chars() {
            app.dispatch(Event::InputChar(ch));
        }
        app.dispatch(Event::Submit);
        assert!(app.state.thinking);

        let ev = app.rx.recv().await.unwrap();
        app.dispatch(ev);
        assert!(!app.state.thinking);
        let last = app.state.conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.text, "Yay! (^_^)");
    }

    #[tokio::test]
    async fn failed_attachment_surfaces_as_event() {
        let mut app = app_with(QueuedModel::new());
        let dir = tempfile::tempdir().unwrap();
        app.spawn_load(dir.path().join("missing.png"));
        let ev = app.rx.recv().await.unwrap();
        assert!(matches!(ev, Event::AttachmentFailed(_)));
        app.dispatch(ev);
        assert!(app.state.notification.is_some());
        assert!(app.state.conversation.pending().is_none());
    }

    #[tokio::test]
    async fn toggle_render_and_quit_stay_in_the_runtime() {
        let mut app = app_with(QueuedModel::new());
        let before = app.opts.braille;
        app.dispatch(Event::ToggleRender);
        assert_ne!(app.opts.braille, before);
        app.dispatch(Event::Quit);
        assert!(app.should_quit);
    }

    #[tokio::test(start_paused = true)]
    async fn session_clock_ticks_once_per_minute() {
        let (tx, mut rx) = mpsc::channel(4);
        spawn_session_clock(tx, MINUTE);
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());
        tokio::time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(matches!(rx.recv().await, Some(Event::MinuteElapsed)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_clock_does_not_replay_missed_minutes() {
        let (tx, mut rx) = mpsc::channel(16);
        spawn_session_clock(tx, MINUTE);
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(matches!(rx.recv().await, Some(Event::MinuteElapsed)));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let mut extra = 0;
        while rx.try_recv().is_ok() {
            extra += 1;
        }
        assert_eq!(extra, 0, "missed minutes were delivered after a stall");
    }
}
