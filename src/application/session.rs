use crate::application::playback::{PlayOutcome, PlaybackClient};
use crate::application::progress::ProgressSynchronizer;
use crate::domain::pomodoro::{DurationPreset, PHASE_TICK, Phase, PhaseClock, TickOutcome};
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::spotify_player_client::PlayerApi;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

/// What a timer display renders on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub active: bool,
    pub preset: Option<DurationPreset>,
    pub playlist_id: Option<String>,
    pub phase: Phase,
    pub cycle_count: u32,
    pub remaining_seconds: i64,
    pub display: String,
}

impl SessionView {
    pub fn idle() -> Self {
        Self {
            active: false,
            preset: None,
            playlist_id: None,
            phase: Phase::Work,
            cycle_count: 0,
            remaining_seconds: 0,
            display: "00:00".to_string(),
        }
    }

    fn running(clock: &PhaseClock, playlist_id: &str) -> Self {
        Self {
            active: true,
            preset: Some(clock.preset()),
            playlist_id: Some(playlist_id.to_string()),
            phase: clock.phase(),
            cycle_count: clock.cycle_count(),
            remaining_seconds: clock.remaining_seconds(),
            display: clock.display(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.phase.label()
    }
}

struct ActiveSession {
    generation: u64,
    tick_task: JoinHandle<()>,
    pending_play: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn cancel(self) {
        self.tick_task.abort();
        if let Some(pending_play) = self.pending_play {
            pending_play.abort();
        }
    }
}

/// Pieces a session's background tasks need; cloned into each task.
struct SessionContext<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    playback: Arc<PlaybackClient<B, P>>,
    active: Arc<Mutex<Option<ActiveSession>>>,
    current_generation: Arc<AtomicU64>,
    view: Arc<watch::Sender<SessionView>>,
    generation: u64,
    playlist_id: Arc<str>,
}

impl<B, P> Clone for SessionContext<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    fn clone(&self) -> Self {
        Self {
            playback: Arc::clone(&self.playback),
            active: Arc::clone(&self.active),
            current_generation: Arc::clone(&self.current_generation),
            view: Arc::clone(&self.view),
            generation: self.generation,
            playlist_id: Arc::clone(&self.playlist_id),
        }
    }
}

impl<B, P> SessionContext<B, P>
where
    B: BackendApi + 'static,
    P: PlayerApi + 'static,
{
    fn is_current(&self) -> bool {
        self.current_generation.load(Ordering::SeqCst) == self.generation
    }

    fn publish(&self, clock: &PhaseClock) {
        if self.is_current() {
            self.view.send_replace(SessionView::running(clock, &self.playlist_id));
        }
    }

    fn spawn_play(&self) -> JoinHandle<()> {
        let context = self.clone();
        tokio::spawn(async move {
            let relevance = context.clone();
            let outcome = context
                .playback
                .play_when(&context.playlist_id, None, move || relevance.is_current())
                .await;
            match outcome {
                Ok(PlayOutcome::Started) => {}
                Ok(PlayOutcome::Discarded) => {
                    debug!(generation = context.generation, "session play discarded");
                }
                Err(error) if context.is_current() => {
                    warn!(%error, playlist_id = %context.playlist_id, "session play failed");
                }
                Err(error) => {
                    debug!(%error, generation = context.generation, "ignoring play failure of stopped session");
                }
            }
        })
    }

    /// Replaces the pending play handle, or aborts `handle` if the session
    /// has already gone.
    fn track_play(&self, handle: JoinHandle<()>) {
        let mut active = lock(&self.active);
        match active.as_mut().filter(|session| session.generation == self.generation) {
            Some(session) => {
                if let Some(previous) = session.pending_play.replace(handle) {
                    previous.abort();
                }
            }
            None => handle.abort(),
        }
    }

    async fn run_ticks(self, mut clock: PhaseClock) {
        let mut ticker = interval_at(Instant::now() + PHASE_TICK, PHASE_TICK);
        loop {
            ticker.tick().await;
            if !self.is_current() {
                break;
            }

            match clock.tick() {
                TickOutcome::Counting => {}
                TickOutcome::BreakStarted(phase) => {
                    info!(
                        phase = phase.label(),
                        cycle_count = clock.cycle_count(),
                        "break started"
                    );
                }
                TickOutcome::WorkStarted => {
                    info!(cycle_count = clock.cycle_count(), "work started");
                    let handle = self.spawn_play();
                    self.track_play(handle);
                }
            }
            self.publish(&clock);
        }
    }
}

/// Pomodoro session driver. At most one session runs at a time; starting a
/// new one tears the previous one down first, pause included.
pub struct SessionEngine<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    playback: Arc<PlaybackClient<B, P>>,
    progress: Option<Arc<ProgressSynchronizer<B, P>>>,
    active: Arc<Mutex<Option<ActiveSession>>>,
    generation: Arc<AtomicU64>,
    view: Arc<watch::Sender<SessionView>>,
}

impl<B, P> SessionEngine<B, P>
where
    B: BackendApi + 'static,
    P: PlayerApi + 'static,
{
    pub fn new(playback: Arc<PlaybackClient<B, P>>) -> Self {
        let (view, _) = watch::channel(SessionView::idle());
        Self {
            playback,
            progress: None,
            active: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            view: Arc::new(view),
        }
    }

    /// Stopping a session also cancels this synchronizer's local increment.
    pub fn with_progress(mut self, progress: Arc<ProgressSynchronizer<B, P>>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Starts counting down the first work phase and starts `playlist_id`.
    /// A failed pause while tearing down a previous session is logged and
    /// does not block the new one. A `stop` or `start` issued while that
    /// pause is in flight wins, and this call returns without a session.
    pub async fn start(&self, preset: DurationPreset, playlist_id: &str) -> Result<(), InfraError> {
        let playlist_id = playlist_id.trim();
        if playlist_id.is_empty() {
            return Err(InfraError::InvalidConfig("playlist id must not be empty".to_string()));
        }

        // Reserve a generation before the teardown pause so a stop or start
        // issued meanwhile invalidates this one.
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.take_active().is_some() {
            if let Err(error) = self.playback.pause(None).await {
                warn!(%error, "pause during session teardown failed");
            }
        }

        let clock = PhaseClock::new(preset);
        let context = SessionContext {
            playback: Arc::clone(&self.playback),
            active: Arc::clone(&self.active),
            current_generation: Arc::clone(&self.generation),
            view: Arc::clone(&self.view),
            generation,
            playlist_id: Arc::from(playlist_id),
        };

        {
            let mut active = lock(&self.active);
            if !context.is_current() {
                debug!(generation, "session start superseded");
                return Ok(());
            }
            if let Some(previous) = active.take() {
                previous.cancel();
            }
            context.publish(&clock);
            *active = Some(ActiveSession {
                generation,
                tick_task: tokio::spawn(context.clone().run_ticks(clock)),
                pending_play: Some(context.spawn_play()),
            });
        }

        info!(
            preset = preset.key(),
            playlist_id,
            generation,
            "session started"
        );
        Ok(())
    }

    /// Cancels the phase tick, any pending play and the local progress
    /// increment, then pauses playback. No-op when nothing is running.
    pub async fn stop(&self) -> Result<(), InfraError> {
        let Some(generation) = self.cancel_active() else {
            return Ok(());
        };
        info!(generation, "session stopped");
        self.playback.pause(None).await
    }

    fn cancel_active(&self) -> Option<u64> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.take_active()
    }

    /// Tears down the installed session without touching the generation.
    fn take_active(&self) -> Option<u64> {
        let session = lock(&self.active).take()?;
        let generation = session.generation;
        session.cancel();
        if let Some(progress) = &self.progress {
            progress.cancel_local_increment();
        }
        self.view.send_replace(SessionView::idle());
        Some(generation)
    }
}

fn lock(active: &Mutex<Option<ActiveSession>>) -> MutexGuard<'_, Option<ActiveSession>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}
