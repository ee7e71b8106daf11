use crate::application::playback::PlaybackClient;
use crate::domain::models::{NowPlaying, PlaybackProgressState, PlaybackSnapshot};
use crate::domain::pomodoro::format_clock_ms;
use crate::infrastructure::backend_client::BackendApi;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::spotify_player_client::PlayerApi;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, warn};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub const LOCAL_INCREMENT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated,
    /// Provider reported nothing playing; progress reset to zero.
    Cleared,
    /// A newer sync or a cancel happened while this one was in flight.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub elapsed: String,
    pub duration: String,
    pub percent: u8,
    pub is_playing: bool,
    pub track: Option<NowPlaying>,
}

impl ProgressView {
    fn from_state(state: &PlaybackProgressState, is_playing: bool, track: Option<&NowPlaying>) -> Self {
        let progress_ms = state.local_progress_ms;
        let duration_ms = state.local_duration_ms;
        let percent = if duration_ms == 0 {
            0
        } else {
            (progress_ms.saturating_mul(100) / duration_ms).min(100) as u8
        };
        Self {
            progress_ms,
            duration_ms,
            elapsed: format_clock_ms(progress_ms),
            duration: format_clock_ms(duration_ms),
            percent,
            is_playing,
            track: track.cloned(),
        }
    }
}

#[derive(Default)]
struct ProgressShared {
    state: PlaybackProgressState,
    is_playing: bool,
    track: Option<NowPlaying>,
    increment: Option<JoinHandle<()>>,
}

/// Keeps a locally advancing copy of the provider's playback position.
/// Authoritative snapshots always overwrite the local projection.
pub struct ProgressSynchronizer<B, P>
where
    B: BackendApi,
    P: PlayerApi,
{
    playback: Arc<PlaybackClient<B, P>>,
    shared: Arc<Mutex<ProgressShared>>,
    epoch: Arc<AtomicU64>,
    increment_period: Duration,
    now_provider: NowProvider,
}

impl<B, P> ProgressSynchronizer<B, P>
where
    B: BackendApi + 'static,
    P: PlayerApi + 'static,
{
    pub fn new(playback: Arc<PlaybackClient<B, P>>) -> Self {
        Self {
            playback,
            shared: Arc::new(Mutex::new(ProgressShared::default())),
            epoch: Arc::new(AtomicU64::new(0)),
            increment_period: LOCAL_INCREMENT,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn sync_once(&self) -> Result<SyncOutcome, InfraError> {
        let started_epoch = self.epoch.load(Ordering::SeqCst);
        let snapshot = self.playback.current_playback().await?;

        let mut shared = lock(&self.shared);
        if self.epoch.load(Ordering::SeqCst) != started_epoch {
            debug!("discarding stale playback snapshot");
            return Ok(SyncOutcome::Stale);
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(increment) = shared.increment.take() {
            increment.abort();
        }

        let synced_at = Some((self.now_provider)());
        match snapshot {
            None => {
                shared.state = PlaybackProgressState {
                    local_progress_ms: 0,
                    local_duration_ms: 0,
                    last_synced_at: synced_at,
                };
                shared.is_playing = false;
                shared.track = None;
                Ok(SyncOutcome::Cleared)
            }
            Some(PlaybackSnapshot {
                progress_ms,
                duration_ms,
                is_playing,
                track,
            }) => {
                shared.state = PlaybackProgressState {
                    local_progress_ms: progress_ms,
                    local_duration_ms: duration_ms,
                    last_synced_at: synced_at,
                };
                shared.is_playing = is_playing;
                shared.track = Some(track);
                shared.increment = Some(self.spawn_increment(epoch));
                Ok(SyncOutcome::Updated)
            }
        }
    }

    /// Stops the cosmetic increment and invalidates any sync still in flight.
    /// The next successful sync starts a fresh increment.
    pub fn cancel_local_increment(&self) {
        let mut shared = lock(&self.shared);
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(increment) = shared.increment.take() {
            increment.abort();
        }
    }

    pub fn state(&self) -> PlaybackProgressState {
        lock(&self.shared).state.clone()
    }

    pub fn view(&self) -> ProgressView {
        let shared = lock(&self.shared);
        ProgressView::from_state(&shared.state, shared.is_playing, shared.track.as_ref())
    }

    /// Runs `sync_once` now and then every `interval` until the handle is
    /// aborted. Failures are logged and the loop keeps going.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let synchronizer = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(error) = synchronizer.sync_once().await {
                    warn!(%error, "playback poll failed");
                }
            }
        })
    }

    fn spawn_increment(&self, epoch: u64) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        let current_epoch = Arc::clone(&self.epoch);
        let period = self.increment_period;
        let step_ms = period.as_millis() as u64;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let mut guard = lock(&shared);
                if current_epoch.load(Ordering::SeqCst) != epoch {
                    break;
                }
                let state = &mut guard.state;
                state.local_progress_ms = state
                    .local_progress_ms
                    .saturating_add(step_ms)
                    .min(state.local_duration_ms);
            }
        })
    }
}

fn lock(shared: &Mutex<ProgressShared>) -> MutexGuard<'_, ProgressShared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
