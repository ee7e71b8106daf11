pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::accounts::AccountService;
pub use application::bootstrap::{ClientServices, bootstrap_services, build_services};
pub use application::catalog::PlaylistCatalog;
pub use application::endpoint::{EndpointChoice, EndpointResolver};
pub use application::playback::{PlayOutcome, PlaybackClient};
pub use application::progress::{ProgressSynchronizer, ProgressView, SyncOutcome};
pub use application::session::{SessionEngine, SessionView};
pub use domain::models::{Device, Playlist, PlaybackSnapshot, Provider, SessionCredentials, Track};
pub use domain::pomodoro::{DurationPreset, Phase, PhaseClock};
pub use infrastructure::config::ClientConfig;
pub use infrastructure::error::InfraError;
