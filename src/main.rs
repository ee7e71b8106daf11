use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pomotune::application::bootstrap::ClientServices;
use pomotune::infrastructure::config::{
    load_client_config_from_env, load_credentials_from_env, write_default_config,
};
use pomotune::infrastructure::credential_store::{CredentialStore, InMemoryCredentialStore};
use pomotune::{DurationPreset, Provider, bootstrap_services};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pomodoro timer that drives Spotify playback through the pomotune backend.
#[derive(Parser, Debug)]
#[command(name = "pomotune", version, about)]
struct Cli {
    /// JSON config file (`"schema": 1`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log one JSON object per line
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the backends and print the chosen base URL
    Endpoint,
    /// Write the default config file
    ConfigInit { path: PathBuf },
    /// Sign in and print the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// List playlists for a provider
    Playlists {
        #[arg(long)]
        provider: Provider,
    },
    /// Show whether a provider account is linked
    Linked {
        #[arg(long)]
        provider: Provider,
    },
    /// Unlink a provider account
    Unlink {
        #[arg(long)]
        provider: Provider,
    },
    /// List every linked provider account
    Apps,
    /// List playback devices
    Devices,
    /// Show the current track and position
    NowPlaying,
    /// Run a Pomodoro session until Ctrl-C
    Session {
        #[arg(long, default_value = "25-5")]
        preset: DurationPreset,
        #[arg(long)]
        playlist: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Command::ConfigInit { path } = &cli.command {
        let written = write_default_config(path)
            .with_context(|| format!("writing {}", path.display()))?;
        if written {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists; left unchanged", path.display());
        }
        return Ok(());
    }

    let config = load_client_config_from_env(cli.config.as_deref()).context("loading config")?;
    let store = Arc::new(InMemoryCredentialStore::default());
    if !matches!(cli.command, Command::Login { .. } | Command::Endpoint) {
        let credentials = load_credentials_from_env().context("reading session identity")?;
        store.save(&credentials).context("storing session identity")?;
    }

    let services = bootstrap_services(config, store).await?;
    run(cli.command, &services).await
}

async fn run(command: Command, services: &ClientServices) -> Result<()> {
    match command {
        Command::ConfigInit { .. } => Ok(()),
        Command::Endpoint => {
            println!("{}", services.endpoint.base_url());
            Ok(())
        }
        Command::Login { email, password } => {
            let credentials = services.accounts.login(&email, &password).await?;
            println!("POMOTUNE_USER_EMAIL={}", credentials.user_email);
            if let Some(token) = credentials.bearer_token {
                println!("POMOTUNE_BEARER_TOKEN={token}");
            }
            Ok(())
        }
        Command::Playlists { provider } => {
            let playlists = services.catalog.load(provider).await?;
            println!("{}", serde_json::to_string_pretty(&playlists)?);
            Ok(())
        }
        Command::Linked { provider } => {
            let status = services.accounts.check_linked(provider).await?;
            let state = if status.user_linked { "linked" } else { "not linked" };
            println!("{}: {state}", provider.display_name());
            Ok(())
        }
        Command::Unlink { provider } => {
            println!("{}", services.accounts.unlink(provider).await?);
            Ok(())
        }
        Command::Apps => {
            for binding in services.accounts.bindings().await? {
                let state = if binding.user_linked { "linked" } else { "not linked" };
                match binding.profile_name() {
                    Some(name) => println!("{}: {state} ({name})", binding.provider.display_name()),
                    None => println!("{}: {state}", binding.provider.display_name()),
                }
            }
            Ok(())
        }
        Command::Devices => {
            for device in services.playback.list_devices().await? {
                let marker = if device.is_active { "*" } else { " " };
                println!(
                    "{marker} {} [{}] {}",
                    device.name,
                    device.device_type,
                    device.id.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Command::NowPlaying => {
            match services.playback.current_playback().await? {
                Some(snapshot) => println!(
                    "{} - {} ({}) {}",
                    snapshot.track.title,
                    snapshot.track.artist_line(),
                    snapshot.track.album,
                    if snapshot.is_playing { "playing" } else { "paused" }
                ),
                None => println!("Nothing playing"),
            }
            Ok(())
        }
        Command::Session { preset, playlist } => run_session(services, preset, &playlist).await,
    }
}

async fn run_session(services: &ClientServices, preset: DurationPreset, playlist_id: &str) -> Result<()> {
    let engine = services.session_engine();
    let poller = services.progress.spawn_polling(services.config.poll_interval);
    let mut updates = engine.subscribe();

    engine.start(preset, playlist_id).await?;
    info!(preset = %preset, "press Ctrl-C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("waiting for Ctrl-C")?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if !view.active {
                    continue;
                }
                let progress = services.progress.view();
                let track = progress
                    .track
                    .as_ref()
                    .map(|track| format!("{} - {}", track.title, track.artist_line()))
                    .unwrap_or_else(|| "Nothing playing".to_string());
                eprint!(
                    "\r{:<11} {} | cycle {} | {} {}/{}   ",
                    view.label(),
                    view.display,
                    view.cycle_count,
                    track,
                    progress.elapsed,
                    progress.duration
                );
            }
        }
    }

    eprintln!();
    poller.abort();
    if let Err(error) = engine.stop().await {
        warn!(%error, "final pause failed");
    }
    Ok(())
}
