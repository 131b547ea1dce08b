//! stagefront-site - command-line client for the Stagefront band site
//!
//! Loads site data (defaults, local snapshot, remote snapshot), pushes the
//! local snapshot to the store proxy, checks the admin gate, and plays tracks
//! through the headless backend with a spectrum readout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stagefront_common::config::{
    default_data_dir, load_config, TomlConfig, ADMIN_PASSWORD_ENV, COMPILED_ADMIN_PASSWORD,
    SYNC_SECRET_ENV,
};
use stagefront_common::events::EventBus;
use stagefront_common::snapshot::FileSnapshotStore;
use stagefront_site::admin::AdminGate;
use stagefront_site::audio::{
    AnalyserConfig, AudioSessionManager, HeadlessBackend, PlayStart, RestrictedPolicy,
};
use stagefront_site::{SiteStateController, StoreClient};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stagefront-site")]
#[command(about = "Site data and audio client for the Stagefront band site")]
#[command(version)]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(short, long, env = "STAGEFRONT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the local snapshot
    #[arg(long, env = "STAGEFRONT_SNAPSHOT_DIR", global = true)]
    snapshot_dir: Option<PathBuf>,

    /// Store proxy record URL
    #[arg(long, env = "STAGEFRONT_REMOTE", global = true)]
    remote: Option<String>,

    /// Sync secret sent as x-auth-key on push
    #[arg(long, env = SYNC_SECRET_ENV, hide_env_values = true, global = true)]
    sync_key: Option<String>,

    /// Default admin password when the site data carries none
    #[arg(long, env = ADMIN_PASSWORD_ENV, hide_env_values = true, global = true)]
    admin_password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and sync site data, then print a summary
    Status,
    /// Upload the local site data to the store proxy
    Push,
    /// Play a track headlessly and log its spectrum
    Play {
        track_id: u64,
        /// Stop after this many seconds
        #[arg(long, default_value_t = 30)]
        seconds: u64,
    },
    /// Check a password against the admin gate
    Login { password: String },
}

struct Client {
    controller: SiteStateController,
    remote: Option<StoreClient>,
    bus: Arc<EventBus>,
}

async fn open(args: &Args, config: &TomlConfig) -> Result<Client> {
    let site = &config.site;
    let snapshot_dir = args
        .snapshot_dir
        .clone()
        .or_else(|| site.snapshot_dir.clone())
        .unwrap_or_else(|| default_data_dir().join("snapshots"));
    info!("Local snapshot directory: {}", snapshot_dir.display());

    let bus = Arc::new(EventBus::default());
    let mut controller = SiteStateController::load(
        Arc::new(FileSnapshotStore::new(snapshot_dir)),
        &site.snapshot_key,
        Duration::from_millis(site.debounce_ms),
        Arc::clone(&bus),
    );

    let remote = match args.remote.clone().or_else(|| site.remote_endpoint.clone()) {
        Some(endpoint) => Some(
            StoreClient::new(endpoint, args.sync_key.clone()).context("Failed to build HTTP client")?,
        ),
        None => None,
    };

    match &remote {
        Some(client) => {
            if controller.sync_from_remote(client).await {
                info!("Merged remote snapshot from {}", client.endpoint());
            }
        }
        None => info!("No remote endpoint configured; using local data only"),
    }

    Ok(Client {
        controller,
        remote,
        bus,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .init();

    info!(
        "stagefront-site v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let client = open(&args, &config).await?;

    match &args.command {
        Command::Status => status(&client),
        Command::Push => push(&client).await?,
        Command::Play { track_id, seconds } => {
            play(&client, &config, *track_id, Duration::from_secs(*seconds)).await?
        }
        Command::Login { password } => login(&args, &config, &client, password),
    }

    client.controller.shutdown().await;
    Ok(())
}

fn status(client: &Client) {
    let data = client.controller.data();
    println!("{} - {}", data.hero.title, data.hero.subtitle);
    println!(
        "Featured: {} ({})",
        data.featured_album.title, data.featured_album.release_date
    );
    println!("Tracks:");
    for track in &data.tracks {
        let source = match track.audio_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => "(no audio)",
        };
        println!("  [{}] {} - {} {} {}", track.id, track.title, track.artist, track.duration, source);
    }
    println!(
        "{} articles, {} artists, {} resources",
        data.articles.len(),
        data.artists.len(),
        data.resources.len()
    );
    for issue in data.validate() {
        println!("warning: {}", issue);
    }
}

async fn push(client: &Client) -> Result<()> {
    let Some(remote) = &client.remote else {
        bail!("No remote endpoint configured (use --remote or [site] remote_endpoint)");
    };
    if !remote.has_sync_key() {
        bail!("No sync key configured (set {})", SYNC_SECRET_ENV);
    }
    remote
        .push(client.controller.data())
        .await
        .with_context(|| format!("Failed to push to {}", remote.endpoint()))?;
    println!("Pushed site data to {}", remote.endpoint());
    Ok(())
}

fn login(args: &Args, config: &TomlConfig, client: &Client, password: &str) {
    let default_password = args
        .admin_password
        .clone()
        .or_else(|| config.site.admin_password.clone())
        .unwrap_or_else(|| COMPILED_ADMIN_PASSWORD.to_string());

    let mut gate = AdminGate::new(default_password);
    if gate.submit(password, client.controller.data()) {
        println!("Admin panel unlocked");
    } else {
        println!("Incorrect password");
    }
}

async fn play(client: &Client, config: &TomlConfig, track_id: u64, limit: Duration) -> Result<()> {
    let track = client.controller.track(track_id)?;

    let mut manager = AudioSessionManager::new(
        Arc::new(HeadlessBackend::from_audio_config(&config.audio)),
        RestrictedPolicy::from_config(&config.audio.restricted_providers),
        AnalyserConfig::from_audio_config(&config.audio),
        Arc::clone(&client.bus),
    );

    let ticket = manager.play_track(&track)?;
    println!("Playing [{}] {} - {}", track.id, track.title, track.artist);

    let deadline = tokio::time::sleep(limit);
    tokio::pin!(deadline);
    let mut spectrum = tokio::time::interval(Duration::from_secs(1));
    let mut ticket = Some(ticket);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Playback limit reached");
                break;
            }
            event = manager.process_next_event() => {
                if event.is_none() {
                    break;
                }
                if manager.phase() == stagefront_common::events::SessionPhase::Ended {
                    break;
                }
            }
            _ = spectrum.tick() => {
                if let Some(ticket) = ticket.take() {
                    match ticket.outcome().await {
                        PlayStart::Failed(reason) => bail!("Playback failed: {}", reason),
                        other => info!("Play request settled: {:?}", other),
                    }
                }
                print_spectrum(&manager);
            }
        }
    }

    let snapshot = manager.snapshot();
    println!(
        "Stopped at {:.1}s of {}",
        snapshot.current_time,
        snapshot
            .duration
            .map_or_else(|| "unknown".to_string(), |d| format!("{:.1}s", d))
    );
    manager.dispose();
    Ok(())
}

/// One line of 16 coarse bands, scaled to 0-9
fn print_spectrum(manager: &AudioSessionManager) {
    let snapshot = manager.snapshot();
    let Some(analyser) = manager.analyser() else {
        println!("{:>6.1}s [no visualization] {}", snapshot.current_time, snapshot.phase);
        return;
    };

    let mut bins = vec![0u8; analyser.frequency_bin_count()];
    analyser.byte_frequency_data(&mut bins);
    let band = (bins.len() / 16).max(1);
    let bars: String = bins
        .chunks(band)
        .take(16)
        .map(|chunk| {
            let peak = chunk.iter().copied().max().unwrap_or(0);
            char::from(b'0' + (peak as u32 * 9 / 255) as u8)
        })
        .collect();
    println!("{:>6.1}s [{}] {}", snapshot.current_time, bars, snapshot.phase);
}
