//! dancesync - dance playback and multi-instance playback sync for a desktop avatar
//!
//! Runs a headless dance player: scans bundled and user-installed dances, drives the
//! playback state machine and keeps several running instances in step through a shared
//! lock file and command bus.

#![allow(dead_code)]

mod config;
mod console;
mod core;
mod error;
mod models;
mod stores;
mod sync;
mod utils;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::{Paths, PlayerConfig};
use crate::console::{ConsoleCommand, HELP};
use crate::core::animator::{HeadlessAnimator, HeadlessAvatar};
use crate::core::audio::NullAudio;
use crate::core::clock::{Clock, SystemClock};
use crate::core::loader::FsBundleLoader;
use crate::core::playback::{PlaybackEngine, PlaybackSettings};
use crate::core::watchdog::Watchdog;
use crate::core::{CatalogScanner, DancePlayer};
use crate::stores::{FavoritesStore, JsonModStates, ModStates};
use crate::sync::{LeaderLease, SyncBus, SyncCoordinator};

/// Frame cadence of the player loop
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How long the mods directory must stay quiet before a rescan
const MODS_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Headless avatar pose settle time, in seconds
const HEADLESS_POSE_LAG: f64 = 0.25;

/// dancesync - avatar dance player
#[derive(Parser, Debug)]
#[command(name = "dancesync")]
#[command(version)]
#[command(about = "Dance playback with multi-instance sync for a desktop avatar")]
struct Args {
    /// Path to the data directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the bundled dance content
    #[arg(long)]
    content: Option<PathBuf>,

    /// Index of this instance, used when the leader lock is unavailable
    #[arg(long, env = "DANCESYNC_INSTANCE", default_value_t = 0)]
    instance: u32,

    /// Play on this instance only
    #[arg(long)]
    no_sync: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Print the catalog and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };

    // audio probing is noisy on odd files
    let filter = tracing_subscriber::EnvFilter::new(format!("{},lofty=error", log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("dancesync v{} starting...", env!("CARGO_PKG_VERSION"));

    let paths = Paths::init(args.config.clone(), args.content.clone())?;
    info!("Data directory: {:?}", paths.data_dir());

    let config = PlayerConfig::load()?;

    let mut player = build_player(&paths, &config, &args)?;
    player.rescan();
    player.prime_sync();
    info!("{} dances available, role: {}", player.catalog().len(), player.role());

    if args.list {
        print_list(&player);
        player.shutdown();
        return Ok(());
    }

    run(player, &paths, &config).await
}

fn load_mod_states(paths: &Paths) -> Box<dyn ModStates> {
    match JsonModStates::load(&paths.mod_states_path()) {
        Ok(states) => Box::new(states),
        Err(e) => {
            tracing::warn!("{:#}, enabling all mods", e);
            Box::new(JsonModStates::default())
        }
    }
}

fn build_player(paths: &Paths, config: &PlayerConfig, args: &Args) -> Result<DancePlayer> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let animator =
        HeadlessAnimator::new(Arc::clone(&clock), config).with_pose_lag(HEADLESS_POSE_LAG);
    let engine = PlaybackEngine::new(
        PlaybackSettings::from(config),
        Box::new(HeadlessAvatar::new(animator)),
        Box::new(NullAudio::new(Arc::clone(&clock), config.default_volume)),
        Box::new(FsBundleLoader::new()),
        Arc::clone(&clock),
    );

    let sync = if config.enable_sync && !args.no_sync {
        SyncCoordinator::new(
            LeaderLease::acquire(&paths.leader_lock_path(), args.instance),
            SyncBus::new(paths.bus_path(&config.sync_file_name)),
            Arc::clone(&clock),
            config,
        )
    } else {
        info!("Sync disabled, playing standalone");
        SyncCoordinator::standalone(Arc::clone(&clock), config)
    };

    let scanner = CatalogScanner::new(
        paths.content_dir().to_path_buf(),
        paths.mods_dir(),
        paths.cache_dir(),
    );
    let favorites = FavoritesStore::load(&paths.favorites_path())?;

    Ok(DancePlayer::new(
        config,
        scanner,
        load_mod_states(paths),
        engine,
        sync,
        favorites,
    ))
}

fn start_watchdog(paths: &Paths) -> Option<Watchdog> {
    let mut watchdog = match Watchdog::new(MODS_QUIET_PERIOD) {
        Ok(watchdog) => watchdog,
        Err(e) => {
            tracing::warn!("Failed to start mods watcher: {}", e);
            return None;
        }
    };

    if let Err(e) = watchdog.watch(&paths.mods_dir()) {
        tracing::warn!("Failed to watch {:?}: {}", paths.mods_dir(), e);
        return None;
    }

    info!("Watching {:?} for new dances", paths.mods_dir());
    Some(watchdog)
}

async fn run(mut player: DancePlayer, paths: &Paths, config: &PlayerConfig) -> Result<()> {
    let mut frame = tokio::time::interval(FRAME_INTERVAL);
    frame.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut poll = tokio::time::interval(config.poll_interval());
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut watchdog = if config.watch_mods {
        start_watchdog(paths)
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = frame.tick() => {
                player.tick();

                if watchdog.as_mut().map(Watchdog::poll_change).unwrap_or(false) {
                    info!("Mods changed, rescanning");
                    player.set_mod_states(load_mod_states(paths));
                    player.rescan();
                }
            }
            _ = poll.tick() => {
                player.poll_bus();
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_line(&mut player, paths, &line) {
                            break;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        tracing::warn!("stdin closed: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    player.shutdown();
    Ok(())
}

/// Run one console line; false means quit
fn handle_line(player: &mut DancePlayer, paths: &Paths, line: &str) -> bool {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(crate::console::CommandError::Empty) => return true,
        Err(e) => {
            println!("{}", e);
            return true;
        }
    };

    match command {
        ConsoleCommand::Play => report(player.play(), "play"),
        ConsoleCommand::Stop => report(player.stop(), "stop"),
        ConsoleCommand::Next => report(player.next(), "next"),
        ConsoleCommand::Prev => report(player.prev(), "prev"),
        ConsoleCommand::Click(row) => report(player.click(row), "click"),
        ConsoleCommand::Loop(on) => player.set_loop(on),
        ConsoleCommand::Shuffle(on) => player.set_shuffle(on),
        ConsoleCommand::Favorite(title) => match player.toggle_favorite(&title) {
            Ok(true) => println!("added '{}' to favorites", title),
            Ok(false) => println!("removed '{}' from favorites", title),
            Err(e) => tracing::warn!("{:#}", e),
        },
        ConsoleCommand::Search(text) => {
            player.set_search(&text);
            print_list(player);
        }
        ConsoleCommand::FavoritesOnly(on) => {
            player.set_favorites_only(on);
            print_list(player);
        }
        ConsoleCommand::Rescan => {
            player.set_mod_states(load_mod_states(paths));
            player.rescan();
        }
        ConsoleCommand::List => print_list(player),
        ConsoleCommand::Status => println!("{}", player.status()),
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return false,
    }

    true
}

fn report(accepted: bool, action: &str) {
    if !accepted {
        println!("{} not possible right now", action);
    }
}

fn print_list(player: &DancePlayer) {
    let current = player.engine().current_index();

    for (row, &index) in player.visible().iter().enumerate() {
        let entry = match player.catalog().get(index) {
            Some(entry) => entry,
            None => continue,
        };
        let marker = if Some(index) == current { '>' } else { ' ' };
        let star = if player.favorites().contains(&entry.id) { '*' } else { ' ' };
        println!("{}{:>3}. {}{}  {}", marker, row + 1, star, entry.id, entry.author);
    }

    if player.visible().is_empty() {
        println!("no dances");
    }
}
