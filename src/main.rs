//! Plague - headless demo host
//!
//! Stands in for a game server: a handful of players wander between a few
//! camps, occasionally disconnect and come back, and get a metabolism tick
//! every second. Infection spreads through the contagion core exactly as it
//! would under a real host.

use clap::Parser;
use plague::contagion::stage;
use plague::core::types::{EntityId, LayerMask, Vec2};
use plague::core::{PlagueConfig, Result};
use plague::simulation::{metabolism_tick, Metabolism, PlagueHost};
use plague::spatial::{SpatialIndex, WorldGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

/// Headless contagion demo
#[derive(Parser, Debug)]
#[command(name = "plague")]
#[command(about = "Run a headless contagion simulation with wandering players")]
struct Args {
    /// Number of players
    #[arg(long, default_value_t = 12)]
    players: u64,

    /// Number of camps players gravitate toward
    #[arg(long, default_value_t = 3)]
    camps: usize,

    /// Side length of the square world (world units)
    #[arg(long, default_value_t = 120.0)]
    world_size: f32,

    /// Wall-clock seconds to simulate
    #[arg(long, default_value_t = 30)]
    seconds: u64,

    /// Random seed for deterministic movement
    #[arg(long)]
    seed: Option<u64>,

    /// Optional TOML config overriding the default rates
    #[arg(long)]
    config: Option<PathBuf>,
}

const MOVE_INTERVAL: Duration = Duration::from_millis(250);
const METABOLISM_INTERVAL: Duration = Duration::from_secs(1);
const WALK_SPEED: f32 = 2.5;
/// Chance per movement step that an online player disconnects
const LEAVE_CHANCE: f64 = 0.004;
/// Chance per movement step that an offline player reconnects
const RETURN_CHANCE: f64 = 0.02;

struct Player {
    id: EntityId,
    pos: Vec2,
    camp: usize,
    online: bool,
    metabolism: Metabolism,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plague=info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PlagueConfig::load(path)?,
        None => PlagueConfig::default(),
    };

    let rt = Runtime::new()?;
    rt.block_on(run(args, config))
}

async fn run(args: Args, config: PlagueConfig) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(seed, players = args.players, "starting contagion demo");

    let camps: Vec<Vec2> = (0..args.camps.max(1))
        .map(|_| Vec2::new(rng.gen_range(0.0..args.world_size), rng.gen_range(0.0..args.world_size)))
        .collect();

    let grid = Arc::new(WorldGrid::new(config.scan.plague_range / 2.0));
    let mut players: Vec<Player> = (1..=args.players)
        .map(|i| Player {
            id: EntityId::new(76_561_198_000_000_000 + i),
            pos: Vec2::new(rng.gen_range(0.0..args.world_size), rng.gen_range(0.0..args.world_size)),
            camp: rng.gen_range(0..camps.len()),
            online: true,
            metabolism: Metabolism::default(),
        })
        .collect();

    for player in &players {
        grid.place(player.id, player.pos, LayerMask::PLAYERS);
    }

    let spatial: Arc<dyn SpatialIndex> = grid.clone();
    let host = PlagueHost::new(&config, spatial)?;
    host.bootstrap(players.iter().map(|p| p.id));

    let mut movement = tokio::time::interval(MOVE_INTERVAL);
    let mut metabolism = tokio::time::interval(METABOLISM_INTERVAL);
    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = movement.tick() => {
                for player in &mut players {
                    step_player(player, &camps, &grid, &host, &mut rng);
                }
            }
            _ = metabolism.tick() => {
                for player in players.iter_mut().filter(|p| p.online) {
                    metabolism_tick(host.registry(), player.id, &mut player.metabolism, &config.metabolism);
                }
            }
        }
    }

    host.shutdown();
    report(&host, &players);
    Ok(())
}

fn step_player(player: &mut Player, camps: &[Vec2], grid: &WorldGrid, host: &PlagueHost, rng: &mut ChaCha8Rng) {
    if !player.online {
        if rng.gen_bool(RETURN_CHANCE) {
            player.online = true;
            player.camp = rng.gen_range(0..camps.len());
            grid.place(player.id, player.pos, LayerMask::PLAYERS);
            host.on_entity_active(player.id);
        }
        return;
    }

    if rng.gen_bool(LEAVE_CHANCE) {
        player.online = false;
        grid.remove(player.id);
        host.on_entity_left(player.id);
        return;
    }

    // Drift toward the home camp with some jitter, occasionally switching camps
    if rng.gen_bool(0.01) {
        player.camp = rng.gen_range(0..camps.len());
    }
    let heading = (camps[player.camp] - player.pos).normalize();
    let jitter = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
    player.pos = player.pos + (heading + jitter) * WALK_SPEED;
    grid.place(player.id, player.pos, LayerMask::PLAYERS);
}

fn report(host: &PlagueHost, players: &[Player]) {
    println!("\n=== CONTAGION REPORT ===");
    println!("{:<22} {:>7} {:>6} {:>6} {:>9} {:>9}", "player", "online", "level", "stage", "calories", "hydration");
    for player in players {
        let level = host.infection_level(player.id).unwrap_or(0);
        println!(
            "{:<22} {:>7} {:>6} {:>6} {:>9.2} {:>9.2}",
            player.id.to_string(),
            player.online,
            level,
            stage(level),
            player.metabolism.calories,
            player.metabolism.hydration,
        );
    }
}
