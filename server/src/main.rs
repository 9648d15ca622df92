use clap::Parser;
use server::config::Settings;
use server::game::GameServer;
use server::network::NetworkServer;
use server::session::SessionRegistry;
use server::world::World;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Parses command-line arguments, loads the settings file, and runs the
/// network layer and the game loop as separate tasks.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "11000")]
        port: u16,
        /// Path to the JSON settings file (defaults apply when omitted)
        #[clap(short, long)]
        settings: Option<PathBuf>,
    }

    env_logger::init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let tick_duration = Duration::from_millis(settings.ms_per_frame);

    // Shared state: the world and the connection registry, each behind
    // its own lock.
    let world = Arc::new(RwLock::new(World::new(&settings)));
    let registry = Arc::new(RwLock::new(SessionRegistry::new()));

    let address = format!("{}:{}", args.host, args.port);
    let network =
        NetworkServer::bind(&address, Arc::clone(&registry), Arc::clone(&world)).await?;

    // Spawn network task
    let network_handle = tokio::spawn(network.run());

    // Spawn game loop task
    let game_handle = {
        let game = GameServer::new(world, registry, tick_duration);
        tokio::spawn(game.run())
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = network_handle => {
            if let Err(e) = result {
                eprintln!("Network task panicked: {}", e);
            }
        }
        result = game_handle => {
            if let Err(e) = result {
                eprintln!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
