//! # TankWars Server Library
//!
//! Authoritative server for the TankWars arena game. The server alone owns
//! the truth about the world; clients submit per-tick control intents and
//! receive a continuously updated view of every tank, projectile, wall,
//! powerup, and beam over newline-delimited JSON.
//!
//! ## Architecture
//!
//! A single simulation task runs the fixed-rate game loop and is the only
//! code that mutates the [`world::World`]. Network tasks (one acceptor,
//! one reader and one writer per connection) communicate with it purely
//! through the [`session::SessionRegistry`]: decoded commands land in
//! per-connection slots and transport failures land in a disconnect
//! queue, both drained exactly once per tick. The registry and the world
//! sit behind separate locks so socket traffic never stalls the
//! simulation.
//!
//! ## Tick order
//!
//! Every tick executes the same phases in the same order: command intake,
//! command application, world advancement (projectiles, respawns,
//! counters), the powerup spawn gate, the broadcast snapshot, and finally
//! cleanup of one-shot flags and dead entities. Given identical starting
//! state and commands, a tick is deterministic apart from the documented
//! random spawn placement.
//!
//! ## Module organization
//!
//! - [`config`] — startup settings, loaded once from a JSON file
//! - [`world`] — the simulation kernel and all entity ownership
//! - [`session`] — connection registry, command slots, disconnect queue
//! - [`network`] — TCP accept loop, handshake, per-connection tasks
//! - [`game`] — the fixed-rate loop driving everything above
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::config::Settings;
//! use server::game::GameServer;
//! use server::network::NetworkServer;
//! use server::session::SessionRegistry;
//! use server::world::World;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::RwLock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::default();
//!     let tick = Duration::from_millis(settings.ms_per_frame);
//!     let world = Arc::new(RwLock::new(World::new(&settings)));
//!     let registry = Arc::new(RwLock::new(SessionRegistry::new()));
//!
//!     let network =
//!         NetworkServer::bind("127.0.0.1:11000", Arc::clone(&registry), Arc::clone(&world))
//!             .await?;
//!     tokio::spawn(network.run());
//!     GameServer::new(world, registry, tick).run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod session;
pub mod world;
