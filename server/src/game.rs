//! The fixed-rate simulation loop.
//!
//! One task owns this loop; it is the only mutator of the `World`. Each
//! tick runs intake, apply, advance, spawn gate, broadcast, and cleanup in
//! that order, then waits out the remainder of the tick budget. Locks are
//! taken one at a time and never nested here, so network tasks only ever
//! wait for the short window a single phase holds.

use crate::session::SessionRegistry;
use crate::world::World;
use log::debug;
use shared::{to_line, Beam};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

/// Drives the world at a fixed tick rate and broadcasts each tick's state.
pub struct GameServer {
    world: Arc<RwLock<World>>,
    registry: Arc<RwLock<SessionRegistry>>,
    tick_duration: Duration,
}

impl GameServer {
    pub fn new(
        world: Arc<RwLock<World>>,
        registry: Arc<RwLock<SessionRegistry>>,
        tick_duration: Duration,
    ) -> Self {
        Self {
            world,
            registry,
            tick_duration,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Beams live exactly one tick: filled during apply, drained by
        // broadcast.
        let mut beams: Vec<Beam> = Vec::new();
        let mut tick: u64 = 0;

        loop {
            ticker.tick().await;

            // 1. Intake: take this tick's commands and disconnects.
            let (commands, disconnects) = {
                let mut registry = self.registry.write().await;
                (registry.drain_commands(), registry.drain_disconnects())
            };

            // 2-4. Apply commands, advance the world, run the spawn gate.
            {
                let mut world = self.world.write().await;
                for (id, cmd) in &commands {
                    world.apply_command(*id, cmd, &mut beams);
                }
                world.advance(&disconnects);
            }

            // 5. Broadcast, then clear the one-shot state it consumed.
            let frame = self.serialize_frame(&beams).await;
            {
                let mut registry = self.registry.write().await;
                registry.broadcast(&frame);
            }
            {
                let mut world = self.world.write().await;
                world.cleanup(&disconnects);
            }
            beams.clear();

            tick += 1;
            if tick % 60 == 0 {
                let (players, projectiles) = {
                    let world = self.world.read().await;
                    (world.players.len(), world.projectiles.len())
                };
                if players > 0 {
                    debug!(
                        "Tick {}: {} tanks, {} projectiles in flight",
                        tick, players, projectiles
                    );
                }
            }
        }
    }

    /// Serializes one tick's snapshot: every tank, then live powerups,
    /// then projectiles, then the beams fired this tick, one JSON line
    /// each. Entities flagged dead this tick are included once so clients
    /// can run their removal animations.
    async fn serialize_frame(&self, beams: &[Beam]) -> String {
        let world = self.world.read().await;
        let mut frame = String::new();

        for tank in world.players.values() {
            if let Ok(line) = to_line(tank) {
                frame.push_str(&line);
            }
        }
        for powerup in world.powerups.values() {
            if let Ok(line) = to_line(powerup) {
                frame.push_str(&line);
            }
        }
        for projectile in world.projectiles.values() {
            if let Ok(line) = to_line(projectile) {
                frame.push_str(&line);
            }
        }
        for beam in beams {
            if let Ok(line) = to_line(beam) {
                frame.push_str(&line);
            }
        }
        frame
    }
}
