//! Connection registry and per-tick command buffering.
//!
//! This module owns everything about a connection except its tank:
//! - identity assignment and the outbound line channel for broadcasts
//! - the "latest command" slot each connection fills between ticks
//! - the disconnect queue, drained once per tick by the simulation loop
//!
//! Keeping this state separate from the world, behind its own lock, means
//! network tasks never block on simulation work and vice versa. The world
//! only ever learns about connections through what the loop drains here.

use log::info;
use shared::{ControlCommand, FireType};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// One connected client: identity plus the channel its writer task drains.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub name: String,
    sender: UnboundedSender<String>,
}

/// Tracks live connections, their pending commands, and queued disconnects.
///
/// Client ids start at 1 and are never reused within a server run; a tank
/// keeps its connection's id for its whole lifetime.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<u32, Session>,
    pending: HashMap<u32, ControlCommand>,
    disconnects: Vec<u32>,
    next_id: u32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            pending: HashMap::new(),
            disconnects: Vec::new(),
            next_id: 1,
        }
    }

    /// Admits a new connection and returns its assigned id.
    pub fn register(&mut self, name: &str, sender: UnboundedSender<String>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;

        info!("Client {} ({}) connected", id, name);
        self.sessions.insert(
            id,
            Session {
                id,
                name: name.to_string(),
                sender,
            },
        );
        id
    }

    /// Stores a decoded command in the connection's slot. Within one tick
    /// window the first command sticks, except that an `alt` (beam) fire
    /// always overwrites: a beam press must not be lost to a stale command
    /// that arrived earlier in the same window.
    ///
    /// Returns false for unknown connections so callers can drop input
    /// that raced a disconnect.
    pub fn buffer_command(&mut self, id: u32, cmd: ControlCommand) -> bool {
        if !self.sessions.contains_key(&id) {
            return false;
        }
        match self.pending.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(cmd);
            }
            Entry::Occupied(mut slot) => {
                if cmd.fire == FireType::Alt {
                    slot.insert(cmd);
                }
            }
        }
        true
    }

    /// Takes every buffered command, clearing the slots for the next tick.
    pub fn drain_commands(&mut self) -> Vec<(u32, ControlCommand)> {
        self.pending.drain().collect()
    }

    /// Queues a connection for removal at the next tick boundary and drops
    /// its session immediately so no further broadcasts are attempted.
    /// Safe to call more than once per connection.
    pub fn queue_disconnect(&mut self, id: u32) {
        if self.sessions.remove(&id).is_some() {
            info!("Client {} disconnected", id);
        }
        self.pending.remove(&id);
        if !self.disconnects.contains(&id) {
            self.disconnects.push(id);
        }
    }

    /// Takes the ids whose disconnect is to be finalized this tick.
    pub fn drain_disconnects(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.disconnects)
    }

    /// Sends one pre-serialized frame to every connection. A send only
    /// fails when the writer task is gone, which means the connection is
    /// dead; those clients are queued for disconnect.
    pub fn broadcast(&mut self, frame: &str) {
        let mut failed = Vec::new();
        for session in self.sessions.values() {
            if session.sender.send(frame.to_string()).is_err() {
                failed.push(session.id);
            }
        }
        for id in failed {
            self.queue_disconnect(id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
