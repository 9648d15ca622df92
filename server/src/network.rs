//! TCP network layer: accepting connections, the handshake, and the
//! per-connection read/write tasks.
//!
//! Connection tasks never touch the `World` beyond the one-time handshake.
//! Decoded commands go into the session registry's command slots and
//! transport failures become queued disconnects; both are consumed by the
//! game loop at the next tick boundary.

use crate::session::SessionRegistry;
use crate::world::World;
use log::{error, info, warn};
use shared::{to_line, ControlCommand, FrameBuffer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// Accepts clients and hands each one to its own connection task.
pub struct NetworkServer {
    listener: TcpListener,
    registry: Arc<RwLock<SessionRegistry>>,
    world: Arc<RwLock<World>>,
}

impl NetworkServer {
    /// Binds the listening socket. Failure to bind is the one startup
    /// error that must abort the process, so it propagates.
    pub async fn bind(
        addr: &str,
        registry: Arc<RwLock<SessionRegistry>>,
        world: Arc<RwLock<World>>,
    ) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", addr);
        Ok(Self {
            listener,
            registry,
            world,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept loop. An accept failure affects nobody who is already
    /// connected, so it is logged and the loop continues.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Accepted connection from {}", addr);
                    let registry = Arc::clone(&self.registry);
                    let world = Arc::clone(&self.world);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, world).await {
                            warn!("Connection from {} ended with error: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Reads until a complete line is buffered. Returns `None` on EOF or a
/// transport error; a non-UTF-8 line is skipped, not fatal.
async fn next_line(
    reader: &mut OwnedReadHalf,
    frames: &mut FrameBuffer,
    buf: &mut [u8],
) -> Option<String> {
    loop {
        while let Some(result) = frames.next_line() {
            match result {
                Ok(line) => return Some(line),
                Err(e) => warn!("Skipping unreadable line: {}", e),
            }
        }
        match reader.read(buf).await {
            Ok(0) => return None,
            Ok(n) => frames.extend(&buf[..n]),
            Err(e) => {
                warn!("Read error: {}", e);
                return None;
            }
        }
    }
}

/// Drives one client from handshake to disconnect.
///
/// Handshake: the client's first line is its player name; the server
/// replies with the assigned id, the arena size, and one JSON line per
/// wall, then the steady-state broadcast begins. After that, every inbound
/// line is a control command; malformed ones are discarded and the
/// connection stays open.
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<RwLock<SessionRegistry>>,
    world: Arc<RwLock<World>>,
) -> Result<(), std::io::Error> {
    let (mut reader, mut writer) = stream.into_split();
    let mut frames = FrameBuffer::new();
    let mut buf = [0u8; 2048];

    let Some(name) = next_line(&mut reader, &mut frames, &mut buf).await else {
        return Ok(());
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id;
    let mut greeting = String::new();
    {
        // The tank must exist and the handshake must be composed before
        // the first broadcast this client sees.
        let mut world = world.write().await;
        id = registry.write().await.register(&name, tx);
        world.add_tank(id, &name);

        greeting.push_str(&format!("{}\n{}\n", id, world.world_size()));
        for wall in world.walls.values() {
            if let Ok(line) = to_line(wall) {
                greeting.push_str(&line);
            }
        }
    }
    writer.write_all(greeting.as_bytes()).await?;

    // The writer task owns the write half and drains the session channel;
    // a write failure ends it, and the dropped receiver surfaces as a
    // broadcast error that queues the disconnect.
    let write_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if writer.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    while let Some(line) = next_line(&mut reader, &mut frames, &mut buf).await {
        match serde_json::from_str::<ControlCommand>(&line) {
            Ok(cmd) => {
                registry.write().await.buffer_command(id, cmd);
            }
            Err(e) => {
                warn!("Discarding malformed command from client {}: {}", id, e);
            }
        }
    }

    registry.write().await.queue_disconnect(id);
    write_task.abort();
    Ok(())
}
