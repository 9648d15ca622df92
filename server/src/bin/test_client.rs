//! Headless test client: connects, handshakes, drives its tank in a
//! square while firing, and prints what the server broadcasts.

use shared::{ControlCommand, FireType, FrameBuffer, Movement, ServerRecord, Vec2};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:11000".to_string());

    println!("Connecting to {}", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (mut reader, mut writer) = stream.into_split();
    let mut frames = FrameBuffer::new();
    let mut buf = [0u8; 4096];

    // Handshake: send our name, then read our id and the arena size.
    writer.write_all(b"test_client\n").await?;

    let id: u32 = read_line(&mut reader, &mut frames, &mut buf)
        .await?
        .parse()?;
    let world_size: i32 = read_line(&mut reader, &mut frames, &mut buf)
        .await?
        .parse()?;
    println!("Joined as client {} in a {}x{} arena", id, world_size, world_size);

    let moves = [
        Movement::Right,
        Movement::Down,
        Movement::Left,
        Movement::Up,
    ];

    for step in 0..120 {
        // One command per tick: drive in a square, firing every 30th tick.
        let moving = moves[(step / 30) % moves.len()];
        let fire = if step % 30 == 0 {
            FireType::Main
        } else {
            FireType::None
        };
        let command = ControlCommand::new(moving, fire, Vec2::new(0.0, -1.0));
        let mut line = serde_json::to_string(&command)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;

        // Drain whatever the server has broadcast since the last tick.
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            println!("Server closed the connection");
            return Ok(());
        }
        frames.extend(&buf[..n]);

        while let Some(result) = frames.next_line() {
            let line = match result {
                Ok(line) => line,
                Err(e) => {
                    println!("Skipping unreadable line: {}", e);
                    continue;
                }
            };
            match ServerRecord::decode(&line) {
                Ok(ServerRecord::Tank(tank)) if tank.id == id && step % 30 == 0 => {
                    println!(
                        "  our tank: loc=({:.0}, {:.0}) hp={} score={}",
                        tank.location.x, tank.location.y, tank.hp, tank.score
                    );
                }
                Ok(ServerRecord::Wall(wall)) => {
                    println!(
                        "  wall {}: ({:.0}, {:.0}) - ({:.0}, {:.0})",
                        wall.id, wall.p1.x, wall.p1.y, wall.p2.x, wall.p2.y
                    );
                }
                Ok(ServerRecord::Beam(beam)) => {
                    println!("  beam {} fired by {}", beam.id, beam.owner);
                }
                Ok(_) => {}
                Err(e) => println!("Undecodable record: {}", e),
            }
        }

        sleep(Duration::from_millis(17)).await;
    }

    println!("Test client finished");
    Ok(())
}

async fn read_line(
    reader: &mut tokio::net::tcp::OwnedReadHalf,
    frames: &mut FrameBuffer,
    buf: &mut [u8],
) -> Result<String, Box<dyn std::error::Error>> {
    loop {
        if let Some(result) = frames.next_line() {
            return Ok(result?);
        }
        let n = reader.read(buf).await?;
        if n == 0 {
            return Err("connection closed during handshake".into());
        }
        frames.extend(&buf[..n]);
    }
}
