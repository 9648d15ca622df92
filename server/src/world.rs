//! The simulation kernel: entity ownership, movement, collision, and
//! combat resolution.
//!
//! The `World` is the single unit of locking for simulation state. Every
//! mutation happens through the methods below, and only the game loop task
//! calls them; network tasks hand their input to the session registry and
//! never touch the world directly.

use crate::config::Settings;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    within_expansion, Beam, ControlCommand, FireType, Powerup, Projectile, Tank, Vec2, Wall,
    BEAM_RADIUS, PROJECTILE_SPEED, TANK_SIZE,
};
use std::collections::HashMap;

/// Rejection-sampling retry cap for spawn placement. A failed placement
/// skips the spawn for this tick instead of looping forever on a
/// pathological arena.
const SPAWN_ATTEMPTS: u32 = 1000;

/// Hands out monotonic ids per entity class. Owned by the world so id
/// sequences restart with it, which keeps tests deterministic.
#[derive(Debug, Default)]
struct IdAllocator {
    next_wall: u32,
    next_projectile: u32,
    next_powerup: u32,
    next_beam: u32,
}

impl IdAllocator {
    fn wall(&mut self) -> u32 {
        let id = self.next_wall;
        self.next_wall += 1;
        id
    }

    fn projectile(&mut self) -> u32 {
        let id = self.next_projectile;
        self.next_projectile += 1;
        id
    }

    fn powerup(&mut self) -> u32 {
        let id = self.next_powerup;
        self.next_powerup += 1;
        id
    }

    fn beam(&mut self) -> u32 {
        let id = self.next_beam;
        self.next_beam += 1;
        id
    }
}

/// Determines whether a ray intersects a circle of radius `radius` at
/// `center`.
///
/// Solves the quadratic for the hit point P = origin + t * dir. A negative
/// discriminant is a miss; otherwise it is a hit exactly when both roots
/// are positive. The roots are left un-normalized (not divided by 2a):
/// `a` is a dot product of a real direction with itself and thus never
/// negative, so the signs are unaffected.
pub fn ray_intersects_circle(origin: Vec2, dir: Vec2, center: Vec2, radius: f64) -> bool {
    let offset = origin - center;
    let a = dir.dot(&dir);
    let b = offset.scale(2.0).dot(&dir);
    let c = offset.dot(&offset) - radius * radius;

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return false;
    }

    let root1 = -b + disc.sqrt();
    let root2 = -b - disc.sqrt();
    root1 > 0.0 && root2 > 0.0
}

/// All simulation state for one match.
pub struct World {
    pub players: HashMap<u32, Tank>,
    pub projectiles: HashMap<u32, Projectile>,
    pub walls: HashMap<u32, Wall>,
    pub powerups: HashMap<u32, Powerup>,

    world_size: i32,
    frames_per_shot: u32,
    respawn_rate: u32,
    invincibility_frames: u32,
    max_powerups: usize,
    max_powerup_delay: u32,
    powerup_delay: u32,
    score_decrement: bool,

    ids: IdAllocator,
    rng: StdRng,
}

impl World {
    pub fn new(settings: &Settings) -> Self {
        Self::with_rng(settings, StdRng::from_entropy())
    }

    /// Builds a world with a caller-supplied rng so spawn placement and
    /// powerup delays are reproducible in tests.
    pub fn with_rng(settings: &Settings, mut rng: StdRng) -> Self {
        let mut ids = IdAllocator::default();
        let mut walls = HashMap::new();
        for spec in &settings.walls {
            let id = ids.wall();
            walls.insert(id, Wall::new(id, spec.p1, spec.p2));
        }

        let powerup_delay = random_delay(&mut rng, settings.max_powerup_delay);
        Self {
            players: HashMap::new(),
            projectiles: HashMap::new(),
            walls,
            powerups: HashMap::new(),
            world_size: settings.world_size,
            frames_per_shot: settings.frames_per_shot,
            respawn_rate: settings.respawn_rate,
            invincibility_frames: settings.invincibility_frames,
            max_powerups: settings.max_powerups,
            max_powerup_delay: settings.max_powerup_delay,
            powerup_delay,
            score_decrement: settings.score_decrement,
            ids,
            rng,
        }
    }

    pub fn world_size(&self) -> i32 {
        self.world_size
    }

    fn half_extent(&self) -> f64 {
        self.world_size as f64 / 2.0
    }

    /// Creates and places the tank for a newly connected client. The
    /// connection id doubles as the tank id for the tank's lifetime.
    pub fn add_tank(&mut self, id: u32, name: &str) {
        let tank = Tank::new(id, name, self.frames_per_shot);
        self.players.insert(id, tank);
        self.spawn_tank(id);
        info!("Added tank {} ({})", id, name);
    }

    /// Applies one buffered client intent: facing, aim, movement, then
    /// fire. Dead tanks ignore their commands entirely.
    pub fn apply_command(&mut self, id: u32, cmd: &ControlCommand, beams: &mut Vec<Beam>) {
        let Some(tank) = self.players.get_mut(&id) else {
            return;
        };
        if tank.hp == 0 {
            return;
        }

        tank.change_dir_and_vel(cmd.moving);
        tank.aiming = cmd.turret_direction;
        self.move_tank(id);

        match cmd.fire {
            FireType::Main => {
                if self
                    .players
                    .get(&id)
                    .is_some_and(|t| t.can_fire(self.frames_per_shot))
                {
                    self.fire_projectile(id);
                }
            }
            FireType::Alt => {
                if self.players.get(&id).is_some_and(Tank::can_fire_beam) {
                    self.fire_beam(id, beams);
                }
            }
            FireType::None => {}
        }
    }

    /// Advances a tank by its velocity. A wall in the way cancels the move
    /// and zeroes the velocity (no sliding). Powerup pickup is checked
    /// against the tank's current position regardless of the wall outcome.
    /// Wrap-around reflects each axis past the arena edge with a small
    /// offset so a wrapped tank does not immediately re-trigger the wrap.
    pub fn move_tank(&mut self, id: u32) {
        let Some(tank) = self.players.get(&id) else {
            return;
        };
        let mut new_loc = tank.location + tank.velocity;

        let blocked = self.walls.values().any(|w| w.collides_tank(new_loc));
        let mut picked_up = 0;
        for powerup in self.powerups.values_mut() {
            if !powerup.died && within_expansion(tank.location, powerup.location, TANK_SIZE / 2.0) {
                powerup.died = true;
                picked_up += 1;
            }
        }

        let half = self.half_extent();
        if new_loc.x < -half {
            new_loc.x = -new_loc.x - 5.0;
        } else if new_loc.x > half {
            new_loc.x = -new_loc.x + 5.0;
        }
        if new_loc.y < -half + 5.0 {
            new_loc.y = -new_loc.y - 5.0;
        } else if new_loc.y > half - 5.0 {
            new_loc.y = -new_loc.y + 5.0;
        }

        if let Some(tank) = self.players.get_mut(&id) {
            tank.powerup_count += picked_up;
            if blocked {
                tank.velocity = Vec2::default();
            } else {
                tank.location = new_loc;
            }
        }
    }

    /// Advances a projectile one tick. Checks run in wall, tank, bounds
    /// order; the dead flag is idempotent, so the order only decides which
    /// side effects (damage, score) land when several apply at once.
    pub fn move_projectile(&mut self, id: u32) {
        let Some(proj) = self.projectiles.get(&id).cloned() else {
            return;
        };
        let new_loc = proj.location + proj.orientation.scale(PROJECTILE_SPEED);

        let mut dead = self
            .walls
            .values()
            .any(|w| w.collides_projectile(new_loc));

        let mut owner_kills = 0;
        for tank in self.players.values_mut() {
            if tank.collides_projectile(&proj) {
                if !tank.is_invincible(self.invincibility_frames) {
                    tank.hp -= 1;
                }
                if tank.hp == 0 {
                    mark_died(tank, self.score_decrement);
                    owner_kills += 1;
                }
                dead = true;
            }
        }
        if owner_kills > 0 {
            if let Some(owner) = self.players.get_mut(&proj.owner) {
                owner.score += owner_kills;
            }
        }

        let half = self.half_extent();
        let out_of_bounds =
            new_loc.x < -half || new_loc.x > half || new_loc.y < -half || new_loc.y > half;

        if let Some(proj) = self.projectiles.get_mut(&id) {
            if dead || out_of_bounds {
                proj.died = true;
            }
            if !out_of_bounds {
                proj.location = new_loc;
            }
        }
    }

    /// Relocates a tank to a random spot clear of walls and powerups and
    /// restores it to full health inside a fresh invincibility window.
    /// Returns false when no clear spot was found within the retry cap;
    /// the caller simply tries again next tick.
    pub fn spawn_tank(&mut self, id: u32) -> bool {
        let half = self.half_extent();
        for _ in 0..SPAWN_ATTEMPTS {
            let candidate = Vec2::new(
                self.rng.gen_range(-half..half),
                self.rng.gen_range(-half..half),
            );

            let blocked = self.walls.values().any(|w| w.collides_tank(candidate))
                || self
                    .powerups
                    .values()
                    .any(|p| within_expansion(candidate, p.location, TANK_SIZE / 2.0));
            if blocked {
                continue;
            }

            if let Some(tank) = self.players.get_mut(&id) {
                tank.location = candidate;
                tank.hp = 3;
                tank.reset_death_frame();
                tank.reset_invincibility();
            }
            return true;
        }
        false
    }

    /// Places a new powerup clear of walls and tanks and re-arms the
    /// randomized spawn delay. Same bounded retry policy as tank spawns.
    pub fn spawn_powerup(&mut self) -> bool {
        let half = self.half_extent();
        for _ in 0..SPAWN_ATTEMPTS {
            // Inset the x range slightly so powerups never straddle the
            // wrap seam.
            let candidate = Vec2::new(
                self.rng.gen_range((-half + 5.0)..(half - 5.0)),
                self.rng.gen_range(-half..half),
            );

            let blocked = self.walls.values().any(|w| w.collides_powerup(candidate))
                || self.players.values().any(|t| t.collides_powerup(candidate));
            if blocked {
                continue;
            }

            let id = self.ids.powerup();
            self.powerups.insert(id, Powerup::new(id, candidate));
            self.powerup_delay = random_delay(&mut self.rng, self.max_powerup_delay);
            return true;
        }
        false
    }

    fn powerups_at_max(&self) -> bool {
        self.powerups.len() >= self.max_powerups
    }

    /// Creates a projectile at the tank's position along its aim and
    /// starts the cooldown over. Callers gate on `Tank::can_fire`.
    pub fn fire_projectile(&mut self, id: u32) {
        let Some(tank) = self.players.get_mut(&id) else {
            return;
        };
        let (loc, aim) = (tank.location, tank.aiming);
        tank.reset_fire_frame();

        let proj_id = self.ids.projectile();
        self.projectiles
            .insert(proj_id, Projectile::new(proj_id, id, loc, aim));
    }

    /// Fires the beam weapon: spends one charge, records the beam for this
    /// tick's broadcast, and instantly kills every other vulnerable tank
    /// on the ray. One beam can take down several tanks.
    pub fn fire_beam(&mut self, id: u32, beams: &mut Vec<Beam>) {
        let Some(tank) = self.players.get_mut(&id) else {
            return;
        };
        if !tank.can_fire_beam() {
            return;
        }
        tank.powerup_count -= 1;
        let (origin, dir) = (tank.location, tank.aiming);

        let beam_id = self.ids.beam();
        beams.push(Beam::new(beam_id, id, origin, dir));

        let mut kills = 0;
        for (other_id, other) in self.players.iter_mut() {
            if *other_id == id {
                continue;
            }
            if other.hp > 0
                && !other.is_invincible(self.invincibility_frames)
                && ray_intersects_circle(origin, dir, other.location, BEAM_RADIUS)
            {
                mark_died(other, self.score_decrement);
                kills += 1;
            }
        }
        if kills > 0 {
            if let Some(shooter) = self.players.get_mut(&id) {
                shooter.score += kills;
            }
        }
    }

    /// Marks a tank dead. The killer's score bump happens at the call
    /// site; this only handles the victim's side.
    pub fn tank_died(&mut self, id: u32) {
        if let Some(tank) = self.players.get_mut(&id) {
            mark_died(tank, self.score_decrement);
        }
    }

    /// One tick of world advancement: projectiles move, tanks resolve
    /// disconnects and respawns, counters tick, and the powerup gate runs.
    pub fn advance(&mut self, disconnecting: &[u32]) {
        let proj_ids: Vec<u32> = self.projectiles.keys().copied().collect();
        for id in proj_ids {
            self.move_projectile(id);
        }

        let tank_ids: Vec<u32> = self.players.keys().copied().collect();
        for id in tank_ids {
            if disconnecting.contains(&id) {
                if let Some(tank) = self.players.get_mut(&id) {
                    tank.disconnected = true;
                }
                self.tank_died(id);
                continue;
            }

            let waiting_respawn = self
                .players
                .get(&id)
                .map(|t| (t.hp == 0, t.can_respawn(self.respawn_rate)));
            if let Some((dead, ready)) = waiting_respawn {
                if dead {
                    if ready {
                        self.spawn_tank(id);
                    } else if let Some(tank) = self.players.get_mut(&id) {
                        tank.advance_death_frame(self.respawn_rate);
                    }
                }
            }

            if let Some(tank) = self.players.get_mut(&id) {
                if tank.is_invincible(self.invincibility_frames) {
                    tank.advance_invincibility_frame(self.invincibility_frames);
                }
                tank.advance_fire_frame(self.frames_per_shot);
            }
        }

        if !self.powerups_at_max() {
            if self.powerup_delay == 0 {
                self.spawn_powerup();
            } else {
                self.powerup_delay -= 1;
            }
        }
    }

    /// Post-broadcast cleanup: one-shot flags reset, dead entities purged,
    /// tanks whose disconnect was finalized this tick removed for good.
    pub fn cleanup(&mut self, disconnected: &[u32]) {
        for tank in self.players.values_mut() {
            tank.died = false;
            tank.joined = false;
        }
        self.projectiles.retain(|_, p| !p.died);
        self.powerups.retain(|_, p| !p.died);
        for id in disconnected {
            if self.players.remove(id).is_some() {
                info!("Removed tank {}", id);
            }
        }
    }
}

fn mark_died(tank: &mut Tank, score_decrement: bool) {
    tank.died = true;
    tank.hp = 0;
    if score_decrement {
        tank.score -= 1;
    }
}

fn random_delay(rng: &mut StdRng, max_delay: u32) -> u32 {
    if max_delay == 0 {
        0
    } else {
        rng.gen_range(0..max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WallSpec;
    use shared::Movement;

    fn test_settings() -> Settings {
        Settings {
            world_size: 2000,
            frames_per_shot: 10,
            respawn_rate: 5,
            invincibility_frames: 3,
            max_powerups: 2,
            max_powerup_delay: 100,
            ..Settings::default()
        }
    }

    fn test_world(settings: &Settings) -> World {
        World::with_rng(settings, StdRng::seed_from_u64(7))
    }

    /// Ticks a fresh tank out of its spawn invincibility window.
    fn expire_invincibility(world: &mut World, id: u32) {
        let max = world.invincibility_frames;
        if let Some(tank) = world.players.get_mut(&id) {
            while tank.is_invincible(max) {
                tank.advance_invincibility_frame(max);
            }
        }
    }

    fn place(world: &mut World, id: u32, loc: Vec2) {
        world.players.get_mut(&id).unwrap().location = loc;
    }

    fn command(moving: Movement, fire: FireType, aim: Vec2) -> ControlCommand {
        ControlCommand::new(moving, fire, aim)
    }

    #[test]
    fn test_ray_hits_circle_ahead() {
        let origin = Vec2::new(0.0, 0.0);
        let dir = Vec2::new(1.0, 0.0);
        assert!(ray_intersects_circle(origin, dir, Vec2::new(100.0, 0.0), 30.0));
        assert!(ray_intersects_circle(origin, dir, Vec2::new(100.0, 20.0), 30.0));
    }

    #[test]
    fn test_ray_misses_circle_behind_or_aside() {
        let origin = Vec2::new(0.0, 0.0);
        let dir = Vec2::new(1.0, 0.0);
        // Behind the origin: both roots negative.
        assert!(!ray_intersects_circle(origin, dir, Vec2::new(-100.0, 0.0), 30.0));
        // Off to the side: negative discriminant.
        assert!(!ray_intersects_circle(origin, dir, Vec2::new(100.0, 50.0), 30.0));
        // Origin inside the circle: roots straddle zero, not a hit.
        assert!(!ray_intersects_circle(origin, dir, Vec2::new(5.0, 0.0), 30.0));
    }

    #[test]
    fn test_wall_blocks_tank_and_zeroes_velocity() {
        let mut settings = test_settings();
        settings.walls = vec![WallSpec {
            p1: Vec2::new(100.0, 0.0),
            p2: Vec2::new(100.0, 200.0),
        }];
        let mut world = test_world(&settings);
        world.add_tank(1, "a");
        place(&mut world, 1, Vec2::new(43.0, 100.0));
        world.players.get_mut(&1).unwrap().velocity = Vec2::new(3.0, 0.0);

        world.move_tank(1);

        let tank = &world.players[&1];
        assert_eq!(tank.location, Vec2::new(43.0, 100.0));
        assert_eq!(tank.velocity, Vec2::default());
    }

    #[test]
    fn test_unblocked_tank_moves() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        place(&mut world, 1, Vec2::new(0.0, 0.0));
        world
            .players
            .get_mut(&1)
            .unwrap()
            .change_dir_and_vel(Movement::Right);

        world.move_tank(1);
        assert_eq!(world.players[&1].location, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_wraparound_each_axis() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");

        // Past the right edge: reflected to the far left with an offset.
        place(&mut world, 1, Vec2::new(999.0, 0.0));
        world.players.get_mut(&1).unwrap().velocity = Vec2::new(3.0, 0.0);
        world.move_tank(1);
        assert_eq!(world.players[&1].location, Vec2::new(-997.0, 0.0));

        // The wrapped position must not re-trigger the wrap.
        world.players.get_mut(&1).unwrap().velocity = Vec2::default();
        world.move_tank(1);
        assert_eq!(world.players[&1].location, Vec2::new(-997.0, 0.0));

        // The y axis wraps 5 units inside the edge.
        place(&mut world, 1, Vec2::new(0.0, 994.0));
        world.players.get_mut(&1).unwrap().velocity = Vec2::new(0.0, 3.0);
        world.move_tank(1);
        assert_eq!(world.players[&1].location, Vec2::new(0.0, -992.0));
    }

    #[test]
    fn test_powerup_pickup_increments_ammo() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        place(&mut world, 1, Vec2::new(0.0, 0.0));
        world
            .powerups
            .insert(9, Powerup::new(9, Vec2::new(10.0, 0.0)));

        world.move_tank(1);

        assert_eq!(world.players[&1].powerup_count, 1);
        assert!(world.powerups[&9].died);

        // A consumed powerup cannot be picked up twice.
        world.move_tank(1);
        assert_eq!(world.players[&1].powerup_count, 1);
    }

    #[test]
    fn test_projectile_damages_and_kills() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "shooter");
        world.add_tank(2, "target");
        place(&mut world, 1, Vec2::new(-500.0, 0.0));
        place(&mut world, 2, Vec2::new(0.0, 0.0));
        expire_invincibility(&mut world, 2);
        world.players.get_mut(&2).unwrap().hp = 1;

        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.0)));
        world.move_projectile(0);

        let target = &world.players[&2];
        assert_eq!(target.hp, 0);
        assert!(target.died);
        assert_eq!(world.players[&1].score, 1);
        assert!(world.projectiles[&0].died);
    }

    #[test]
    fn test_invincible_tank_absorbs_projectile() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "shooter");
        world.add_tank(2, "target");
        place(&mut world, 1, Vec2::new(-500.0, 0.0));
        place(&mut world, 2, Vec2::new(0.0, 0.0));

        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.0)));
        world.move_projectile(0);

        // The projectile still dies, but no damage lands.
        assert!(world.projectiles[&0].died);
        assert_eq!(world.players[&2].hp, 3);
        assert_eq!(world.players[&1].score, 0);
    }

    #[test]
    fn test_score_decrement_on_death() {
        let mut settings = test_settings();
        settings.score_decrement = true;
        let mut world = test_world(&settings);
        world.add_tank(1, "shooter");
        world.add_tank(2, "target");
        place(&mut world, 1, Vec2::new(-500.0, 0.0));
        place(&mut world, 2, Vec2::new(0.0, 0.0));
        expire_invincibility(&mut world, 2);
        world.players.get_mut(&2).unwrap().hp = 1;

        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::new(10.0, 0.0), Vec2::new(1.0, 0.0)));
        world.move_projectile(0);

        assert_eq!(world.players[&2].score, -1);
        assert_eq!(world.players[&1].score, 1);
    }

    #[test]
    fn test_projectile_dies_on_wall() {
        let mut settings = test_settings();
        settings.walls = vec![WallSpec {
            p1: Vec2::new(100.0, -100.0),
            p2: Vec2::new(100.0, 100.0),
        }];
        let mut world = test_world(&settings);
        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::new(50.0, 0.0), Vec2::new(1.0, 0.0)));

        world.move_projectile(0);
        assert!(world.projectiles[&0].died);
    }

    #[test]
    fn test_projectile_dies_out_of_bounds() {
        let mut world = test_world(&test_settings());
        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::new(995.0, 0.0), Vec2::new(1.0, 0.0)));

        world.move_projectile(0);
        let proj = &world.projectiles[&0];
        assert!(proj.died);
        // No wrap for projectiles; the position is left as it was.
        assert_eq!(proj.location, Vec2::new(995.0, 0.0));
    }

    #[test]
    fn test_fire_projectile_resets_cooldown() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        let aim = Vec2::new(0.0, -1.0);
        let cmd = command(Movement::None, FireType::Main, aim);
        let mut beams = Vec::new();

        world.apply_command(1, &cmd, &mut beams);
        assert_eq!(world.projectiles.len(), 1);
        assert!(!world.players[&1].can_fire(10));

        // Cooldown not yet recharged, the second shot is swallowed.
        world.apply_command(1, &cmd, &mut beams);
        assert_eq!(world.projectiles.len(), 1);

        for _ in 0..10 {
            world.advance(&[]);
        }
        world.apply_command(1, &cmd, &mut beams);
        assert_eq!(world.projectiles.len(), 2);
    }

    #[test]
    fn test_beam_needs_ammo_and_spends_it() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        let cmd = command(Movement::None, FireType::Alt, Vec2::new(1.0, 0.0));
        let mut beams = Vec::new();

        world.apply_command(1, &cmd, &mut beams);
        assert!(beams.is_empty());

        world.players.get_mut(&1).unwrap().powerup_count = 1;
        world.apply_command(1, &cmd, &mut beams);
        assert_eq!(beams.len(), 1);
        assert_eq!(world.players[&1].powerup_count, 0);
    }

    #[test]
    fn test_beam_multi_kill() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "shooter");
        world.add_tank(2, "first");
        world.add_tank(3, "second");
        place(&mut world, 1, Vec2::new(0.0, 0.0));
        place(&mut world, 2, Vec2::new(200.0, 0.0));
        place(&mut world, 3, Vec2::new(400.0, 10.0));
        expire_invincibility(&mut world, 2);
        expire_invincibility(&mut world, 3);
        world.players.get_mut(&1).unwrap().powerup_count = 1;
        world.players.get_mut(&1).unwrap().aiming = Vec2::new(1.0, 0.0);

        let mut beams = Vec::new();
        world.fire_beam(1, &mut beams);

        assert_eq!(beams.len(), 1);
        assert_eq!(world.players[&1].score, 2);
        assert!(world.players[&2].died);
        assert!(world.players[&3].died);
        assert_eq!(world.players[&2].hp, 0);
    }

    #[test]
    fn test_beam_spares_invincible_tank() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "shooter");
        world.add_tank(2, "fresh");
        place(&mut world, 1, Vec2::new(0.0, 0.0));
        place(&mut world, 2, Vec2::new(200.0, 0.0));
        world.players.get_mut(&1).unwrap().powerup_count = 1;
        world.players.get_mut(&1).unwrap().aiming = Vec2::new(1.0, 0.0);

        let mut beams = Vec::new();
        world.fire_beam(1, &mut beams);

        assert_eq!(world.players[&2].hp, 3);
        assert_eq!(world.players[&1].score, 0);
        // The charge is spent whether or not anything was hit.
        assert_eq!(world.players[&1].powerup_count, 0);
    }

    #[test]
    fn test_dead_tank_ignores_commands() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        let before = world.players[&1].location;
        world.players.get_mut(&1).unwrap().hp = 0;

        let cmd = command(Movement::Right, FireType::Main, Vec2::new(1.0, 0.0));
        let mut beams = Vec::new();
        world.apply_command(1, &cmd, &mut beams);

        assert_eq!(world.players[&1].location, before);
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn test_respawn_after_delay() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        world.tank_died(1);
        assert_eq!(world.players[&1].hp, 0);

        // respawn_rate is 5: the tank stays down for five ticks.
        for _ in 0..5 {
            world.advance(&[]);
            assert_eq!(world.players[&1].hp, 0);
        }
        world.advance(&[]);
        let tank = &world.players[&1];
        assert_eq!(tank.hp, 3);
        assert!(tank.is_invincible(3));
    }

    #[test]
    fn test_disconnect_finalization_and_removal() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        world.add_tank(2, "b");

        world.advance(&[2]);
        let gone = &world.players[&2];
        assert!(gone.disconnected);
        assert!(gone.died);
        assert_eq!(gone.hp, 0);

        world.cleanup(&[2]);
        assert!(!world.players.contains_key(&2));
        assert!(world.players.contains_key(&1));
    }

    #[test]
    fn test_spawn_tank_avoids_walls() {
        // Wall down the middle; every sampled spot must clear it.
        let mut settings = test_settings();
        settings.walls = vec![WallSpec {
            p1: Vec2::new(0.0, -1000.0),
            p2: Vec2::new(0.0, 1000.0),
        }];
        let mut world = test_world(&settings);
        for id in 0..20 {
            world.add_tank(id, "t");
            let loc = world.players[&id].location;
            assert!(loc.x.abs() >= 55.0, "tank {} spawned inside wall", id);
        }
    }

    #[test]
    fn test_spawn_fallback_when_arena_full() {
        // Walls cover the whole arena, so placement must give up.
        let mut settings = test_settings();
        settings.world_size = 100;
        settings.walls = [-40.0, 0.0, 40.0]
            .into_iter()
            .map(|y| WallSpec {
                p1: Vec2::new(-50.0, y),
                p2: Vec2::new(50.0, y),
            })
            .collect();
        let mut world = test_world(&settings);
        world.players.insert(1, Tank::new(1, "stuck", 10));
        assert!(!world.spawn_tank(1));
        assert!(!world.spawn_powerup());
    }

    #[test]
    fn test_powerup_gate_counts_down_then_spawns() {
        let mut settings = test_settings();
        settings.max_powerup_delay = 1;
        let mut world = test_world(&settings);
        // Delay is sampled from [0, 1), i.e. zero: first advance spawns.
        world.advance(&[]);
        assert_eq!(world.powerups.len(), 1);

        world.advance(&[]);
        assert_eq!(world.powerups.len(), 2);

        // max_powerups is 2: the gate stops spawning.
        world.advance(&[]);
        assert_eq!(world.powerups.len(), 2);
    }

    #[test]
    fn test_cleanup_purges_dead_entities_and_died_flags() {
        let mut world = test_world(&test_settings());
        world.add_tank(1, "a");
        world.players.get_mut(&1).unwrap().died = true;
        world
            .projectiles
            .insert(0, Projectile::new(0, 1, Vec2::default(), Vec2::new(1.0, 0.0)));
        world.projectiles.get_mut(&0).unwrap().died = true;
        world.powerups.insert(0, Powerup::new(0, Vec2::default()));
        world.powerups.get_mut(&0).unwrap().died = true;

        world.cleanup(&[]);

        assert!(!world.players[&1].died);
        assert!(!world.players[&1].joined);
        assert!(world.projectiles.is_empty());
        assert!(world.powerups.is_empty());
    }

    #[test]
    fn test_identical_inputs_identical_outcome() {
        // Two worlds with the same seed and the same commands stay in
        // lockstep.
        let settings = test_settings();
        let mut a = World::with_rng(&settings, StdRng::seed_from_u64(42));
        let mut b = World::with_rng(&settings, StdRng::seed_from_u64(42));
        let cmd = command(Movement::Down, FireType::Main, Vec2::new(0.0, 1.0));

        for world in [&mut a, &mut b] {
            world.add_tank(1, "twin");
            let mut beams = Vec::new();
            for _ in 0..50 {
                world.apply_command(1, &cmd, &mut beams);
                world.advance(&[]);
                world.cleanup(&[]);
                beams.clear();
            }
        }

        assert_eq!(a.players[&1].location, b.players[&1].location);
        assert_eq!(a.players[&1].score, b.players[&1].score);
        assert_eq!(a.projectiles.len(), b.projectiles.len());
    }
}
