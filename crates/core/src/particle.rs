//! Advected particles with bounded lifetime and in-place respawn.
//!
//! Each tick a particle ages by one, asks its [`Steering`] policy for a new
//! heading, moves `speed` pixels along it and is handed to the caller's
//! visitor (to draw a trail or stamp a density map). A particle that has
//! outlived `max_age` or left the bounds plus margin is then reset in place:
//! the particle array never grows or shrinks after construction.

use std::f64::consts::TAU;

use glam::DVec2;

use crate::analysis::EdgeMap;
use crate::noise::{Fbm, NoiseField};
use crate::prng::Xorshift64;

/// A single simulated particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: DVec2,
    /// Position before the most recent tick. Equal to `pos` right after a respawn.
    pub prev: DVec2,
    /// Heading in radians.
    pub heading: f64,
    /// Pixels moved per tick.
    pub speed: f64,
    /// Ticks since the last spawn.
    pub age: u32,
    /// Age beyond which the particle expires. Infinite for immortal particles.
    pub max_age: f64,
    /// Free per-particle attribute in [0, 1) for renderers (hue offset, phase).
    pub phase: f64,
    /// False when the steering policy held the particle in place this tick.
    pub moved: bool,
}

/// Lifecycle stage of a particle relative to some bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifePhase {
    /// Freshly spawned, not yet moved.
    Seeded,
    Active,
    /// Too old or out of bounds; will be respawned at the end of the tick.
    Expired,
}

impl Particle {
    pub fn phase_in(&self, bounds: &Bounds) -> LifePhase {
        if self.age as f64 > self.max_age || !bounds.contains(self.pos) {
            LifePhase::Expired
        } else if self.age == 0 {
            LifePhase::Seeded
        } else {
            LifePhase::Active
        }
    }

    /// `age / max_age`, 0 for immortal particles.
    pub fn life_fraction(&self) -> f64 {
        if self.max_age.is_finite() && self.max_age > 0.0 {
            self.age as f64 / self.max_age
        } else {
            0.0
        }
    }
}

/// Simulation area: `[-margin, width + margin] x [-margin, height + margin]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64, margin: f64) -> Self {
        Self {
            width,
            height,
            margin,
        }
    }

    /// Edges inclusive.
    pub fn contains(&self, pos: DVec2) -> bool {
        pos.x >= -self.margin
            && pos.x <= self.width + self.margin
            && pos.y >= -self.margin
            && pos.y <= self.height + self.margin
    }
}

/// Heading policy applied to every particle each tick.
pub trait Steering {
    /// New heading for `particle`, or `None` to leave it where it is this tick.
    fn steer(&mut self, particle: &Particle, frame: u64, rng: &mut Xorshift64) -> Option<f64>;
}

/// Pure noise-field advection:
/// `heading = fbm(pos * scale + frame * drift) * 2π * harmonic`.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFlow {
    pub noise: NoiseField,
    pub fbm: Fbm,
    pub seed: i32,
    pub scale: f64,
    /// Per-frame offset added to the scaled sample coordinate.
    pub drift: DVec2,
    pub harmonic: f64,
}

impl NoiseFlow {
    pub fn new(scale: f64) -> Self {
        Self {
            noise: NoiseField::new(),
            fbm: Fbm::default(),
            seed: 0,
            scale,
            drift: DVec2::ZERO,
            harmonic: 2.0,
        }
    }

    pub fn with_drift(mut self, drift: DVec2) -> Self {
        self.drift = drift;
        self
    }

    pub fn heading_at(&self, pos: DVec2, frame: u64) -> f64 {
        let t = frame as f64;
        let v = self.noise.fbm(
            pos.x * self.scale + t * self.drift.x,
            pos.y * self.scale + t * self.drift.y,
            self.seed,
            &self.fbm,
        );
        v * TAU * self.harmonic
    }
}

impl Steering for NoiseFlow {
    fn steer(&mut self, particle: &Particle, frame: u64, _rng: &mut Xorshift64) -> Option<f64> {
        Some(self.heading_at(particle.pos, frame))
    }
}

/// Edge-seeking walk over a precomputed [`EdgeMap`].
///
/// On a strong edge the particle probes headings within `±spread` of its
/// current heading, `lookahead` pixels ahead, and turns toward the strongest
/// response with a little jitter. Elsewhere it wanders randomly. Particles
/// outside the map are held in place.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSeeking {
    edges: EdgeMap,
    /// Edge strength above which the particle follows edges.
    pub follow_threshold: f64,
    pub lookahead: f64,
    pub spread: f64,
    pub probe_step: f64,
    /// Width of the uniform jitter added after a successful probe.
    pub jitter: f64,
    /// Width of the uniform turn applied off-edge.
    pub wander: f64,
}

impl EdgeSeeking {
    pub fn new(edges: EdgeMap) -> Self {
        Self {
            edges,
            follow_threshold: 50.0,
            lookahead: 4.0,
            spread: 0.5,
            probe_step: 0.25,
            jitter: 0.2,
            wander: 0.8,
        }
    }

    pub fn edges(&self) -> &EdgeMap {
        &self.edges
    }

    fn in_map(&self, pos: DVec2) -> bool {
        pos.x >= 0.0
            && pos.y >= 0.0
            && pos.x < self.edges.width() as f64
            && pos.y < self.edges.height() as f64
    }

    /// Heading toward the strongest edge among the probes, or `heading` if none respond.
    fn best_probe(&self, pos: DVec2, heading: f64) -> f64 {
        let probes = (2.0 * self.spread / self.probe_step.max(1e-6)).round() as i32;
        let mut best_angle = heading;
        let mut best_edge = 0.0;
        for k in 0..=probes {
            let angle = heading - self.spread + k as f64 * self.probe_step;
            let probe = (pos + DVec2::new(angle.cos(), angle.sin()) * self.lookahead).floor();
            if !self.in_map(probe) {
                continue;
            }
            let e = self.edges.strength_at(probe);
            if e > best_edge {
                best_edge = e;
                best_angle = angle;
            }
        }
        best_angle
    }
}

impl Steering for EdgeSeeking {
    fn steer(&mut self, particle: &Particle, _frame: u64, rng: &mut Xorshift64) -> Option<f64> {
        let pos = particle.pos.floor();
        if !self.in_map(pos) {
            return None;
        }
        let heading = if self.edges.strength_at(pos) > self.follow_threshold {
            self.best_probe(particle.pos, particle.heading) + (rng.next_f64() - 0.5) * self.jitter
        } else {
            particle.heading + (rng.next_f64() - 0.5) * self.wander
        };
        Some(heading)
    }
}

/// Where particles are (re)spawned.
#[derive(Debug, Clone, PartialEq)]
pub enum Spawner {
    /// Uniform over `[0, width) x [0, height)`.
    Uniform,
    /// Uniformly chosen from a non-empty list of points.
    Points(Vec<DVec2>),
}

impl Spawner {
    /// Spawns on `points`, or uniformly when the set is empty.
    pub fn from_points(points: Vec<DVec2>) -> Self {
        if points.is_empty() {
            tracing::warn!("empty sample set for particle seeding, falling back to uniform");
            Spawner::Uniform
        } else {
            Spawner::Points(points)
        }
    }

    pub fn spawn(&self, rng: &mut Xorshift64, width: f64, height: f64) -> DVec2 {
        match self {
            Spawner::Points(points) => {
                if let Some(&p) = rng.pick(points) {
                    return p;
                }
                DVec2::new(rng.next_f64() * width, rng.next_f64() * height)
            }
            Spawner::Uniform => DVec2::new(rng.next_f64() * width, rng.next_f64() * height),
        }
    }
}

/// Population parameters for a [`ParticleSystem`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    pub count: usize,
    pub bounds: Bounds,
    /// Speed drawn uniformly from `[min, max)` at each spawn.
    pub speed: (f64, f64),
    /// Lifetime drawn uniformly from `[min, max)`, or `None` for immortal particles.
    pub lifetime: Option<(f64, f64)>,
}

/// Fixed-size particle population driven by one steering policy.
#[derive(Debug, Clone)]
pub struct ParticleSystem<S> {
    particles: Vec<Particle>,
    steering: S,
    spawner: Spawner,
    config: SwarmConfig,
    rng: Xorshift64,
    frame: u64,
}

impl<S: Steering> ParticleSystem<S> {
    pub fn new(config: SwarmConfig, steering: S, spawner: Spawner, mut rng: Xorshift64) -> Self {
        let particles = (0..config.count)
            .map(|_| spawn_particle(&config, &spawner, &mut rng))
            .collect();
        Self {
            particles,
            steering,
            spawner,
            config,
            rng,
            frame: 0,
        }
    }

    /// Advances every particle one tick, calling `visit` after each move and
    /// before expired particles are respawned.
    pub fn step(&mut self, mut visit: impl FnMut(&Particle)) {
        let frame = self.frame;
        for i in 0..self.particles.len() {
            let p = &mut self.particles[i];
            p.age = p.age.saturating_add(1);
            p.prev = p.pos;
            match self.steering.steer(p, frame, &mut self.rng) {
                Some(heading) => {
                    p.heading = heading;
                    p.pos += DVec2::new(heading.cos(), heading.sin()) * p.speed;
                    p.moved = true;
                }
                None => p.moved = false,
            }
            visit(p);
            if p.phase_in(&self.config.bounds) == LifePhase::Expired {
                *p = spawn_particle(&self.config, &self.spawner, &mut self.rng);
            }
        }
        self.frame += 1;
        tracing::trace!(frame, particles = self.particles.len(), "particle step");
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn steering(&self) -> &S {
        &self.steering
    }

    pub fn steering_mut(&mut self) -> &mut S {
        &mut self.steering
    }

    pub fn bounds(&self) -> &Bounds {
        &self.config.bounds
    }

    /// Number of completed ticks.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

fn spawn_particle(config: &SwarmConfig, spawner: &Spawner, rng: &mut Xorshift64) -> Particle {
    let pos = spawner.spawn(rng, config.bounds.width, config.bounds.height);
    let heading = rng.next_angle();
    let speed = rng.next_range(config.speed.0, config.speed.1);
    let max_age = match config.lifetime {
        Some((lo, hi)) => rng.next_range(lo, hi),
        None => f64::INFINITY,
    };
    Particle {
        pos,
        prev: pos,
        heading,
        speed,
        age: 0,
        max_age,
        phase: rng.next_f64(),
        moved: false,
    }
}
