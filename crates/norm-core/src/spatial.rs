//! Proximity
//!
//! The only thing the core needs from the motion subsystem is a distance
//! between two agents. `Arena` is a small stand-in: static scatter plus a
//! bounded random walk per step.

use rand::rngs::SmallRng;
use rand::Rng;
use std::collections::BTreeMap;

use norm_events::AgentId;

use crate::config::ArenaConfig;

/// Offspring land within this distance of their parent
const BIRTH_SCATTER: f32 = 10.0;

/// Distance oracle between agents, plus lifecycle hooks
pub trait Proximity {
    /// `None` when either agent is unknown
    fn distance(&self, a: AgentId, b: AgentId) -> Option<f32>;

    /// Unknown agents are never within range
    fn within(&self, a: AgentId, b: AgentId, threshold: f32) -> bool {
        self.distance(a, b).map_or(false, |d| d <= threshold)
    }

    /// A new agent entered the population
    fn place(&mut self, _agent: AgentId, _parent: Option<AgentId>, _rng: &mut SmallRng) {}

    /// An agent left the population
    fn remove(&mut self, _agent: AgentId) {}

    /// One enforcement step elapsed
    fn advance(&mut self, _rng: &mut SmallRng) {}
}

/// Wraps a distance function as a static proximity source
pub struct FnProximity<F>(pub F);

impl<F> FnProximity<F>
where
    F: Fn(AgentId, AgentId) -> Option<f32>,
{
    pub fn new(distance: F) -> Self {
        Self(distance)
    }
}

impl<F> Proximity for FnProximity<F>
where
    F: Fn(AgentId, AgentId) -> Option<f32>,
{
    fn distance(&self, a: AgentId, b: AgentId) -> Option<f32> {
        (self.0)(a, b)
    }
}

/// Bounded rectangle with one point per agent
#[derive(Debug, Clone)]
pub struct Arena {
    width: f32,
    height: f32,
    wander: f32,
    positions: BTreeMap<AgentId, (f32, f32)>,
}

impl Arena {
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            wander: config.wander,
            positions: BTreeMap::new(),
        }
    }

    pub fn position(&self, agent: AgentId) -> Option<(f32, f32)> {
        self.positions.get(&agent).copied()
    }

    pub fn set_position(&mut self, agent: AgentId, x: f32, y: f32) {
        let clamped = self.clamp(x, y);
        self.positions.insert(agent, clamped);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }
}

impl Proximity for Arena {
    fn distance(&self, a: AgentId, b: AgentId) -> Option<f32> {
        let (ax, ay) = self.positions.get(&a)?;
        let (bx, by) = self.positions.get(&b)?;
        Some(((ax - bx).powi(2) + (ay - by).powi(2)).sqrt())
    }

    fn place(&mut self, agent: AgentId, parent: Option<AgentId>, rng: &mut SmallRng) {
        let (x, y) = match parent.and_then(|p| self.position(p)) {
            Some((px, py)) => (
                px + rng.gen_range(-BIRTH_SCATTER..=BIRTH_SCATTER),
                py + rng.gen_range(-BIRTH_SCATTER..=BIRTH_SCATTER),
            ),
            None => (rng.gen_range(0.0..=self.width), rng.gen_range(0.0..=self.height)),
        };
        self.set_position(agent, x, y);
    }

    fn remove(&mut self, agent: AgentId) {
        self.positions.remove(&agent);
    }

    fn advance(&mut self, rng: &mut SmallRng) {
        if self.wander <= 0.0 {
            return;
        }
        let (width, height, wander) = (self.width, self.height, self.wander);
        for (x, y) in self.positions.values_mut() {
            *x = (*x + rng.gen_range(-wander..=wander)).clamp(0.0, width);
            *y = (*y + rng.gen_range(-wander..=wander)).clamp(0.0, height);
        }
    }
}
