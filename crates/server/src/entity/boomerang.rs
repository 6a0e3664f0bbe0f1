//! Boomerang projectile.

use super::Body;
use glam::Vec2;

/// Flight leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Outbound,
    Returning,
}

const INLINE_HITS: usize = 8;

/// Set of player ids already hit on one leg of a flight.
///
/// Flights rarely touch more than a handful of players, so ids live in a
/// fixed inline array and only spill to the heap past that.
#[derive(Debug, Clone, Default)]
pub struct HitSet {
    inline: [u32; INLINE_HITS],
    len: usize,
    spill: Vec<u32>,
}

impl HitSet {
    pub fn contains(&self, id: u32) -> bool {
        self.inline[..self.len].contains(&id) || self.spill.contains(&id)
    }

    /// Insert `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: u32) -> bool {
        if self.contains(id) {
            return false;
        }
        if self.len < INLINE_HITS {
            self.inline[self.len] = id;
            self.len += 1;
        } else {
            self.spill.push(id);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.len + self.spill.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A thrown boomerang. Always owned by exactly one player.
#[derive(Debug, Clone)]
pub struct Boomerang {
    pub id: u32,
    pub owner_id: u32,
    pub position: Vec2,
    /// Unit direction of travel.
    pub direction: Vec2,
    /// Outbound speed; the return leg multiplies it.
    pub speed: f32,
    pub radius: f32,
    pub phase: Phase,
    /// Distance covered on the outbound leg.
    pub traveled: f32,
    /// Distance covered since turning back.
    pub return_traveled: f32,
    pub spawned_at: f64,
    outbound_hits: HitSet,
    return_hits: HitSet,
}

impl Boomerang {
    pub fn new(
        id: u32,
        owner_id: u32,
        position: Vec2,
        direction: Vec2,
        speed: f32,
        radius: f32,
        now: f64,
    ) -> Self {
        Self {
            id,
            owner_id,
            position,
            direction,
            speed,
            radius,
            phase: Phase::Outbound,
            traveled: 0.0,
            return_traveled: 0.0,
            spawned_at: now,
            outbound_hits: HitSet::default(),
            return_hits: HitSet::default(),
        }
    }

    #[inline]
    pub fn is_returning(&self) -> bool {
        self.phase == Phase::Returning
    }

    /// Flip to the return leg. No-op if already returning.
    pub fn start_return(&mut self) {
        if self.phase == Phase::Outbound {
            self.phase = Phase::Returning;
            self.return_traveled = 0.0;
        }
    }

    /// Returning and already clear of the reversal point.
    #[inline]
    pub fn is_real_return(&self, min_distance: f32) -> bool {
        self.is_returning() && self.return_traveled > min_distance
    }

    /// Whether `target` may still take damage from this flight.
    ///
    /// Each leg hits a target at most once. A target struck on the way out
    /// is only eligible again once the return is real, so an immediate
    /// reversal cannot double-hit it.
    pub fn can_hit(&self, target: u32, real_return_distance: f32) -> bool {
        match self.phase {
            Phase::Outbound => !self.outbound_hits.contains(target),
            Phase::Returning => {
                !self.return_hits.contains(target)
                    && (!self.outbound_hits.contains(target)
                        || self.is_real_return(real_return_distance))
            }
        }
    }

    /// Record a hit on the current leg.
    pub fn record_hit(&mut self, target: u32) {
        match self.phase {
            Phase::Outbound => self.outbound_hits.insert(target),
            Phase::Returning => self.return_hits.insert(target),
        };
    }

    /// Damage dealt by a hit landing now.
    #[inline]
    pub fn damage(&self, outbound: u8, returning: u8, real_return_distance: f32) -> u8 {
        if self.is_real_return(real_return_distance) {
            returning
        } else {
            outbound
        }
    }

    /// Total hits over both legs.
    pub fn hit_count(&self) -> usize {
        self.outbound_hits.len() + self.return_hits.len()
    }
}

impl Body for Boomerang {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}
