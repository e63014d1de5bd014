//! Navigable position sampling restricted to one walkable region.

use crate::error::Result;
use crate::prng::Pcg32;
use crate::sim::Simulator;
use crate::types::{RegionId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseSampler {
    region: RegionId,
}

impl PoseSampler {
    pub fn new(region: RegionId) -> Self {
        Self { region }
    }

    /// Sampler over the scene's largest connected walkable region.
    pub fn for_scene<S: Simulator + ?Sized>(sim: &mut S, allow_outdoor: bool) -> Result<Self> {
        Ok(Self::new(sim.largest_walkable_region(allow_outdoor)?))
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    /// Navigable position within `radius` of `center`. May contain NaN
    /// coordinates when the navmesh has no such point.
    pub fn sample_near<S: Simulator + ?Sized>(
        &self,
        sim: &mut S,
        rng: &mut Pcg32,
        center: Vec3,
        radius: f64,
    ) -> Vec3 {
        sim.random_point_near(center, radius, self.region, rng)
    }

    /// Navigable position anywhere in the region. May contain NaN coordinates.
    pub fn sample_anywhere<S: Simulator + ?Sized>(&self, sim: &mut S, rng: &mut Pcg32) -> Vec3 {
        sim.random_point(self.region, rng)
    }
}
