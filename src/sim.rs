//! Simulator collaborator interface and the observation gate.
//!
//! The engine never talks to a renderer directly. Everything it needs
//! from the scene (navmesh draws, agent placement, one-step observations,
//! episode iteration) goes through [`Simulator`], so search and assembly
//! run unchanged against a scripted mock.

use std::collections::HashMap;

use crate::error::Result;
use crate::prng::Pcg32;
use crate::types::{BoundingBox, CandidatePose, EpisodeInfo, RegionId, Vec3};

/// Raw image as captured from a sensor; row-major, 8 bits per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel: 1 (gray), 3 (RGB) or 4 (RGBA).
    pub channels: u8,
    pub data: Vec<u8>,
}

/// One channel of a multi-sensor observation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelData {
    Image(ImageFrame),
    /// Per-target boxes, in episode target order.
    BoundingBoxes(Vec<BoundingBox>),
    /// Flat numeric sensor reading (e.g. localization).
    Vector(Vec<f64>),
}

/// Channel name → data, as returned by one simulator step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub channels: HashMap<String, ChannelData>,
}

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, data: ChannelData) -> Self {
        self.channels.insert(name.into(), data);
        self
    }

    pub fn image(&self, name: &str) -> Option<&ImageFrame> {
        match self.channels.get(name) {
            Some(ChannelData::Image(frame)) => Some(frame),
            _ => None,
        }
    }

    /// All boxes in a bounding-box channel; `None` if the channel is absent.
    pub fn boxes(&self, name: &str) -> Option<&[BoundingBox]> {
        match self.channels.get(name) {
            Some(ChannelData::BoundingBoxes(b)) => Some(b),
            _ => None,
        }
    }

    /// Box for the target at `index` in a bounding-box channel.
    pub fn target_box(&self, name: &str, index: usize) -> Option<BoundingBox> {
        self.boxes(name).and_then(|b| b.get(index)).copied()
    }

    pub fn vector(&self, name: &str) -> Option<&[f64]> {
        match self.channels.get(name) {
            Some(ChannelData::Vector(v)) => Some(v),
            _ => None,
        }
    }
}

/// The stateful 3D scene the engine drives.
///
/// Navmesh draws take the run's PRNG so a fixed seed reproduces the same
/// positions. They never fail: an empty region or unreachable center
/// yields a position with NaN coordinates, which callers treat as a
/// rejected candidate.
pub trait Simulator {
    /// Advance to the next episode, or `None` when the dataset is exhausted.
    fn next_episode(&mut self) -> Result<Option<EpisodeInfo>>;

    /// World position of a scene object in the current episode.
    fn resolve_object_position(&self, handle: &str) -> Option<Vec3>;

    fn largest_walkable_region(&mut self, allow_outdoor: bool) -> Result<RegionId>;

    fn random_point_near(
        &mut self,
        center: Vec3,
        radius: f64,
        region: RegionId,
        rng: &mut Pcg32,
    ) -> Vec3;

    fn random_point(&mut self, region: RegionId, rng: &mut Pcg32) -> Vec3;

    /// Teleport the agent base; `yaw` is radians about +y.
    fn set_agent_pose(&mut self, position: Vec3, yaw: f64) -> Result<()>;

    /// Advance exactly one step with the no-op action.
    fn step_noop(&mut self) -> Result<Observation>;

    fn set_episode_over(&mut self, over: bool);
}

/// Place the agent at `pose`, step once, and return what it sees.
///
/// A teleport is not a terminal transition, so the episode is forced
/// back to active after the step.
pub fn observe<S: Simulator + ?Sized>(sim: &mut S, pose: &CandidatePose) -> Result<Observation> {
    let yaw = pose.rotation.yaw()?;
    sim.set_agent_pose(pose.position, yaw)?;
    let obs = sim.step_noop();
    sim.set_episode_over(false);
    obs
}
