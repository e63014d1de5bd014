//! Scripted simulator for unit tests.

use std::collections::{HashMap, VecDeque};

use crate::error::{EngineError, Result};
use crate::prng::Pcg32;
use crate::sim::{ChannelData, ImageFrame, Observation, Simulator};
use crate::types::{BoundingBox, EpisodeInfo, RegionId, Vec3};

pub(crate) const REC: &str = "rec_bounding_box";
pub(crate) const TARGET: &str = "target_bounding_box";

type ObserveFn = Box<dyn FnMut(&Vec3, f64, usize) -> Observation>;

/// Box with the given apparent area (width = area, height = 1).
pub(crate) fn box_of_area(area: f64) -> BoundingBox {
    BoundingBox::new(0.0, 0.0, area, 1.0)
}

/// Observation for a two-target episode: both rec boxes share one area,
/// both target boxes the other.
pub(crate) fn obs_with_areas(rec_area: f64, target_area: f64) -> Observation {
    Observation::new()
        .with(REC, ChannelData::BoundingBoxes(vec![box_of_area(rec_area); 2]))
        .with(TARGET, ChannelData::BoundingBoxes(vec![box_of_area(target_area); 2]))
}

pub(crate) fn rgb_frame() -> ImageFrame {
    ImageFrame { width: 2, height: 2, channels: 3, data: vec![128; 12] }
}

pub(crate) struct MockSim {
    pub episodes: VecDeque<EpisodeInfo>,
    pub objects: HashMap<String, Vec3>,
    pub region: RegionId,
    /// Scripted answers for `random_point_near`; random ring points once drained.
    pub near_points: VecDeque<Vec3>,
    /// Scripted answers for `random_point`; uniform in ±20 once drained.
    pub anywhere_points: VecDeque<Vec3>,
    pub observe_fn: ObserveFn,
    /// Step index (0-based) at which `step_noop` starts failing.
    pub fail_from_step: Option<usize>,
    /// `next_episode` errors instead of returning `None` once drained.
    pub fail_when_drained: bool,
    pub poses: Vec<(Vec3, f64)>,
    pub near_radii: Vec<f64>,
    pub steps: usize,
    pub episode_over: bool,
    pub outdoor_requests: Vec<bool>,
}

impl MockSim {
    pub fn new() -> Self {
        Self {
            episodes: VecDeque::new(),
            objects: HashMap::new(),
            region: RegionId(0),
            near_points: VecDeque::new(),
            anywhere_points: VecDeque::new(),
            observe_fn: Box::new(|_, _, _| Observation::new()),
            fail_from_step: None,
            fail_when_drained: false,
            poses: Vec::new(),
            near_radii: Vec::new(),
            steps: 0,
            episode_over: false,
            outdoor_requests: Vec::new(),
        }
    }

    pub fn observing(mut self, f: impl FnMut(&Vec3, f64, usize) -> Observation + 'static) -> Self {
        self.observe_fn = Box::new(f);
        self
    }
}

impl Simulator for MockSim {
    fn next_episode(&mut self) -> Result<Option<EpisodeInfo>> {
        let next = self.episodes.pop_front();
        if next.is_some() {
            self.episode_over = false;
        } else if self.fail_when_drained {
            return Err(EngineError::Simulator("episode iterator failed".into()));
        }
        Ok(next)
    }

    fn resolve_object_position(&self, handle: &str) -> Option<Vec3> {
        self.objects.get(handle).copied()
    }

    fn largest_walkable_region(&mut self, allow_outdoor: bool) -> Result<RegionId> {
        self.outdoor_requests.push(allow_outdoor);
        Ok(self.region)
    }

    fn random_point_near(
        &mut self,
        center: Vec3,
        radius: f64,
        _region: RegionId,
        rng: &mut Pcg32,
    ) -> Vec3 {
        self.near_radii.push(radius);
        if let Some(p) = self.near_points.pop_front() {
            return p;
        }
        let a = rng.next_angle();
        let r = rng.next_float() * radius;
        [center[0] + r * a.cos(), center[1], center[2] + r * a.sin()]
    }

    fn random_point(&mut self, _region: RegionId, rng: &mut Pcg32) -> Vec3 {
        if let Some(p) = self.anywhere_points.pop_front() {
            return p;
        }
        [rng.next_range(-20.0, 20.0), 0.0, rng.next_range(-20.0, 20.0)]
    }

    fn set_agent_pose(&mut self, position: Vec3, yaw: f64) -> Result<()> {
        self.poses.push((position, yaw));
        Ok(())
    }

    fn step_noop(&mut self) -> Result<Observation> {
        let step = self.steps;
        self.steps += 1;
        // Stepping may end the episode; the gate must undo that.
        self.episode_over = true;
        if matches!(self.fail_from_step, Some(n) if step >= n) {
            return Err(EngineError::Simulator(format!("step {step} failed")));
        }
        let (pos, yaw) = self.poses.last().copied().unwrap_or(([0.0; 3], 0.0));
        Ok((self.observe_fn)(&pos, yaw, step))
    }

    fn set_episode_over(&mut self, over: bool) {
        self.episode_over = over;
    }
}
