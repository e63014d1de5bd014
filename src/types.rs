//! Data types for viewpoint graphs, run configuration, and the manifest.
//!
//! Config and manifest structs derive Serialize + Deserialize so they
//! round-trip through the JSON files a run reads and writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::orientation::Rotation;

// -- Geometry ------------------------------------------------------

/// World-space position (x, y, z); y is up.
pub type Vec3 = [f64; 3];

/// True if any coordinate is NaN. Navmesh queries signal failure this way.
pub fn has_undefined(p: &Vec3) -> bool {
    p.iter().any(|c| c.is_nan())
}

/// Euclidean distance in the horizontal (x-z) plane.
pub fn xz_distance(a: &Vec3, b: &Vec3) -> f64 {
    let dx = a[0] - b[0];
    let dz = a[2] - b[2];
    (dx * dx + dz * dz).sqrt()
}

/// Screen-space box of a tracked object: (x, y, width, height) in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Apparent size: width × height.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn is_defined(&self) -> bool {
        !(self.x.is_nan() || self.y.is_nan() || self.width.is_nan() || self.height.is_nan())
    }
}

/// Connected walkable region ("island") of a navmesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub i32);

// -- Episodes / targets --------------------------------------------

/// Episode identifier as the dataset spells it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpisodeId {
    Int(i64),
    Name(String),
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpisodeId::Int(n) => write!(f, "{n}"),
            EpisodeId::Name(s) => f.write_str(s),
        }
    }
}

/// A rearrangement target as the episode lists it, before its scene
/// object has been looked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub handle: String,
    pub goal_position: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_receptacle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_receptacle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeInfo {
    pub episode_id: EpisodeId,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

/// A target whose scene object resolved; read-only for the episode.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticTarget {
    /// Position of the target in the episode's target list. Also the
    /// index of its box in the tracked bounding-box channels.
    pub index: usize,
    pub handle: String,
    pub start: Vec3,
    pub goal: Vec3,
    pub start_receptacle: Option<String>,
    pub goal_receptacle: Option<String>,
}

// -- Viewpoints ----------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePose {
    pub position: Vec3,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTag {
    NearStart,
    NearGoal,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRef {
    pub index: usize,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receptacle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub tag: AnnotationTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRef>,
}

impl Annotation {
    pub fn near_start(target: &SemanticTarget) -> Self {
        Self {
            tag: AnnotationTag::NearStart,
            target: Some(TargetRef {
                index: target.index,
                handle: target.handle.clone(),
                receptacle: target.start_receptacle.clone(),
            }),
        }
    }

    pub fn near_goal(target: &SemanticTarget) -> Self {
        Self {
            tag: AnnotationTag::NearGoal,
            target: Some(TargetRef {
                index: target.index,
                handle: target.handle.clone(),
                receptacle: target.goal_receptacle.clone(),
            }),
        }
    }

    pub fn fill() -> Self {
        Self { tag: AnnotationTag::Fill, target: None }
    }
}

/// How a viewpoint came to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceSource {
    /// Passed every constraint.
    Constrained,
    /// Budget ran out; the last candidate was kept as-is.
    Fallback,
    /// Unconstrained fill that passed separation and salience checks.
    RandomFill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewpoint {
    pub position: Vec3,
    pub rotation: Rotation,
    pub annotation: Annotation,
    pub source: AcceptanceSource,
}

impl Viewpoint {
    pub fn is_targeted(&self) -> bool {
        self.annotation.tag != AnnotationTag::Fill
    }
}

/// Viewpoints of one episode in insertion order: targeted pairs, then fill.
#[derive(Debug, Clone)]
pub struct EpisodeGraph {
    episode_id: EpisodeId,
    targets: Vec<SemanticTarget>,
    viewpoints: Vec<Viewpoint>,
    skipped_targets: Vec<String>,
    complete: bool,
}

impl EpisodeGraph {
    pub fn new(episode_id: EpisodeId) -> Self {
        Self {
            episode_id,
            targets: Vec::new(),
            viewpoints: Vec::new(),
            skipped_targets: Vec::new(),
            complete: false,
        }
    }

    pub fn episode_id(&self) -> &EpisodeId {
        &self.episode_id
    }

    pub fn targets(&self) -> &[SemanticTarget] {
        &self.targets
    }

    pub fn viewpoints(&self) -> &[Viewpoint] {
        &self.viewpoints
    }

    /// Handles of targets whose scene object could not be resolved.
    pub fn skipped_targets(&self) -> &[String] {
        &self.skipped_targets
    }

    /// False when generation stopped early on a simulator error.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn len(&self) -> usize {
        self.viewpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewpoints.is_empty()
    }

    /// Positions of targeted viewpoints. Undefined fallback positions are
    /// left out since nothing can be measured against them.
    pub fn targeted_positions(&self) -> Vec<Vec3> {
        self.viewpoints
            .iter()
            .filter(|v| v.is_targeted() && !has_undefined(&v.position))
            .map(|v| v.position)
            .collect()
    }

    pub(crate) fn push_target(&mut self, target: SemanticTarget) {
        self.targets.push(target);
    }

    pub(crate) fn push_skipped(&mut self, handle: String) {
        self.skipped_targets.push(handle);
    }

    pub(crate) fn push(&mut self, viewpoint: Viewpoint) {
        self.viewpoints.push(viewpoint);
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }
}

// -- Configuration -------------------------------------------------

fn default_bbox_min() -> f64 {
    2700.0
}
fn default_bbox_max() -> f64 {
    4500.0
}
fn default_dist_to_target() -> f64 {
    6.0
}
fn default_radius_step() -> f64 {
    0.1
}
fn default_max_trials() -> u32 {
    60
}
fn default_min_images() -> usize {
    12
}
fn default_min_point_dis() -> f64 {
    3.2
}
fn default_random_min_bbox() -> f64 {
    400.0
}
fn default_max_fill_trials() -> u32 {
    500
}

/// Numeric constraints on viewpoint placement; fixed for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// Exclusive lower bound on tracked box area for targeted viewpoints.
    #[serde(default = "default_bbox_min")]
    pub bbox_min: f64,
    /// Exclusive upper bound on tracked box area for targeted viewpoints.
    #[serde(default = "default_bbox_max")]
    pub bbox_max: f64,
    /// Initial search radius around a target position.
    #[serde(default = "default_dist_to_target")]
    pub dist_to_target: f64,
    /// Radius growth after each rejected trial.
    #[serde(default = "default_radius_step")]
    pub radius_step: f64,
    #[serde(default = "default_max_trials")]
    pub max_trials: u32,
    /// Minimum number of viewpoints per episode.
    #[serde(default = "default_min_images")]
    pub min_images: usize,
    /// Minimum x-z distance from a fill viewpoint to every targeted one.
    #[serde(default = "default_min_point_dis")]
    pub min_point_dis: f64,
    /// Fill viewpoints must see every tracked box below this area.
    #[serde(default = "default_random_min_bbox")]
    pub random_min_bbox: f64,
    /// Candidates drawn per missing fill slot before giving up on it.
    #[serde(default = "default_max_fill_trials")]
    pub max_fill_trials: u32,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            bbox_min: 2700.0,
            bbox_max: 4500.0,
            dist_to_target: 6.0,
            radius_step: 0.1,
            max_trials: 60,
            min_images: 12,
            min_point_dis: 3.2,
            random_min_bbox: 400.0,
            max_fill_trials: 500,
        }
    }
}

impl ConstraintConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("bbox_min", self.bbox_min),
            ("bbox_max", self.bbox_max),
            ("dist_to_target", self.dist_to_target),
            ("radius_step", self.radius_step),
            ("min_point_dis", self.min_point_dis),
            ("random_min_bbox", self.random_min_bbox),
        ];
        for (name, value) in positive {
            // Also rejects NaN.
            if !(value > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be > 0, got {value}"
                )));
            }
        }
        if self.bbox_min >= self.bbox_max {
            return Err(EngineError::InvalidConfig(format!(
                "bbox_min ({}) must be below bbox_max ({})",
                self.bbox_min, self.bbox_max
            )));
        }
        if self.max_trials == 0 {
            return Err(EngineError::InvalidConfig("max_trials must be > 0".into()));
        }
        if self.max_fill_trials == 0 {
            return Err(EngineError::InvalidConfig("max_fill_trials must be > 0".into()));
        }
        if self.min_images == 0 {
            return Err(EngineError::InvalidConfig("min_images must be > 0".into()));
        }
        Ok(())
    }
}

fn default_seed() -> u64 {
    42
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("data/sparse_slam/rearrange/hssd")
}
fn default_obs_keys() -> Vec<String> {
    vec!["head_rgb".to_string()]
}
fn default_true() -> bool {
    true
}
fn default_start_bbox_channel() -> String {
    "rec_bounding_box".to_string()
}
fn default_goal_bbox_channel() -> String {
    "target_bounding_box".to_string()
}
fn default_localization_channel() -> Option<String> {
    Some("localization_sensor".to_string())
}

/// Everything a dataset run needs apart from the simulator itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Image channels persisted for every viewpoint.
    #[serde(default = "default_obs_keys")]
    pub obs_keys: Vec<String>,
    #[serde(default)]
    pub constraints: ConstraintConfig,
    /// Let the walkable region include cells flagged as outdoor.
    #[serde(default = "default_true")]
    pub allow_outdoor: bool,
    #[serde(default = "default_start_bbox_channel")]
    pub start_bbox_channel: String,
    #[serde(default = "default_goal_bbox_channel")]
    pub goal_bbox_channel: String,
    #[serde(default = "default_localization_channel")]
    pub localization_channel: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            output_dir: default_output_dir(),
            obs_keys: default_obs_keys(),
            constraints: ConstraintConfig::default(),
            allow_outdoor: true,
            start_bbox_channel: default_start_bbox_channel(),
            goal_bbox_channel: default_goal_bbox_channel(),
            localization_channel: default_localization_channel(),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.constraints.validate()?;
        if self.start_bbox_channel.is_empty() || self.goal_bbox_channel.is_empty() {
            return Err(EngineError::InvalidConfig(
                "bounding-box channel names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// -- Manifest ------------------------------------------------------

/// One persisted viewpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    pub episode_id: EpisodeId,
    pub obs_files: Vec<String>,
    pub position: Vec3,
    pub rotation: Rotation,
    pub annotation: Annotation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localization_sensor: Option<Vec<f64>>,
}

// -- Tests ---------------------------------------------------------
