//! Criterion benchmarks for viewpoint search and episode assembly.
//!
//! Run with: `cargo bench`
//!
//! The simulator here is synthetic: a flat square navmesh and a box area
//! that falls off with the square of the distance to the nearest target,
//! so the engine's own bookkeeping dominates the measurement.

use criterion::{criterion_group, criterion_main, Criterion};
use viewgraph_engine::assemble::assemble_episode;
use viewgraph_engine::prng::Pcg32;
use viewgraph_engine::sampler::PoseSampler;
use viewgraph_engine::search::{search_near, SearchTarget};
use viewgraph_engine::types::{
    xz_distance, BoundingBox, EpisodeId, EpisodeInfo, RegionId, RunConfig, TargetSpec, Vec3,
};
use viewgraph_engine::{ChannelData, Observation, Result, Simulator};

const HALF_EXTENT: f64 = 25.0;
/// Box area seen from one unit away.
const AREA_AT_UNIT: f64 = 120_000.0;

const CONFIG_JSON: &str = r#"{
  "seed": 42,
  "constraints": {
    "bbox_min": 2700,
    "bbox_max": 4500,
    "dist_to_target": 6.0,
    "max_trials": 60,
    "min_images": 12,
    "min_point_dis": 3.2,
    "random_min_bbox": 400
  }
}"#;

struct FlatScene {
    objects: Vec<(String, Vec3)>,
    agent: Vec3,
}

impl FlatScene {
    fn new() -> Self {
        Self {
            objects: vec![
                ("cup_0".into(), [-6.0, 0.0, 4.0]),
                ("bowl_1".into(), [8.0, 0.0, -3.0]),
            ],
            agent: [0.0; 3],
        }
    }

    fn area_for(&self, target: Vec3) -> f64 {
        let d = xz_distance(&self.agent, &target).max(0.5);
        AREA_AT_UNIT / (d * d)
    }

    fn boxes_for(&self, points: &[Vec3]) -> ChannelData {
        ChannelData::BoundingBoxes(
            points
                .iter()
                .map(|p| {
                    let side = self.area_for(*p).sqrt();
                    BoundingBox::new(0.0, 0.0, side, side)
                })
                .collect(),
        )
    }
}

impl Simulator for FlatScene {
    fn next_episode(&mut self) -> Result<Option<EpisodeInfo>> {
        Ok(None)
    }

    fn resolve_object_position(&self, handle: &str) -> Option<Vec3> {
        self.objects.iter().find(|(h, _)| h == handle).map(|(_, p)| *p)
    }

    fn largest_walkable_region(&mut self, _allow_outdoor: bool) -> Result<RegionId> {
        Ok(RegionId(0))
    }

    fn random_point_near(
        &mut self,
        center: Vec3,
        radius: f64,
        _region: RegionId,
        rng: &mut Pcg32,
    ) -> Vec3 {
        let a = rng.next_angle();
        let r = rng.next_float() * radius;
        let x = center[0] + r * a.cos();
        let z = center[2] + r * a.sin();
        if x.abs() > HALF_EXTENT || z.abs() > HALF_EXTENT {
            return [f64::NAN; 3];
        }
        [x, 0.0, z]
    }

    fn random_point(&mut self, _region: RegionId, rng: &mut Pcg32) -> Vec3 {
        [
            rng.next_range(-HALF_EXTENT, HALF_EXTENT),
            0.0,
            rng.next_range(-HALF_EXTENT, HALF_EXTENT),
        ]
    }

    fn set_agent_pose(&mut self, position: Vec3, _yaw: f64) -> Result<()> {
        self.agent = position;
        Ok(())
    }

    fn step_noop(&mut self) -> Result<Observation> {
        let starts: Vec<Vec3> = self.objects.iter().map(|(_, p)| *p).collect();
        let goals: Vec<Vec3> = starts.iter().map(|p| [-p[0], 0.0, -p[2]]).collect();
        Ok(Observation::new()
            .with("rec_bounding_box", self.boxes_for(&starts))
            .with("target_bounding_box", self.boxes_for(&goals)))
    }

    fn set_episode_over(&mut self, _over: bool) {}
}

fn episode() -> EpisodeInfo {
    EpisodeInfo {
        episode_id: EpisodeId::Int(0),
        targets: vec![
            TargetSpec {
                handle: "cup_0".into(),
                goal_position: [6.0, 0.0, -4.0],
                start_receptacle: None,
                goal_receptacle: None,
            },
            TargetSpec {
                handle: "bowl_1".into(),
                goal_position: [-8.0, 0.0, 3.0],
                start_receptacle: None,
                goal_receptacle: None,
            },
        ],
    }
}

fn bench_search_near(c: &mut Criterion) {
    let config = RunConfig::from_json_str(CONFIG_JSON).unwrap();
    let sampler = PoseSampler::new(RegionId(0));
    c.bench_function("search_near_single_target", |b| {
        let mut sim = FlatScene::new();
        let mut rng = Pcg32::for_run(config.seed);
        b.iter(|| {
            search_near(
                &mut sim,
                &mut rng,
                &sampler,
                &config.constraints,
                SearchTarget { center: [-6.0, 0.0, 4.0], channel: "rec_bounding_box", index: 0 },
            )
            .unwrap()
        });
    });
}

fn bench_search_exhausted(c: &mut Criterion) {
    // Range no view can satisfy: always runs the full trial budget.
    let mut config = RunConfig::from_json_str(CONFIG_JSON).unwrap();
    config.constraints.bbox_min = 1.0e9;
    config.constraints.bbox_max = 2.0e9;
    let sampler = PoseSampler::new(RegionId(0));
    c.bench_function("search_near_fallback_60_trials", |b| {
        let mut sim = FlatScene::new();
        let mut rng = Pcg32::for_run(config.seed);
        b.iter(|| {
            search_near(
                &mut sim,
                &mut rng,
                &sampler,
                &config.constraints,
                SearchTarget { center: [8.0, 0.0, -3.0], channel: "rec_bounding_box", index: 1 },
            )
            .unwrap()
        });
    });
}

fn bench_assemble_episode(c: &mut Criterion) {
    let config = RunConfig::from_json_str(CONFIG_JSON).unwrap();
    let ep = episode();
    c.bench_function("assemble_episode_two_targets", |b| {
        b.iter(|| {
            let mut sim = FlatScene::new();
            let mut rng = Pcg32::for_run(config.seed);
            assemble_episode(&mut sim, &config, &mut rng, &ep)
        });
    });
}

criterion_group!(
    benches,
    bench_search_near,
    bench_search_exhausted,
    bench_assemble_episode
);
criterion_main!(benches);
