//! Per-episode viewpoint graph construction.
//!
//! An episode moves through `Init → TargetedSampling → FillSampling → Done`.
//! Init picks the walkable region and resolves targets. Targeted sampling
//! runs one search near each target's start and one near its goal. Fill
//! sampling then tops the graph up to `min_images` with random viewpoints
//! that keep their distance from every targeted viewpoint and see none of
//! the tracked objects prominently.

use tracing::{debug, info, warn};

use crate::constraints::{below_salience_cap, far_enough};
use crate::error::Result;
use crate::orientation::random_orientation;
use crate::prng::Pcg32;
use crate::sampler::PoseSampler;
use crate::search::{search_near, SearchTarget};
use crate::sim::{observe, Simulator};
use crate::types::{
    has_undefined, AcceptanceSource, Annotation, CandidatePose, EpisodeGraph, EpisodeInfo,
    RunConfig, SemanticTarget, Vec3, Viewpoint,
};

/// Result of looking up one episode target in the scene.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetOutcome {
    Resolved(SemanticTarget),
    Skipped { handle: String, reason: String },
}

/// Resolve every target spec of `episode` against the current scene.
pub fn resolve_targets<S: Simulator + ?Sized>(
    sim: &S,
    episode: &EpisodeInfo,
) -> Vec<TargetOutcome> {
    episode
        .targets
        .iter()
        .enumerate()
        .map(|(index, spec)| match sim.resolve_object_position(&spec.handle) {
            Some(start) if !has_undefined(&start) => TargetOutcome::Resolved(SemanticTarget {
                index,
                handle: spec.handle.clone(),
                start,
                goal: spec.goal_position,
                start_receptacle: spec.start_receptacle.clone(),
                goal_receptacle: spec.goal_receptacle.clone(),
            }),
            Some(_) => TargetOutcome::Skipped {
                handle: spec.handle.clone(),
                reason: "object position is undefined".into(),
            },
            None => TargetOutcome::Skipped {
                handle: spec.handle.clone(),
                reason: "no scene object with this handle".into(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    TargetedSampling,
    FillSampling,
    Done,
}

struct Assembler<'a, S: Simulator + ?Sized> {
    sim: &'a mut S,
    config: &'a RunConfig,
    rng: &'a mut Pcg32,
    graph: EpisodeGraph,
    sampler: PoseSampler,
    targets: Vec<SemanticTarget>,
}

/// Build the viewpoint graph for the simulator's current episode.
pub fn assemble_episode<S: Simulator + ?Sized>(
    sim: &mut S,
    config: &RunConfig,
    rng: &mut Pcg32,
    episode: &EpisodeInfo,
) -> EpisodeGraph {
    let mut assembler = match Assembler::init(sim, config, rng, episode) {
        Ok(assembler) => assembler,
        Err(e) => {
            warn!(episode = %episode.episode_id, "episode init failed: {e}");
            return EpisodeGraph::new(episode.episode_id.clone());
        }
    };
    let mut phase = Phase::TargetedSampling;
    while phase != Phase::Done {
        let step = match phase {
            Phase::TargetedSampling => assembler.sample_targeted().map(|_| Phase::FillSampling),
            Phase::FillSampling => assembler.sample_fill().map(|_| Phase::Done),
            Phase::Done => Ok(Phase::Done),
        };
        match step {
            Ok(next) => {
                debug!(
                    episode = %episode.episode_id,
                    from = ?phase,
                    to = ?next,
                    "phase transition"
                );
                phase = next;
            }
            Err(e) => {
                warn!(
                    episode = %episode.episode_id,
                    phase = ?phase,
                    viewpoints = assembler.graph.len(),
                    "episode generation aborted: {e}"
                );
                return assembler.graph;
            }
        }
    }
    assembler.graph.mark_complete();
    info!(
        episode = %episode.episode_id,
        viewpoints = assembler.graph.len(),
        skipped_targets = assembler.graph.skipped_targets().len(),
        "episode graph assembled"
    );
    assembler.graph
}

impl<'a, S: Simulator + ?Sized> Assembler<'a, S> {
    fn init(
        sim: &'a mut S,
        config: &'a RunConfig,
        rng: &'a mut Pcg32,
        episode: &EpisodeInfo,
    ) -> Result<Self> {
        let sampler = PoseSampler::for_scene(sim, config.allow_outdoor)?;
        let mut graph = EpisodeGraph::new(episode.episode_id.clone());
        let mut targets = Vec::new();
        for outcome in resolve_targets(&*sim, episode) {
            match outcome {
                TargetOutcome::Resolved(target) => {
                    graph.push_target(target.clone());
                    targets.push(target);
                }
                TargetOutcome::Skipped { handle, reason } => {
                    warn!(
                        episode = %episode.episode_id,
                        handle = %handle,
                        "skipping target: {reason}"
                    );
                    graph.push_skipped(handle);
                }
            }
        }
        debug!(
            episode = %episode.episode_id,
            region = sampler.region().0,
            targets = targets.len(),
            "episode initialised"
        );
        Ok(Self { sim, config, rng, graph, sampler, targets })
    }

    fn sample_targeted(&mut self) -> Result<()> {
        let sampler = self.sampler;
        let constraints = &self.config.constraints;
        for target in &self.targets {
            let start = search_near(
                self.sim,
                self.rng,
                &sampler,
                constraints,
                SearchTarget {
                    center: target.start,
                    channel: &self.config.start_bbox_channel,
                    index: target.index,
                },
            )?;
            let goal = search_near(
                self.sim,
                self.rng,
                &sampler,
                constraints,
                SearchTarget {
                    center: target.goal,
                    channel: &self.config.goal_bbox_channel,
                    index: target.index,
                },
            )?;
            debug!(
                handle = %target.handle,
                start_trials = start.trials,
                start_source = ?start.source,
                goal_trials = goal.trials,
                goal_source = ?goal.source,
                "target pair placed"
            );
            self.graph.push(Viewpoint {
                position: start.pose.position,
                rotation: start.pose.rotation,
                annotation: Annotation::near_start(target),
                source: start.source,
            });
            self.graph.push(Viewpoint {
                position: goal.pose.position,
                rotation: goal.pose.rotation,
                annotation: Annotation::near_goal(target),
                source: goal.source,
            });
        }
        Ok(())
    }

    fn sample_fill(&mut self) -> Result<()> {
        let targeted = self.graph.targeted_positions();
        while self.graph.len() < self.config.constraints.min_images {
            match self.fill_slot(&targeted)? {
                Some(viewpoint) => self.graph.push(viewpoint),
                None => {
                    warn!(
                        episode = %self.graph.episode_id(),
                        viewpoints = self.graph.len(),
                        min_images = self.config.constraints.min_images,
                        "no separated fill candidate within budget, graph left short"
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    /// Draw fill candidates for one slot. Returns the first that is both
    /// separated and low-salience; on an exhausted budget, the last
    /// separated candidate as a fallback, or `None` if none was separated.
    fn fill_slot(&mut self, targeted: &[Vec3]) -> Result<Option<Viewpoint>> {
        let sampler = self.sampler;
        let c = &self.config.constraints;
        let mut last_separated: Option<CandidatePose> = None;

        for _ in 0..c.max_fill_trials {
            let position = sampler.sample_anywhere(self.sim, self.rng);
            let rotation = random_orientation(self.rng);
            if has_undefined(&position) || !far_enough(&position, targeted, c.min_point_dis) {
                continue;
            }
            let pose = CandidatePose { position, rotation };
            let obs = observe(self.sim, &pose)?;
            let quiet = below_salience_cap(
                obs.boxes(&self.config.goal_bbox_channel).unwrap_or(&[]),
                obs.boxes(&self.config.start_bbox_channel).unwrap_or(&[]),
                c.random_min_bbox,
            );
            if quiet {
                return Ok(Some(fill_viewpoint(pose, AcceptanceSource::RandomFill)));
            }
            last_separated = Some(pose);
        }

        Ok(last_separated.map(|pose| {
            warn!(
                episode = %self.graph.episode_id(),
                "fill budget exhausted, keeping last separated candidate"
            );
            fill_viewpoint(pose, AcceptanceSource::Fallback)
        }))
    }
}

fn fill_viewpoint(pose: CandidatePose, source: AcceptanceSource) -> Viewpoint {
    Viewpoint {
        position: pose.position,
        rotation: pose.rotation,
        annotation: Annotation::fill(),
        source,
    }
}
