//! Bounded retry search for a viewpoint that frames a target.
//!
//! Each trial samples a navigable point within the current radius of the
//! target, faces it, and observes. A draw with undefined coordinates is
//! rejected without observing. A trial is accepted when the tracked box's
//! area falls inside the configured range.
//! Every rejection widens the radius by a fixed step: apparent size is
//! mostly a function of distance, and sparse navmeshes may have no point
//! at all inside a tight radius. When the budget runs out the last
//! candidate is returned as a fallback, so the search always yields a pose.

use tracing::{debug, warn};

use crate::constraints::accepts_target_size;
use crate::error::Result;
use crate::orientation::aim_at;
use crate::prng::Pcg32;
use crate::sampler::PoseSampler;
use crate::sim::{observe, Simulator};
use crate::types::{has_undefined, AcceptanceSource, CandidatePose, ConstraintConfig, Vec3};

/// What to frame: a world position and where its box appears in observations.
#[derive(Debug, Clone, Copy)]
pub struct SearchTarget<'a> {
    pub center: Vec3,
    /// Bounding-box channel to read.
    pub channel: &'a str,
    /// Index of the target's box within that channel.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub pose: CandidatePose,
    pub source: AcceptanceSource,
    /// Observations made, including the accepted one.
    pub trials: u32,
    /// Radius the next trial would have used.
    pub final_radius: f64,
}

impl SearchOutcome {
    pub fn is_fallback(&self) -> bool {
        self.source == AcceptanceSource::Fallback
    }
}

/// Search near `target.center` until a candidate passes or
/// `constraints.max_trials` observations have been made.
///
/// Only simulator failures are returned as errors; an exhausted budget
/// resolves to a `Fallback` outcome.
pub fn search_near<S: Simulator + ?Sized>(
    sim: &mut S,
    rng: &mut Pcg32,
    sampler: &PoseSampler,
    constraints: &ConstraintConfig,
    target: SearchTarget<'_>,
) -> Result<SearchOutcome> {
    let mut radius = constraints.dist_to_target;
    let mut last: Option<CandidatePose> = None;
    let mut trials: u32 = 0;

    while trials < constraints.max_trials {
        let position = sampler.sample_near(sim, rng, target.center, radius);
        let pose = CandidatePose {
            position,
            rotation: aim_at(&position, &target.center),
        };
        // An undefined draw is a rejected trial; there is nothing to observe.
        if has_undefined(&position) {
            debug!(trial = trials + 1, radius, "navmesh returned no point");
            last = Some(pose);
            radius += constraints.radius_step;
            trials += 1;
            continue;
        }

        let obs = observe(sim, &pose)?;
        let sized = obs
            .target_box(target.channel, target.index)
            .map(|b| accepts_target_size(&b, constraints.bbox_min, constraints.bbox_max))
            .unwrap_or(false);

        if sized {
            debug!(trials = trials + 1, radius, channel = target.channel, "viewpoint accepted");
            return Ok(SearchOutcome {
                pose,
                source: AcceptanceSource::Constrained,
                trials: trials + 1,
                final_radius: radius,
            });
        }

        last = Some(pose);
        radius += constraints.radius_step;
        trials += 1;
    }

    // Config validation guarantees at least one trial.
    let pose = last.unwrap_or_else(|| CandidatePose {
        position: target.center,
        rotation: aim_at(&target.center, &target.center),
    });
    warn!(
        trials,
        final_radius = radius,
        channel = target.channel,
        "search budget exhausted, keeping last candidate"
    );
    Ok(SearchOutcome {
        pose,
        source: AcceptanceSource::Fallback,
        trials,
        final_radius: radius,
    })
}
