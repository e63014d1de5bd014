//! Viewpoint graph generation for simulator image datasets.
//!
//! For every episode the simulator serves, [`run`] picks camera poses that
//! frame each rearrangement target near its start and goal, tops the set
//! up with well-separated background views, photographs every pose, and
//! writes a JSON manifest describing the images.

pub mod assemble;
pub mod constraints;
pub mod error;
pub mod orientation;
pub mod prng;
pub mod record;
pub mod sampler;
pub mod search;
pub mod sim;
pub mod types;

#[cfg(test)]
mod testing;

use tracing::{info, warn};

pub use error::{EngineError, Result};
pub use record::{ImageSink, Manifest, PngSink};
pub use sim::{ChannelData, ImageFrame, Observation, Simulator};
pub use types::{EpisodeGraph, RunConfig};

/// Generate and record viewpoints for every remaining episode.
///
/// One PCG32 stream seeded from `config.seed` drives all sampling, so a
/// fixed seed and scene reproduce the dataset. Episode-level failures are
/// logged and the episode's partial results kept. Configuration,
/// output-directory and manifest-write failures abort the run, as does a
/// failing episode source, after the manifest for the episodes recorded so
/// far has been written.
pub fn run<S, K>(sim: &mut S, config: &RunConfig, sink: &mut K) -> Result<Manifest>
where
    S: Simulator + ?Sized,
    K: ImageSink + ?Sized,
{
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let manifest_path = config.output_dir.join(record::MANIFEST_FILE);
    let mut rng = prng::Pcg32::for_run(config.seed);
    let mut manifest = Manifest::new();
    loop {
        let episode = match sim.next_episode() {
            Ok(Some(episode)) => episode,
            Ok(None) => break,
            Err(e) => {
                // Keep the episodes already on disk described.
                warn!(records = manifest.len(), "episode source failed: {e}");
                manifest.write(&manifest_path)?;
                return Err(e);
            }
        };
        info!(episode = %episode.episode_id, targets = episode.targets.len(), "episode started");
        let graph = assemble::assemble_episode(sim, config, &mut rng, &episode);
        let records = record::record_episode(sim, &graph, config, sink)?;
        sim.set_episode_over(true);
        info!(episode = %episode.episode_id, records = records.len(), "episode recorded");
        manifest.extend(records);
    }

    manifest.write(&manifest_path)?;
    Ok(manifest)
}
