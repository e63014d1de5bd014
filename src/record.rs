//! Observation recording and the dataset manifest.
//!
//! Each viewpoint of an episode graph is revisited in order, the configured
//! image channels are written under `output_dir/episode_{id}/`, and one
//! manifest record lists the files that were actually written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::sim::{observe, ImageFrame, Simulator};
use crate::types::{
    has_undefined, CandidatePose, EpisodeGraph, EpisodeId, ManifestRecord, RunConfig,
};

pub const MANIFEST_FILE: &str = "metadata.json";

/// Destination for captured frames.
pub trait ImageSink {
    fn write(&mut self, path: &Path, frame: &ImageFrame) -> Result<()>;
}

/// Writes frames as 8-bit PNG files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngSink;

impl ImageSink for PngSink {
    fn write(&mut self, path: &Path, frame: &ImageFrame) -> Result<()> {
        let color = match frame.channels {
            1 => image::ColorType::L8,
            3 => image::ColorType::Rgb8,
            4 => image::ColorType::Rgba8,
            n => {
                return Err(image::ImageError::Unsupported(
                    image::error::UnsupportedError::from_format_and_kind(
                        image::error::ImageFormatHint::Exact(image::ImageFormat::Png),
                        image::error::UnsupportedErrorKind::GenericFeature(format!(
                            "{n} samples per pixel"
                        )),
                    ),
                )
                .into())
            }
        };
        let expected = frame.width as usize * frame.height as usize * frame.channels as usize;
        if frame.data.len() != expected {
            return Err(image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
            .into());
        }
        image::save_buffer(path, &frame.data, frame.width, frame.height, color)?;
        Ok(())
    }
}

pub fn episode_dir(output_dir: &Path, episode_id: &EpisodeId) -> PathBuf {
    output_dir.join(format!("episode_{episode_id}"))
}

pub fn image_file_name(episode_id: &EpisodeId, channel: &str, index: usize) -> String {
    format!("episode_{episode_id}_{channel}_{index}.png")
}

/// Re-observe every viewpoint of `graph` and persist its images.
///
/// Returns one record per viewpoint. A frame that fails to write is left
/// out of its record's file list. A viewpoint that cannot be observed,
/// either because the simulator fails or because its fallback position is
/// undefined, gets a record with no files. Only failing to create the
/// episode directory is an error.
pub fn record_episode<S, K>(
    sim: &mut S,
    graph: &EpisodeGraph,
    config: &RunConfig,
    sink: &mut K,
) -> Result<Vec<ManifestRecord>>
where
    S: Simulator + ?Sized,
    K: ImageSink + ?Sized,
{
    let episode_id = graph.episode_id();
    let dir = episode_dir(&config.output_dir, episode_id);
    std::fs::create_dir_all(&dir)?;

    let mut records = Vec::with_capacity(graph.len());
    for (index, viewpoint) in graph.viewpoints().iter().enumerate() {
        let pose = CandidatePose {
            position: viewpoint.position,
            rotation: viewpoint.rotation,
        };
        let obs = if has_undefined(&viewpoint.position) {
            warn!(
                episode = %episode_id,
                index,
                source = ?viewpoint.source,
                "viewpoint has undefined coordinates, recorded without images"
            );
            None
        } else {
            match observe(sim, &pose) {
                Ok(obs) => Some(obs),
                Err(e) => {
                    warn!(episode = %episode_id, index, "viewpoint not observed: {e}");
                    None
                }
            }
        };

        let mut obs_files = Vec::new();
        let mut localization_sensor = None;
        if let Some(obs) = &obs {
            for channel in &config.obs_keys {
                let Some(frame) = obs.image(channel) else {
                    continue;
                };
                let file_name = image_file_name(episode_id, channel, index);
                match sink.write(&dir.join(&file_name), frame) {
                    Ok(()) => obs_files.push(file_name),
                    Err(e) => {
                        warn!(episode = %episode_id, file = %file_name, "image not written: {e}")
                    }
                }
            }
            localization_sensor = config
                .localization_channel
                .as_deref()
                .and_then(|name| obs.vector(name))
                .map(<[f64]>::to_vec);
        }

        records.push(ManifestRecord {
            episode_id: episode_id.clone(),
            obs_files,
            position: viewpoint.position,
            rotation: viewpoint.rotation,
            annotation: viewpoint.annotation.clone(),
            localization_sensor,
        });
    }
    Ok(records)
}

/// Every record of a run, in episode then viewpoint order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    records: Vec<ManifestRecord>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ManifestRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = ManifestRecord>) {
        self.records.extend(records);
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_pretty(&mut buf)?;
        // serde_json only emits UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_pretty(&mut writer)?;
        writer.flush()?;
        info!(records = self.len(), path = %path.display(), "manifest written");
        Ok(())
    }

    fn write_pretty<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut ser)?;
        Ok(())
    }
}
