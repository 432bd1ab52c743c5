//! Clip sampling
//!
//! A clip is sampled at `start, start + rate, ...` while below `stop`, and
//! `stop` itself is always the last sample. The host is evaluated at the
//! frame nearest to each sample time, while keyframe times stay relative to
//! the first requested sample.

pub mod morph;
pub mod pose;
pub mod skeletal;

pub use morph::{MorphSegment, MorphTarget, morph_targets, sample_vertex_clip};
pub use pose::{merge_pose_tracks, sample_pose_clip};
pub use skeletal::sample_skeletal_clip;

use crate::config::{ClipDef, ExportParams};
use crate::error::ClipError;
use crate::mesh::NodeBounds;
use crate::scene::{NodeId, SceneReader, Space};

/// Requested sample times of a clip range
pub fn sample_times(start: f32, stop: f32, rate: f32) -> Result<Vec<f32>, ClipError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ClipError::InvalidRate(rate));
    }
    if !start.is_finite() || !stop.is_finite() || stop < start {
        return Err(ClipError::InvalidRange { start, stop });
    }

    // multiplied rather than accumulated so steps do not drift
    let mut times = Vec::new();
    let mut i = 0u32;
    loop {
        let t = start + i as f32 * rate;
        if t >= stop {
            break;
        }
        times.push(t);
        i += 1;
    }
    times.push(stop);
    Ok(times)
}

/// Nearest frame boundary at or around `t`
pub fn snap_to_frame(t: f32, frame_rate: f32) -> f32 {
    if frame_rate <= 0.0 || !frame_rate.is_finite() {
        return t;
    }
    (0.5 + t * frame_rate).floor() / frame_rate
}

/// Sample schedule of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSchedule {
    pub name: String,
    /// Requested times
    pub times: Vec<f32>,
    /// Host evaluation times, snapped to frames
    pub frames: Vec<f32>,
}

impl ClipSchedule {
    pub fn new(clip: &ClipDef, frame_rate: f32) -> Result<Self, ClipError> {
        let times = sample_times(clip.start, clip.stop, clip.rate)?;
        let frames = times.iter().map(|&t| snap_to_frame(t, frame_rate)).collect();
        Ok(Self {
            name: clip.name.clone(),
            times,
            frames,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Keyframe time of sample `i`, relative to the first sample
    pub fn key_time(&self, i: usize) -> f32 {
        self.times[i] - self.times[0]
    }

    pub fn length(&self) -> f32 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// (sample index, host time) pairs
    pub fn samples(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.frames.iter().copied().enumerate()
    }
}

/// Grows per-node boxes with each sampled frame
#[derive(Debug, Clone)]
pub struct BoundsTracker {
    nodes: Vec<NodeId>,
    space: Space,
    multiplier: f32,
    bounds: NodeBounds,
}

impl BoundsTracker {
    pub fn new(nodes: Vec<NodeId>, params: &ExportParams) -> Self {
        Self {
            nodes,
            space: Space::from_world_flag(params.world_space),
            multiplier: params.length_multiplier(),
            bounds: NodeBounds::new(),
        }
    }

    pub fn sample<R: SceneReader + ?Sized>(&mut self, reader: &R, time: f32) {
        for &node in &self.nodes {
            let Some(mut b) = reader.bounding_box(node, self.space, time) else {
                continue;
            };
            for i in 0..3 {
                b.min[i] *= self.multiplier;
                b.max[i] *= self.multiplier;
            }
            self.bounds
                .entry(node)
                .and_modify(|acc| acc.merge(&b))
                .or_insert(b);
        }
    }

    pub fn bounds(&self) -> &NodeBounds {
        &self.bounds
    }

    pub fn into_bounds(self) -> NodeBounds {
        self.bounds
    }
}
