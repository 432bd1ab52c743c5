//! Pose (blend-shape) clip sampling
//!
//! Every pose group yields one reference per pose at each sample, weighted by
//! its morph channel. With shared geometry all groups target the whole mesh
//! and their per-sample references are concatenated into a single track.

use tracing::info;

use super::ClipSchedule;
use crate::blendshape::{PoseGroup, PoseRemapping};
use crate::config::ClipDef;
use crate::error::{ClipError, ExportError};
use crate::scene::{SceneReader, TimeGuard};
use ogre_common::{Animation, PoseKeyframe, PoseReference, Track, TrackTarget};

/// Union per-source keyframes sample by sample
///
/// References are concatenated in track order, never averaged. All tracks
/// must share one sample sequence.
pub fn merge_pose_tracks(tracks: Vec<Vec<PoseKeyframe>>) -> Result<Vec<PoseKeyframe>, ClipError> {
    let mut tracks = tracks.into_iter();
    let Some(mut merged) = tracks.next() else {
        return Ok(Vec::new());
    };

    for track in tracks {
        if track.len() != merged.len() {
            return Err(ClipError::MismatchedSampleCount {
                expected: merged.len(),
                found: track.len(),
            });
        }
        for (acc, keyframe) in merged.iter_mut().zip(track) {
            acc.references.extend(keyframe.references);
        }
    }
    Ok(merged)
}

fn group_references<R: SceneReader + ?Sized>(
    reader: &R,
    group: &PoseGroup,
    remap: &PoseRemapping,
    time: f32,
) -> Result<Vec<PoseReference>, ExportError> {
    group
        .channels
        .iter()
        .enumerate()
        .map(|(k, &channel)| {
            let local = group.local_start + k as u32;
            let pose_index =
                remap
                    .global(group.target, local)
                    .ok_or(ExportError::IndexOutOfRange {
                        what: "pose",
                        index: local as usize,
                        len: remap.local_count(group.target),
                    })?;
            Ok(PoseReference {
                pose_index,
                weight: reader.morph_weight(group.node, channel, time).clamp(0.0, 1.0),
            })
        })
        .collect()
}

/// Sample the weights of every pose group over `clip`
pub fn sample_pose_clip<R: SceneReader + ?Sized>(
    reader: &mut R,
    clip: &ClipDef,
    groups: &[PoseGroup],
    remap: &PoseRemapping,
) -> Result<Animation, ClipError> {
    let schedule = ClipSchedule::new(clip, reader.frame_rate())?;
    let mut per_group: Vec<Vec<PoseKeyframe>> = vec![Vec::new(); groups.len()];

    let mut guard = TimeGuard::new(reader);
    for (i, time) in schedule.samples() {
        guard.set_current_time(time);
        for (group, keyframes) in groups.iter().zip(&mut per_group) {
            keyframes.push(PoseKeyframe {
                time: schedule.key_time(i),
                references: group_references(&*guard, group, remap, time)?,
            });
        }
    }
    drop(guard);

    // one track per target, groups of the same target merged in order
    let mut targets: Vec<TrackTarget> = Vec::new();
    for group in groups {
        if !targets.contains(&group.target) {
            targets.push(group.target);
        }
    }

    let mut tracks = Vec::with_capacity(targets.len());
    let mut per_group: Vec<Option<Vec<PoseKeyframe>>> = per_group.into_iter().map(Some).collect();
    for target in targets {
        let sources = groups
            .iter()
            .zip(per_group.iter_mut())
            .filter(|(group, _)| group.target == target)
            .filter_map(|(_, keyframes)| keyframes.take())
            .collect();
        tracks.push(Track::Pose {
            target,
            keyframes: merge_pose_tracks(sources)?,
        });
    }

    info!(
        "Pose clip '{}': {} samples, {} tracks",
        schedule.name,
        schedule.len(),
        tracks.len()
    );

    Ok(Animation {
        name: schedule.name.clone(),
        length: schedule.length(),
        tracks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeId, SceneSnapshot};

    const SCENE: &str = r#"{
        "current_time": 3.0,
        "nodes": [
            { "name": "brow",
              "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [{ "positions": [0,1,2] }] },
              "morph": [
                  { "name": "raise", "positions": [[0,0,1],[1,0,0],[0,1,0]],
                    "weights": { "times": [0, 1], "values": [0, 1] } }
              ] },
            { "name": "jaw",
              "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [{ "positions": [0,1,2] }] },
              "morph": [
                  { "name": "open", "positions": [[0,-1,0],[1,0,0],[0,1,0]],
                    "weights": { "times": [0, 1], "values": [1, 0] } },
                  { "name": "wide", "positions": [[1,0,0],[1,0,0],[0,1,0]] }
              ] }
        ]
    }"#;

    fn keyframe(time: f32, refs: &[(u32, f32)]) -> PoseKeyframe {
        PoseKeyframe {
            time,
            references: refs
                .iter()
                .map(|&(pose_index, weight)| PoseReference { pose_index, weight })
                .collect(),
        }
    }

    fn clip() -> ClipDef {
        ClipDef {
            name: "talk".into(),
            start: 0.0,
            stop: 1.0,
            rate: 0.5,
        }
    }

    fn groups(target_of: impl Fn(u32) -> TrackTarget) -> (Vec<PoseGroup>, PoseRemapping) {
        let mut remap = PoseRemapping::default();
        let brow = PoseGroup {
            target: target_of(0),
            node: NodeId(0),
            source: 0,
            channels: vec![0],
            local_start: remap.push(target_of(0), 0),
        };
        let jaw_start = remap.push(target_of(1), 1);
        remap.push(target_of(1), 2);
        let jaw = PoseGroup {
            target: target_of(1),
            node: NodeId(1),
            source: 1,
            channels: vec![0, 1],
            local_start: jaw_start,
        };
        (vec![brow, jaw], remap)
    }

    #[test]
    fn test_merge_concatenates_references() {
        let a = vec![keyframe(0.0, &[(0, 0.5)]), keyframe(1.0, &[(0, 1.0)])];
        let b = vec![keyframe(0.0, &[(1, 0.2)]), keyframe(1.0, &[(1, 0.0)])];

        let merged = merge_pose_tracks(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], keyframe(0.0, &[(0, 0.5), (1, 0.2)]));
        assert_eq!(merged[1], keyframe(1.0, &[(0, 1.0), (1, 0.0)]));
    }

    #[test]
    fn test_merge_rejects_mismatched_samples() {
        let a = vec![keyframe(0.0, &[]), keyframe(1.0, &[])];
        let b = vec![keyframe(0.0, &[])];
        assert_eq!(
            merge_pose_tracks(vec![a, b]),
            Err(ClipError::MismatchedSampleCount {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(merge_pose_tracks(Vec::new()), Ok(Vec::new()));
    }

    #[test]
    fn test_shared_groups_merge_into_mesh_track() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let (groups, remap) = groups(|_| TrackTarget::Mesh);

        let animation = sample_pose_clip(&mut scene, &clip(), &groups, &remap).unwrap();
        assert_eq!(scene.current_time(), 3.0);
        assert_eq!(animation.tracks.len(), 1);

        let Track::Pose { target, keyframes } = &animation.tracks[0] else {
            panic!("expected pose track");
        };
        assert_eq!(*target, TrackTarget::Mesh);
        assert_eq!(keyframes.len(), 3);
        assert_eq!(keyframes[1], keyframe(0.5, &[(0, 0.5), (1, 0.5), (2, 0.0)]));
        assert_eq!(keyframes[2], keyframe(1.0, &[(0, 1.0), (1, 0.0), (2, 0.0)]));
    }

    #[test]
    fn test_per_submesh_groups_keep_global_indices() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let (groups, remap) = groups(TrackTarget::Submesh);

        let animation = sample_pose_clip(&mut scene, &clip(), &groups, &remap).unwrap();
        assert_eq!(animation.tracks.len(), 2);

        let Track::Pose { target, keyframes } = &animation.tracks[1] else {
            panic!("expected pose track");
        };
        assert_eq!(*target, TrackTarget::Submesh(1));
        assert_eq!(keyframes[0], keyframe(0.0, &[(1, 1.0), (2, 0.0)]));
    }
}
