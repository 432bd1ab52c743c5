//! Skeletal clip sampling
//!
//! Each keyframe stores the joint's transform relative to its bind pose: the
//! translation delta in export units plus the rotation and scale of
//! `bind_local⁻¹ · local`.

use glam::Mat4;
use tracing::info;

use super::{BoundsTracker, ClipSchedule};
use crate::config::{ClipDef, ExportParams};
use crate::error::ClipError;
use crate::scene::{SceneReader, TimeGuard};
use crate::skeleton::{Joint, Skeleton, bone_transform, world_matrix};
use ogre_common::{Animation, BoneTransform, SkeletonKeyframe, Track};

/// Bind-relative transform of `joint` at `time`
pub fn keyframe_transform<R: SceneReader + ?Sized>(
    reader: &R,
    skeleton: &Skeleton,
    joint: &Joint,
    time: f32,
    params: &ExportParams,
) -> BoneTransform {
    let normalize = params.normalize_scale;
    let world = world_matrix(reader, joint.node, time, normalize);
    let local = match joint.parent {
        Some(p) => {
            let parent = &skeleton.joints[p as usize];
            world_matrix(reader, parent.node, time, normalize).inverse() * world
        }
        None => world,
    };

    let relative: Mat4 = joint.bind_local.inverse() * local;
    let (scale, rotation, _) = relative.to_scale_rotation_translation();
    let translation = local.w_axis.truncate() - joint.bind_local.w_axis.truncate();
    bone_transform(translation, rotation, scale, params)
}

/// Sample every joint of `skeleton` over `clip`
///
/// The host's current time is restored on return, including on error.
pub fn sample_skeletal_clip<R: SceneReader + ?Sized>(
    reader: &mut R,
    skeleton: &Skeleton,
    clip: &ClipDef,
    params: &ExportParams,
    mut bounds: Option<&mut BoundsTracker>,
) -> Result<Animation, ClipError> {
    if skeleton.is_empty() {
        return Err(ClipError::NoJoints);
    }
    let schedule = ClipSchedule::new(clip, reader.frame_rate())?;

    let mut keyframes: Vec<Vec<SkeletonKeyframe>> =
        vec![Vec::with_capacity(schedule.len()); skeleton.len()];

    let mut guard = TimeGuard::new(reader);
    for (i, time) in schedule.samples() {
        guard.set_current_time(time);
        let key_time = schedule.key_time(i);
        for (joint, track) in skeleton.joints.iter().zip(&mut keyframes) {
            track.push(SkeletonKeyframe {
                time: key_time,
                transform: keyframe_transform(&*guard, skeleton, joint, time, params),
            });
        }
        if let Some(tracker) = bounds.as_deref_mut() {
            tracker.sample(&*guard, time);
        }
    }
    drop(guard);

    info!(
        "Skeletal clip '{}': {} samples, {} tracks",
        schedule.name,
        schedule.len(),
        skeleton.len()
    );

    Ok(Animation {
        name: schedule.name.clone(),
        length: schedule.length(),
        tracks: skeleton
            .joints
            .iter()
            .zip(keyframes)
            .map(|(joint, keyframes)| Track::Skeletal {
                bone: joint.name.clone(),
                keyframes,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeId, SceneSnapshot};
    use crate::skeleton::SkeletonBuilder;
    use std::f32::consts::FRAC_PI_2;

    const SCENE: &str = r#"{
        "frame_rate": 10,
        "current_time": 4.0,
        "nodes": [
            { "name": "root", "translation": [0, 10, 0],
              "translation_keys": { "times": [0, 1], "values": [[0,10,0],[5,10,0]] } },
            { "name": "arm", "parent": 0, "translation": [2, 0, 0],
              "rotation_keys": { "times": [0, 1], "values": [[0,0,0,1],[0,0,0.7071068,0.7071068]] } }
        ]
    }"#;

    fn skeleton(scene: &SceneSnapshot, params: &ExportParams) -> Skeleton {
        let mut builder = SkeletonBuilder::new(params);
        builder.load_joint(scene, NodeId(0)).unwrap();
        builder.build("rig").unwrap()
    }

    fn clip(start: f32, stop: f32, rate: f32) -> ClipDef {
        ClipDef {
            name: "wave".into(),
            start,
            stop,
            rate,
        }
    }

    fn keyframes(animation: &Animation, bone: &str) -> Vec<SkeletonKeyframe> {
        animation
            .tracks
            .iter()
            .find_map(|t| match t {
                Track::Skeletal { bone: b, keyframes } if b == bone => Some(keyframes.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_bind_time_keyframe_is_identity() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams::default();
        let skeleton = skeleton(&scene, &params);

        let animation =
            sample_skeletal_clip(&mut scene, &skeleton, &clip(0.0, 1.0, 0.5), &params, None)
                .unwrap();
        assert_eq!(animation.tracks.len(), 2);
        assert_eq!(animation.length, 1.0);

        for bone in ["root", "arm"] {
            let first = keyframes(&animation, bone)[0];
            assert_eq!(first.time, 0.0);
            assert_eq!(first.transform, BoneTransform::IDENTITY);
        }
    }

    #[test]
    fn test_keyframes_relative_to_bind() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams::default();
        let skeleton = skeleton(&scene, &params);

        let animation =
            sample_skeletal_clip(&mut scene, &skeleton, &clip(0.0, 1.0, 0.5), &params, None)
                .unwrap();

        let root = keyframes(&animation, "root");
        assert_eq!(root.len(), 3);
        assert_eq!(root[2].time, 1.0);
        assert_eq!(root[2].transform.translation, [5.0, 0.0, 0.0]);

        let arm = keyframes(&animation, "arm");
        assert_eq!(arm[2].transform.translation, [0.0, 0.0, 0.0]);
        assert_eq!(arm[2].transform.axis, [0.0, 0.0, 1.0]);
        assert!((arm[2].transform.angle + FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_local_space_root_matches_world_space() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams {
            world_space: false,
            ..Default::default()
        };
        let skeleton = skeleton(&scene, &params);
        assert_eq!(skeleton.joints[0].bind.translation, [0.0, 10.0, 0.0]);

        let animation =
            sample_skeletal_clip(&mut scene, &skeleton, &clip(0.0, 1.0, 0.5), &params, None)
                .unwrap();
        let root = keyframes(&animation, "root");
        assert_eq!(root[0].transform, BoneTransform::IDENTITY);
        assert_eq!(root[2].transform.translation, [5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_current_time_restored() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams::default();
        let skeleton = skeleton(&scene, &params);

        sample_skeletal_clip(&mut scene, &skeleton, &clip(0.0, 1.0, 0.25), &params, None)
            .unwrap();
        assert_eq!(scene.current_time(), 4.0);

        let err = sample_skeletal_clip(&mut scene, &skeleton, &clip(0.0, 1.0, 0.0), &params, None)
            .unwrap_err();
        assert_eq!(err, ClipError::InvalidRate(0.0));
        assert_eq!(scene.current_time(), 4.0);
    }

    #[test]
    fn test_empty_skeleton_rejected() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams::default();
        let err = sample_skeletal_clip(
            &mut scene,
            &Skeleton::default(),
            &clip(0.0, 1.0, 0.5),
            &params,
            None,
        )
        .unwrap_err();
        assert_eq!(err, ClipError::NoJoints);
    }

    #[test]
    fn test_evaluates_at_frame_time() {
        let mut scene = SceneSnapshot::from_json(SCENE).unwrap();
        let params = ExportParams::default();
        let skeleton = skeleton(&scene, &params);

        // 0.52 snaps to frame 5 at 10 fps
        let animation =
            sample_skeletal_clip(&mut scene, &skeleton, &clip(0.52, 0.52, 1.0), &params, None)
                .unwrap();
        let root = keyframes(&animation, "root");
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].time, 0.0);
        assert!((root[0].transform.translation[0] - 2.5).abs() < 1e-4);
    }
}
