//! Integration tests for the export pipeline
//!
//! Runs whole exports against scene snapshots and checks the resulting
//! resources.

mod common;

use common::{BODY, CHARACTER_SCENE, CLIP_CONFIG, HELMET, HIPS, UNROOTED_SCENE, wide_rig_scene};
use ogre_common::{BoneInfluence, IndexBuffer, MAX_BONES, Track, TrackTarget};
use ogre_export::{ExportError, ExportParams, Exporter, NodeId, SceneReader, SceneSnapshot};

fn character() -> SceneSnapshot {
    SceneSnapshot::from_json(CHARACTER_SCENE).expect("Failed to parse character scene")
}

fn meshes() -> Vec<NodeId> {
    vec![NodeId(BODY), NodeId(HELMET)]
}

#[test]
fn test_character_geometry() {
    let mut scene = character();
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");

    let mesh = output.mesh.expect("mesh output");
    assert_eq!(mesh.skeleton.as_deref(), Some("hero"));
    assert_eq!(mesh.shared_vertices.len(), 7);
    assert_eq!(mesh.submeshes.len(), 2);
    assert_eq!(mesh.submeshes[0].material, "skin");
    assert_eq!(mesh.submeshes[1].material, "metal_rough");
    for submesh in &mesh.submeshes {
        assert!(submesh.indices.is_32bit());
    }
    assert_eq!(
        mesh.submeshes[0].indices,
        IndexBuffer::U32(vec![0, 1, 2, 0, 2, 3])
    );

    let names: Vec<&str> = output.materials.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["skin", "metal_rough"]);
    assert!(mesh.bounds.is_some());
}

#[test]
fn test_character_skeleton() {
    let mut scene = character();
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");

    let skeleton = output.skeleton.expect("skeleton output");
    let names: Vec<&str> = skeleton.bones.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Hips", "Spine", "Helmet"]);

    for (i, bone) in skeleton.bones.iter().enumerate() {
        assert_eq!(bone.id as usize, i);
        if let Some(parent) = bone.parent {
            assert!(parent < bone.id, "parent must be created first");
        }
        let duplicates = skeleton.bones.iter().filter(|b| b.name == bone.name).count();
        assert_eq!(duplicates, 1);
    }
    assert_eq!(skeleton.bones[0].bind.translation, [0.0, 100.0, 0.0]);
    assert_eq!(skeleton.bones[1].bind.translation, [0.0, 20.0, 0.0]);
}

#[test]
fn test_skin_and_rigid_fallback() {
    let mut scene = character();
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");
    let mesh = output.mesh.expect("mesh output");

    let body = &mesh.shared_vertices[0..4];
    assert_eq!(body[0].influences, vec![BoneInfluence::rigid(0)]);
    assert_eq!(body[1].influences.len(), 2);
    let total: f32 = body[1].influences.iter().map(|i| i.weight).sum();
    assert!((total - 1.0).abs() < 1e-5);
    // unweighted vertex of a top-level node falls back to joint 0
    assert_eq!(body[3].influences, vec![BoneInfluence::rigid(0)]);

    // the helmet node is itself a joint
    for v in &mesh.shared_vertices[4..7] {
        assert_eq!(v.influences, vec![BoneInfluence::rigid(2)]);
    }
}

#[test]
fn test_blend_shapes_become_poses() {
    let mut scene = character();
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");
    let mesh = output.mesh.expect("mesh output");

    assert_eq!(mesh.poses.len(), 2);
    let breathe = &mesh.poses[0];
    assert_eq!(breathe.name, "Breathe");
    assert_eq!(breathe.target, TrackTarget::Mesh);
    let indices: Vec<u32> = breathe.offsets.iter().map(|o| o.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(breathe.offsets[0].offset, [0.0, 0.0, 2.0]);

    // every displacement below epsilon, but the pose stays
    assert_eq!(mesh.poses[1].name, "Idle");
    assert!(mesh.poses[1].offsets.is_empty());
}

#[test]
fn test_per_submesh_poses_and_16bit_indices() {
    let mut scene = character();
    let params = ExportParams {
        shared_geometry: false,
        ..Default::default()
    };
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");
    let mesh = output.mesh.expect("mesh output");

    assert!(!mesh.uses_shared_geometry());
    assert_eq!(mesh.submeshes[0].vertices.len(), 4);
    assert!(!mesh.submeshes[0].indices.is_32bit());
    assert_eq!(mesh.submeshes[0].pose_source, Some(0));
    assert_eq!(mesh.submeshes[1].pose_source, None);
    for pose in &mesh.poses {
        assert_eq!(pose.target, TrackTarget::Submesh(0));
    }
}

#[test]
fn test_clips_sampled_and_broken_clips_skipped() {
    let mut scene = character();
    let params = ExportParams::parse(CLIP_CONFIG).expect("Failed to parse config");
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");

    assert_eq!(output.report.skipped_clips, vec!["broken", "backwards"]);

    let skeleton = output.skeleton.expect("skeleton output");
    assert_eq!(skeleton.animations.len(), 1);
    let walk = &skeleton.animations[0];
    assert_eq!(walk.name, "walk");
    assert_eq!(walk.length, 1.0);
    assert_eq!(walk.tracks.len(), 3);
    let Track::Skeletal { bone, keyframes } = &walk.tracks[0] else {
        panic!("expected skeletal track");
    };
    assert_eq!(bone, "Hips");
    let times: Vec<f32> = keyframes.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 0.5, 1.0]);
    assert_eq!(keyframes[2].transform.translation, [10.0, 0.0, 0.0]);

    let mesh = output.mesh.expect("mesh output");
    let names: Vec<&str> = mesh.animations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["breathe", "sway"]);

    let Track::Pose { target, keyframes } = &mesh.animations[0].tracks[0] else {
        panic!("expected pose track");
    };
    assert_eq!(*target, TrackTarget::Mesh);
    assert_eq!(keyframes.len(), 3);
    assert_eq!(keyframes[1].references.len(), 2);
    assert_eq!(keyframes[1].references[0].pose_index, 0);
    assert!((keyframes[1].references[0].weight - 0.5).abs() < 1e-6);

    let Track::Morph { keyframes, .. } = &mesh.animations[1].tracks[0] else {
        panic!("expected morph track");
    };
    assert_eq!(keyframes.len(), 3);
    assert_eq!(keyframes[2].positions.len(), 7);
    assert_eq!(keyframes[2].positions[0], [-10.0, 90.0, 2.0]);
}

#[test]
fn test_current_time_restored() {
    let mut scene = character();
    let params = ExportParams::parse(CLIP_CONFIG).expect("Failed to parse config");
    Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");
    assert_eq!(scene.current_time(), 0.75);

    let err = Exporter::new(&params)
        .export(&mut scene, "hero", &[NodeId(99)])
        .unwrap_err();
    assert_eq!(err, ExportError::MissingNode(99));
    assert_eq!(scene.current_time(), 0.75);
}

#[test]
fn test_no_triangles_is_structural_error() {
    let mut scene = character();
    let params = ExportParams::default();
    let err = Exporter::new(&params)
        .export(&mut scene, "hero", &[NodeId(HIPS)])
        .unwrap_err();
    assert_eq!(err, ExportError::EmptyMesh);
}

#[test]
fn test_bone_ceiling_drops_skeleton_only() {
    let mut scene =
        SceneSnapshot::from_json(&wide_rig_scene(MAX_BONES)).expect("Failed to parse rig");
    let skinned = scene.find("skinned").expect("skinned node");
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "crowd", &[skinned])
        .expect("Export failed");

    assert!(output.skeleton.is_none());
    assert_eq!(output.report.errors.len(), 1);

    let mesh = output.mesh.expect("mesh output");
    assert_eq!(mesh.skeleton, None);
    assert!(mesh.shared_vertices.iter().all(|v| v.influences.is_empty()));
}

#[test]
fn test_skin_without_bones_gets_synthetic_root() {
    let mut scene = SceneSnapshot::from_json(UNROOTED_SCENE).expect("Failed to parse scene");
    let blob = scene.find("Blob").expect("Blob node");
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "blob", &[blob])
        .expect("Export failed");

    let skeleton = output.skeleton.expect("skeleton output");
    assert_eq!(skeleton.bones.len(), 1);
    assert_eq!(skeleton.bones[0].id, 0);
    assert_eq!(skeleton.bones[0].name, "Anchor");
    assert_eq!(skeleton.bones[0].parent, None);
    assert_eq!(output.report.warnings.len(), 1);
    assert!(output.report.errors.is_empty());

    let mesh = output.mesh.expect("mesh output");
    assert_eq!(mesh.skeleton.as_deref(), Some("blob"));
    for v in &mesh.shared_vertices {
        assert_eq!(v.influences, vec![BoneInfluence::rigid(0)]);
    }
}

#[test]
fn test_morph_mismatch_drops_poses_with_warning() {
    let mut scene = character();
    scene.nodes[BODY as usize].morph[0].positions.pop();
    let params = ExportParams::default();
    let output = Exporter::new(&params)
        .export(&mut scene, "hero", &meshes())
        .expect("Export failed");

    let mesh = output.mesh.expect("mesh output");
    assert!(mesh.poses.is_empty());
    assert_eq!(output.report.warnings.len(), 1);
    // skin modifiers are back on
    assert!(scene.skin_modifier_enabled(NodeId(BODY), 0));
}

#[test]
fn test_two_exports_do_not_share_materials() {
    let params = ExportParams {
        material_prefix: "hero".into(),
        ..Default::default()
    };

    let mut scene = character();
    let first = Exporter::new(&params)
        .export(&mut scene, "hero", &[NodeId(HELMET)])
        .expect("Export failed");
    let second = Exporter::new(&params)
        .export(&mut scene, "hero", &[NodeId(BODY)])
        .expect("Export failed");

    assert_eq!(first.materials.len(), 1);
    assert_eq!(first.materials[0].name, "hero/metal_rough");
    assert_eq!(second.materials.len(), 1);
    assert_eq!(second.materials[0].name, "hero/skin");
}
