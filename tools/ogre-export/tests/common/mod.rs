//! Scene snapshot fixtures shared by the integration tests

#![allow(dead_code)]

/// Two-bone rig with a skinned, morphing body and a rigid helmet parented to
/// the spine
pub const CHARACTER_SCENE: &str = r#"{
    "frame_rate": 30,
    "current_time": 0.75,
    "nodes": [
        { "name": "Hips", "translation": [0, 100, 0],
          "translation_keys": { "times": [0, 1], "values": [[0, 100, 0], [10, 100, 0]] } },
        { "name": "Spine", "parent": 0, "translation": [0, 20, 0],
          "rotation_keys": { "times": [0, 1], "values": [[0, 0, 0, 1], [0, 0.7071068, 0, 0.7071068]] } },
        { "name": "Body",
          "mesh": {
              "positions": [[-10, 90, 0], [10, 90, 0], [10, 130, 0], [-10, 130, 0]],
              "normals": [[0, 0, 1]],
              "uvs": [[[0, 0], [1, 0], [1, 1], [0, 1]]],
              "faces": [
                  { "positions": [0, 1, 2], "normals": [0, 0, 0], "uvs": [[0, 1, 2]] },
                  { "positions": [0, 2, 3], "normals": [0, 0, 0], "uvs": [[0, 2, 3]] }
              ],
              "materials": [{ "name": "skin" }]
          },
          "skin": {
              "joints": [0, 1],
              "weights": [[[0, 1.0]], [[0, 0.5], [1, 0.5]], [[1, 1.0]], []]
          },
          "morph": [
              { "name": "Breathe",
                "positions": [[-10, 90, 2], [10, 90, 2], [10, 130, 0], [-10, 130, 0]],
                "weights": { "times": [0, 1], "values": [0, 1] } },
              { "name": "Idle",
                "positions": [[-10, 90, 0], [10, 90, 0], [10, 130, 0.00001], [-10, 130, 0]] }
          ] },
        { "name": "Helmet", "parent": 1, "translation": [0, 10, 0],
          "mesh": {
              "positions": [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
              "faces": [{ "positions": [0, 1, 2] }],
              "materials": [{ "name": "metal:rough" }]
          } }
    ]
}"#;

pub const HIPS: u32 = 0;
pub const BODY: u32 = 2;
pub const HELMET: u32 = 3;

/// Clip set exercising every track kind, with one broken clip per kind
/// except poses
pub const CLIP_CONFIG: &str = r#"
export_skeletal_animations = true
export_pose_animations = true
export_vertex_animations = true

[[skeletal_clips]]
name = "walk"
start = 0.0
stop = 1.0
rate = 0.5

[[skeletal_clips]]
name = "broken"
start = 0.0
stop = 1.0
rate = 0.0

[[pose_clips]]
name = "breathe"
start = 0.0
stop = 1.0
rate = 0.5

[[vertex_clips]]
name = "backwards"
start = 1.0
stop = 0.0
rate = 0.5

[[vertex_clips]]
name = "sway"
start = 0.0
stop = 1.0
rate = 0.5
"#;

/// Skinned triangle whose skin names no joints, next to an unrelated
/// top-level node
pub const UNROOTED_SCENE: &str = r#"{
    "nodes": [
        { "name": "Anchor", "translation": [0, 5, 0] },
        { "name": "Blob",
          "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [{ "positions": [0,1,2] }] },
          "skin": { "joints": [], "weights": [[], [], []] } }
    ]
}"#;

/// Skinned triangle driven by a root with `children` child bones
pub fn wide_rig_scene(children: usize) -> String {
    let mut nodes = vec![r#"{ "name": "root" }"#.to_string()];
    for i in 0..children {
        nodes.push(format!(r#"{{ "name": "bone{}", "parent": 0 }}"#, i));
    }
    nodes.push(
        r#"{ "name": "skinned",
             "mesh": { "positions": [[0,0,0],[1,0,0],[0,1,0]], "faces": [{ "positions": [0,1,2] }] },
             "skin": { "joints": [1], "weights": [[[0, 1.0]], [[0, 1.0]], [[0, 1.0]]] } }"#
            .to_string(),
    );
    format!(r#"{{ "nodes": [{}] }}"#, nodes.join(","))
}
