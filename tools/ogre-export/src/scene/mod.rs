//! Host scene collaborator
//!
//! The export core never stores host objects. Everything it needs is pulled
//! eagerly through [`SceneReader`] into plain structs (`SourceMesh`,
//! `SkinBinding`, `MorphDeformer`) keyed by opaque [`NodeId`] handles.
//!
//! The host owns a mutable "current time" cursor and per-node skin modifier
//! state. [`TimeGuard`] and [`SkinDisableGuard`] restore both on every exit
//! path.

mod snapshot;

pub use snapshot::SceneSnapshot;

use glam::Mat4;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

use crate::error::ExportError;
use ogre_common::BoundingBox;

/// Time at which bind poses and base geometry are evaluated
pub const BIND_TIME: f32 = 0.0;

/// Opaque node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Coordinate space of geometry reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    World,
    Object,
}

impl Space {
    pub fn from_world_flag(world_space: bool) -> Self {
        if world_space { Space::World } else { Space::Object }
    }
}

// ============================================================================
// Eager data pulled from the host
// ============================================================================

/// Triangle with per-corner attribute indices
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFace {
    /// Position indices
    pub positions: [u32; 3],
    /// Normal indices
    pub normals: [u32; 3],
    /// Colour indices (`None` when the mesh has no colours)
    pub colors: Option<[u32; 3]>,
    /// UV indices, one triple per UV channel
    pub uvs: Vec<[u32; 3]>,
    /// Index into `SourceMesh::materials`
    pub material: u32,
}

/// Simple material description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSlot {
    pub name: String,
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 4],
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 4],
    #[serde(default = "default_specular")]
    pub specular: [f32; 4],
    #[serde(default)]
    pub emissive: [f32; 4],
    #[serde(default)]
    pub texture: Option<String>,
}

fn default_ambient() -> [f32; 4] {
    [0.5, 0.5, 0.5, 1.0]
}

fn default_diffuse() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn default_specular() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl MaterialSlot {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: default_ambient(),
            diffuse: default_diffuse(),
            specular: default_specular(),
            emissive: [0.0; 4],
            texture: None,
        }
    }
}

/// Raw geometry of one node, read in the requested space and host units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    /// Each channel holds its own (u, v) list
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    pub faces: Vec<SourceFace>,
    pub materials: Vec<MaterialSlot>,
    /// Surface is mirrored; winding and normals must be flipped
    pub opposite: bool,
}

/// Skin weight referencing `SkinBinding::joints`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinWeight {
    pub joint: u32,
    pub weight: f32,
}

/// Skin modifier contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinBinding {
    /// Bone nodes
    pub joints: Vec<NodeId>,
    /// Influences per source position
    pub influences: Vec<Vec<SkinWeight>>,
}

/// One morph target
#[derive(Debug, Clone, PartialEq)]
pub struct MorphChannel {
    pub name: Option<String>,
    pub active: bool,
    /// Target positions in object space, one per base mesh position
    pub positions: Vec<[f32; 3]>,
}

/// Morph modifier contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphDeformer {
    pub channels: Vec<MorphChannel>,
}

// ============================================================================
// Reader trait
// ============================================================================

/// Host scene access
///
/// Time-dependent queries take an explicit evaluation time. Samplers also move
/// the host's current-time cursor to the sample time (through [`TimeGuard`])
/// so hosts that only evaluate "now" stay consistent.
pub trait SceneReader {
    fn contains(&self, node: NodeId) -> bool;
    fn node_name(&self, node: NodeId) -> &str;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    /// Nodes without a parent, in scene order
    fn top_level_nodes(&self) -> Vec<NodeId>;

    fn world_transform(&self, node: NodeId, time: f32) -> Mat4;
    /// World transform including the object offset (pivot) of the node
    fn object_transform(&self, node: NodeId, time: f32) -> Mat4;

    fn has_mesh(&self, node: NodeId) -> bool;
    /// Full geometry read, honouring the current skin modifier state
    fn mesh(&self, node: NodeId, space: Space, time: f32) -> Result<SourceMesh, ExportError>;
    /// Live (possibly deformed) positions only
    fn positions(&self, node: NodeId, space: Space, time: f32)
    -> Result<Vec<[f32; 3]>, ExportError>;
    /// Object bounds in host units
    fn bounding_box(&self, node: NodeId, space: Space, time: f32) -> Option<BoundingBox>;

    fn skin(&self, node: NodeId) -> Option<SkinBinding>;
    fn morph(&self, node: NodeId) -> Option<MorphDeformer>;
    /// Channel weight in `0.0..=1.0`
    fn morph_weight(&self, node: NodeId, channel: usize, time: f32) -> f32;

    /// Frames per second
    fn frame_rate(&self) -> f32;
    fn current_time(&self) -> f32;
    fn set_current_time(&mut self, time: f32);

    fn skin_modifier_count(&self, node: NodeId) -> usize;
    fn skin_modifier_enabled(&self, node: NodeId, modifier: usize) -> bool;
    fn set_skin_modifier_enabled(&mut self, node: NodeId, modifier: usize, enabled: bool);

    /// Walk `node` and its ancestors, nearest first
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }
}

// ============================================================================
// Scoped guards
// ============================================================================

/// Restores the host's current time on drop
pub struct TimeGuard<'a, R: SceneReader + ?Sized> {
    reader: &'a mut R,
    saved: f32,
}

impl<'a, R: SceneReader + ?Sized> TimeGuard<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        let saved = reader.current_time();
        Self { reader, saved }
    }
}

impl<R: SceneReader + ?Sized> Deref for TimeGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.reader
    }
}

impl<R: SceneReader + ?Sized> DerefMut for TimeGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.reader
    }
}

impl<R: SceneReader + ?Sized> Drop for TimeGuard<'_, R> {
    fn drop(&mut self) {
        self.reader.set_current_time(self.saved);
    }
}

/// Disables every enabled skin modifier of a node; re-enables exactly those on drop
pub struct SkinDisableGuard<'a, R: SceneReader + ?Sized> {
    reader: &'a mut R,
    node: NodeId,
    disabled: Vec<usize>,
}

impl<'a, R: SceneReader + ?Sized> SkinDisableGuard<'a, R> {
    pub fn new(reader: &'a mut R, node: NodeId) -> Self {
        let disabled: Vec<usize> = (0..reader.skin_modifier_count(node))
            .filter(|&m| reader.skin_modifier_enabled(node, m))
            .collect();
        for &m in &disabled {
            reader.set_skin_modifier_enabled(node, m, false);
        }
        Self {
            reader,
            node,
            disabled,
        }
    }

    pub fn disabled_count(&self) -> usize {
        self.disabled.len()
    }
}

impl<R: SceneReader + ?Sized> Deref for SkinDisableGuard<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.reader
    }
}

impl<R: SceneReader + ?Sized> DerefMut for SkinDisableGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.reader
    }
}

impl<R: SceneReader + ?Sized> Drop for SkinDisableGuard<'_, R> {
    fn drop(&mut self) {
        for &m in &self.disabled {
            self.reader.set_skin_modifier_enabled(self.node, m, true);
        }
    }
}
