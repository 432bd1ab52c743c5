//! Shared vertex buffer assembly
//!
//! In shared-geometry mode every source node is welded with its faces offset
//! by the current buffer length, then appended here. The map records which
//! contiguous range came from which node so vertex and pose animation can
//! re-read the right source later.

use serde::Serialize;

use crate::scene::NodeId;
use ogre_common::WeldedVertex;

/// One contiguous range of the shared buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeometryMapEntry {
    pub offset: u32,
    pub count: u32,
    pub node: NodeId,
    /// Index of the node's blend-shape source, if any
    pub pose_source: Option<usize>,
}

impl GeometryMapEntry {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.count) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SharedGeometryMap {
    entries: Vec<GeometryMapEntry>,
}

impl SharedGeometryMap {
    pub fn entries(&self) -> &[GeometryMapEntry] {
        &self.entries
    }

    pub fn entry_for(&self, node: NodeId) -> Option<&GeometryMapEntry> {
        self.entries.iter().find(|e| e.node == node)
    }

    pub fn set_pose_source(&mut self, node: NodeId, source: usize) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.node == node) {
            entry.pose_source = Some(source);
        }
    }
}

#[derive(Debug, Default)]
pub struct SharedGeometryBuilder {
    vertices: Vec<WeldedVertex>,
    map: SharedGeometryMap,
}

impl SharedGeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next node's faces must be welded with
    pub fn base(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Append one node's welded vertices
    pub fn append(&mut self, node: NodeId, vertices: Vec<WeldedVertex>) -> GeometryMapEntry {
        let entry = GeometryMapEntry {
            offset: self.base(),
            count: vertices.len() as u32,
            node,
            pose_source: None,
        };
        self.vertices.extend(vertices);
        self.map.entries.push(entry);
        entry
    }

    pub fn finish(self) -> (Vec<WeldedVertex>, SharedGeometryMap) {
        (self.vertices, self.map)
    }
}
