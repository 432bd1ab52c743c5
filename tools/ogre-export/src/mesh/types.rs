//! Mesh output types

use hashbrown::HashMap;
use serde::Serialize;

use crate::mesh::shared::SharedGeometryMap;
use crate::scene::NodeId;
use ogre_common::{
    Animation, BoundingBox, Face, IndexBuffer, Pose, VertexDeclaration, WeldedVertex, merge_bounds,
};

/// Extra per-node bounds collected while sampling animation
pub type NodeBounds = HashMap<NodeId, BoundingBox>;

/// One material's triangles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submesh {
    /// Source node name
    pub name: String,
    pub material: String,
    /// Dedicated vertex buffer; empty when the mesh uses shared geometry
    pub vertices: Vec<WeldedVertex>,
    pub indices: IndexBuffer,
    pub bounds: Option<BoundingBox>,
    #[serde(skip)]
    pub faces: Vec<Face>,
    #[serde(skip)]
    pub node: NodeId,
    /// Index of the blend-shape source this submesh's poses came from
    pub pose_source: Option<usize>,
}

impl Submesh {
    pub fn index_count(&self) -> usize {
        self.faces.len() * 3
    }
}

/// Mesh output handed to writers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedMesh {
    pub name: String,
    /// Linked skeleton name
    pub skeleton: Option<String>,
    pub declaration: VertexDeclaration,
    /// Shared vertex buffer; empty when every submesh owns its vertices
    pub shared_vertices: Vec<WeldedVertex>,
    pub geometry_map: SharedGeometryMap,
    pub submeshes: Vec<Submesh>,
    /// Poses in global index order
    pub poses: Vec<Pose>,
    pub animations: Vec<Animation>,
    pub bounds: Option<BoundingBox>,
}

impl ExportedMesh {
    pub fn uses_shared_geometry(&self) -> bool {
        !self.shared_vertices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.shared_vertices.len() + self.submeshes.iter().map(|s| s.vertices.len()).sum::<usize>()
    }

    /// Merge extra node bounds into each submesh and recompute the mesh box
    pub fn grow_bounds(&mut self, extra: &NodeBounds) {
        for submesh in &mut self.submeshes {
            merge_bounds(&mut submesh.bounds, extra.get(&submesh.node).copied());
        }
        self.recompute_bounds();
    }

    pub fn recompute_bounds(&mut self) {
        let mut bounds = None;
        for submesh in &self.submeshes {
            merge_bounds(&mut bounds, submesh.bounds);
        }
        self.bounds = bounds;
    }
}
