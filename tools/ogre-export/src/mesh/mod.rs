//! Geometry consolidation
//!
//! Nodes are fed one at a time:
//! attribute table -> welder -> (shared buffer | per-submesh buffers).
//! [`MeshBuilder::finish`] then picks index widths and computes bounds.

pub mod attributes;
pub mod shared;
pub mod submesh;
mod types;
pub mod weld;

pub use attributes::VertexAttributeTable;
pub use shared::{GeometryMapEntry, SharedGeometryBuilder, SharedGeometryMap};
pub use submesh::{SubmeshPart, partition};
pub use types::{ExportedMesh, NodeBounds, Submesh};
pub use weld::{WeldOptions, WeldedMesh, weld};

use std::ops::Range;
use tracing::{info, warn};

use crate::config::ExportParams;
use crate::error::ExportError;
use crate::material::MaterialSet;
use crate::scene::{BIND_TIME, NodeId, SceneReader, Space};
use crate::skeleton::Skeleton;
use ogre_common::{BoundingBox, IndexBuffer, VertexDeclaration};

pub struct MeshBuilder<'p> {
    params: &'p ExportParams,
    shared: SharedGeometryBuilder,
    submeshes: Vec<Submesh>,
    uv_channels: usize,
    has_colors: bool,
}

impl<'p> MeshBuilder<'p> {
    pub fn new(params: &'p ExportParams) -> Self {
        Self {
            params,
            shared: SharedGeometryBuilder::new(),
            submeshes: Vec::new(),
            uv_channels: 0,
            has_colors: false,
        }
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Weld one node and append its submeshes; returns their index range
    pub fn add_node<R: SceneReader + ?Sized>(
        &mut self,
        reader: &R,
        node: NodeId,
        skeleton: Option<&Skeleton>,
        materials: &mut MaterialSet,
    ) -> Result<Range<usize>, ExportError> {
        let params = self.params;
        let first = self.submeshes.len();
        let name = reader.node_name(node).to_string();

        let space = Space::from_world_flag(params.world_space);
        let mut source = reader.mesh(node, space, BIND_TIME)?;
        // skinned positions live in skeleton space, which starts at the world origin
        if space == Space::Object && skeleton.is_some() && reader.skin(node).is_some() {
            source.positions = reader.positions(node, Space::World, BIND_TIME)?;
        }
        if source.faces.is_empty() {
            warn!("Node '{}' has no triangles, skipping", name);
            return Ok(first..first);
        }
        let slots = source.materials.clone();
        self.has_colors |= !source.colors.is_empty();
        self.uv_channels = self.uv_channels.max(source.uv_channels.len());

        let mut table = VertexAttributeTable::from_source(source, params);
        match skeleton {
            Some(skeleton) if params.export_bone_assignments => {
                if let Some(skin) = reader.skin(node) {
                    table.apply_skin(&skin, |joint| skeleton.joint_index(joint))?;
                }
                table.cleanup_influences(skeleton.rigid_joint(reader, node));
            }
            _ => table.clear_influences(),
        }

        let base = if params.shared_geometry {
            self.shared.base()
        } else {
            0
        };
        let options = WeldOptions {
            normals: params.export_normals,
            colors: params.export_colors,
            texcoords: params.export_texcoords,
            epsilon: params.epsilon,
            base,
        };
        let welded = weld(&table, &options)?;
        let parts = partition(&welded, params.shared_geometry, base);

        info!(
            "Node '{}': {} positions -> {} vertices, {} faces, {} submeshes",
            name,
            table.position_count(),
            welded.vertices.len(),
            welded.faces.len(),
            parts.len()
        );

        if params.shared_geometry {
            self.shared.append(node, welded.vertices);
        }

        for part in parts {
            let slot = slots.get(part.material as usize).ok_or(ExportError::IndexOutOfRange {
                what: "material",
                index: part.material as usize,
                len: slots.len(),
            })?;
            self.submeshes.push(Submesh {
                name: name.clone(),
                material: materials.add(slot),
                vertices: part.vertices,
                indices: IndexBuffer::U16(Vec::new()),
                bounds: None,
                faces: part.faces,
                node,
                pose_source: None,
            });
        }

        Ok(first..self.submeshes.len())
    }

    /// Pick index widths, compute bounds and the vertex declaration
    pub fn finish(self, name: &str, skeleton: Option<&str>) -> ExportedMesh {
        let params = self.params;
        let (shared_vertices, geometry_map) = self.shared.finish();
        let mut submeshes = self.submeshes;

        for submesh in &mut submeshes {
            let vertex_count = if params.shared_geometry {
                shared_vertices.len()
            } else {
                submesh.vertices.len()
            };
            let wide = IndexBuffer::requires_32bit(
                params.shared_geometry,
                vertex_count,
                submesh.index_count(),
            );
            submesh.indices = IndexBuffer::from_faces(&submesh.faces, wide);

            submesh.bounds = if params.shared_geometry {
                BoundingBox::from_points(
                    submesh
                        .faces
                        .iter()
                        .flat_map(|f| f.0)
                        .map(|i| shared_vertices[i as usize].position),
                )
            } else {
                BoundingBox::from_points(submesh.vertices.iter().map(|v| v.position))
            };
        }

        let declaration = VertexDeclaration::new(
            params.export_normals,
            params.export_colors && self.has_colors,
            if params.export_texcoords {
                self.uv_channels
            } else {
                0
            },
        );

        let mut mesh = ExportedMesh {
            name: name.to_string(),
            skeleton: skeleton.map(str::to_string),
            declaration,
            shared_vertices,
            geometry_map,
            submeshes,
            poses: Vec::new(),
            animations: Vec::new(),
            bounds: None,
        };
        mesh.recompute_bounds();
        mesh
    }
}
