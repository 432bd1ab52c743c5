//! Grouping welded triangles into submeshes by material slot

use hashbrown::HashMap;

use crate::mesh::weld::WeldedMesh;
use ogre_common::{Face, WeldedVertex};

/// Triangles of one material slot
#[derive(Debug, Clone, PartialEq)]
pub struct SubmeshPart {
    /// Slot in the source node's material list
    pub material: u32,
    /// Local vertices in first-use order; empty in shared mode
    pub vertices: Vec<WeldedVertex>,
    /// Indices into `vertices`, or into the shared buffer in shared mode
    pub faces: Vec<Face>,
}

/// Split `welded` by material slot, in ascending slot order
///
/// With `shared` set the faces keep their shared-buffer indices. Otherwise
/// each part gets its own compact vertex list and faces are re-indexed into
/// it (`base` is subtracted first).
pub fn partition(welded: &WeldedMesh, shared: bool, base: u32) -> Vec<SubmeshPart> {
    let mut slots: Vec<u32> = welded.faces.iter().map(|f| f.material).collect();
    slots.sort_unstable();
    slots.dedup();

    slots
        .into_iter()
        .map(|material| {
            let faces = welded
                .faces
                .iter()
                .filter(|f| f.material == material)
                .map(|f| f.face);

            if shared {
                return SubmeshPart {
                    material,
                    vertices: Vec::new(),
                    faces: faces.collect(),
                };
            }

            let mut remap: HashMap<u32, u32> = HashMap::new();
            let mut vertices = Vec::new();
            let faces = faces
                .map(|face| {
                    Face(face.0.map(|index| {
                        let welded_idx = index - base;
                        *remap.entry(welded_idx).or_insert_with(|| {
                            vertices.push(welded.vertices[welded_idx as usize].clone());
                            (vertices.len() - 1) as u32
                        })
                    }))
                })
                .collect();

            SubmeshPart {
                material,
                vertices,
                faces,
            }
        })
        .collect()
}
