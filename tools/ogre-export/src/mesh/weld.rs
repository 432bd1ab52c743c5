//! Vertex welding
//!
//! Every face corner resolves to a [`WeldedVertex`]. Corners sharing a source
//! position share a vertex only when every exported attribute matches within
//! epsilon; otherwise the position is split. Vertices created for one position
//! form a chain through `next` links:
//! - [`UNVISITED`] on a position head that has no vertex yet
//! - [`TERMINAL`] at the end of a chain

use crate::error::ExportError;
use crate::mesh::attributes::VertexAttributeTable;
use crate::scene::SourceFace;
use ogre_common::{Face, WeldedVertex};

/// Chain head value for a position no corner has referenced yet
pub const UNVISITED: i32 = -2;
/// Chain link value for the last vertex of a position
pub const TERMINAL: i32 = -1;

/// Which attributes take part in the comparison
#[derive(Debug, Clone, Copy)]
pub struct WeldOptions {
    pub normals: bool,
    pub colors: bool,
    pub texcoords: bool,
    pub epsilon: f32,
    /// Added to every face index (start of this mesh in a shared buffer)
    pub base: u32,
}

/// Welded triangle and its material slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldedFace {
    pub face: Face,
    pub material: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldedMesh {
    /// Vertices in first-use order
    pub vertices: Vec<WeldedVertex>,
    /// Faces indexing `vertices` (offset by `WeldOptions::base`)
    pub faces: Vec<WeldedFace>,
    /// Chain link per vertex
    pub next: Vec<i32>,
}

/// Candidate attributes of one face corner
struct Corner {
    normal: [f32; 3],
    color: [f32; 4],
    uvs: Vec<[f32; 2]>,
}

impl Corner {
    fn matches(&self, v: &WeldedVertex, options: &WeldOptions) -> bool {
        let eps = options.epsilon;
        if options.normals && !approx_eq(&self.normal, &v.normal, eps) {
            return false;
        }
        if options.colors && !approx_eq(&self.color, &v.color, eps) {
            return false;
        }
        if options.texcoords {
            if self.uvs.len() != v.uvs.len() {
                return false;
            }
            for (a, b) in self.uvs.iter().zip(&v.uvs) {
                if !approx_eq(a, b, eps) {
                    return false;
                }
            }
        }
        true
    }
}

#[inline]
fn approx_eq(a: &[f32], b: &[f32], eps: f32) -> bool {
    a.iter().zip(b).all(|(x, y)| (x - y).abs() <= eps)
}

fn lookup<T: Copy>(list: &[T], what: &'static str, index: u32) -> Result<T, ExportError> {
    list.get(index as usize)
        .copied()
        .ok_or(ExportError::IndexOutOfRange {
            what,
            index: index as usize,
            len: list.len(),
        })
}

/// Weld the faces of `table` into a deduplicated vertex list
///
/// Out-of-range attribute indices fail the whole mesh.
pub fn weld(table: &VertexAttributeTable, options: &WeldOptions) -> Result<WeldedMesh, ExportError> {
    let mut heads = vec![UNVISITED; table.position_count()];
    let mut mesh = WeldedMesh {
        vertices: Vec::with_capacity(table.position_count()),
        faces: Vec::with_capacity(table.faces.len()),
        next: Vec::with_capacity(table.position_count()),
    };

    for source in &table.faces {
        let mut indices = [0u32; 3];
        for (corner_idx, slot) in indices.iter_mut().enumerate() {
            let pos_idx = source.positions[corner_idx];
            let position = lookup(&table.positions, "position", pos_idx)?;
            let corner = read_corner(table, source, corner_idx, options)?;

            let local = resolve(&mut heads, &mut mesh, pos_idx, position, corner, table, options);
            *slot = options.base + local;
        }

        let face = if table.opposite {
            Face(indices).flipped()
        } else {
            Face(indices)
        };
        mesh.faces.push(WeldedFace {
            face,
            material: source.material,
        });
    }

    Ok(mesh)
}

/// Attributes that are not exported are neither read nor range-checked
fn read_corner(
    table: &VertexAttributeTable,
    face: &SourceFace,
    corner: usize,
    options: &WeldOptions,
) -> Result<Corner, ExportError> {
    let normal = if table.normals.is_empty() {
        [0.0; 3]
    } else {
        lookup(&table.normals, "normal", face.normals[corner])?
    };

    let color = match face.colors {
        Some(colors) if options.colors && !table.colors.is_empty() => {
            lookup(&table.colors, "color", colors[corner])?
        }
        _ => [1.0; 4],
    };

    if !options.texcoords {
        return Ok(Corner {
            normal,
            color,
            uvs: Vec::new(),
        });
    }
    let mut uvs = Vec::with_capacity(table.uv_channels.len());
    for (channel_idx, channel) in table.uv_channels.iter().enumerate() {
        let index = face
            .uvs
            .get(channel_idx)
            .map(|tri| tri[corner])
            .ok_or(ExportError::IndexOutOfRange {
                what: "uv channel",
                index: channel_idx,
                len: face.uvs.len(),
            })?;
        uvs.push(lookup(channel, "uv", index)?);
    }

    Ok(Corner { normal, color, uvs })
}

/// Find or create the vertex for one corner; returns its local index
fn resolve(
    heads: &mut [i32],
    mesh: &mut WeldedMesh,
    pos_idx: u32,
    position: [f32; 3],
    corner: Corner,
    table: &VertexAttributeTable,
    options: &WeldOptions,
) -> u32 {
    let head = heads[pos_idx as usize];

    let mut tail = None;
    if head != UNVISITED {
        let mut link = head;
        while link != TERMINAL {
            let idx = link as usize;
            if corner.matches(&mesh.vertices[idx], options) {
                return idx as u32;
            }
            tail = Some(idx);
            link = mesh.next[idx];
        }
    }

    let new_idx = mesh.vertices.len();
    mesh.vertices.push(WeldedVertex {
        position,
        normal: corner.normal,
        color: corner.color,
        uvs: corner.uvs,
        influences: table.influences[pos_idx as usize].to_vec(),
        source_index: pos_idx,
    });
    mesh.next.push(TERMINAL);

    match tail {
        Some(t) => mesh.next[t] = new_idx as i32,
        None => heads[pos_idx as usize] = new_idx as i32,
    }
    new_idx as u32
}
