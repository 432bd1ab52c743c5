//! Per-source-vertex attribute storage
//!
//! [`VertexAttributeTable`] converts one `SourceMesh` into export units
//! (length-scaled, zero-snapped positions, unit normals, flipped V) and holds
//! per-position bone influences before welding.

use glam::Vec3;
use smallvec::SmallVec;

use crate::config::ExportParams;
use crate::error::ExportError;
use crate::scene::{NodeId, SkinBinding, SourceFace, SourceMesh};
use ogre_common::{BoneInfluence, MAX_BONE_INFLUENCES, snap3};

/// Influences of one source position
pub type Influences = SmallVec<[BoneInfluence; MAX_BONE_INFLUENCES]>;

/// Raw attributes of one mesh, ready for welding
#[derive(Debug, Clone, Default)]
pub struct VertexAttributeTable {
    /// Length-scaled, snapped positions
    pub positions: Vec<[f32; 3]>,
    /// Unit normals (negated for opposite surfaces)
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    /// One list per UV channel, V already flipped
    pub uv_channels: Vec<Vec<[f32; 2]>>,
    /// Per position, empty until a skin is applied
    pub influences: Vec<Influences>,
    pub faces: Vec<SourceFace>,
    pub opposite: bool,
}

impl VertexAttributeTable {
    pub fn from_source(mesh: SourceMesh, params: &ExportParams) -> Self {
        let lum = params.length_multiplier();
        let pos_eps = params.position_epsilon();
        let eps = params.epsilon;
        let sign = if mesh.opposite { -1.0 } else { 1.0 };

        let positions = mesh
            .positions
            .iter()
            .map(|p| snap3([p[0] * lum, p[1] * lum, p[2] * lum], pos_eps))
            .collect();

        let normals = mesh
            .normals
            .iter()
            .map(|n| {
                let n = Vec3::from(snap3(*n, eps)) * sign;
                snap3(n.normalize_or_zero().to_array(), eps)
            })
            .collect();

        let uv_channels = mesh
            .uv_channels
            .iter()
            .map(|channel| channel.iter().map(|uv| [uv[0], 1.0 - uv[1]]).collect())
            .collect();

        Self {
            influences: vec![Influences::new(); mesh.positions.len()],
            positions,
            normals,
            colors: mesh.colors,
            uv_channels,
            faces: mesh.faces,
            opposite: mesh.opposite,
        }
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Copy skin influences, mapping skin joint slots to exported bone ids
    ///
    /// Joints the skeleton did not export are dropped.
    pub fn apply_skin<F>(&mut self, skin: &SkinBinding, joint_index: F) -> Result<(), ExportError>
    where
        F: Fn(NodeId) -> Option<u16>,
    {
        if skin.influences.len() > self.positions.len() {
            return Err(ExportError::IndexOutOfRange {
                what: "skinned vertex",
                index: skin.influences.len() - 1,
                len: self.positions.len(),
            });
        }

        for (slot, weights) in self.influences.iter_mut().zip(&skin.influences) {
            slot.clear();
            for w in weights {
                ExportError::check_index("skin joint", w.joint as usize, skin.joints.len())?;
                if let Some(joint) = joint_index(skin.joints[w.joint as usize]) {
                    slot.push(BoneInfluence::new(joint, w.weight));
                }
            }
        }
        Ok(())
    }

    /// Rigid-skin fallback and influence rationalisation
    ///
    /// Positions without influences are bound to `fallback` at full weight.
    /// Non-positive weights are dropped, the four largest are kept and the
    /// rest renormalised to sum to one.
    pub fn cleanup_influences(&mut self, fallback: u16) {
        for slot in &mut self.influences {
            rationalise(slot);
            if slot.is_empty() {
                slot.push(BoneInfluence::rigid(fallback));
            }
        }
    }

    pub fn clear_influences(&mut self) {
        for slot in &mut self.influences {
            slot.clear();
        }
    }
}

fn rationalise(slot: &mut Influences) {
    slot.retain(|i| i.weight > 0.0);
    if slot.is_empty() {
        return;
    }

    // merge duplicate joints
    let mut merged = Influences::new();
    for inf in slot.iter() {
        match merged.iter_mut().find(|m| m.joint == inf.joint) {
            Some(m) => m.weight += inf.weight,
            None => merged.push(*inf),
        }
    }

    merged.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.joint.cmp(&b.joint)));
    merged.truncate(MAX_BONE_INFLUENCES);

    let total: f32 = merged.iter().map(|i| i.weight).sum();
    for inf in &mut merged {
        inf.weight /= total;
    }
    *slot = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SkinWeight;

    fn triangle() -> SourceMesh {
        SourceMesh {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.00001, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 2.0]],
            colors: vec![],
            uv_channels: vec![vec![[0.25, 0.25], [1.0, 0.0], [0.0, 1.0]]],
            faces: vec![SourceFace {
                positions: [0, 1, 2],
                normals: [0, 0, 0],
                colors: None,
                uvs: vec![[0, 1, 2]],
                material: 0,
            }],
            materials: vec![],
            opposite: false,
        }
    }

    #[test]
    fn test_units_snapping_and_uv_flip() {
        let params = ExportParams {
            length_unit: crate::config::UnitScale::Named(crate::config::LengthUnit::Mm),
            ..Default::default()
        };
        let table = VertexAttributeTable::from_source(triangle(), &params);

        assert_eq!(table.positions[1], [10.0, 0.0, 0.0]);
        assert_eq!(table.positions[2], [0.0, 10.0, 0.0]);
        assert_eq!(table.normals[0], [0.0, 0.0, 1.0]);
        assert_eq!(table.uv_channels[0][0], [0.25, 0.75]);
        assert_eq!(table.influences.len(), 3);
    }

    #[test]
    fn test_opposite_negates_normals() {
        let mut mesh = triangle();
        mesh.opposite = true;
        let table = VertexAttributeTable::from_source(mesh, &ExportParams::default());
        assert_eq!(table.normals[0], [0.0, 0.0, -1.0]);
        assert!(table.opposite);
    }

    #[test]
    fn test_rigid_fallback_for_unweighted() {
        let mut table = VertexAttributeTable::from_source(triangle(), &ExportParams::default());
        let skin = SkinBinding {
            joints: vec![NodeId(4), NodeId(5)],
            influences: vec![
                vec![SkinWeight { joint: 0, weight: 0.5 }, SkinWeight { joint: 1, weight: 0.5 }],
                vec![],
                vec![SkinWeight { joint: 1, weight: 0.0 }],
            ],
        };
        table
            .apply_skin(&skin, |node| Some(node.0 as u16 - 4))
            .unwrap();
        table.cleanup_influences(7);

        assert_eq!(table.influences[0].len(), 2);
        assert_eq!(table.influences[1].as_slice(), &[BoneInfluence::rigid(7)]);
        assert_eq!(table.influences[2].as_slice(), &[BoneInfluence::rigid(7)]);
    }

    #[test]
    fn test_rationalise_keeps_four_largest() {
        let mut slot: Influences = [0.1, 0.4, 0.05, 0.2, 0.25]
            .iter()
            .enumerate()
            .map(|(j, &w)| BoneInfluence::new(j as u16, w))
            .collect();
        rationalise(&mut slot);

        assert_eq!(slot.len(), 4);
        assert_eq!(slot[0].joint, 1);
        assert!(slot.iter().all(|i| i.joint != 2));
        let total: f32 = slot.iter().map(|i| i.weight).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_skin_joint_out_of_range() {
        let mut table = VertexAttributeTable::from_source(triangle(), &ExportParams::default());
        let skin = SkinBinding {
            joints: vec![NodeId(0)],
            influences: vec![vec![SkinWeight { joint: 3, weight: 1.0 }]],
        };
        let err = table.apply_skin(&skin, |_| Some(0)).unwrap_err();
        assert!(matches!(err, ExportError::IndexOutOfRange { what: "skin joint", .. }));
    }
}
