//! export.toml parsing
//!
//! One immutable [`ExportParams`] value is built per export and passed by
//! reference to every stage. Each toggle documents where it is consumed.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use ogre_common::DEFAULT_EPSILON;

/// Target length unit; host scenes are authored in centimetres
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    Mm,
    #[default]
    Cm,
    M,
    In,
    Ft,
    Yd,
}

impl LengthUnit {
    /// Multiplier applied to every host length
    pub fn multiplier(self) -> f32 {
        match self {
            LengthUnit::Mm => 10.0,
            LengthUnit::Cm => 1.0,
            LengthUnit::M => 0.01,
            LengthUnit::In => 1.0 / 2.54,
            LengthUnit::Ft => 1.0 / 30.48,
            LengthUnit::Yd => 1.0 / 91.44,
        }
    }
}

/// `length_unit` setting: a named unit or a raw multiplier
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UnitScale {
    Named(LengthUnit),
    Multiplier(f32),
}

impl Default for UnitScale {
    fn default() -> Self {
        UnitScale::Named(LengthUnit::default())
    }
}

impl UnitScale {
    pub fn multiplier(self) -> f32 {
        match self {
            UnitScale::Named(unit) => unit.multiplier(),
            UnitScale::Multiplier(m) => m,
        }
    }
}

/// Clip definition: `[start, stop]` sampled every `rate` seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClipDef {
    pub name: String,
    pub start: f32,
    pub stop: f32,
    pub rate: f32,
}

/// Export toggles and clip lists
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportParams {
    /// Unit all positions, translations and offsets are converted to
    pub length_unit: UnitScale,

    /// Produce mesh output at all
    pub export_mesh: bool,
    /// Produce the material set
    pub export_material: bool,
    /// Build a skeleton from skin bones (and inject a root when none is found)
    pub export_skeleton: bool,
    /// Keep bone influences on vertices; enables rigid-skin cleanup
    pub export_bone_assignments: bool,
    /// Compare and emit normals
    pub export_normals: bool,
    /// Compare and emit vertex colours
    pub export_colors: bool,
    /// Compare and emit texture coordinates
    pub export_texcoords: bool,
    /// Extract morph channels as poses
    pub export_blend_shapes: bool,

    pub export_skeletal_animations: bool,
    pub export_pose_animations: bool,
    pub export_vertex_animations: bool,

    /// Read geometry and root bones in world space instead of object space
    pub world_space: bool,
    /// One vertex buffer for the whole mesh instead of one per submesh
    pub shared_geometry: bool,
    /// Strip scale from bone world matrices before computing local transforms
    pub normalize_scale: bool,

    /// Grow submesh bounds with the animated object bounds of skeletal clips
    pub skeleton_bounds: bool,
    /// Grow submesh bounds with morph target extents
    pub blend_shape_bounds: bool,
    /// Grow submesh bounds with the animated object bounds of vertex clips
    pub vertex_bounds: bool,

    /// Prepended to material names as `prefix/name`
    pub material_prefix: String,
    /// Zero-snapping threshold (position threshold is scaled by the unit multiplier)
    pub epsilon: f32,
    /// Negate angle-axis angles for the target engine's handedness
    pub negate_rotation_angle: bool,

    pub skeletal_clips: Vec<ClipDef>,
    pub pose_clips: Vec<ClipDef>,
    pub vertex_clips: Vec<ClipDef>,
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            length_unit: UnitScale::default(),
            export_mesh: true,
            export_material: true,
            export_skeleton: true,
            export_bone_assignments: true,
            export_normals: true,
            export_colors: false,
            export_texcoords: true,
            export_blend_shapes: true,
            export_skeletal_animations: false,
            export_pose_animations: false,
            export_vertex_animations: false,
            world_space: true,
            shared_geometry: true,
            normalize_scale: true,
            skeleton_bounds: false,
            blend_shape_bounds: false,
            vertex_bounds: false,
            material_prefix: String::new(),
            epsilon: DEFAULT_EPSILON,
            negate_rotation_angle: true,
            skeletal_clips: Vec::new(),
            pose_clips: Vec::new(),
            vertex_clips: Vec::new(),
        }
    }
}

impl ExportParams {
    /// Load and validate an export.toml file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export config: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid export config: {:?}", path))
    }

    /// Parse and validate TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let params: ExportParams = toml::from_str(content).context("Failed to parse TOML")?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        let lum = self.length_multiplier();
        if !lum.is_finite() || lum <= 0.0 {
            bail!("Length unit multiplier must be positive, got {}", lum);
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            bail!("epsilon must be a non-negative number, got {}", self.epsilon);
        }

        let clip_lists = [
            ("skeletal_clips", &self.skeletal_clips),
            ("pose_clips", &self.pose_clips),
            ("vertex_clips", &self.vertex_clips),
        ];
        for (list, clips) in clip_lists {
            for (i, clip) in clips.iter().enumerate() {
                if clip.name.trim().is_empty() {
                    bail!("{}[{}] has an empty name", list, i);
                }
            }
        }

        Ok(())
    }

    #[inline]
    pub fn length_multiplier(&self) -> f32 {
        self.length_unit.multiplier()
    }

    /// Snapping threshold for unit-scaled lengths
    #[inline]
    pub fn position_epsilon(&self) -> f32 {
        self.epsilon * self.length_multiplier()
    }

    /// Whether any skeletal clip needs sampling
    pub fn wants_skeletal_clips(&self) -> bool {
        self.export_skeleton && self.export_skeletal_animations && !self.skeletal_clips.is_empty()
    }

    pub fn wants_pose_clips(&self) -> bool {
        self.export_blend_shapes && self.export_pose_animations && !self.pose_clips.is_empty()
    }

    pub fn wants_vertex_clips(&self) -> bool {
        self.export_vertex_animations && !self.vertex_clips.is_empty()
    }
}
