//! Per-export material set
//!
//! Materials are deduplicated by their final name. The set lives in the
//! export context, so two exports in one process never share state.

use hashbrown::HashMap;
use serde::Serialize;

use crate::scene::MaterialSlot;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub texture: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialSet {
    prefix: String,
    materials: Vec<Material>,
    by_name: HashMap<String, usize>,
}

impl MaterialSet {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    /// Exported name for a source material name
    pub fn material_name(&self, name: &str) -> String {
        let name = if name.is_empty() { "default" } else { name };
        let full = if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        };
        full.replace(':', "_")
    }

    /// Register a slot and return its exported name; the first slot with a
    /// given name wins
    pub fn add(&mut self, slot: &MaterialSlot) -> String {
        let name = self.material_name(&slot.name);
        if !self.by_name.contains_key(&name) {
            self.by_name.insert(name.clone(), self.materials.len());
            self.materials.push(Material {
                name: name.clone(),
                ambient: slot.ambient,
                diffuse: slot.diffuse,
                specular: slot.specular,
                emissive: slot.emissive,
                texture: slot.texture.clone(),
            });
        }
        name
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name).map(|&i| &self.materials[i])
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn into_materials(self) -> Vec<Material> {
        self.materials
    }
}
