//! Output writers
//!
//! The export core hands finished resources to an [`ExportSink`]. The bundled
//! [`JsonSink`] writes one JSON document per resource next to a raw
//! interleaved vertex buffer.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::exporter::ExportOutput;
use crate::material::Material;
use crate::mesh::ExportedMesh;
use crate::skeleton::ExportedSkeleton;
use ogre_common::{VertexDeclaration, WeldedVertex, pack_vertex_data};

pub const MESH_EXT: &str = "mesh.json";
pub const SKELETON_EXT: &str = "skeleton.json";
pub const MATERIAL_EXT: &str = "material.json";
pub const VERTEX_BUFFER_EXT: &str = "vbuf";

/// Destination for exported resources
pub trait ExportSink {
    fn write_mesh(&mut self, mesh: &ExportedMesh) -> Result<()>;
    fn write_skeleton(&mut self, skeleton: &ExportedSkeleton) -> Result<()>;
    fn write_materials(&mut self, name: &str, materials: &[Material]) -> Result<()>;
}

/// Hand every present resource of `output` to `sink`
pub fn write_output<S: ExportSink + ?Sized>(
    sink: &mut S,
    name: &str,
    output: &ExportOutput,
) -> Result<()> {
    if let Some(mesh) = &output.mesh {
        sink.write_mesh(mesh)?;
    }
    if let Some(skeleton) = &output.skeleton {
        sink.write_skeleton(skeleton)?;
    }
    if !output.materials.is_empty() {
        sink.write_materials(name, &output.materials)?;
    }
    Ok(())
}

/// Write `value` as pretty-printed JSON
pub fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write interleaved vertex data (f32 LE, colours as unorm8x4)
pub fn write_vertex_buffer<W: Write>(
    w: &mut W,
    declaration: &VertexDeclaration,
    vertices: &[WeldedVertex],
) -> Result<()> {
    w.write_all(&(vertices.len() as u32).to_le_bytes())?;
    w.write_all(&declaration.stride.to_le_bytes())?;
    w.write_all(&pack_vertex_data(declaration, vertices))?;
    Ok(())
}

/// Writes `<name>.mesh.json`, `<name>.skeleton.json`, `<name>.material.json`
/// and `<name>.vbuf` into a directory
pub struct JsonSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn create(&mut self, name: &str, ext: &str) -> Result<BufWriter<File>> {
        let path = self.dir.join(format!("{}.{}", name, ext));
        let file =
            File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        tracing::info!("Writing {:?}", path);
        self.written.push(path);
        Ok(BufWriter::new(file))
    }
}

impl ExportSink for JsonSink {
    fn write_mesh(&mut self, mesh: &ExportedMesh) -> Result<()> {
        let mut w = self.create(&mesh.name, MESH_EXT)?;
        write_json(&mut w, mesh)?;
        w.flush()?;

        if mesh.uses_shared_geometry() {
            let mut w = self.create(&mesh.name, VERTEX_BUFFER_EXT)?;
            write_vertex_buffer(&mut w, &mesh.declaration, &mesh.shared_vertices)?;
            w.flush()?;
        }
        Ok(())
    }

    fn write_skeleton(&mut self, skeleton: &ExportedSkeleton) -> Result<()> {
        let mut w = self.create(&skeleton.name, SKELETON_EXT)?;
        write_json(&mut w, skeleton)?;
        w.flush()?;
        Ok(())
    }

    fn write_materials(&mut self, name: &str, materials: &[Material]) -> Result<()> {
        let mut w = self.create(name, MATERIAL_EXT)?;
        write_json(&mut w, materials)?;
        w.flush()?;
        Ok(())
    }
}
