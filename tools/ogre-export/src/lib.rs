//! ogre-export library
//!
//! Host-independent export core: welds raw DCC geometry into indexed vertex
//! buffers, builds skeletons with bind-relative transforms, extracts poses
//! from morph channels and samples skeletal, pose and vertex clips. Results
//! are handed to an [`formats::ExportSink`].

pub mod animation;
pub mod blendshape;
pub mod config;
pub mod error;
pub mod exporter;
pub mod formats;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;

pub use config::{ClipDef, ExportParams, LengthUnit, UnitScale};
pub use error::{ClipError, ExportError};
pub use exporter::{ExportContext, ExportOutput, ExportReport, Exporter};
pub use formats::{ExportSink, JsonSink, write_output};
pub use mesh::ExportedMesh;
pub use scene::{NodeId, SceneReader, SceneSnapshot, TimeGuard};
pub use skeleton::ExportedSkeleton;
