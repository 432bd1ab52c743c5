//! Export data model
//!
//! Output structures handed from the export core to mesh and skeleton
//! writers. The byte layout of the final files belongs to the writer; these
//! types only fix the content and its invariants.

mod animation;
mod mesh;
mod pose;
mod skeleton;

pub use animation::*;
pub use mesh::*;
pub use pose::*;
pub use skeleton::*;
