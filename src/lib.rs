//! Conversion of volume-encoded surface segmentations into FreeSurfer surface annotations.
//!
//! The crate reads the FreeSurfer file formats involved (colortables, MGH/MGZ volumes,
//! surf meshes and annot files) and assigns each vertex of a subject's surface the
//! colortable entry of its segmentation value. The `mris_seg2annot` binary wraps this
//! into a command line tool.

pub mod config;
pub mod error;
pub mod fs_annot;
pub mod fs_colortable;
pub mod fs_mgh;
pub mod fs_surface;
pub mod seg2annot;
pub mod util;

pub use config::{Seg2AnnotArgs, Seg2AnnotConfig};
pub use error::{Result, Seg2AnnotError};
pub use fs_annot::{read_annot, write_annot, FsAnnot};
pub use fs_colortable::{read_colortable, FsColortable, UNKNOWN_ANNOTATION};
pub use fs_mgh::{read_mgh, write_mgh, FsMgh, FsMghHeader};
pub use fs_surface::{read_surf, write_surf, BrainMesh, FsSurface, FsSurfaceHeader};
pub use seg2annot::{annotation_codes, run, AnnotatedSurface};
