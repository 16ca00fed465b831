//! Conversion of a volume-encoded surface segmentation into a surface annotation.
//!
//! Every vertex of the target surface gets the annotation code of the colortable entry
//! whose structure index equals the vertex's segmentation value. Values without an entry
//! are mapped to [`UNKNOWN_ANNOTATION`].

use log::{debug, info, trace, warn};

use std::path::Path;

use crate::config::Seg2AnnotConfig;
use crate::error::{Result, Seg2AnnotError};
use crate::fs_annot::{write_annot_data, FsAnnot};
use crate::fs_colortable::{read_colortable, FsColortable, UNKNOWN_ANNOTATION};
use crate::fs_mgh::{label_range, read_mgh};
use crate::fs_surface::{read_surf, FsSurface};
use crate::util::write_file_atomically;


/// A surface together with one annotation code per vertex. The colortable is borrowed, it is only needed to write the annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedSurface<'ct> {
    pub surface: FsSurface,
    pub annotation: Vec<i32>,
    pub colortable: &'ct FsColortable,
}

impl<'ct> AnnotatedSurface<'ct> {

    /// Attach a colortable to a surface. All vertices start out with the unknown annotation.
    pub fn new(surface: FsSurface, colortable: &'ct FsColortable) -> AnnotatedSurface<'ct> {
        let num_vertices = surface.mesh.num_vertices();
        AnnotatedSurface {
            surface,
            annotation: vec![UNKNOWN_ANNOTATION; num_vertices],
            colortable,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.annotation.len()
    }

    /// Set the annotation of each vertex from its segmentation value. Returns the number of vertices whose value is not in the colortable.
    ///
    /// The segmentation must have at least one value per vertex. Extra values are ignored.
    pub fn assign(&mut self, segmentation: &[i32]) -> Result<usize> {
        let num_vertices = self.num_vertices();
        if segmentation.len() < num_vertices {
            return Err(Seg2AnnotError::SegmentationTooShort(segmentation.len(), num_vertices));
        }
        if segmentation.len() > num_vertices {
            warn!("Segmentation has {} values, but the surface has only {} vertices. Ignoring the extra values.",
                segmentation.len(), num_vertices);
        }
        if let Some((min, max)) = label_range(&segmentation[..num_vertices]) {
            debug!("Segmentation values range from {} to {}.", min, max);
        }

        let codes = annotation_codes(&segmentation[..num_vertices], self.colortable);
        for (vtxno, (segid, code)) in segmentation.iter().zip(codes.iter()).enumerate() {
            trace!("{:5} {:2} {:8} {}", vtxno, segid, code, self.colortable.name_for_label(*code).unwrap_or("-"));
        }
        let num_unknown = codes.iter().filter(|&&code| code == UNKNOWN_ANNOTATION).count();
        self.annotation = codes;

        if num_unknown > 0 {
            warn!("{} of {} vertices have a segmentation value without colortable entry, they are annotated as unknown ({}).",
                num_unknown, num_vertices, UNKNOWN_ANNOTATION);
        }
        Ok(num_unknown)
    }

    /// Write the annotation, with an embedded copy of the colortable. Nothing is left at `path` if writing fails.
    pub fn write_annot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let vertex_indices: Vec<i32> = (0..self.num_vertices() as i32).collect();
        write_file_atomically(path, |output| write_annot_data(output, &vertex_indices, &self.annotation, self.colortable))
    }

    /// Get an owned [`FsAnnot`] of the annotation.
    pub fn to_annot(&self) -> FsAnnot {
        FsAnnot {
            vertex_indices: (0..self.num_vertices() as i32).collect(),
            vertex_labels: self.annotation.clone(),
            colortable: self.colortable.clone(),
        }
    }
}


/// Compute the annotation codes for a segmentation, one per value. Does not modify the colortable.
pub fn annotation_codes(segmentation: &[i32], colortable: &FsColortable) -> Vec<i32> {
    let lookup = colortable.annotation_lookup();
    segmentation.iter()
        .map(|segid| lookup.get(segid).copied().unwrap_or(UNKNOWN_ANNOTATION))
        .collect()
}


/// Run a complete conversion: read colortable, segmentation and surface, assign and write the annotation.
pub fn run(config: &Seg2AnnotConfig) -> Result<()> {
    info!("Reading ctab {}", config.ctab.display());
    let colortable = read_colortable(&config.ctab)?;
    debug!("{}", colortable);

    info!("Reading surface seg {}", config.seg.display());
    let segmentation = read_mgh(&config.seg)?.vertex_labels()?;

    let surface_path = config.surface_path();
    info!("Reading surface {}", surface_path.display());
    let surface = read_surf(&surface_path)?;
    debug!("{}", surface.mesh);

    let mut annotated = AnnotatedSurface::new(surface, &colortable);
    annotated.assign(&segmentation)?;

    info!("Writing annot to {}", config.annot.display());
    annotated.write_annot(&config.annot)
}
