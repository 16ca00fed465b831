//! Functions for managing FreeSurfer brain surface parcellations in annot files.
//!
//! These files assign each vertex of a brain surface mesh to exactly one brain region
//! or label. A so-called colortable contains data on the regions, including the region's
//! name, an RGB display color, and a unique identifier.

use byteordered::ByteOrdered;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::error::{Seg2AnnotError, Result};
use crate::fs_colortable::{FsColortable, COLORTABLE_VERSION};
use crate::util::{capped_capacity, write_file_atomically};

/// The tag that announces the colortable after the vertex data.
pub const TAG_OLD_COLORTABLE: i32 = 1;


/// Models a FreeSurfer brain surface parcellation from an annot file. This is the result of applying a brain atlas (like Desikan-Killiani) to a subject. The `vertex_indices` are the 0-based indices used in FreeSurfer and should be ignored. The `vertex_labels` field contains the mesh vertices in order, and assigns to each vertex a brain region using the `label` field (not the `id` field!) from the `colortable`. The field `colortable` contains an [`FsColortable`] struct that describes the brain regions.
#[derive(Debug, Clone, PartialEq)]
pub struct FsAnnot {
    pub vertex_indices: Vec<i32>, // 0-based indices, not really needed as all vertices need to be covered in order.
    pub vertex_labels: Vec<i32>,
    pub colortable: FsColortable,
}

impl FsAnnot {
    /// Read an FsAnnot instance from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
        let file = BufReader::new(File::open(path)?);
        FsAnnot::from_reader(file)
    }

    /// Read an FsAnnot instance from the given byte stream, which must be at the start of the annot data.
    pub fn from_reader<S>(input: S) -> Result<FsAnnot>
    where
        S: Read,
    {
        let mut file = ByteOrdered::be(input);

        let num_vertices: i32 = file.read_i32()?;
        if num_vertices < 0 {
            return Err(Seg2AnnotError::UnsupportedFsAnnotFormatVersion);
        }

        let mut vertex_indices : Vec<i32> = Vec::with_capacity(capped_capacity(num_vertices as usize));
        let mut vertex_labels : Vec<i32> = Vec::with_capacity(capped_capacity(num_vertices as usize));
        for _ in 0..num_vertices {
            vertex_indices.push(file.read_i32()?);
            vertex_labels.push(file.read_i32()?);
        }

        let has_colortable: i32 = file.read_i32()?;

        if has_colortable != TAG_OLD_COLORTABLE {
            return Err(Seg2AnnotError::UnsupportedFsAnnotFormatVersion);
        }

        let num_colortable_entries: i32 = file.read_i32()?;

        if num_colortable_entries == -COLORTABLE_VERSION { // If this is negative, the absolute value encodes the file format version. We only support version 2.
            let _num_colortable_entries: i32 = file.read_i32()?;  // For version 2, the next i32 stores the max structure index + 1.

            let colortable: FsColortable = FsColortable::from_reader(&mut file)?;

            Ok(FsAnnot {
                vertex_indices,
                vertex_labels,
                colortable,
            })
        } else {
            Err(Seg2AnnotError::UnsupportedFsAnnotFormatVersion)
        }
    }

    /// Write the annotation in annot format: the vertex data, followed by the colortable in binary format version 2.
    pub fn write_to<W>(&self, output: W) -> Result<()>
    where
        W: Write,
    {
        write_annot_data(output, &self.vertex_indices, &self.vertex_labels, &self.colortable)
    }

    /// Get the region names contained in the [`FsAnnot`] struct.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let annot = seg2annot::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
    /// annot.regions();
    /// ```
    pub fn regions(&self) -> Vec<String> {
        self.colortable.name.clone()
    }


    /// Get the number of regions contained in the [`FsAnnot`] struct, or its [`FsColortable`].
    pub fn num_regions(&self) -> usize {
        self.colortable.len()
    }


    /// Get the indices of all vertices which are part of the given brain region of the [`FsAnnot`] struct.
    ///
    /// Note that it can happen that no vertices are assigned to the region, in which case the result vector is empty.
    /// Returns `None` if the given `region` is not a valid region name for the [`FsAnnot`] struct.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let annot = seg2annot::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
    /// annot.region_vertices("bankssts");
    /// ```
    pub fn region_vertices(&self, region: &str) -> Option<Vec<usize>> {
        let region_idx = self.colortable.name.iter().position(|x| x == region)?;
        let region_label = self.colortable.label[region_idx];

        Some(self.vertex_labels.iter()
            .enumerate()
            .filter(|(_, vlabel)| **vlabel == region_label)
            .map(|(idx, _)| idx)
            .collect())
    }


    /// Get the region names for all annot vertices. Vertices whose label matches no colortable entry, like the
    /// unknown annotation `-1`, get `None`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let annot = seg2annot::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
    /// annot.vertex_regions();
    /// ```
    pub fn vertex_regions(&self) -> Vec<Option<String>> {
        self.vertex_labels.iter()
            .map(|vlabel| self.colortable.name_for_label(*vlabel).map(String::from))
            .collect()
    }
}


impl fmt::Display for FsAnnot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Surface parcellation assigning {} vertices to {} brain regions.", self.vertex_indices.len(), self.colortable.len())
    }
}


/// Write annot data from its parts. The `vertex_indices` and `vertex_labels` must have equal length.
pub fn write_annot_data<W>(output: W, vertex_indices: &[i32], vertex_labels: &[i32], colortable: &FsColortable) -> Result<()>
where
    W: Write,
{
    let mut output = ByteOrdered::be(output);

    output.write_i32(vertex_labels.len() as i32)?;
    for (vidx, vlabel) in vertex_indices.iter().zip(vertex_labels.iter()) {
        output.write_i32(*vidx)?;
        output.write_i32(*vlabel)?;
    }

    output.write_i32(TAG_OLD_COLORTABLE)?;
    colortable.write_to(&mut output)?;
    output.flush()?;
    Ok(())
}


/// Read a brain parcellation from a FreeSurfer annot file.
///
/// A parcellation assigns each vertex of a brain surface mesh to exactly one brain region.
/// The colortable contains data on the regions, including the region's
/// name, an RGB display color, and a unique identifier. A parcellation is the result of
/// applying a brain atlas to the brain surface reconstruction of a subject.
///
/// # See also
///
/// One can use the functions [`FsAnnot::regions`], [`FsAnnot::vertex_regions`], and [`FsAnnot::region_vertices`] to
/// perform common tasks related to brain surface parcellations.
///
/// # Examples
///
/// ```no_run
/// let annot = seg2annot::read_annot("/path/to/subjects_dir/subject1/label/lh.aparc.annot").unwrap();
/// println!("Annotation assigns the {} brain mesh vertices to {} different regions.", annot.vertex_indices.len(), annot.regions().len());
/// ```
pub fn read_annot<P: AsRef<Path>>(path: P) -> Result<FsAnnot> {
    FsAnnot::from_file(path)
}


/// Write a brain parcellation to a FreeSurfer annot file.
/// The file only appears at `path` once it was written completely.
pub fn write_annot<P: AsRef<Path>>(path: P, annot: &FsAnnot) -> Result<()> {
    write_file_atomically(path, |output| annot.write_to(output))
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::fs_colortable::UNKNOWN_ANNOTATION;
    use tempfile::tempdir;

    fn demo_annot() -> FsAnnot {
        let mut colortable = FsColortable::new("aparc.annot.ctab");
        colortable.push_entry(0, "unknown", [25, 5, 25, 0]).unwrap();
        colortable.push_entry(1, "bankssts", [25, 100, 40, 0]).unwrap();
        colortable.push_entry(35, "insula", [255, 192, 32, 0]).unwrap();
        let l = colortable.label.clone();
        FsAnnot {
            vertex_indices: vec![0, 1, 2, 3, 4],
            vertex_labels: vec![l[1], l[0], UNKNOWN_ANNOTATION, l[1], l[2]],
            colortable,
        }
    }

    #[test]
    fn a_written_annot_file_can_be_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.aparc.annot");
        let annot = demo_annot();
        write_annot(&path, &annot).unwrap();

        let annot2 = read_annot(&path).unwrap();

        assert_eq!(5, annot2.vertex_indices.len());
        assert_eq!(5, annot2.vertex_labels.len());
        assert_eq!(3, annot2.colortable.len());
        assert_eq!(vec![0, 1, 35], annot2.colortable.id);
        assert_eq!("insula", annot2.colortable.name[2]);
        assert_eq!(1639705, annot2.colortable.label[0]);
        assert_eq!(annot, annot2);
    }

    #[test]
    fn the_annot_layout_matches_the_freesurfer_format() {
        let mut buf: Vec<u8> = Vec::new();
        demo_annot().write_to(&mut buf).unwrap();

        let mut input = ByteOrdered::be(&buf[..]);
        assert_eq!(5, input.read_i32().unwrap());
        assert_eq!(0, input.read_i32().unwrap());
        assert_eq!(25 + 100 * 256 + 40 * 65536, input.read_i32().unwrap());
        for _ in 0..8 {
            input.read_i32().unwrap();
        }
        assert_eq!(TAG_OLD_COLORTABLE, input.read_i32().unwrap());
        assert_eq!(-2, input.read_i32().unwrap());
        assert_eq!(36, input.read_i32().unwrap());
    }

    #[test]
    fn annot_region_names_are_read_correctly() {
        let annot = demo_annot();
        let regions : Vec<String> = annot.regions();

        assert_eq!(3, regions.len());
        assert_eq!(3, annot.num_regions());
        assert_eq!(regions[0], "unknown");
        assert_eq!(regions[1], "bankssts");
        assert_eq!(regions[2], "insula");
    }

    #[test]
    fn annot_region_vertices_are_computed_correctly() {
        let annot = demo_annot();

        assert_eq!(Some(vec![0, 3]), annot.region_vertices("bankssts"));
        assert_eq!(Some(vec![4]), annot.region_vertices("insula"));
        assert_eq!(None, annot.region_vertices("no_such_region"));
    }

    #[test]
    fn vertex_regions_leave_unknown_vertices_unnamed() {
        let regions = demo_annot().vertex_regions();

        assert_eq!(5, regions.len());
        assert_eq!(Some(String::from("bankssts")), regions[0]);
        assert_eq!(Some(String::from("unknown")), regions[1]);
        assert_eq!(None, regions[2]);
        assert_eq!(Some(String::from("insula")), regions[4]);
    }

    #[test]
    fn out_of_range_colors_in_an_annot_are_rejected() {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut output = ByteOrdered::be(&mut buf);
            output.write_i32(1).unwrap();
            output.write_i32(0).unwrap();
            output.write_i32(0).unwrap();
            output.write_i32(TAG_OLD_COLORTABLE).unwrap();
            output.write_i32(-COLORTABLE_VERSION).unwrap();
            output.write_i32(1).unwrap();
            output.write_i32(0).unwrap(); // empty file name
            output.write_i32(1).unwrap();
            output.write_i32(0).unwrap();
            output.write_i32(0).unwrap(); // empty region name
            for channel in [i32::MAX, 1, 0, 0].iter() {
                output.write_i32(*channel).unwrap();
            }
        }

        let err = FsAnnot::from_reader(&buf[..]).unwrap_err();
        assert!(matches!(err, Seg2AnnotError::ColortableColorOutOfRange(0, i32::MAX)));
    }

    #[test]
    fn writing_to_a_directory_fails_without_leftovers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.aparc.annot");
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(write_annot(&path, &demo_annot()), Err(Seg2AnnotError::Io(_))));
        assert!(path.is_dir());
        assert_eq!(1, std::fs::read_dir(dir.path()).unwrap().count());
    }

    #[test]
    fn annots_without_colortable_are_rejected() {
        let buf: Vec<u8> = vec![0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(FsAnnot::from_reader(&buf[..]), Err(Seg2AnnotError::UnsupportedFsAnnotFormatVersion)));
    }
}
