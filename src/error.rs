use quick_error::quick_error;
use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum Seg2AnnotError {
        /// A required command line option was not given.
        MissingOption(name: &'static str) {
            display("{} not specified", name)
        }

        SubjectsDirUnset {
            display("SUBJECTS_DIR not defined in environment")
        }

        /// The segmentation has fewer per-vertex values than the surface has vertices.
        SegmentationTooShort(seg_len: usize, num_vertices: usize) {
            display("Segmentation has {} values, but the surface has {} vertices", seg_len, num_vertices)
        }

        /// Malformed line in a text colortable (LUT) file. The line number is 1-based.
        InvalidColortable(line: usize, reason: String) {
            display("Invalid colortable at line {}: {}", line, reason)
        }

        /// A color channel of a colortable entry is outside of 0..255.
        ColortableColorOutOfRange(index: i32, value: i32) {
            display("Colortable entry {} has color value {} out of range 0..255", index, value)
        }

        DuplicateColortableIndex(index: i32) {
            display("Colortable contains structure index {} more than once", index)
        }

        /// Invalid MGH file: wrong version, invalid dimensions or missing data.
        InvalidFsMghFormat {
            display("Invalid MGH file")
        }

        UnsupportedMriDataType(dtype: i32) {
            display("Unsupported MRI data type {} in MGH file", dtype)
        }

        InvalidFsSurfaceFormat {
            display("Invalid FreeSurfer surf file")
        }

        UnsupportedFsAnnotFormatVersion {
            display("Unsupported FreeSurfer annot file format version")
        }

        /// Volume data does not fit the dimensions from the header.
        Shape(err: ndarray::ShapeError) {
            from()
            source(err)
            display("Invalid volume shape: {}", err)
        }

        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, Seg2AnnotError>;
