//! Functions for managing FreeSurfer colortables.
//!
//! A colortable assigns a structure index to a region name and an RGBA display color. It comes
//! either as a text lookup table (like `FreeSurferColorLUT.txt`), or embedded in binary form
//! in an annot file. The RGB color of an entry also serves as the annotation code that annot
//! files store per vertex.

use byteordered::{ByteOrdered, Endian};
use log::{debug, warn};

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::{Result, Seg2AnnotError};
use crate::util::{read_fixed_length_string, write_length_prefixed_string};

/// The annotation code used for segmentation values that have no entry in the colortable.
pub const UNKNOWN_ANNOTATION: i32 = -1;

/// The binary colortable version written to and expected in annot files. Stored negated.
pub const COLORTABLE_VERSION: i32 = 2;

/// Compute the annotation code for an RGB color: `r + g * 256 + b * 65536`. The alpha channel does not participate.
pub fn rgb_to_annotation(r: i32, g: i32, b: i32) -> i32 {
    r + (g << 8) + (b << 16)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FsColortable {
    pub orig_filename: String, // The file the table was read from, stored in annot files.
    pub id: Vec<i32>, // The structure index, e.g., the value in a segmentation.
    pub name: Vec<String>,
    pub r: Vec<i32>,
    pub g: Vec<i32>,
    pub b: Vec<i32>,
    pub a: Vec<i32>,
    pub label: Vec<i32>, // The annotation code computed from r,g,b. Used in annot.vertex_labels to identify the region.
}

impl FsColortable {

    /// Create an empty colortable.
    pub fn new<S: Into<String>>(orig_filename: S) -> FsColortable {
        FsColortable {
            orig_filename: orig_filename.into(),
            id: Vec::new(),
            name: Vec::new(),
            r: Vec::new(),
            g: Vec::new(),
            b: Vec::new(),
            a: Vec::new(),
            label: Vec::new(),
        }
    }

    /// Append an entry. Fails if the structure index is already part of the table, or if a color channel is outside of 0..255.
    pub fn push_entry<S: Into<String>>(&mut self, id: i32, name: S, rgba: [i32; 4]) -> Result<()> {
        if self.id.contains(&id) {
            return Err(Seg2AnnotError::DuplicateColortableIndex(id));
        }
        if let Some(value) = rgba.iter().find(|v| !(0..=255).contains(*v)) {
            return Err(Seg2AnnotError::ColortableColorOutOfRange(id, *value));
        }
        self.id.push(id);
        self.name.push(name.into());
        self.r.push(rgba[0]);
        self.g.push(rgba[1]);
        self.b.push(rgba[2]);
        self.a.push(rgba[3]);
        self.label.push(rgb_to_annotation(rgba[0], rgba[1], rgba[2]));
        Ok(())
    }

    /// Read a colortable from a text lookup table file.
    pub fn from_lut_file<P: AsRef<Path>>(path: P) -> Result<FsColortable> {
        let file = BufReader::new(File::open(&path)?);
        let orig_filename = path.as_ref().to_string_lossy().into_owned();
        FsColortable::from_lut_reader(file, orig_filename)
    }

    /// Read a colortable in text lookup table format.
    ///
    /// Each non-empty line holds `index name r g b a`, separated by whitespace. The alpha column may be omitted, in which case it is `0`.
    /// Everything after a `#` is a comment.
    pub fn from_lut_reader<R, S>(input: R, orig_filename: S) -> Result<FsColortable>
    where
        R: BufRead,
        S: Into<String>,
    {
        let mut ct = FsColortable::new(orig_filename);

        for (line_idx, line) in input.lines().enumerate() {
            let line = line?;
            let line_no = line_idx + 1;
            let content = match line.find('#') {
                Some(pos) => &line[..pos],
                None => &line[..],
            };
            let fields: Vec<&str> = content.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 5 {
                return Err(Seg2AnnotError::InvalidColortable(line_no, format!("expected at least 5 columns, found {}", fields.len())));
            }

            let id = parse_lut_int(fields[0], line_no)?;
            let mut rgba = [0i32; 4];
            for (channel, field) in fields[2..fields.len().min(6)].iter().enumerate() {
                let value = parse_lut_int(field, line_no)?;
                if !(0..=255).contains(&value) {
                    return Err(Seg2AnnotError::InvalidColortable(line_no, format!("color value {} out of range 0..255", value)));
                }
                rgba[channel] = value;
            }
            ct.push_entry(id, fields[1], rgba)?;
        }

        ct.warn_on_shared_colors();
        debug!("Read colortable with {} entries.", ct.len());
        Ok(ct)
    }

    /// Read a colortable in binary format version 2 from a reader. The reader must be at the start position of the colortable,
    /// i.e., after the version and the maximal number of entries.
    pub fn from_reader<S>(input: &mut S) -> Result<FsColortable>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_chars_orig_filename: i32 = input.read_i32()?; // Length of following string.
        let orig_filename = read_fixed_length_string(&mut input, non_negative(num_chars_orig_filename)?)?;
        let num_colortable_entries: i32 = input.read_i32()?; // Yes, it is stored twice. Once here, once before.

        let mut ct = FsColortable::new(orig_filename);
        for _ in 0..non_negative(num_colortable_entries)? {
            let id = input.read_i32()?;
            let num_chars_region_name: i32 = input.read_i32()?; // Length of following string.
            let name = read_fixed_length_string(&mut input, non_negative(num_chars_region_name)?)?;
            let r = input.read_i32()?;
            let g = input.read_i32()?;
            let b = input.read_i32()?;
            let a = input.read_i32()?;
            ct.push_entry(id, name, [r, g, b, a])?;
        }

        Ok(ct)
    }

    /// Write the colortable in binary format version 2, starting with the negated version number.
    pub fn write_to<W, E>(&self, output: &mut ByteOrdered<W, E>) -> Result<()>
    where
        W: Write,
        E: Endian,
    {
        output.write_i32(-COLORTABLE_VERSION)?;
        output.write_i32(self.max_index().map_or(0, |max| max + 1))?;
        write_length_prefixed_string(output, &self.orig_filename)?;
        output.write_i32(self.len() as i32)?;

        for idx in 0..self.len() {
            output.write_i32(self.id[idx])?;
            write_length_prefixed_string(output, &self.name[idx])?;
            output.write_i32(self.r[idx])?;
            output.write_i32(self.g[idx])?;
            output.write_i32(self.b[idx])?;
            output.write_i32(self.a[idx])?;
        }
        Ok(())
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// The largest structure index in the table, `None` for an empty table.
    pub fn max_index(&self) -> Option<i32> {
        self.id.iter().copied().max()
    }

    /// Get the position of the entry with the given structure index.
    pub fn position_of_index(&self, index: i32) -> Option<usize> {
        self.id.iter().position(|&x| x == index)
    }

    /// Get the position of the first entry with the given annotation code.
    pub fn position_of_label(&self, label: i32) -> Option<usize> {
        self.label.iter().position(|&x| x == label)
    }

    /// Get the annotation code for a structure index, or [`UNKNOWN_ANNOTATION`] if the index is not part of the table.
    ///
    /// # Examples
    ///
    /// ```
    /// use seg2annot::{FsColortable, UNKNOWN_ANNOTATION};
    /// let mut ct = FsColortable::new("demo.txt");
    /// ct.push_entry(1, "cortex", [220, 20, 10, 0]).unwrap();
    /// assert_eq!(ct.annotation_code(1), 220 + 20 * 256 + 10 * 65536);
    /// assert_eq!(ct.annotation_code(5), UNKNOWN_ANNOTATION);
    /// ```
    pub fn annotation_code(&self, index: i32) -> i32 {
        self.position_of_index(index)
            .map_or(UNKNOWN_ANNOTATION, |pos| self.label[pos])
    }

    /// Build a map from structure index to annotation code, for repeated lookups.
    pub fn annotation_lookup(&self) -> HashMap<i32, i32> {
        self.id.iter().copied().zip(self.label.iter().copied()).collect()
    }

    /// Get the region name for an annotation code.
    pub fn name_for_label(&self, label: i32) -> Option<&str> {
        self.position_of_label(label).map(|pos| self.name[pos].as_str())
    }

    fn warn_on_shared_colors(&self) {
        let mut seen: HashMap<i32, usize> = HashMap::with_capacity(self.len());
        for (idx, label) in self.label.iter().enumerate() {
            if let Some(first) = seen.insert(*label, idx) {
                warn!("Colortable entries '{}' and '{}' share the color {}, their vertices cannot be told apart in the annotation.",
                    self.name[first], self.name[idx], label);
            }
        }
    }
}

impl fmt::Display for FsColortable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Colortable for {} brain regions.", self.len())
    }
}

fn parse_lut_int(field: &str, line_no: usize) -> Result<i32> {
    field.parse::<i32>()
        .map_err(|_| Seg2AnnotError::InvalidColortable(line_no, format!("invalid integer '{}'", field)))
}

fn non_negative(count: i32) -> Result<usize> {
    if count < 0 {
        return Err(Seg2AnnotError::UnsupportedFsAnnotFormatVersion);
    }
    Ok(count as usize)
}


/// Read a colortable from a text lookup table file, like `FreeSurferColorLUT.txt`.
///
/// # Examples
///
/// ```no_run
/// let ct = seg2annot::read_colortable("/path/to/freesurfer/FreeSurferColorLUT.txt").unwrap();
/// println!("{}", ct);
/// ```
pub fn read_colortable<P: AsRef<Path>>(path: P) -> Result<FsColortable> {
    FsColortable::from_lut_file(path)
}


#[cfg(test)]
mod test {
    use super::*;

    const DEMO_LUT: &str = "#$Id: demo LUT\n\
        \n\
        #No. Label Name:            R   G   B   A\n\
        0   unknown                 25  5   25  0\n\
        1   bankssts                25  100 40  0   # superior temporal sulcus\n\
        2   caudalanteriorcingulate 125 100 160 0\n";

    #[test]
    fn the_demo_lut_can_be_read() {
        let ct = FsColortable::from_lut_reader(DEMO_LUT.as_bytes(), "demo.txt").unwrap();

        assert_eq!(3, ct.len());
        assert_eq!("demo.txt", ct.orig_filename);
        assert_eq!(vec![0, 1, 2], ct.id);
        assert_eq!("unknown", ct.name[0]);
        assert_eq!("caudalanteriorcingulate", ct.name[2]);
        assert_eq!(25, ct.r[0]);
        assert_eq!(5, ct.g[0]);
        assert_eq!(25, ct.b[0]);
        assert_eq!(0, ct.a[0]);
        assert_eq!(1639705, ct.label[0]);
        assert_eq!(Some(2), ct.max_index());
    }

    #[test]
    fn the_alpha_column_is_optional() {
        let ct = FsColortable::from_lut_reader("7 cortex 10 20 30\n".as_bytes(), "lut").unwrap();
        assert_eq!(0, ct.a[0]);
        assert_eq!(rgb_to_annotation(10, 20, 30), ct.label[0]);
    }

    #[test]
    fn malformed_lut_lines_are_rejected_with_their_line_number() {
        let err = FsColortable::from_lut_reader("0 unknown 0 0 0 0\n1 cortex 10 20\n".as_bytes(), "lut").unwrap_err();
        assert!(matches!(err, Seg2AnnotError::InvalidColortable(2, _)));

        let err = FsColortable::from_lut_reader("0 unknown 0 x 0 0\n".as_bytes(), "lut").unwrap_err();
        assert!(matches!(err, Seg2AnnotError::InvalidColortable(1, _)));

        let err = FsColortable::from_lut_reader("0 unknown 0 256 0 0\n".as_bytes(), "lut").unwrap_err();
        assert!(matches!(err, Seg2AnnotError::InvalidColortable(1, _)));
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let err = FsColortable::from_lut_reader("3 a 1 1 1 0\n3 b 2 2 2 0\n".as_bytes(), "lut").unwrap_err();
        assert!(matches!(err, Seg2AnnotError::DuplicateColortableIndex(3)));
    }

    #[test]
    fn out_of_range_colors_are_rejected() {
        let mut ct = FsColortable::new("demo.ctab");
        let err = ct.push_entry(4, "cortex", [i32::MAX, 1, 0, 0]).unwrap_err();
        assert!(matches!(err, Seg2AnnotError::ColortableColorOutOfRange(4, i32::MAX)));
        let err = ct.push_entry(4, "cortex", [0, 0, 0, -1]).unwrap_err();
        assert!(matches!(err, Seg2AnnotError::ColortableColorOutOfRange(4, -1)));
        assert!(ct.is_empty());

        ct.push_entry(4, "cortex", [255, 255, 255, 255]).unwrap();
        assert_eq!(16777215, ct.label[0]);
    }

    #[test]
    fn binary_colortables_with_out_of_range_colors_are_rejected() {
        let mut ct = FsColortable::new("demo.ctab");
        ct.push_entry(1, "cortex", [220, 20, 10, 0]).unwrap();
        ct.r[0] = i32::MAX;
        ct.g[0] = 1;

        let mut buf: Vec<u8> = Vec::new();
        ct.write_to(&mut ByteOrdered::be(&mut buf)).unwrap();

        let mut input = &buf[8..];
        let err = FsColortable::from_reader(&mut input).unwrap_err();
        assert!(matches!(err, Seg2AnnotError::ColortableColorOutOfRange(1, i32::MAX)));
    }

    #[test]
    fn annotation_codes_use_the_rgb_packing_and_the_unknown_sentinel() {
        let ct = FsColortable::from_lut_reader(DEMO_LUT.as_bytes(), "demo.txt").unwrap();

        assert_eq!(25 + 100 * 256 + 40 * 65536, ct.annotation_code(1));
        assert_eq!(UNKNOWN_ANNOTATION, ct.annotation_code(5));
        assert_eq!(UNKNOWN_ANNOTATION, ct.annotation_code(-1));

        let lookup = ct.annotation_lookup();
        assert_eq!(3, lookup.len());
        for idx in 0..ct.len() {
            assert_eq!(ct.annotation_code(ct.id[idx]), lookup[&ct.id[idx]]);
        }
        assert_eq!(Some("bankssts"), ct.name_for_label(ct.annotation_code(1)));
        assert_eq!(None, ct.name_for_label(UNKNOWN_ANNOTATION));
    }

    #[test]
    fn the_binary_colortable_can_be_written_and_read_back() {
        let ct = FsColortable::from_lut_reader(DEMO_LUT.as_bytes(), "demo.txt").unwrap();

        let mut buf: Vec<u8> = Vec::new();
        ct.write_to(&mut ByteOrdered::be(&mut buf)).unwrap();

        let mut input = ByteOrdered::be(&buf[..]);
        assert_eq!(-2, input.read_i32().unwrap());
        assert_eq!(3, input.read_i32().unwrap());
        let ct2 = FsColortable::from_reader(&mut input.into_inner()).unwrap();

        assert_eq!(ct, ct2);
    }
}
