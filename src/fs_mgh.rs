//! Functions for managing FreeSurfer brain volumes in binary 'MGH' files.
//!
//! A volume-encoded surface segmentation is an MGH file with one voxel row per surface
//! vertex: the label of vertex `v` is the voxel value at `(v, 0, 0, 0)`.

use byteordered::{ByteOrdered, Endian};
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::{s, Array, Array1, Array4, ShapeBuilder};
use ndarray_stats::QuantileExt;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, Seg2AnnotError};
use crate::util::{capped_capacity, is_gz_file, read_bytes};

pub const MGH_VERSION: i32 = 1;

pub const MRI_UCHAR: i32 = 0;
pub const MRI_INT: i32 = 1;
pub const MRI_FLOAT: i32 = 3;
pub const MRI_SHORT: i32 = 4;

pub const MGH_DATATYPE_NAMES : [&str; 4] = ["MRI_UCHAR", "MRI_INT", "MRI_FLOAT", "MRI_SHORT"];
pub const MGH_DATATYPE_CODES : [i32; 4] = [MRI_UCHAR, MRI_INT, MRI_FLOAT, MRI_SHORT];
pub const MGH_DATA_START : usize = 284; // The index in bytes where the data part starts in an MGH file.

/// Models the header of a FreeSurfer MGH file containing a brain volume.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMghHeader {
    pub mgh_format_version: i32,
    pub dim1len: i32,
    pub dim2len: i32,
    pub dim3len: i32,
    pub dim4len: i32,  // aka "num_frames"
    pub dtype: i32,
    pub dof: i32,
    pub is_ras_good: i16,
    pub delta: [f32; 3],
    pub mdc_raw: [f32; 9],
    pub p_xyz_c: [f32; 3],
}


/// Models a FreeSurfer MGH file. Exactly one of the data fields is set, depending on the `dtype` of the header.
#[derive(Debug, Clone, PartialEq)]
pub struct FsMgh {
    pub header: FsMghHeader,
    pub data_mri_uchar: Option<Array4<u8>>,
    pub data_mri_float: Option<Array4<f32>>,
    pub data_mri_int: Option<Array4<i32>>,
    pub data_mri_short: Option<Array4<i16>>,
}


impl Default for FsMghHeader {
    fn default() -> FsMghHeader {
        FsMghHeader {
            mgh_format_version: MGH_VERSION,
            dim1len: 0,
            dim2len: 0,
            dim3len: 0,
            dim4len: 0,
            dtype: MRI_INT,
            dof: 0,
            is_ras_good: 0,
            delta: [0.; 3],
            mdc_raw: [0.; 9],
            p_xyz_c: [0.; 3],
        }
    }
}

/// The header of an MGH/MGZ file.
impl FsMghHeader {

    /// Read an MGH header from a file. MGZ files are decompressed on the fly.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMghHeader> {
        let gz = is_gz_file(&path);
        let mut file = BufReader::new(File::open(path)?);
        if gz {
            FsMghHeader::from_reader(&mut GzDecoder::new(file))
        } else {
            FsMghHeader::from_reader(&mut file)
        }
    }


    /// Read an MGH header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// header. The input is left directly after the fields that were read, see [`FsMghHeader::size_on_disk`].
    pub fn from_reader<S>(input: &mut S) -> Result<FsMghHeader>
    where
        S: Read,
    {
        let mut hdr = FsMghHeader::default();

        let mut input = ByteOrdered::be(input);

        hdr.mgh_format_version = input.read_i32()?;

        if hdr.mgh_format_version != MGH_VERSION {
            return Err(Seg2AnnotError::InvalidFsMghFormat);
        }

        hdr.dim1len = input.read_i32()?;
        hdr.dim2len = input.read_i32()?;
        hdr.dim3len = input.read_i32()?;
        hdr.dim4len = input.read_i32()?;

        if hdr.dim().iter().any(|&d| d < 1) {
            return Err(Seg2AnnotError::InvalidFsMghFormat);
        }

        hdr.dtype = input.read_i32()?;
        hdr.dof = input.read_i32()?;

        hdr.is_ras_good = input.read_i16()?;

        if hdr.is_ras_good == 1 {
            for idx in 0..3 { hdr.delta[idx] = input.read_f32()?; }
            for idx in 0..9 { hdr.mdc_raw[idx] = input.read_f32()?; }
            for idx in 0..3 { hdr.p_xyz_c[idx] = input.read_f32()?; }
        }
        Ok(hdr)
    }

    /// Write the header, padded with zeros up to [`MGH_DATA_START`].
    pub fn write_to<W, E>(&self, output: &mut ByteOrdered<W, E>) -> Result<()>
    where
        W: Write,
        E: Endian,
    {
        output.write_i32(self.mgh_format_version)?;
        output.write_i32(self.dim1len)?;
        output.write_i32(self.dim2len)?;
        output.write_i32(self.dim3len)?;
        output.write_i32(self.dim4len)?;
        output.write_i32(self.dtype)?;
        output.write_i32(self.dof)?;
        output.write_i16(self.is_ras_good)?;

        if self.is_ras_good == 1 {
            for v in self.delta.iter().chain(self.mdc_raw.iter()).chain(self.p_xyz_c.iter()) {
                output.write_f32(*v)?;
            }
        }
        output.write_all(&vec![0u8; MGH_DATA_START - self.size_on_disk()])?;
        Ok(())
    }

    /// The number of header bytes that carry data, i.e., that are read by [`FsMghHeader::from_reader`].
    pub fn size_on_disk(&self) -> usize {
        let base = 7 * 4 + 2;
        if self.is_ras_good == 1 { base + 15 * 4 } else { base }
    }

    /// The volume dimensions.
    pub fn dim(&self) -> [i32; 4] {
        [self.dim1len, self.dim2len, self.dim3len, self.dim4len]
    }

    /// The number of voxels, `None` if a dimension is negative or the product does not fit into `usize`.
    pub fn num_voxels(&self) -> Option<usize> {
        self.dim().iter().try_fold(1usize, |acc, &d| {
            usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
        })
    }

    /// Get the name of the data type, like `MRI_FLOAT`.
    pub fn dtype_name(&self) -> Option<&'static str> {
        MGH_DATATYPE_CODES.iter().position(|&c| c == self.dtype).map(|idx| MGH_DATATYPE_NAMES[idx])
    }

    fn for_shape(shape: &[usize], dtype: i32) -> FsMghHeader {
        FsMghHeader {
            dim1len: shape[0] as i32,
            dim2len: shape[1] as i32,
            dim3len: shape[2] as i32,
            dim4len: shape[3] as i32,
            dtype,
            ..FsMghHeader::default()
        }
    }

    fn shape(&self) -> (usize, usize, usize, usize) {
        (self.dim1len as usize, self.dim2len as usize, self.dim3len as usize, self.dim4len as usize)
    }
}


impl FsMgh {

    /// Create a volume of type `MRI_INT`, with the header dimensions taken from the data.
    pub fn from_int_data(data: Array4<i32>) -> FsMgh {
        FsMgh {
            header: FsMghHeader::for_shape(data.shape(), MRI_INT),
            data_mri_uchar: None,
            data_mri_float: None,
            data_mri_int: Some(data),
            data_mri_short: None,
        }
    }

    /// Create a volume of type `MRI_FLOAT`, with the header dimensions taken from the data.
    pub fn from_float_data(data: Array4<f32>) -> FsMgh {
        FsMgh {
            header: FsMghHeader::for_shape(data.shape(), MRI_FLOAT),
            data_mri_uchar: None,
            data_mri_float: Some(data),
            data_mri_int: None,
            data_mri_short: None,
        }
    }

    /// Create a volume-encoded surface segmentation: an `MRI_INT` volume of shape `(n, 1, 1, 1)` holding one label per vertex.
    pub fn from_vertex_labels(labels: &[i32]) -> FsMgh {
        let data = Array::from_shape_fn((labels.len(), 1, 1, 1), |(v, _, _, _)| labels[v]);
        FsMgh::from_int_data(data)
    }

    /// Read an MGH or MGZ file. The file is treated as MGZ if its name ends with `.mgz` or `.gz`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            FsMgh::from_reader(GzDecoder::new(file))
        } else {
            FsMgh::from_reader(file)
        }
    }

    /// Read an MGH volume from the given byte stream, which must be at the start of the header.
    pub fn from_reader<S>(mut input: S) -> Result<FsMgh>
    where
        S: Read,
    {
        let hdr = FsMghHeader::from_reader(&mut input)?;

        // Skip the unused part of the header. We cannot seek in a GZ stream.
        let to_skip = (MGH_DATA_START - hdr.size_on_disk()) as u64;
        let skipped = io::copy(&mut input.by_ref().take(to_skip), &mut io::sink())?;
        if skipped != to_skip {
            return Err(Seg2AnnotError::InvalidFsMghFormat);
        }

        let num_voxels = hdr.num_voxels().ok_or(Seg2AnnotError::InvalidFsMghFormat)?;
        let shape = hdr.shape().f();
        let mut input = ByteOrdered::be(input);

        let mut mgh = FsMgh {
            header: hdr.clone(),
            data_mri_uchar: None,
            data_mri_float: None,
            data_mri_int: None,
            data_mri_short: None,
        };

        match hdr.dtype {
            MRI_UCHAR => {
                let data = read_bytes(input.inner_mut(), num_voxels)?;
                mgh.data_mri_uchar = Some(Array::from_shape_vec(shape, data)?);
            }
            MRI_INT => {
                let mut data: Vec<i32> = Vec::with_capacity(capped_capacity(num_voxels));
                for _ in 0..num_voxels {
                    data.push(input.read_i32()?);
                }
                mgh.data_mri_int = Some(Array::from_shape_vec(shape, data)?);
            }
            MRI_FLOAT => {
                let mut data: Vec<f32> = Vec::with_capacity(capped_capacity(num_voxels));
                for _ in 0..num_voxels {
                    data.push(input.read_f32()?);
                }
                mgh.data_mri_float = Some(Array::from_shape_vec(shape, data)?);
            }
            MRI_SHORT => {
                let mut data: Vec<i16> = Vec::with_capacity(capped_capacity(num_voxels));
                for _ in 0..num_voxels {
                    data.push(input.read_i16()?);
                }
                mgh.data_mri_short = Some(Array::from_shape_vec(shape, data)?);
            }
            other => return Err(Seg2AnnotError::UnsupportedMriDataType(other)),
        }

        Ok(mgh)
    }

    /// Write the volume in MGH format. The first dimension varies fastest on disk.
    pub fn write_to<W>(&self, output: W) -> Result<()>
    where
        W: Write,
    {
        let mut output = ByteOrdered::be(output);
        self.header.write_to(&mut output)?;

        match self.header.dtype {
            MRI_UCHAR => {
                for v in self.data_mri_uchar.as_ref().ok_or(Seg2AnnotError::InvalidFsMghFormat)?.t().iter() {
                    output.write_u8(*v)?;
                }
            }
            MRI_INT => {
                for v in self.data_mri_int.as_ref().ok_or(Seg2AnnotError::InvalidFsMghFormat)?.t().iter() {
                    output.write_i32(*v)?;
                }
            }
            MRI_FLOAT => {
                for v in self.data_mri_float.as_ref().ok_or(Seg2AnnotError::InvalidFsMghFormat)?.t().iter() {
                    output.write_f32(*v)?;
                }
            }
            MRI_SHORT => {
                for v in self.data_mri_short.as_ref().ok_or(Seg2AnnotError::InvalidFsMghFormat)?.t().iter() {
                    output.write_i16(*v)?;
                }
            }
            other => return Err(Seg2AnnotError::UnsupportedMriDataType(other)),
        }
        output.flush()?;
        Ok(())
    }

    /// Get the per-vertex labels of a volume-encoded surface segmentation: the values at `(v, 0, 0, 0)` for all `v` along
    /// the first dimension. Float values are truncated towards zero.
    pub fn vertex_labels(&self) -> Result<Vec<i32>> {
        if let Some(data) = &self.data_mri_int {
            return Ok(data.slice(s![.., 0, 0, 0]).to_vec());
        }
        if let Some(data) = &self.data_mri_float {
            return Ok(data.slice(s![.., 0, 0, 0]).iter().map(|&v| v as i32).collect());
        }
        if let Some(data) = &self.data_mri_short {
            return Ok(data.slice(s![.., 0, 0, 0]).iter().map(|&v| v as i32).collect());
        }
        if let Some(data) = &self.data_mri_uchar {
            return Ok(data.slice(s![.., 0, 0, 0]).iter().map(|&v| v as i32).collect());
        }
        Err(Seg2AnnotError::InvalidFsMghFormat)
    }
}


/// Get the smallest and largest label, `None` if there are no labels.
pub fn label_range(labels: &[i32]) -> Option<(i32, i32)> {
    let labels = Array1::from(labels.to_vec());
    match (labels.min(), labels.max()) {
        (Ok(min), Ok(max)) => Some((*min, *max)),
        _ => None,
    }
}


/// Read an MGH or MGZ file.
///
/// # Examples
///
/// ```no_run
/// let seg = seg2annot::read_mgh("/path/to/lh.aparc.seg.mgz").unwrap();
/// let labels = seg.vertex_labels().unwrap();
/// ```
pub fn read_mgh<P: AsRef<Path>>(path: P) -> Result<FsMgh> {
    FsMgh::from_file(path)
}


/// Write an MGH file, or a gzipped MGZ file if the name ends with `.mgz` or `.gz`.
pub fn write_mgh<P: AsRef<Path>>(path: P, mgh: &FsMgh) -> Result<()> {
    let gz = is_gz_file(&path);
    let file = BufWriter::new(File::create(path)?);
    if gz {
        let mut encoder = GzEncoder::new(file, Compression::default());
        mgh.write_to(&mut encoder)?;
        encoder.finish()?.flush()?;
        Ok(())
    } else {
        mgh.write_to(file)
    }
}
