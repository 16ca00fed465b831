// Functions for managing FreeSurfer brain surface meshes in binary 'surf' files.
// These files store a triangular mesh, where each vertex if defined by its x,y,z coord and
// each face is defined by 3 vertices, stored as 3 indices into the vertices.


use byteordered::{ByteOrdered, Endian};
use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::util::{capped_capacity, is_gz_file};
use crate::error::{Seg2AnnotError, Result};

pub const TRIS_MAGIC_FILE_TYPE_NUMBER: i32 = 16777214;

#[derive(Debug, Clone, PartialEq)]
pub struct FsSurfaceHeader {
    pub surf_magic: [u8; 3],
    pub info_line: String, // The 'created by' line, without the terminating "\n\n".
    pub num_vertices: i32,
    pub num_faces: i32,
}


impl Default for FsSurfaceHeader {
    fn default() -> FsSurfaceHeader {
        FsSurfaceHeader {
            surf_magic: [255, 255, 254],
            info_line: String::from(""),
            num_vertices: 0,
            num_faces: 0
        }
    }
}

impl FsSurfaceHeader {

    /// Read an FsSurface header from the given byte stream.
    /// It is assumed that the input is currently at the start of the
    /// FsSurface header.
    pub fn from_reader<S>(input: &mut S) -> Result<FsSurfaceHeader>
    where
        S: Read,
    {
        let mut hdr = FsSurfaceHeader::default();

        let mut input = ByteOrdered::be(input);

        for v in &mut hdr.surf_magic {
            *v = input.read_u8()?;
        }

        let magic: i32 = interpret_fs_int24(hdr.surf_magic[0], hdr.surf_magic[1], hdr.surf_magic[2]);

        if magic != TRIS_MAGIC_FILE_TYPE_NUMBER {
            return Err(Seg2AnnotError::InvalidFsSurfaceFormat);
        }

        let mut info_line: Vec<u8> = Vec::new();
        loop {
            let cur_char = input.read_u8()?;
            if cur_char == b'\n' && info_line.last() == Some(&b'\n') {
                info_line.pop();
                break;
            }
            info_line.push(cur_char);
        }

        hdr.info_line = String::from_utf8_lossy(&info_line).into_owned();
        hdr.num_vertices = input.read_i32()?;
        hdr.num_faces = input.read_i32()?;

        if hdr.num_vertices < 0 || hdr.num_faces < 0 {
            return Err(Seg2AnnotError::InvalidFsSurfaceFormat);
        }
        Ok(hdr)
    }

    pub fn write_to<W, E>(&self, output: &mut ByteOrdered<W, E>) -> Result<()>
    where
        W: Write,
        E: Endian,
    {
        output.write_all(&self.surf_magic)?;
        output.write_all(self.info_line.as_bytes())?;
        output.write_all(b"\n\n")?;
        output.write_i32(self.num_vertices)?;
        output.write_i32(self.num_faces)?;
        Ok(())
    }
}


/// Interpret three bytes as a single 24 bit integer, FreeSurfer style.
pub fn interpret_fs_int24(b1: u8, b2:u8, b3:u8) -> i32 {
    ((b1 as i32) << 16) + ((b2 as i32) << 8) + b3 as i32
}


// An FsSurface object
#[derive(Debug, PartialEq, Clone)]
pub struct FsSurface {
    pub header: FsSurfaceHeader,
    pub mesh: BrainMesh,
}

// A Brain Mesh
#[derive(Debug, PartialEq, Clone)]
pub struct BrainMesh {
    pub vertices: Vec<f32>, // x,y,z coordinates, 3 per vertex
    pub faces: Vec<i32>, // vertex indices, 3 per face
}

impl BrainMesh {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len() / 3
    }
}

impl fmt::Display for BrainMesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Brain trimesh with {} vertices and {} faces.", self.num_vertices(), self.num_faces())
    }
}


/// Read a brain surface mesh from a FreeSurfer surf file, like `lh.white`.
///
/// # Examples
///
/// ```no_run
/// let surf = seg2annot::read_surf("/path/to/subjects_dir/subject1/surf/lh.white").unwrap();
/// println!("{}", surf.mesh);
/// ```
pub fn read_surf<P: AsRef<Path>>(path: P) -> Result<FsSurface> {
    FsSurface::from_file(path)
}


/// Write a brain surface mesh to a FreeSurfer surf file. The file is gzipped if its name ends with ".gz".
pub fn write_surf<P: AsRef<Path>>(path: P, surf: &FsSurface) -> Result<()> {
    let gz = is_gz_file(&path);
    let file = BufWriter::new(File::create(path)?);
    if gz {
        let mut encoder = GzEncoder::new(file, Compression::default());
        surf.write_to(&mut encoder)?;
        encoder.finish()?.flush()?;
        Ok(())
    } else {
        surf.write_to(file)
    }
}


/// Compute the path of a surface of a subject: `{subjects_dir}/{subject}/surf/{hemi}.{surface}`.
pub fn subject_surface_path<P: AsRef<Path>>(subjects_dir: P, subject: &str, hemi: &str, surface: &str) -> PathBuf {
    subjects_dir.as_ref()
        .join(subject)
        .join("surf")
        .join(format!("{}.{}", hemi, surface))
}


impl FsSurface {
    /// Read an FsSurface instance from a file.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding. This is not typically the case
    /// for FreeSurfer Surface files, but very handy (and it helps us to reduce the size of our test data).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FsSurface> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            FsSurface::from_reader(GzDecoder::new(file))
        } else {
            FsSurface::from_reader(file)
        }
    }

    /// Create a surface from a mesh, with a default header.
    pub fn from_mesh(mesh: BrainMesh) -> FsSurface {
        let header = FsSurfaceHeader {
            info_line: String::from("created by seg2annot"),
            num_vertices: mesh.num_vertices() as i32,
            num_faces: mesh.num_faces() as i32,
            ..FsSurfaceHeader::default()
        };
        FsSurface { header, mesh }
    }

    /// Read header and mesh from the given byte stream, which must be at the start of the header.
    pub fn from_reader<S>(mut input: S) -> Result<FsSurface>
    where
        S: Read,
    {
        let hdr = FsSurfaceHeader::from_reader(&mut input)?;
        let mesh = FsSurface::mesh_from_reader(&mut input, &hdr)?;
        Ok(FsSurface {
            header: hdr,
            mesh,
        })
    }

    /// Read the mesh data that follows the header.
    pub fn mesh_from_reader<S>(input: &mut S, hdr: &FsSurfaceHeader) -> Result<BrainMesh>
    where
        S: Read,
    {
        let mut input = ByteOrdered::be(input);

        let num_coords = (hdr.num_vertices as usize).checked_mul(3).ok_or(Seg2AnnotError::InvalidFsSurfaceFormat)?;
        let mut vertex_data : Vec<f32> = Vec::with_capacity(capped_capacity(num_coords));
        for _ in 0..num_coords {
            vertex_data.push(input.read_f32()?);
        }

        let num_indices = (hdr.num_faces as usize).checked_mul(3).ok_or(Seg2AnnotError::InvalidFsSurfaceFormat)?;
        let mut face_data : Vec<i32> = Vec::with_capacity(capped_capacity(num_indices));
        for _ in 0..num_indices {
            face_data.push(input.read_i32()?);
        }

        Ok(BrainMesh {
            vertices : vertex_data,
            faces : face_data
        })
    }

    pub fn write_to<W>(&self, output: W) -> Result<()>
    where
        W: Write,
    {
        let mut output = ByteOrdered::be(output);
        self.header.write_to(&mut output)?;
        for v in self.mesh.vertices.iter() {
            output.write_f32(*v)?;
        }
        for f in self.mesh.faces.iter() {
            output.write_i32(*f)?;
        }
        output.flush()?;
        Ok(())
    }
}
