//! Utility functions used in all other seg2annot modules.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use byteordered::{ByteOrdered, Endian};
use tempfile::NamedTempFile;

use crate::error::Result;

/// The largest number of elements reserved up front for data whose length comes from a file header.
pub const MAX_PREALLOCATED_ELEMENTS: usize = 1 << 20;

/// Get the capacity to reserve for `count` elements announced by a file header. Vectors longer than
/// [`MAX_PREALLOCATED_ELEMENTS`] grow while their data is read, so a corrupt count fails with an I/O error at the end of the input.
pub fn capped_capacity(count: usize) -> usize {
    count.min(MAX_PREALLOCATED_ELEMENTS)
}

/// Check whether the file extension ends with ".gz". Also true for ".mgz" files, which are gzipped MGH files.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| {
            let name = a.to_string_lossy();
            name.ends_with(".gz") || name.ends_with(".mgz")
        })
        .unwrap_or(false)
}

/// Read exactly `len` bytes from the input. The buffer grows as the bytes arrive, see [`capped_capacity`].
pub fn read_bytes<S>(input: &mut S, len: usize) -> Result<Vec<u8>>
where
    S: Read,
{
    let mut raw: Vec<u8> = Vec::with_capacity(capped_capacity(len));
    input.by_ref().take(len as u64).read_to_end(&mut raw)?;
    if raw.len() != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(raw)
}

/// Read a fixed length zero-terminated byte string of the given length from the input. Embedded '\0' chars are allowed, but not added to the returned String.
pub fn read_fixed_length_string<S>(input: &mut S, len: usize) -> Result<String>
where
    S: Read,
{
    let mut raw = read_bytes(input, len)?;
    raw.retain(|&c| c != b'\0');
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Write a string as FreeSurfer does in binary colortables: the length including the terminating '\0' as i32, then the bytes and the '\0'.
pub fn write_length_prefixed_string<W, E>(output: &mut ByteOrdered<W, E>, value: &str) -> Result<()>
where
    W: Write,
    E: Endian,
{
    let bytes = value.as_bytes();
    output.write_i32(bytes.len() as i32 + 1)?;
    output.write_all(bytes)?;
    output.write_u8(0)?;
    Ok(())
}

/// Write a file through a temporary file in the same directory, which replaces `path` only after `write` succeeded.
/// If writing fails, the temporary file is removed and an existing file at `path` is left untouched.
pub fn write_file_atomically<P, F>(path: P, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    // Temporary files are created with mode 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file().set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    {
        let mut output = BufWriter::new(tmp.as_file_mut());
        write(&mut output)?;
        output.flush()?;
    }
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
