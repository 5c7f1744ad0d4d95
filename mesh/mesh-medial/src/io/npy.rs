//! NumPy `.npy` array file support.
//!
//! Only what the medial axis pipeline exchanges is supported: C-ordered
//! `N×3` float arrays and `N` integer arrays.
//!
//! # Format
//!
//! ```text
//! UINT8[6]     – Magic "\x93NUMPY"
//! UINT8[2]     – Format version (major, minor)
//! UINT16/32    – Header length (u16 for v1, u32 for v2/v3), little endian
//! CHAR[len]    – Python dict literal, space padded, newline terminated:
//!                {'descr': '<f4', 'fortran_order': False, 'shape': (N, 3), }
//! ...          – Raw array data
//! ```
//!
//! Written files use version 1.0 with the header padded so the data starts on
//! a 64-byte boundary.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::{MedialError, MedialResult};

/// File magic.
const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Alignment of the data section in written files.
const HEADER_ALIGN: usize = 64;

/// Element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    F32,
    F64,
    I32,
    I64,
}

impl Scalar {
    const fn size(self) -> usize {
        match self {
            Self::F32 | Self::I32 => 4,
            Self::F64 | Self::I64 => 8,
        }
    }

    const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    scalar: Scalar,
    big_endian: bool,
}

impl Dtype {
    fn parse(descr: &str) -> Option<Self> {
        let mut chars = descr.chars();
        let big_endian = match chars.next()? {
            '<' => false,
            '>' => true,
            '=' => cfg!(target_endian = "big"),
            _ => return None,
        };
        let scalar = match chars.as_str() {
            "f4" => Scalar::F32,
            "f8" => Scalar::F64,
            "i4" => Scalar::I32,
            "i8" => Scalar::I64,
            _ => return None,
        };
        Some(Self { scalar, big_endian })
    }
}

/// Parsed array header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

impl Header {
    /// Number of elements, or `None` if the shape overflows `usize`.
    fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim))
    }

    /// Size of the data section in bytes, or `None` on overflow.
    fn data_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.scalar.size())
    }
}

/// Load an `N×3` float array as points.
///
/// Accepts `f4` and `f8` arrays; single precision values are widened.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not a valid `.npy`
/// file, or does not hold an `N×3` float array.
pub fn load_points<P: AsRef<Path>>(path: P) -> MedialResult<Vec<Point3<f64>>> {
    let rows = load_vec3(path.as_ref())?;
    Ok(rows.into_iter().map(Point3::from).collect())
}

/// Load an `N×3` float array as vectors.
///
/// # Errors
///
/// Same as [`load_points`].
pub fn load_vectors<P: AsRef<Path>>(path: P) -> MedialResult<Vec<Vector3<f64>>> {
    let rows = load_vec3(path.as_ref())?;
    Ok(rows.into_iter().map(Vector3::from).collect())
}

/// Load a one-dimensional integer array.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, is not a valid `.npy`
/// file, or does not hold a one-dimensional `i4`/`i8` array.
pub fn load_indices<P: AsRef<Path>>(path: P) -> MedialResult<Vec<i64>> {
    let path = path.as_ref();
    let (header, data) = read_array(path)?;

    if header.shape.len() != 1 {
        return Err(MedialError::invalid_array(
            path,
            format!("expected a 1-D array, got shape {:?}", header.shape),
        ));
    }
    if header.dtype.scalar.is_float() {
        return Err(MedialError::invalid_array(path, "expected an integer array"));
    }

    Ok(decode_integers(&data, header.dtype))
}

/// Save points as an `N×3` little-endian `f4` array.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
#[allow(clippy::cast_possible_truncation)]
pub fn save_points<P: AsRef<Path>>(path: P, points: &[Point3<f64>]) -> MedialResult<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;

    write_header(&mut writer, "<f4", &[points.len(), 3])?;
    for p in points {
        for v in [p.x, p.y, p.z] {
            writer.write_all(&(v as f32).to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Save feature indices as an `N` little-endian `i4` array, `-1` for `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written, or an index
/// does not fit in 32 bits.
pub fn save_indices<P: AsRef<Path>>(path: P, indices: &[Option<usize>]) -> MedialResult<()> {
    let path = path.as_ref();

    let values = indices
        .iter()
        .map(|idx| match idx {
            None => Ok(-1),
            Some(i) => i32::try_from(*i).map_err(|_| {
                MedialError::invalid_array(path, format!("index {i} does not fit in int32"))
            }),
        })
        .collect::<MedialResult<Vec<i32>>>()?;

    let mut writer = create(path)?;
    write_header(&mut writer, "<i4", &[values.len()])?;
    for v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn create(path: &Path) -> MedialResult<BufWriter<File>> {
    let file = File::create(path).map_err(|source| MedialError::OutputNotWritable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufWriter::new(file))
}

fn load_vec3(path: &Path) -> MedialResult<Vec<[f64; 3]>> {
    let (header, data) = read_array(path)?;

    if header.shape.len() != 2 || header.shape[1] != 3 {
        return Err(MedialError::invalid_array(
            path,
            format!("expected an N x 3 array, got shape {:?}", header.shape),
        ));
    }
    if !header.dtype.scalar.is_float() {
        return Err(MedialError::invalid_array(path, "expected a float array"));
    }

    let values = decode_floats(&data, header.dtype);
    Ok(values
        .chunks_exact(3)
        .map(|row| [row[0], row[1], row[2]])
        .collect())
}

/// Read and check the header, then the raw data section.
fn read_array(path: &Path) -> MedialResult<(Header, Vec<u8>)> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MedialError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MedialError::Io(e)
        }
    })?;
    let mut reader = BufReader::new(file);

    let mut preamble = [0u8; 8];
    reader
        .read_exact(&mut preamble)
        .map_err(|_| MedialError::invalid_array(path, "file too short"))?;
    if &preamble[..6] != MAGIC {
        return Err(MedialError::invalid_array(path, "missing NUMPY magic"));
    }

    let header_len = match preamble[6] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            usize::from(u16::from_le_bytes(len))
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            usize::try_from(u32::from_le_bytes(len))
                .map_err(|_| MedialError::invalid_array(path, "header too large"))?
        }
        v => {
            return Err(MedialError::invalid_array(
                path,
                format!("unsupported format version {v}"),
            ));
        }
    };

    let mut header_bytes = vec![0u8; header_len];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|_| MedialError::invalid_array(path, "truncated header"))?;
    let text = String::from_utf8(header_bytes)
        .map_err(|_| MedialError::invalid_array(path, "header is not valid text"))?;
    let header = parse_header(&text).map_err(|msg| MedialError::invalid_array(path, msg))?;

    if header.fortran_order {
        return Err(MedialError::invalid_array(
            path,
            "Fortran-ordered arrays are not supported",
        ));
    }

    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;

    let expected = header.data_len().ok_or_else(|| {
        MedialError::invalid_array(path, format!("shape {:?} is too large", header.shape))
    })?;
    if data.len() < expected {
        return Err(MedialError::invalid_array(
            path,
            format!("expected {expected} data bytes, got {}", data.len()),
        ));
    }
    data.truncate(expected);

    Ok((header, data))
}

fn parse_header(text: &str) -> Result<Header, String> {
    let descr = dict_value(text, "descr").ok_or("missing 'descr'")?;
    let descr = quoted(descr).ok_or("malformed 'descr'")?;
    let dtype = Dtype::parse(descr).ok_or_else(|| format!("unsupported dtype '{descr}'"))?;

    let fortran = dict_value(text, "fortran_order").ok_or("missing 'fortran_order'")?;
    let fortran_order = if fortran.starts_with("True") {
        true
    } else if fortran.starts_with("False") {
        false
    } else {
        return Err("malformed 'fortran_order'".to_string());
    };

    let shape = dict_value(text, "shape").ok_or("missing 'shape'")?;
    let inner = shape
        .strip_prefix('(')
        .and_then(|s| s.split_once(')'))
        .map(|(inner, _)| inner)
        .ok_or("malformed 'shape'")?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| format!("bad shape entry '{s}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        dtype,
        fortran_order,
        shape,
    })
}

/// Text following `'key':` in a dict literal.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let start = text
        .find(&format!("'{key}'"))
        .or_else(|| text.find(&format!("\"{key}\"")))?;
    let rest = &text[start + key.len() + 2..];
    let rest = rest.trim_start().strip_prefix(':')?;
    Some(rest.trim_start())
}

fn quoted(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &text[1..];
    body.find(quote).map(|end| &body[..end])
}

fn decode_floats(data: &[u8], dtype: Dtype) -> Vec<f64> {
    match dtype.scalar {
        Scalar::F32 => data
            .chunks_exact(4)
            .map(|c| {
                let mut b = [0u8; 4];
                b.copy_from_slice(c);
                f64::from(if dtype.big_endian {
                    f32::from_be_bytes(b)
                } else {
                    f32::from_le_bytes(b)
                })
            })
            .collect(),
        Scalar::F64 => data
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                if dtype.big_endian {
                    f64::from_be_bytes(b)
                } else {
                    f64::from_le_bytes(b)
                }
            })
            .collect(),
        Scalar::I32 | Scalar::I64 => Vec::new(),
    }
}

fn decode_integers(data: &[u8], dtype: Dtype) -> Vec<i64> {
    match dtype.scalar {
        Scalar::I32 => data
            .chunks_exact(4)
            .map(|c| {
                let mut b = [0u8; 4];
                b.copy_from_slice(c);
                i64::from(if dtype.big_endian {
                    i32::from_be_bytes(b)
                } else {
                    i32::from_le_bytes(b)
                })
            })
            .collect(),
        Scalar::I64 => data
            .chunks_exact(8)
            .map(|c| {
                let mut b = [0u8; 8];
                b.copy_from_slice(c);
                if dtype.big_endian {
                    i64::from_be_bytes(b)
                } else {
                    i64::from_le_bytes(b)
                }
            })
            .collect(),
        Scalar::F32 | Scalar::F64 => Vec::new(),
    }
}

fn write_header<W: Write>(writer: &mut W, descr: &str, shape: &[usize]) -> MedialResult<()> {
    let shape = match shape {
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };

    let mut header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape}, }}");
    // magic + version + u16 length + header + newline
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let len = u16::try_from(header.len()).map_err(|_| {
        MedialError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "npy header too long",
        ))
    })?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    Ok(())
}
