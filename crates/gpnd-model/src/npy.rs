// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use gpnd_core::GpndError;

/// A dense array decoded from an NPY file, flattened row-major.
///
/// One-dimensional inputs come back with `cols == 1`. Payloads are
/// converted to `f32` because every model weight and pixel buffer in the
/// pipeline is single precision.
#[derive(Clone, Debug, PartialEq)]
pub struct NpyArray {
    pub values: Vec<f32>,
    pub rows: usize,
    pub cols: usize,
}

struct ParsedHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

#[derive(Clone, Copy, Debug)]
enum ByteOrder {
    Little,
    Big,
}

pub fn read_npy_file(path: &Path) -> Result<NpyArray, GpndError> {
    let bytes = fs::read(path)
        .map_err(|source| GpndError::io(format!("failed to read '{}'", path.display()), source))?;
    parse_npy_bytes(bytes.as_slice())
}

pub fn parse_npy_bytes(bytes: &[u8]) -> Result<NpyArray, GpndError> {
    const MAGIC: &[u8; 6] = b"\x93NUMPY";

    if bytes.len() < 10 {
        return Err(GpndError::invalid_input(
            "NPY input is too short to contain a valid header",
        ));
    }
    if &bytes[..6] != MAGIC {
        return Err(GpndError::invalid_input(
            "invalid NPY magic; expected '\\x93NUMPY'",
        ));
    }

    let major = bytes[6];
    let (header_offset, header_len) = match major {
        1 => {
            let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
            (10usize, header_len)
        }
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(GpndError::invalid_input(
                    "NPY header is truncated for version >= 2",
                ));
            }
            let header_len =
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (12usize, header_len)
        }
        other => {
            return Err(GpndError::not_supported(format!(
                "unsupported NPY version {other}; expected major version 1, 2, or 3"
            )));
        }
    };

    let header_end = header_offset
        .checked_add(header_len)
        .ok_or_else(|| GpndError::invalid_input("NPY header length overflow"))?;
    if header_end > bytes.len() {
        return Err(GpndError::invalid_input(
            "NPY header exceeds file length; file is truncated",
        ));
    }

    let header_text = std::str::from_utf8(&bytes[header_offset..header_end])
        .map_err(|_| GpndError::invalid_input("NPY header is not valid UTF-8"))?;
    let header = parse_header_text(header_text)?;

    let (rows, cols) = match header.shape.as_slice() {
        [rows] => (*rows, 1usize),
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(GpndError::not_supported(format!(
                "NPY shape {:?} is unsupported; expected 1D or 2D array",
                header.shape
            )));
        }
    };

    if rows == 0 || cols == 0 {
        return Err(GpndError::invalid_input(format!(
            "NPY shape {:?} has zero-sized dimension",
            header.shape
        )));
    }

    let element_count = rows
        .checked_mul(cols)
        .ok_or_else(|| GpndError::invalid_input("NPY shape overflow"))?;
    let (byte_order, element_width) = parse_descr(header.descr.as_str())?;

    let payload = &bytes[header_end..];
    let expected_payload_len = element_count
        .checked_mul(element_width)
        .ok_or_else(|| GpndError::invalid_input("NPY payload length overflow"))?;
    if payload.len() != expected_payload_len {
        return Err(GpndError::invalid_input(format!(
            "NPY payload length mismatch: got {}, expected {} for shape {:?} and descr '{}'",
            payload.len(),
            expected_payload_len,
            header.shape,
            header.descr
        )));
    }

    let mut values = Vec::<f32>::with_capacity(element_count);
    match element_width {
        4 => {
            for chunk in payload.chunks_exact(4) {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(chunk);
                values.push(match byte_order {
                    ByteOrder::Little => f32::from_le_bytes(raw),
                    ByteOrder::Big => f32::from_be_bytes(raw),
                });
            }
        }
        8 => {
            for chunk in payload.chunks_exact(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let wide = match byte_order {
                    ByteOrder::Little => f64::from_le_bytes(raw),
                    ByteOrder::Big => f64::from_be_bytes(raw),
                };
                values.push(wide as f32);
            }
        }
        _ => {
            return Err(GpndError::not_supported(format!(
                "unsupported NPY element width {element_width}; expected 4 or 8 bytes"
            )));
        }
    }

    if header.fortran_order && cols > 1 {
        let mut c_values = vec![0.0f32; element_count];
        for row in 0..rows {
            for col in 0..cols {
                c_values[row * cols + col] = values[col * rows + row];
            }
        }
        values = c_values;
    }

    Ok(NpyArray { values, rows, cols })
}

fn parse_header_text(header: &str) -> Result<ParsedHeader, GpndError> {
    let descr = extract_header_string(header, "descr")?;
    let fortran_order = extract_header_bool(header, "fortran_order")?;
    let shape = extract_header_shape(header, "shape")?;

    Ok(ParsedHeader {
        descr,
        fortran_order,
        shape,
    })
}

fn extract_header_field<'a>(header: &'a str, key: &str) -> Result<&'a str, GpndError> {
    let marker = format!("'{key}':");
    let start = header.find(marker.as_str()).ok_or_else(|| {
        GpndError::invalid_input(format!("NPY header missing required key '{key}'"))
    })?;
    Ok(header[start + marker.len()..].trim_start())
}

fn extract_header_string(header: &str, key: &str) -> Result<String, GpndError> {
    let rest = extract_header_field(header, key)?;
    let Some(after_quote) = rest.strip_prefix('\'') else {
        return Err(GpndError::invalid_input(format!(
            "NPY header field '{key}' must be a quoted string"
        )));
    };
    let end = after_quote.find('\'').ok_or_else(|| {
        GpndError::invalid_input(format!("NPY header field '{key}' has unterminated string"))
    })?;
    Ok(after_quote[..end].to_string())
}

fn extract_header_bool(header: &str, key: &str) -> Result<bool, GpndError> {
    let rest = extract_header_field(header, key)?;
    if rest.starts_with("True") {
        Ok(true)
    } else if rest.starts_with("False") {
        Ok(false)
    } else {
        Err(GpndError::invalid_input(format!(
            "NPY header field '{key}' must be True or False"
        )))
    }
}

fn extract_header_shape(header: &str, key: &str) -> Result<Vec<usize>, GpndError> {
    let rest = extract_header_field(header, key)?;
    let Some(after_paren) = rest.strip_prefix('(') else {
        return Err(GpndError::invalid_input(format!(
            "NPY header field '{key}' must start with '('"
        )));
    };
    let end = after_paren.find(')').ok_or_else(|| {
        GpndError::invalid_input(format!("NPY header field '{key}' has unterminated tuple"))
    })?;
    let dims = after_paren[..end]
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<usize>().map_err(|_| {
                GpndError::invalid_input(format!(
                    "NPY shape entry '{part}' is not a valid non-negative integer"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if dims.is_empty() {
        return Err(GpndError::not_supported(
            "NPY scalar arrays are unsupported; expected shape with 1 or 2 dimensions",
        ));
    }

    Ok(dims)
}

fn parse_descr(descr: &str) -> Result<(ByteOrder, usize), GpndError> {
    let trimmed = descr.trim();
    if trimmed.is_empty() {
        return Err(GpndError::invalid_input("NPY descr is empty"));
    }

    let native = || {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    };
    let (byte_order, dtype) = match trimmed.as_bytes()[0] {
        b'<' | b'|' => (ByteOrder::Little, &trimmed[1..]),
        b'>' => (ByteOrder::Big, &trimmed[1..]),
        b'=' => (native(), &trimmed[1..]),
        b'f' => (native(), trimmed),
        _ => {
            return Err(GpndError::not_supported(format!(
                "unsupported NPY descr '{trimmed}'; expected floating-point dtype f4 or f8"
            )));
        }
    };

    let width = match dtype {
        "f4" => 4,
        "f8" => 8,
        _ => {
            return Err(GpndError::not_supported(format!(
                "unsupported NPY dtype '{dtype}'; expected f4 or f8"
            )));
        }
    };

    Ok((byte_order, width))
}
