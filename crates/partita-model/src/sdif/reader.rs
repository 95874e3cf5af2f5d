//! SDIF partial-file reader.

use std::collections::BTreeMap;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, warn};

use super::{
    padded, DATA_TYPE_F32, DATA_TYPE_F64, FILE_SIGNATURE, FRAME_HEADER_TAIL, MATRIX_HEADER,
    RBEL_COLUMNS, RBEL_SIGNATURE, RBEP_COLUMNS, RBEP_SIGNATURE, TRC_COLUMNS, TRC_SIGNATURE,
};
use crate::breakpoint::Breakpoint;
use crate::error::{ModelError, ModelResult};
use crate::partial::Partial;
use crate::partial_list::PartialList;

/// Reads partials from an SDIF file on disk.
pub fn read_partials(path: impl AsRef<Path>) -> ModelResult<PartialList> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_partials(&bytes)
}

/// Decodes partials from SDIF bytes.
///
/// Partials are returned in ascending index order. Empty input is rejected
/// because it lacks the file header.
pub fn parse_partials(bytes: &[u8]) -> ModelResult<PartialList> {
    let mut cursor = ByteCursor::new(bytes);
    read_header(&mut cursor)?;

    let mut tracks: BTreeMap<u32, Partial> = BTreeMap::new();
    let mut labels: BTreeMap<u32, u32> = BTreeMap::new();
    let mut frames = 0usize;
    let mut skipped = 0usize;

    while !cursor.is_at_end() {
        let signature = cursor.signature()?;
        let size = cursor.i32()?;
        if size < FRAME_HEADER_TAIL as i32 {
            return Err(ModelError::malformed(format!(
                "frame '{}' declares size {} smaller than its header",
                signature_str(&signature),
                size
            )));
        }
        let frame_offset = cursor.position();
        let mut frame = ByteCursor::at(cursor.take(size as usize)?, frame_offset);
        frames += 1;

        match signature {
            RBEP_SIGNATURE | TRC_SIGNATURE | RBEL_SIGNATURE => {
                read_frame(&mut frame, &signature, &mut tracks, &mut labels)?;
            }
            _ => skipped += 1,
        }
    }

    let mut list = PartialList::with_capacity(tracks.len());
    for (index, mut partial) in tracks {
        if let Some(&label) = labels.get(&index) {
            partial.set_label(label);
        }
        list.push(partial);
    }

    if skipped > 0 {
        warn!(skipped, "skipped SDIF frames with unrecognized signatures");
    }
    debug!(
        frames,
        skipped,
        partials = list.len(),
        "decoded SDIF partial file"
    );
    Ok(list)
}

fn read_header(cursor: &mut ByteCursor<'_>) -> ModelResult<()> {
    let magic = cursor.signature()?;
    if magic != FILE_SIGNATURE {
        return Err(ModelError::malformed("missing SDIF file signature"));
    }
    let size = cursor.i32()?;
    if size < 0 {
        return Err(ModelError::malformed(format!(
            "negative header size {}",
            size
        )));
    }
    // Version fields are informational; skip whatever the header declares.
    cursor.take(size as usize)?;
    Ok(())
}

fn read_frame(
    frame: &mut ByteCursor<'_>,
    frame_signature: &[u8; 4],
    tracks: &mut BTreeMap<u32, Partial>,
    labels: &mut BTreeMap<u32, u32>,
) -> ModelResult<()> {
    let time = frame.f64()?;
    if !time.is_finite() {
        return Err(ModelError::NonFinite {
            field: "frame time",
            value: time,
        });
    }
    let _stream_id = frame.i32()?;
    let matrix_count = frame.i32()?;
    if matrix_count < 0 {
        return Err(ModelError::malformed(format!(
            "negative matrix count {}",
            matrix_count
        )));
    }

    for _ in 0..matrix_count {
        let matrix = read_matrix(frame)?;
        if &matrix.signature != frame_signature {
            continue;
        }
        match matrix.signature {
            RBEP_SIGNATURE => {
                require_columns(&matrix, RBEP_COLUMNS)?;
                for row in matrix.rows() {
                    let index = decode_index(row[0])?;
                    let bp = decode_breakpoint(row[1], row[2], row[4], row[3])?;
                    let bp_time = finite("breakpoint time", time + row[5])?;
                    tracks.entry(index).or_default().insert(bp_time, bp);
                }
            }
            TRC_SIGNATURE => {
                require_columns(&matrix, TRC_COLUMNS)?;
                for row in matrix.rows() {
                    let index = decode_index(row[0])?;
                    let bp = decode_breakpoint(row[1], row[2], 0.0, row[3])?;
                    tracks.entry(index).or_default().insert(time, bp);
                }
            }
            RBEL_SIGNATURE => {
                require_columns(&matrix, RBEL_COLUMNS)?;
                for row in matrix.rows() {
                    let index = decode_index(row[0])?;
                    let label = decode_index(row[1])?;
                    labels.insert(index, label);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

struct Matrix {
    signature: [u8; 4],
    columns: usize,
    values: Vec<f64>,
}

impl Matrix {
    fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // Zero-column matrices have no rows to visit.
        self.values.chunks_exact(self.columns.max(1))
    }
}

fn read_matrix(frame: &mut ByteCursor<'_>) -> ModelResult<Matrix> {
    if frame.remaining() < MATRIX_HEADER {
        return Err(frame.truncated(MATRIX_HEADER));
    }
    let signature = frame.signature()?;
    let data_type = frame.i32()?;
    let rows = frame.i32()?;
    let columns = frame.i32()?;
    if rows < 0 || columns < 0 {
        return Err(ModelError::malformed(format!(
            "matrix '{}' has negative dimensions {}x{}",
            signature_str(&signature),
            rows,
            columns
        )));
    }
    let element_size = match data_type {
        DATA_TYPE_F32 => 4,
        DATA_TYPE_F64 => 8,
        other => {
            return Err(ModelError::malformed(format!(
                "matrix '{}' has unsupported data type 0x{:04x}",
                signature_str(&signature),
                other
            )))
        }
    };
    let (rows, columns) = (rows as usize, columns as usize);
    let data_len = rows
        .checked_mul(columns)
        .and_then(|n| n.checked_mul(element_size))
        .ok_or_else(|| ModelError::malformed("matrix dimensions overflow"))?;
    if data_len > frame.remaining() {
        return Err(frame.truncated(data_len));
    }
    let data = frame.take(data_len)?;
    let values: Vec<f64> = if element_size == 4 {
        data.chunks_exact(4)
            .map(|c| BigEndian::read_f32(c) as f64)
            .collect()
    } else {
        data.chunks_exact(8).map(BigEndian::read_f64).collect()
    };
    // Padding may be omitted after the final matrix of a frame.
    let padding = (padded(data_len) - data_len).min(frame.remaining());
    frame.take(padding)?;

    Ok(Matrix {
        signature,
        columns,
        values,
    })
}

fn require_columns(matrix: &Matrix, needed: usize) -> ModelResult<()> {
    if matrix.columns < needed && !matrix.values.is_empty() {
        return Err(ModelError::malformed(format!(
            "matrix '{}' has {} columns, expected at least {}",
            signature_str(&matrix.signature),
            matrix.columns,
            needed
        )));
    }
    Ok(())
}

fn finite(field: &'static str, value: f64) -> ModelResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NonFinite { field, value })
    }
}

fn decode_index(value: f64) -> ModelResult<u32> {
    let value = finite("index", value)?;
    if value < 0.0 || value > u32::MAX as f64 || value.fract() != 0.0 {
        return Err(ModelError::malformed(format!(
            "index {} is not a non-negative integer",
            value
        )));
    }
    Ok(value as u32)
}

fn decode_breakpoint(
    frequency: f64,
    amplitude: f64,
    bandwidth: f64,
    phase: f64,
) -> ModelResult<Breakpoint> {
    Ok(Breakpoint::new(
        finite("frequency", frequency)?,
        finite("amplitude", amplitude)?,
        finite("bandwidth", bandwidth)?,
        finite("phase", phase)?,
    ))
}

fn signature_str(signature: &[u8; 4]) -> String {
    String::from_utf8_lossy(signature).into_owned()
}

/// Bounds-checked big-endian reader over a byte slice.
struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Absolute offset of `bytes[0]` in the file, for error messages.
    base: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self::at(bytes, 0)
    }

    fn at(bytes: &'a [u8], base: usize) -> Self {
        Self { bytes, pos: 0, base }
    }

    fn position(&self) -> usize {
        self.base + self.pos
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn truncated(&self, needed: usize) -> ModelError {
        ModelError::Truncated {
            offset: self.position(),
            needed,
            available: self.remaining(),
        }
    }

    fn take(&mut self, len: usize) -> ModelResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn signature(&mut self) -> ModelResult<[u8; 4]> {
        let bytes = self.take(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn i32(&mut self) -> ModelResult<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn f64(&mut self) -> ModelResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }
}
