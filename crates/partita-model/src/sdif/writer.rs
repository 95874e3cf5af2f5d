//! SDIF partial-file writer.

use std::io::{self, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::debug;

use super::{
    DATA_TYPE_F64, FILE_SIGNATURE, FRAME_HEADER_TAIL, HEADER_SIZE, MATRIX_HEADER, RBEL_COLUMNS,
    RBEL_SIGNATURE, RBEP_COLUMNS, RBEP_SIGNATURE, SPEC_VERSION, TYPES_VERSION,
};
use crate::error::{ModelError, ModelResult};
use crate::partial_list::PartialList;

/// Writes `partials` to an SDIF file at `path`.
pub fn write_partials(path: impl AsRef<Path>, partials: &PartialList) -> ModelResult<()> {
    let bytes = encode_partials(partials)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// Encodes partials as SDIF bytes.
///
/// Empty partials are skipped; the remaining partials are numbered in list
/// order. A single `RBEL` frame carries labels, followed by one `RBEP` frame
/// per distinct breakpoint time.
pub fn encode_partials(partials: &PartialList) -> ModelResult<Vec<u8>> {
    let mut labels: Vec<[f64; RBEL_COLUMNS]> = Vec::new();
    let mut rows: Vec<(f64, [f64; RBEP_COLUMNS])> = Vec::new();

    for (index, partial) in partials.iter().filter(|p| !p.is_empty()).enumerate() {
        if !partial.is_finite() {
            return Err(ModelError::malformed(format!(
                "partial {} holds non-finite values",
                index
            )));
        }
        let index = index as f64;
        labels.push([index, partial.label() as f64]);
        for (time, bp) in partial.iter() {
            rows.push((
                time,
                [
                    index,
                    bp.frequency(),
                    bp.amplitude(),
                    bp.phase(),
                    bp.bandwidth(),
                    0.0,
                ],
            ));
        }
    }

    // Stable sort keeps partial order within a frame.
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut ordered: Vec<(f64, Vec<[f64; RBEP_COLUMNS]>)> = Vec::new();
    for (time, row) in rows {
        match ordered.last_mut() {
            Some((t, frame)) if *t == time => frame.push(row),
            _ => ordered.push((time, vec![row])),
        }
    }

    let mut out = Vec::new();
    write_header(&mut out)?;
    if !labels.is_empty() {
        write_frame(&mut out, RBEL_SIGNATURE, 0.0, &labels)?;
    }
    for (time, rows) in &ordered {
        write_frame(&mut out, RBEP_SIGNATURE, *time, rows)?;
    }

    debug!(
        partials = labels.len(),
        frames = ordered.len(),
        bytes = out.len(),
        "encoded SDIF partial file"
    );
    Ok(out)
}

fn write_header<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(&FILE_SIGNATURE)?;
    w.write_i32::<BigEndian>(HEADER_SIZE)?;
    w.write_i32::<BigEndian>(SPEC_VERSION)?;
    w.write_i32::<BigEndian>(TYPES_VERSION)?;
    Ok(())
}

fn write_frame<W: Write, const N: usize>(
    w: &mut W,
    signature: [u8; 4],
    time: f64,
    rows: &[[f64; N]],
) -> io::Result<()> {
    // f64 data is always 8-byte aligned, so no padding is needed.
    let data_len = rows.len() * N * 8;
    let size = FRAME_HEADER_TAIL + MATRIX_HEADER + data_len;
    let size = i32::try_from(size).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds SDIF size limit")
    })?;

    w.write_all(&signature)?;
    w.write_i32::<BigEndian>(size)?;
    w.write_f64::<BigEndian>(time)?;
    w.write_i32::<BigEndian>(0)?; // stream id
    w.write_i32::<BigEndian>(1)?; // matrix count

    w.write_all(&signature)?;
    w.write_i32::<BigEndian>(DATA_TYPE_F64)?;
    w.write_i32::<BigEndian>(rows.len() as i32)?;
    w.write_i32::<BigEndian>(N as i32)?;
    for row in rows {
        for &value in row {
            w.write_f64::<BigEndian>(value)?;
        }
    }
    Ok(())
}
