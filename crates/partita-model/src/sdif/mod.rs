//! SDIF partial-file codec.
//!
//! Partials are stored as SDIF frames of bandwidth-enhanced breakpoints:
//!
//! - `RBEP` rows: `[index, frequency, amplitude, phase, bandwidth, time_offset]`
//! - `1TRC` rows: `[index, frequency, amplitude, phase]` (sinusoidal tracks,
//!   read with zero bandwidth)
//! - `RBEL` rows: `[index, label]`
//!
//! All numbers are big-endian. Frames with any other signature are skipped.
//! The reader validates every size field against the bytes that remain, so
//! corrupt input produces an error instead of a partial result or an
//! oversized allocation.

mod reader;
mod writer;


pub use reader::{parse_partials, read_partials};
pub use writer::{encode_partials, write_partials};

/// File magic.
pub const FILE_SIGNATURE: [u8; 4] = *b"SDIF";
/// Bandwidth-enhanced breakpoint frames and matrices.
pub const RBEP_SIGNATURE: [u8; 4] = *b"RBEP";
/// Partial label frames and matrices.
pub const RBEL_SIGNATURE: [u8; 4] = *b"RBEL";
/// Sinusoidal track frames and matrices.
pub const TRC_SIGNATURE: [u8; 4] = *b"1TRC";

/// Bytes following the header size field.
pub(crate) const HEADER_SIZE: i32 = 8;
pub(crate) const SPEC_VERSION: i32 = 3;
pub(crate) const TYPES_VERSION: i32 = 1;

/// Matrix element type codes.
pub(crate) const DATA_TYPE_F32: i32 = 0x0004;
pub(crate) const DATA_TYPE_F64: i32 = 0x0008;

pub(crate) const RBEP_COLUMNS: usize = 6;
pub(crate) const TRC_COLUMNS: usize = 4;
pub(crate) const RBEL_COLUMNS: usize = 2;

/// Bytes in a frame after its size field, excluding matrices.
pub(crate) const FRAME_HEADER_TAIL: usize = 16;
/// Matrix header bytes.
pub(crate) const MATRIX_HEADER: usize = 16;

/// Rounds a byte count up to the 8-byte alignment used for matrix data.
pub(crate) fn padded(len: usize) -> usize {
    (len + 7) & !7
}
