//! Row-image value layout.
//!
//! A row image maps column ids to datums. Put values on row keys carry the new
//! image and, when the store captured it, the old image being replaced; Delete
//! values carry the old image where the key alone cannot name the logical row.
//! Index values carry the referenced row handle.

use bytes::{Buf, BufMut, Bytes};

use crate::bail;
use crate::codec::datum::{DatumDecodeError, decode_datum, encode_datum};
use crate::error::{CdcResult, ErrorKind};
use crate::schema::ColumnId;
use crate::types::Datum;

const FLAG_HAS_OLD: u8 = 0b0000_0001;

/// A decoded row image: column ids with their datum values, in encoded order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowImage {
    /// The image's `(column id, value)` entries.
    pub entries: Vec<(ColumnId, Datum)>,
}

impl RowImage {
    /// Creates an image from `(column id, value)` entries.
    pub fn new(entries: Vec<(ColumnId, Datum)>) -> Self {
        Self { entries }
    }

    /// Returns the value of the given column, if present in the image.
    pub fn get(&self, id: ColumnId) -> Option<&Datum> {
        self.entries
            .iter()
            .find(|(column_id, _)| *column_id == id)
            .map(|(_, datum)| datum)
    }
}

/// The decoded value of a row-key mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValue {
    /// The row image the mutation establishes (for Put) or identifies (for
    /// Delete).
    pub row: RowImage,
    /// The replaced image, when the store captured it alongside an update.
    pub old: Option<RowImage>,
}

impl RowValue {
    /// Creates a value carrying only a current image.
    pub fn new(row: RowImage) -> Self {
        Self { row, old: None }
    }

    /// Creates a value carrying a new image and the replaced one.
    pub fn with_old(row: RowImage, old: RowImage) -> Self {
        Self { row, old: Some(old) }
    }
}

/// Encodes a row value: flags byte, current image, optional old image.
pub fn encode_row_value(value: &RowValue) -> Bytes {
    let mut buf = Vec::new();

    let mut flags = 0u8;
    if value.old.is_some() {
        flags |= FLAG_HAS_OLD;
    }
    buf.put_u8(flags);

    encode_row_image(&mut buf, &value.row);
    if let Some(old) = &value.old {
        encode_row_image(&mut buf, old);
    }

    buf.into()
}

/// Decodes a row value, requiring the input to be fully consumed.
pub fn decode_row_value(value: &[u8]) -> CdcResult<RowValue> {
    let mut buf = value;

    if buf.remaining() < 1 {
        bail!(ErrorKind::DecodeCorruption, "Row value is empty");
    }

    let flags = buf.get_u8();
    let row = decode_row_image(&mut buf)?;
    let old = if flags & FLAG_HAS_OLD != 0 {
        Some(decode_row_image(&mut buf)?)
    } else {
        None
    };

    if !buf.is_empty() {
        bail!(
            ErrorKind::DecodeCorruption,
            "Row value carries trailing bytes",
            format!("{} trailing bytes", buf.len())
        );
    }

    Ok(RowValue { row, old })
}

/// Encodes the value of a unique-index Put entry: the referenced row handle.
pub fn encode_index_value(handle: i64) -> Bytes {
    let mut buf = Vec::with_capacity(8);
    buf.put_i64(handle);

    buf.into()
}

/// Decodes a unique-index entry value back into the referenced row handle.
pub fn decode_index_value(value: &[u8]) -> CdcResult<i64> {
    let mut buf = value;

    if buf.remaining() != 8 {
        bail!(
            ErrorKind::DecodeCorruption,
            "Index value does not carry exactly one handle",
            format!("{} bytes", value.len())
        );
    }

    Ok(buf.get_i64())
}

/// Appends one encoded row image to `buf`.
fn encode_row_image(buf: &mut Vec<u8>, image: &RowImage) {
    buf.put_u32(image.entries.len() as u32);
    for (column_id, datum) in &image.entries {
        buf.put_u32(*column_id);
        encode_datum(buf, datum);
    }
}

/// Decodes one row image from the front of `buf`.
fn decode_row_image(buf: &mut &[u8]) -> Result<RowImage, DatumDecodeError> {
    if buf.remaining() < 4 {
        return Err(DatumDecodeError::UnexpectedEof);
    }

    let count = buf.get_u32() as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        if buf.remaining() < 4 {
            return Err(DatumDecodeError::UnexpectedEof);
        }
        let column_id = buf.get_u32();
        let datum = decode_datum(buf)?;
        entries.push((column_id, datum));
    }

    Ok(RowImage { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> RowImage {
        RowImage::new(vec![
            (1, Datum::Int(777)),
            (2, Datum::String("ttt".to_string())),
            (3, Datum::Null),
        ])
    }

    #[test]
    fn row_value_round_trips() {
        let value = RowValue::new(sample_image());
        let encoded = encode_row_value(&value);
        assert_eq!(decode_row_value(&encoded).unwrap(), value);
    }

    #[test]
    fn row_value_with_old_image_round_trips() {
        let old = RowImage::new(vec![(1, Datum::Int(776))]);
        let value = RowValue::with_old(sample_image(), old);
        let encoded = encode_row_value(&value);
        assert_eq!(decode_row_value(&encoded).unwrap(), value);
    }

    #[test]
    fn empty_and_trailing_inputs_are_rejected() {
        assert_eq!(
            decode_row_value(&[]).unwrap_err().kind(),
            ErrorKind::DecodeCorruption
        );

        let mut encoded = encode_row_value(&RowValue::new(sample_image())).to_vec();
        encoded.push(0);
        assert_eq!(
            decode_row_value(&encoded).unwrap_err().kind(),
            ErrorKind::DecodeCorruption
        );
    }

    #[test]
    fn index_value_round_trips() {
        let encoded = encode_index_value(-99);
        assert_eq!(decode_index_value(&encoded).unwrap(), -99);
        assert_eq!(
            decode_index_value(&encoded[..4]).unwrap_err().kind(),
            ErrorKind::DecodeCorruption
        );
    }
}
