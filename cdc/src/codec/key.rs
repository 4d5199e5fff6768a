//! Key-space layout of the upstream store.
//!
//! Two ranges matter to the decoder: the table range (`t...`) holding row and
//! index entries, and the meta range (`m...`) holding the DDL log. Row keys
//! embed the table id and an integer handle; index keys embed the table id,
//! the index id, and the indexed datum values.

use bytes::{Buf, BufMut, Bytes};

use crate::bail;
use crate::codec::datum::{decode_datum, encode_datum};
use crate::error::{CdcResult, ErrorKind};
use crate::schema::{IndexId, SchemaVersion, TableId};
use crate::types::Datum;

const TABLE_PREFIX: u8 = b't';
const META_PREFIX: u8 = b'm';
const ROW_INFIX: &[u8] = b"_r";
const INDEX_INFIX: &[u8] = b"_i";
const DDL_JOB_INFIX: &[u8] = b"ddl:";

/// A parsed table-range key.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedKey {
    /// A primary row entry: the handle addresses one row of the table.
    Row {
        /// The table the row belongs to.
        table_id: TableId,
        /// The integer row handle embedded in the key.
        handle: i64,
    },
    /// A unique-index entry: the datum values are the indexed column values.
    Index {
        /// The table the index belongs to.
        table_id: TableId,
        /// The index within the table.
        index_id: IndexId,
        /// The indexed column values, in index column order.
        values: Vec<Datum>,
    },
}

/// Returns true if the key lies in the reserved meta range, which carries
/// DDL-log writes instead of row data.
pub fn is_meta_key(key: &[u8]) -> bool {
    key.first() == Some(&META_PREFIX)
}

/// Encodes the row key for `handle` in `table_id`.
pub fn encode_row_key(table_id: TableId, handle: i64) -> Bytes {
    let mut key = Vec::with_capacity(1 + 8 + ROW_INFIX.len() + 8);
    key.put_u8(TABLE_PREFIX);
    key.put_u64(table_id.0);
    key.put_slice(ROW_INFIX);
    key.put_i64(handle);

    key.into()
}

/// Encodes the index key for `values` in index `index_id` of `table_id`.
pub fn encode_index_key(table_id: TableId, index_id: IndexId, values: &[Datum]) -> Bytes {
    let mut key = Vec::with_capacity(1 + 8 + INDEX_INFIX.len() + 8);
    key.put_u8(TABLE_PREFIX);
    key.put_u64(table_id.0);
    key.put_slice(INDEX_INFIX);
    key.put_u64(index_id);
    for value in values {
        encode_datum(&mut key, value);
    }

    key.into()
}

/// Encodes the DDL-log history key for the job that produced `version`.
pub fn encode_ddl_job_key(version: SchemaVersion) -> Bytes {
    let mut key = Vec::with_capacity(1 + DDL_JOB_INFIX.len() + 8);
    key.put_u8(META_PREFIX);
    key.put_slice(DDL_JOB_INFIX);
    key.put_u64(version);

    key.into()
}

/// Parses a table-range key into its row or index form.
///
/// Meta-range keys are not accepted here; callers route them with
/// [`is_meta_key`] first.
pub fn decode_key(key: &[u8]) -> CdcResult<DecodedKey> {
    let mut buf = key;

    if buf.remaining() < 1 + 8 + 2 || buf.get_u8() != TABLE_PREFIX {
        bail!(
            ErrorKind::DecodeCorruption,
            "Key does not lie in the table range",
            format!("key {key:02x?}")
        );
    }

    let table_id = TableId(buf.get_u64());

    let mut infix = [0u8; 2];
    buf.copy_to_slice(&mut infix);

    if infix == ROW_INFIX[..] {
        if buf.remaining() != 8 {
            bail!(
                ErrorKind::DecodeCorruption,
                "Row key does not carry exactly one handle",
                format!("key {key:02x?}")
            );
        }

        Ok(DecodedKey::Row {
            table_id,
            handle: buf.get_i64(),
        })
    } else if infix == INDEX_INFIX[..] {
        if buf.remaining() < 8 {
            bail!(
                ErrorKind::DecodeCorruption,
                "Index key is missing its index id",
                format!("key {key:02x?}")
            );
        }

        let index_id = buf.get_u64();
        let mut values = Vec::new();
        while !buf.is_empty() {
            values.push(decode_datum(&mut buf)?);
        }

        Ok(DecodedKey::Index {
            table_id,
            index_id,
            values,
        })
    } else {
        bail!(
            ErrorKind::DecodeCorruption,
            "Key carries an unknown entry marker",
            format!("key {key:02x?}")
        )
    }
}
