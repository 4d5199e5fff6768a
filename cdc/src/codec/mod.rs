//! Physical key and value layouts of the upstream store.
//!
//! The decode half feeds the transaction mounter; the encode half feeds test
//! fixtures and embedding systems that replay captured streams. Layouts follow
//! the upstream store's conventions: row keys address a table and an integer
//! handle, index keys address a table, an index, and the indexed datum values,
//! and a reserved meta range carries the DDL log.

pub mod datum;
pub mod key;
pub mod row;
