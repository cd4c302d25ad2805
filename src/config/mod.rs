//! Persistent key/value configuration left behind by the shop frontend.
//!
//! The frontend's `setPersistentValue(name, value)` bridge appends
//! null-terminated records to a flat binary file: a key record, then a value
//! record whose first byte is `=`. There is no header, count, or checksum,
//! so the file's byte length is the only structure besides the separators.
//!
//! [`store`] loads the file once into an immutable [`ConfigBlob`];
//! [`lookup`] implements the scan for a key's paired value; [`scan`] is the
//! raw byte-pattern search used when a payload is announced inside a larger
//! capture instead of the blob.

mod lookup;
mod scan;
mod store;

pub use scan::find_pattern;
pub use store::ConfigBlob;
