//! Zero-copy byte cursors and the EBML variable-length integer codec.
//!
//! - [`ByteReader`]: position-tracked reads over a borrowed slice
//! - [`ByteWriter`]: position-tracked writes into a pre-sized slice
//! - [`vint`]: EBML VInt encode/decode, shared by element ids and sizes
//!
//! # Example
//!
//! ```
//! use webmopus_buffer::{ByteReader, ByteWriter, vint};
//!
//! let mut buf = [0u8; 6];
//! let mut w = ByteWriter::new(&mut buf);
//! w.write_vint(127).unwrap();
//! w.write_u32_le(48_000).unwrap();
//!
//! let mut r = ByteReader::new(&buf);
//! let v = r.read_vint(8).unwrap();
//! assert_eq!((v.length(), v.value()), (2, 127));
//! assert_eq!(r.read_u32_le().unwrap(), 48_000);
//! assert_eq!(vint::encode(127).unwrap(), vec![0x40, 0x7F]);
//! ```

mod cursor;
mod error;
pub mod vint;

pub use cursor::{ByteReader, ByteWriter};
pub use error::{Error, Result};
pub use vint::VInt;
