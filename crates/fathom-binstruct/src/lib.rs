//! Declarative bit-level structures: fields, nested bitfields, and
//! structures (spec §3, §4.2).

pub mod binstruct;
pub mod error;
pub mod field;

pub use binstruct::{Binstruct, Node};
pub use error::{BinstructError, Result};
pub use field::{Endianness, Field, FieldKind, LengthType};
