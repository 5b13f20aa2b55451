//! Decode fixed-width flat file records into Rust structures.
//!
//! Each field of a record type carries a tag such as `"col=1,len=10"` saying
//! which columns of the record hold it. The [`field_tag`] module parses tags,
//! [`schema`] describes a record's fields, [`de`] decodes records from bytes
//! and [`reader`] reads them from files and streams.
//!
//! With the `derive` feature (on by default), the schema can be generated:
//!
//! ```
//! # #[cfg(feature = "derive")]
//! # {
//! use flatfile::FlatRecord;
//!
//! #[derive(Debug, Default, FlatRecord)]
//! struct Customer {
//!     #[flat("1,3")]
//!     name: String,
//!     #[flat("col=4,len=3")]
//!     age: u16,
//! }
//!
//! let c: Customer = flatfile::de::from_str("AMY025").unwrap();
//! assert_eq!(c.name, "AMY");
//! assert_eq!(c.age, 25);
//! # }
//! ```
extern crate self as flatfile;
extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod tag_error;
pub mod field_tag;
pub mod parsing;
pub mod value;
pub mod schema;
pub mod de;
pub mod decode_error;
pub mod reader;

pub use decode_error::{DResult, DecodeError};
pub use de::DecodeSettings;
pub use field_tag::FieldDescriptor;
pub use schema::{Record, Schema};
pub use value::{FieldValue, Kind};

#[cfg(feature = "derive")]
pub use flatfile_derive::FlatRecord;
