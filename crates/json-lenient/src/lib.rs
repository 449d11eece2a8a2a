//! Lenient JSON decoding of UUID leaves.
//!
//! A strict UUID decoder rejects `""` and malformed text. This crate lets a
//! caller tolerate either, substituting the nil UUID, without changing the
//! destination's type. It derives a proxy shape in which every identifier leaf
//! becomes text, decodes into that, and copies the result back.
//!
//! # Overview
//!
//! - [`TypeShape`] / [`Value`] - structural descriptions and dynamic values
//! - [`ProxyBuilder`] - derives the proxy shape and its [`CopyFn`]
//! - [`wrap`] / [`Lenient`] - the decode adapter
//! - [`SchemaCache`] - memoized proxy schemas per `(shape, options)`
//! - [`Shaped`] / [`shaped_record!`] - the same over static Rust types
//!
//! # Example
//!
//! ```
//! use json_lenient::{wrap, Field, Options, TypeShape, Value};
//! use uuid::Uuid;
//!
//! let shape = TypeShape::record(
//!     "Row",
//!     vec![
//!         Field::new("Id", TypeShape::identifier()),
//!         Field::new("Name", TypeShape::text()),
//!     ],
//! );
//! let mut row = Value::zero(&shape);
//!
//! wrap(&shape, &mut row, Options::ALLOW_EMPTY)
//!     .decode(br#"{"id": "", "name": "first"}"#)?;
//! assert_eq!(row, Value::Record(vec![Value::Identifier(Uuid::nil()), Value::from("first")]));
//!
//! let strict = wrap(&shape, &mut row, Options::NONE).decode(br#"{"id": ""}"#);
//! assert!(strict.unwrap_err().is_identifier_format());
//! # Ok::<_, json_lenient::DecodeError>(())
//! ```

mod de;

pub mod cache;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod options;
pub mod proxy;
pub mod shape;
pub mod typed;
pub mod value;

pub use cache::SchemaCache;
pub use decode::{wrap, Lenient};
pub use diagnostics::{DiagnosticSink, Level, TracingSink};
pub use error::DecodeError;
pub use identifier::{identifier_from_text, parse_identifier, render_identifier, DEFAULT_IDENTIFIER};
pub use options::Options;
pub use proxy::{build, CopyFn, ProxyBuilder, ProxySchema};
pub use shape::{Field, FieldTag, LeafKind, RecordShape, TypeShape};
pub use typed::Shaped;
pub use value::Value;
