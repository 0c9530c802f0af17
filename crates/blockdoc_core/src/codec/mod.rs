mod array;
mod bitfield;
mod block;
mod bytes;
mod compression;
mod decode;
mod display;
mod encode;
mod enums;
mod error;
mod expr;
mod file;
mod hash;
mod header;
mod link;
mod pass;
mod primitive;
mod record;
mod schema;
mod value;
mod version;

/// Homogeneous one- and two-dimensional arrays.
pub use array::{Array, ArrayShape, MAX_ARRAY_LEN, Rows};
/// Packed sub-integer members.
pub use bitfield::{BitMember, BitfieldDef};
/// Block table layout.
pub use block::{BLOCK_ENTRY_SIZE, BlockEntry, BlockTable};
/// Bounds-checked byte cursor and growable sink.
pub use bytes::{ByteSink, Cursor};
/// Transparent zstd handling.
pub use compression::{Compression, ZSTD_MAGIC, decode_bytes, encode_bytes};
/// Whole-file decode.
pub use decode::DecodeOptions;
/// Indented text rendering of record trees.
pub use display::{MAX_DISPLAY_ITEMS, RecordDisplay, render_value};
/// Whole-file encode.
pub use encode::{BlockPlan, EncodeOptions};
/// Named integer domains.
pub use enums::{EnumDef, EnumOption};
/// Error and result types.
pub use error::{CodecError, Result, SchemaError};
/// Condition and array-length expressions.
pub use expr::{EvalContext, Expr, Op, Scalar, canonical_name};
/// Decoded documents and quick inspection.
pub use file::{Block, Document, Inspection, inspect, inspect_path};
/// Structural hashing for diff and dedup.
pub use hash::{HashKey, HashToken};
/// Fixed file prefix.
pub use header::FileHeader;
/// Typed block references and the decode-time link queue.
pub use link::{BlockId, Link, LinkKind, LinkPolicy, LinkQueue, LinkState, link_sentinel};
/// Leaf codecs.
pub use primitive::{Primitive, parse_int_literal};
/// Schema record instances.
pub use record::Record;
/// Validated schema metadata and its JSON document form.
pub use schema::{
	BitMemberDoc, BitfieldDoc, EnumDoc, EnumOptionDoc, FieldDoc, FieldSpec, FieldType, FormatDoc, FormatSpec, LiteralDoc, RecordDef, RecordDoc, Schema, SchemaDoc,
	TypeDef, TypeFlags, TypeId, TypeKind,
};
/// Decoded values.
pub use value::{ElementType, Value, default_value, value_from_scalar};
/// Version pairs and dotted version text.
pub use version::{Versions, format_version, parse_version};
