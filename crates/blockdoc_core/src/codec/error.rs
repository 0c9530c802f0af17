use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while decoding, encoding, and editing block documents.
#[derive(Debug, Error)]
pub enum CodecError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Schema metadata failed validation.
	#[error("schema: {0}")]
	Schema(#[from] SchemaError),
	/// Leading bytes do not match the format magic.
	#[error("not a {format} file (magic={got:?})")]
	NotAFile {
		/// Format name from the schema.
		format: Box<str>,
		/// Leading bytes actually found.
		got: Vec<u8>,
	},
	/// File declares a version outside the supported list.
	#[error("unsupported {format} version {version}")]
	VersionUnsupported {
		/// Format name from the schema.
		format: Box<str>,
		/// Dotted rendering of the declared version.
		version: String,
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
	/// Not enough bytes remained for a requested read.
	#[error("unexpected eof at offset {at}, need {need} bytes, remaining {rem}")]
	UnexpectedEof {
		/// Byte offset where the read was attempted.
		at: usize,
		/// Requested bytes.
		need: usize,
		/// Bytes still available.
		rem: usize,
	},
	/// Seek target lies outside the stream.
	#[error("seek to {to} outside stream of {len} bytes")]
	SeekOutOfRange {
		/// Requested absolute offset.
		to: usize,
		/// Stream length.
		len: usize,
	},
	/// Expression text is malformed.
	#[error("expression syntax error in {expr:?}: {reason}")]
	ExprParse {
		/// Original expression text.
		expr: Box<str>,
		/// Short description of the failure.
		reason: &'static str,
	},
	/// Expression referenced a name the evaluation context does not have.
	#[error("missing field {name} on {context}")]
	MissingField {
		/// Canonical identifier that failed to resolve.
		name: Box<str>,
		/// Context type name.
		context: Box<str>,
	},
	/// Operator applied to operands it cannot combine.
	#[error("cannot apply {op} to {left} and {right}")]
	ExprType {
		/// Operator symbol.
		op: &'static str,
		/// Left operand kind.
		left: &'static str,
		/// Right operand kind.
		right: &'static str,
	},
	/// Field value cannot be used as an expression operand.
	#[error("field {name} of kind {kind} cannot be used in an expression")]
	ExprOperand {
		/// Field identifier.
		name: Box<str>,
		/// Value kind label.
		kind: &'static str,
	},
	/// Template substitution was required but no template type is bound.
	#[error("{type_name}.{field} requires a template type but none is bound")]
	MissingAttribute {
		/// Record type name.
		type_name: Box<str>,
		/// Field requiring the template.
		field: Box<str>,
	},
	/// Numeric value outside its declared range.
	#[error("{type_name} value {value} out of range [{min}, {max}]")]
	Range {
		/// Declared type name.
		type_name: Box<str>,
		/// Offending value.
		value: i64,
		/// Minimum permitted value.
		min: i64,
		/// Maximum permitted value.
		max: i64,
	},
	/// Text could not be converted to the declared type.
	#[error("cannot convert {text:?} to {type_name}")]
	BadLiteral {
		/// Declared type name.
		type_name: Box<str>,
		/// Offending text.
		text: Box<str>,
	},
	/// String longer than its declared capacity.
	#[error("string of {len} bytes exceeds maximum {max}")]
	StringTooLong {
		/// Actual byte length.
		len: usize,
		/// Maximum permitted byte length.
		max: usize,
	},
	/// Enum value not in its declared option set.
	#[error("invalid {enum_name} value {value}")]
	InvalidEnumValue {
		/// Enum type name.
		enum_name: Box<str>,
		/// Rejected integer value.
		value: i64,
	},
	/// Bitfield member name does not exist.
	#[error("bitfield {bitfield} has no member {member}")]
	UnknownBitMember {
		/// Bitfield type name.
		bitfield: Box<str>,
		/// Requested member name.
		member: Box<str>,
	},
	/// Array length expression produced a negative count.
	#[error("array {field} has negative length {value}")]
	NegativeArrayLength {
		/// Field name.
		field: Box<str>,
		/// Evaluated length.
		value: i64,
	},
	/// Array length exceeded the configured safety ceiling.
	#[error("array {field} too large: count={count}, max={max}")]
	ArrayTooLarge {
		/// Field name.
		field: Box<str>,
		/// Requested element count.
		count: usize,
		/// Maximum permitted element count.
		max: usize,
	},
	/// Stored array length differs from its length expression.
	#[error("array {field} holds {actual} elements but its length expression gives {expected}")]
	ArraySizeMismatch {
		/// Field name.
		field: Box<str>,
		/// Evaluated length.
		expected: usize,
		/// Stored length.
		actual: usize,
	},
	/// Element index outside array bounds.
	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange {
		/// Requested index.
		index: usize,
		/// Current length.
		len: usize,
	},
	/// Requested field is not part of the record type.
	#[error("{type_name} has no field {field}")]
	FieldNotFound {
		/// Record type name.
		type_name: Box<str>,
		/// Requested field name.
		field: Box<str>,
	},
	/// Value has a different kind than the operation expects.
	#[error("expected {expected}, got {got}")]
	ValueKind {
		/// Expected value kind.
		expected: &'static str,
		/// Actual value kind.
		got: &'static str,
	},
	/// Requested type name is not in the schema.
	#[error("unknown type {name}")]
	UnknownType {
		/// Requested type name.
		name: Box<str>,
	},
	/// Block table names a type the schema does not know or cannot instantiate.
	#[error("unknown block type {type_name}")]
	UnknownBlockType {
		/// Type tag from the block table.
		type_name: Box<str>,
	},
	/// Block table entry points at a missing type tag.
	#[error("block {index} references type tag {type_index} but only {count} exist")]
	BadTypeIndex {
		/// Block table position.
		index: usize,
		/// Referenced type tag index.
		type_index: u32,
		/// Number of type tags.
		count: u32,
	},
	/// Two block table entries share a stable id.
	#[error("duplicate block id {id}")]
	DuplicateBlockId {
		/// Repeated id.
		id: i32,
	},
	/// Block consumed a different byte count than its table entry declares.
	#[error("block {index} ({type_name}) declares {declared} bytes but {consumed} were decoded")]
	BlockSizeMismatch {
		/// Block table position.
		index: usize,
		/// Block type name.
		type_name: Box<str>,
		/// Declared size.
		declared: u32,
		/// Decoded size.
		consumed: usize,
	},
	/// Bytes remained after the footer.
	#[error("{rem} trailing bytes at offset {at}")]
	TrailingData {
		/// Offset where trailing data starts.
		at: usize,
		/// Number of trailing bytes.
		rem: usize,
	},
	/// Link token does not name any decoded block.
	#[error("link to unknown block {index}")]
	LinkUnresolved {
		/// Raw link token.
		index: i32,
	},
	/// Link target has a type incompatible with the field declaration.
	#[error("link {index} expected {expected}, got {got}")]
	LinkTypeMismatch {
		/// Raw link token.
		index: i32,
		/// Declared target type name.
		expected: Box<str>,
		/// Actual block type name.
		got: Box<str>,
	},
	/// Link tokens pushed and popped do not balance.
	#[error("link queue imbalance: pushed={pushed}, popped={popped} (schema bug or corrupt stream)")]
	LinkQueueImbalance {
		/// Tokens pushed during decode.
		pushed: usize,
		/// Tokens popped during resolution.
		popped: usize,
	},
	/// Link was written before it was resolved.
	#[error("link token {index} was never resolved")]
	LinkNotResolved {
		/// Raw link token.
		index: i32,
	},
	/// Link points at a block that is not part of the encoded block list.
	#[error("link to block {block} which is not in the encoded block list")]
	LinkNotListed {
		/// Arena index of the target block.
		block: u32,
	},
	/// Block id is not part of the document.
	#[error("block {block} does not exist")]
	BlockNotFound {
		/// Requested arena index.
		block: u32,
	},
}

/// Errors produced while validating schema metadata.
#[derive(Debug, Error)]
pub enum SchemaError {
	/// Schema document is not valid JSON for the expected shape.
	#[error("json: {0}")]
	Json(#[from] serde_json::Error),
	/// Two types share one name.
	#[error("duplicate type {name}")]
	DuplicateType {
		/// Repeated type name.
		name: Box<str>,
	},
	/// Type reference could not be resolved.
	#[error("{owner}: unknown type {name}")]
	UnknownType {
		/// Declaring type or field.
		owner: Box<str>,
		/// Unresolved type name.
		name: Box<str>,
	},
	/// Base type is not a record.
	#[error("{owner}: base {base} is not a record")]
	BaseNotRecord {
		/// Derived record name.
		owner: Box<str>,
		/// Offending base name.
		base: Box<str>,
	},
	/// Inheritance chain loops back on itself.
	#[error("inheritance cycle through {name}")]
	InheritanceCycle {
		/// Record name on the cycle.
		name: Box<str>,
	},
	/// Storage type is not an integer of 1, 2 or 4 bytes.
	#[error("{owner}: unsupported storage {storage}")]
	BadStorage {
		/// Enum or bitfield name.
		owner: Box<str>,
		/// Offending storage type name.
		storage: Box<str>,
	},
	/// Enum declaration problem.
	#[error("enum {owner}: {reason}")]
	BadEnum {
		/// Enum name.
		owner: Box<str>,
		/// Short description of the problem.
		reason: String,
	},
	/// Bitfield declaration problem.
	#[error("bitfield {owner}: {reason}")]
	BadBitfield {
		/// Bitfield name.
		owner: Box<str>,
		/// Short description of the problem.
		reason: String,
	},
	/// Field declaration problem.
	#[error("{owner}.{field}: {reason}")]
	BadField {
		/// Record name.
		owner: Box<str>,
		/// Field name.
		field: Box<str>,
		/// Short description of the problem.
		reason: String,
	},
	/// Expression failed to parse.
	#[error("{owner}.{field}: {source}")]
	Expr {
		/// Record name.
		owner: Box<str>,
		/// Field name.
		field: Box<str>,
		/// Parse failure.
		source: Box<CodecError>,
	},
	/// Duplicate field names disagree on their shape.
	#[error("{owner}: duplicate field {field} disagrees with earlier declaration")]
	DuplicateFieldMismatch {
		/// Record name.
		owner: Box<str>,
		/// Field name.
		field: Box<str>,
	},
	/// Version literal could not be parsed.
	#[error("bad version literal {text:?}")]
	BadVersion {
		/// Offending literal.
		text: Box<str>,
	},
	/// Format section problem.
	#[error("format: {reason}")]
	BadFormat {
		/// Short description of the problem.
		reason: String,
	},
}
