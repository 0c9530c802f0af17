use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::expr::Scalar;
use crate::codec::pass::{ReadPass, WritePass};
use crate::codec::schema::Schema;
use crate::codec::value::{ElementType, Value, default_value, read_value, value_from_scalar, value_size, write_value};
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result};

/// Element count above which an array length is treated as corrupt input.
pub const MAX_ARRAY_LEN: usize = 2_000_000;

/// Evaluated dimensions of an array field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayShape {
	/// One dimension.
	Flat(usize),
	/// Rows with independent lengths.
	Jagged(Vec<usize>),
}

impl ArrayShape {
	/// Total element count.
	pub fn total(&self) -> usize {
		match self {
			Self::Flat(len) => *len,
			Self::Jagged(rows) => rows.iter().sum(),
		}
	}
}

/// Storage of an [`Array`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
	/// One-dimensional elements.
	Flat(Vec<Value>),
	/// Two-dimensional, possibly jagged rows.
	Jagged(Vec<Vec<Value>>),
}

/// Homogeneous sequence owned by a record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
	elem: ElementType,
	rows: Rows,
}

impl Array {
	/// Array of `shape` filled with fresh elements.
	pub fn new(schema: &Schema, elem: ElementType, default: Option<&str>, shape: &ArrayShape) -> Result<Self> {
		let fill = |len: usize| (0..len).map(|_| default_value(schema, &elem, default)).collect::<Result<Vec<_>>>();
		let rows = match shape {
			ArrayShape::Flat(len) => Rows::Flat(fill(*len)?),
			ArrayShape::Jagged(lens) => Rows::Jagged(lens.iter().map(|len| fill(*len)).collect::<Result<Vec<_>>>()?),
		};
		Ok(Self { elem, rows })
	}

	/// Element type.
	pub fn elem(&self) -> ElementType {
		self.elem
	}

	/// Raw storage.
	pub fn rows(&self) -> &Rows {
		&self.rows
	}

	/// Current dimensions.
	pub fn shape(&self) -> ArrayShape {
		match &self.rows {
			Rows::Flat(values) => ArrayShape::Flat(values.len()),
			Rows::Jagged(rows) => ArrayShape::Jagged(rows.iter().map(Vec::len).collect()),
		}
	}

	/// Outer length.
	pub fn len(&self) -> usize {
		match &self.rows {
			Rows::Flat(values) => values.len(),
			Rows::Jagged(rows) => rows.len(),
		}
	}

	/// Whether the outer dimension is empty.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Element `index` of a one-dimensional array.
	pub fn get(&self, index: usize) -> Result<&Value> {
		let values = self.flat()?;
		values.get(index).ok_or(CodecError::IndexOutOfRange { index, len: values.len() })
	}

	/// Element `index` of a one-dimensional array, mutably.
	pub fn get_mut(&mut self, index: usize) -> Result<&mut Value> {
		let values = match &mut self.rows {
			Rows::Flat(values) => values,
			Rows::Jagged(_) => return Err(not_flat()),
		};
		let len = values.len();
		values.get_mut(index).ok_or(CodecError::IndexOutOfRange { index, len })
	}

	/// Element `(row, col)` of a two-dimensional array.
	pub fn get2(&self, row: usize, col: usize) -> Result<&Value> {
		let rows = match &self.rows {
			Rows::Jagged(rows) => rows,
			Rows::Flat(_) => {
				return Err(CodecError::ValueKind {
					expected: "two-dimensional array",
					got: "one-dimensional array",
				});
			}
		};
		let values = rows.get(row).ok_or(CodecError::IndexOutOfRange { index: row, len: rows.len() })?;
		values.get(col).ok_or(CodecError::IndexOutOfRange { index: col, len: values.len() })
	}

	/// Element `index` unwrapped to a plain scalar.
	pub fn get_scalar(&self, schema: &Schema, index: usize) -> Result<Scalar> {
		let value = self.get(index)?;
		value.to_scalar(schema, self.elem.ty).ok_or(CodecError::ValueKind {
			expected: "scalar",
			got: value.kind(),
		})
	}

	/// Replace element `index` from a plain scalar.
	pub fn set_scalar(&mut self, schema: &Schema, index: usize, scalar: Scalar) -> Result<()> {
		let value = value_from_scalar(schema, self.elem.ty, scalar)?;
		*self.get_mut(index)? = value;
		Ok(())
	}

	/// All elements, row by row.
	pub fn values(&self) -> impl Iterator<Item = &Value> {
		let (flat, rows): (&[Value], &[Vec<Value>]) = match &self.rows {
			Rows::Flat(values) => (values.as_slice(), Default::default()),
			Rows::Jagged(rows) => (Default::default(), rows.as_slice()),
		};
		flat.iter().chain(rows.iter().flatten())
	}

	/// All elements, row by row, mutably.
	pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
		let (flat, rows): (&mut [Value], &mut [Vec<Value>]) = match &mut self.rows {
			Rows::Flat(values) => (values.as_mut_slice(), Default::default()),
			Rows::Jagged(rows) => (Default::default(), rows.as_mut_slice()),
		};
		flat.iter_mut().chain(rows.iter_mut().flatten())
	}

	/// Integer elements of a one-dimensional array, for per-row lengths.
	pub fn to_ints(&self) -> Option<Vec<i64>> {
		let Rows::Flat(values) = &self.rows else {
			return None;
		};
		values
			.iter()
			.map(|value| match value {
				Value::Int(value) | Value::Enum(value) => Some(*value),
				_ => None,
			})
			.collect()
	}

	/// Grow with fresh elements or truncate to `shape`, keeping retained elements.
	pub fn resize(&mut self, schema: &Schema, default: Option<&str>, shape: &ArrayShape) -> Result<()> {
		let elem = self.elem;
		let same_kind = matches!(
			(&self.rows, shape),
			(Rows::Flat(_), ArrayShape::Flat(_)) | (Rows::Jagged(_), ArrayShape::Jagged(_))
		);
		if !same_kind {
			*self = Self::new(schema, elem, default, shape)?;
			return Ok(());
		}
		let grow = |values: &mut Vec<Value>, len: usize| -> Result<()> {
			if values.len() > len {
				values.truncate(len);
			}
			while values.len() < len {
				values.push(default_value(schema, &elem, default)?);
			}
			Ok(())
		};
		match (&mut self.rows, shape) {
			(Rows::Flat(values), ArrayShape::Flat(len)) => grow(values, *len)?,
			(Rows::Jagged(rows), ArrayShape::Jagged(lens)) => {
				rows.resize_with(lens.len(), Vec::new);
				for (row, len) in rows.iter_mut().zip(lens) {
					grow(row, *len)?;
				}
			}
			_ => {}
		}
		Ok(())
	}

	pub(crate) fn read(schema: &Schema, elem: ElementType, shape: &ArrayShape, cur: &mut Cursor<'_>, pass: &mut ReadPass<'_>) -> Result<Self> {
		let mut read_row = |len: usize| (0..len).map(|_| read_value(schema, &elem, cur, pass)).collect::<Result<Vec<_>>>();
		let rows = match shape {
			ArrayShape::Flat(len) => Rows::Flat(read_row(*len)?),
			ArrayShape::Jagged(lens) => {
				let mut rows = Vec::with_capacity(lens.len());
				for len in lens {
					rows.push(read_row(*len)?);
				}
				Rows::Jagged(rows)
			}
		};
		Ok(Self { elem, rows })
	}

	/// Write every element after checking the stored shape against `expected`.
	pub(crate) fn write(&self, schema: &Schema, elem: &ElementType, field: &str, expected: &ArrayShape, sink: &mut ByteSink, pass: &WritePass<'_>) -> Result<()> {
		self.check_shape(field, expected)?;
		self.values().try_for_each(|value| write_value(schema, elem, value, sink, pass))
	}

	pub(crate) fn size(&self, schema: &Schema, elem: &ElementType, versions: Versions) -> Result<usize> {
		self.values().map(|value| value_size(schema, elem, value, versions)).sum()
	}

	fn check_shape(&self, field: &str, expected: &ArrayShape) -> Result<()> {
		let mismatch = |expected: usize, actual: usize| CodecError::ArraySizeMismatch {
			field: field.into(),
			expected,
			actual,
		};
		match (self.shape(), expected) {
			(ArrayShape::Flat(actual), ArrayShape::Flat(expected)) if actual != *expected => Err(mismatch(*expected, actual)),
			(ArrayShape::Jagged(actual), ArrayShape::Jagged(expected)) => {
				if actual.len() != expected.len() {
					return Err(mismatch(expected.len(), actual.len()));
				}
				match actual.iter().zip(expected).find(|(actual, expected)| actual != expected) {
					Some((actual, expected)) => Err(mismatch(*expected, *actual)),
					None => Ok(()),
				}
			}
			(ArrayShape::Flat(_), ArrayShape::Flat(_)) => Ok(()),
			(actual, expected) => Err(mismatch(expected.total(), actual.total())),
		}
	}

	fn flat(&self) -> Result<&[Value]> {
		match &self.rows {
			Rows::Flat(values) => Ok(values),
			Rows::Jagged(_) => Err(not_flat()),
		}
	}
}

fn not_flat() -> CodecError {
	CodecError::ValueKind {
		expected: "one-dimensional array",
		got: "two-dimensional array",
	}
}
