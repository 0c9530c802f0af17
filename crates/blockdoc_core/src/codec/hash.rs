use std::collections::HashSet;

use crate::codec::Result;
use crate::codec::file::Document;
use crate::codec::link::BlockId;
use crate::codec::record::Record;
use crate::codec::schema::Schema;
use crate::codec::value::Value;
use crate::codec::version::Versions;

/// Structural hash of a value tree, comparable across documents.
///
/// The tree is kept flat in pre-order, so arbitrarily long Ref chains compare,
/// hash and drop without recursion. Refs hash as their target block's
/// contents, Ptrs hash as `None`, floats by bit pattern. Abstract fields are
/// left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashKey(Vec<HashToken>);

impl HashKey {
	/// Tokens in pre-order.
	pub fn tokens(&self) -> &[HashToken] {
		&self.0
	}
}

/// One node of a flattened [`HashKey`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashToken {
	/// Empty link, Ptr, or a Ref back into a block already being hashed.
	None,
	/// Integer or enum value.
	Int(i64),
	/// Float bits.
	Float(u32),
	/// String bytes.
	Bytes(Vec<u8>),
	/// Record fields, array elements or bitfield members; the next `n` subtrees.
	Seq(usize),
}

impl Document {
	/// Hash block `id`, following owned Refs.
	///
	/// A Ref back to a block on the current path hashes as [`HashToken::None`].
	pub fn hash_block(&self, id: BlockId) -> Result<HashKey> {
		let mut tokens = Vec::new();
		let mut path = HashSet::from([id]);
		let mut frames = vec![(id, self.hash_pieces(id)?.into_iter())];
		while let Some((owner, pieces)) = frames.last_mut() {
			match pieces.next() {
				Some(Piece::Token(token)) => tokens.push(token),
				Some(Piece::Ref(target)) if path.contains(&target) => tokens.push(HashToken::None),
				Some(Piece::Ref(target)) => {
					path.insert(target);
					let next = self.hash_pieces(target)?.into_iter();
					frames.push((target, next));
				}
				None => {
					path.remove(&*owner);
					frames.pop();
				}
			}
		}
		Ok(HashKey(tokens))
	}

	/// Hash of every root, in root order.
	pub fn root_hashes(&self) -> Result<Vec<HashKey>> {
		self.roots.iter().map(|root| self.hash_block(*root)).collect()
	}

	/// Tokens of one block, with followed Refs left open.
	fn hash_pieces(&self, id: BlockId) -> Result<Vec<Piece>> {
		let block = self.block(id)?;
		let mut pieces = Vec::new();
		record_pieces(&self.schema, &block.record, Versions::new(block.version, self.user_version), &mut pieces)?;
		Ok(pieces)
	}
}

enum Piece {
	Token(HashToken),
	Ref(BlockId),
}

fn record_pieces(schema: &Schema, record: &Record, versions: Versions, out: &mut Vec<Piece>) -> Result<()> {
	let entries = record.entries(schema, versions)?;
	out.push(Piece::Token(HashToken::Seq(entries.len())));
	for (_, value) in entries {
		value_pieces(schema, value, versions, out)?;
	}
	Ok(())
}

fn value_pieces(schema: &Schema, value: &Value, versions: Versions, out: &mut Vec<Piece>) -> Result<()> {
	let token = match value {
		Value::Int(value) | Value::Enum(value) => HashToken::Int(*value),
		Value::Float(value) => HashToken::Float(value.to_bits()),
		Value::Str(raw) => HashToken::Bytes(raw.clone()),
		Value::Bits(values) => {
			out.push(Piece::Token(HashToken::Seq(values.len())));
			out.extend(values.iter().map(|value| Piece::Token(HashToken::Int(i64::from(*value)))));
			return Ok(());
		}
		Value::Link(link) => match link.block() {
			Some(target) if link.is_ref() => {
				out.push(Piece::Ref(target));
				return Ok(());
			}
			_ => HashToken::None,
		},
		Value::Record(record) => return record_pieces(schema, record, versions, out),
		Value::Array(array) => {
			out.push(Piece::Token(HashToken::Seq(array.values().count())));
			for value in array.values() {
				value_pieces(schema, value, versions, out)?;
			}
			return Ok(());
		}
	};
	out.push(Piece::Token(token));
	Ok(())
}
