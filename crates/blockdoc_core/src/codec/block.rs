use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::primitive::MAX_SIZED_STRING_LEN;
use crate::codec::{CodecError, Result};

/// Encoded size of one [`BlockEntry`].
pub const BLOCK_ENTRY_SIZE: usize = 20;

/// One row of the block table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
	/// Index into [`BlockTable::type_names`].
	pub type_index: u32,
	/// Version the block payload was written with.
	pub version: u32,
	/// Absolute payload offset.
	pub offset: u32,
	/// Payload byte count.
	pub size: u32,
	/// Stable id that link tokens refer to.
	pub id: i32,
}

/// Block index: distinct type names plus one entry per block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTable {
	/// Distinct type names in first-use order.
	pub type_names: Vec<Box<str>>,
	/// Entries in file order.
	pub entries: Vec<BlockEntry>,
}

impl BlockTable {
	/// Parse the table at the cursor position.
	pub fn read(cur: &mut Cursor<'_>) -> Result<Self> {
		let type_count = cur.read_u32_le()? as usize;
		require(cur, type_count, 4)?;
		let mut type_names = Vec::with_capacity(type_count);
		for _ in 0..type_count {
			let len = cur.read_u32_le()? as usize;
			if len > MAX_SIZED_STRING_LEN {
				return Err(CodecError::StringTooLong {
					len,
					max: MAX_SIZED_STRING_LEN,
				});
			}
			type_names.push(String::from_utf8_lossy(cur.read_exact(len)?).into());
		}

		let block_count = cur.read_u32_le()? as usize;
		require(cur, block_count, BLOCK_ENTRY_SIZE)?;
		let mut entries = Vec::with_capacity(block_count);
		for _ in 0..block_count {
			entries.push(BlockEntry {
				type_index: cur.read_u32_le()?,
				version: cur.read_u32_le()?,
				offset: cur.read_u32_le()?,
				size: cur.read_u32_le()?,
				id: cur.read_i32_le()?,
			});
		}

		Ok(Self { type_names, entries })
	}

	/// Append the encoded table.
	pub fn write(&self, sink: &mut ByteSink) {
		sink.put_u32_le(self.type_names.len() as u32);
		for name in &self.type_names {
			sink.put_u32_le(name.len() as u32);
			sink.put_bytes(name.as_bytes());
		}
		sink.put_u32_le(self.entries.len() as u32);
		for entry in &self.entries {
			sink.put_u32_le(entry.type_index);
			sink.put_u32_le(entry.version);
			sink.put_u32_le(entry.offset);
			sink.put_u32_le(entry.size);
			sink.put_i32_le(entry.id);
		}
	}

	/// Type name of `entry`, if its index is in range.
	pub fn type_name(&self, entry: &BlockEntry) -> Option<&str> {
		self.type_names.get(entry.type_index as usize).map(|name| &**name)
	}
}

/// Reject counts whose minimum encoding cannot fit in the remaining input.
fn require(cur: &Cursor<'_>, count: usize, each: usize) -> Result<()> {
	let need = count.saturating_mul(each);
	if need > cur.remaining() {
		return Err(CodecError::UnexpectedEof {
			at: cur.pos(),
			need,
			rem: cur.remaining(),
		});
	}
	Ok(())
}
