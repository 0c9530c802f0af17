use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::array::MAX_ARRAY_LEN;
use crate::codec::block::BlockTable;
use crate::codec::bytes::Cursor;
use crate::codec::compression::decode_bytes;
use crate::codec::file::{Block, Document};
use crate::codec::header::FileHeader;
use crate::codec::link::{BlockId, LinkPolicy, LinkQueue};
use crate::codec::pass::{LinkPass, ReadPass};
use crate::codec::record::Record;
use crate::codec::schema::{Schema, TypeId};
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result};

/// Decode behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
	/// Handling of dangling or mistyped links.
	pub link_policy: LinkPolicy,
	/// Fail when a block consumes a different byte count than its table entry declares.
	pub check_block_sizes: bool,
	/// Maximum element count of one array.
	pub max_array_len: usize,
	/// Accept bytes after the footer.
	pub allow_trailing_bytes: bool,
}

impl Default for DecodeOptions {
	fn default() -> Self {
		Self::strict()
	}
}

impl DecodeOptions {
	/// Validation preset: every anomaly is an error.
	pub fn strict() -> Self {
		Self {
			link_policy: LinkPolicy::Strict,
			check_block_sizes: true,
			max_array_len: MAX_ARRAY_LEN,
			allow_trailing_bytes: false,
		}
	}

	/// Recovery preset: bad links become `None`, size anomalies are logged.
	pub fn lenient() -> Self {
		Self {
			link_policy: LinkPolicy::Lenient,
			check_block_sizes: false,
			max_array_len: MAX_ARRAY_LEN,
			allow_trailing_bytes: true,
		}
	}
}

impl Document {
	/// Decode a whole container from raw (optionally zstd-compressed) bytes.
	pub fn decode(schema: Arc<Schema>, raw: Vec<u8>, options: &DecodeOptions) -> Result<Self> {
		let (compression, bytes) = decode_bytes(raw)?;
		let mut cur = Cursor::new(&bytes);
		let prefix = FileHeader::parse(&mut cur, schema.format())?;
		let file_versions = Versions::new(prefix.version, prefix.user_version);
		let mut queue = LinkQueue::new();

		let header = read_record(&schema, schema.format().header, &mut cur, file_versions, &mut queue, options)?;

		cur.seek(prefix.table_offset as usize)?;
		let table = BlockTable::read(&mut cur)?;
		let footer_at = cur.pos();
		let (blocks, ids) = read_blocks(&schema, &table, &mut cur, prefix.user_version, &mut queue, options)?;

		cur.seek(footer_at)?;
		let footer = read_record(&schema, schema.format().footer, &mut cur, file_versions, &mut queue, options)?;
		if !cur.is_at_end() {
			if !options.allow_trailing_bytes {
				return Err(CodecError::TrailingData {
					at: cur.pos(),
					rem: cur.remaining(),
				});
			}
			warn!(at = cur.pos(), rem = cur.remaining(), "ignoring trailing bytes after footer");
		}

		let mut doc = Self {
			version: prefix.version,
			user_version: prefix.user_version,
			compression,
			header,
			footer,
			blocks,
			roots: Vec::new(),
			schema,
		};
		doc.fix_links(&ids, &mut queue, options.link_policy)?;
		queue.finish()?;
		doc.roots = doc.find_roots()?;
		debug!(blocks = doc.blocks.len(), roots = doc.roots.len(), links = queue.popped(), "decoded document");
		Ok(doc)
	}

	/// Second pass: pop link tokens in push order and resolve them against `ids`.
	fn fix_links(&mut self, ids: &HashMap<i32, (BlockId, TypeId)>, queue: &mut LinkQueue, policy: LinkPolicy) -> Result<()> {
		let file_versions = self.versions();
		let mut pass = LinkPass {
			versions: file_versions,
			queue,
			table: ids,
			sentinel: self.schema.format().sentinel(self.version),
			policy,
		};
		if let Some(header) = &mut self.header {
			header.fix_links(&self.schema, &mut pass)?;
		}
		for block in &mut self.blocks {
			pass.versions = Versions::new(block.version, self.user_version);
			block.record.fix_links(&self.schema, &mut pass)?;
		}
		pass.versions = file_versions;
		if let Some(footer) = &mut self.footer {
			footer.fix_links(&self.schema, &mut pass)?;
		}
		Ok(())
	}

	fn find_roots(&self) -> Result<Vec<BlockId>> {
		let (Some(name), Some(footer)) = (&self.schema.format().roots_field, &self.footer) else {
			return self.unowned_blocks();
		};
		let roots = footer.get(&self.schema, name)?.as_array().ok_or(CodecError::ValueKind {
			expected: "array",
			got: "scalar",
		})?;
		Ok(roots.values().filter_map(|value| value.as_link().and_then(|link| link.block())).collect())
	}
}

fn read_record(
	schema: &Schema,
	ty: Option<TypeId>,
	cur: &mut Cursor<'_>,
	versions: Versions,
	queue: &mut LinkQueue,
	options: &DecodeOptions,
) -> Result<Option<Record>> {
	let Some(ty) = ty else {
		return Ok(None);
	};
	let mut record = Record::new(schema, ty, None, None)?;
	record.read(
		schema,
		cur,
		&mut ReadPass {
			versions,
			queue,
			max_array_len: options.max_array_len,
		},
	)?;
	Ok(Some(record))
}

type IdTable = HashMap<i32, (BlockId, TypeId)>;

fn read_blocks(
	schema: &Schema,
	table: &BlockTable,
	cur: &mut Cursor<'_>,
	user_version: u32,
	queue: &mut LinkQueue,
	options: &DecodeOptions,
) -> Result<(Vec<Block>, IdTable)> {
	let mut blocks = Vec::with_capacity(table.entries.len());
	let mut ids = IdTable::with_capacity(table.entries.len());

	for (index, entry) in table.entries.iter().enumerate() {
		let type_name = table.type_name(entry).ok_or(CodecError::BadTypeIndex {
			index,
			type_index: entry.type_index,
			count: table.type_names.len() as u32,
		})?;
		let ty = schema
			.type_id(type_name)
			.filter(|ty| schema.is_block_type(*ty))
			.ok_or_else(|| CodecError::UnknownBlockType { type_name: type_name.into() })?;
		let block = BlockId(index as u32);
		if ids.insert(entry.id, (block, ty)).is_some() {
			return Err(CodecError::DuplicateBlockId { id: entry.id });
		}

		let start = entry.offset as usize;
		cur.seek(start)?;
		let mut record = Record::new(schema, ty, None, None)?;
		record.read(
			schema,
			cur,
			&mut ReadPass {
				versions: Versions::new(entry.version, user_version),
				queue: &mut *queue,
				max_array_len: options.max_array_len,
			},
		)?;

		let consumed = cur.pos() - start;
		if consumed != entry.size as usize {
			if options.check_block_sizes {
				return Err(CodecError::BlockSizeMismatch {
					index,
					type_name: type_name.into(),
					declared: entry.size,
					consumed,
				});
			}
			warn!(index, type_name, declared = entry.size, consumed, "block size mismatch");
		}
		debug!(index, type_name, offset = start, size = consumed, id = entry.id, "decoded block");

		blocks.push(Block {
			record,
			version: entry.version,
		});
	}

	Ok((blocks, ids))
}
