use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::codec::block::{BlockEntry, BlockTable};
use crate::codec::bytes::Cursor;
use crate::codec::compression::{Compression, decode_bytes};
use crate::codec::header::FileHeader;
use crate::codec::link::{BlockId, Link};
use crate::codec::record::Record;
use crate::codec::schema::Schema;
use crate::codec::version::{Versions, format_version};
use crate::codec::{CodecError, DecodeOptions, EncodeOptions, Result};

/// One decoded block and the version it is encoded with.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
	/// Block contents.
	pub record: Record,
	/// Block version from the table entry.
	pub version: u32,
}

/// Decoded container: header and footer records plus an arena of blocks.
///
/// Links between blocks are [`BlockId`] arena indices, so reference cycles
/// need no shared ownership.
#[derive(Debug, Clone)]
pub struct Document {
	pub(crate) schema: Arc<Schema>,
	pub(crate) version: u32,
	pub(crate) user_version: u32,
	pub(crate) compression: Compression,
	pub(crate) header: Option<Record>,
	pub(crate) footer: Option<Record>,
	pub(crate) blocks: Vec<Block>,
	pub(crate) roots: Vec<BlockId>,
}

impl Document {
	/// Empty document with default header and footer records.
	pub fn new(schema: Arc<Schema>, version: u32, user_version: u32) -> Result<Self> {
		let format = schema.format();
		if !format.supports(version) {
			return Err(CodecError::VersionUnsupported {
				format: format.name.clone(),
				version: format_version(version),
			});
		}
		let header = format.header.map(|ty| Record::new(&schema, ty, None, None)).transpose()?;
		let footer = format.footer.map(|ty| Record::new(&schema, ty, None, None)).transpose()?;
		Ok(Self {
			schema,
			version,
			user_version,
			compression: Compression::None,
			header,
			footer,
			blocks: Vec::new(),
			roots: Vec::new(),
		})
	}

	/// Read and decode a container file.
	pub fn open(schema: Arc<Schema>, path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Self> {
		let raw = fs::read(path)?;
		Self::decode(schema, raw, options)
	}

	/// Encode and write to `path`.
	pub fn save(&self, path: impl AsRef<Path>, options: &EncodeOptions) -> Result<()> {
		let bytes = self.encode(options)?;
		fs::write(path, bytes)?;
		Ok(())
	}

	/// Schema the document was decoded with.
	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}

	/// File version.
	pub fn version(&self) -> u32 {
		self.version
	}

	/// File user version.
	pub fn user_version(&self) -> u32 {
		self.user_version
	}

	/// File-level version pair.
	pub fn versions(&self) -> Versions {
		Versions::new(self.version, self.user_version)
	}

	/// Version pair a block is encoded with.
	pub fn block_versions(&self, id: BlockId) -> Result<Versions> {
		Ok(Versions::new(self.block(id)?.version, self.user_version))
	}

	/// Compression the source file used.
	pub fn compression(&self) -> Compression {
		self.compression
	}

	/// Header record.
	pub fn header(&self) -> Option<&Record> {
		self.header.as_ref()
	}

	/// Header record, mutably.
	pub fn header_mut(&mut self) -> Option<&mut Record> {
		self.header.as_mut()
	}

	/// Footer record.
	pub fn footer(&self) -> Option<&Record> {
		self.footer.as_ref()
	}

	/// Footer record, mutably.
	pub fn footer_mut(&mut self) -> Option<&mut Record> {
		self.footer.as_mut()
	}

	/// Number of blocks in the arena.
	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	/// Whether the arena is empty.
	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	/// Every block with its id, in arena order.
	pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
		self.blocks.iter().enumerate().map(|(index, block)| (BlockId(index as u32), block))
	}

	/// Block `id`.
	pub fn block(&self, id: BlockId) -> Result<&Block> {
		self.blocks.get(id.index()).ok_or(CodecError::BlockNotFound { block: id.0 })
	}

	/// Block `id`, mutably.
	pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
		self.blocks.get_mut(id.index()).ok_or(CodecError::BlockNotFound { block: id.0 })
	}

	/// Type name of block `id`.
	pub fn block_type_name(&self, id: BlockId) -> Result<&str> {
		Ok(self.schema.type_name(self.block(id)?.record.ty()))
	}

	/// Append a block encoded at the document version.
	pub fn add_block(&mut self, record: Record) -> Result<BlockId> {
		if !self.schema.is_block_type(record.ty()) {
			return Err(CodecError::UnknownBlockType {
				type_name: self.schema.type_name(record.ty()).into(),
			});
		}
		let id = BlockId(self.blocks.len() as u32);
		self.blocks.push(Block {
			record,
			version: self.version,
		});
		Ok(id)
	}

	/// Append a fresh block of type `type_name`.
	pub fn new_block(&mut self, type_name: &str) -> Result<BlockId> {
		let ty = self.schema.require_type(type_name)?;
		let record = Record::new(&self.schema, ty, None, None)?;
		self.add_block(record)
	}

	/// Root blocks.
	pub fn roots(&self) -> &[BlockId] {
		&self.roots
	}

	/// Replace the root list.
	pub fn set_roots(&mut self, roots: Vec<BlockId>) -> Result<()> {
		for root in &roots {
			self.block(*root)?;
		}
		self.roots = roots;
		Ok(())
	}

	/// Point link field `name` of block `id` at `target`, checking the declared target type.
	pub fn set_link(&mut self, id: BlockId, name: &str, target: Option<BlockId>) -> Result<()> {
		let target_ty = target.map(|target| self.block(target).map(|block| block.record.ty())).transpose()?;
		let schema = Arc::clone(&self.schema);
		let record = &mut self.block_mut(id)?.record;
		let declared = record
			.get(&schema, name)?
			.as_link()
			.ok_or(CodecError::ValueKind {
				expected: "link",
				got: "non-link",
			})?
			.target;
		if let (Some(expected), Some(got), Some(target)) = (declared, target_ty, target)
			&& !schema.is_subtype(got, expected)
		{
			return Err(CodecError::LinkTypeMismatch {
				index: target.0 as i32,
				expected: schema.type_name(expected).into(),
				got: schema.type_name(got).into(),
			});
		}
		record.set_link(&schema, name, target)
	}

	/// Redirect every link to `old` (and `old` as a root) to `new`.
	pub fn replace_block(&mut self, old: BlockId, new: BlockId) -> Result<()> {
		self.block(old)?;
		self.block(new)?;
		let mut redirect = |link: &mut Link| {
			if link.block() == Some(old) {
				link.set(Some(new));
			}
		};
		let records = self
			.header
			.iter_mut()
			.chain(self.blocks.iter_mut().map(|block| &mut block.record))
			.chain(self.footer.iter_mut());
		for record in records {
			record.for_each_link_mut(&mut redirect);
		}
		for root in &mut self.roots {
			if *root == old {
				*root = new;
			}
		}
		Ok(())
	}

	/// Distinct strings from the header, every block and the footer, in first-seen order.
	pub fn strings(&self) -> Result<Vec<Vec<u8>>> {
		let versions = self.versions();
		let mut all = Vec::new();
		if let Some(header) = &self.header {
			header.collect_strings(&self.schema, versions, &mut all)?;
		}
		for block in &self.blocks {
			block
				.record
				.collect_strings(&self.schema, Versions::new(block.version, self.user_version), &mut all)?;
		}
		if let Some(footer) = &self.footer {
			footer.collect_strings(&self.schema, versions, &mut all)?;
		}

		let mut seen = HashSet::new();
		all.retain(|text| seen.insert(text.clone()));
		Ok(all)
	}

	/// Blocks no other block owns through a Ref, in arena order.
	pub fn unowned_blocks(&self) -> Result<Vec<BlockId>> {
		let mut owned = Vec::new();
		for block in &self.blocks {
			block
				.record
				.collect_refs(&self.schema, Versions::new(block.version, self.user_version), &mut owned)?;
		}
		let owned: HashSet<BlockId> = owned.into_iter().collect();
		Ok(self.blocks().map(|(id, _)| id).filter(|id| !owned.contains(id)).collect())
	}
}

/// Quick container metadata read without decoding any record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
	/// Compression of the source bytes.
	pub compression: Compression,
	/// Fixed prefix.
	pub header: FileHeader,
	/// Block table type names.
	pub type_names: Vec<Box<str>>,
	/// Block table entries.
	pub entries: Vec<BlockEntry>,
}

impl Inspection {
	/// Number of blocks per type name, in type-table order.
	pub fn type_counts(&self) -> Vec<(&str, usize)> {
		let mut counts: Vec<(&str, usize)> = self.type_names.iter().map(|name| (&**name, 0)).collect();
		for entry in &self.entries {
			if let Some(count) = counts.get_mut(entry.type_index as usize) {
				count.1 += 1;
			}
		}
		counts
	}
}

/// Read the prefix and block table of `raw` without decoding records.
pub fn inspect(schema: &Schema, raw: Vec<u8>) -> Result<Inspection> {
	let (compression, bytes) = decode_bytes(raw)?;
	let mut cur = Cursor::new(&bytes);
	let header = FileHeader::parse(&mut cur, schema.format())?;
	cur.seek(header.table_offset as usize)?;
	let table = BlockTable::read(&mut cur)?;
	Ok(Inspection {
		compression,
		header,
		type_names: table.type_names,
		entries: table.entries,
	})
}

/// [`inspect`] a file on disk.
pub fn inspect_path(schema: &Schema, path: impl AsRef<Path>) -> Result<Inspection> {
	inspect(schema, fs::read(path)?)
}
