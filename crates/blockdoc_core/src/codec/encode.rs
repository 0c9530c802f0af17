use std::collections::HashMap;

use tracing::debug;

use crate::codec::array::MAX_ARRAY_LEN;
use crate::codec::block::{BlockEntry, BlockTable};
use crate::codec::bytes::ByteSink;
use crate::codec::compression::{Compression, encode_bytes};
use crate::codec::file::Document;
use crate::codec::header::FileHeader;
use crate::codec::link::{BlockId, LinkPolicy};
use crate::codec::pass::WritePass;
use crate::codec::record::Record;
use crate::codec::schema::TypeId;
use crate::codec::value::Value;
use crate::codec::version::Versions;
use crate::codec::{CodecError, Result};

/// Encode behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
	/// Handling of links to blocks outside the written block list.
	pub link_policy: LinkPolicy,
	/// Output compression.
	pub compression: Compression,
}

/// Dependency-ordered block list for one encode.
#[derive(Debug, Default)]
pub struct BlockPlan {
	/// Blocks in output order.
	pub order: Vec<BlockId>,
	/// Id written for each listed block.
	pub ids: HashMap<BlockId, i32>,
	/// Distinct type names in first-visit order.
	pub type_names: Vec<Box<str>>,
	/// Type-table index of each listed block.
	pub type_index: HashMap<BlockId, u32>,
}

impl Document {
	/// Order the blocks to write, starting from the roots.
	///
	/// Owned children come after their owner, except children whose type is
	/// listed as child-first, which come before it. When the footer lists the
	/// roots, blocks unreachable from them are left out. Otherwise every
	/// block is written: blocks missed by the root walk follow in arena order.
	pub fn plan_blocks(&self) -> Result<BlockPlan> {
		let mut planner = Planner {
			doc: self,
			plan: BlockPlan::default(),
			types: HashMap::new(),
		};
		for root in &self.roots {
			planner.visit(*root)?;
		}
		if self.schema.format().roots_field.is_none() {
			for (id, _) in self.blocks() {
				planner.visit(id)?;
			}
		}

		let mut plan = planner.plan;
		let by_index = self.version >= self.schema.format().link_sentinel_since;
		for (pos, block) in plan.order.iter().enumerate() {
			let id = if by_index { pos } else { pos + 1 };
			plan.ids.insert(*block, id as i32);
		}
		Ok(plan)
	}

	/// Encode the planned blocks into container bytes.
	pub fn encode(&self, options: &EncodeOptions) -> Result<Vec<u8>> {
		let schema = &*self.schema;
		let format = schema.format();
		let plan = self.plan_blocks()?;
		let pass = |versions: Versions| WritePass {
			versions,
			index: &plan.ids,
			sentinel: format.sentinel(self.version),
			policy: options.link_policy,
			max_array_len: MAX_ARRAY_LEN,
		};

		let mut sink = ByteSink::new();
		let prefix = FileHeader {
			version: self.version,
			user_version: self.user_version,
			table_offset: 0,
		};
		prefix.write(&mut sink, format);
		if let Some(header) = &self.header {
			header.write(schema, None, &mut sink, &pass(self.versions()))?;
		}

		let mut table = BlockTable {
			type_names: plan.type_names.clone(),
			entries: Vec::with_capacity(plan.order.len()),
		};
		for id in &plan.order {
			let block = self.block(*id)?;
			let offset = sink.len();
			block
				.record
				.write(schema, None, &mut sink, &pass(Versions::new(block.version, self.user_version)))?;
			let size = sink.len() - offset;
			debug!(block = id.0, type_name = schema.type_name(block.record.ty()), offset, size, "encoded block");
			table.entries.push(BlockEntry {
				type_index: plan.type_index.get(id).copied().unwrap_or(0),
				version: block.version,
				offset: to_u32(offset)?,
				size: to_u32(size)?,
				id: plan.ids.get(id).copied().unwrap_or(-1),
			});
		}

		let table_offset = to_u32(sink.len())?;
		sink.patch_u32_le(FileHeader::table_offset_at(format), table_offset)?;
		table.write(&mut sink);

		if let Some(footer) = &self.footer {
			let footer = self.footer_with_roots(footer)?;
			footer.write(schema, None, &mut sink, &pass(self.versions()))?;
		}

		debug!(blocks = plan.order.len(), bytes = sink.len(), "encoded document");
		encode_bytes(sink.into_inner(), options.compression)
	}

	/// Footer copy whose roots array (and its count) lists the document roots.
	fn footer_with_roots(&self, footer: &Record) -> Result<Record> {
		let mut footer = footer.clone();
		let Some(name) = &self.schema.format().roots_field else {
			return Ok(footer);
		};
		footer.resize_array(&self.schema, name, self.roots.len())?;
		let array = footer.get_mut(&self.schema, name)?.as_array_mut().ok_or(CodecError::ValueKind {
			expected: "array",
			got: "scalar",
		})?;
		for (index, root) in self.roots.iter().enumerate() {
			match array.get_mut(index)? {
				Value::Link(link) => link.set(Some(*root)),
				other => {
					return Err(CodecError::ValueKind {
						expected: "link",
						got: other.kind(),
					});
				}
			}
		}
		Ok(footer)
	}
}

struct Planner<'a> {
	doc: &'a Document,
	plan: BlockPlan,
	types: HashMap<TypeId, u32>,
}

enum Step {
	/// Assign a type index and queue the block's children.
	Enter(BlockId),
	/// Append the block, then visit its owner-first children in order.
	Emit(BlockId, Vec<BlockId>),
}

impl Planner<'_> {
	fn visit(&mut self, root: BlockId) -> Result<()> {
		let mut steps = vec![Step::Enter(root)];
		while let Some(step) = steps.pop() {
			match step {
				Step::Enter(id) => self.enter(id, &mut steps)?,
				Step::Emit(id, after) => {
					self.plan.order.push(id);
					steps.extend(after.into_iter().rev().map(Step::Enter));
				}
			}
		}
		Ok(())
	}

	fn enter(&mut self, id: BlockId, steps: &mut Vec<Step>) -> Result<()> {
		if self.plan.type_index.contains_key(&id) {
			return Ok(());
		}
		let doc = self.doc;
		let schema = &*doc.schema;
		let block = doc.block(id)?;
		let ty = block.record.ty();

		let next = self.plan.type_names.len() as u32;
		let type_index = *self.types.entry(ty).or_insert(next);
		if type_index == next {
			self.plan.type_names.push(schema.type_name(ty).into());
		}
		self.plan.type_index.insert(id, type_index);

		let mut children = Vec::new();
		block
			.record
			.collect_refs(schema, Versions::new(block.version, doc.user_version), &mut children)?;
		let child_first = &schema.format().child_first;
		let mut first = Vec::new();
		let mut after = Vec::with_capacity(children.len());
		for child in children {
			if child_first.contains(&doc.block(child)?.record.ty()) {
				first.push(child);
			} else {
				after.push(child);
			}
		}

		steps.push(Step::Emit(id, after));
		steps.extend(first.into_iter().rev().map(Step::Enter));
		Ok(())
	}
}

fn to_u32(value: usize) -> Result<u32> {
	u32::try_from(value).map_err(|_| CodecError::SeekOutOfRange {
		to: value,
		len: u32::MAX as usize,
	})
}
