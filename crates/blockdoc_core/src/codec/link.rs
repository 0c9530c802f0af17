use std::collections::VecDeque;

use tracing::warn;

use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::pass::{LinkPass, ReadPass, WritePass};
use crate::codec::schema::{Schema, TypeId};
use crate::codec::{CodecError, Result};

/// Arena index of a block inside a [`Document`](crate::codec::Document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
	/// Arena position.
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// Ownership flavour of a link field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
	/// Owning reference; drives encode ordering and root detection.
	Ref,
	/// Non-owning back or graph reference.
	Ptr,
}

impl LinkKind {
	/// Schema-facing type name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ref => "Ref",
			Self::Ptr => "Ptr",
		}
	}
}

/// Resolution state of one link value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
	/// Raw token read from the stream, not yet resolved.
	Unresolved(i32),
	/// Resolved target, `None` for the no-reference sentinel.
	Resolved(Option<BlockId>),
}

/// Typed reference to another block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
	/// Ref or Ptr.
	pub kind: LinkKind,
	/// Declared target type, `None` accepts any block.
	pub target: Option<TypeId>,
	/// Current state.
	pub state: LinkState,
}

impl Link {
	/// Empty resolved link.
	pub fn new(kind: LinkKind, target: Option<TypeId>) -> Self {
		Self {
			kind,
			target,
			state: LinkState::Resolved(None),
		}
	}

	/// Resolved target block, if any.
	pub fn block(&self) -> Option<BlockId> {
		match self.state {
			LinkState::Resolved(block) => block,
			LinkState::Unresolved(_) => None,
		}
	}

	/// Point at `block` (or clear with `None`).
	pub fn set(&mut self, block: Option<BlockId>) {
		self.state = LinkState::Resolved(block);
	}

	/// Whether the link owns its target.
	pub fn is_ref(&self) -> bool {
		self.kind == LinkKind::Ref
	}

	pub(crate) fn read(kind: LinkKind, target: Option<TypeId>, cur: &mut Cursor<'_>, pass: &mut ReadPass<'_>) -> Result<Self> {
		let token = cur.read_i32_le()?;
		pass.queue.push(token);
		Ok(Self {
			kind,
			target,
			state: LinkState::Unresolved(token),
		})
	}

	/// Pop this link's token and resolve it against the block table.
	pub(crate) fn resolve(&mut self, schema: &Schema, pass: &mut LinkPass<'_>) -> Result<()> {
		let token = pass.queue.pop()?;
		if token == pass.sentinel {
			self.state = LinkState::Resolved(None);
			return Ok(());
		}

		let outcome = match pass.table.get(&token) {
			None => Err(CodecError::LinkUnresolved { index: token }),
			Some(&(block, ty)) => match self.target {
				Some(target) if !schema.is_subtype(ty, target) => Err(CodecError::LinkTypeMismatch {
					index: token,
					expected: schema.type_name(target).into(),
					got: schema.type_name(ty).into(),
				}),
				_ => Ok(block),
			},
		};

		match outcome {
			Ok(block) => self.state = LinkState::Resolved(Some(block)),
			Err(err) if pass.policy == LinkPolicy::Lenient => {
				warn!(token, error = %err, "bad link replaced by none");
				self.state = LinkState::Resolved(None);
			}
			Err(err) => return Err(err),
		}
		Ok(())
	}

	pub(crate) fn write(&self, sink: &mut ByteSink, pass: &WritePass<'_>) -> Result<()> {
		let token = match self.state {
			LinkState::Unresolved(index) => return Err(CodecError::LinkNotResolved { index }),
			LinkState::Resolved(None) => pass.sentinel,
			LinkState::Resolved(Some(block)) => match pass.index.get(&block) {
				Some(index) => *index,
				None if pass.policy == LinkPolicy::Lenient => {
					warn!(block = block.0, kind = self.kind.as_str(), "link target not in block list, writing none");
					pass.sentinel
				}
				None => return Err(CodecError::LinkNotListed { block: block.0 }),
			},
		};
		sink.put_i32_le(token);
		Ok(())
	}
}

/// How bad links are handled during resolution and encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPolicy {
	/// Fail on the first bad link.
	#[default]
	Strict,
	/// Replace bad links with `None` and log a warning.
	Lenient,
}

/// FIFO of raw link tokens shared by one decode.
#[derive(Debug, Default)]
pub struct LinkQueue {
	tokens: VecDeque<i32>,
	pushed: usize,
	popped: usize,
}

impl LinkQueue {
	/// Create an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a token read from the stream.
	pub fn push(&mut self, token: i32) {
		self.tokens.push_back(token);
		self.pushed += 1;
	}

	/// Take the oldest token; running dry is an imbalance.
	pub fn pop(&mut self) -> Result<i32> {
		let token = self.tokens.pop_front().ok_or(CodecError::LinkQueueImbalance {
			pushed: self.pushed,
			popped: self.popped + 1,
		})?;
		self.popped += 1;
		Ok(token)
	}

	/// Tokens still waiting.
	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	/// Whether no tokens are waiting.
	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Total tokens pushed.
	pub fn pushed(&self) -> usize {
		self.pushed
	}

	/// Total tokens popped.
	pub fn popped(&self) -> usize {
		self.popped
	}

	/// Require every pushed token to have been popped.
	pub fn finish(&self) -> Result<()> {
		if !self.tokens.is_empty() {
			return Err(CodecError::LinkQueueImbalance {
				pushed: self.pushed,
				popped: self.popped,
			});
		}
		Ok(())
	}
}

/// "No reference" token for a file version.
pub fn link_sentinel(version: u32, sentinel_since: u32) -> i32 {
	if version >= sentinel_since { -1 } else { 0 }
}
