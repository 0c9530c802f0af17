use std::collections::HashMap;

use crate::codec::link::{BlockId, LinkPolicy, LinkQueue};
use crate::codec::schema::TypeId;
use crate::codec::version::Versions;

/// Per-record state while decoding.
pub(crate) struct ReadPass<'q> {
	pub(crate) versions: Versions,
	pub(crate) queue: &'q mut LinkQueue,
	pub(crate) max_array_len: usize,
}

/// Per-record state while resolving link tokens.
pub(crate) struct LinkPass<'a> {
	pub(crate) versions: Versions,
	pub(crate) queue: &'a mut LinkQueue,
	pub(crate) table: &'a HashMap<i32, (BlockId, TypeId)>,
	pub(crate) sentinel: i32,
	pub(crate) policy: LinkPolicy,
}

/// Per-record state while encoding.
pub(crate) struct WritePass<'a> {
	pub(crate) versions: Versions,
	pub(crate) index: &'a HashMap<BlockId, i32>,
	pub(crate) sentinel: i32,
	pub(crate) policy: LinkPolicy,
	pub(crate) max_array_len: usize,
}
