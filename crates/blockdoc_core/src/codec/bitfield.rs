use crate::codec::primitive::Primitive;
use crate::codec::{CodecError, Result};

/// One named sub-field of a bitfield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMember {
	/// Member name as declared.
	pub name: Box<str>,
	/// Width in bits.
	pub width: u32,
	/// Offset from the least significant bit.
	pub offset: u32,
	/// Value used for fresh instances.
	pub default: u32,
}

impl BitMember {
	/// Largest value the member can hold.
	pub fn max(&self) -> u32 {
		if self.width >= 32 { u32::MAX } else { (1_u32 << self.width) - 1 }
	}
}

/// Packed sub-byte fields backed by one unsigned integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldDef {
	/// Backing unsigned integer kind.
	pub storage: Primitive,
	/// Members, lowest bits first.
	pub members: Vec<BitMember>,
}

impl BitfieldDef {
	/// Build from `(name, width, default)` triples, assigning cumulative offsets.
	pub fn from_widths(storage: Primitive, members: impl IntoIterator<Item = (Box<str>, u32, u32)>) -> Self {
		let mut offset = 0;
		let members = members
			.into_iter()
			.map(|(name, width, default)| {
				let member = BitMember { name, width, offset, default };
				offset += width;
				member
			})
			.collect();
		Self { storage, members }
	}

	/// Total declared bits.
	pub fn total_width(&self) -> u32 {
		self.members.iter().map(|member| member.width).sum()
	}

	/// Member values for a fresh instance.
	pub fn defaults(&self) -> Vec<u32> {
		self.members.iter().map(|member| member.default & member.max()).collect()
	}

	/// Position of member `name`.
	pub fn member_index(&self, name: &str) -> Option<usize> {
		self.members.iter().position(|member| &*member.name == name)
	}

	/// Slice a backing integer into member values.
	pub fn unpack(&self, raw: u32) -> Vec<u32> {
		self.members
			.iter()
			.map(|member| raw.checked_shr(member.offset).unwrap_or(0) & member.max())
			.collect()
	}

	/// OR shifted member values into one backing integer.
	pub fn pack(&self, values: &[u32]) -> u32 {
		self.members
			.iter()
			.zip(values)
			.fold(0, |raw, (member, value)| raw | (value & member.max()).checked_shl(member.offset).unwrap_or(0))
	}

	/// Set one member, rejecting values wider than the member.
	pub fn set_member(&self, bitfield: &str, values: &mut [u32], name: &str, value: i64) -> Result<()> {
		let index = self.member_index(name).ok_or_else(|| CodecError::UnknownBitMember {
			bitfield: bitfield.into(),
			member: name.into(),
		})?;
		let member = &self.members[index];
		let max = i64::from(member.max());
		if !(0..=max).contains(&value) {
			return Err(CodecError::Range {
				type_name: format!("{bitfield}.{name}").into(),
				value,
				min: 0,
				max,
			});
		}
		values[index] = value as u32;
		Ok(())
	}

	/// Replace every member from one packed integer.
	pub fn set_packed(&self, bitfield: &str, values: &mut [u32], raw: i64) -> Result<()> {
		let checked = self.storage.check_int(raw).map_err(|_| CodecError::Range {
			type_name: bitfield.into(),
			value: raw,
			min: 0,
			max: self.storage.int_range().map_or(0, |(_, max)| max),
		})?;
		let unpacked = self.unpack(checked as u32);
		if i64::from(self.pack(&unpacked)) != checked {
			return Err(CodecError::Range {
				type_name: bitfield.into(),
				value: raw,
				min: 0,
				max: i64::from(self.pack(&self.members.iter().map(BitMember::max).collect::<Vec<_>>())),
			});
		}
		values.copy_from_slice(&unpacked);
		Ok(())
	}

	/// `name=value` list in declaration order.
	pub fn render(&self, values: &[u32]) -> String {
		self.members
			.iter()
			.zip(values)
			.map(|(member, value)| format!("{}={value}", member.name))
			.collect::<Vec<_>>()
			.join(", ")
	}
}
