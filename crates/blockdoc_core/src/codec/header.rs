use crate::codec::bytes::{ByteSink, Cursor};
use crate::codec::schema::FormatSpec;
use crate::codec::version::format_version;
use crate::codec::{CodecError, Result};

/// Fixed container prefix: magic, version pair and block table offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
	/// Packed file version.
	pub version: u32,
	/// Format-specific user version.
	pub user_version: u32,
	/// Absolute offset of the block table.
	pub table_offset: u32,
}

impl FileHeader {
	/// Byte size of the fixed prefix for `format`.
	pub fn size(format: &FormatSpec) -> usize {
		format.magic.len() + 12
	}

	/// Parse the fixed prefix, checking magic and supported versions.
	pub fn parse(cur: &mut Cursor<'_>, format: &FormatSpec) -> Result<Self> {
		let magic_len = format.magic.len();
		let got = cur.read_exact(magic_len.min(cur.remaining()))?;
		if got != format.magic.as_slice() {
			return Err(CodecError::NotAFile {
				format: format.name.clone(),
				got: got.to_vec(),
			});
		}

		let version = cur.read_u32_le()?;
		if !format.supports(version) {
			return Err(CodecError::VersionUnsupported {
				format: format.name.clone(),
				version: format_version(version),
			});
		}

		Ok(Self {
			version,
			user_version: cur.read_u32_le()?,
			table_offset: cur.read_u32_le()?,
		})
	}

	/// Write the fixed prefix; the table offset is patched once known.
	pub fn write(&self, sink: &mut ByteSink, format: &FormatSpec) {
		sink.put_bytes(&format.magic);
		sink.put_u32_le(self.version);
		sink.put_u32_le(self.user_version);
		sink.put_u32_le(self.table_offset);
	}

	/// Offset of the table offset field inside the prefix.
	pub fn table_offset_at(format: &FormatSpec) -> usize {
		format.magic.len() + 8
	}
}

#[cfg(test)]
mod tests {
	use super::FileHeader;
	use crate::codec::CodecError;
	use crate::codec::bytes::{ByteSink, Cursor};
	use crate::codec::schema::FormatSpec;

	fn format() -> FormatSpec {
		FormatSpec {
			name: "demo".into(),
			magic: b"DEMO".to_vec(),
			versions: vec![0x0200_0000],
			link_sentinel_since: 0,
			header: None,
			footer: None,
			roots_field: None,
			child_first: Vec::new(),
		}
	}

	#[test]
	fn prefix_round_trips() {
		let format = format();
		let header = FileHeader {
			version: 0x0200_0000,
			user_version: 7,
			table_offset: 40,
		};
		let mut sink = ByteSink::new();
		header.write(&mut sink, &format);
		assert_eq!(sink.len(), FileHeader::size(&format));

		let bytes = sink.into_inner();
		let parsed = FileHeader::parse(&mut Cursor::new(&bytes), &format).expect("parse header");
		assert_eq!(parsed, header);
	}

	#[test]
	fn wrong_magic_is_not_a_file() {
		let err = FileHeader::parse(&mut Cursor::new(b"NOPE\0\0\0\x02"), &format()).expect_err("bad magic");
		assert!(matches!(err, CodecError::NotAFile { .. }));
	}

	#[test]
	fn short_input_is_not_a_file() {
		let err = FileHeader::parse(&mut Cursor::new(b"DE"), &format()).expect_err("short input");
		assert!(matches!(err, CodecError::NotAFile { .. }));
	}

	#[test]
	fn unknown_version_is_unsupported() {
		let mut bytes = b"DEMO".to_vec();
		bytes.extend_from_slice(&0x0100_0000_u32.to_le_bytes());
		bytes.extend_from_slice(&[0; 8]);
		let err = FileHeader::parse(&mut Cursor::new(&bytes), &format()).expect_err("old version");
		assert!(matches!(err, CodecError::VersionUnsupported { ref version, .. } if version == "1.0.0.0"));
	}
}
