use crate::codec::{CodecError, Result};

/// Simple bounded cursor over an immutable byte slice.
pub struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	/// Create a cursor at position 0.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Return current byte offset.
	pub fn pos(&self) -> usize {
		self.pos
	}

	/// Return total stream length.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Return `true` when the stream holds no bytes at all.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Return remaining unread bytes.
	pub fn remaining(&self) -> usize {
		self.bytes.len().saturating_sub(self.pos)
	}

	/// Return `true` once every byte has been read.
	pub fn is_at_end(&self) -> bool {
		self.remaining() == 0
	}

	/// Move to an absolute offset; the end of the stream is a valid target.
	pub fn seek(&mut self, to: usize) -> Result<()> {
		if to > self.bytes.len() {
			return Err(CodecError::SeekOutOfRange { to, len: self.bytes.len() });
		}
		self.pos = to;
		Ok(())
	}

	/// Read exactly `n` bytes and advance cursor.
	pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8]> {
		if n > self.remaining() {
			return Err(CodecError::UnexpectedEof {
				at: self.pos,
				need: n,
				rem: self.remaining(),
			});
		}

		let start = self.pos;
		self.pos += n;
		Ok(&self.bytes[start..self.pos])
	}

	fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let raw = self.read_exact(N)?;
		let mut out = [0_u8; N];
		out.copy_from_slice(raw);
		Ok(out)
	}

	/// Read one unsigned byte.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	/// Read one signed byte.
	pub fn read_i8(&mut self) -> Result<i8> {
		Ok(i8::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u16`.
	pub fn read_u16_le(&mut self) -> Result<u16> {
		Ok(u16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i16`.
	pub fn read_i16_le(&mut self) -> Result<i16> {
		Ok(i16::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `u32`.
	pub fn read_u32_le(&mut self) -> Result<u32> {
		Ok(u32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian `i32`.
	pub fn read_i32_le(&mut self) -> Result<i32> {
		Ok(i32::from_le_bytes(self.read_array()?))
	}

	/// Read a little-endian IEEE-754 `f32`.
	pub fn read_f32_le(&mut self) -> Result<f32> {
		Ok(f32::from_le_bytes(self.read_array()?))
	}

	/// Read a zero-terminated byte string without the terminator.
	pub fn read_cstring_bytes(&mut self) -> Result<&'a [u8]> {
		let start = self.pos;
		let rem = &self.bytes[self.pos..];
		let Some(rel_end) = rem.iter().position(|byte| *byte == 0) else {
			return Err(CodecError::UnexpectedEof {
				at: self.pos,
				need: rem.len() + 1,
				rem: self.remaining(),
			});
		};

		let end = start + rel_end;
		self.pos = end + 1;
		Ok(&self.bytes[start..end])
	}
}

/// Growable little-endian output buffer.
#[derive(Debug, Default)]
pub struct ByteSink {
	bytes: Vec<u8>,
}

impl ByteSink {
	/// Create an empty sink.
	pub fn new() -> Self {
		Self::default()
	}

	/// Return number of bytes written so far.
	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	/// Return `true` when nothing has been written.
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Borrow written bytes.
	pub fn as_slice(&self) -> &[u8] {
		&self.bytes
	}

	/// Consume the sink and return its buffer.
	pub fn into_inner(self) -> Vec<u8> {
		self.bytes
	}

	/// Append raw bytes.
	pub fn put_bytes(&mut self, bytes: &[u8]) {
		self.bytes.extend_from_slice(bytes);
	}

	/// Append `count` zero bytes.
	pub fn put_zeros(&mut self, count: usize) {
		self.bytes.resize(self.bytes.len() + count, 0);
	}

	/// Append one unsigned byte.
	pub fn put_u8(&mut self, value: u8) {
		self.bytes.push(value);
	}

	/// Append one signed byte.
	pub fn put_i8(&mut self, value: i8) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Append a little-endian `u16`.
	pub fn put_u16_le(&mut self, value: u16) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Append a little-endian `i16`.
	pub fn put_i16_le(&mut self, value: i16) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Append a little-endian `u32`.
	pub fn put_u32_le(&mut self, value: u32) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Append a little-endian `i32`.
	pub fn put_i32_le(&mut self, value: i32) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Append a little-endian IEEE-754 `f32`.
	pub fn put_f32_le(&mut self, value: f32) {
		self.put_bytes(&value.to_le_bytes());
	}

	/// Overwrite a previously written `u32` at absolute offset `at`.
	pub fn patch_u32_le(&mut self, at: usize, value: u32) -> Result<()> {
		let len = self.bytes.len();
		let slot = self
			.bytes
			.get_mut(at..at.saturating_add(4))
			.ok_or(CodecError::SeekOutOfRange { to: at, len })?;
		slot.copy_from_slice(&value.to_le_bytes());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::{ByteSink, Cursor};
	use crate::codec::CodecError;

	#[test]
	fn cursor_reads_little_endian_values() {
		let bytes = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0x00, 0x00, 0x80, 0x3F];
		let mut cursor = Cursor::new(&bytes);

		assert_eq!(cursor.read_u32_le().expect("u32"), 0x0403_0201);
		assert_eq!(cursor.read_i16_le().expect("i16"), -1);
		assert_eq!(cursor.read_f32_le().expect("f32"), 1.0);
		assert_eq!(cursor.remaining(), 0);
	}

	#[test]
	fn end_of_stream_is_distinct_from_empty() {
		let bytes = [1_u8, 2];
		let mut cursor = Cursor::new(&bytes);
		assert!(!cursor.is_empty());
		assert!(!cursor.is_at_end());

		cursor.read_u8().expect("first byte");
		assert!(!cursor.is_at_end());
		cursor.read_u8().expect("second byte");
		assert!(cursor.is_at_end());
		assert!(!cursor.is_empty());

		assert!(Cursor::new(&[]).is_at_end());
	}

	#[test]
	fn cursor_reports_eof_with_offsets() {
		let bytes = [0_u8; 3];
		let mut cursor = Cursor::new(&bytes);
		cursor.read_u8().expect("first byte");

		let err = cursor.read_u32_le().expect_err("short read fails");
		assert!(matches!(err, CodecError::UnexpectedEof { at: 1, need: 4, rem: 2 }));
	}

	#[test]
	fn cstring_stops_at_terminator() {
		let bytes = b"abc\0rest";
		let mut cursor = Cursor::new(bytes);
		assert_eq!(cursor.read_cstring_bytes().expect("cstring"), b"abc");
		assert_eq!(cursor.pos(), 4);
	}

	#[test]
	fn sink_patches_placeholder() {
		let mut sink = ByteSink::new();
		sink.put_u32_le(0);
		sink.put_u8(7);
		sink.patch_u32_le(0, 0xAABB_CCDD).expect("patch in range");

		assert_eq!(sink.as_slice(), &[0xDD, 0xCC, 0xBB, 0xAA, 7]);
		assert!(sink.patch_u32_le(3, 1).is_err());
	}
}
