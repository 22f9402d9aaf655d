use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::primitive::{WireDecode, WireEncode};

/// Upper bound on a single frame's payload, guarding against a corrupt or
/// malicious size prefix causing an unbounded allocation.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024 * 1024;

/// Tag identifying the payload that follows a frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
	Announcement = 0,
	RegistryMessage = 1,
	SimMessage = 2,
	Discovery = 3,
	Lifecycle = 4,
}

impl FrameKind {
	fn from_tag(tag: u8) -> Result<Self> {
		Ok(match tag {
			0 => FrameKind::Announcement,
			1 => FrameKind::RegistryMessage,
			2 => FrameKind::SimMessage,
			3 => FrameKind::Discovery,
			4 => FrameKind::Lifecycle,
			other => return Err(ProtocolError::UnknownFrameKind(other)),
		})
	}
}

/// Lets a `FrameKind` tag ride inside another encoded message, e.g. the
/// relayed-frame kind carried by `RegistryMessage::Relay`.
impl WireEncode for FrameKind {
	fn encode(&self, buf: &mut BytesMut) {
		(*self as u8).encode(buf);
	}
}

impl WireDecode for FrameKind {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		FrameKind::from_tag(u8::decode(buf)?)
	}
}

/// A frame header is a 4-byte little-endian size (the total frame size in
/// bytes, including this field) followed by a 1-byte kind tag.
const HEADER_LEN: usize = 5;

/// Encodes `payload` as a complete frame: `[u32 size][u8 kind][payload]`.
/// `size` is the total encoded frame length, including the 4-byte size
/// field itself.
pub fn encode_frame(kind: FrameKind, payload: &[u8]) -> BytesMut {
	let size = (HEADER_LEN + payload.len()) as u32;
	let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
	buf.put_u32_le(size);
	buf.put_u8(kind as u8);
	buf.put_slice(payload);
	buf
}

/// Attempts to pull one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` when `buf` holds an incomplete frame — the caller
/// should read more bytes from the transport and retry. `buf` is left
/// untouched on a short read so the caller can keep accumulating into it.
pub fn try_decode_frame(buf: &mut BytesMut) -> Result<Option<(FrameKind, Bytes)>> {
	if buf.len() < 4 {
		return Ok(None);
	}
	let size = u32::from_le_bytes(buf[..4].try_into().expect("checked len"));
	if (size as usize) < HEADER_LEN {
		return Err(ProtocolError::FrameTooShort { need: HEADER_LEN, have: size as usize });
	}
	if size > MAX_FRAME_SIZE {
		return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
	}
	let total = size as usize;
	if buf.len() < total {
		return Ok(None);
	}
	buf.advance(4);
	let kind = FrameKind::from_tag(buf.get_u8())?;
	let payload = buf.split_to(total - HEADER_LEN).freeze();
	Ok(Some((kind, payload)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrip_single_frame() {
		let encoded = encode_frame(FrameKind::Discovery, b"hello");
		let mut buf = BytesMut::from(&encoded[..]);
		let (kind, payload) = try_decode_frame(&mut buf).unwrap().unwrap();
		assert_eq!(kind, FrameKind::Discovery);
		assert_eq!(&payload[..], b"hello");
		assert!(buf.is_empty());
	}

	#[test]
	fn incomplete_frame_yields_none_and_is_untouched() {
		let encoded = encode_frame(FrameKind::SimMessage, b"0123456789");
		let mut buf = BytesMut::from(&encoded[..encoded.len() - 2]);
		let before = buf.clone();
		assert!(try_decode_frame(&mut buf).unwrap().is_none());
		assert_eq!(buf, before);
	}

	#[test]
	fn two_frames_back_to_back() {
		let mut stream = BytesMut::new();
		stream.extend_from_slice(&encode_frame(FrameKind::Announcement, b"a"));
		stream.extend_from_slice(&encode_frame(FrameKind::Lifecycle, b"bb"));

		let (k1, p1) = try_decode_frame(&mut stream).unwrap().unwrap();
		assert_eq!(k1, FrameKind::Announcement);
		assert_eq!(&p1[..], b"a");

		let (k2, p2) = try_decode_frame(&mut stream).unwrap().unwrap();
		assert_eq!(k2, FrameKind::Lifecycle);
		assert_eq!(&p2[..], b"bb");
		assert!(stream.is_empty());
	}

	#[test]
	fn oversized_frame_is_rejected() {
		let mut buf = BytesMut::new();
		buf.put_u32_le(MAX_FRAME_SIZE + 1);
		buf.put_u8(0);
		assert!(matches!(
			try_decode_frame(&mut buf),
			Err(ProtocolError::FrameTooLarge { .. })
		));
	}

	#[test]
	fn unknown_kind_tag_is_rejected() {
		let mut buf = BytesMut::new();
		buf.put_u32_le(HEADER_LEN as u32);
		buf.put_u8(0xee);
		assert!(matches!(
			try_decode_frame(&mut buf),
			Err(ProtocolError::UnknownFrameKind(0xee))
		));
	}

	#[test]
	fn undersized_length_prefix_is_rejected() {
		let mut buf = BytesMut::new();
		buf.put_u32_le(1);
		buf.put_u8(0);
		assert!(matches!(
			try_decode_frame(&mut buf),
			Err(ProtocolError::FrameTooShort { .. })
		));
	}

	#[test]
	fn encoded_size_prefix_covers_the_whole_frame() {
		let encoded = encode_frame(FrameKind::SimMessage, b"abc");
		let size = u32::from_le_bytes(encoded[..4].try_into().unwrap());
		assert_eq!(size as usize, encoded.len());
	}
}
