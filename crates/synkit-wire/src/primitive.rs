use bytes::{Buf, BufMut, Bytes, BytesMut};
use indexmap::IndexMap;

use crate::error::{ProtocolError, Result};

/// Types that can append themselves to an outgoing frame buffer.
pub trait WireEncode {
	fn encode(&self, buf: &mut BytesMut);
}

/// Types that can be pulled off the front of an incoming frame buffer.
///
/// Implementations must consume exactly the bytes they read; a short buffer
/// is an [`ProtocolError::UnexpectedEof`], never a panic.
pub trait WireDecode: Sized {
	fn decode(buf: &mut Bytes) -> Result<Self>;
}

macro_rules! impl_int {
	($ty:ty, $put:ident, $get:ident, $size:expr) => {
		impl WireEncode for $ty {
			fn encode(&self, buf: &mut BytesMut) {
				buf.$put(*self);
			}
		}
		impl WireDecode for $ty {
			fn decode(buf: &mut Bytes) -> Result<Self> {
				if buf.remaining() < $size {
					return Err(ProtocolError::UnexpectedEof { field: stringify!($ty) });
				}
				Ok(buf.$get())
			}
		}
	};
}

impl_int!(u8, put_u8, get_u8, 1);
impl_int!(i8, put_i8, get_i8, 1);
impl_int!(u16, put_u16_le, get_u16_le, 2);
impl_int!(i16, put_i16_le, get_i16_le, 2);
impl_int!(u32, put_u32_le, get_u32_le, 4);
impl_int!(i32, put_i32_le, get_i32_le, 4);
impl_int!(u64, put_u64_le, get_u64_le, 8);
impl_int!(i64, put_i64_le, get_i64_le, 8);
impl_int!(f32, put_f32_le, get_f32_le, 4);
impl_int!(f64, put_f64_le, get_f64_le, 8);

impl WireEncode for bool {
	fn encode(&self, buf: &mut BytesMut) {
		buf.put_u8(if *self { 1 } else { 0 });
	}
}

impl WireDecode for bool {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		Ok(u8::decode(buf)? != 0)
	}
}

impl WireEncode for String {
	fn encode(&self, buf: &mut BytesMut) {
		(self.len() as u32).encode(buf);
		buf.put_slice(self.as_bytes());
	}
}

impl WireDecode for String {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		let len = u32::decode(buf)? as usize;
		if buf.remaining() < len {
			return Err(ProtocolError::UnexpectedEof { field: "String" });
		}
		let raw = buf.copy_to_bytes(len);
		String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field: "String" })
	}
}

impl WireEncode for Bytes {
	fn encode(&self, buf: &mut BytesMut) {
		(self.len() as u32).encode(buf);
		buf.put_slice(self);
	}
}

impl WireDecode for Bytes {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		let len = u32::decode(buf)? as usize;
		if buf.remaining() < len {
			return Err(ProtocolError::UnexpectedEof { field: "Bytes" });
		}
		Ok(buf.copy_to_bytes(len))
	}
}

impl<T: WireEncode> WireEncode for Vec<T> {
	fn encode(&self, buf: &mut BytesMut) {
		(self.len() as u32).encode(buf);
		for item in self {
			item.encode(buf);
		}
	}
}

impl<T: WireDecode> WireDecode for Vec<T> {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		let len = u32::decode(buf)? as usize;
		let mut out = Vec::with_capacity(len.min(1 << 16));
		for _ in 0..len {
			out.push(T::decode(buf)?);
		}
		Ok(out)
	}
}

impl<K: WireEncode, V: WireEncode> WireEncode for IndexMap<K, V> {
	fn encode(&self, buf: &mut BytesMut) {
		(self.len() as u32).encode(buf);
		for (k, v) in self {
			k.encode(buf);
			v.encode(buf);
		}
	}
}

impl<K: WireDecode + std::hash::Hash + Eq, V: WireDecode> WireDecode for IndexMap<K, V> {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		let len = u32::decode(buf)? as usize;
		let mut out = IndexMap::with_capacity(len.min(1 << 16));
		for _ in 0..len {
			let k = K::decode(buf)?;
			let v = V::decode(buf)?;
			out.insert(k, v);
		}
		Ok(out)
	}
}

impl<T: WireEncode> WireEncode for Option<T> {
	fn encode(&self, buf: &mut BytesMut) {
		match self {
			Some(v) => {
				true.encode(buf);
				v.encode(buf);
			}
			None => false.encode(buf),
		}
	}
}

impl<T: WireDecode> WireDecode for Option<T> {
	fn decode(buf: &mut Bytes) -> Result<Self> {
		if bool::decode(buf)? { Ok(Some(T::decode(buf)?)) } else { Ok(None) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip<T: WireEncode + WireDecode + PartialEq + std::fmt::Debug>(value: T) {
		let mut buf = BytesMut::new();
		value.encode(&mut buf);
		let mut frozen = buf.freeze();
		let decoded = T::decode(&mut frozen).unwrap();
		assert_eq!(value, decoded);
		assert!(frozen.is_empty());
	}

	#[test]
	fn primitives_roundtrip() {
		roundtrip(42u8);
		roundtrip(-7i32);
		roundtrip(12345u64);
		roundtrip(std::f64::consts::PI);
		roundtrip(true);
		roundtrip(false);
		roundtrip("hello synkit".to_string());
		roundtrip(vec![1u32, 2, 3, 4]);
		roundtrip(Some(9u16));
		roundtrip(None::<u16>);
	}

	#[test]
	fn indexmap_preserves_insertion_order() {
		let mut map = IndexMap::new();
		map.insert("b".to_string(), "2".to_string());
		map.insert("a".to_string(), "1".to_string());
		let mut buf = BytesMut::new();
		map.encode(&mut buf);
		let mut frozen = buf.freeze();
		let decoded: IndexMap<String, String> = IndexMap::decode(&mut frozen).unwrap();
		let keys: Vec<_> = decoded.keys().cloned().collect();
		assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
	}

	#[test]
	fn short_buffer_is_an_error_not_a_panic() {
		let mut empty = Bytes::new();
		assert!(u32::decode(&mut empty).is_err());
	}
}
