use thiserror::Error;

/// Errors raised while framing or decoding wire messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("frame too short: need {need} bytes, have {have}")]
	FrameTooShort { need: usize, have: usize },

	#[error("frame exceeds maximum size: {size} > {max}")]
	FrameTooLarge { size: u32, max: u32 },

	#[error("unknown frame kind tag: {0}")]
	UnknownFrameKind(u8),

	#[error("unexpected end of buffer while decoding {field}")]
	UnexpectedEof { field: &'static str },

	#[error("invalid utf-8 in string field {field}")]
	InvalidUtf8 { field: &'static str },

	#[error("invalid enum discriminant {value} for {ty}")]
	InvalidDiscriminant { ty: &'static str, value: u32 },

	#[error("protocol version mismatch: peer speaks {peer_major}.{peer_minor}, we speak {our_major}.{our_minor}")]
	VersionMismatch {
		peer_major: u16,
		peer_minor: u16,
		our_major: u16,
		our_minor: u16,
	},
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
