//! Wire format: every code point travels as its scalar value in a little-endian `u32`.
//! There is no header, length prefix or terminator; the sender closes the connection
//! after the last value.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::DecodeError;

pub const CODE_POINT_SIZE: usize = 4;

pub fn encode(code_point: char) -> [u8; CODE_POINT_SIZE] {
    let mut buf = [0u8; CODE_POINT_SIZE];
    LittleEndian::write_u32(&mut buf, code_point as u32);
    buf
}

pub fn decode_one(buf: [u8; CODE_POINT_SIZE]) -> Result<char, DecodeError> {
    let value = LittleEndian::read_u32(&buf);
    char::from_u32(value).ok_or(DecodeError::InvalidScalar(value))
}

pub fn decode(bytes: &[u8]) -> Result<Vec<char>, DecodeError> {
    let chunks = bytes.chunks_exact(CODE_POINT_SIZE);
    let remainder = chunks.remainder().len();
    if remainder != 0 {
        return Err(DecodeError::Truncated(remainder));
    }
    chunks
        .map(|chunk| {
            let mut buf = [0u8; CODE_POINT_SIZE];
            buf.copy_from_slice(chunk);
            decode_one(buf)
        })
        .collect()
}
