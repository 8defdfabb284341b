//! Code-point level string codecs.
//!
//! A [`Codec`] pairs a decoder and an encoder for one [`StringEncoding`].
//! Checked codecs report malformed input; lossy codecs substitute U+FFFD
//! for undecodable input and `?` for code points ASCII cannot hold.

use weft_types::StringEncoding;

use crate::error::KernelError;

/// Reads one code point from non-empty input; returns it and the bytes used.
pub type DecodeFn = fn(&[u8]) -> Result<(char, usize), KernelError>;
/// Writes one code point into `out`; returns the bytes written.
pub type EncodeFn = fn(char, &mut [u8; 4]) -> Result<usize, KernelError>;

#[derive(Clone, Copy)]
pub struct Codec {
    pub encoding: StringEncoding,
    pub decode: DecodeFn,
    pub encode: EncodeFn,
}

impl Codec {
    pub fn new(encoding: StringEncoding, checked: bool) -> Self {
        let (decode, encode): (DecodeFn, EncodeFn) = match (encoding, checked) {
            (StringEncoding::Ascii, true) => (decode_ascii, encode_ascii),
            (StringEncoding::Ascii, false) => (decode_ascii_lossy, encode_ascii_lossy),
            (StringEncoding::Utf8, true) => (decode_utf8, encode_utf8),
            (StringEncoding::Utf8, false) => (decode_utf8_lossy, encode_utf8),
            (StringEncoding::Utf16, true) => (decode_utf16, encode_utf16),
            (StringEncoding::Utf16, false) => (decode_utf16_lossy, encode_utf16),
            (StringEncoding::Utf32, true) => (decode_utf32, encode_utf32),
            (StringEncoding::Utf32, false) => (decode_utf32_lossy, encode_utf32),
        };
        Self {
            encoding,
            decode,
            encode,
        }
    }

    pub fn unit_size(&self) -> usize {
        self.encoding.unit_size()
    }

    /// Decodes all of `bytes` into a Rust string.
    pub fn decode_all(&self, bytes: &[u8]) -> Result<String, KernelError> {
        let mut out = String::with_capacity(bytes.len());
        let mut pos = 0;
        while pos < bytes.len() {
            let (c, used) = (self.decode)(&bytes[pos..]).map_err(|e| at_offset(e, pos))?;
            out.push(c);
            pos += used;
        }
        Ok(out)
    }

    /// Appends the encoding of `text` to `out`.
    pub fn encode_all(&self, text: &str, out: &mut Vec<u8>) -> Result<(), KernelError> {
        let mut scratch = [0u8; 4];
        for c in text.chars() {
            let n = (self.encode)(c, &mut scratch)?;
            out.extend_from_slice(&scratch[..n]);
        }
        Ok(())
    }
}

fn at_offset(err: KernelError, base: usize) -> KernelError {
    match err {
        KernelError::Decode { encoding, offset } => KernelError::Decode {
            encoding,
            offset: base + offset,
        },
        other => other,
    }
}

fn decode_error(encoding: StringEncoding) -> KernelError {
    KernelError::Decode {
        encoding: encoding.name(),
        offset: 0,
    }
}

fn decode_ascii(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    match bytes[0] {
        b if b.is_ascii() => Ok((b as char, 1)),
        _ => Err(decode_error(StringEncoding::Ascii)),
    }
}

fn decode_ascii_lossy(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    Ok(decode_ascii(bytes).unwrap_or((char::REPLACEMENT_CHARACTER, 1)))
}

fn encode_ascii(c: char, out: &mut [u8; 4]) -> Result<usize, KernelError> {
    if c.is_ascii() {
        out[0] = c as u8;
        Ok(1)
    } else {
        Err(KernelError::Encode {
            codepoint: c as u32,
            encoding: StringEncoding::Ascii.name(),
        })
    }
}

fn encode_ascii_lossy(c: char, out: &mut [u8; 4]) -> Result<usize, KernelError> {
    Ok(encode_ascii(c, out).unwrap_or_else(|_| {
        out[0] = b'?';
        1
    }))
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => 0,
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    let width = utf8_width(bytes[0]);
    if width == 0 || width > bytes.len() {
        return Err(decode_error(StringEncoding::Utf8));
    }
    std::str::from_utf8(&bytes[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .map(|c| (c, width))
        .ok_or_else(|| decode_error(StringEncoding::Utf8))
}

fn decode_utf8_lossy(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    Ok(decode_utf8(bytes).unwrap_or((char::REPLACEMENT_CHARACTER, 1)))
}

fn encode_utf8(c: char, out: &mut [u8; 4]) -> Result<usize, KernelError> {
    Ok(c.encode_utf8(out).len())
}

fn read_u16(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_ne_bytes([*bytes.first()?, *bytes.get(1)?]))
}

fn decode_utf16(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    let err = || decode_error(StringEncoding::Utf16);
    let first = read_u16(bytes).ok_or_else(err)?;
    if !(0xd800..0xe000).contains(&first) {
        return char::from_u32(first as u32).map(|c| (c, 2)).ok_or_else(err);
    }
    let second = bytes.get(2..).and_then(read_u16).ok_or_else(err)?;
    match char::decode_utf16([first, second]).next() {
        Some(Ok(c)) => Ok((c, 4)),
        _ => Err(err()),
    }
}

fn decode_utf16_lossy(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    Ok(decode_utf16(bytes).unwrap_or((char::REPLACEMENT_CHARACTER, 2.min(bytes.len()))))
}

fn encode_utf16(c: char, out: &mut [u8; 4]) -> Result<usize, KernelError> {
    let mut units = [0u16; 2];
    let encoded = c.encode_utf16(&mut units);
    for (i, unit) in encoded.iter().enumerate() {
        out[i * 2..i * 2 + 2].copy_from_slice(&unit.to_ne_bytes());
    }
    Ok(encoded.len() * 2)
}

fn decode_utf32(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    bytes
        .get(..4)
        .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .and_then(char::from_u32)
        .map(|c| (c, 4))
        .ok_or_else(|| decode_error(StringEncoding::Utf32))
}

fn decode_utf32_lossy(bytes: &[u8]) -> Result<(char, usize), KernelError> {
    Ok(decode_utf32(bytes).unwrap_or((char::REPLACEMENT_CHARACTER, 4.min(bytes.len()))))
}

fn encode_utf32(c: char, out: &mut [u8; 4]) -> Result<usize, KernelError> {
    *out = (c as u32).to_ne_bytes();
    Ok(4)
}
