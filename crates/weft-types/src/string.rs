//! Out-of-line storage for variable-length strings.

use std::fmt;

/// Slot holding the code units of one variable-length string.
///
/// The bytes are stored in the encoding of the owning string type. A slot
/// with no allocation is the missing value of `?string`; for a plain `string`
/// it reads as empty.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct StringData(Option<Box<[u8]>>);

impl StringData {
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(Some(bytes.into()))
    }

    /// UTF-8 text.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.as_bytes())
    }

    pub const fn missing() -> Self {
        Self(None)
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    /// Code units, empty when missing.
    pub fn bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or(&[])
    }

    /// Contents as UTF-8 text, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.bytes()).ok()
    }
}

impl fmt::Debug for StringData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("StringData(NA)"),
            Some(bytes) => write!(f, "StringData({:?})", String::from_utf8_lossy(bytes)),
        }
    }
}
