use crate::Error;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::convert::TryInto;
use std::fmt::{Display, Formatter};

const SHA256_BYTE_COUNT: usize = 32;

/// Sha-256 is a 256-bit array or 32 bytes.
/// It provides an API to display as hex-encoded string and parse it from a hex-encoded string.
#[derive(
    Copy, Clone, Debug, Default, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize,
)]
pub struct Sha256([u8; SHA256_BYTE_COUNT]);

impl Sha256 {
    pub const fn from_raw(raw_bytes: [u8; SHA256_BYTE_COUNT]) -> Self {
        Self(raw_bytes)
    }

    pub fn digest(data: &[u8]) -> Self {
        let result = sha2::Sha256::digest(data);
        let mut output = [0; SHA256_BYTE_COUNT];
        output.copy_from_slice(result.as_slice());
        Sha256::from_raw(output)
    }

    /// SHA-256 applied twice, the way transaction ids are derived.
    pub fn double_digest(data: &[u8]) -> Self {
        let first = Self::digest(data);
        Self::digest(first.as_slice())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_slice())
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let raw: [u8; SHA256_BYTE_COUNT] =
            bytes.try_into().map_err(|_| Error::InvalidLength {
                expected: SHA256_BYTE_COUNT,
                actual,
            })?;
        Ok(Sha256::from_raw(raw))
    }
}

impl Display for Sha256 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
