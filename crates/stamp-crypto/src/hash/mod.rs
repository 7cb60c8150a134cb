use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

mod fixed;

pub use digest::{Digest, Output};
pub use fixed::{Hash, IncorrectLengthError};
pub use sha2::Sha512;

/// The hash algorithm a digest was produced with.
///
/// Only one variant is wired up today (see `SPEC_FULL.md` §3.1: SHA-512 was
/// chosen to preserve the known-answer vectors bit-for-bit). The enum stays
/// `non_exhaustive` so a second algorithm can be added without breaking
/// callers that already match on it.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum HashAlgorithm {
    Sha512,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

impl fmt::Debug for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(anyhow::anyhow!("unsupported hash algorithm '{other}'")),
        }
    }
}

/// A digest algorithm this crate is willing to address nodes with.
///
/// Sealed so the only way to get a new impl is to add it here, next to the
/// matching `HashAlgorithm` variant and known-answer vectors in `stamp-merkle`.
pub trait SupportedDigest: Digest + private::Sealed {
    const ALGORITHM: HashAlgorithm;
}

impl SupportedDigest for Sha512 {
    const ALGORITHM: HashAlgorithm = HashAlgorithm::Sha512;
}

mod private {
    use sha2::Sha512;

    pub trait Sealed {}
    impl Sealed for Sha512 {}
}
