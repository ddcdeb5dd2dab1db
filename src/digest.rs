//! Certificate fingerprints in `AA:BB:CC` notation.
//!
//! A fingerprint is kept as raw digest bytes and shown to (and read back
//! from) the user as uppercase hex octets separated by colons, which is the
//! notation browsers and `openssl x509 -fingerprint` use.
use std::fmt;
use std::str::FromStr;

use crate::errors::{DavError, DavResult};

/// Raw bytes of a certificate digest (MD5 or SHA1).
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CertDigest(Vec<u8>);

impl CertDigest {
    /// Wrap raw digest bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> CertDigest {
        CertDigest(bytes.into())
    }

    /// The empty digest; never matches a presented certificate.
    pub fn empty() -> CertDigest {
        CertDigest(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render as uppercase hex octets joined by `:`.
    pub fn to_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Parse `XX(:XX)*`. The empty string gives the empty digest.
    pub fn from_hex(s: &str) -> DavResult<CertDigest> {
        if s.is_empty() {
            return Ok(CertDigest::empty());
        }
        let mut bytes = Vec::with_capacity((s.len() + 1) / 3);
        for group in s.split(':') {
            if group.len() != 2 {
                return Err(DavError::InvalidDigestFormat(s.to_string()));
            }
            let octet = hex::decode(group).map_err(|_| DavError::InvalidDigestFormat(s.to_string()))?;
            bytes.extend_from_slice(&octet);
        }
        Ok(CertDigest(bytes))
    }
}

impl FromStr for CertDigest {
    type Err = DavError;

    fn from_str(s: &str) -> DavResult<CertDigest> {
        CertDigest::from_hex(s)
    }
}

impl From<Vec<u8>> for CertDigest {
    fn from(v: Vec<u8>) -> CertDigest {
        CertDigest(v)
    }
}

impl From<&[u8]> for CertDigest {
    fn from(v: &[u8]) -> CertDigest {
        CertDigest(v.to_vec())
    }
}

impl fmt::Display for CertDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CertDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CertDigest({})", self.to_hex())
    }
}
