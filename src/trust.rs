//! Certificate pinning.
//!
//! When the transport cannot validate the server certificate against the
//! system trust store it asks the request context what to do. The answer
//! only depends on the digests the user explicitly accepted earlier: if the
//! presented certificate has exactly those MD5 and SHA1 digests the request
//! proceeds, otherwise it is aborted and the certificate is handed back to
//! the caller for a decision. Nothing is pinned automatically.
use crate::digest::CertDigest;

/// Digests of the certificate the user accepted. Empty digests mean "nothing pinned".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedCertificate {
    md5:  CertDigest,
    sha1: CertDigest,
}

impl PinnedCertificate {
    pub fn new(md5: CertDigest, sha1: CertDigest) -> PinnedCertificate {
        PinnedCertificate { md5, sha1 }
    }

    pub fn md5(&self) -> &CertDigest {
        &self.md5
    }

    pub fn sha1(&self) -> &CertDigest {
        &self.sha1
    }

    /// True once both digests are set.
    pub fn is_pinned(&self) -> bool {
        !self.md5.is_empty() && !self.sha1.is_empty()
    }

    fn matches(&self, cert: &PeerCertificate) -> bool {
        self.is_pinned() && self.md5 == cert.md5 && self.sha1 == cert.sha1
    }
}

/// Digests of the certificate the server presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    pub md5:  CertDigest,
    pub sha1: CertDigest,
}

impl PeerCertificate {
    pub fn new(md5: CertDigest, sha1: CertDigest) -> PeerCertificate {
        PeerCertificate { md5, sha1 }
    }
}

impl From<&PeerCertificate> for PinnedCertificate {
    fn from(cert: &PeerCertificate) -> PinnedCertificate {
        PinnedCertificate::new(cert.md5.clone(), cert.sha1.clone())
    }
}

/// One validation failure reported by the TLS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsError {
    pub description: String,
}

impl TlsError {
    pub fn new(description: impl Into<String>) -> TlsError {
        TlsError {
            description: description.into(),
        }
    }
}

/// Certificate that failed validation and is not pinned, with the reasons.
#[derive(Debug, Clone)]
pub struct UntrustedCertificate {
    pub certificate: PeerCertificate,
    pub errors:      Vec<TlsError>,
}

/// What the transport must do with a failed TLS validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustDecision {
    /// Ignore the validation errors and continue.
    Proceed,
    /// Abort the request.
    Reject,
}

/// Decides TLS failures against the pinned certificate.
#[derive(Debug, Clone, Default)]
pub struct TrustNegotiator {
    pinned: PinnedCertificate,
}

impl TrustNegotiator {
    pub fn new(pinned: PinnedCertificate) -> TrustNegotiator {
        TrustNegotiator { pinned }
    }

    pub fn evaluate(&self, presented: &PeerCertificate) -> TrustDecision {
        if self.pinned.matches(presented) {
            debug!("certificate {} is pinned, ignoring TLS errors", presented.sha1);
            TrustDecision::Proceed
        } else {
            debug!("certificate {} is not pinned, rejecting", presented.sha1);
            TrustDecision::Reject
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(md5: &[u8], sha1: &[u8]) -> PeerCertificate {
        PeerCertificate::new(md5.into(), sha1.into())
    }

    #[test]
    fn matching_digests_proceed() {
        let t = TrustNegotiator::new(PinnedCertificate::new(vec![1, 2].into(), vec![3, 4].into()));
        assert_eq!(t.evaluate(&cert(&[1, 2], &[3, 4])), TrustDecision::Proceed);
    }

    #[test]
    fn any_mismatch_rejects() {
        let t = TrustNegotiator::new(PinnedCertificate::new(vec![1, 2].into(), vec![3, 4].into()));
        assert_eq!(t.evaluate(&cert(&[9, 2], &[3, 4])), TrustDecision::Reject);
        assert_eq!(t.evaluate(&cert(&[1, 2], &[3, 9])), TrustDecision::Reject);
        assert_eq!(t.evaluate(&cert(&[9], &[9])), TrustDecision::Reject);
    }

    #[test]
    fn nothing_pinned_rejects_everything() {
        let t = TrustNegotiator::default();
        assert_eq!(t.evaluate(&cert(&[], &[])), TrustDecision::Reject);
        assert_eq!(t.evaluate(&cert(&[1], &[2])), TrustDecision::Reject);
    }

    #[test]
    fn accepting_a_certificate_pins_it() {
        let presented = cert(&[7, 7], &[8, 8]);
        let t = TrustNegotiator::new(PinnedCertificate::from(&presented));
        assert_eq!(t.evaluate(&presented), TrustDecision::Proceed);
    }
}
