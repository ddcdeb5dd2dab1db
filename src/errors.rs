use std::error::Error;

use http::StatusCode;

use crate::trust::UntrustedCertificate;

/// Opaque error raised by an [`HttpTransport`](crate::transport::HttpTransport).
pub type TransportError = Box<dyn Error + Send + Sync + 'static>;

/// Errors returned by the client.
#[derive(Debug)]
pub enum DavError {
    /// A certificate digest string is not `XX:XX:..` hex.
    InvalidDigestFormat(String),
    /// Depth value other than 0, 1 or 2 (infinity).
    InvalidDepth(u32),
    /// Host or path cannot be turned into a URL.
    InvalidUrl(String),
    /// Property name or namespace cannot be written as XML.
    MalformedXmlInput(String),
    /// TLS validation failed and the certificate is not pinned.
    CertificateUntrusted(UntrustedCertificate),
    /// Server challenged again after credentials were supplied.
    AuthenticationFailed(String),
    /// Non-success response where a success was required.
    Status(StatusCode),
    /// Failure reported by the transport, passed through untouched.
    Transport(TransportError),
    IoError(std::io::Error),
    HttpError(http::Error),
    XmlWriterError(xml::writer::Error),
}

/// Result type used throughout the crate.
pub type DavResult<T> = Result<T, DavError>;

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::Transport(e) => Some(e.as_ref()),
            DavError::IoError(e) => Some(e),
            DavError::HttpError(e) => Some(e),
            DavError::XmlWriterError(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DavError::InvalidDigestFormat(s) => write!(f, "invalid certificate digest: {:?}", s),
            DavError::InvalidDepth(d) => write!(f, "invalid depth: {}", d),
            DavError::InvalidUrl(s) => write!(f, "invalid URL: {}", s),
            DavError::MalformedXmlInput(s) => write!(f, "cannot encode as XML: {}", s),
            DavError::CertificateUntrusted(c) => {
                write!(f, "untrusted certificate (MD5 {}, SHA1 {})", c.certificate.md5, c.certificate.sha1)
            },
            DavError::AuthenticationFailed(msg) => write!(f, "{}", msg),
            DavError::Status(s) => write!(f, "server returned {}", s),
            DavError::Transport(e) => write!(f, "transport error: {}", e),
            DavError::IoError(_) => write!(f, "I/O error"),
            DavError::HttpError(_) => write!(f, "cannot build HTTP request"),
            DavError::XmlWriterError(_) => write!(f, "XML generate error"),
        }
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        DavError::IoError(e)
    }
}

impl From<http::Error> for DavError {
    fn from(e: http::Error) -> Self {
        DavError::HttpError(e)
    }
}

impl From<http::uri::InvalidUri> for DavError {
    fn from(e: http::uri::InvalidUri) -> Self {
        DavError::InvalidUrl(e.to_string())
    }
}

impl From<http::method::InvalidMethod> for DavError {
    fn from(e: http::method::InvalidMethod) -> Self {
        DavError::HttpError(e.into())
    }
}

impl From<url::ParseError> for DavError {
    fn from(e: url::ParseError) -> Self {
        DavError::InvalidUrl(e.to_string())
    }
}

impl From<xml::writer::Error> for DavError {
    fn from(e: xml::writer::Error) -> Self {
        DavError::XmlWriterError(e)
    }
}

impl From<DavError> for std::io::Error {
    fn from(e: DavError) -> Self {
        match e {
            DavError::IoError(e) => e,
            e => std::io::Error::other(e),
        }
    }
}

impl DavError {
    /// True for the errors that need a decision from the user
    /// (trust a certificate, fix credentials) before retrying.
    pub fn needs_user_decision(&self) -> bool {
        matches!(self, DavError::CertificateUntrusted(_) | DavError::AuthenticationFailed(_))
    }
}
