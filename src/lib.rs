//! `Webdav` (RFC4918) is HTTP (GET/HEAD/PUT/DELETE) plus a bunch of extra methods.
//!
//! This crate is the client side of it: it builds the requests for the
//! WebDAV verbs (PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, ...) and the
//! SEARCH extension (RFC5323), using the types from the `http` crate, and
//! handles the two things a WebDAV client has to decide while a request is
//! in flight:
//!
//! - whether to trust a server certificate that failed validation. Only
//!   certificates whose MD5 and SHA1 digests the user accepted before are
//!   trusted; anything else aborts the request with
//!   [`DavError::CertificateUntrusted`], so the user can look at the
//!   certificate, accept it, and retry.
//! - how to answer an authentication challenge. The configured credentials
//!   are sent once per request; a second challenge for the same request
//!   fails it with [`DavError::AuthenticationFailed`].
//!
//! The actual networking is done by an
//! [`HttpTransport`](crate::transport::HttpTransport) you supply. Response
//! bodies (e.g. multistatus XML) are returned as-is. LOCK/UNLOCK are not
//! supported.
//!
//! ```no_run
//! use dav_client::{ConnectionSettings, Scheme, WebdavClient};
//! # use dav_client::transport::{HttpTransport, RequestContext, TransportFuture};
//! # use dav_client::requests::DavRequest;
//! # #[derive(Debug)]
//! # struct MyTransport;
//! # impl HttpTransport for MyTransport {
//! #     fn send<'a>(&'a self, _req: DavRequest, _ctx: &'a mut RequestContext) -> TransportFuture<'a> {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! # async fn example() -> Result<(), dav_client::DavError> {
//! let config = ConnectionSettings::new(Scheme::Https, "dav.example.com")
//!     .root_path("/remote.php/webdav/")
//!     .credentials("alice", "secret")
//!     .build()?;
//! let client = WebdavClient::new(MyTransport, config);
//!
//! match client.list("/").await {
//!     Ok(resp) => println!("{}", resp.status()),
//!     Err(dav_client::DavError::CertificateUntrusted(cert)) => {
//!         // ask the user, then:
//!         client.accept_certificate(&cert.certificate);
//!     },
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

mod client;
mod errors;

pub mod auth;
pub mod body;
pub mod config;
pub mod davheaders;
pub mod digest;
pub mod propxml;
pub mod requests;
pub mod transport;
pub mod trust;

pub use crate::body::Body;
pub use crate::client::WebdavClient;
pub use crate::config::{ConnectionConfig, ConnectionSettings, Scheme};
pub use crate::davheaders::{DavMethod, Depth};
pub use crate::digest::CertDigest;
pub use crate::errors::{DavError, DavResult, TransportError};
pub use crate::propxml::{PropertyQuery, PropertyUpdate};
pub use crate::trust::{PeerCertificate, TlsError, UntrustedCertificate};
