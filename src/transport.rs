//! Contains the trait that defines the HTTP `transport` the client sends
//! its requests over, and the per-request context the transport reports to.
//!
//! The transport does the actual networking (connection pooling, TLS,
//! redirects). Two events need a decision from this crate while a request
//! is in flight:
//!
//! - the server certificate failed validation: the transport calls
//!   [`RequestContext::on_tls_errors`] and either ignores the errors or
//!   aborts the request;
//! - the server answered `401`: the transport calls
//!   [`RequestContext::on_auth_challenge`] and either retries with the
//!   returned credentials or aborts.
//!
//! When told to abort, the transport stops and returns any error. The client
//! replaces that error with the reason recorded in the context.
//!
//! Each request gets its own context, holding a snapshot of the pinned
//! certificate and the credentials, so the transport may call it from any
//! thread and overlapping requests never see each other's state.
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::BoxFuture;
use http::Response;

use crate::auth::{AuthChallenge, AuthNegotiator, AuthState, ChallengeReply, Credentials, AUTH_FAILED_MESSAGE};
use crate::body::Body;
use crate::errors::{DavError, TransportError};
use crate::requests::DavRequest;
use crate::trust::{PeerCertificate, PinnedCertificate, TlsError, TrustDecision, TrustNegotiator, UntrustedCertificate};

/// Future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> = BoxFuture<'a, Result<Response<Body>, TransportError>>;

/// The trait that defines a transport.
pub trait HttpTransport: Debug + Send + Sync {
    /// Send `request` and return the final response.
    ///
    /// TLS validation failures and authentication challenges are reported
    /// to `ctx`, and its answer must be followed.
    fn send<'a>(&'a self, request: DavRequest, ctx: &'a mut RequestContext) -> TransportFuture<'a>;
}

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Why a request was aborted by this crate.
#[derive(Debug, Clone)]
pub enum AbortReason {
    CertificateUntrusted(UntrustedCertificate),
    AuthenticationFailed(String),
}

impl From<AbortReason> for DavError {
    fn from(reason: AbortReason) -> DavError {
        match reason {
            AbortReason::CertificateUntrusted(c) => DavError::CertificateUntrusted(c),
            AbortReason::AuthenticationFailed(m) => DavError::AuthenticationFailed(m),
        }
    }
}

/// Per-request state handed to the transport.
#[derive(Debug)]
pub struct RequestContext {
    id:      u64,
    trust:   TrustNegotiator,
    auth:    AuthNegotiator,
    aborted: Option<AbortReason>,
}

impl RequestContext {
    pub fn new(pinned: PinnedCertificate, credentials: Credentials) -> RequestContext {
        RequestContext {
            id:      NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            trust:   TrustNegotiator::new(pinned),
            auth:    AuthNegotiator::new(credentials),
            aborted: None,
        }
    }

    /// Identifier for log lines, unique within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The server certificate failed validation. `Proceed` means: ignore
    /// the errors and continue.
    pub fn on_tls_errors(&mut self, certificate: &PeerCertificate, errors: &[TlsError]) -> TrustDecision {
        if self.aborted.is_some() {
            return TrustDecision::Reject;
        }
        trace!("request {}: TLS errors {:?}", self.id, errors);
        let decision = self.trust.evaluate(certificate);
        if decision == TrustDecision::Reject {
            self.abort(AbortReason::CertificateUntrusted(UntrustedCertificate {
                certificate: certificate.clone(),
                errors:      errors.to_vec(),
            }));
        }
        decision
    }

    /// The server asked for authentication.
    pub fn on_auth_challenge(&mut self, challenge: &AuthChallenge) -> ChallengeReply {
        if self.aborted.is_some() {
            return ChallengeReply::Abort;
        }
        let reply = self.auth.on_challenge(challenge);
        if reply == ChallengeReply::Abort {
            self.abort(AbortReason::AuthenticationFailed(AUTH_FAILED_MESSAGE.to_string()));
        }
        reply
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.aborted.as_ref()
    }

    // first reason wins.
    fn abort(&mut self, reason: AbortReason) {
        debug!("request {}: aborting: {:?}", self.id, reason);
        if self.aborted.is_none() {
            self.aborted = Some(reason);
        }
    }

    /// Turn the transport result into the client result.
    pub(crate) fn finish(
        mut self,
        result: Result<Response<Body>, TransportError>,
    ) -> Result<Response<Body>, DavError>
    {
        if let Some(reason) = self.aborted.take() {
            return Err(reason.into());
        }
        match result {
            Ok(resp) => {
                self.auth.on_complete();
                debug!("request {}: {} (auth {:?})", self.id, resp.status(), self.auth.state());
                Ok(resp)
            },
            Err(e) => {
                debug!("request {}: transport error: {}", self.id, e);
                Err(DavError::Transport(e))
            },
        }
    }
}
