//! Answering authentication challenges.
//!
//! Every request gets its own [`AuthNegotiator`]. The first challenge is
//! answered with the configured credentials; a second challenge on the same
//! request means the server rejected them, and the request is aborted.
use std::fmt;

use headers::Authorization;
use headers::authorization::Basic;

/// Username and password, passed verbatim to the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization: Basic ..` for transports that answer Basic challenges themselves.
    pub fn basic(&self) -> Authorization<Basic> {
        Authorization::basic(&self.username, &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

/// A `WWW-Authenticate` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub scheme: String,
    pub realm:  Option<String>,
}

impl AuthChallenge {
    pub fn new(scheme: impl Into<String>) -> AuthChallenge {
        AuthChallenge {
            scheme: scheme.into(),
            realm:  None,
        }
    }

    /// Parse the scheme and realm of a `WWW-Authenticate` header value,
    /// e.g. `Basic realm="WebDAV"`. Other parameters are ignored.
    pub fn parse(value: &str) -> Option<AuthChallenge> {
        let value = value.trim();
        let (scheme, params) = match value.find(char::is_whitespace) {
            Some(pos) => (&value[..pos], value[pos..].trim_start()),
            None => (value, ""),
        };
        if scheme.is_empty() {
            return None;
        }
        let realm = split_params(params).into_iter().find_map(|param| {
            let (name, val) = param.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("realm") {
                return None;
            }
            Some(unquote(val.trim()))
        });
        Some(AuthChallenge {
            scheme: scheme.to_string(),
            realm,
        })
    }
}

// split `a=b, c="d, e"` on the commas outside quoted strings.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let (mut start, mut quoted, mut escaped) = (0, false, false);
    for (i, c) in params.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                parts.push(&params[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    parts.push(&params[start..]);
    parts
}

// strip the quotes of a quoted-string and resolve `\x` escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"') else {
        return value.to_string();
    };
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

/// Where a request is in the authentication handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No challenge seen yet.
    Unauthenticated,
    /// Credentials supplied once, waiting for the outcome.
    Challenged,
    /// Request completed after supplying credentials.
    Resolved,
    /// Credentials were rejected.
    Failed,
}

/// What the transport must do with a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeReply {
    /// Retry the request with these credentials.
    Credentials(Credentials),
    /// Give up on the request.
    Abort,
}

pub(crate) const AUTH_FAILED_MESSAGE: &str =
    "WebDAV server requires authentication. Check WebDAV share settings!";

/// Per-request authentication state machine.
#[derive(Debug, Clone)]
pub struct AuthNegotiator {
    credentials: Credentials,
    state:       AuthState,
}

impl AuthNegotiator {
    pub fn new(credentials: Credentials) -> AuthNegotiator {
        AuthNegotiator {
            credentials,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn on_challenge(&mut self, challenge: &AuthChallenge) -> ChallengeReply {
        match self.state {
            AuthState::Unauthenticated => {
                debug!(
                    "auth challenge {} (realm {:?}), sending credentials for {:?}",
                    challenge.scheme, challenge.realm, self.credentials.username
                );
                self.state = AuthState::Challenged;
                ChallengeReply::Credentials(self.credentials.clone())
            },
            _ => {
                debug!("auth challenge {} repeated, credentials rejected", challenge.scheme);
                self.state = AuthState::Failed;
                ChallengeReply::Abort
            },
        }
    }

    /// The request finished without another challenge.
    pub fn on_complete(&mut self) {
        if self.state == AuthState::Challenged {
            self.state = AuthState::Resolved;
        }
    }
}
