//! Connection settings of a WebDAV session.
//!
//! [`ConnectionSettings`] collects what the user configured (scheme, host,
//! port, root path, credentials, pinned certificate digests) and
//! [`build`](ConnectionSettings::build)s a [`ConnectionConfig`], which holds
//! the composed base URL the request builders work from.
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::digest::CertDigest;
use crate::errors::{DavError, DavResult};
use crate::trust::PinnedCertificate;

/// URL scheme of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Port that is left out of the URL for this scheme.
    pub fn default_port(&self) -> u16 {
        match *self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl FromStr for Scheme {
    type Err = DavError;

    fn from_str(s: &str) -> DavResult<Scheme> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            _ => Err(DavError::InvalidUrl(format!("unsupported scheme {:?}", s))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied connection settings.
#[derive(Clone)]
pub struct ConnectionSettings {
    scheme:              Scheme,
    host:                String,
    port:                Option<u16>,
    root_path:           String,
    username:            String,
    password:            String,
    pinned_md5:          String,
    pinned_sha1:         String,
    extended_properties: bool,
}

impl ConnectionSettings {
    /// Settings for `scheme://host/`, no credentials, nothing pinned.
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        ConnectionSettings {
            scheme,
            host: host.into(),
            port: None,
            root_path: String::new(),
            username: String::new(),
            password: String::new(),
            pinned_md5: String::new(),
            pinned_sha1: String::new(),
            extended_properties: false,
        }
    }

    /// Path on the server that all request paths are relative to.
    pub fn root_path(self, root_path: impl Into<String>) -> Self {
        let mut this = self;
        this.root_path = root_path.into();
        this
    }

    /// Port number. `0` means "scheme default".
    pub fn port(self, port: u16) -> Self {
        let mut this = self;
        this.port = Some(port);
        this
    }

    /// Username and password, sent as-is when the server asks.
    pub fn credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let mut this = self;
        this.username = username.into();
        this.password = password.into();
        this
    }

    /// Certificate digests the user accepted earlier, in `AA:BB:..` notation.
    pub fn pinned_digests(self, md5_hex: impl Into<String>, sha1_hex: impl Into<String>) -> Self {
        let mut this = self;
        this.pinned_md5 = md5_hex.into();
        this.pinned_sha1 = sha1_hex.into();
        this
    }

    /// Ask for the extended property set in `list()`.
    pub fn extended_properties(self, enable: bool) -> Self {
        let mut this = self;
        this.extended_properties = enable;
        this
    }

    /// Compose the base URL and decode the digests.
    pub fn build(self) -> DavResult<ConnectionConfig> {
        check_host(&self.host)?;
        let mut url = Url::parse(&format!("{}://localhost", self.scheme))?;
        url.set_host(Some(&self.host))
            .map_err(|e| DavError::InvalidUrl(format!("invalid host {:?}: {}", self.host, e)))?;
        check_dot_segments(&self.root_path)?;
        url.set_path(&self.root_path);
        if let Some(port) = self.port {
            if port != 0 && port != self.scheme.default_port() {
                url.set_port(Some(port))
                    .map_err(|_| DavError::InvalidUrl(format!("cannot set port {}", port)))?;
            }
        }
        let mut config = ConnectionConfig::from_url(
            url,
            self.username,
            self.password,
            &self.pinned_md5,
            &self.pinned_sha1,
        )?;
        config.extended_properties = self.extended_properties;
        Ok(config)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("root_path", &self.root_path)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Composed, read-only view of the connection used while building requests.
#[derive(Clone)]
pub struct ConnectionConfig {
    base_url:                       Url,
    scheme:                         Scheme,
    username:                       String,
    password:                       String,
    pub(crate) pinned:              PinnedCertificate,
    pub(crate) extended_properties: bool,
}

impl ConnectionConfig {
    /// Use an already composed base URL. Its path is the root path.
    pub fn from_url(
        base_url: Url,
        username: impl Into<String>,
        password: impl Into<String>,
        md5_hex: &str,
        sha1_hex: &str,
    ) -> DavResult<ConnectionConfig>
    {
        let scheme = base_url.scheme().parse::<Scheme>()?;
        check_base_url(&base_url)?;
        let pinned = PinnedCertificate::new(CertDigest::from_hex(md5_hex)?, CertDigest::from_hex(sha1_hex)?);
        Ok(ConnectionConfig {
            base_url,
            scheme,
            username: username.into(),
            password: password.into(),
            pinned,
            extended_properties: false,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn hostname(&self) -> &str {
        self.base_url.host_str().unwrap_or("")
    }

    /// Explicit port, `None` when the scheme default is used.
    pub fn port(&self) -> Option<u16> {
        self.base_url.port()
    }

    pub fn root_path(&self) -> &str {
        self.base_url.path()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn pinned(&self) -> &PinnedCertificate {
        &self.pinned
    }

    pub fn extended_properties(&self) -> bool {
        self.extended_properties
    }

    /// `root_path + path`. Only the slash where the two meet is not doubled.
    pub fn absolute_path(&self, path: &str) -> String {
        let root = self.root_path();
        if root.ends_with('/') && path.starts_with('/') {
            format!("{}{}", root, &path[1..])
        } else {
            format!("{}{}", root, path)
        }
    }

    /// The base URL with its path replaced by `root_path + path`.
    ///
    /// Paths with `.` or `..` segments are refused with `InvalidUrl`, since
    /// URL serialization would resolve them and could leave the root path.
    pub fn url_for_path(&self, path: &str) -> DavResult<Url> {
        check_dot_segments(path)?;
        let mut url = self.base_url.clone();
        url.set_path(&self.absolute_path(path));
        Ok(url)
    }

    /// Record a certificate the user chose to trust.
    pub(crate) fn set_pinned(&mut self, pinned: PinnedCertificate) {
        self.pinned = pinned;
    }
}

// a bare host name or address. `set_host` would silently cut "h:8443" at the colon.
fn check_host(host: &str) -> DavResult<()> {
    let ipv6 = host.starts_with('[') && host.ends_with(']');
    let bad = |c: char| c.is_whitespace() || "@/?#\\%".contains(c) || (c == ':' && !ipv6);
    if host.is_empty() || host.contains(bad) {
        return Err(DavError::InvalidUrl(format!("invalid host {:?}", host)));
    }
    Ok(())
}

// host only: no userinfo, query or fragment, and a usable host.
fn check_base_url(url: &Url) -> DavResult<()> {
    if url.host_str().is_none_or(|h| h.is_empty()) {
        return Err(DavError::InvalidUrl(format!("no host in {}", url)));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(DavError::InvalidUrl("credentials in base URL".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(DavError::InvalidUrl(format!("query or fragment in base URL {}", url)));
    }
    check_dot_segments(url.path())
}

fn check_dot_segments(path: &str) -> DavResult<()> {
    let dot = |seg: &str| {
        let seg = seg.to_ascii_lowercase().replace("%2e", ".");
        seg == "." || seg == ".."
    };
    if path.split(['/', '\\']).any(dot) {
        return Err(DavError::InvalidUrl(format!("dot segment in path {:?}", path)));
    }
    Ok(())
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("pinned", &self.pinned)
            .field("extended_properties", &self.extended_properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_with_port(scheme: Scheme, port: u16) -> String {
        ConnectionSettings::new(scheme, "h")
            .root_path("/root/")
            .port(port)
            .build()
            .unwrap()
            .base_url()
            .to_string()
    }

    #[test]
    fn default_ports_are_omitted() {
        assert_eq!(url_with_port(Scheme::Http, 80), "http://h/root/");
        assert_eq!(url_with_port(Scheme::Https, 443), "https://h/root/");
        assert_eq!(url_with_port(Scheme::Http, 0), "http://h/root/");
        assert_eq!(url_with_port(Scheme::Https, 0), "https://h/root/");
    }

    #[test]
    fn other_ports_are_kept() {
        assert_eq!(url_with_port(Scheme::Http, 443), "http://h:443/root/");
        assert_eq!(url_with_port(Scheme::Https, 80), "https://h:80/root/");
        assert_eq!(url_with_port(Scheme::Https, 8443), "https://h:8443/root/");
        let config = ConnectionSettings::new(Scheme::Http, "h").port(8080).build().unwrap();
        assert_eq!(config.port(), Some(8080));
    }

    #[test]
    fn accessors() {
        let config = ConnectionSettings::new(Scheme::Https, "dav.example.com")
            .root_path("/remote.php/webdav/")
            .credentials("alice", "s3cret")
            .pinned_digests("AA:BB", "CC:DD")
            .build()
            .unwrap();
        assert!(config.is_secure());
        assert_eq!(config.hostname(), "dav.example.com");
        assert_eq!(config.port(), None);
        assert_eq!(config.root_path(), "/remote.php/webdav/");
        assert_eq!(config.username(), "alice");
        assert_eq!(config.password(), "s3cret");
        assert_eq!(config.pinned().md5().as_bytes(), &[0xaa, 0xbb]);
        assert_eq!(config.pinned().sha1().as_bytes(), &[0xcc, 0xdd]);
    }

    #[test]
    fn url_for_path_joins_root_and_path() {
        let config = ConnectionSettings::new(Scheme::Http, "h").root_path("/root/").build().unwrap();
        assert_eq!(config.url_for_path("/b/a.txt").unwrap().as_str(), "http://h/root/b/a.txt");
        assert_eq!(config.url_for_path("b/a.txt").unwrap().as_str(), "http://h/root/b/a.txt");

        let config = ConnectionSettings::new(Scheme::Http, "h").root_path("/root").build().unwrap();
        assert_eq!(config.url_for_path("/x").unwrap().as_str(), "http://h/root/x");

        let config = ConnectionSettings::new(Scheme::Http, "h").build().unwrap();
        assert_eq!(config.url_for_path("/x").unwrap().as_str(), "http://h/x");
    }

    #[test]
    fn host_must_be_a_bare_host() {
        for host in ["bob:pw@h", "h:8443", "h/evil?x", "h#frag", "", "h h", ":80"] {
            let r = ConnectionSettings::new(Scheme::Https, host).port(443).build();
            assert!(matches!(r, Err(DavError::InvalidUrl(_))), "{:?} gave {:?}", host, r);
        }
        let config = ConnectionSettings::new(Scheme::Http, "[::1]").port(8080).build().unwrap();
        assert_eq!(config.base_url().as_str(), "http://[::1]:8080/");
        assert_eq!(config.url_for_path("/x").unwrap().as_str(), "http://[::1]:8080/x");
    }

    #[test]
    fn from_url_rejects_userinfo_and_query() {
        for url in ["http://bob:pw@h/dav/", "http://h/dav/?x=1", "http://h/dav/#top"] {
            let r = ConnectionConfig::from_url(Url::parse(url).unwrap(), "u", "p", "", "");
            assert!(matches!(r, Err(DavError::InvalidUrl(_))), "{}", url);
        }
    }

    #[test]
    fn dot_segments_are_refused() {
        let config = ConnectionSettings::new(Scheme::Http, "h").root_path("/root/").build().unwrap();
        for path in ["/a/../b", "/../../etc/passwd", "./x", "/a/.", "/%2E%2E/x", "/.%2e/x", "\\..\\x"] {
            assert!(matches!(config.url_for_path(path), Err(DavError::InvalidUrl(_))), "{:?}", path);
        }
        assert_eq!(config.url_for_path("/a..b/.hidden").unwrap().as_str(), "http://h/root/a..b/.hidden");

        let r = ConnectionSettings::new(Scheme::Http, "h").root_path("/dav/../").build();
        assert!(matches!(r, Err(DavError::InvalidUrl(_))));
    }

    #[test]
    fn bad_digest_fails_build() {
        let r = ConnectionSettings::new(Scheme::Https, "h").pinned_digests("AABB", "").build();
        assert!(matches!(r, Err(DavError::InvalidDigestFormat(_))));
    }

    #[test]
    fn scheme_from_str() {
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Https);
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert!("ftp".parse::<Scheme>().is_err());
    }

    #[test]
    fn from_url_keeps_the_url() {
        let url = Url::parse("https://h:8443/dav/").unwrap();
        let config = ConnectionConfig::from_url(url, "u", "p", "", "").unwrap();
        assert_eq!(config.scheme(), Scheme::Https);
        assert_eq!(config.port(), Some(8443));
        assert!(!config.pinned().is_pinned());
    }
}
