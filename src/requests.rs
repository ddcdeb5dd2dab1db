//! Per-verb request construction.
//!
//! [`RequestBuilder`] turns a verb and its arguments into a [`DavRequest`]
//! against the configured base URL. Nothing here does I/O.
use bytes::Bytes;
use headers::HeaderMapExt;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::Request;

use crate::body::Body;
use crate::config::ConnectionConfig;
use crate::davheaders::{DavMethod, Depth, Destination, Overwrite};
use crate::errors::DavResult;
use crate::propxml::{self, PropertyQuery, PropertyUpdate};

/// A request ready to be handed to the transport.
pub type DavRequest = Request<Body>;

const XML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Properties asked for by `list()`.
pub const LIST_PROPERTIES: &[&str] = &["getlastmodified", "getcontentlength", "resourcetype"];

/// Added to [`LIST_PROPERTIES`] when extended properties are enabled.
pub const EXTENDED_LIST_PROPERTIES: &[&str] =
    &["creationdate", "displayname", "getcontentlanguage", "getcontenttype", "getetag"];

/// Builds requests against one connection configuration.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    config: &'a ConnectionConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ConnectionConfig) -> RequestBuilder<'a> {
        RequestBuilder { config }
    }

    fn request(&self, method: DavMethod, path: &str, body: Body) -> DavResult<DavRequest> {
        let url = self.config.url_for_path(path)?;
        let req = Request::builder()
            .method(method.to_http()?)
            .uri(url.as_str())
            .body(body)?;
        Ok(req)
    }

    // XML bodies get a content type and length, empty ones get neither.
    fn xml_request(&self, method: DavMethod, path: &str, xml: Bytes) -> DavResult<DavRequest> {
        let len = xml.len() as u64;
        let mut req = self.request(method, path, Body::from(xml))?;
        if len > 0 {
            let headers = req.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE));
            headers.typed_insert(headers::ContentLength(len));
        }
        Ok(req)
    }

    /// GET, starting at byte `offset` when it is not zero.
    pub fn get(&self, path: &str, offset: u64) -> DavResult<DavRequest> {
        let mut req = self.request(DavMethod::Get, path, Body::empty())?;
        if offset > 0 {
            // cannot fail for a range with only a start.
            if let Ok(range) = headers::Range::bytes(offset..) {
                req.headers_mut().typed_insert(range);
            }
        }
        Ok(req)
    }

    /// PUT. A non-empty body gets `Content-Length` (if known) and a
    /// `Content-Type` guessed from the path.
    pub fn put(&self, path: &str, body: impl Into<Body>) -> DavResult<DavRequest> {
        let body = body.into();
        let len = body.len();
        let mut req = self.request(DavMethod::Put, path, body)?;
        if len != Some(0) {
            let headers = req.headers_mut();
            if let Some(len) = len {
                headers.typed_insert(headers::ContentLength(len));
            }
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            headers.typed_insert(headers::ContentType::from(mime));
        }
        Ok(req)
    }

    pub fn mkcol(&self, path: &str) -> DavResult<DavRequest> {
        self.request(DavMethod::MkCol, path, Body::empty())
    }

    pub fn delete(&self, path: &str) -> DavResult<DavRequest> {
        self.request(DavMethod::Delete, path, Body::empty())
    }

    /// PROPFIND for the properties in `query`.
    pub fn propfind(&self, path: &str, query: &PropertyQuery, depth: Depth) -> DavResult<DavRequest> {
        let xml = propxml::encode_propfind(query)?;
        self.propfind_raw(path, xml, depth)
    }

    /// PROPFIND with a caller-built body.
    pub fn propfind_raw(&self, path: &str, xml: impl Into<Bytes>, depth: Depth) -> DavResult<DavRequest> {
        let mut req = self.xml_request(DavMethod::PropFind, path, xml.into())?;
        req.headers_mut().typed_insert(depth);
        Ok(req)
    }

    /// PROPFIND with the properties a directory listing needs.
    pub fn list(&self, path: &str, depth: Depth) -> DavResult<DavRequest> {
        let mut query = PropertyQuery::new().dav(LIST_PROPERTIES.iter().copied());
        if self.config.extended_properties() {
            query = query.dav(EXTENDED_LIST_PROPERTIES.iter().copied());
        }
        self.propfind(path, &query, depth)
    }

    pub fn proppatch(&self, path: &str, update: &PropertyUpdate) -> DavResult<DavRequest> {
        let xml = propxml::encode_proppatch(update)?;
        self.proppatch_raw(path, xml)
    }

    /// PROPPATCH with a caller-built body.
    pub fn proppatch_raw(&self, path: &str, xml: impl Into<Bytes>) -> DavResult<DavRequest> {
        self.xml_request(DavMethod::PropPatch, path, xml.into())
    }

    /// SEARCH (RFC 5323) with `query` wrapped in a `searchrequest`.
    pub fn search(&self, path: &str, query: &str) -> DavResult<DavRequest> {
        self.xml_request(DavMethod::Search, path, propxml::encode_search(query))
    }

    pub fn copy(&self, from: &str, to: &str, overwrite: bool) -> DavResult<DavRequest> {
        self.copy_or_move(DavMethod::Copy, from, to, overwrite)
    }

    pub fn move_to(&self, from: &str, to: &str, overwrite: bool) -> DavResult<DavRequest> {
        self.copy_or_move(DavMethod::Move, from, to, overwrite)
    }

    fn copy_or_move(&self, method: DavMethod, from: &str, to: &str, overwrite: bool) -> DavResult<DavRequest> {
        let mut req = self.request(method, from, Body::empty())?;
        let dest = self.config.url_for_path(to)?;
        let headers = req.headers_mut();
        headers.typed_insert(Destination::try_from(&dest)?);
        headers.typed_insert(Depth::Infinity);
        headers.typed_insert(Overwrite(overwrite));
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionSettings, Scheme};
    use crate::propxml::NS_DAV_URI;

    fn config() -> ConnectionConfig {
        ConnectionSettings::new(Scheme::Http, "h").root_path("/root/").build().unwrap()
    }

    fn header<'r>(req: &'r DavRequest, name: &str) -> Option<&'r str> {
        req.headers().get(name).map(|v| v.to_str().unwrap())
    }

    #[test]
    fn get_with_and_without_range() {
        let config = config();
        let b = RequestBuilder::new(&config);
        let req = b.get("/a.txt", 0).unwrap();
        assert_eq!(req.method(), http::Method::GET);
        assert_eq!(req.uri(), "http://h/root/a.txt");
        assert!(header(&req, "range").is_none());

        let req = b.get("/big.bin", 1024).unwrap();
        assert_eq!(header(&req, "range"), Some("bytes=1024-"));
    }

    #[test]
    fn put_sets_length_and_type() {
        let config = config();
        let b = RequestBuilder::new(&config);
        let req = b.put("/notes.txt", "hello").unwrap();
        assert_eq!(req.method(), http::Method::PUT);
        assert_eq!(header(&req, "content-length"), Some("5"));
        assert_eq!(header(&req, "content-type"), Some("text/plain"));

        let req = b.put("/blob", Body::empty()).unwrap();
        assert!(header(&req, "content-length").is_none());
        assert!(header(&req, "content-type").is_none());
    }

    #[test]
    fn mkcol_and_delete_have_no_body_headers() {
        let config = config();
        let b = RequestBuilder::new(&config);
        for req in [b.mkcol("/dir/").unwrap(), b.delete("/dir/").unwrap()] {
            assert!(req.headers().is_empty());
            assert!(req.body().is_empty());
        }
        assert_eq!(b.mkcol("/dir/").unwrap().method().as_str(), "MKCOL");
        assert_eq!(b.delete("/dir/").unwrap().method(), http::Method::DELETE);
    }

    #[test]
    fn propfind_headers() {
        let config = config();
        let b = RequestBuilder::new(&config);
        let query = PropertyQuery::new().with(NS_DAV_URI, "getetag");
        for (depth, value) in [(Depth::Zero, "0"), (Depth::One, "1"), (Depth::Infinity, "infinity")] {
            let req = b.propfind("/", &query, depth).unwrap();
            assert_eq!(req.method().as_str(), "PROPFIND");
            assert_eq!(header(&req, "depth"), Some(value));
            assert_eq!(header(&req, "content-type"), Some("text/xml; charset=utf-8"));
        }
        let req = b.propfind("/", &query, Depth::try_from(2).unwrap()).unwrap();
        assert_eq!(header(&req, "depth"), Some("infinity"));
    }

    #[test]
    fn empty_raw_body_has_no_content_type() {
        let config = config();
        let req = RequestBuilder::new(&config).proppatch_raw("/x", Bytes::new()).unwrap();
        assert!(header(&req, "content-type").is_none());
    }

    #[test]
    fn copy_and_move_headers() {
        let config = config();
        let b = RequestBuilder::new(&config);
        let req = b.move_to("/a.txt", "/b/a.txt", true).unwrap();
        assert_eq!(req.method().as_str(), "MOVE");
        assert_eq!(req.uri(), "http://h/root/a.txt");
        assert_eq!(header(&req, "destination"), Some("http://h/root/b/a.txt"));
        assert_eq!(header(&req, "depth"), Some("infinity"));
        assert_eq!(header(&req, "overwrite"), Some("T"));

        let req = b.copy("/a.txt", "/c.txt", false).unwrap();
        assert_eq!(req.method().as_str(), "COPY");
        assert_eq!(header(&req, "destination"), Some("http://h/root/c.txt"));
        assert_eq!(header(&req, "overwrite"), Some("F"));
    }

    #[test]
    fn search_request() {
        let config = config();
        let req = RequestBuilder::new(&config).search("/", "<D:basicsearch/>").unwrap();
        assert_eq!(req.method().as_str(), "SEARCH");
        assert!(req.headers().get("depth").is_none());
        assert_eq!(header(&req, "content-type"), Some("text/xml; charset=utf-8"));
    }
}
