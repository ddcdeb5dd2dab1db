//
// This module contains the main entry point of the library,
// WebdavClient.
//
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use http::Response;
use parking_lot::RwLock;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::auth::Credentials;
use crate::body::Body;
use crate::config::ConnectionConfig;
use crate::davheaders::Depth;
use crate::digest::CertDigest;
use crate::errors::{DavError, DavResult};
use crate::propxml::{PropertyQuery, PropertyUpdate};
use crate::requests::{DavRequest, RequestBuilder};
use crate::transport::{HttpTransport, RequestContext};
use crate::trust::{PeerCertificate, PinnedCertificate};

/// WebDAV client.
///
/// Cloning is cheap; clones share the transport and the connection
/// configuration, so a certificate accepted through one clone is trusted
/// by all of them.
#[derive(Clone, Debug)]
pub struct WebdavClient {
    transport: Arc<dyn HttpTransport>,
    config:    Arc<RwLock<ConnectionConfig>>,
}

impl WebdavClient {
    pub fn new(transport: impl HttpTransport + 'static, config: ConnectionConfig) -> WebdavClient {
        WebdavClient {
            transport: Arc::new(transport),
            config:    Arc::new(RwLock::new(config)),
        }
    }

    /// Replace the connection configuration. Requests already in flight
    /// keep the configuration they started with.
    pub fn set_connection_settings(&self, config: ConnectionConfig) {
        debug!("connection settings: {:?}", config);
        *self.config.write() = config;
    }

    /// Current configuration.
    pub fn config(&self) -> ConnectionConfig {
        self.config.read().clone()
    }

    pub fn is_secure(&self) -> bool {
        self.config.read().is_secure()
    }

    /// Trust the certificate with these digests from now on. Only the
    /// pinned digests change; host and credentials stay as they are.
    pub fn accept_ssl_certificate(&self, md5_hex: &str, sha1_hex: &str) -> DavResult<()> {
        let pinned = PinnedCertificate::new(CertDigest::from_hex(md5_hex)?, CertDigest::from_hex(sha1_hex)?);
        self.config.write().set_pinned(pinned);
        Ok(())
    }

    /// Trust a certificate returned in [`DavError::CertificateUntrusted`].
    pub fn accept_certificate(&self, certificate: &PeerCertificate) {
        debug!("accepting certificate {}", certificate.sha1);
        self.config.write().set_pinned(PinnedCertificate::from(certificate));
    }

    // build a request under the read lock, without holding it across await.
    fn build<F>(&self, f: F) -> DavResult<(DavRequest, RequestContext)>
    where F: FnOnce(RequestBuilder<'_>) -> DavResult<DavRequest> {
        let config = self.config.read();
        let req = f(RequestBuilder::new(&config))?;
        let credentials = Credentials::new(config.username(), config.password());
        let ctx = RequestContext::new(config.pinned().clone(), credentials);
        Ok((req, ctx))
    }

    async fn execute(&self, req: DavRequest, mut ctx: RequestContext) -> DavResult<Response<Body>> {
        debug!("request {}: {} {}", ctx.id(), req.method(), req.uri());
        trace!("request {}: headers {:?} body {:?}", ctx.id(), req.headers(), req.body());
        let result = self.transport.send(req, &mut ctx).await;
        ctx.finish(result)
    }

    async fn run<F>(&self, f: F) -> DavResult<Response<Body>>
    where F: FnOnce(RequestBuilder<'_>) -> DavResult<DavRequest> {
        let (req, ctx) = self.build(f)?;
        self.execute(req, ctx).await
    }

    /// Send a request built elsewhere, with the same trust and
    /// authentication handling as the other methods.
    pub async fn send(&self, req: DavRequest) -> DavResult<Response<Body>> {
        let (req, ctx) = self.build(|_| Ok(req))?;
        self.execute(req, ctx).await
    }

    /// List a collection: PROPFIND, depth 1, with the listing properties.
    pub async fn list(&self, path: &str) -> DavResult<Response<Body>> {
        self.list_depth(path, Depth::One).await
    }

    pub async fn list_depth(&self, path: &str, depth: Depth) -> DavResult<Response<Body>> {
        self.run(|b| b.list(path, depth)).await
    }

    pub async fn propfind(&self, path: &str, query: &PropertyQuery, depth: Depth) -> DavResult<Response<Body>> {
        self.run(|b| b.propfind(path, query, depth)).await
    }

    pub async fn propfind_raw(&self, path: &str, xml: impl Into<Bytes>, depth: Depth) -> DavResult<Response<Body>> {
        self.run(|b| b.propfind_raw(path, xml, depth)).await
    }

    pub async fn proppatch(&self, path: &str, update: &PropertyUpdate) -> DavResult<Response<Body>> {
        self.run(|b| b.proppatch(path, update)).await
    }

    pub async fn proppatch_raw(&self, path: &str, xml: impl Into<Bytes>) -> DavResult<Response<Body>> {
        self.run(|b| b.proppatch_raw(path, xml)).await
    }

    /// SEARCH. The response is returned as-is.
    pub async fn search(&self, path: &str, query: &str) -> DavResult<Response<Body>> {
        self.run(|b| b.search(path, query)).await
    }

    /// GET; the body is streamed by the caller.
    pub async fn get(&self, path: &str) -> DavResult<Response<Body>> {
        self.get_range(path, 0).await
    }

    /// GET starting at byte `offset`.
    pub async fn get_range(&self, path: &str, offset: u64) -> DavResult<Response<Body>> {
        self.run(|b| b.get(path, offset)).await
    }

    /// GET from byte `offset` into `sink`. Returns the number of bytes written.
    ///
    /// The sink is owned by this call and shut down exactly once, whether
    /// the download succeeds or fails. If the future is dropped the sink is
    /// dropped with it.
    pub async fn get_to<W>(&self, path: &str, mut sink: W, offset: u64) -> DavResult<u64>
    where W: AsyncWrite + Unpin + Send {
        let copied = self.copy_to(path, &mut sink, offset).await;
        let closed = sink.shutdown().await;
        drop(sink);
        let n = copied?;
        closed?;
        Ok(n)
    }

    async fn copy_to<W>(&self, path: &str, sink: &mut W, offset: u64) -> DavResult<u64>
    where W: AsyncWrite + Unpin + Send {
        let resp = self.get_range(path, offset).await?;
        if !resp.status().is_success() {
            return Err(DavError::Status(resp.status()));
        }
        let mut body = resp.into_body();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        trace!("get_to {}: {} bytes", path, written);
        Ok(written)
    }

    /// PUT `body` (bytes, string, or [`Body::from_stream`]).
    pub async fn put(&self, path: &str, body: impl Into<Body>) -> DavResult<Response<Body>> {
        self.run(|b| b.put(path, body)).await
    }

    /// MKCOL.
    pub async fn mkdir(&self, path: &str) -> DavResult<Response<Body>> {
        self.run(|b| b.mkcol(path)).await
    }

    pub async fn copy(&self, from: &str, to: &str, overwrite: bool) -> DavResult<Response<Body>> {
        self.run(|b| b.copy(from, to, overwrite)).await
    }

    /// MOVE.
    pub async fn move_to(&self, from: &str, to: &str, overwrite: bool) -> DavResult<Response<Body>> {
        self.run(|b| b.move_to(from, to, overwrite)).await
    }

    /// DELETE.
    pub async fn remove(&self, path: &str) -> DavResult<Response<Body>> {
        self.run(|b| b.delete(path)).await
    }
}
