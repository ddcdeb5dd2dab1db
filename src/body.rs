//! Definitions for the Request and Response bodies.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use http_body::{Body as HttpBody, Frame, SizeHint};

/// Body of the requests the client builds, and of the responses the
/// transport returns. Implements both `Stream` and `http_body::Body`.
pub struct Body {
    inner: BodyType,
}

enum BodyType {
    Bytes(Option<Bytes>),
    Stream {
        stream: BoxStream<'static, io::Result<Bytes>>,
        length: Option<u64>,
    },
    Empty,
}

impl Body {
    /// Return an empty body.
    pub fn empty() -> Body {
        Body {
            inner: BodyType::Empty,
        }
    }

    /// Body produced by a stream of chunks. `length`, if known, ends up in
    /// the `Content-Length` header.
    pub fn from_stream<S>(stream: S, length: Option<u64>) -> Body
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Body {
            inner: BodyType::Stream {
                stream: stream.boxed(),
                length,
            },
        }
    }

    /// Length in bytes, if known up front.
    pub fn len(&self) -> Option<u64> {
        match &self.inner {
            BodyType::Bytes(Some(b)) => Some(b.len() as u64),
            BodyType::Bytes(None) | BodyType::Empty => Some(0),
            BodyType::Stream { length, .. } => *length,
        }
    }

    /// True if this body is known to carry no data.
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Collect the whole body. Meant for small bodies (XML, error pages).
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.inner {
            BodyType::Bytes(b) => Ok(b.unwrap_or_default()),
            BodyType::Empty => Ok(Bytes::new()),
            BodyType::Stream { mut stream, .. } => {
                let mut data = Vec::new();
                while let Some(chunk) = stream.next().await {
                    data.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(data))
            },
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.inner {
            BodyType::Bytes(b) => write!(f, "Body::Bytes({:?})", b.as_ref().map(|b| b.len())),
            BodyType::Stream { length, .. } => write!(f, "Body::Stream({:?})", length),
            BodyType::Empty => write!(f, "Body::Empty"),
        }
    }
}

impl Default for Body {
    fn default() -> Body {
        Body::empty()
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        match self.inner {
            BodyType::Bytes(ref mut strm) => Poll::Ready(strm.take().map(Ok)),
            BodyType::Stream { ref mut stream, .. } => stream.as_mut().poll_next(cx),
            BodyType::Empty => Poll::Ready(None),
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>>
    {
        self.poll_next(cx).map(|opt| opt.map(|res| res.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        match &self.inner {
            BodyType::Bytes(b) => b.is_none(),
            BodyType::Empty => true,
            BodyType::Stream { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            BodyType::Bytes(Some(b)) => SizeHint::with_exact(b.len() as u64),
            BodyType::Bytes(None) | BodyType::Empty => SizeHint::with_exact(0),
            BodyType::Stream { length: Some(n), .. } => SizeHint::with_exact(*n),
            BodyType::Stream { length: None, .. } => SizeHint::default(),
        }
    }
}

impl From<String> for Body {
    fn from(t: String) -> Body {
        Body::from(Bytes::from(t))
    }
}

impl From<&'static str> for Body {
    fn from(t: &'static str) -> Body {
        Body::from(Bytes::from_static(t.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(t: Vec<u8>) -> Body {
        Body::from(Bytes::from(t))
    }
}

impl From<Bytes> for Body {
    fn from(t: Bytes) -> Body {
        Body {
            inner: BodyType::Bytes(Some(t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn stream_body_collects() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = Body::from_stream(stream::iter(chunks), None);
        assert_eq!(body.len(), None);
        assert_eq!(body.into_bytes().await.unwrap(), "abcd");
    }

    #[tokio::test]
    async fn http_body_frames() {
        let body = Body::from("hello");
        assert_eq!(HttpBody::size_hint(&body).exact(), Some(5));
        let collected = BodyExt::collect(body).await.unwrap().to_bytes();
        assert_eq!(collected, "hello");
        assert!(HttpBody::is_end_stream(&Body::empty()));
        assert!(Body::empty().is_empty());
    }
}
