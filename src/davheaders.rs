use std::fmt;

use headers::Header;
use http::header::{HeaderName, HeaderValue};
use url::Url;

use crate::errors::{DavError, DavResult};

pub static DEPTH: HeaderName = HeaderName::from_static("depth");
pub static OVERWRITE: HeaderName = HeaderName::from_static("overwrite");
pub static DESTINATION: HeaderName = HeaderName::from_static("destination");

/// Methods sent by the client.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum DavMethod {
    Get,
    Put,
    MkCol,
    PropFind,
    PropPatch,
    Search,
    Copy,
    Move,
    Delete,
}

impl DavMethod {
    pub fn as_str(&self) -> &'static str {
        match *self {
            DavMethod::Get => "GET",
            DavMethod::Put => "PUT",
            DavMethod::MkCol => "MKCOL",
            DavMethod::PropFind => "PROPFIND",
            DavMethod::PropPatch => "PROPPATCH",
            DavMethod::Search => "SEARCH",
            DavMethod::Copy => "COPY",
            DavMethod::Move => "MOVE",
            DavMethod::Delete => "DELETE",
        }
    }

    pub(crate) fn to_http(self) -> DavResult<http::Method> {
        Ok(match self {
            DavMethod::Get => http::Method::GET,
            DavMethod::Put => http::Method::PUT,
            DavMethod::Delete => http::Method::DELETE,
            m => http::Method::from_bytes(m.as_str().as_bytes())?,
        })
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// helper.
fn one<'i, I>(values: &mut I) -> Result<&'i HeaderValue, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(headers::Error::invalid)?;
    if values.next().is_some() {
        Err(headers::Error::invalid())
    } else {
        Ok(v)
    }
}

/// Depth: header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Numeric depth as used by older callers: `0`, `1`, and `2` for infinity.
impl TryFrom<u32> for Depth {
    type Error = DavError;

    fn try_from(depth: u32) -> DavResult<Depth> {
        match depth {
            0 => Ok(Depth::Zero),
            1 => Ok(Depth::One),
            2 => Ok(Depth::Infinity),
            d => Err(DavError::InvalidDepth(d)),
        }
    }
}

impl Header for Depth {
    fn name() -> &'static HeaderName {
        &DEPTH
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?;
        match value.as_bytes() {
            b"0" => Ok(Depth::Zero),
            b"1" => Ok(Depth::One),
            b"infinity" | b"Infinity" => Ok(Depth::Infinity),
            _ => Err(headers::Error::invalid()),
        }
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        values.extend(std::iter::once(HeaderValue::from_static(self.as_str())));
    }
}

/// Destination: header. Always an absolute URL (RFC 4918 10.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Destination(HeaderValue);

impl Destination {
    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap_or_default()
    }
}

impl TryFrom<&Url> for Destination {
    type Error = DavError;

    fn try_from(url: &Url) -> DavResult<Destination> {
        HeaderValue::from_str(url.as_str())
            .map(Destination)
            .map_err(|_| DavError::InvalidUrl(url.to_string()))
    }
}

impl Header for Destination {
    fn name() -> &'static HeaderName {
        &DESTINATION
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?;
        let s = value.to_str().map_err(|_| headers::Error::invalid())?;
        Url::parse(s).map_err(|_| headers::Error::invalid())?;
        Ok(Destination(value.clone()))
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        values.extend(std::iter::once(self.0.clone()));
    }
}

/// Overwrite: header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overwrite(pub bool);

impl Header for Overwrite {
    fn name() -> &'static HeaderName {
        &OVERWRITE
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let line = one(values)?;
        match line.as_bytes() {
            b"F" => Ok(Overwrite(false)),
            b"T" => Ok(Overwrite(true)),
            _ => Err(headers::Error::invalid()),
        }
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match self.0 {
            true => "T",
            false => "F",
        };
        values.extend(std::iter::once(HeaderValue::from_static(value)));
    }
}
