//! Outcomes: the result of processing a request

use std::fmt;
use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderName, LOCATION};
use parking_lot::Mutex;
use serde::Serialize;

use crate::http::ResponseHeader;
use crate::{Result, WervalError};

pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML_UTF8: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

/// Body of an outcome
pub enum Body {
    Empty,
    Bytes(Bytes),
    /// Streamed body; sent chunked when `length` is unknown
    Stream {
        length: Option<u64>,
        stream: BoxStream<'static, io::Result<Bytes>>,
    },
}

impl Body {
    /// Known length of the body, if any
    pub fn length(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Stream { length, .. } => *length,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream { .. })
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Body::Empty"),
            Self::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Self::Stream { length, .. } => write!(f, "Body::Stream(length={length:?})"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Self::Empty
        } else {
            Self::Bytes(bytes)
        }
    }
}

/// Result of processing a request: a response header and a body
///
/// Outcomes flow back up the filter chain; filters may decorate the header of
/// the outcome returned by the downstream chain before returning it.
#[derive(Debug)]
pub struct Outcome {
    header: ResponseHeader,
    body: Body,
}

impl Outcome {
    pub fn new(header: ResponseHeader, body: Body) -> Self {
        Self { header, body }
    }

    /// Plain text outcome, used where no request context is available
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut header = ResponseHeader::with_status(status);
        header
            .headers_mut()
            .insert(CONTENT_TYPE, http::HeaderValue::from_static(TEXT_PLAIN_UTF8));
        Self::new(header, Body::from(Bytes::from(text.into())))
    }

    pub fn status(&self) -> StatusCode {
        self.header.status()
    }

    pub fn response_header(&self) -> &ResponseHeader {
        &self.header
    }

    pub fn response_header_mut(&mut self) -> &mut ResponseHeader {
        &mut self.header
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_parts(self) -> (ResponseHeader, Body) {
        (self.header, self.body)
    }

    /// Collect the whole body in memory
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.body {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream { stream, .. } => {
                let buffer = stream
                    .try_fold(BytesMut::new(), |mut buffer, chunk| async move {
                        buffer.extend_from_slice(&chunk);
                        Ok(buffer)
                    })
                    .await?;
                Ok(buffer.freeze())
            }
        }
    }
}

/// Outcome builder facility scoped to one request
///
/// Builders start from a snapshot of the request's response header, taken when
/// the builder is created, so headers set by upstream filters reach the
/// response.
#[derive(Debug, Clone)]
pub struct Outcomes {
    response: Arc<Mutex<ResponseHeader>>,
}

impl Outcomes {
    pub fn new(response: Arc<Mutex<ResponseHeader>>) -> Self {
        Self { response }
    }

    pub fn status(&self, status: StatusCode) -> OutcomeBuilder {
        let mut header = self.response.lock().clone();
        header.set_status(status);
        OutcomeBuilder::new(header)
    }

    pub fn ok(&self) -> OutcomeBuilder {
        self.status(StatusCode::OK)
    }

    pub fn created(&self) -> OutcomeBuilder {
        self.status(StatusCode::CREATED)
    }

    pub fn accepted(&self) -> OutcomeBuilder {
        self.status(StatusCode::ACCEPTED)
    }

    pub fn no_content(&self) -> OutcomeBuilder {
        self.status(StatusCode::NO_CONTENT)
    }

    pub fn see_other(&self, url: &str) -> OutcomeBuilder {
        self.status(StatusCode::SEE_OTHER).with_header(LOCATION, url)
    }

    pub fn not_modified(&self) -> OutcomeBuilder {
        self.status(StatusCode::NOT_MODIFIED)
    }

    pub fn bad_request(&self) -> OutcomeBuilder {
        self.status(StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(&self) -> OutcomeBuilder {
        self.status(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(&self) -> OutcomeBuilder {
        self.status(StatusCode::FORBIDDEN)
    }

    pub fn not_found(&self) -> OutcomeBuilder {
        self.status(StatusCode::NOT_FOUND)
    }

    pub fn internal_server_error(&self) -> OutcomeBuilder {
        self.status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Builder for a single [`Outcome`]
///
/// Header errors are deferred and reported by [`OutcomeBuilder::build`].
///
/// ```rust
/// use werval_api::{Outcomes, ResponseHeader};
/// use std::sync::Arc;
/// use parking_lot::Mutex;
///
/// let outcomes = Outcomes::new(Arc::new(Mutex::new(ResponseHeader::new())));
/// let outcome = outcomes
///     .bad_request()
///     .as_text_plain()
///     .with_body("Content-Type header must be provided")
///     .build()
///     .unwrap();
///
/// assert_eq!(outcome.status().as_u16(), 400);
/// assert_eq!(
///     outcome.response_header().header("content-type"),
///     Some("text/plain; charset=utf-8")
/// );
/// ```
#[derive(Debug)]
pub struct OutcomeBuilder {
    header: ResponseHeader,
    body: Body,
    error: Option<WervalError>,
}

impl OutcomeBuilder {
    fn new(header: ResponseHeader) -> Self {
        Self {
            header,
            body: Body::Empty,
            error: None,
        }
    }

    fn defer(mut self, result: Result<()>) -> Self {
        if let Err(err) = result
            && self.error.is_none()
        {
            self.error = Some(err);
        }
        self
    }

    /// Replace a well-known header
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        let result = self.header.insert(name, value);
        self.defer(result)
    }

    /// Replace a header by name
    pub fn with_header_named(mut self, name: &str, value: &str) -> Self {
        let result = self.header.set_header(name, value);
        self.defer(result)
    }

    pub fn as_text_plain(self) -> Self {
        self.with_header(CONTENT_TYPE, TEXT_PLAIN_UTF8)
    }

    pub fn as_html(self) -> Self {
        self.with_header(CONTENT_TYPE, TEXT_HTML_UTF8)
    }

    pub fn as_json(self) -> Self {
        self.with_header(CONTENT_TYPE, APPLICATION_JSON)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::from(body.into());
        self
    }

    /// Serialize a value as the JSON body
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(json) => self.as_json().with_body(json),
            Err(err) => self.defer(Err(err.into())),
        }
    }

    /// Stream the body, chunked when `length` is `None`
    pub fn with_stream<S>(mut self, stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.body = Body::Stream {
            length,
            stream: stream.boxed(),
        };
        self
    }

    pub fn build(self) -> Result<Outcome> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Outcome::new(self.header, self.body)),
        }
    }
}
