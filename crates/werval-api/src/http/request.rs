//! Immutable snapshot of an incoming HTTP request

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::str::FromStr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use uuid::Uuid;

use crate::{Result, WervalError};

/// Multi-valued request parameters (query string or bound path parameters)
///
/// # Examples
///
/// ```rust
/// use werval_api::http::Parameters;
///
/// let params = Parameters::parse_query("id=42&tag=a&tag=b&name=J%C3%BCrgen+M");
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.values("tag"), vec!["a", "b"]);
/// assert_eq!(params.get("name"), Some("Jürgen M"));
/// assert_eq!(params.get_as::<u32>("id").unwrap(), Some(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, Vec<String>>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string
    pub fn parse_query(query: &str) -> Self {
        let mut params = Self::new();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(decode_component(name), decode_component(value));
        }
        params
    }

    /// Append a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// First value of the named parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of the named parameter, in insertion order
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.entries
            .get(name)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// First value parsed as `T`
    pub fn get_as<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                WervalError::bad_request(format!("Unable to bind parameter '{name}' from '{raw}'"))
            }),
            None => Ok(None),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Parameter names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Immutable snapshot of an incoming HTTP request
///
/// Built by the transport layer, enriched once with the path parameters bound
/// by the router, then shared read-only by every filter and the controller.
#[derive(Debug, Clone)]
pub struct Request {
    identity: String,
    remote_address: Option<IpAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Parameters,
    path_parameters: Parameters,
    body: Bytes,
}

impl Request {
    /// Start building a request
    pub fn builder(method: Method, uri: Uri) -> RequestBuilder {
        RequestBuilder::new(method, uri)
    }

    /// Unique identity of this request, used for log correlation
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn remote_address(&self) -> Option<IpAddr> {
        self.remote_address
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// Parsed query string parameters
    pub fn query(&self) -> &Parameters {
        &self.query
    }

    /// Parameters bound from the matched route path
    pub fn path_parameters(&self) -> &Parameters {
        &self.path_parameters
    }

    /// Parameter lookup, path parameters first then query string
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .get(name)
            .or_else(|| self.query.get(name))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Single header value, if present and valid UTF-8
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|value| value.to_str().ok())
    }

    /// All values of a header, skipping non UTF-8 ones
    pub fn header_values(&self, name: impl AsRef<str>) -> Vec<&str> {
        self.headers
            .get_all(name.as_ref())
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    pub fn has_header(&self, name: impl AsRef<str>) -> bool {
        self.headers.contains_key(name.as_ref())
    }

    /// Raw `Content-Type` header
    pub fn content_type(&self) -> Option<&str> {
        self.header(http::header::CONTENT_TYPE)
    }

    /// MIME type of the `Content-Type` header, without parameters, lowercased
    pub fn mime_type(&self) -> Option<String> {
        self.content_type()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().to_lowercase())
            .filter(|mime| !mime.is_empty())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Copy of this request carrying the parameters bound by the router
    pub fn with_path_parameters(mut self, parameters: Parameters) -> Self {
        self.path_parameters = parameters;
        self
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    identity: Option<String>,
    remote_address: Option<IpAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestBuilder {
    fn new(method: Method, uri: Uri) -> Self {
        Self {
            identity: None,
            remote_address: None,
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Use a given identity instead of a generated one
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn remote_address(mut self, address: IpAddr) -> Self {
        self.remote_address = Some(address);
        self
    }

    /// Append a header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Replace all headers
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request {
        let query = self
            .uri
            .query()
            .map(Parameters::parse_query)
            .unwrap_or_default();
        Request {
            identity: self
                .identity
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            remote_address: self.remote_address,
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            query,
            path_parameters: Parameters::new(),
            body: self.body,
        }
    }
}
