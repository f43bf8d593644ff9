//! Conversions between wire messages and Werval requests and outcomes

use std::convert::Infallible;
use std::io;
use std::net::IpAddr;

use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{CONTENT_LENGTH, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, LengthLimitError, Limited, StreamBody};
use hyper::body::{Frame, Incoming};
use werval_api::{Body, Outcome, Request};

/// Body of responses written by the server
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Read a wire request into a [`Request`], failing with the outcome to answer
/// when the body cannot be read or exceeds `max_body_size`
pub(crate) async fn read_request(
    request: hyper::Request<Incoming>,
    remote_address: IpAddr,
    max_body_size: usize,
) -> std::result::Result<Request, Outcome> {
    let (parts, body) = request.into_parts();

    let bytes = match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(Outcome::text(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("413 Payload Too Large: body exceeds {max_body_size} bytes\n"),
            ));
        }
        Err(err) => {
            return Err(Outcome::text(
                StatusCode::BAD_REQUEST,
                format!("400 Bad Request: {err}\n"),
            ));
        }
    };

    Ok(Request::builder(parts.method, parts.uri)
        .remote_address(remote_address)
        .headers(parts.headers)
        .body(bytes)
        .build())
}

/// Wire response of an outcome
///
/// Streamed bodies of known length get a `Content-Length` header unless the
/// outcome already sets one, and are sent chunked otherwise.
pub fn into_response(outcome: Outcome) -> Response<ResponseBody> {
    let (mut header, body) = outcome.into_parts();
    let status = header.status();
    let mut headers = std::mem::take(header.headers_mut());

    let body = match body {
        Body::Empty => Empty::new().map_err(infallible).boxed_unsync(),
        Body::Bytes(bytes) => Full::new(bytes).map_err(infallible).boxed_unsync(),
        Body::Stream { length, stream } => {
            if let Some(length) = length
                && !headers.contains_key(CONTENT_LENGTH)
            {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
            StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn infallible(never: Infallible) -> io::Error {
    match never {}
}
