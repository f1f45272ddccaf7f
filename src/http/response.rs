use std::io::{BufReader, Read};

use crate::api::{ApiResponse, ErrorBody};
use crate::errors::Result;
use crate::http::{collect_headers, content_length, find_header, read_message, Headers};
use serde::Serialize;

/// An HTTP response, either built by the server or parsed by the client
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code of the response. Optional because that's what httparse returns, but it
    /// shouldn't happen in practice since we control the responses.
    pub status: Option<u16>,
    /// Headers for the response. It is not necessary to add Content-Length to it, this is done
    /// automatically on serialization.
    pub headers: Headers,
    /// Body of the response. Give an empty string for an empty body
    pub body: String,
}

impl Response {
    /// Creates an empty OK response (204)
    pub fn ok() -> Response {
        Response {
            status: Some(204),
            headers: vec![],
            body: "".to_string(),
        }
    }

    /// Creates an OK (200) response with the given body
    pub fn ok_with_body(str: String) -> Response {
        Response {
            status: Some(200),
            headers: vec![],
            body: str,
        }
    }

    /// Creates a JSON response wrapping `data` in the API envelope
    pub fn json<T: Serialize>(status: u16, data: T) -> Result<Response> {
        Ok(Response {
            status: Some(status),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(&ApiResponse::ok(data))?,
        })
    }

    /// Creates a JSON response for bodies that carry their own envelope
    pub fn raw_json<T: Serialize>(status: u16, body: &T) -> Result<Response> {
        Ok(Response {
            status: Some(status),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(body)?,
        })
    }

    /// Creates an error response with the given message in the API error body.
    ///
    /// The code must be in the 4xx or 5xx range.
    pub fn error(code: u16, message: &str) -> Response {
        assert!((400..600).contains(&code), "Invalid error code");
        let body = ErrorBody {
            success: false,
            message: message.to_string(),
        };
        Response {
            status: Some(code),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(&body).unwrap_or_default(),
        }
    }

    /// Creates an Internal Server Error (500) response.
    ///
    /// No detail is given to avoid leaking information about the server.
    pub fn internal_server_error() -> Response {
        Self::error(500, "Something went wrong")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }

    /// Message of an API error body, if the body is one
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .map(|body| body.message)
            .filter(|message| !message.is_empty())
    }
}

/// Parse an HTTP response from a byte stream
pub fn parse_response<T>(buf_reader: BufReader<T>) -> Result<Response>
where
    T: Sized + Read,
{
    let (mut response, body) = read_message(buf_reader, |buf| {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers);

        match resp.parse(buf)? {
            httparse::Status::Complete(head_len) => {
                let body_len = content_length(&*resp.headers);
                let response = Response {
                    status: resp.code,
                    headers: collect_headers(&*resp.headers),
                    body: String::new(),
                };
                Ok(Some((head_len, response, body_len)))
            }
            httparse::Status::Partial => Ok(None),
        }
    })?;

    response.body = body;
    Ok(response)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_parse_simple_response() {
        let req_str = b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n";
        let buf_reader = BufReader::new(&req_str[..]);

        let parsed = parse_response(buf_reader).unwrap();

        assert_eq!(parsed.status, Some(204));
        assert_eq!(parsed.headers.len(), 1);
        assert_eq!(parsed.body, "");
        assert!(parsed.is_success());
    }

    #[test]
    fn test_parse_response_with_body() {
        let body = "{\"success\":true,\"data\":[]}";
        let resp_str = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let parsed = parse_response(BufReader::new(resp_str.as_bytes())).unwrap();

        assert_eq!(parsed.status, Some(200));
        assert_eq!(parsed.body, body);
    }

    #[test]
    fn test_parse_response_with_large_body() {
        let mut rng = rand::thread_rng();
        let body: String = (0..40960).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();

        let resp_str = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );

        let parsed = parse_response(BufReader::new(resp_str.as_bytes())).unwrap();
        assert_eq!(parsed.body, body);
    }

    #[test]
    fn test_error_body_round_trips_message() {
        let response = Response::error(400, "Invalid coupon code");
        assert_eq!(response.status, Some(400));
        assert!(!response.is_success());
        assert_eq!(response.error_message().as_deref(), Some("Invalid coupon code"));

        assert_eq!(Response::ok_with_body("not json".to_string()).error_message(), None);
    }

    #[test]
    #[should_panic]
    fn test_error_rejects_success_code() {
        Response::error(200, "nope");
    }
}
