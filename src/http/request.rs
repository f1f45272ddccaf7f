use crate::errors::Result;
use crate::http::{collect_headers, content_length, find_header, read_message, Headers};
use std::io::{BufReader, Read};

/// Represents an HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method used in the request
    pub method: String,
    /// The full path of the request, query string included
    pub path: String,
    /// Headers of the request
    pub headers: Headers,
    /// Body of the request
    pub body: String,
}

impl Request {
    /// Create a new request from scratch
    pub fn new(method: &str, path: &str, headers: Headers, body: String) -> Request {
        Request {
            method: method.to_string(),
            path: path.to_string(),
            headers,
            body,
        }
    }
    /// Create a new GET request for the given path, with an empty body
    pub fn get(path: &str) -> Request {
        Request::new("GET", path, vec![], String::new())
    }
    /// Create a new POST request for the given path, with the given body
    pub fn post(path: &str, body: String) -> Request {
        Request::new("POST", path, vec![], body)
    }
    /// Create a new PUT request for the given path, with the given body
    pub fn put(path: &str, body: String) -> Request {
        Request::new("PUT", path, vec![], body)
    }
    /// Create a new DELETE request for the given path, with the given body
    pub fn delete(path: &str, body: String) -> Request {
        Request::new("DELETE", path, vec![], body)
    }

    /// Add a header, builder style
    pub fn with_header(mut self, name: &str, value: &str) -> Request {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Token of an `Authorization: Bearer <token>` header
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("Authorization")
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// The path without its query string
    pub fn route_path(&self) -> &str {
        self.path.split('?').next().unwrap_or("/")
    }

    /// Value of a query string parameter. No percent-decoding is done.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        let (_, query) = self.path.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

/// Parse an HTTP request from a byte stream
pub fn parse_request<T>(buf_reader: BufReader<T>) -> Result<Request>
where
    T: Sized + Read,
{
    let (mut request, body) = read_message(buf_reader, |buf| {
        let mut headers = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut headers);

        match req.parse(buf)? {
            httparse::Status::Complete(head_len) => {
                let body_len = content_length(&*req.headers);
                let request = Request {
                    method: req.method.unwrap_or("GET").to_string(),
                    path: req.path.unwrap_or("/").to_string(),
                    headers: collect_headers(&*req.headers),
                    body: String::new(),
                };
                Ok(Some((head_len, request, body_len)))
            }
            httparse::Status::Partial => Ok(None),
        }
    })?;

    request.body = body;
    Ok(request)
}
