use crate::errors;
use crate::http::{parse_response, Headers, Response};
use std::io::{BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;
use tracing::trace;

/// Time after which a silent server is considered gone
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Simple HTTP client
///
/// It sends HTTP requests from a set of parameters, then parses and yields the server response.
pub struct HttpClient {
    stream: TcpStream,
    host: String,
}

impl HttpClient {
    /// Create a new client connected to the given server.
    ///
    /// An error is returned if the connection cannot be made for whatever reason
    pub fn new(server: &str) -> errors::Result<Self> {
        let stream = TcpStream::connect(server)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        Ok(HttpClient {
            stream,
            host: server.to_string(),
        })
    }

    /// Send an HTTP request on the open connection.
    ///
    /// Connection keep-alive is not implemented server side, so drop the object after the
    /// response is retrieved.
    pub fn send(
        &mut self,
        method: &str,
        endpoint: &str,
        headers: &Headers,
        body: &str,
    ) -> errors::Result<Response> {
        trace!(method, endpoint, body_len = body.len(), "Sending request");
        let extra = headers
            .iter()
            .map(|(k, v)| format!("{}: {}\r\n", k, v))
            .collect::<String>();

        self.stream.write_all(
            format! {
                "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n{}Content-Length: {}\r\n\r\n{}",
                method, endpoint, self.host, extra, body.len(), body
            }
            .as_bytes(),
        )?;

        let buf_reader = BufReader::new(&mut self.stream);
        parse_response(buf_reader)
    }
}
