use crate::http::{parse_request, Request, Response};
use crate::{errors, threadpool::ThreadPool};
use std::io::{BufReader, Write};
use std::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

/// Turn an HTTP status code into its reason phrase
pub fn code_to_string(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// This is the main server.
///
/// It listens for incomming connections on a TCP socket, parses the requests and dispatches them
/// to a handler. Whatever the handler produces is then converted in an HTTP response and sent
/// back to the client.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Create a new server listening on the given address
    pub fn new(addr: &str) -> errors::Result<Self> {
        Ok(HttpServer {
            listener: TcpListener::bind(addr)?,
        })
    }

    /// Address the server actually listens on, useful when binding port 0
    pub fn local_addr(&self) -> errors::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the server
    ///
    /// Calls the handler with the incoming requests on a pool of `workers` threads.
    ///
    /// This function is blocking, with no real way of stopping it (except the socket being
    /// forcefully closed by the OS or the program being killed)
    pub fn serve<F>(&self, workers: usize, handler: F)
    where
        F: Fn(Request) -> Response + Send + Sync + 'static + Clone,
    {
        let threadpool = ThreadPool::new(workers);
        for stream in self.listener.incoming() {
            match stream {
                Ok(mut stream) => {
                    let handler = handler.clone();
                    threadpool.execute(move || handle_stream(&mut stream, &handler))
                }
                Err(err) => warn!(error = %err, "Failed to accept connection"),
            }
        }
    }

    /// Utility function for one-shot servers.
    ///
    /// This is mostly for testing, it listens to a single connection, processes the
    /// request and exit.
    pub fn serve_once<F>(&self, handler: F)
    where
        F: Fn(Request) -> Response,
    {
        match self.listener.incoming().next() {
            Some(Ok(mut stream)) => handle_stream(&mut stream, &handler),
            Some(Err(err)) => warn!(error = %err, "Failed to accept connection"),
            None => (),
        }
    }
}

/// Parse an HTTP request from a TCP stream, calls the handler and write back the answer
fn handle_stream<F>(mut stream: &mut TcpStream, handler: F)
where
    F: Fn(Request) -> Response,
{
    let buf_reader = BufReader::new(&mut stream);
    match parse_request(buf_reader) {
        Ok(req) => {
            debug!(method = %req.method, path = %req.path, "Handling request");
            respond(&mut stream, handler(req))
        }
        Err(err) => {
            debug!(error = %err, "Rejecting malformed request");
            respond(&mut stream, Response::error(400, "Malformed request"))
        }
    }
}

/// Writes an HTTP response to a stream
fn respond(stream: &mut TcpStream, resp: Response) {
    let code = resp.status.unwrap_or(500);
    let status = stream.write_all(
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n{}\r\n{}",
            code,
            code_to_string(code),
            resp.body.len(),
            resp.headers
                .iter()
                .map(|(k, v)| format!["{}: {}\r\n", k, v])
                .collect::<Vec<_>>()
                .join(""),
            resp.body
        )
        .as_bytes(),
    );

    if let Err(err) = status {
        error!(error = %err, "Failed to respond");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_code_to_string() {
        assert_eq!(code_to_string(401), "Unauthorized");
        assert_eq!(code_to_string(201), "Created");
        assert_eq!(code_to_string(418), "Unknown");
    }
}
