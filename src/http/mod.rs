use crate::errors::{Error, Result};
use std::io::{BufReader, Read};

pub mod server;
pub use server::*;

pub mod request;
pub use request::*;

pub mod response;
pub use response::*;

pub mod client;
pub use client::*;

/// Headers as they travel on the wire, in order
pub type Headers = Vec<(String, String)>;

/// Case-insensitive header lookup
pub fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn collect_headers(headers: &[httparse::Header]) -> Headers {
    headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect()
}

/// Read one HTTP message (request or response) from a byte stream.
///
/// `parse_head` is given everything read so far and returns the length of the head and the
/// parsed head once it is complete, or None while more bytes are needed. The body is then
/// read according to its Content-Length header (no header means no body).
fn read_message<T, H, F>(mut buf_reader: BufReader<T>, mut parse_head: F) -> Result<(H, String)>
where
    T: Sized + Read,
    F: FnMut(&[u8]) -> Result<Option<(usize, H, usize)>>,
{
    let mut chunk = [0; 4096];
    let mut buf: Vec<u8> = Vec::new();

    let (head_len, head, body_len) = loop {
        let bytes_read = buf_reader.read(&mut chunk)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        buf.extend_from_slice(&chunk[..bytes_read]);

        if let Some(parsed) = parse_head(&buf)? {
            break parsed;
        }
    };

    // Anything past the declared body belongs to a pipelined message, which we don't support
    while buf.len() - head_len < body_len {
        let bytes_read = buf_reader.read(&mut chunk)?;
        if bytes_read == 0 {
            return Err(Error::ConnectionReset);
        }
        buf.extend_from_slice(&chunk[..bytes_read]);
    }

    let body = String::from_utf8_lossy(&buf[head_len..head_len + body_len]).to_string();
    Ok((head, body))
}

fn content_length(headers: &[httparse::Header]) -> usize {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("Content-Length"))
        .and_then(|length| String::from_utf8_lossy(length.value).trim().parse::<usize>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_simple_http_exchange() {
        // Binds a fixed local port; may fail if something else is listening on it
        static ADDR: &str = "127.0.0.1:18422";

        let handle = std::thread::spawn(|| {
            let server = HttpServer::new(ADDR);
            match server {
                Ok(s) => s.serve_once(|request| {
                    let auth = request.header("Authorization").unwrap_or("").to_string();
                    Response::ok_with_body(format!("{}|{}", auth, request.body))
                }),
                Err(err) => eprintln!("Failed to spawn server: {}", err),
            }
        });

        let mut client = (|| {
            for _ in 1..10 {
                match HttpClient::new(ADDR) {
                    Ok(c) => return Some(c),
                    Err(err) => {
                        eprintln!("Trying to connect to {}: {}", ADDR, err);
                        std::thread::sleep(std::time::Duration::from_millis(10));
                    }
                }
            }
            None
        })()
        .expect("Failed to connect client");

        let headers = vec![("Authorization".to_string(), "Bearer t0k3n".to_string())];
        let resp = client
            .send("POST", "/api/cart/add", &headers, "{\"quantity\": 2}")
            .expect("Failed to communicate with server");

        assert_eq!(resp.status, Some(200));
        assert_eq!(resp.body, "Bearer t0k3n|{\"quantity\": 2}");

        handle.join().unwrap();
    }

    #[test]
    fn test_find_header_ignores_case() {
        let headers = vec![("content-type".to_string(), "application/json".to_string())];
        assert_eq!(find_header(&headers, "Content-Type"), Some("application/json"));
        assert_eq!(find_header(&headers, "Authorization"), None);
    }
}
