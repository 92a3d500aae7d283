//! Shared HTTP client configuration and response streaming helpers.

use std::io::{self, Read, Write};
use std::sync::OnceLock;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(300);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request to the registry and Klass endpoints.
pub(crate) const USER_AGENT: &str = concat!("brreg-dataset/", env!("CARGO_PKG_VERSION"));

/// Return a shared HTTP agent with consistent timeouts.
///
/// The read timeout is generous because the registry bulk download is a
/// single long-running response.
pub(crate) fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .build()
    })
}

/// Stream a response body to the provided writer, returning the byte count.
pub(crate) fn copy_response_to_writer(
    response: ureq::Response,
    writer: &mut impl Write,
) -> Result<u64, io::Error> {
    let mut reader = response.into_reader();
    let mut total = 0u64;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        total += read as u64;
        writer.write_all(&buf[..read])?;
    }
    Ok(total)
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::serve_once;

    #[test]
    fn copy_response_streams_full_body() {
        let body = "x".repeat(200_000);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let url = serve_once(response);
        let response = agent().get(&url).call().unwrap();
        let mut out = Vec::new();
        let written = copy_response_to_writer(response, &mut out).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(out, body.as_bytes());
    }

    #[test]
    fn copy_response_handles_empty_body() {
        let response = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n".to_string();
        let url = serve_once(response);
        let response = agent().get(&url).call().unwrap();
        let mut out = Vec::new();
        let written = copy_response_to_writer(response, &mut out).unwrap();
        assert_eq!(written, 0);
        assert!(out.is_empty());
    }
}
