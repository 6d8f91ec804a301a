//! Network seams of the pipeline and their `reqwest::blocking` implementations.

use std::io::{self, BufRead, BufReader, Lines, Read};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::debug;

use crate::error::TransportError;
use crate::sse::{SseDecoder, SseEvent};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// "Perform a GET, return status and body."
pub trait HttpGet {
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpGet + ?Sized> HttpGet for Arc<T> {
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url, accept)
    }
}

pub type EventStream = Box<dyn Iterator<Item = Result<SseEvent, TransportError>> + Send>;

/// "Connect, then yield text events." One call is one connection; the
/// returned iterator ends (or yields an error) when that connection is over.
pub trait EventSource {
    fn connect(&self) -> Result<EventStream, TransportError>;
}

impl<T: EventSource + ?Sized> EventSource for Arc<T> {
    fn connect(&self) -> Result<EventStream, TransportError> {
        (**self).connect()
    }
}

/// Client for item JSON and item pages.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpGet for HttpClient {
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError> {
        let resp = self.client.get(url).header(ACCEPT, accept).send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(HttpResponse { status, body })
    }
}

/// Event-stream client for a single fixed URL.
///
/// The read timeout is the blocking client's timeout, which bounds waiting
/// for the response head and every read of the body. A silent connection
/// therefore surfaces as [`TransportError::ReadTimeout`] on the reading
/// thread, and dropping the stream closes the socket.
pub struct SseClient {
    client: Client,
    url: String,
    read_timeout: Option<Duration>,
}

impl SseClient {
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            read_timeout,
        })
    }
}

impl EventSource for SseClient {
    fn connect(&self) -> Result<EventStream, TransportError> {
        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()?;

        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }

        Ok(Box::new(BodyStream {
            lines: BufReader::new(resp).lines(),
            decoder: SseDecoder::new(),
            read_timeout: self.read_timeout,
            url: self.url.clone(),
            done: false,
        }))
    }
}

struct BodyStream<R> {
    lines: Lines<BufReader<R>>,
    decoder: SseDecoder,
    read_timeout: Option<Duration>,
    url: String,
    done: bool,
}

impl<R: Read> Iterator for BodyStream<R> {
    type Item = Result<SseEvent, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(event) = self.decoder.push_line(&line) {
                        return Some(Ok(event));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(match self.read_timeout {
                        Some(timeout) if is_timeout(&e) => TransportError::ReadTimeout(timeout),
                        _ => TransportError::Io(e),
                    }));
                }
                None => {
                    self.done = true;
                    debug!(url = %self.url, "event stream reached end of body");
                    return None;
                }
            }
        }
    }
}

// reqwest reports an expired body read as an io error wrapping its own
// timeout error.
fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        || err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout)
}
