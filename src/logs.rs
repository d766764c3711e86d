//! Streaming reader for plan and apply logs.
//!
//! Logs are served from an archivist URL outside the API. The reader polls
//! that URL from its current offset, strips the STX/ETX framing the service
//! wraps the output in, and stops once the ETX marker arrives or the owning
//! plan/apply reports that it has finished.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use url::Url;

use crate::client::TfeClient;
use crate::error::Result;

/// Start-of-text marker preceding the log output.
pub const STX: u8 = 0x02;

/// End-of-text marker following the log output.
pub const ETX: u8 = 0x03;

/// Number of bytes requested per poll.
const CHUNK_SIZE: usize = 64 * 1024;

const BACKOFF_INITIAL: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(3);

/// Boxed future returned by a completion predicate.
pub type DoneFuture = Pin<Box<dyn Future<Output = Result<bool>> + Send>>;

/// Asked after an empty poll whether any more output can appear.
pub type DoneFn = Box<dyn FnMut() -> DoneFuture + Send>;

/// Incremental reader over a remote log.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: tfeapi::TfeClient) -> tfeapi::Result<()> {
/// let mut logs = client.plans().logs("plan-abc123").await?;
/// while let Some(chunk) = logs.next_chunk().await? {
///     print!("{chunk}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct LogReader {
    client: TfeClient,
    url: Url,
    offset: u64,
    done: DoneFn,
    backoff: Duration,
    finished: bool,
    /// Trailing bytes of a character split across polls.
    pending: Vec<u8>,
}

impl std::fmt::Debug for LogReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReader")
            .field("url", &self.url.as_str())
            .field("offset", &self.offset)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl LogReader {
    /// Create a reader polling `url` from the start of the log.
    ///
    /// `done` is consulted only after a poll returns no data; once it yields
    /// `true` the reader finishes.
    pub fn new<F, Fut>(client: TfeClient, url: Url, mut done: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Self {
            client,
            url,
            offset: 0,
            done: Box::new(move || Box::pin(done())),
            backoff: BACKOFF_INITIAL,
            finished: false,
            pending: Vec::new(),
        }
    }

    /// Resume reading from byte `offset` of the raw log.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Bytes of the raw log consumed so far, framing included.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the end of the log has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next piece of log output.
    ///
    /// Returns `None` once the log is complete.
    pub async fn next_chunk(&mut self) -> Result<Option<String>> {
        loop {
            if self.finished {
                return Ok(None);
            }

            let raw = self.poll().await?;

            if raw.is_empty() {
                if (self.done)().await? {
                    tracing::debug!(offset = self.offset, "log complete");
                    self.finished = true;
                    let rest = self.flush();
                    return Ok((!rest.is_empty()).then_some(rest));
                }
                let delay = self.backoff;
                self.backoff = (self.backoff * 2).min(BACKOFF_MAX);
                self.client.sleep(delay).await?;
                continue;
            }

            self.backoff = BACKOFF_INITIAL;
            let text = self.consume(&raw);
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }
    }

    /// Read the remainder of the log into one string.
    pub async fn read_to_string(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.push_str(&chunk);
        }
        Ok(out)
    }

    async fn poll(&self) -> Result<Vec<u8>> {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("limit", &CHUNK_SIZE.to_string())
            .append_pair("offset", &self.offset.to_string());

        let response = self.client.fetch_url(&url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Advance past `raw` and return its printable part.
    fn consume(&mut self, raw: &[u8]) -> String {
        let mut body = raw;
        if self.offset == 0 && body.first() == Some(&STX) {
            body = &body[1..];
        }
        self.offset += raw.len() as u64;

        let end = body.iter().position(|b| *b == ETX);
        if let Some(end) = end {
            body = &body[..end];
        }

        self.pending.extend_from_slice(body);
        if end.is_some() {
            self.finished = true;
            return self.flush();
        }
        self.decode()
    }

    /// Decode the buffered bytes, holding back an incomplete trailing character.
    fn decode(&mut self) -> String {
        let keep = match std::str::from_utf8(&self.pending) {
            Ok(_) => 0,
            Err(e) if e.error_len().is_none() => self.pending.len() - e.valid_up_to(),
            Err(_) => 0,
        };
        let tail = self.pending.split_off(self.pending.len() - keep);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    /// Decode everything buffered, replacing any incomplete character.
    fn flush(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reader(server: &MockServer, done: bool) -> LogReader {
        let client = TfeClient::new(Config {
            address: server.uri(),
            token: "t".to_string(),
            ..Default::default()
        })
        .unwrap();
        let url = Url::parse(&format!("{}/logs/abc", server.uri())).unwrap();
        LogReader::new(client, url, move || async move { Ok(done) })
    }

    #[tokio::test]
    async fn test_reads_framed_log_in_one_poll() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02Plan: 1 to add\n\x03".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let mut logs = reader(&server, false);
        assert_eq!(logs.read_to_string().await.unwrap(), "Plan: 1 to add\n");
        assert!(logs.is_finished());
        assert_eq!(logs.offset(), 17);
        assert_eq!(logs.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_continues_from_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02first ".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"second\x03".to_vec()))
            .mount(&server)
            .await;

        let mut logs = reader(&server, false);
        assert_eq!(logs.next_chunk().await.unwrap().as_deref(), Some("first "));
        assert_eq!(logs.next_chunk().await.unwrap().as_deref(), Some("second"));
        assert_eq!(logs.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_character_split_across_polls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02caf\xC3".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xA9\x03".to_vec()))
            .mount(&server)
            .await;

        let mut logs = reader(&server, false);
        assert_eq!(logs.next_chunk().await.unwrap().as_deref(), Some("caf"));
        assert_eq!(logs.next_chunk().await.unwrap().as_deref(), Some("\u{e9}"));
        assert_eq!(logs.next_chunk().await.unwrap(), None);
        assert_eq!(logs.offset(), 7);
    }

    #[tokio::test]
    async fn test_split_character_reads_whole() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02caf\xC3".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xA9\x03".to_vec()))
            .mount(&server)
            .await;

        let mut logs = reader(&server, false);
        assert_eq!(logs.read_to_string().await.unwrap(), "caf\u{e9}");
    }

    #[tokio::test]
    async fn test_truncated_character_at_end_is_replaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02ok\xC3".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut logs = reader(&server, true);
        assert_eq!(logs.read_to_string().await.unwrap(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_log_polls_are_unauthenticated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x02done\x03".to_vec()))
            .mount(&server)
            .await;

        let mut logs = reader(&server, false);
        logs.read_to_string().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
        assert_eq!(requests[0].headers["accept"], "text/plain");
        assert!(requests[0].headers.contains_key("user-agent"));
    }

    #[tokio::test]
    async fn test_empty_poll_finishes_when_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut logs = reader(&server, true);
        assert_eq!(logs.read_to_string().await.unwrap(), "");
        assert!(logs.is_finished());
    }

    #[tokio::test]
    async fn test_empty_poll_waits_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = TfeClient::new(Config {
            address: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let url = Url::parse(&format!("{}/logs/abc", server.uri())).unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut logs = LogReader::new(client, url, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n >= 1) }
        });

        assert_eq!(logs.next_chunk().await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
