use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use mail_parser::{HeaderName, MessageParser};
use native_tls::TlsConnector;
use tracing::{debug, warn};

use super::{EvaluationWindow, FetchError, MailboxFetcher, Message};
use crate::config::ImapConfig;

/// Mailbox reader backed by a blocking IMAP session. Each fetch opens a fresh
/// connection, reads the window as a snapshot, and logs out; the session never
/// deletes or flags anything.
pub struct ImapFetcher {
    config: ImapConfig,
}

impl ImapFetcher {
    pub fn new(config: ImapConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MailboxFetcher for ImapFetcher {
    async fn fetch(&self, window: &EvaluationWindow) -> Result<Vec<Message>, FetchError> {
        let config = self.config.clone();
        let window = window.clone();
        tokio::task::spawn_blocking(move || fetch_blocking(&config, &window))
            .await
            .map_err(|e| FetchError::Connection(format!("mailbox fetch task aborted: {e}")))?
    }
}

fn fetch_blocking(
    config: &ImapConfig,
    window: &EvaluationWindow,
) -> Result<Vec<Message>, FetchError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let tcp = connect_tcp(&config.host, config.port, timeout)?;

    if config.use_ssl {
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        let tls_stream = tls
            .connect(&config.host, tcp)
            .map_err(|e| FetchError::Connection(e.to_string()))?;
        let mut client = imap::Client::new(tls_stream);
        client.read_greeting().map_err(classify_imap_error)?;
        run_session(client, config, window)
    } else {
        let mut client = imap::Client::new(tcp);
        client.read_greeting().map_err(classify_imap_error)?;
        run_session(client, config, window)
    }
}

/// Resolves the host and connects to the first reachable address, applying
/// the configured timeout to the connect and to subsequent socket I/O.
fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, FetchError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| FetchError::Connection(format!("failed to resolve {host}: {e}")))?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream
                    .set_read_timeout(Some(timeout))
                    .and_then(|_| stream.set_write_timeout(Some(timeout)))
                    .map_err(|e| FetchError::Connection(e.to_string()))?;
                return Ok(stream);
            }
            Err(e) => {
                debug!(address = %addr, error = %e, "IMAP connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(FetchError::Connection(match last_error {
        Some(e) => format!("could not connect to {host}:{port}: {e}"),
        None => format!("{host} resolved to no addresses"),
    }))
}

fn run_session<S: Read + Write>(
    client: imap::Client<S>,
    config: &ImapConfig,
    window: &EvaluationWindow,
) -> Result<Vec<Message>, FetchError> {
    let mut session = client
        .login(&config.username, &config.password)
        .map_err(|(err, _client)| classify_imap_error(err))?;

    // EXAMINE keeps the mailbox read-only.
    session
        .examine(&config.mailbox)
        .map_err(classify_imap_error)?;

    // SEARCH SINCE has date granularity against the server's INTERNALDATE;
    // a day of slack covers server-local dates, the precise half-open window
    // filter happens below.
    let since = (window.start - chrono::Duration::days(1)).format("%d-%b-%Y");
    let ids = session
        .search(format!("SINCE {since}"))
        .map_err(classify_imap_error)?;

    if ids.is_empty() {
        if let Err(err) = session.logout() {
            debug!(error = %err, "IMAP logout failed");
        }
        return Ok(Vec::new());
    }

    let mut seqs: Vec<u32> = ids.into_iter().collect();
    seqs.sort_unstable();
    let seq_set = seqs
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let fetches = session
        .fetch(seq_set, "(INTERNALDATE RFC822)")
        .map_err(classify_imap_error)?;

    let parser = MessageParser::default();
    let mut messages = Vec::new();
    for fetch in fetches.iter() {
        let Some(received_at) = fetch.internal_date().map(|d| d.with_timezone(&Utc)) else {
            warn!(seq = fetch.message, "message without INTERNALDATE, skipping");
            continue;
        };
        if !window.contains(received_at) {
            continue;
        }
        let Some(raw) = fetch.body() else {
            warn!(seq = fetch.message, "message without RFC822 content, skipping");
            continue;
        };
        let Some(parsed) = parser.parse(raw) else {
            warn!(seq = fetch.message, "unparseable message, skipping");
            continue;
        };

        let subject = parsed
            .header(HeaderName::Subject)
            .and_then(|v| v.as_text())
            .unwrap_or("")
            .to_string();
        let body = parsed
            .body_text(0)
            .map(|text| text.into_owned())
            .unwrap_or_default();
        let from_address = parsed
            .header(HeaderName::From)
            .and_then(|v| v.as_address())
            .and_then(|v| v.as_list())
            .and_then(|v| v.first())
            .and_then(|v| v.address())
            .map(str::to_string);

        messages.push(Message {
            subject,
            received_at,
            body,
            from_address,
        });
    }

    if let Err(err) = session.logout() {
        debug!(error = %err, "IMAP logout failed");
    }

    messages.sort_by_key(|m| m.received_at);
    Ok(messages)
}

/// BAD/NO/unparseable responses mean the server misbehaved; everything else
/// is a transport-level failure.
fn classify_imap_error(err: imap::Error) -> FetchError {
    match &err {
        imap::Error::Bad(_) | imap::Error::No(_) | imap::Error::Parse(_) => {
            FetchError::Protocol(err.to_string())
        }
        _ => FetchError::Connection(err.to_string()),
    }
}
