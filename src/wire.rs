//! Plain HTTP/1.1 `GET` exchange over a tokio socket.
//!
//! Every byte read from the peer is counted, so a close or reset can be
//! classified by whether any part of a response was observed.

use std::{io, time::Duration};

use reqwest::Url;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

use crate::{FaultKind, RequestOutcome};

const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_HEADERS: usize = 64;
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const READ_CHUNK: usize = 8 * 1024;

/// Fetches `url` with a single `GET`, bounded by `limit`.
pub(crate) async fn fetch(url: &Url, limit: Duration) -> RequestOutcome {
    match timeout(limit, exchange(url)).await {
        Ok(Ok((status, body))) => RequestOutcome::success(status, body),
        Ok(Err(fault)) => RequestOutcome::fault(fault.kind, fault.detail),
        Err(_) => RequestOutcome::fault(
            FaultKind::Other,
            format!("request timed out after {} ms", limit.as_millis()),
        ),
    }
}

#[derive(Debug)]
struct WireFault {
    kind: FaultKind,
    detail: String,
}

impl WireFault {
    fn new(kind: FaultKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Head,
    Body,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

async fn exchange(url: &Url) -> Result<(u16, Vec<u8>), WireFault> {
    let host = url
        .host_str()
        .ok_or_else(|| WireFault::new(FaultKind::Other, format!("url '{url}' has no host")))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let connect_host = host.trim_start_matches('[').trim_end_matches(']');

    let stream = TcpStream::connect((connect_host, port))
        .await
        .map_err(|err| {
            WireFault::new(
                FaultKind::Other,
                format!("connect to {host}:{port} failed: {err}"),
            )
        })?;

    let mut conn = Connection {
        stream,
        buf: Vec::new(),
        received: 0,
    };
    conn.write_request(url, host).await?;

    let (status, framing) = conn.read_head().await?;
    let body = conn.read_body(framing).await?;
    Ok((status, body))
}

struct Connection {
    stream: TcpStream,
    buf: Vec<u8>,
    received: usize,
}

impl Connection {
    async fn write_request(&mut self, url: &Url, host: &str) -> Result<(), WireFault> {
        let mut target = url.path().to_owned();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        let request = format!(
            "GET {target} HTTP/1.1\r\n\
             Host: {host_header}\r\n\
             Accept: application/json\r\n\
             Connection: close\r\n\r\n"
        );

        self.stream
            .write_all(request.as_bytes())
            .await
            .map_err(|err| self.io_fault(Phase::Head, &err))
    }

    async fn read_head(&mut self) -> Result<(u16, Framing), WireFault> {
        loop {
            if let Some((len, status, framing)) = parse_head(&self.buf, self.received)? {
                self.buf.drain(..len);
                // Interim 1xx responses precede the real one.
                if (100..200).contains(&status) && status != 101 {
                    continue;
                }
                return Ok((status, framing));
            }
            if self.buf.len() > MAX_HEAD_BYTES {
                return Err(WireFault::new(
                    FaultKind::RandomDataThenClose,
                    format!("response head exceeds {MAX_HEAD_BYTES} bytes"),
                ));
            }
            self.fill(Phase::Head).await?;
        }
    }

    async fn read_body(&mut self, framing: Framing) -> Result<Vec<u8>, WireFault> {
        match framing {
            Framing::Empty => Ok(Vec::new()),
            Framing::Length(len) => {
                if len > MAX_BODY_BYTES {
                    return Err(body_too_large());
                }
                while self.buf.len() < len {
                    self.fill(Phase::Body).await?;
                }
                Ok(self.buf.drain(..len).collect())
            }
            Framing::UntilClose => {
                while self.read_more(Phase::Body).await? > 0 {
                    if self.buf.len() > MAX_BODY_BYTES {
                        return Err(body_too_large());
                    }
                }
                Ok(std::mem::take(&mut self.buf))
            }
            Framing::Chunked => self.read_chunked().await,
        }
    }

    async fn read_chunked(&mut self) -> Result<Vec<u8>, WireFault> {
        let mut body = Vec::new();
        loop {
            let (consumed, size) = loop {
                match httparse::parse_chunk_size(&self.buf) {
                    Ok(httparse::Status::Complete(parsed)) => break parsed,
                    Ok(httparse::Status::Partial) => self.fill(Phase::Body).await?,
                    Err(_) => {
                        return Err(WireFault::new(
                            FaultKind::MalformedChunk,
                            format!("invalid chunk size line after {} bytes", self.received),
                        ))
                    }
                }
            };
            self.buf.drain(..consumed);

            let size = usize::try_from(size)
                .ok()
                .filter(|size| body.len().saturating_add(*size) <= MAX_BODY_BYTES)
                .ok_or_else(body_too_large)?;
            if size == 0 {
                return Ok(body);
            }

            while self.buf.len() < size + 2 {
                self.fill(Phase::Body).await?;
            }
            if &self.buf[size..size + 2] != b"\r\n" {
                return Err(WireFault::new(
                    FaultKind::MalformedChunk,
                    format!("chunk of {size} bytes is not terminated by CRLF"),
                ));
            }
            body.extend_from_slice(&self.buf[..size]);
            self.buf.drain(..size + 2);
        }
    }

    /// Reads more bytes, failing on EOF.
    async fn fill(&mut self, phase: Phase) -> Result<(), WireFault> {
        if self.read_more(phase).await? == 0 {
            return Err(self.closed(phase));
        }
        Ok(())
    }

    /// Reads more bytes; `Ok(0)` is EOF.
    async fn read_more(&mut self, phase: Phase) -> Result<usize, WireFault> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk).await {
            Ok(n) => {
                self.received += n;
                self.buf.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(err) => Err(self.io_fault(phase, &err)),
        }
    }

    fn closed(&self, phase: Phase) -> WireFault {
        match (phase, self.received) {
            (Phase::Head, 0) => WireFault::new(
                FaultKind::EmptyResponse,
                "connection closed before any response byte",
            ),
            (Phase::Head, received) => WireFault::new(
                FaultKind::RandomDataThenClose,
                format!("connection closed after {received} bytes of an incomplete response head"),
            ),
            (Phase::Body, received) => WireFault::new(
                FaultKind::MalformedChunk,
                format!("connection closed mid-body after {received} bytes"),
            ),
        }
    }

    fn io_fault(&self, phase: Phase, err: &io::Error) -> WireFault {
        let kind = classify_io(phase, self.received, err.kind());
        WireFault::new(
            kind,
            format!("{err} (after {} response bytes)", self.received),
        )
    }
}

fn classify_io(phase: Phase, received: usize, kind: io::ErrorKind) -> FaultKind {
    let reset = matches!(
        kind,
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe
    );
    match (phase, received) {
        _ if kind == io::ErrorKind::TimedOut => FaultKind::Other,
        (Phase::Head, 0) if reset => FaultKind::ConnectionReset,
        (Phase::Head, 0) => FaultKind::Other,
        (Phase::Head, _) => FaultKind::RandomDataThenClose,
        (Phase::Body, _) => FaultKind::MalformedChunk,
    }
}

/// Parses a complete response head, returning its length, status and body
/// framing. `Ok(None)` means more bytes are needed.
fn parse_head(buf: &[u8], received: usize) -> Result<Option<(usize, u16, Framing)>, WireFault> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    let len = match response.parse(buf) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(err) => {
            return Err(WireFault::new(
                FaultKind::RandomDataThenClose,
                format!("invalid response head after {received} bytes: {err}"),
            ))
        }
    };
    let status = response.code.unwrap_or_default();

    if (100..200).contains(&status) || status == 204 || status == 304 {
        return Ok(Some((len, status, Framing::Empty)));
    }

    let mut content_length = None;
    for header in response.headers.iter() {
        let value = String::from_utf8_lossy(header.value);
        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            if value
                .rsplit(',')
                .next()
                .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
            {
                return Ok(Some((len, status, Framing::Chunked)));
            }
        } else if header.name.eq_ignore_ascii_case("content-length") {
            let parsed = value.trim().parse::<usize>().map_err(|_| {
                WireFault::new(
                    FaultKind::RandomDataThenClose,
                    format!("invalid content-length '{value}'"),
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let framing = match content_length {
        Some(0) => Framing::Empty,
        Some(len) => Framing::Length(len),
        None => Framing::UntilClose,
    };
    Ok(Some((len, status, framing)))
}

fn body_too_large() -> WireFault {
    WireFault::new(
        FaultKind::Other,
        format!("response body exceeds {MAX_BODY_BYTES} bytes"),
    )
}
