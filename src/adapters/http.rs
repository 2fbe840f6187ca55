//! HTTP adapters for the sound fetcher (host builds).
//!
//! - [`HttpBackend`] implements [`BackendPort`]: `invoke(method, key, value)`
//!   POSTs `{"key": "value"}` as JSON to `<base>/<method>` and keeps the
//!   top-level fields of the JSON reply for [`read_field`](BackendPort::read_field).
//! - [`HttpRangeClient`] implements [`RangeClientPort`] with `Range:` GETs
//!   against the file host.
//!
//! Both use a blocking `ureq` agent that does not treat 4xx/5xx as
//! transport errors, so status codes reach the port as typed errors.
//! `connect` on either adapter sends a `HEAD` to the server root: any HTTP
//! answer, whatever its status, counts as reachable.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde_json::{Map, Value};
use ureq::Agent;

use crate::app::ports::{BackendPort, NetError, RangeClientPort};
use crate::fetch::pieces::ByteRange;

fn agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// `true` when the server behind `url` answers HTTP at all.
fn reachable(agent: &Agent, url: &str) -> bool {
    match agent.head(url).call() {
        Ok(response) => {
            debug!("{url} reachable ({})", response.status());
            true
        }
        Err(e) => {
            warn!("{url} unreachable: {e}");
            false
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Backend
// ───────────────────────────────────────────────────────────────

pub struct HttpBackend {
    base_url: String,
    agent: Agent,
    reply: Map<String, Value>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("backend URL must be http(s): {base_url}");
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent: agent(timeout),
            reply: Map::new(),
        })
    }

    fn call(&self, method: &str, key: &str, value: &str) -> Result<Map<String, Value>> {
        let url = format!("{}/{}", self.base_url, method);
        let mut body = Map::new();
        body.insert(key.to_owned(), Value::String(value.to_owned()));
        let body = Value::Object(body).to_string();

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body)
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} answered {status}");
        }
        let text = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("reading reply from {url}"))?;
        parse_fields(&text).with_context(|| format!("{url} did not return a JSON object"))
    }
}

/// Top-level fields of a JSON object reply.
fn parse_fields(text: &str) -> Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| anyhow::anyhow!("invalid JSON: {e}"))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("reply is not an object"),
    }
}

impl BackendPort for HttpBackend {
    /// Forget the previous reply and check the backend answers.
    fn connect(&mut self) -> bool {
        self.reply.clear();
        reachable(&self.agent, &self.base_url)
    }

    fn invoke(&mut self, method: &str, key: &str, value: &str) -> bool {
        match self.call(method, key, value) {
            Ok(reply) => {
                debug!("HttpBackend: {method} returned {} fields", reply.len());
                self.reply = reply;
                true
            }
            Err(e) => {
                warn!("HttpBackend: {method} failed: {e:#}");
                self.reply.clear();
                false
            }
        }
    }

    fn read_field(&self, key: &str) -> Option<String> {
        match self.reply.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Range client
// ───────────────────────────────────────────────────────────────

pub struct HttpRangeClient {
    agent: Agent,
    scheme: &'static str,
    host: Option<String>,
}

impl HttpRangeClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: agent(timeout),
            scheme: "http",
            host: None,
        }
    }

    /// Talk to file hosts over TLS.
    pub fn https(mut self) -> Self {
        self.scheme = "https";
        self
    }

    fn url(&self, host: &str, path: &str) -> String {
        request_url(self.scheme, host, path)
    }

    fn total_from_range_probe(&self, url: &str) -> Option<u64> {
        let response = self
            .agent
            .get(url)
            .header("Range", "bytes=0-0")
            .call()
            .ok()?;
        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
    }
}

/// `path` may be an absolute URL (signed CDN links) or a path on `host`.
fn request_url(scheme: &str, host: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_owned()
    } else if path.starts_with('/') {
        format!("{scheme}://{host}{path}")
    } else {
        format!("{scheme}://{host}/{path}")
    }
}

/// Total length from `Content-Range: bytes 0-0/12345`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (unit, rest) = value.trim().split_once(' ')?;
    if unit != "bytes" {
        return None;
    }
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

impl RangeClientPort for HttpRangeClient {
    fn connect(&mut self, host: &str) -> bool {
        self.host = None;
        if host.is_empty() || !reachable(&self.agent, &self.url(host, "/")) {
            return false;
        }
        self.host = Some(host.to_owned());
        true
    }

    fn probe_length(&mut self, host: &str, path: &str) -> u64 {
        let url = self.url(host, path);
        let from_head = self.agent.head(&url).call().ok().and_then(|response| {
            if !response.status().is_success() {
                return None;
            }
            response
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        });
        match from_head.filter(|&len| len > 0) {
            Some(len) => len,
            None => self.total_from_range_probe(&url).unwrap_or(0),
        }
    }

    fn get_range(
        &mut self,
        host: &str,
        path: &str,
        range: ByteRange,
        buf: &mut [u8],
    ) -> Result<usize, NetError> {
        if self.host.as_deref() != Some(host) {
            return Err(NetError::NotConnected);
        }
        let len = range.len() as usize;
        if buf.len() < len {
            return Err(NetError::BufferTooSmall);
        }

        let url = self.url(host, path);
        let mut response = self
            .agent
            .get(&url)
            .header("Range", &range.header_value())
            .call()
            .map_err(|_| NetError::Io)?;

        let status = response.status().as_u16();
        // A plain 200 only carries the requested bytes when they start the file.
        let usable = status == 206 || (status == 200 && range.first == 0);
        if !usable {
            return Err(NetError::Status(status));
        }

        let mut reader = response.body_mut().as_reader();
        match reader.read_exact(&mut buf[..len]) {
            Ok(()) => Ok(len),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(NetError::ShortRead),
            Err(_) => Err(NetError::Io),
        }
    }
}
