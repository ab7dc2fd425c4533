//! Logging setup with secret redaction
//!
//! Every formatted log line passes through [`RedactionPatterns`] before it
//! reaches stderr, so bot tokens and API keys never end up in the output.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "stream_relay_bot=info,teloxide=info,hyper=warn,h2=error,reqwest=warn,tokio=warn";

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
    bearer: Regex,
    access_key: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            bearer: Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+")?,
            access_key: Regex::new(r"(?i)(accesskey[\x22']?\s*[:=]\s*[\x22']?)[^\s\x22',&]+")?,
        })
    }

    /// Replace every secret found in `input` with a placeholder
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = self
            .token_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self.bearer.replace_all(&output, "${1}[MASKED]").to_string();
        output = self
            .access_key
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output
    }
}

/// Hands every log event its own buffer; the whole event is redacted
/// once and written to stderr when the buffer is dropped.
#[derive(Clone)]
struct RedactingStderr {
    patterns: Arc<RedactionPatterns>,
}

impl<'a> MakeWriter<'a> for RedactingStderr {
    type Writer = RedactedEvent<'a, io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactedEvent::new(&self.patterns, io::stderr())
    }
}

/// One formatted event on its way to `sink`.
struct RedactedEvent<'a, W: Write> {
    patterns: &'a RedactionPatterns,
    buf: Vec<u8>,
    sink: W,
}

impl<'a, W: Write> RedactedEvent<'a, W> {
    const fn new(patterns: &'a RedactionPatterns, sink: W) -> Self {
        Self {
            patterns,
            buf: Vec::new(),
            sink,
        }
    }
}

impl<W: Write> Write for RedactedEvent<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for RedactedEvent<'_, W> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let redacted = self.patterns.redact(&String::from_utf8_lossy(&self.buf));
        // Nowhere left to report a failed log write
        let _ = self.sink.write_all(redacted.as_bytes());
        let _ = self.sink.flush();
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `DEBUG_MODE=1|true` switches the
/// default filter to `debug`.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingStderr { patterns };

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
