//! Semantic fallback classification for low-confidence headers.
//!
//! A [`FallbackMatcher`] is consulted only for columns the heuristic could not
//! place. Every failure is recoverable: the matcher turns errors into an
//! unmapped suggestion with zero confidence.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::FallbackError;

/// Answer from a fallback classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackVerdict {
    /// Suggested field, `None` for "unmapped".
    pub suggested: Option<String>,
    pub confidence: f32,
}

impl FallbackVerdict {
    pub fn unmapped() -> Self {
        Self {
            suggested: None,
            confidence: 0.0,
        }
    }
}

/// External header classifier.
pub trait FallbackMatcher: Send + Sync {
    fn classify(&self, header: &str, candidates: &[String])
    -> Result<FallbackVerdict, FallbackError>;

    /// Whether this matcher can answer at all.
    fn is_available(&self) -> bool {
        true
    }
}

impl<F> FallbackMatcher for F
where
    F: Fn(&str, &[String]) -> Result<FallbackVerdict, FallbackError> + Send + Sync,
{
    fn classify(
        &self,
        header: &str,
        candidates: &[String],
    ) -> Result<FallbackVerdict, FallbackError> {
        self(header, candidates)
    }
}

/// No external classifier configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackMatcher for NoFallback {
    fn classify(&self, _: &str, _: &[String]) -> Result<FallbackVerdict, FallbackError> {
        Ok(FallbackVerdict::unmapped())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Bounds any matcher by a wall-clock timeout.
///
/// The inner call runs on a worker thread; on timeout its result is dropped.
pub struct TimeoutFallback<M> {
    inner: Arc<M>,
    timeout: Duration,
}

impl<M> TimeoutFallback<M>
where
    M: FallbackMatcher + 'static,
{
    pub fn new(inner: M, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }
}

impl<M> FallbackMatcher for TimeoutFallback<M>
where
    M: FallbackMatcher + 'static,
{
    fn classify(
        &self,
        header: &str,
        candidates: &[String],
    ) -> Result<FallbackVerdict, FallbackError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let header = header.to_string();
        let candidates = candidates.to_vec();
        thread::spawn(move || {
            let _ = tx.send(inner.classify(&header, &candidates));
        });
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(FallbackError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(FallbackError::Disconnected),
        }
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    header: &'a str,
    candidates: &'a [String],
}

/// Runs an external program per header.
///
/// The program receives `{"header": .., "candidates": [..]}` on stdin and
/// must print a JSON object with `suggested` and `confidence` on stdout.
#[derive(Debug, Clone)]
pub struct CommandFallback {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl CommandFallback {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

impl FallbackMatcher for CommandFallback {
    fn classify(
        &self,
        header: &str,
        candidates: &[String],
    ) -> Result<FallbackVerdict, FallbackError> {
        let request = serde_json::to_vec(&CommandRequest { header, candidates })
            .map_err(|e| FallbackError::Malformed(e.to_string()))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(FallbackError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&request).map_err(FallbackError::Io)?;
        }

        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut output = String::new();
                let result = stdout.read_to_string(&mut output).map(|_| output);
                let _ = tx.send(result);
            });
        }

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().map_err(FallbackError::Io)? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FallbackError::Timeout(self.timeout.as_millis() as u64));
            }
            thread::sleep(POLL_INTERVAL);
        };
        if !status.success() {
            return Err(FallbackError::Exit(status.to_string()));
        }

        let remaining = self.timeout.saturating_sub(started.elapsed());
        let output = rx
            .recv_timeout(remaining.max(POLL_INTERVAL))
            .map_err(|_| FallbackError::Disconnected)?
            .map_err(FallbackError::Io)?;
        debug!(header, bytes = output.len(), "fallback command answered");
        parse_verdict(&output)
    }
}

/// Leniently parse a classifier reply.
///
/// The first `{...}` block is read as JSON; surrounding prose is ignored.
/// `suggested` may be missing, empty, `null` or `"unmapped"`; `confidence`
/// may be a number or a numeric string and is clamped to `[0, 1]`.
pub fn parse_verdict(text: &str) -> Result<FallbackVerdict, FallbackError> {
    let start = text
        .find('{')
        .ok_or_else(|| FallbackError::Malformed("no JSON object".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| FallbackError::Malformed("unterminated JSON object".to_string()))?;
    let value: serde_json::Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| FallbackError::Malformed(e.to_string()))?;

    let suggested = value
        .get("suggested")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("unmapped"))
        .map(str::to_string);

    let confidence = match value.get("confidence") {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0) as f32
    } else {
        0.0
    };

    Ok(FallbackVerdict {
        suggested,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_wrapped_in_prose() {
        let verdict =
            parse_verdict("Sure! {\"suggested\": \"email\", \"confidence\": \"0.8\"} hope it helps")
                .unwrap();
        assert_eq!(verdict.suggested.as_deref(), Some("email"));
        assert!((verdict.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn unmapped_and_out_of_range_confidence() {
        let verdict = parse_verdict(r#"{"suggested": "unmapped", "confidence": 7}"#).unwrap();
        assert_eq!(verdict.suggested, None);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_verdict("no idea"),
            Err(FallbackError::Malformed(_))
        ));
        assert!(matches!(
            parse_verdict("} {"),
            Err(FallbackError::Malformed(_))
        ));
    }

    #[test]
    fn timeout_wrapper_gives_up() {
        let slow = |_: &str, _: &[String]| -> Result<FallbackVerdict, FallbackError> {
            thread::sleep(Duration::from_millis(500));
            Ok(FallbackVerdict::unmapped())
        };
        let bounded = TimeoutFallback::new(slow, Duration::from_millis(20));
        assert!(matches!(
            bounded.classify("x", &[]),
            Err(FallbackError::Timeout(20))
        ));
    }

    #[test]
    fn timeout_wrapper_passes_fast_answers() {
        let fast = |header: &str, _: &[String]| -> Result<FallbackVerdict, FallbackError> {
            Ok(FallbackVerdict {
                suggested: Some(header.to_lowercase()),
                confidence: 0.5,
            })
        };
        let bounded = TimeoutFallback::new(fast, Duration::from_secs(5));
        let verdict = bounded.classify("CITY", &["city".to_string()]).unwrap();
        assert_eq!(verdict.suggested.as_deref(), Some("city"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let fallback = CommandFallback::new(
            "definitely-not-a-real-classifier",
            Vec::new(),
            Duration::from_millis(200),
        );
        assert!(matches!(
            fallback.classify("x", &[]),
            Err(FallbackError::Spawn(_))
        ));
    }
}
