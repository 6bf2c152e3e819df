use crate::automation::{Locator, UiSession};
use crate::translation::retry::{PollPolicy, RetryDecision, RetryPolicy};
use crate::utils::{is_blank, sanitize_cell, AppConfig, Result, TranslatorError};
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    /// Every attempt failed; `text` is the untouched source.
    Fallback { text: String, reason: String },
}

impl TranslationOutcome {
    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::Fallback { text, .. } => text,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, TranslationOutcome::Translated(_))
    }
}

/// Submits one text at a time to the translation page and reads back a
/// settled result.
pub struct TranslationInvoker {
    input: Locator,
    output: Locator,
    busy_markers: Vec<String>,
    delay_range: (Duration, Duration),
    result_poll: PollPolicy,
    stability: PollPolicy,
    retry: RetryPolicy,
    escape_formulas: bool,
}

impl TranslationInvoker {
    pub fn new(config: &AppConfig) -> Self {
        let t = &config.translation;
        Self {
            input: t.input_locator.clone(),
            output: t.output_locator.clone(),
            busy_markers: t.busy_markers.iter().map(|m| m.trim().to_string()).collect(),
            delay_range: t.request_delay_range(),
            result_poll: PollPolicy::new(
                Duration::from_millis(t.result_timeout_ms),
                Duration::from_millis(t.poll_interval_ms),
            ),
            stability: PollPolicy::new(
                Duration::from_millis(t.stability_window_ms),
                Duration::from_millis(t.stability_interval_ms),
            ),
            retry: RetryPolicy::from_config(t),
            escape_formulas: config.output.escape_formulas,
        }
    }

    /// Returns `Err` only for session-fatal errors; anything else ends in a
    /// fallback to the source text.
    pub async fn translate<S>(&self, session: &mut S, text: &str) -> Result<TranslationOutcome>
    where
        S: UiSession + ?Sized,
    {
        let mut attempts = 0u32;
        loop {
            sleep(self.request_delay()).await;
            attempts += 1;

            let err = match self.attempt(session, text).await {
                Ok(result) => {
                    let result = if self.escape_formulas {
                        sanitize_cell(&result)
                    } else {
                        result
                    };
                    return Ok(TranslationOutcome::Translated(result));
                }
                Err(e) => e,
            };

            match self.retry.evaluate(&err, attempts) {
                RetryDecision::Abort => return Err(err),
                RetryDecision::RetryAfter(delay) => {
                    warn!(attempt = attempts, error = %err, "Translation attempt failed, retrying");
                    sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    error!(attempts, error = %err, "Translation failed, keeping source text");
                    return Ok(TranslationOutcome::Fallback {
                        text: text.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn request_delay(&self) -> Duration {
        let (min, max) = self.delay_range;
        if min >= max {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    async fn attempt<S>(&self, session: &mut S, text: &str) -> Result<String>
    where
        S: UiSession + ?Sized,
    {
        let input = session.find(&self.input).await?;
        session.clear(&input).await?;
        session.type_text(&input, text).await?;

        let first = self.wait_for_result(session).await?;
        self.confirm_stable(session, first).await
    }

    async fn wait_for_result<S>(&self, session: &mut S) -> Result<String>
    where
        S: UiSession + ?Sized,
    {
        let deadline = Instant::now() + self.result_poll.timeout;
        loop {
            if let Some(text) = self.sample(session).await? {
                return Ok(text);
            }
            if Instant::now() >= deadline {
                return Err(TranslatorError::TransientAutomation(format!(
                    "no result in {} within {:?}",
                    self.output, self.result_poll.timeout
                )));
            }
            sleep(self.result_poll.interval).await;
        }
    }

    /// Re-reads the output until two consecutive samples agree. When the
    /// window runs out the last observed value is used as is.
    async fn confirm_stable<S>(&self, session: &mut S, first: String) -> Result<String>
    where
        S: UiSession + ?Sized,
    {
        let deadline = Instant::now() + self.stability.timeout;
        let mut last = first;

        while Instant::now() < deadline {
            sleep(self.stability.interval).await;
            if let Some(current) = self.sample(session).await? {
                if current == last {
                    return Ok(current);
                }
                last = current;
            }
        }

        warn!(
            window = ?self.stability.timeout,
            "Result did not settle, using last observed value"
        );
        Ok(last)
    }

    /// One read of the output region. `None` while it is empty, busy or
    /// briefly unreadable.
    async fn sample<S>(&self, session: &mut S) -> Result<Option<String>>
    where
        S: UiSession + ?Sized,
    {
        match session.read_text(&self.output).await {
            Ok(Some(text)) if self.is_ready(&text) => Ok(Some(text.trim().to_string())),
            Ok(_) => Ok(None),
            Err(e) if e.is_session_fatal() => Err(e),
            Err(e) => {
                debug!(error = %e, "Output not readable yet");
                Ok(None)
            }
        }
    }

    fn is_ready(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !is_blank(trimmed) && !self.busy_markers.iter().any(|m| m == trimmed)
    }
}
