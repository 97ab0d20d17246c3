//! The poll, validate, diff, notify loop.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::alert::{failure_message, AlertSink, FailureAlertPolicy};
use crate::config::PollConfig;
use crate::error::PollError;
use crate::homework::{check_response, Homework, ReviewSource};

/// What happens to the cursor after a successful poll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CursorPolicy {
    #[default]
    Advance,
    Fixed,
}

impl Display for CursorPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Advance => "advance",
            Self::Fixed => "fixed",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown cursor policy: {0}")]
pub struct CursorPolicyParseError(pub String);

impl FromStr for CursorPolicy {
    type Err = CursorPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advance" => Ok(Self::Advance),
            "fixed" => Ok(Self::Fixed),
            _ => Err(CursorPolicyParseError(s.to_string())),
        }
    }
}

/// Everything the loop remembers between iterations. Lost on restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub cursor: i64,
    pub last_notified: Option<Homework>,
    pub last_failure: Option<String>,
}

impl PollState {
    pub fn starting_at(cursor: i64) -> Self {
        Self {
            cursor,
            last_notified: None,
            last_failure: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    NoUpdates,
    Unchanged(Homework),
    Notified(Homework),
}

pub struct Poller {
    source: Box<dyn ReviewSource>,
    sink: Box<dyn AlertSink>,
    retry_time: Duration,
    cursor_policy: CursorPolicy,
    failure_alerts: FailureAlertPolicy,
}

impl Poller {
    pub fn new(
        source: Box<dyn ReviewSource>,
        sink: Box<dyn AlertSink>,
        config: &PollConfig,
    ) -> Self {
        Self {
            source,
            sink,
            retry_time: config.retry_time(),
            cursor_policy: config.cursor,
            failure_alerts: config.failure_alerts,
        }
    }

    /// Runs forever when `iterations` is `None`. There is no sleep after the
    /// final iteration of a bounded run.
    pub async fn run(&self, state: &mut PollState, iterations: Option<u32>) {
        let mut completed: u32 = 0;
        loop {
            debug!(cursor = state.cursor, "polling review API");
            match self.poll_once(state).await {
                Ok(PollOutcome::Notified(homework)) => {
                    info!(
                        homework = %homework.name,
                        status = %homework.status,
                        "status change delivered"
                    );
                }
                Ok(PollOutcome::Unchanged(homework)) => {
                    debug!(homework = %homework.name, "status unchanged, nothing to send");
                }
                Ok(PollOutcome::NoUpdates) => debug!("no new homework statuses"),
                Err(err) => self.report_failure(state, &err).await,
            }

            completed = completed.saturating_add(1);
            if iterations.is_some_and(|max| completed >= max) {
                break;
            }
            tokio::time::sleep(self.retry_time).await;
        }
    }

    /// One fetch, validate, diff, notify pass. State is only touched when the
    /// whole pass succeeds, except `last_notified` which is set right after a
    /// successful delivery.
    pub async fn poll_once(&self, state: &mut PollState) -> Result<PollOutcome, PollError> {
        let response = self.source.fetch(state.cursor).await?;
        let batch = check_response(&response)?;

        let outcome = match batch.latest() {
            None => PollOutcome::NoUpdates,
            Some(record) => {
                let homework = Homework::from_record(record)?;
                if state.last_notified.as_ref() == Some(&homework) {
                    PollOutcome::Unchanged(homework)
                } else {
                    self.sink.send(&homework.message()).await?;
                    state.last_notified = Some(homework.clone());
                    PollOutcome::Notified(homework)
                }
            }
        };

        if self.cursor_policy == CursorPolicy::Advance {
            state.cursor = batch.current_date;
        }
        state.last_failure = None;
        Ok(outcome)
    }

    async fn report_failure(&self, state: &mut PollState, err: &PollError) {
        error!(kind = err.kind(), "program failure: {err}");
        if !err.should_alert() {
            return;
        }
        let text = failure_message(err);
        if !self
            .failure_alerts
            .should_send(&text, state.last_failure.as_deref())
        {
            debug!("failure alert suppressed by policy {}", self.failure_alerts);
            return;
        }
        match self.sink.send(&text).await {
            Ok(()) => state.last_failure = Some(text),
            Err(alert_err) => warn!("failed sending failure alert: {alert_err}"),
        }
    }
}
