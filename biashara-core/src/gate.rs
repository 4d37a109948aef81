//! Run gate: whether this invocation fetches, and whether it mails.
//!
//! Both decisions are pure functions of the injected instant, the
//! configuration and the command-line flags.

use crate::config::{EmailSchedule, TradingHours};
use chrono::{DateTime, Datelike, Timelike, Utc};

/// True when prices should be fetched at `now`.
pub fn should_fetch(now: DateTime<Utc>, hours: &TradingHours, force: bool) -> bool {
    if force {
        return true;
    }
    let local = now.with_timezone(&hours.timezone);
    hours.days.contains(&local.weekday()) && (hours.start..hours.end).contains(&local.hour())
}

/// True when the weekly report should be sent at `now`.
pub fn should_send_email(
    now: DateTime<Utc>,
    hours: &TradingHours,
    email: &EmailSchedule,
    force: bool,
) -> bool {
    if force {
        return true;
    }
    let local = now.with_timezone(&hours.timezone);
    let in_window = email
        .send_window_minutes
        .map_or(true, |window| local.minute() < window);
    local.weekday() == email.send_on && local.hour() == email.send_at_hour && in_window
}

/// Outcome of both gates for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDecision {
    pub fetch: bool,
    pub email: bool,
}

impl GateDecision {
    pub fn evaluate(
        now: DateTime<Utc>,
        hours: &TradingHours,
        email: &EmailSchedule,
        force: bool,
        send_email: bool,
    ) -> Self {
        Self {
            fetch: should_fetch(now, hours, force),
            email: should_send_email(now, hours, email, force || send_email),
        }
    }

    /// The report needs fresh prices, so an open email gate also runs the
    /// pipeline even outside the trading window.
    pub fn should_run(&self) -> bool {
        self.fetch || self.email
    }
}
