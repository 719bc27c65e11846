//! Transient banners shown over the main view.

use crate::chain::is_user_rejection;
use color_eyre::eyre;
use std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};
use tracing::{
    error,
    info,
};

const MAX_VISIBLE: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
    Bet,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct Notifications {
    items: VecDeque<Notification>,
    next_id: u64,
    ttl: Duration,
    bet_ttl: Duration,
}

impl Notifications {
    pub fn new(ttl: Duration, bet_ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            next_id: 0,
            ttl,
            bet_ttl,
        }
    }

    pub fn push_at(&mut self, severity: Severity, message: impl Into<String>, now: Instant) -> u64 {
        let ttl = match severity {
            Severity::Bet => self.bet_ttl,
            _ => self.ttl,
        };
        let id = self.next_id;
        self.next_id += 1;
        self.items.push_back(Notification {
            id,
            severity,
            message: message.into(),
            expires_at: now + ttl,
        });
        while self.items.len() > MAX_VISIBLE {
            self.items.pop_front();
        }
        id
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> u64 {
        self.push_at(severity, message, Instant::now())
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "success");
        self.push(Severity::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(%message, "error");
        self.push(Severity::Error, message);
    }

    /// Banner for a `BetsPlaced` event.
    pub fn bet_placed(&mut self, name: &str, count: u64) {
        let plural = if count == 1 { "bet" } else { "bets" };
        self.push(Severity::Bet, format!("{name} just placed {count} {plural}!"));
    }

    /// Surface a failed action unless the user declined to sign it.
    /// Returns whether a banner was shown.
    pub fn report_failure(&mut self, context: &str, report: &eyre::Report) -> bool {
        if is_user_rejection(report) {
            info!(context, "request cancelled by user");
            return false;
        }
        error!(context, error = %format!("{report:#}"), "action failed");
        self.push(Severity::Error, format!("{context}: {}", root_message(report)));
        true
    }

    /// Drop expired banners; true when something was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.expires_at > now);
        before != self.items.len()
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|item| item.id != id);
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

fn root_message(report: &eyre::Report) -> String {
    report
        .chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| report.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::chain::ChainError;

    fn notifications() -> Notifications {
        Notifications::new(Duration::from_secs(5), Duration::from_secs(10))
    }

    #[test]
    fn expire__honours_per_severity_ttl() {
        // given
        let start = Instant::now();
        let mut n = notifications();
        n.push_at(Severity::Info, "hello", start);
        n.push_at(Severity::Bet, "chog just placed 2 bets!", start);

        // when
        let removed = n.expire(start + Duration::from_secs(6));

        // then
        assert!(removed);
        assert_eq!(n.len(), 1);
        assert_eq!(n.active().next().map(|i| i.severity), Some(Severity::Bet));
        n.expire(start + Duration::from_secs(11));
        assert!(n.is_empty());
    }

    #[test]
    fn bet_placed__pluralises() {
        let mut n = notifications();
        n.bet_placed("alice", 1);
        n.bet_placed("0x1234...abcd", 3);
        let messages: Vec<_> = n.active().map(|i| i.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "alice just placed 1 bet!".to_string(),
                "0x1234...abcd just placed 3 bets!".to_string()
            ]
        );
    }

    #[test]
    fn report_failure__shows_root_cause() {
        let mut n = notifications();
        let report = eyre::Report::new(ChainError::Reverted {
            reason: "Game is paused".to_string(),
        })
        .wrap_err("sending transaction");
        assert!(n.report_failure("Bet failed", &report));
        assert_eq!(
            n.active().next().map(|i| i.message.as_str()),
            Some("Bet failed: transaction reverted: Game is paused")
        );
    }
}
