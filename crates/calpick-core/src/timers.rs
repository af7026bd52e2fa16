use std::collections::BTreeMap;

use tracing::trace;

pub const BLUR_HIDE_DELAY_MS: u64 = 50;
pub const SELECT_HIDE_DELAY_MS: u64 = 100;
pub const FOCUS_DELAY_MS: u64 = 1;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
)]
pub enum TimerKind {
  HideAfterBlur,
  HideAfterSelect,
  ParseField,
  FocusTrigger
}

/// Deferred work on a virtual clock. At
/// most one entry per kind; scheduling
/// again supersedes the pending one.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
  now_ms:  u64,
  pending: BTreeMap<TimerKind, u64>
}

impl TimerQueue {
  #[must_use]
  pub fn now_ms(&self) -> u64 {
    self.now_ms
  }

  pub fn schedule(
    &mut self,
    kind: TimerKind,
    delay_ms: u64
  ) {
    let deadline =
      self.now_ms.saturating_add(delay_ms);
    if self
      .pending
      .insert(kind, deadline)
      .is_some()
    {
      trace!(?kind, "superseded pending timer");
    }
  }

  pub fn cancel(
    &mut self,
    kind: TimerKind
  ) -> bool {
    self.pending.remove(&kind).is_some()
  }

  #[must_use]
  pub fn is_pending(
    &self,
    kind: TimerKind
  ) -> bool {
    self.pending.contains_key(&kind)
  }

  #[must_use]
  pub fn next_deadline(&self) -> Option<u64> {
    self.pending.values().min().copied()
  }

  /// Removes the earliest timer due at
  /// or before `until`, moving the clock
  /// to its deadline.
  pub fn pop_due(
    &mut self,
    until: u64
  ) -> Option<TimerKind> {
    let (kind, deadline) = self
      .pending
      .iter()
      .filter(|(_, deadline)| {
        **deadline <= until
      })
      .min_by_key(|(kind, deadline)| {
        (**deadline, **kind)
      })
      .map(|(kind, deadline)| {
        (*kind, *deadline)
      })?;
    self.pending.remove(&kind);
    self.now_ms = self.now_ms.max(deadline);
    Some(kind)
  }

  pub fn advance_to(&mut self, until: u64) {
    self.now_ms = self.now_ms.max(until);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn due_timers_pop_in_deadline_order() {
    let mut timers = TimerQueue::default();
    timers.schedule(
      TimerKind::HideAfterSelect,
      SELECT_HIDE_DELAY_MS
    );
    timers.schedule(
      TimerKind::FocusTrigger,
      FOCUS_DELAY_MS
    );
    assert_eq!(timers.next_deadline(), Some(1));
    assert_eq!(timers.pop_due(0), None);
    assert_eq!(
      timers.pop_due(200),
      Some(TimerKind::FocusTrigger)
    );
    assert_eq!(timers.now_ms(), 1);
    assert_eq!(
      timers.pop_due(200),
      Some(TimerKind::HideAfterSelect)
    );
    assert_eq!(timers.pop_due(200), None);
  }

  #[test]
  fn rescheduling_supersedes() {
    let mut timers = TimerQueue::default();
    timers.schedule(TimerKind::ParseField, 300);
    timers.advance_to(200);
    timers.schedule(TimerKind::ParseField, 300);
    assert_eq!(timers.pop_due(400), None);
    assert_eq!(
      timers.pop_due(500),
      Some(TimerKind::ParseField)
    );
  }

  #[test]
  fn cancelled_timers_never_fire() {
    let mut timers = TimerQueue::default();
    timers.schedule(
      TimerKind::HideAfterBlur,
      BLUR_HIDE_DELAY_MS
    );
    assert!(timers.cancel(TimerKind::HideAfterBlur));
    assert!(!timers.cancel(TimerKind::HideAfterBlur));
    assert_eq!(timers.pop_due(1_000), None);
  }
}
