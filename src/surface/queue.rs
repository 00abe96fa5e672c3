//! Deterministic event loop for synchronous driving
//!
//! `ManualLoop` records everything the controller defers and hands it back on
//! request. Time only moves when [`ManualLoop::advance`] is called, and
//! watched transitions only finish when the caller says so, which makes every
//! interleaving reproducible.

use super::{ElementId, Scheduler, TransitionNotifier};
use crate::dialog::types::Signal;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug)]
struct Timer {
    due: Duration,
    seq: u64,
    signal: Signal,
}

#[derive(Debug)]
struct Watch {
    element: ElementId,
    property: String,
    due: Duration,
    signal: Signal,
}

/// Manually pumped scheduler and transition notifier
#[derive(Debug, Default)]
pub struct ManualLoop {
    ready: VecDeque<Signal>,
    timers: Vec<Timer>,
    watches: Vec<Watch>,
    now: Duration,
    seq: u64,
}

impl ManualLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Pop the next zero-delay signal
    pub fn next_ready(&mut self) -> Option<Signal> {
        self.ready.pop_front()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn timer_len(&self) -> usize {
        self.timers.len()
    }

    /// Number of transitions still being watched
    pub fn watch_len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_watching(&self, element: ElementId, property: &str) -> bool {
        self.watches
            .iter()
            .any(|watch| watch.element == element && watch.property == property)
    }

    /// Finish every watched transition now, regardless of its duration
    pub fn finish_transitions(&mut self) -> Vec<Signal> {
        self.watches.drain(..).map(|watch| watch.signal).collect()
    }

    /// Drop watched transitions without ever notifying, as a platform with
    /// animations disabled would
    pub fn suppress_transitions(&mut self) -> usize {
        let count = self.watches.len();
        self.watches.clear();
        count
    }

    /// Move virtual time forward and return what became due, in due order.
    /// Watched transitions whose expected duration has elapsed finish too.
    pub fn advance(&mut self, by: Duration) -> Vec<Signal> {
        self.now = self.now.saturating_add(by);
        let now = self.now;

        let mut due: Vec<(Duration, u64, Signal)> = Vec::new();
        let mut index = 0;
        while index < self.timers.len() {
            if self.timers[index].due <= now {
                let timer = self.timers.remove(index);
                due.push((timer.due, timer.seq, timer.signal));
            } else {
                index += 1;
            }
        }

        let mut index = 0;
        while index < self.watches.len() {
            if self.watches[index].due <= now {
                let watch = self.watches.remove(index);
                due.push((watch.due, 0, watch.signal));
            } else {
                index += 1;
            }
        }

        due.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, signal)| signal).collect()
    }
}

impl Scheduler for ManualLoop {
    fn defer(&mut self, signal: Signal) {
        self.ready.push_back(signal);
    }

    fn defer_after(&mut self, delay: Duration, signal: Signal) {
        self.seq += 1;
        self.timers.push(Timer {
            due: self.now.saturating_add(delay),
            seq: self.seq,
            signal,
        });
    }
}

impl TransitionNotifier for ManualLoop {
    fn watch(&mut self, element: ElementId, property: &str, expected: Duration, signal: Signal) {
        self.watches.push(Watch {
            element,
            property: property.to_string(),
            due: self.now.saturating_add(expected),
            signal,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::types::InstanceId;

    #[test]
    fn test_ready_signals_are_fifo() {
        let mut queue = ManualLoop::new();
        queue.defer(Signal::Flush { instance: InstanceId(1) });
        queue.defer(Signal::Flush { instance: InstanceId(2) });

        assert_eq!(queue.next_ready(), Some(Signal::Flush { instance: InstanceId(1) }));
        assert_eq!(queue.next_ready(), Some(Signal::Flush { instance: InstanceId(2) }));
        assert_eq!(queue.next_ready(), None);
    }

    #[test]
    fn test_advance_releases_due_timers_in_order() {
        let mut queue = ManualLoop::new();
        queue.defer_after(Duration::from_millis(50), Signal::CloseTimeout { instance: InstanceId(2) });
        queue.defer_after(Duration::from_millis(10), Signal::CloseTimeout { instance: InstanceId(1) });

        assert!(queue.advance(Duration::from_millis(5)).is_empty());
        assert_eq!(
            queue.advance(Duration::from_millis(10)),
            vec![Signal::CloseTimeout { instance: InstanceId(1) }]
        );
        assert_eq!(
            queue.advance(Duration::from_millis(100)),
            vec![Signal::CloseTimeout { instance: InstanceId(2) }]
        );
        assert_eq!(queue.timer_len(), 0);
    }

    #[test]
    fn test_watched_transitions_finish_once() {
        let mut queue = ManualLoop::new();
        let signal = Signal::TransitionEnd {
            instance: InstanceId(1),
            element: ElementId(7),
            property: "opacity".to_string(),
        };
        queue.watch(ElementId(7), "opacity", Duration::from_millis(300), signal.clone());

        assert!(queue.is_watching(ElementId(7), "opacity"));
        assert_eq!(queue.finish_transitions(), vec![signal]);
        assert!(queue.finish_transitions().is_empty());
    }

    #[test]
    fn test_transitions_finish_when_time_passes() {
        let mut queue = ManualLoop::new();
        let signal = Signal::TransitionEnd {
            instance: InstanceId(1),
            element: ElementId(7),
            property: "opacity".to_string(),
        };
        queue.watch(ElementId(7), "opacity", Duration::from_millis(300), signal.clone());

        assert!(queue.advance(Duration::from_millis(299)).is_empty());
        assert_eq!(queue.advance(Duration::from_millis(1)), vec![signal]);
    }
}
