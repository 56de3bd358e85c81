//! Background countdown for a running exam.
//!
//! The countdown polls a [`Clock`] once per period and reports the remaining
//! time over a channel. When time runs out it sends a single
//! [`CountdownEvent::Expired`] and stops. Dropping the handle aborts the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::clock::Clock;
use crate::exam::remaining_ms;
use crate::model::Timestamp;

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining_ms: i64 },
    Expired,
}

/// Handle to a running countdown task.
#[derive(Debug)]
pub struct ExamCountdown {
    handle: JoinHandle<()>,
}

impl ExamCountdown {
    /// Start counting down an attempt that began at `started_at`.
    pub fn spawn(
        started_at: Timestamp,
        total_minutes: u32,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> (Self, mpsc::Receiver<CountdownEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let remaining = remaining_ms(started_at, total_minutes, clock.now_ms());
                if remaining == 0 {
                    debug!("exam time expired");
                    let _ = tx.send(CountdownEvent::Expired).await;
                    break;
                }
                if tx
                    .send(CountdownEvent::Tick {
                        remaining_ms: remaining,
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    /// Stop the countdown.
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ExamCountdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const T0: Timestamp = 1_700_000_000_000;

    #[tokio::test(start_paused = true)]
    async fn ticks_then_expires_once() {
        let clock = Arc::new(ManualClock::new(T0));
        let (_countdown, mut rx) = ExamCountdown::spawn(T0, 1, clock.clone(), DEFAULT_PERIOD);

        assert_eq!(
            rx.recv().await,
            Some(CountdownEvent::Tick {
                remaining_ms: 60_000
            })
        );
        clock.advance(45_500);
        assert_eq!(
            rx.recv().await,
            Some(CountdownEvent::Tick {
                remaining_ms: 14_500
            })
        );
        clock.advance(20_000);
        assert_eq!(rx.recv().await, Some(CountdownEvent::Expired));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn already_expired_attempt_expires_immediately() {
        let clock = Arc::new(ManualClock::new(T0 + 10 * 60_000));
        let (countdown, mut rx) = ExamCountdown::spawn(T0, 5, clock, DEFAULT_PERIOD);
        assert_eq!(rx.recv().await, Some(CountdownEvent::Expired));
        assert_eq!(rx.recv().await, None);
        tokio::task::yield_now().await;
        assert!(countdown.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_events() {
        let clock = Arc::new(ManualClock::new(T0));
        let (countdown, mut rx) = ExamCountdown::spawn(T0, 30, clock, DEFAULT_PERIOD);
        assert!(matches!(rx.recv().await, Some(CountdownEvent::Tick { .. })));
        drop(countdown);

        let mut remaining_events = 0;
        while let Some(event) = rx.recv().await {
            assert_ne!(event, CountdownEvent::Expired);
            remaining_events += 1;
        }
        assert!(remaining_events <= 1);
    }
}
