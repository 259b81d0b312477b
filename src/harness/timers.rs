//! Per-case supervision timers

use std::pin::Pin;

use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior, Sleep};

use crate::common::config::Timers;

/// A timer that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The case has been running long enough to warn about it
    Warning,
    /// Time to open the profiling window
    ProfileStart,
    /// Time to close the profiling window
    ProfileStop,
    /// Recurring tick throttling periodic solver output
    Heartbeat,
}

/// One-shot timer that yields at most once
struct OneShot {
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl OneShot {
    fn new(deadline: Instant, armed: bool) -> Self {
        Self {
            sleep: Box::pin(sleep_until(deadline)),
            armed,
        }
    }
}

/// Warning, profile-start and profile-stop one-shots plus the heartbeat
///
/// Lives for exactly one case; dropping it cancels every timer.
pub struct TimerSet {
    warning: OneShot,
    profile_start: OneShot,
    profile_stop: OneShot,
    heartbeat: Interval,
}

impl TimerSet {
    /// Arm all timers relative to now; the profile timers only when
    /// profiling is enabled
    pub fn arm(timers: &Timers, profiling: bool) -> Self {
        let now = Instant::now();
        let mut heartbeat = interval_at(now + timers.heartbeat(), timers.heartbeat());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            warning: OneShot::new(now + timers.warning(), true),
            profile_start: OneShot::new(now + timers.profile_start(), profiling),
            profile_stop: OneShot::new(now + timers.profile_stop(), profiling),
            heartbeat,
        }
    }

    /// Wait for the next timer to fire
    ///
    /// Timers due at the same moment are reported in deadline order. Cancel
    /// safe: a timer is only consumed when its event is returned.
    pub async fn next(&mut self) -> TimerEvent {
        tokio::select! {
            biased;
            _ = &mut self.warning.sleep, if self.warning.armed => {
                self.warning.armed = false;
                TimerEvent::Warning
            }
            _ = &mut self.profile_start.sleep, if self.profile_start.armed => {
                self.profile_start.armed = false;
                TimerEvent::ProfileStart
            }
            _ = &mut self.profile_stop.sleep, if self.profile_stop.armed => {
                self.profile_stop.armed = false;
                TimerEvent::ProfileStop
            }
            _ = self.heartbeat.tick() => TimerEvent::Heartbeat,
        }
    }
}
