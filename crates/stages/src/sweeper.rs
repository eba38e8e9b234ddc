use std::time::Duration;

use {
    chrono::{DateTime, TimeDelta, Utc},
    tokio::time::{Instant, Interval, MissedTickBehavior, interval_at},
    tracing::{debug, info},
};

use crate::{
    community::CommunityState,
    error::{Result, report},
};

/// Periodic tick driving the expiry sweep. The first tick fires one period
/// after creation, not immediately.
#[derive(Debug)]
pub struct Sweeper {
    interval: Interval,
}

impl Sweeper {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Maximum stage age as a duration, saturating on absurd values.
pub fn max_age(minutes: u64) -> TimeDelta {
    i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .unwrap_or(TimeDelta::MAX)
}

impl CommunityState {
    /// Delete every stage older than the configured maximum, occupied or not,
    /// then refresh the control message.
    ///
    /// The category is looked up afresh first and recreated if it went
    /// missing, along with the control channel and message.
    pub async fn sweep(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self
            .reconciler
            .revalidate_container(&*self.gateway)
            .await?
        {
            info!(community = %self.id, "category was replaced, reposting control message");
            self.control.invalidate();
        }

        let expired = self
            .registry
            .expired_owners(now, max_age(self.config.stage_max_minutes));
        if expired.is_empty() {
            debug!(community = %self.id, tracked = self.registry.len(), "sweep found nothing to expire");
        }
        for owner in expired {
            info!(community = %self.id, %owner, "stage expired");
            if let Err(e) = self
                .registry
                .destroy(&*self.gateway, self.id, owner, true)
                .await
            {
                report(self.id, "expire", &e);
            }
        }
        self.refresh().await
    }
}
