//! Daily trigger loop.
//!
//! Polls the wall clock in the configured zone and fires the job once per
//! calendar date when the clock reads the trigger `HH:MM`. The "already ran
//! today" guard lives in memory only: a restart inside the trigger minute
//! can run the job a second time that day.
//!
//! The loop is serial. A job runs to completion before the next poll, and a
//! failed job still consumes the day's slot.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::ScheduleConfig;

pub struct Scheduler {
    config: ScheduleConfig,
    tz: Tz,
    last_run_date: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig, tz: Tz) -> Self {
        Self {
            config,
            tz,
            last_run_date: None,
        }
    }

    pub fn last_run_date(&self) -> Option<NaiveDate> {
        self.last_run_date
    }

    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Trigger time reached and today not yet run.
    pub fn should_fire(&self, now: DateTime<Tz>) -> bool {
        now.hour() == self.config.hour
            && now.minute() == self.config.minute
            && self.last_run_date != Some(now.date_naive())
    }

    /// Run `job` if due at `now`. Returns whether it ran.
    pub async fn tick<F, Fut, E>(&mut self, now: DateTime<Tz>, job: &mut F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        if !self.should_fire(now) {
            return false;
        }
        self.run_job(now.date_naive(), job).await;
        true
    }

    async fn run_job<F, Fut, E>(&mut self, date: NaiveDate, job: &mut F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        info!(%date, "Scheduled job starting");
        match job().await {
            Ok(()) => info!(%date, "Scheduled job finished"),
            Err(e) => error!(%date, error = %e, "Scheduled job failed, next attempt is tomorrow"),
        }
        self.last_run_date = Some(date);
    }

    /// Poll forever (until Ctrl-C), running `job` at most once per day.
    pub async fn run_forever<F, Fut, E>(&mut self, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        info!(
            hour = self.config.hour,
            minute = self.config.minute,
            tz = %self.tz,
            "Scheduler started, running daily at {:02}:{:02}",
            self.config.hour,
            self.config.minute
        );

        if self.config.run_on_start {
            let today = self.now().date_naive();
            self.run_job(today, &mut job).await;
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = self.now();
                    self.tick(now, &mut job).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Scheduler stopping");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn scheduler() -> Scheduler {
        Scheduler::new(
            ScheduleConfig {
                hour: 9,
                minute: 0,
                poll_interval: Duration::from_secs(20),
                run_on_start: false,
            },
            chrono_tz::Asia::Shanghai,
        )
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> DateTime<Tz> {
        chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(2026, 2, d, h, m, s)
            .unwrap()
    }

    #[tokio::test]
    async fn fires_once_per_day_within_trigger_minute() {
        let mut s = scheduler();
        let mut runs = 0;
        let mut job = || {
            runs += 1;
            async { Ok::<(), String>(()) }
        };

        assert!(!s.tick(at(6, 8, 59, 40), &mut job).await);
        assert!(s.tick(at(6, 9, 0, 0), &mut job).await);
        assert!(!s.tick(at(6, 9, 0, 20), &mut job).await);
        assert!(!s.tick(at(6, 9, 0, 40), &mut job).await);
        assert!(!s.tick(at(6, 9, 1, 0), &mut job).await);
        assert!(s.tick(at(7, 9, 0, 10), &mut job).await);
        drop(job);

        assert_eq!(runs, 2);
        assert_eq!(s.last_run_date(), NaiveDate::from_ymd_opt(2026, 2, 7));
    }

    #[tokio::test]
    async fn failed_run_consumes_the_day() {
        let mut s = scheduler();
        let mut job = || async { Err::<(), String>("imap down".into()) };

        assert!(s.tick(at(6, 9, 0, 0), &mut job).await);
        assert!(!s.tick(at(6, 9, 0, 20), &mut job).await);
    }

    #[test]
    fn trigger_time_is_evaluated_in_configured_zone() {
        let s = scheduler();
        // 01:00 UTC is 09:00 in Shanghai.
        let utc = Utc.with_ymd_and_hms(2026, 2, 6, 1, 0, 0).unwrap();
        assert!(s.should_fire(utc.with_timezone(&chrono_tz::Asia::Shanghai)));
        let utc_nine = Utc.with_ymd_and_hms(2026, 2, 6, 9, 0, 0).unwrap();
        assert!(!s.should_fire(utc_nine.with_timezone(&chrono_tz::Asia::Shanghai)));
    }

    #[test]
    fn fresh_scheduler_has_no_guard() {
        let s = scheduler();
        assert!(s.last_run_date().is_none());
    }
}
