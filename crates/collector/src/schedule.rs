//! Sweep cadence and next-run computation.

use {
    chrono::{DateTime, Utc},
    chanstat_config::CollectorConfig,
    cron::Schedule,
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

/// When sweeps fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionSchedule {
    /// Cron expression (5-field standard or 6/7-field with seconds).
    Cron {
        expr: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tz: Option<String>,
    },
    /// Fixed interval, anchored at the epoch.
    Every { every_ms: u64 },
}

impl Default for CollectionSchedule {
    fn default() -> Self {
        Self::Cron {
            expr: "0 * * * *".into(),
            tz: None,
        }
    }
}

impl CollectionSchedule {
    /// Build from config and check that it can produce a next run.
    ///
    /// `every_secs` takes precedence over the cron `schedule`.
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        let schedule = match config.every_secs {
            Some(secs) => Self::Every {
                every_ms: secs.saturating_mul(1000),
            },
            None => Self::Cron {
                expr: config.schedule.trim().to_string(),
                tz: config.timezone.clone(),
            },
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<()> {
        compute_next_run(self, 0).map(|_| ())
    }
}

fn parse_cron(expr: &str) -> Result<Schedule> {
    // The `cron` crate wants seconds and year; pad the common 5-field form.
    expr.parse::<Schedule>()
        .or_else(|_| format!("0 {expr} *").parse::<Schedule>())
        .map_err(Error::from)
}

/// Next fire time (epoch millis) strictly after `now_ms`.
///
/// Returns `None` if the schedule has no future runs.
pub fn compute_next_run(schedule: &CollectionSchedule, now_ms: u64) -> Result<Option<u64>> {
    match schedule {
        CollectionSchedule::Every { every_ms } => {
            if *every_ms == 0 {
                return Err(Error::message("every_ms must be > 0"));
            }
            let intervals = now_ms / every_ms;
            Ok(intervals.checked_add(1).and_then(|n| n.checked_mul(*every_ms)))
        },
        CollectionSchedule::Cron { expr, tz } => {
            if expr.trim().is_empty() {
                return Err(Error::message("schedule expression is empty"));
            }
            let schedule = parse_cron(expr)?;
            let now_dt = DateTime::<Utc>::from_timestamp_millis(now_ms as i64).unwrap_or_default();

            let next = match tz {
                Some(tz_name) => {
                    let tz: chrono_tz::Tz = tz_name
                        .parse()
                        .map_err(|_| Error::unknown_timezone(tz_name.as_str()))?;
                    schedule
                        .after(&now_dt.with_timezone(&tz))
                        .next()
                        .map(|dt| dt.timestamp_millis() as u64)
                },
                None => schedule
                    .after(&now_dt)
                    .next()
                    .map(|dt| dt.timestamp_millis() as u64),
            };
            Ok(next)
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    // 2024-02-01T00:20:00Z
    const NOW_MS: u64 = 1_706_746_800_000;

    #[test]
    fn hourly_default_fires_at_top_of_next_hour() {
        let next = compute_next_run(&CollectionSchedule::default(), NOW_MS)
            .unwrap()
            .unwrap();
        let dt = DateTime::from_timestamp_millis(next as i64).unwrap();
        assert_eq!(dt.format("%Y-%m-%dT%H:%M:%S").to_string(), "2024-02-01T01:00:00");
    }

    #[test]
    fn boundary_is_strictly_after_now() {
        let top = 1_706_749_200_000; // 01:00:00Z
        let next = compute_next_run(&CollectionSchedule::default(), top)
            .unwrap()
            .unwrap();
        assert_eq!(next, top + 3_600_000);
    }

    #[test]
    fn every_is_epoch_anchored() {
        let s = CollectionSchedule::Every { every_ms: 60_000 };
        assert_eq!(compute_next_run(&s, 130_000).unwrap(), Some(180_000));
        assert_eq!(compute_next_run(&s, 180_000).unwrap(), Some(240_000));
        assert!(compute_next_run(&CollectionSchedule::Every { every_ms: 0 }, 1).is_err());
    }

    #[test]
    fn timezone_shifts_daily_schedule() {
        let s = CollectionSchedule::Cron {
            expr: "0 9 * * *".into(),
            tz: Some("Europe/Paris".into()),
        };
        let next = compute_next_run(&s, NOW_MS).unwrap().unwrap();
        let dt = DateTime::from_timestamp_millis(next as i64).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = CollectorConfig {
            schedule: "every hour".into(),
            ..CollectorConfig::default()
        };
        assert!(matches!(
            CollectionSchedule::from_config(&cfg).unwrap_err(),
            Error::CronParse(_)
        ));

        cfg.schedule = "0 * * * *".into();
        cfg.timezone = Some("Mars/Olympus".into());
        assert!(matches!(
            CollectionSchedule::from_config(&cfg).unwrap_err(),
            Error::UnknownTimezone { .. }
        ));
    }

    #[test]
    fn interval_from_config_overrides_cron() {
        let mut cfg = CollectorConfig {
            schedule: "not used".into(),
            every_secs: Some(900),
            ..CollectorConfig::default()
        };
        let schedule = CollectionSchedule::from_config(&cfg).unwrap();
        assert_eq!(schedule, CollectionSchedule::Every { every_ms: 900_000 });
        assert_eq!(compute_next_run(&schedule, NOW_MS).unwrap(), Some(NOW_MS + 900_000));

        cfg.every_secs = Some(0);
        assert!(CollectionSchedule::from_config(&cfg).is_err());
    }

    #[test]
    fn six_field_expression_accepted() {
        let s = CollectionSchedule::Cron {
            expr: "30 0 * * * *".into(),
            tz: None,
        };
        let next = compute_next_run(&s, NOW_MS).unwrap().unwrap();
        assert_eq!(next % 3_600_000, 30_000);
    }
}
