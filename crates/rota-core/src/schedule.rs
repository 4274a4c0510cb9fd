//! Schedule collaborator boundary.
//!
//! The bot consumes schedules, it never computes them. The backend sits
//! behind `ScheduleProvider`; `format_schedule` is the pure formatter the
//! dispatcher renders replies with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{errors::Error, Result};

/// A user's current working-period schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulePlan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub weeks: u32,
}

/// Lookup port for the external schedule backend.
///
/// Implementations must distinguish "this user has no schedule"
/// (`Error::ScheduleNotFound`) from any other failure (`Error::Schedule`);
/// the dispatcher shows the user different messages for the two.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn get_schedule(&self, username: &str) -> Result<SchedulePlan>;
}

/// Pure, deterministic formatter: identical plans produce byte-identical text.
pub fn format_schedule(plan: &SchedulePlan) -> String {
    format!(
        "Your schedule:\nshift starts {}\nshift ends {}\nrepeats for {} week(s)",
        plan.start.format("%Y-%m-%d %H:%M UTC"),
        plan.end.format("%Y-%m-%d %H:%M UTC"),
        plan.weeks
    )
}

/// Thin client for the schedule backend's HTTP API.
///
/// `GET <base>/schedule/<username>`; a 404 means the user has no schedule,
/// anything else non-2xx is a generic backend failure.
pub struct HttpScheduleClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScheduleClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleDto {
    /// RFC 3339 timestamps.
    start: String,
    end: String,
    weeks: u32,
}

impl ScheduleDto {
    fn into_plan(self) -> Result<SchedulePlan> {
        let parse = |field: &str, s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Schedule(format!("bad {field} timestamp: {e}")))
        };
        Ok(SchedulePlan {
            start: parse("start", &self.start)?,
            end: parse("end", &self.end)?,
            weeks: self.weeks,
        })
    }
}

#[async_trait]
impl ScheduleProvider for HttpScheduleClient {
    async fn get_schedule(&self, username: &str) -> Result<SchedulePlan> {
        let url = format!(
            "{}/schedule/{username}",
            self.base_url.trim_end_matches('/')
        );

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Schedule(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ScheduleNotFound);
        }
        if !resp.status().is_success() {
            return Err(Error::Schedule(format!(
                "schedule backend returned {}",
                resp.status()
            )));
        }

        let dto: ScheduleDto = resp
            .json()
            .await
            .map_err(|e| Error::Schedule(e.to_string()))?;
        dto.into_plan()
    }
}
