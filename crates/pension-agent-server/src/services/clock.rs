use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use serde::Serialize;

/// Current date and time as injected into the prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeInfo {
    pub current_time: String,
    pub timezone: String,
    pub formatted_date: String,
}

pub trait Clock: Send + Sync {
    fn now(&self) -> TimeInfo;
}

/// Wall clock in a fixed IANA timezone
#[derive(Debug, Clone)]
pub struct ZonedClock {
    tz: Tz,
}

impl ZonedClock {
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {}", timezone, e))?;
        Ok(Self { tz })
    }
}

impl Clock for ZonedClock {
    fn now(&self) -> TimeInfo {
        let now = Utc::now().with_timezone(&self.tz);
        TimeInfo {
            current_time: now.format("%H:%M:%S").to_string(),
            timezone: self.tz.name().to_string(),
            formatted_date: now.format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub TimeInfo);

#[cfg(test)]
impl FixedClock {
    pub fn santiago() -> Self {
        Self(TimeInfo {
            current_time: "10:30:00".into(),
            timezone: "America/Santiago".into(),
            formatted_date: "2026-10-16".into(),
        })
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> TimeInfo {
        self.0.clone()
    }
}
