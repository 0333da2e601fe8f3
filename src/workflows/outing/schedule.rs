use chrono::{Datelike, NaiveDate, Weekday};

use super::domain::VoteOptionDraft;
use super::weather::ForecastGateway;

/// Degraded-data sentinel used when the forecast gateway cannot answer.
pub const NO_FORECAST: &str = "天气暂无数据";

pub(crate) const fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}

/// All and only the Saturdays and Sundays of the month, ascending. Pure
/// calendar computation; an out-of-range month yields an empty sequence.
pub fn weekends(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.month() == month)
        .filter(|date| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Turns a month's weekends into labeled vote options, each annotated with
/// the forecast for its date.
pub struct VoteOptionGenerator {
    forecast: Box<dyn ForecastGateway>,
}

impl VoteOptionGenerator {
    pub fn new(forecast: Box<dyn ForecastGateway>) -> Self {
        Self { forecast }
    }

    /// One draft per weekend date, chronological. A gateway failure or a
    /// date the provider does not cover degrades to [`NO_FORECAST`]; it
    /// never aborts the sequence.
    pub fn generate(&self, year: i32, month: u32, location: &str) -> Vec<VoteOptionDraft> {
        weekends(year, month)
            .into_iter()
            .map(|date| {
                let weather = match self.forecast.forecast(date, location) {
                    Ok(Some(summary)) => summary,
                    Ok(None) => NO_FORECAST.to_string(),
                    Err(err) => {
                        tracing::debug!(%date, %err, "forecast degraded to sentinel");
                        NO_FORECAST.to_string()
                    }
                };
                VoteOptionDraft {
                    label: format!("{date}（{}）", weekday_label(date.weekday())),
                    date,
                    weather,
                }
            })
            .collect()
    }
}
