use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

const QWEATHER_BASE_URL: &str = "https://devapi.qweather.com/v7";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// City ids the forecast provider understands. Unknown locations fall back
/// to 苏州, matching the catalog's home region.
const CITY_IDS: &[(&str, &str)] = &[("苏州", "101190401"), ("上海", "101020100")];
const DEFAULT_CITY_ID: &str = "101190401";

pub(crate) fn city_id(location: &str) -> &'static str {
    CITY_IDS
        .iter()
        .find(|(name, _)| *name == location)
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_CITY_ID)
}

#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("forecast provider not configured")]
    NotConfigured,
    #[error("forecast client unavailable: {0}")]
    Client(String),
    #[error("forecast request failed: {0}")]
    Transport(String),
    #[error("forecast provider rejected the request (code {0})")]
    Rejected(String),
}

/// Capability interface for forecast lookups. `Ok(None)` means the provider
/// answered but does not cover the requested date.
pub trait ForecastGateway: Send + Sync {
    fn forecast(&self, date: NaiveDate, location: &str)
        -> Result<Option<String>, ForecastError>;
}

/// Gateway that never has data; used where live lookups are not wanted
/// (previews, tests) so every option carries the degraded-data sentinel.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineForecast;

impl ForecastGateway for OfflineForecast {
    fn forecast(
        &self,
        _date: NaiveDate,
        _location: &str,
    ) -> Result<Option<String>, ForecastError> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct DailyForecastResponse {
    code: String,
    #[serde(default)]
    daily: Vec<DailyForecast>,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    #[serde(rename = "fxDate")]
    fx_date: String,
    #[serde(rename = "tempMin")]
    temp_min: String,
    #[serde(rename = "tempMax")]
    temp_max: String,
    #[serde(rename = "textDay")]
    text_day: String,
}

/// Blocking client for the QWeather 7-day forecast API.
pub struct QWeatherClient {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl QWeatherClient {
    pub fn new(api_key: Option<String>) -> Result<Self, ForecastError> {
        Self::with_base_url(api_key, QWEATHER_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ForecastError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ForecastError::Client(err.to_string()))?;
        Ok(Self {
            api_key,
            base_url: base_url.into(),
            client,
        })
    }
}

impl ForecastGateway for QWeatherClient {
    fn forecast(
        &self,
        date: NaiveDate,
        location: &str,
    ) -> Result<Option<String>, ForecastError> {
        let api_key = self.api_key.as_deref().ok_or(ForecastError::NotConfigured)?;

        let url = format!("{}/weather/7d", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[("location", city_id(location)), ("key", api_key)])
            .send()
            .map_err(|err| ForecastError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ForecastError::Rejected(response.status().to_string()));
        }

        let body: DailyForecastResponse = response
            .json()
            .map_err(|err| ForecastError::Transport(err.to_string()))?;
        if body.code != "200" {
            return Err(ForecastError::Rejected(body.code));
        }

        let wanted = date.format("%Y-%m-%d").to_string();
        Ok(body.daily.into_iter().find(|day| day.fx_date == wanted).map(
            |day| format!("{}，{}-{}℃", day.text_day, day.temp_min, day.temp_max),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_locations_resolve_to_their_city_ids() {
        assert_eq!(city_id("苏州"), "101190401");
        assert_eq!(city_id("上海"), "101020100");
    }

    #[test]
    fn unknown_locations_fall_back_to_the_default_city() {
        assert_eq!(city_id("杭州"), DEFAULT_CITY_ID);
    }

    #[test]
    fn unconfigured_client_reports_not_configured() {
        let client = QWeatherClient::new(None).expect("client builds");
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid date");
        assert!(matches!(
            client.forecast(date, "苏州"),
            Err(ForecastError::NotConfigured)
        ));
    }
}
