use chrono::{Datelike, NaiveDate, Weekday};
use trailplan::workflows::outing::schedule::{weekends, VoteOptionGenerator, NO_FORECAST};
use trailplan::workflows::outing::weather::{ForecastError, ForecastGateway};

struct FixedForecast;

impl ForecastGateway for FixedForecast {
    fn forecast(
        &self,
        date: NaiveDate,
        _location: &str,
    ) -> Result<Option<String>, ForecastError> {
        Ok(Some(format!("晴，{}-18℃", date.day() % 10)))
    }
}

struct BrokenForecast;

impl ForecastGateway for BrokenForecast {
    fn forecast(
        &self,
        _date: NaiveDate,
        _location: &str,
    ) -> Result<Option<String>, ForecastError> {
        Err(ForecastError::Transport("connection timed out".to_string()))
    }
}

#[test]
fn weekends_returns_only_saturdays_and_sundays_ascending() {
    for (year, month) in [(2024, 2), (2025, 2), (2025, 6), (2025, 11), (2026, 1)] {
        let dates = weekends(year, month);
        assert!(!dates.is_empty(), "{year}-{month} has weekend days");
        assert!(dates
            .iter()
            .all(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun)));
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(dates.iter().all(|d| d.year() == year && d.month() == month));
    }
}

#[test]
fn weekends_length_matches_a_manual_calendar_walk() {
    for (year, month) in [(2024, 2), (2025, 11), (2025, 12)] {
        let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
        let expected = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .filter(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count();
        assert_eq!(weekends(year, month).len(), expected);
    }
}

#[test]
fn november_2025_scenario_yields_the_ten_known_dates() {
    let dates = weekends(2025, 11);
    let expected: Vec<NaiveDate> = [1, 2, 8, 9, 15, 16, 22, 23, 29, 30]
        .into_iter()
        .map(|day| NaiveDate::from_ymd_opt(2025, 11, day).expect("valid date"))
        .collect();
    assert_eq!(dates, expected);
}

#[test]
fn generated_options_mirror_the_weekend_dates_in_order() {
    let generator = VoteOptionGenerator::new(Box::new(FixedForecast));
    let options = generator.generate(2025, 11, "苏州");
    let dates = weekends(2025, 11);

    assert_eq!(options.len(), dates.len());
    for (option, date) in options.iter().zip(dates) {
        assert_eq!(option.date, date);
        assert!(option.weather.starts_with('晴'));
    }
}

#[test]
fn labels_carry_the_two_character_weekday_name() {
    let generator = VoteOptionGenerator::new(Box::new(FixedForecast));
    let options = generator.generate(2025, 11, "苏州");

    assert_eq!(options[0].label, "2025-11-01（周六）");
    assert_eq!(options[1].label, "2025-11-02（周日）");
    assert!(options
        .iter()
        .all(|o| o.label.ends_with("（周六）") || o.label.ends_with("（周日）")));
}

#[test]
fn provider_failure_degrades_every_option_to_the_sentinel() {
    let generator = VoteOptionGenerator::new(Box::new(BrokenForecast));
    let options = generator.generate(2025, 11, "苏州");

    assert_eq!(options.len(), 10);
    assert!(options.iter().all(|o| o.weather == NO_FORECAST));
}

#[test]
fn generation_is_stable_across_repeated_calls() {
    let generator = VoteOptionGenerator::new(Box::new(FixedForecast));
    let first = generator.generate(2026, 3, "上海");
    let second = generator.generate(2026, 3, "上海");
    assert_eq!(first, second);
}
