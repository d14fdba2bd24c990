//! Derived views over a [`WeatherBundle`]: condition icon, weekly summary,
//! per-day breakdown, next-hours window. Pure functions; renderers format them.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::model::{Daily, WeatherBundle};

const HOURLY_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionIcon {
    Snow,
    Rain,
    Clear,
    Night,
    PartlyCloudy,
    Cloudy,
}

impl ConditionIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Snow => "🌨",
            Self::Rain => "🌧",
            Self::Clear => "☀",
            Self::Night => "🌙",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Snow => "Snow",
            Self::Rain => "Rain",
            Self::Clear => "Clear",
            Self::Night => "Clear night",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Cloudy => "Cloudy",
        }
    }
}

/// Snow beats rain beats cloud cover; clear skies depend on `is_day`.
pub fn condition_icon(bundle: &WeatherBundle) -> ConditionIcon {
    let positive = |field: &str| bundle.number(field).is_some_and(|v| v > 0.0);
    let clear = if bundle.number("is_day").is_none_or(|v| v != 0.0) {
        ConditionIcon::Clear
    } else {
        ConditionIcon::Night
    };

    if positive("snowfall") {
        return ConditionIcon::Snow;
    }
    if positive("rain") {
        return ConditionIcon::Rain;
    }

    match bundle.number("cloud_cover") {
        None => clear,
        Some(cc) if cc < 20.0 => clear,
        Some(cc) if cc < 60.0 => ConditionIcon::PartlyCloudy,
        Some(_) => ConditionIcon::Cloudy,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayIcon {
    Hot,
    Cold,
    Mild,
}

impl DayIcon {
    pub fn from_high(high: f64) -> Self {
        if high >= 30.0 {
            DayIcon::Hot
        } else if high <= 0.0 {
            DayIcon::Cold
        } else {
            DayIcon::Mild
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            DayIcon::Hot => "🔥",
            DayIcon::Cold => "❄",
            DayIcon::Mild => "⛅",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Warming,
    Cooling,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Warming => "warming",
            Trend::Cooling => "cooling",
            Trend::Stable => "stable",
        }
    }
}

/// Compare the high five days out (or the last day) with today's high.
pub fn weekly_trend(daily: &Daily) -> Trend {
    let highs = &daily.temperature_max;
    if highs.len() < 2 {
        return Trend::Stable;
    }

    let later = highs[5.min(highs.len() - 1)];
    match (later, highs[0]) {
        (Some(later), Some(first)) if later - first > 2.0 => Trend::Warming,
        (Some(later), Some(first)) if later - first < -2.0 => Trend::Cooling,
        _ => Trend::Stable,
    }
}

/// One row of the weekly summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRow {
    pub date: Option<NaiveDate>,
    pub label: String,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub icon: Option<DayIcon>,
    /// Bar extent as fractions of the weekly min..max range.
    pub bar: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
    pub days: Vec<DayRow>,
}

pub const WEEKLY_ROWS: usize = 6;

/// `None` when the bundle carries no daily highs or lows.
pub fn weekly_summary(daily: &Daily) -> Option<WeeklySummary> {
    if daily.is_empty() {
        return None;
    }

    let min = daily.temperature_min.iter().flatten().copied().reduce(f64::min)?;
    let max = daily.temperature_max.iter().flatten().copied().reduce(f64::max)?;
    let scale = |v: f64| if max == min { 0.0 } else { (v - min) / (max - min) };

    let days = daily
        .time
        .iter()
        .take(WEEKLY_ROWS)
        .enumerate()
        .map(|(idx, iso)| {
            let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok();
            let high = daily.temperature_max.get(idx).copied().flatten();
            let low = daily.temperature_min.get(idx).copied().flatten();

            DayRow {
                date,
                label: date.map(|d| d.format("%a").to_string()).unwrap_or_else(|| format!("D{}", idx + 1)),
                high,
                low,
                icon: high.map(DayIcon::from_high),
                bar: low.zip(high).map(|(lo, hi)| (scale(lo), scale(hi))),
            }
        })
        .collect();

    Some(WeeklySummary { min, max, trend: weekly_trend(daily), days })
}

/// Hourly statistics for a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyBreakdown {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub morning: Option<f64>,
    pub afternoon: Option<f64>,
    pub evening: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayDetails {
    pub title: String,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub hourly: Option<HourlyBreakdown>,
}

/// Details for the day at `index` of the daily series.
pub fn day_details(bundle: &WeatherBundle, index: usize) -> Option<DayDetails> {
    let daily = &bundle.daily;
    let iso = daily.time.get(index)?;
    let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok();

    let title = date
        .map(|d| d.format("%A, %b %d").to_string())
        .unwrap_or_else(|| format!("Day {} Details", index + 1));

    Some(DayDetails {
        title,
        high: daily.temperature_max.get(index).copied().flatten(),
        low: daily.temperature_min.get(index).copied().flatten(),
        hourly: hourly_breakdown(bundle, iso),
    })
}

fn hourly_breakdown(bundle: &WeatherBundle, iso_date: &str) -> Option<HourlyBreakdown> {
    let hourly = &bundle.hourly;
    if hourly.time.len() != hourly.temperature.len() {
        return None;
    }

    let samples: Vec<(u32, f64)> = hourly
        .time
        .iter()
        .zip(&hourly.temperature)
        .filter(|(time, _)| time.starts_with(iso_date))
        .filter_map(|(time, temp)| {
            let hour = NaiveDateTime::parse_from_str(time, HOURLY_FORMAT).ok()?.hour();
            Some((hour, (*temp)?))
        })
        .collect();

    if samples.is_empty() {
        return None;
    }

    let values = samples.iter().map(|(_, v)| *v);
    let bucket = |start: u32, end: u32| {
        average(samples.iter().filter(|(h, _)| (start..end).contains(h)).map(|(_, v)| *v))
    };

    Some(HourlyBreakdown {
        min: values.clone().fold(f64::INFINITY, f64::min),
        max: values.clone().fold(f64::NEG_INFINITY, f64::max),
        average: average(values)?,
        morning: bucket(6, 12),
        afternoon: bucket(12, 18),
        evening: bucket(18, 24),
    })
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// A labelled point on the next-hours chart.
#[derive(Debug, Clone, PartialEq)]
pub struct HourPoint {
    pub label: String,
    pub temperature: f64,
}

/// Up to `count` hourly temperatures starting at the observation hour.
///
/// The hourly series itself starts at local midnight of the first forecast
/// day, so the window skips the hours already past instead of showing the
/// first `count` entries. Falls back to the start of the series when the
/// bundle has no current timestamp or the timestamp is past the end of the
/// series.
pub fn next_hours(bundle: &WeatherBundle, count: usize) -> Vec<HourPoint> {
    let hourly = &bundle.hourly;
    let start = bundle
        .observed_at()
        .and_then(|now| now.get(..13))
        .and_then(|hour_prefix| hourly.time.iter().position(|t| t.as_str() >= hour_prefix))
        .unwrap_or(0);

    hourly
        .time
        .iter()
        .zip(&hourly.temperature)
        .skip(start)
        .take(count)
        .filter_map(|(time, temp)| {
            let label = NaiveDateTime::parse_from_str(time, HOURLY_FORMAT)
                .map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|_| time.clone());
            Some(HourPoint { label, temperature: (*temp)? })
        })
        .collect()
}
