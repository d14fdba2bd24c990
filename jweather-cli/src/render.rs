//! Terminal presentation of fetched weather.
//!
//! Every report is built as a `String` by a pure function so it can be
//! tested; [`TerminalPresenter`] only decides where the text goes. Reports
//! go to stdout; status lines and errors go to stderr.

use std::fmt::Write as _;

use jweather_core::{
    FieldSet, InputFields, Presenter, Reading, WeatherBundle, WeatherError,
    insight::{self, WEEKLY_ROWS},
    model::UNAVAILABLE,
};

const CHART_HEIGHT: usize = 8;
const CHART_CELL: usize = 3;
const BAR_WIDTH: usize = 30;

#[derive(Debug)]
pub struct TerminalPresenter {
    variant: FieldSet,
}

impl TerminalPresenter {
    pub fn new(variant: FieldSet) -> Self {
        Self { variant }
    }
}

impl Presenter for TerminalPresenter {
    fn status(&mut self, message: &str) {
        eprintln!("» {message}");
    }

    fn error(&mut self, error: &WeatherError) {
        eprintln!("Error: {error}");
    }

    fn fields_changed(&mut self, fields: &InputFields) {
        if !fields.latitude.is_empty() {
            eprintln!("  latitude {}  longitude {}", fields.latitude, fields.longitude);
        } else if !fields.city.is_empty() {
            eprintln!("  city {}", fields.city);
        }
    }

    fn render(&mut self, bundle: &WeatherBundle) {
        let report = match self.variant {
            FieldSet::Full => full_report(bundle),
            FieldSet::Minimal => minimal_report(bundle),
        };
        println!("{report}");
    }
}

fn whole(v: f64) -> i64 {
    v.round() as i64
}

pub fn full_report(bundle: &WeatherBundle) -> String {
    [current_card(bundle), hourly_chart(bundle), weekly(bundle)].join("\n")
}

/// Icon, temperature, description line and "feels like" meta line.
pub fn current_card(bundle: &WeatherBundle) -> String {
    let icon = insight::condition_icon(bundle);
    let temp = match bundle.number("temperature_2m") {
        Some(t) => format!("{}{}", whole(t), bundle.current_unit("temperature_2m", "°C")),
        None => "--°".to_string(),
    };

    let mut parts = Vec::new();
    for (field, label, fallback) in [
        ("relative_humidity_2m", "Humidity", "%"),
        ("wind_speed_10m", "Wind", " m/s"),
        ("wind_gusts_10m", "Gust", " m/s"),
    ] {
        let reading = bundle.reading(field);
        if reading.is_available() {
            parts.push(format!("{label} {reading}{}", bundle.current_unit(field, fallback)));
        }
    }
    if let reading @ Reading::Number(_) = bundle.reading("uv_index") {
        parts.push(format!("UV {reading}"));
    }

    let cloud = format!(
        "Cloud {}{}",
        bundle.reading("cloud_cover"),
        bundle.current_unit("cloud_cover", "%")
    );
    let meta = match (bundle.number("apparent_temperature"), bundle.number("temperature_2m")) {
        (Some(app), Some(_)) => format!(
            "Feels like {}{}  |  {cloud}",
            whole(app),
            bundle.current_unit("apparent_temperature", "°C")
        ),
        _ => cloud,
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}  {temp}  {}", icon.glyph(), icon.description());
    if !parts.is_empty() {
        let _ = writeln!(out, "{}", parts.join(" • "));
    }
    let _ = writeln!(out, "{meta}");
    out
}

/// Text line chart of the next 24 hourly temperatures.
pub fn hourly_chart(bundle: &WeatherBundle) -> String {
    let mut out = String::from("Next 24h\n");
    let points = insight::next_hours(bundle, 24);
    if points.is_empty() {
        out.push_str("  No hourly data\n");
        return out;
    }

    let unit = bundle.hourly_unit("temperature_2m", "°");
    let min = points.iter().map(|p| p.temperature).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.temperature).fold(f64::NEG_INFINITY, f64::max);
    let level = |v: f64| {
        if max == min {
            CHART_HEIGHT / 2
        } else {
            ((v - min) / (max - min) * (CHART_HEIGHT - 1) as f64).round() as usize
        }
    };

    for row in (0..CHART_HEIGHT).rev() {
        let axis = match row {
            r if r == CHART_HEIGHT - 1 => format!("{:>6} ┤", format!("{}{unit}", whole(max))),
            0 => format!("{:>6} ┤", format!("{}{unit}", whole(min))),
            _ => format!("{:>6} │", ""),
        };
        out.push_str(&axis);
        for point in &points {
            let mark = if level(point.temperature) == row { "●" } else { " " };
            let _ = write!(out, "{mark:>CHART_CELL$}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{:>6} └{}", "", "─".repeat(points.len() * CHART_CELL));

    let mut hours = format!("{:>8}", "");
    let mut temps = format!("{:>8}", "");
    for point in points.iter().step_by(3) {
        let hour = point.label.get(..2).unwrap_or(&point.label);
        let _ = write!(hours, "{:<width$}", hour, width = CHART_CELL * 3);
        let _ = write!(temps, "{:<width$}", format!("{}°", whole(point.temperature)), width = CHART_CELL * 3);
    }
    let _ = writeln!(out, "{}", hours.trim_end());
    let _ = writeln!(out, "{}", temps.trim_end());
    out
}

/// Weekly min/max bars with the trend headline.
pub fn weekly(bundle: &WeatherBundle) -> String {
    let Some(summary) = insight::weekly_summary(&bundle.daily) else {
        return "This Week — No data\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "This Week — {}–{}°, {}",
        whole(summary.min),
        whole(summary.max),
        summary.trend.as_str()
    );

    for day in summary.days.iter().take(WEEKLY_ROWS) {
        let icon = day.icon.map(|i| i.glyph()).unwrap_or(UNAVAILABLE);
        let bar = match day.bar {
            Some((start, end)) => bar(start, end),
            None => " ".repeat(BAR_WIDTH),
        };
        let hi = day.high.map(|v| format!("{}°", whole(v))).unwrap_or_else(|| UNAVAILABLE.into());
        let lo = day.low.map(|v| format!("{}°", whole(v))).unwrap_or_else(|| UNAVAILABLE.into());
        let _ = writeln!(out, "{icon} {:<4} {lo:>5} {bar} {hi:<5}", day.label);
    }
    out
}

fn bar(start: f64, end: f64) -> String {
    let from = ((start * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH - 1);
    let to = ((end * BAR_WIDTH as f64).round() as usize).max(from + 1).min(BAR_WIDTH);
    format!("{}{}{}", " ".repeat(from), "█".repeat(to - from), " ".repeat(BAR_WIDTH - to))
}

/// Plain text pane for the minimal variant.
pub fn minimal_report(bundle: &WeatherBundle) -> String {
    let mut out = String::from("Current conditions\n");
    if let Some(at) = bundle.observed_at() {
        let _ = writeln!(out, "  observed at: {at}");
    }
    for field in FieldSet::Minimal.current() {
        let reading = bundle.reading(field);
        let unit = if reading.is_available() { bundle.current_unit(field, "") } else { "" };
        let _ = writeln!(out, "  {field}: {reading}{unit}");
    }
    let _ = writeln!(out, "  location: {}", bundle.coordinate);
    out
}

/// Detail pane for the day at `index` of the weekly summary.
pub fn day_details(bundle: &WeatherBundle, index: usize) -> String {
    let Some(details) = insight::day_details(bundle, index) else {
        return format!("No data for day {}\n", index + 1);
    };

    let hi_unit = bundle.daily_unit("temperature_2m_max", "°");
    let lo_unit = bundle.daily_unit("temperature_2m_min", "°");
    let fmt = |v: Option<f64>, unit: &str| {
        v.map(|v| format!("{}{unit}", whole(v))).unwrap_or_else(|| format!("{UNAVAILABLE}{unit}"))
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}", details.title);
    let _ = writeln!(out, "High: {}", fmt(details.high, hi_unit));
    let _ = writeln!(out, "Low:  {}", fmt(details.low, lo_unit));

    match details.hourly {
        Some(h) => {
            let unit = bundle.hourly_unit("temperature_2m", "°");
            let bucket = |v: Option<f64>| v.map(|v| whole(v).to_string()).unwrap_or_else(|| UNAVAILABLE.into());
            let _ = writeln!(out, "Hourly min/max: {}{unit}/{}{unit}", whole(h.min), whole(h.max));
            let _ = writeln!(out, "Hourly average: {}{unit}", whole(h.average));
            let _ = writeln!(
                out,
                "Morning/Afternoon/Evening avg: {}{unit} / {}{unit} / {}{unit}",
                bucket(h.morning),
                bucket(h.afternoon),
                bucket(h.evening)
            );
        }
        None => out.push_str("No hourly breakdown available for this day.\n"),
    }
    out
}

/// Labels for the day picker, e.g. "Sat 2024-06-01".
pub fn day_labels(bundle: &WeatherBundle) -> Vec<String> {
    insight::weekly_summary(&bundle.daily)
        .map(|s| {
            s.days
                .iter()
                .zip(&bundle.daily.time)
                .map(|(day, iso)| format!("{} {iso}", day.label))
                .collect()
        })
        .unwrap_or_default()
}
