//! Open-Meteo daily weather history.

use crate::{ApiError, Client};
use chrono::NaiveDate;
use geo::Coord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily precipitation above this many millimeters counts as a wet
/// day.
pub const WET_DAY_MM: f64 = 0.1;

/// Open-Meteo's forecast endpoint serves at most this many past days.
const MAX_PAST_DAYS: u32 = 92;

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,temperature_2m_mean,\
                            precipitation_sum,rain_sum,snowfall_sum";

/// Parallel daily series as returned by Open-Meteo.
///
/// A series is `None` if the field was absent from the response;
/// individual days are `None` where the model has no value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    #[serde(default)]
    pub time: Vec<String>,

    #[serde(default)]
    pub temperature_2m_max: Option<Vec<Option<f64>>>,

    #[serde(default)]
    pub temperature_2m_min: Option<Vec<Option<f64>>>,

    #[serde(default)]
    pub temperature_2m_mean: Option<Vec<Option<f64>>>,

    #[serde(default)]
    pub precipitation_sum: Option<Vec<Option<f64>>>,

    #[serde(default)]
    pub rain_sum: Option<Vec<Option<f64>>>,

    #[serde(default)]
    pub snowfall_sum: Option<Vec<Option<f64>>>,
}

/// Summary of one series with nulls excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Number of non-null days.
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,

    /// Days strictly above [`WET_DAY_MM`].
    pub wet_days: usize,
}

impl SeriesStats {
    /// Returns `None` if `series` has no non-null values.
    pub fn from_series<'a, I>(series: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Option<f64>>,
    {
        let mut stats: Option<Self> = None;
        for val in series.into_iter().flatten().copied() {
            let s = stats.get_or_insert(Self {
                count: 0,
                total: 0.0,
                mean: 0.0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
                wet_days: 0,
            });
            s.count += 1;
            s.total += val;
            s.min = s.min.min(val);
            s.max = s.max.max(val);
            if val > WET_DAY_MM {
                s.wet_days += 1;
            }
        }
        stats.map(|mut s| {
            #[allow(clippy::cast_precision_loss)]
            let n = s.count as f64;
            s.mean = s.total / n;
            s
        })
    }
}

/// Per-month aggregates: temperatures are averaged, precipitation is
/// summed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precip_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_sum: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherHistory {
    /// `None` if the response had no `daily` block.
    pub daily: Option<DailySeries>,

    /// Keyed by `YYYY-MM`.
    pub monthly: BTreeMap<String, MonthlySummary>,
}

impl WeatherHistory {
    pub fn from_daily(daily: Option<DailySeries>) -> Self {
        let monthly = daily.as_ref().map(monthly_summaries).unwrap_or_default();
        Self { daily, monthly }
    }
}

fn monthly_summaries(daily: &DailySeries) -> BTreeMap<String, MonthlySummary> {
    // Indices of `daily.time` grouped by month.
    let mut months: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, date) in daily.time.iter().enumerate() {
        if let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            months
                .entry(date.format("%Y-%m").to_string())
                .or_default()
                .push(idx);
        }
    }

    months
        .into_iter()
        .map(|(month, days)| {
            let summary = MonthlySummary {
                temp_max: month_stats(&daily.temperature_2m_max, &days).map(|s| s.mean),
                temp_min: month_stats(&daily.temperature_2m_min, &days).map(|s| s.mean),
                temp_mean: month_stats(&daily.temperature_2m_mean, &days).map(|s| s.mean),
                precip_sum: month_stats(&daily.precipitation_sum, &days).map(|s| s.total),
                rain_sum: month_stats(&daily.rain_sum, &days).map(|s| s.total),
                snow_sum: month_stats(&daily.snowfall_sum, &days).map(|s| s.total),
            };
            (month, summary)
        })
        .collect()
}

/// Stats for the days at `days` in `series`.
fn month_stats(series: &Option<Vec<Option<f64>>>, days: &[usize]) -> Option<SeriesStats> {
    let series = series.as_ref()?;
    let picked: Vec<Option<f64>> = days
        .iter()
        .map(|&idx| series.get(idx).copied().flatten())
        .collect();
    SeriesStats::from_series(&picked)
}

#[derive(Deserialize)]
struct ForecastResponse {
    daily: Option<DailySeries>,
}

impl Client {
    /// Daily weather for roughly the last `months` months (capped at
    /// the 92 days the forecast endpoint keeps).
    pub fn weather_history(&self, coord: Coord, months: u32) -> Result<WeatherHistory, ApiError> {
        let url = format!("{}/forecast", self.config.open_meteo_url);
        let past_days = months.saturating_mul(30).min(MAX_PAST_DAYS);
        let query = [
            ("latitude", coord.y.to_string()),
            ("longitude", coord.x.to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("past_days", past_days.to_string()),
        ];
        let response: ForecastResponse = self.get_json("Open-Meteo weather", &url, &query)?;
        Ok(WeatherHistory::from_daily(response.daily))
    }
}
