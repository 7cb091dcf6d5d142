//! One line of the screening table.

use serde::{Deserialize, Serialize};
use surveil_core::domain::{CleanSeries, Instrument};
use surveil_core::{round2, ForecastOutcome, Status};

/// Column headers, in table order.
pub const COLUMNS: [&str; 11] = [
    "NAME",
    "TICKER",
    "ON MKT",
    "MIN",
    "AVG",
    "MAX",
    "FORECAST MIN",
    "FORECAST VALUE",
    "FORECAST MAX",
    "Δ% FORECAST",
    "STATUS",
];

/// Numeric fields are rounded to 2 decimals; `None` means missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRow {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "TICKER")]
    pub ticker: String,
    #[serde(rename = "ON MKT")]
    pub on_mkt: Option<f64>,
    #[serde(rename = "MIN")]
    pub min: Option<f64>,
    #[serde(rename = "AVG")]
    pub avg: Option<f64>,
    #[serde(rename = "MAX")]
    pub max: Option<f64>,
    #[serde(rename = "FORECAST MIN")]
    pub forecast_min: Option<f64>,
    #[serde(rename = "FORECAST VALUE")]
    pub forecast_value: Option<f64>,
    #[serde(rename = "FORECAST MAX")]
    pub forecast_max: Option<f64>,
    #[serde(rename = "Δ% FORECAST")]
    pub delta_pct: Option<f64>,
    #[serde(rename = "STATUS")]
    pub status: Status,
}

impl ScreeningRow {
    /// Name, ticker and status only.
    pub fn empty(instrument: &Instrument, status: Status) -> Self {
        Self {
            name: instrument.display_name.clone(),
            ticker: instrument.symbol.clone(),
            on_mkt: None,
            min: None,
            avg: None,
            max: None,
            forecast_min: None,
            forecast_value: None,
            forecast_max: None,
            delta_pct: None,
            status,
        }
    }

    /// Last price and window statistics, no forecast.
    pub fn with_stats(
        instrument: &Instrument,
        on_mkt: Option<f64>,
        series: &CleanSeries,
        status: Status,
    ) -> Self {
        Self {
            on_mkt: on_mkt.map(round2),
            min: Some(round2(series.min())),
            avg: Some(round2(series.mean())),
            max: Some(round2(series.max())),
            ..Self::empty(instrument, status)
        }
    }

    pub fn with_forecast(mut self, outcome: &ForecastOutcome) -> Self {
        self.forecast_min = Some(outcome.lower);
        self.forecast_value = Some(outcome.point);
        self.forecast_max = Some(outcome.upper);
        self.delta_pct = delta_pct(outcome.point, self.on_mkt);
        self
    }

    /// Cell values in column order.
    pub fn cells(&self) -> [Option<String>; 11] {
        let num = |v: Option<f64>| v.map(|x| format!("{x:.2}"));
        [
            Some(self.name.clone()),
            Some(self.ticker.clone()),
            num(self.on_mkt),
            num(self.min),
            num(self.avg),
            num(self.max),
            num(self.forecast_min),
            num(self.forecast_value),
            num(self.forecast_max),
            num(self.delta_pct),
            Some(self.status.to_string()),
        ]
    }
}

/// Percent change from `on_mkt` to `point`, rounded. Missing when there is
/// no last price or it is zero.
pub fn delta_pct(point: f64, on_mkt: Option<f64>) -> Option<f64> {
    let on_mkt = on_mkt.filter(|v| *v != 0.0)?;
    let pct = (point - on_mkt) / on_mkt * 100.0;
    pct.is_finite().then(|| round2(pct))
}
