//! Reshaping helpers that turn reduction results into renderable series.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;

use crate::chart::colors::Palette;
use crate::chart::figure::{Figure, Glyph};
use crate::chart::Series;
use crate::error::EeError;

/// Date format used by the reduction helpers when keying values by image date.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Numeric `(x, y)` pairs per label, sorted by x.
pub type Points = IndexMap<String, Vec<(f64, f64)>>;

/// Keep only `labels`, in the given order.
pub fn select_labels(series: &Series, labels: &[String]) -> Result<Series, EeError> {
    labels
        .iter()
        .map(|label| {
            series
                .get(label)
                .map(|values| (label.clone(), values.clone()))
                .ok_or_else(|| EeError::ChartData(format!("unknown label: {label}")))
        })
        .collect()
}

/// Re-key every label by the same ordered list of categories.
pub fn select_categories(series: &Series, categories: &[String]) -> Result<Series, EeError> {
    series
        .iter()
        .map(|(label, values)| {
            let values = categories
                .iter()
                .map(|category| {
                    values
                        .get(category)
                        .map(|value| (category.clone(), *value))
                        .ok_or_else(|| {
                            EeError::ChartData(format!(
                                "label {label} has no value for {category}"
                            ))
                        })
                })
                .collect::<Result<IndexMap<_, _>, _>>()?;
            Ok((label.clone(), values))
        })
        .collect()
}

/// Swap labels and categories (by-features <-> by-properties).
pub fn transpose(series: &Series) -> Series {
    let mut out = Series::new();
    for (label, values) in series {
        for (category, value) in values {
            out.entry(category.clone())
                .or_default()
                .insert(label.clone(), *value);
        }
    }
    out
}

/// Categories of the first label, which every layout uses as its x axis.
pub fn categories(series: &Series) -> Vec<String> {
    series
        .values()
        .next()
        .map(|values| values.keys().cloned().collect())
        .unwrap_or_default()
}

pub fn parse_date(value: &str) -> Result<DateTime<Utc>, EeError> {
    let value = value.trim();
    if let Ok(time) = NaiveDateTime::parse_from_str(value, DATE_FORMAT) {
        return Ok(time.and_utc());
    }
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(time) = date.and_hms_opt(0, 0, 0) {
            return Ok(time.and_utc());
        }
    }
    Err(EeError::InvalidDate(value.to_string()))
}

/// Parse every category as a timestamp; x is epoch milliseconds.
pub fn to_date_series(series: &Series) -> Result<Points, EeError> {
    to_points(series, |key| {
        parse_date(key).map(|time| time.timestamp_millis() as f64)
    })
}

/// Parse every category as an integer day of year.
pub fn to_doy_series(series: &Series) -> Result<Points, EeError> {
    to_points(series, |key| {
        key.trim()
            .parse::<i64>()
            .map(|day| day as f64)
            .map_err(|_| EeError::ChartData(format!("not a day of year: {key}")))
    })
}

fn to_points(
    series: &Series,
    parse: impl Fn(&str) -> Result<f64, EeError>,
) -> Result<Points, EeError> {
    series
        .iter()
        .map(|(label, values)| {
            let mut points = values
                .iter()
                .map(|(key, value)| Ok((parse(key)?, *value)))
                .collect::<Result<Vec<_>, EeError>>()?;
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            Ok((label.clone(), points))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub counts: Vec<u64>,
    /// `counts.len() + 1` bin edges.
    pub edges: Vec<f64>,
}

impl Histogram {
    pub fn centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|edge| (edge[0] + edge[1]) / 2.0)
            .collect()
    }

    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }
}

/// Equal-width histogram over the value range; the last bin is closed.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram, EeError> {
    if bins == 0 {
        return Err(EeError::ChartData("histogram needs at least one bin".into()));
    }
    if values.iter().any(|value| !value.is_finite()) {
        return Err(EeError::ChartData(
            "histogram values must be finite".into(),
        ));
    }

    let (mut low, mut high) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
            (low.min(*value), high.max(*value))
        });
    if values.is_empty() {
        (low, high) = (0.0, 1.0);
    } else if low == high {
        (low, high) = (low - 0.5, high + 0.5);
    }

    let step = (high - low) / bins as f64;
    let mut edges: Vec<f64> = (0..=bins).map(|i| low + step * i as f64).collect();
    edges[bins] = high;

    let mut counts = vec![0u64; bins];
    for value in values {
        let mut index = (((value - low) / (high - low)) * bins as f64) as usize;
        index = index.min(bins - 1);
        // float rounding can put the value one bin off its edges
        if *value < edges[index] && index > 0 {
            index -= 1;
        } else if index + 1 < bins && *value >= edges[index + 1] {
            index += 1;
        }
        counts[index] += 1;
    }
    Ok(Histogram { counts, edges })
}

/// Draw a histogram as bars centered on each bin.
pub fn render_histogram(
    histogram: &Histogram,
    label: &str,
    color: Option<&str>,
    target: Option<Figure>,
) -> Figure {
    let mut figure = target.unwrap_or_default();
    let color = color
        .map(str::to_string)
        .unwrap_or_else(|| Palette::new(None).color(0));
    let pane = figure.main_pane_mut();
    pane.push(Glyph::Vbar {
        x: histogram.centers(),
        top: histogram.counts.iter().map(|count| *count as f64).collect(),
        width: histogram.bin_width() * 0.9,
        color,
        legend: None,
    });
    pane.x_axis.label = Some(label.to_string());
    pane.y_axis.label = Some("frequency".to_string());
    pane.x_grid = false;
    pane.outline = false;
    figure
}

/// Turn `[bin start, count]` pairs into a step outline, truncating x to `precision` decimals.
pub fn step_points(bins: &[(f64, f64)], precision: i32) -> (Vec<f64>, Vec<f64>) {
    let scale = 10f64.powi(precision);
    let x = bins
        .iter()
        .flat_map(|(start, _)| {
            let start = (start * scale).trunc() / scale;
            [start, start]
        })
        .skip(1)
        .collect::<Vec<_>>();
    let mut y = bins
        .iter()
        .flat_map(|(_, count)| [count.trunc(), count.trunc()])
        .collect::<Vec<_>>();
    y.pop();
    (x, y)
}

/// Draw per-band fixed histograms as filled step outlines.
pub fn render_step_histogram(
    bands: &IndexMap<String, Vec<(f64, f64)>>,
    colors: Option<&[String]>,
    precision: i32,
    target: Option<Figure>,
) -> Result<Figure, EeError> {
    if bands.is_empty() {
        return Err(EeError::ChartData("no band to draw".into()));
    }
    let palette = Palette::new(colors);
    let mut figure = target.unwrap_or_default();
    let pane = figure.main_pane_mut();
    for (i, (band, bins)) in bands.iter().enumerate() {
        if bins.is_empty() {
            return Err(EeError::ChartData(format!("band {band} has no bins")));
        }
        let (x, y) = step_points(bins, precision);
        let color = palette.color(i);
        pane.push(Glyph::Varea {
            x: x.clone(),
            y1: vec![0.0; y.len()],
            y2: y.clone(),
            color: color.clone(),
            alpha: 0.2,
            legend: Some(band.clone()),
        });
        pane.push(Glyph::Line {
            x,
            y,
            color,
            legend: Some(band.clone()),
        });
    }
    pane.y_axis.label = Some("Count".to_string());
    pane.x_grid = false;
    pane.outline = false;
    Ok(figure)
}
