//! Chart dispatcher: turns a label -> category -> value series into a [`Figure`].

pub mod colors;
pub mod figure;
pub mod shaper;

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::EeError;
use colors::Palette;
pub use figure::{Axis, AxisScale, Figure, Glyph, LegendItem, Pane, PaneRole, Range, StackLayer, Tick};
use shaper::Points;

/// label -> ordered category -> value
pub type Series = IndexMap<String, IndexMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Plot,
    Scatter,
    #[value(name = "fill_between")]
    FillBetween,
    Bar,
    Barh,
    Stacked,
    Pie,
    Donut,
    Date,
    Doy,
}

impl ChartKind {
    pub const ALL: [ChartKind; 10] = [
        ChartKind::Plot,
        ChartKind::Scatter,
        ChartKind::FillBetween,
        ChartKind::Bar,
        ChartKind::Barh,
        ChartKind::Stacked,
        ChartKind::Pie,
        ChartKind::Donut,
        ChartKind::Date,
        ChartKind::Doy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Plot => "plot",
            ChartKind::Scatter => "scatter",
            ChartKind::FillBetween => "fill_between",
            ChartKind::Bar => "bar",
            ChartKind::Barh => "barh",
            ChartKind::Stacked => "stacked",
            ChartKind::Pie => "pie",
            ChartKind::Donut => "donut",
            ChartKind::Date => "date",
            ChartKind::Doy => "doy",
        }
    }

    fn is_bar_family(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Barh | ChartKind::Stacked)
    }

    fn is_circular(self) -> bool {
        matches!(self, ChartKind::Pie | ChartKind::Donut)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = EeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EeError::UnsupportedChartKind(value.to_string()))
    }
}

/// Render `series` as a `kind` chart, appending to `target` when given.
///
/// Colors are taken from `colors` in label order (category order for pie and
/// donut) and cycle when there are more labels than colors; without a list the
/// `tab10` palette is used.
pub fn render(
    kind: ChartKind,
    series: &Series,
    label_name: &str,
    colors: Option<&[String]>,
    target: Option<Figure>,
) -> Result<Figure, EeError> {
    validate(kind, series)?;
    let palette = Palette::new(colors);
    let mut figure = target.unwrap_or_default();

    tracing::debug!(kind = %kind, labels = series.len(), "rendering chart");
    match kind {
        ChartKind::Plot | ChartKind::Scatter | ChartKind::FillBetween => {
            draw_indexed(kind, series, label_name, palette, figure.main_pane_mut())
        }
        ChartKind::Bar => draw_bar(series, palette, figure.main_pane_mut()),
        ChartKind::Barh => draw_barh(series, palette, figure.main_pane_mut()),
        ChartKind::Stacked => draw_stacked(series, palette, figure.main_pane_mut()),
        ChartKind::Pie | ChartKind::Donut => {
            draw_circular(kind, series, palette, figure.main_pane_mut())
        }
        ChartKind::Date => draw_date(series, palette, &mut figure)?,
        ChartKind::Doy => draw_doy(series, palette, figure.main_pane_mut())?,
    }

    for pane in &mut figure.panes {
        pane.outline = false;
    }
    Ok(figure)
}

/// Same as [`render`] but with the kind given as text, e.g. from a notebook call.
pub fn render_named(
    kind: &str,
    series: &Series,
    label_name: &str,
    colors: Option<&[String]>,
    target: Option<Figure>,
) -> Result<Figure, EeError> {
    render(kind.parse()?, series, label_name, colors, target)
}

fn validate(kind: ChartKind, series: &Series) -> Result<(), EeError> {
    let Some((first_label, first)) = series.first() else {
        return Err(EeError::ChartData("series has no label".into()));
    };
    if let Some((label, _)) = series.iter().find(|(_, values)| values.is_empty()) {
        return Err(EeError::ChartData(format!("label {label} has no value")));
    }

    if kind.is_bar_family() {
        for (label, values) in series {
            if !values.keys().eq(first.keys()) {
                return Err(EeError::ChartData(format!(
                    "label {label} does not share the categories of {first_label}"
                )));
            }
        }
    }

    if kind.is_circular() {
        if series.len() != 1 {
            return Err(EeError::ChartData(format!(
                "{kind} chart can only be used with one label, got {}",
                series.len()
            )));
        }
        let total: f64 = first.values().sum();
        if !(total > 0.0) || first.values().any(|value| *value < 0.0) {
            return Err(EeError::ChartData(format!(
                "{kind} chart needs non-negative values with a positive total"
            )));
        }
    }
    Ok(())
}

fn category_ticks(categories: &[String]) -> Vec<Tick> {
    categories
        .iter()
        .enumerate()
        .map(|(i, category)| Tick::new(i as f64, category.clone()))
        .collect()
}

fn draw_indexed(
    kind: ChartKind,
    series: &Series,
    label_name: &str,
    palette: Palette<'_>,
    pane: &mut Pane,
) {
    let categories = shaper::categories(series);
    for (i, (label, values)) in series.iter().enumerate() {
        let x: Vec<f64> = (0..values.len()).map(|index| index as f64).collect();
        let y: Vec<f64> = values.values().copied().collect();
        let color = palette.color(i);
        let legend = Some(label.clone());
        match kind {
            ChartKind::Scatter => pane.push(Glyph::Scatter { x, y, color, legend }),
            ChartKind::FillBetween => {
                pane.push(Glyph::Varea {
                    x: x.clone(),
                    y1: vec![0.0; y.len()],
                    y2: y.clone(),
                    color: color.clone(),
                    alpha: 0.2,
                    legend: legend.clone(),
                });
                pane.push(Glyph::Line { x, y, color, legend });
            }
            _ => pane.push(Glyph::Line { x, y, color, legend }),
        }
    }

    pane.x_axis.ticks = Some(category_ticks(&categories));
    pane.y_axis.label = Some(match categories.as_slice() {
        [single] => single.clone(),
        _ => "Properties values".to_string(),
    });
    pane.x_axis.label = Some(format!("Features (labeled by {label_name})"));
    pane.x_grid = false;
}

/// Grouped layout shared by `bar` and `barh`: slot width, bar size and tick positions.
struct Grouping {
    width: f64,
    margin: f64,
    ticks: Vec<Tick>,
}

impl Grouping {
    fn new(categories: &[String], labels: usize) -> Self {
        let width = 1.0 / (labels as f64 + 0.8);
        let offset = width * labels as f64 / 2.0;
        Self {
            width,
            margin: width / 10.0,
            ticks: categories
                .iter()
                .enumerate()
                .map(|(i, category)| Tick::new(i as f64 + offset, category.clone()))
                .collect(),
        }
    }

    fn positions(&self, slot: usize, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| i as f64 + self.width * slot as f64)
            .collect()
    }
}

fn draw_bar(series: &Series, palette: Palette<'_>, pane: &mut Pane) {
    let categories = shaper::categories(series);
    let grouping = Grouping::new(&categories, series.len());
    for (i, (label, values)) in series.iter().enumerate() {
        pane.push(Glyph::Vbar {
            x: grouping.positions(i, categories.len()),
            top: values.values().copied().collect(),
            width: grouping.width - grouping.margin,
            color: palette.color(i),
            legend: Some(label.clone()),
        });
    }
    pane.x_axis.ticks = Some(grouping.ticks);
    pane.x_grid = false;
}

fn draw_barh(series: &Series, palette: Palette<'_>, pane: &mut Pane) {
    let categories = shaper::categories(series);
    let grouping = Grouping::new(&categories, series.len());
    for (i, (label, values)) in series.iter().enumerate() {
        pane.push(Glyph::Hbar {
            y: grouping.positions(i, categories.len()),
            right: values.values().copied().collect(),
            height: grouping.width - grouping.margin,
            color: palette.color(i),
            legend: Some(label.clone()),
        });
    }
    pane.y_axis.ticks = Some(grouping.ticks);
    pane.y_grid = false;
}

fn draw_stacked(series: &Series, palette: Palette<'_>, pane: &mut Pane) {
    let categories = shaper::categories(series);
    let layers = series
        .iter()
        .enumerate()
        .map(|(i, (label, values))| StackLayer {
            label: label.clone(),
            color: palette.color(i),
            values: values.values().copied().collect(),
        })
        .collect();
    pane.push(Glyph::VbarStack {
        x: (0..categories.len()).map(|i| i as f64).collect(),
        width: 0.9,
        layers,
    });
    pane.x_axis.ticks = Some(category_ticks(&categories));
    pane.x_grid = false;
}

fn draw_circular(kind: ChartKind, series: &Series, palette: Palette<'_>, pane: &mut Pane) {
    let Some(values) = series.values().next() else {
        return;
    };
    let total: f64 = values.values().sum();
    let mut start_angle = 0.0;
    for (i, (category, value)) in values.iter().enumerate() {
        let end_angle = start_angle + value / total * 2.0 * PI;
        let color = palette.color(i);
        let legend = Some(category.clone());
        pane.push(match kind {
            ChartKind::Donut => Glyph::AnnularWedge {
                x: 0.0,
                y: 0.0,
                inner_radius: 0.5,
                outer_radius: 1.0,
                start_angle,
                end_angle,
                color,
                legend,
            },
            _ => Glyph::Wedge {
                x: 0.0,
                y: 0.0,
                radius: 1.0,
                start_angle,
                end_angle,
                color,
                legend,
            },
        });
        start_angle = end_angle;
    }
    pane.hide_axes();
    pane.x_range = Some(Range::new(-1.5, 1.5));
    pane.y_range = Some(Range::new(-1.5, 1.5));
    pane.x_grid = false;
    pane.y_grid = false;
}

fn push_lines(pane: &mut Pane, points: &Points, palette: Palette<'_>) {
    for (i, (label, points)) in points.iter().enumerate() {
        pane.push(Glyph::Line {
            x: points.iter().map(|(x, _)| *x).collect(),
            y: points.iter().map(|(_, y)| *y).collect(),
            color: palette.color(i),
            legend: Some(label.clone()),
        });
    }
}

fn x_extent(points: &Points) -> Option<Range> {
    let xs = points.values().flatten().map(|(x, _)| *x);
    let (min, max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
        (min.min(x), max.max(x))
    });
    (min <= max).then(|| Range::new(min, max))
}

fn draw_date(series: &Series, palette: Palette<'_>, figure: &mut Figure) -> Result<(), EeError> {
    let points = shaper::to_date_series(series)?;
    let extent = x_extent(&points);

    let main = figure.main_pane_mut();
    main.role = Some(PaneRole::Main);
    push_lines(main, &points, palette);
    main.x_axis.label = Some("Date".to_string());
    main.x_axis.scale = AxisScale::Datetime;
    main.x_range = extent;

    if figure.panes.len() < 2 {
        figure.panes.push(Pane {
            role: Some(PaneRole::Overview),
            y_grid: false,
            ..Pane::default()
        });
    }
    let overview = &mut figure.panes[1];
    push_lines(overview, &points, palette);
    overview.legend.clear();
    overview.x_axis.scale = AxisScale::Datetime;
    overview.y_axis.visible = false;
    overview.selection = extent;
    Ok(())
}

/// Zero-based first day of every month in a non-leap year, labeled `Jan`..`Dec`.
pub fn month_ticks() -> Vec<Tick> {
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(2023, month, 1))
        .map(|date| Tick::new(date.ordinal0() as f64, date.format("%b").to_string()))
        .collect()
}

fn draw_doy(series: &Series, palette: Palette<'_>, pane: &mut Pane) -> Result<(), EeError> {
    let points = shaper::to_doy_series(series)?;
    push_lines(pane, &points, palette);
    pane.x_axis.label = Some("Day of year".to_string());
    pane.x_axis.ticks = Some(month_ticks());
    pane.x_range = x_extent(&points).map(|range| Range::new(range.start - 5.0, range.end + 5.0));
    Ok(())
}
