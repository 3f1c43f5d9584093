use std::f64::consts::PI;

use assert_matches::assert_matches;
use serde_json::json;

use eeview::chart::colors::TAB10;
use eeview::chart::{self, AxisScale, ChartKind, Glyph, PaneRole, Series};
use eeview::error::EeError;

fn series(value: serde_json::Value) -> Series {
    serde_json::from_value(value).unwrap()
}

#[test]
fn pie_spans_cover_the_circle() {
    let data = series(json!({"area": {"forest": 3.0, "water": 1.5, "urban": 0.25}}));
    let figure = chart::render(ChartKind::Pie, &data, "label", None, None).unwrap();
    let pane = figure.main_pane().unwrap();

    let total: f64 = pane.glyphs.iter().filter_map(Glyph::span).sum();
    assert!((total - 2.0 * PI).abs() < 1e-9);
    assert_eq!(pane.glyphs.len(), 3);
    assert!(!pane.x_axis.visible);
    assert!(!pane.y_axis.visible);
}

#[test]
fn bar_groups_one_color_per_label() {
    let data = series(json!({"A": {"x": 1, "y": 2}, "B": {"x": 3, "y": 4}}));
    let figure = chart::render(ChartKind::Bar, &data, "label", None, None).unwrap();
    let pane = figure.main_pane().unwrap();

    assert_eq!(pane.glyphs.len(), 2);
    for (glyph, color) in pane.glyphs.iter().zip(TAB10) {
        assert_matches!(glyph, Glyph::Vbar { x, top, color: c, .. } => {
            assert_eq!(x.len(), 2);
            assert_eq!(top.len(), 2);
            assert_eq!(c, color);
        });
    }
    let labels: Vec<_> = pane
        .x_axis
        .ticks
        .as_ref()
        .unwrap()
        .iter()
        .map(|tick| tick.label.as_str())
        .collect();
    assert_eq!(labels, vec!["x", "y"]);
    assert_eq!(pane.legend.len(), 2);
}

#[test]
fn barh_puts_ticks_on_y() {
    let data = series(json!({"A": {"x": 1, "y": 2}}));
    let figure = chart::render(ChartKind::Barh, &data, "label", None, None).unwrap();
    let pane = figure.main_pane().unwrap();
    assert_matches!(&pane.glyphs[0], Glyph::Hbar { right, .. } => {
        assert_eq!(right, &vec![1.0, 2.0]);
    });
    assert!(pane.x_axis.ticks.is_none());
    assert_eq!(pane.y_axis.ticks.as_ref().unwrap().len(), 2);
}

#[test]
fn stacked_layers_follow_label_order() {
    let data = series(json!({"A": {"x": 1, "y": 2}, "B": {"x": 3, "y": 4}}));
    let colors = vec!["red".to_string()];
    let figure = chart::render(ChartKind::Stacked, &data, "label", Some(&colors), None).unwrap();
    assert_matches!(&figure.main_pane().unwrap().glyphs[0], Glyph::VbarStack { layers, width, .. } => {
        assert_eq!(*width, 0.9);
        assert_eq!(layers[0].label, "A");
        assert_eq!(layers[1].values, vec![3.0, 4.0]);
        // a one-color list cycles
        assert_eq!(layers[1].color, "red");
    });
}

#[test]
fn unsupported_kind_is_reported_by_name() {
    let data = series(json!({"A": {"x": 1}}));
    let err = chart::render_named("heatmap", &data, "label", None, None).unwrap_err();
    assert_matches!(err, EeError::UnsupportedChartKind(name) if name == "heatmap");
}

#[test]
fn bar_family_needs_shared_categories() {
    let data = series(json!({"A": {"x": 1, "y": 2}, "B": {"x": 3}}));
    let err = chart::render(ChartKind::Bar, &data, "label", None, None).unwrap_err();
    assert_matches!(err, EeError::ChartData(_));
}

#[test]
fn pie_rejects_several_labels_and_negative_values() {
    let two = series(json!({"A": {"x": 1}, "B": {"x": 3}}));
    assert_matches!(
        chart::render(ChartKind::Donut, &two, "label", None, None),
        Err(EeError::ChartData(_))
    );
    let negative = series(json!({"A": {"x": 2, "y": -1}}));
    assert_matches!(
        chart::render(ChartKind::Pie, &negative, "label", None, None),
        Err(EeError::ChartData(_))
    );
}

#[test]
fn date_chart_adds_overview_pane() {
    let data = series(json!({
        "ndvi": {
            "2023-03-01T00-00-00": 0.4,
            "2023-01-01T00-00-00": 0.2,
        }
    }));
    let figure = chart::render(ChartKind::Date, &data, "label", None, None).unwrap();
    assert_eq!(figure.panes.len(), 2);

    let main = &figure.panes[0];
    assert_eq!(main.role, Some(PaneRole::Main));
    assert_eq!(main.x_axis.scale, AxisScale::Datetime);
    assert_matches!(&main.glyphs[0], Glyph::Line { x, y, .. } => {
        assert!(x[0] < x[1]);
        assert_eq!(y, &vec![0.2, 0.4]);
    });

    let overview = &figure.panes[1];
    assert_eq!(overview.role, Some(PaneRole::Overview));
    assert!(overview.legend.is_empty());
    assert_eq!(overview.selection, main.x_range);
}

#[test]
fn date_chart_rejects_bad_dates() {
    let data = series(json!({"ndvi": {"last tuesday": 0.4}}));
    assert_matches!(
        chart::render(ChartKind::Date, &data, "label", None, None),
        Err(EeError::InvalidDate(_))
    );
}

#[test]
fn doy_chart_uses_month_ticks() {
    let data = series(json!({"ndvi": {"200": 0.5, "32": 0.1}}));
    let figure = chart::render(ChartKind::Doy, &data, "label", None, None).unwrap();
    let pane = figure.main_pane().unwrap();
    let ticks = pane.x_axis.ticks.as_ref().unwrap();
    assert_eq!(ticks.len(), 12);
    assert_eq!(ticks[1].value, 31.0);
    assert_eq!(ticks[1].label, "Feb");
    assert_matches!(&pane.glyphs[0], Glyph::Line { x, .. } => assert_eq!(x, &vec![32.0, 200.0]));
}

#[test]
fn fill_between_draws_area_and_line() {
    let data = series(json!({"A": {"f1": 1, "f2": 2}}));
    let figure = chart::render(ChartKind::FillBetween, &data, "id", None, None).unwrap();
    let kinds: Vec<_> = figure.main_pane().unwrap().glyphs.iter().map(Glyph::kind).collect();
    assert_eq!(kinds, vec!["varea", "line"]);
    assert_eq!(
        figure.main_pane().unwrap().x_axis.label.as_deref(),
        Some("Features (labeled by id)")
    );
}

#[test]
fn rendering_into_an_existing_figure_appends() {
    let first = series(json!({"A": {"f1": 1}}));
    let second = series(json!({"B": {"f1": 2}}));
    let figure = chart::render(ChartKind::Plot, &first, "label", None, None).unwrap();
    let figure = chart::render(ChartKind::Plot, &second, "label", None, Some(figure)).unwrap();
    assert_eq!(figure.glyph_count(), 2);
}
