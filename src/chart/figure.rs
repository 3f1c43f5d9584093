use serde::{Deserialize, Serialize};

/// Renderer-neutral chart description: one or more panes of glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub panes: Vec<Pane>,
}

impl Default for Figure {
    fn default() -> Self {
        Self {
            panes: vec![Pane::default()],
        }
    }
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pane new glyphs go to; created on demand.
    pub fn main_pane_mut(&mut self) -> &mut Pane {
        if self.panes.is_empty() {
            self.panes.push(Pane::default());
        }
        &mut self.panes[0]
    }

    pub fn main_pane(&self) -> Option<&Pane> {
        self.panes.first()
    }

    pub fn glyph_count(&self) -> usize {
        self.panes.iter().map(|pane| pane.glyphs.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PaneRole>,
    pub glyphs: Vec<Glyph>,
    pub x_axis: Axis,
    pub y_axis: Axis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<Range>,
    /// Highlighted x interval, used by overview panes to drive the main one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Range>,
    pub x_grid: bool,
    pub y_grid: bool,
    pub outline: bool,
    pub legend: Vec<LegendItem>,
}

impl Default for Pane {
    fn default() -> Self {
        Self {
            role: None,
            glyphs: Vec::new(),
            x_axis: Axis::default(),
            y_axis: Axis::default(),
            x_range: None,
            y_range: None,
            selection: None,
            x_grid: true,
            y_grid: true,
            outline: true,
            legend: Vec::new(),
        }
    }
}

impl Pane {
    /// Add a glyph and register its legend entry once per label.
    pub fn push(&mut self, glyph: Glyph) {
        for item in glyph.legend_items() {
            if !self.legend.iter().any(|known| known.label == item.label) {
                self.legend.push(item);
            }
        }
        self.glyphs.push(glyph);
    }

    pub fn hide_axes(&mut self) {
        self.x_axis.visible = false;
        self.y_axis.visible = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaneRole {
    Main,
    Overview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticks: Option<Vec<Tick>>,
    pub visible: bool,
    #[serde(default)]
    pub scale: AxisScale,
}

impl Default for Axis {
    fn default() -> Self {
        Self {
            label: None,
            ticks: None,
            visible: true,
            scale: AxisScale::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisScale {
    #[default]
    Linear,
    /// Values are epoch milliseconds.
    Datetime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

impl Tick {
    pub fn new(value: f64, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub start: f64,
    pub end: f64,
}

impl Range {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendItem {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackLayer {
    pub label: String,
    pub color: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "glyph", rename_all = "snake_case")]
pub enum Glyph {
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    Varea {
        x: Vec<f64>,
        y1: Vec<f64>,
        y2: Vec<f64>,
        color: String,
        alpha: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    Vbar {
        x: Vec<f64>,
        top: Vec<f64>,
        width: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    Hbar {
        y: Vec<f64>,
        right: Vec<f64>,
        height: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    VbarStack {
        x: Vec<f64>,
        width: f64,
        layers: Vec<StackLayer>,
    },
    Wedge {
        x: f64,
        y: f64,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
    AnnularWedge {
        x: f64,
        y: f64,
        inner_radius: f64,
        outer_radius: f64,
        start_angle: f64,
        end_angle: f64,
        color: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        legend: Option<String>,
    },
}

impl Glyph {
    pub fn kind(&self) -> &'static str {
        match self {
            Glyph::Line { .. } => "line",
            Glyph::Scatter { .. } => "scatter",
            Glyph::Varea { .. } => "varea",
            Glyph::Vbar { .. } => "vbar",
            Glyph::Hbar { .. } => "hbar",
            Glyph::VbarStack { .. } => "vbar_stack",
            Glyph::Wedge { .. } => "wedge",
            Glyph::AnnularWedge { .. } => "annular_wedge",
        }
    }

    /// Angular span of wedge glyphs, `None` for everything else.
    pub fn span(&self) -> Option<f64> {
        match self {
            Glyph::Wedge {
                start_angle,
                end_angle,
                ..
            }
            | Glyph::AnnularWedge {
                start_angle,
                end_angle,
                ..
            } => Some(end_angle - start_angle),
            _ => None,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            Glyph::Line { color, .. }
            | Glyph::Scatter { color, .. }
            | Glyph::Varea { color, .. }
            | Glyph::Vbar { color, .. }
            | Glyph::Hbar { color, .. }
            | Glyph::Wedge { color, .. }
            | Glyph::AnnularWedge { color, .. } => Some(color),
            Glyph::VbarStack { .. } => None,
        }
    }

    fn legend_items(&self) -> Vec<LegendItem> {
        let single = |legend: &Option<String>, color: &str| {
            legend
                .iter()
                .map(|label| LegendItem {
                    label: label.clone(),
                    color: color.to_string(),
                })
                .collect()
        };
        match self {
            Glyph::Line { legend, color, .. }
            | Glyph::Scatter { legend, color, .. }
            | Glyph::Varea { legend, color, .. }
            | Glyph::Vbar { legend, color, .. }
            | Glyph::Hbar { legend, color, .. }
            | Glyph::Wedge { legend, color, .. }
            | Glyph::AnnularWedge { legend, color, .. } => single(legend, color),
            Glyph::VbarStack { layers, .. } => layers
                .iter()
                .map(|layer| LegendItem {
                    label: layer.label.clone(),
                    color: layer.color.clone(),
                })
                .collect(),
        }
    }
}
