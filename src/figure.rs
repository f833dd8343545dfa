//! Backend-agnostic figures
//!
//! Renderers describe what to draw with a [Layout] of [Figure]s; the static
//! ([StaticPlot]) and the interactive ([InteractivePlot]) backends both draw
//! from the same [Layout].

use std::{io, path::PathBuf};

use crate::{
    data::AnnotatedArrayError, interactive::InteractivePlot, interpolate::InterpolationError,
    static_plot::StaticPlot,
};

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error(transparent)]
    Data(#[from] AnnotatedArrayError),
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("failed to draw static plot: {0}")]
    Draw(String),
    #[error("static plots are SVG documents, found {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error("failed to write plot: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode interactive plot")]
    Json(#[from] serde_json::Error),
}

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    /// Parses a `#rrggbb` color
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }
    /// Parses a hexadecimal color or one of the usual color names
    ///
    /// The `tab:*` names are the Tableau colors used to paint whirl directions
    pub fn parse(name: &str) -> Option<Self> {
        if name.starts_with('#') {
            return Self::from_hex(name);
        }
        let hex = match name.trim().to_ascii_lowercase().as_str() {
            "tab:blue" => "#1f77b4",
            "tab:orange" => "#ff7f0e",
            "tab:green" => "#2ca02c",
            "tab:red" => "#d62728",
            "tab:purple" => "#9467bd",
            "tab:gray" | "tab:grey" => "#7f7f7f",
            "k" | "black" => "#000000",
            "w" | "white" => "#ffffff",
            "b" | "blue" => "#0000ff",
            "r" | "red" => "#ff0000",
            "g" | "green" => "#008000",
            "crimson" => "#dc143c",
            "darkslategray" | "darkslategrey" => "#2f4f4f",
            _ => return None,
        };
        Self::from_hex(hex)
    }
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
    /// Linear blend, `t = 0` is `self` and `t = 1` is `other`
    pub fn lerp(&self, other: &Rgb, t: f64) -> Rgb {
        let t = t.clamp(0., 1.);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(
            mix(self.0, other.0),
            mix(self.1, other.1),
            mix(self.2, other.2),
        )
    }
}

/// Colors shared by the renderers
pub mod palette {
    use super::Rgb;

    /// 11-class red/grey diverging palette, dark red first
    pub const RD_GY: [Rgb; 11] = [
        Rgb(0x67, 0x00, 0x1f),
        Rgb(0xb2, 0x18, 0x2b),
        Rgb(0xd6, 0x60, 0x4d),
        Rgb(0xf4, 0xa5, 0x82),
        Rgb(0xfd, 0xdb, 0xc7),
        Rgb(0xff, 0xff, 0xff),
        Rgb(0xe0, 0xe0, 0xe0),
        Rgb(0xba, 0xba, 0xba),
        Rgb(0x87, 0x87, 0x87),
        Rgb(0x4d, 0x4d, 0x4d),
        Rgb(0x1a, 0x1a, 0x1a),
    ];
    pub const CRIMSON: Rgb = Rgb(0xdc, 0x14, 0x3c);
    pub const DARK_SLATE_GRAY: Rgb = Rgb(0x2f, 0x4f, 0x4f);
    pub const TAB_BLUE: Rgb = Rgb(0x1f, 0x77, 0xb4);

    pub(crate) const VIRIDIS: [Rgb; 9] = [
        Rgb(0x44, 0x01, 0x54),
        Rgb(0x47, 0x2d, 0x7b),
        Rgb(0x3b, 0x52, 0x8b),
        Rgb(0x2c, 0x72, 0x8e),
        Rgb(0x21, 0x91, 0x8c),
        Rgb(0x28, 0xae, 0x80),
        Rgb(0x5e, 0xc9, 0x62),
        Rgb(0xad, 0xdc, 0x30),
        Rgb(0xfd, 0xe7, 0x25),
    ];
}

/// Viridis color mapping of the interval `[low, high]`
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub low: f64,
    pub high: f64,
    pub title: String,
}
impl ColorScale {
    pub fn new<S: Into<String>>(low: f64, high: f64, title: S) -> Self {
        Self {
            low,
            high,
            title: title.into(),
        }
    }
    /// Spans the extrema of `values`
    pub fn spanning<S: Into<String>>(values: impl IntoIterator<Item = f64>, title: S) -> Self {
        let (low, high) = values
            .into_iter()
            .filter(|x| x.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            });
        if low > high {
            Self::new(0., 1., title)
        } else {
            Self::new(low, high, title)
        }
    }
    /// Position of `value` in the scale, in `[0, 1]`
    ///
    /// A degenerate scale maps everything to the middle
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.high - self.low;
        if span.abs() < f64::EPSILON {
            0.5
        } else {
            ((value - self.low) / span).clamp(0., 1.)
        }
    }
    pub fn color(&self, value: f64) -> Rgb {
        let n = palette::VIRIDIS.len() - 1;
        let t = self.normalize(value) * n as f64;
        let i = (t.floor() as usize).min(n - 1);
        palette::VIRIDIS[i].lerp(&palette::VIRIDIS[i + 1], t - i as f64)
    }
}

/// Data point, `z` is ignored by 2-D figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0. }
    }
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Scatter marker shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    TriangleUp,
    Circle,
    TriangleDown,
}
impl Marker {
    /// Outline of the marker in pixel offsets, y pointing down
    pub(crate) fn outline(&self, size: u32) -> Vec<(i32, i32)> {
        let r = size as f64;
        match self {
            Marker::TriangleUp => vec![
                (0, -r as i32),
                ((0.866 * r) as i32, (0.5 * r) as i32),
                (-(0.866 * r) as i32, (0.5 * r) as i32),
            ],
            Marker::TriangleDown => vec![
                (0, r as i32),
                ((0.866 * r) as i32, -(0.5 * r) as i32),
                (-(0.866 * r) as i32, -(0.5 * r) as i32),
            ],
            Marker::Circle => (0..12)
                .map(|i| {
                    let a = i as f64 * std::f64::consts::PI / 6.;
                    ((r * a.cos()).round() as i32, (r * a.sin()).round() as i32)
                })
                .collect(),
        }
    }
}

/// Line dash patterns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dash {
    #[default]
    Solid,
    Dashed,
    DotDash,
}

/// Marker fill
#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Rgb),
    /// One value per point, colored through the scale
    Mapped { values: Vec<f64>, scale: ColorScale },
}
impl Fill {
    /// Color of the i-th point
    pub fn color(&self, i: usize) -> Rgb {
        match self {
            Fill::Solid(color) => *color,
            Fill::Mapped { values, scale } => values
                .get(i)
                .map_or(palette::VIRIDIS[0], |v| scale.color(*v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub label: Option<String>,
    pub points: Vec<Point>,
    pub color: Rgb,
    pub width: u32,
    pub alpha: f64,
    pub dash: Dash,
}
impl Line {
    pub fn new(points: Vec<Point>, color: Rgb) -> Self {
        Self {
            label: None,
            points,
            color,
            width: 2,
            alpha: 1.,
            dash: Dash::Solid,
        }
    }
    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
    pub fn dash(mut self, dash: Dash) -> Self {
        self.dash = dash;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter {
    pub label: Option<String>,
    pub points: Vec<Point>,
    pub marker: Marker,
    pub fill: Fill,
    pub size: u32,
}
impl Scatter {
    pub fn new(points: Vec<Point>, marker: Marker, fill: Fill) -> Self {
        Self {
            label: None,
            points,
            marker,
            fill,
            size: 4,
        }
    }
    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub start: Point,
    pub end: Point,
    pub color: Rgb,
    pub head_fill: Rgb,
    pub head_size: u32,
    pub width: u32,
}
impl Arrow {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            color: palette::RD_GY[0],
            head_fill: palette::RD_GY[7],
            head_size: 16,
            width: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HAnchor {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VAnchor {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Text annotation
///
/// `offset` is in pixels, y pointing up
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub position: Point,
    pub text: String,
    pub h_anchor: HAnchor,
    pub v_anchor: VAnchor,
    pub offset: (i32, i32),
    pub bold: bool,
}
impl Label {
    pub fn new<S: Into<String>>(position: Point, text: S) -> Self {
        Self {
            position,
            text: text.into(),
            h_anchor: HAnchor::Left,
            v_anchor: VAnchor::Top,
            offset: (0, 0),
            bold: false,
        }
    }
    pub fn anchor(mut self, h_anchor: HAnchor, v_anchor: VAnchor) -> Self {
        self.h_anchor = h_anchor;
        self.v_anchor = v_anchor;
        self
    }
    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.offset = (dx, dy);
        self
    }
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Line(Line),
    Scatter(Scatter),
    Arrow(Arrow),
    Label(Label),
}
impl Layer {
    pub fn label(&self) -> Option<&str> {
        match self {
            Layer::Line(line) => line.label.as_deref(),
            Layer::Scatter(scatter) => scatter.label.as_deref(),
            Layer::Arrow(_) | Layer::Label(_) => None,
        }
    }
    fn points(&self) -> Vec<Point> {
        match self {
            Layer::Line(line) => line.points.clone(),
            Layer::Scatter(scatter) => scatter.points.clone(),
            Layer::Arrow(arrow) => vec![arrow.start, arrow.end],
            Layer::Label(label) => vec![label.position],
        }
    }
}
impl From<Line> for Layer {
    fn from(value: Line) -> Self {
        Layer::Line(value)
    }
}
impl From<Scatter> for Layer {
    fn from(value: Scatter) -> Self {
        Layer::Scatter(value)
    }
}
impl From<Arrow> for Layer {
    fn from(value: Arrow) -> Self {
        Layer::Arrow(value)
    }
}
impl From<Label> for Layer {
    fn from(value: Label) -> Self {
        Layer::Label(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Z,
}

/// Hover information of the interactive backend
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub label: String,
    pub field: Field,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    #[default]
    Cartesian2d,
    Cartesian3d,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    TopLeft,
    TopRight,
}

/// A single chart
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub z_label: String,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub z_range: Option<(f64, f64)>,
    pub projection: Projection,
    pub width: u32,
    pub height: u32,
    pub legend: Option<LegendPosition>,
    pub tooltips: Vec<Tooltip>,
    pub color_bar: Option<ColorScale>,
    pub layers: Vec<Layer>,
}

impl Figure {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: String::new(),
            z_label: String::new(),
            x_range: None,
            y_range: None,
            z_range: None,
            projection: Projection::Cartesian2d,
            width: 800,
            height: 400,
            legend: None,
            tooltips: Vec::new(),
            color_bar: None,
            layers: Vec::new(),
        }
    }
    pub fn x_label<S: Into<String>>(mut self, label: S) -> Self {
        self.x_label = label.into();
        self
    }
    pub fn y_label<S: Into<String>>(mut self, label: S) -> Self {
        self.y_label = label.into();
        self
    }
    pub fn z_label<S: Into<String>>(mut self, label: S) -> Self {
        self.z_label = label.into();
        self
    }
    pub fn x_range(mut self, lower: f64, upper: f64) -> Self {
        self.x_range = Some((lower, upper));
        self
    }
    pub fn y_range(mut self, lower: f64, upper: f64) -> Self {
        self.y_range = Some((lower, upper));
        self
    }
    pub fn z_range(mut self, lower: f64, upper: f64) -> Self {
        self.z_range = Some((lower, upper));
        self
    }
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
    pub fn legend(mut self, position: LegendPosition) -> Self {
        self.legend = Some(position);
        self
    }
    pub fn tooltip<S: Into<String>>(mut self, label: S, field: Field) -> Self {
        self.tooltips.push(Tooltip {
            label: label.into(),
            field,
        });
        self
    }
    pub fn color_bar(mut self, scale: ColorScale) -> Self {
        self.color_bar = Some(scale);
        self
    }
    pub fn with<L: Into<Layer>>(mut self, layer: L) -> Self {
        self.layers.push(layer.into());
        self
    }
    pub fn push<L: Into<Layer>>(&mut self, layer: L) {
        self.layers.push(layer.into());
    }
    /// Returns the layers labeled `label`
    pub fn series<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a Layer> + 'a {
        self.layers
            .iter()
            .filter(move |layer| layer.label() == Some(label))
    }
    /// Returns all the points of the layers labeled `label`
    pub fn points_labeled(&self, label: &str) -> Vec<Point> {
        self.series(label).flat_map(Layer::points).collect()
    }
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Line(line) => Some(line),
            _ => None,
        })
    }
    pub fn scatters(&self) -> impl Iterator<Item = &Scatter> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Scatter(scatter) => Some(scatter),
            _ => None,
        })
    }
    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Arrow(arrow) => Some(arrow),
            _ => None,
        })
    }
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.layers.iter().filter_map(|layer| match layer {
            Layer::Label(label) => Some(label),
            _ => None,
        })
    }
    /// Axis ranges, the explicit ones or 5% wider than the data
    pub fn bounds(&self) -> [(f64, f64); 3] {
        let points: Vec<Point> = self.layers.iter().flat_map(Layer::points).collect();
        let extent = |get: fn(&Point) -> f64| {
            let (lo, hi) = points
                .iter()
                .map(get)
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if lo > hi {
                (0., 1.)
            } else if (hi - lo).abs() < f64::EPSILON {
                let pad = if lo == 0. { 1. } else { 0.1 * lo.abs() };
                (lo - pad, hi + pad)
            } else {
                let pad = 0.05 * (hi - lo);
                (lo - pad, hi + pad)
            }
        };
        [
            self.x_range.unwrap_or_else(|| extent(|p| p.x)),
            self.y_range.unwrap_or_else(|| extent(|p| p.y)),
            self.z_range.unwrap_or_else(|| extent(|p| p.z)),
        ]
    }
}

/// Row-major grid of figures
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    columns: usize,
    figures: Vec<Figure>,
}

impl Layout {
    pub fn single(figure: Figure) -> Self {
        Self {
            columns: 1,
            figures: vec![figure],
        }
    }
    pub fn row(figures: Vec<Figure>) -> Self {
        Self {
            columns: figures.len().max(1),
            figures,
        }
    }
    pub fn column(figures: Vec<Figure>) -> Self {
        Self {
            columns: 1,
            figures,
        }
    }
    /// Grid from rows of figures, the number of columns is the one of the first row
    pub fn grid(rows: Vec<Vec<Figure>>) -> Self {
        let columns = rows.first().map_or(1, |row| row.len().max(1));
        Self {
            columns,
            figures: rows.into_iter().flatten().collect(),
        }
    }
    pub fn columns(&self) -> usize {
        self.columns
    }
    pub fn rows(&self) -> usize {
        self.figures.len().div_ceil(self.columns)
    }
    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }
    pub fn figure(&self, row: usize, column: usize) -> Option<&Figure> {
        if column < self.columns {
            self.figures.get(row * self.columns + column)
        } else {
            None
        }
    }
    /// Finds the first figure titled `title`
    pub fn find(&self, title: &str) -> Option<&Figure> {
        self.figures.iter().find(|figure| figure.title == title)
    }
    /// Size in pixels of the whole grid
    pub fn pixel_size(&self) -> (u32, u32) {
        let width = self.figures.iter().map(|f| f.width).max().unwrap_or(800);
        let height = self.figures.iter().map(|f| f.height).max().unwrap_or(400);
        (width * self.columns as u32, height * self.rows() as u32)
    }
}

/// The two renditions of a result
#[derive(Debug, Clone)]
pub struct Rendered {
    pub static_plot: StaticPlot,
    pub interactive: InteractivePlot,
}
impl Rendered {
    pub fn new(layout: Layout) -> Self {
        Self {
            static_plot: StaticPlot::new(layout.clone()),
            interactive: InteractivePlot::new(layout),
        }
    }
    pub fn layout(&self) -> &Layout {
        self.static_plot.layout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors() {
        assert_eq!(Rgb::from_hex("#67001f"), Some(Rgb(0x67, 0x00, 0x1f)));
        assert_eq!(Rgb::parse("tab:blue"), Some(palette::TAB_BLUE));
        assert_eq!(Rgb::parse("k"), Some(Rgb::BLACK));
        assert_eq!(Rgb::parse("#12"), None);
        assert_eq!(Rgb::parse("no-such-color"), None);
        assert_eq!(palette::CRIMSON.to_hex(), "#dc143c");
    }

    #[test]
    fn viridis_scale() {
        let scale = ColorScale::new(0., 2., "log dec");
        assert_eq!(scale.color(0.), palette::VIRIDIS[0]);
        assert_eq!(scale.color(2.), palette::VIRIDIS[8]);
        assert_eq!(scale.color(1.), palette::VIRIDIS[4]);
        assert_eq!(scale.color(-5.), palette::VIRIDIS[0]);
        let flat = ColorScale::spanning([0.3, 0.3], "log dec");
        assert_eq!(flat.normalize(0.3), 0.5);
    }

    #[test]
    fn layout_grid() {
        let layout = Layout::grid(vec![
            vec![Figure::new("a"), Figure::new("b")],
            vec![Figure::new("c").size(900, 600), Figure::new("d")],
        ]);
        assert_eq!(layout.rows(), 2);
        assert_eq!(layout.columns(), 2);
        assert_eq!(layout.figure(1, 0).unwrap().title, "c");
        assert!(layout.figure(0, 2).is_none());
        assert_eq!(layout.pixel_size(), (1800, 1200));
    }

    #[test]
    fn bounds() {
        let figure = Figure::new("f")
            .with(Line::new(vec![Point::new(0., 1.), Point::new(10., 1.)], Rgb::BLACK))
            .y_range(-2., 2.);
        let [x, y, _] = figure.bounds();
        assert!((x.0 + 0.5).abs() < 1e-12 && (x.1 - 10.5).abs() < 1e-12);
        assert_eq!(y, (-2., 2.));
    }
}
