//! Static plots drawn with plotters
//!
//! A [Layout] is drawn into an SVG document, in memory or on file.

use std::{collections::HashSet, error::Error, path::Path};

use plotters::{
    coord::Shift,
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::figure::{
    ColorScale, Dash, Figure, HAnchor, Label, Layer, Layout, LegendPosition, PlotError, Point,
    Projection, Rgb, VAnchor,
};

const COLOR_BAR_WIDTH: i32 = 90;

/// Static rendition of a [Layout]
#[derive(Debug, Clone)]
pub struct StaticPlot {
    layout: Layout,
}

impl StaticPlot {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
    /// Draws the plot into an SVG document
    pub fn to_svg(&self) -> Result<String, PlotError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, self.layout.pixel_size())
                .into_drawing_area();
            draw_layout(root, &self.layout).map_err(draw_error)?;
        }
        Ok(svg)
    }
    /// Draws the plot into the SVG document `path`
    ///
    /// Any extension other than `svg` is rejected before the file is created
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlotError> {
        let path = path.as_ref();
        if !is_svg(path) {
            return Err(PlotError::UnsupportedFormat(path.to_path_buf()));
        }
        let root = SVGBackend::new(path, self.layout.pixel_size()).into_drawing_area();
        draw_layout(root, &self.layout).map_err(draw_error)?;
        log::info!("static plot saved to {path:?}");
        Ok(())
    }
}

/// Checks for a `svg` extension, in any case
pub fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn draw_error(e: Box<dyn Error>) -> PlotError {
    PlotError::Draw(e.to_string())
}

fn rgb(color: &Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

fn shape(color: &Rgb, alpha: f64, stroke_width: u32, filled: bool) -> ShapeStyle {
    ShapeStyle {
        color: rgb(color).mix(alpha),
        filled,
        stroke_width,
    }
}

fn text_pos(label: &Label) -> Pos {
    let h = match label.h_anchor {
        HAnchor::Left => HPos::Left,
        HAnchor::Center => HPos::Center,
        HAnchor::Right => HPos::Right,
    };
    let v = match label.v_anchor {
        VAnchor::Top => VPos::Top,
        VAnchor::Middle => VPos::Center,
        VAnchor::Bottom => VPos::Bottom,
    };
    Pos::new(h, v)
}

/// Arrow head outline in pixel offsets from the tip
fn arrow_head(start: (i32, i32), end: (i32, i32), size: u32) -> Vec<(i32, i32)> {
    let (dx, dy) = ((end.0 - start.0) as f64, (end.1 - start.1) as f64);
    let norm = dx.hypot(dy);
    let (ux, uy) = if norm > 0. {
        (dx / norm, dy / norm)
    } else {
        (0., 1.)
    };
    let (length, half_width) = (size as f64, 0.5 * size as f64);
    let (bx, by) = (-ux * length, -uy * length);
    vec![
        (0, 0),
        (
            (bx - uy * half_width).round() as i32,
            (by + ux * half_width).round() as i32,
        ),
        (
            (bx + uy * half_width).round() as i32,
            (by - ux * half_width).round() as i32,
        ),
    ]
}

/// Splits a polyline into the visible pieces of a dash pattern
///
/// Lengths are measured in axis spans so the pattern looks alike on every chart
fn dash_segments(points: &[Point], dash: Dash, spans: (f64, f64, f64)) -> Vec<Vec<Point>> {
    let pattern: &[(f64, f64)] = match dash {
        Dash::Solid => return vec![points.to_vec()],
        Dash::Dashed => &[(0.02, 0.012)],
        Dash::DotDash => &[(0.024, 0.01), (0.004, 0.01)],
    };
    let unit = |span: f64| if span.abs() > f64::EPSILON { span } else { 1. };
    let (sx, sy, sz) = (unit(spans.0), unit(spans.1), unit(spans.2));
    let lerp = |a: &Point, b: &Point, t: f64| {
        Point::xyz(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            a.z + (b.z - a.z) * t,
        )
    };

    let mut segments = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut k = 0;
    let mut drawing = true;
    let mut left = pattern[0].0;
    for w in points.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let length = (((b.x - a.x) / sx).powi(2)
            + ((b.y - a.y) / sy).powi(2)
            + ((b.z - a.z) / sz).powi(2))
        .sqrt();
        if drawing && current.is_empty() {
            current.push(*a);
        }
        let mut t = 0.;
        while length * (1. - t) > left {
            t += left / length;
            current.push(lerp(a, b, t));
            if drawing {
                segments.push(std::mem::take(&mut current));
                left = pattern[k].1;
            } else {
                k = (k + 1) % pattern.len();
                left = pattern[k].0;
            }
            drawing = !drawing;
        }
        left -= length * (1. - t);
        if drawing {
            current.push(*b);
        }
    }
    if current.len() > 1 {
        segments.push(current);
    }
    segments
}

fn draw_layout<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    layout: &Layout,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let areas = root.split_evenly((layout.rows(), layout.columns()));
    for (area, figure) in areas.iter().zip(layout.figures()) {
        log::debug!("drawing {:?}", figure.title);
        match figure.projection {
            Projection::Cartesian2d => draw_cartesian_2d(area, figure)?,
            Projection::Cartesian3d => draw_cartesian_3d(area, figure)?,
        }
    }
    root.present()?;
    Ok(())
}

fn draw_cartesian_2d<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let (width, _) = area.dim_in_pixel();
    let bar_width = if figure.color_bar.is_some() {
        COLOR_BAR_WIDTH
    } else {
        0
    };
    let (plot_area, bar_area) = area.split_horizontally(width as i32 - bar_width);

    let [(x0, x1), (y0, y1), _] = figure.bounds();
    let mut chart = ChartBuilder::on(&plot_area)
        .caption(figure.title.replace('\n', ", "), ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .x_desc(figure.x_label.as_str())
        .y_desc(figure.y_label.as_str())
        .draw()?;

    let spans = (x1 - x0, y1 - y0, 1.);
    let mut legend_entries = HashSet::new();
    for layer in &figure.layers {
        // one legend entry per label
        let label = layer
            .label()
            .filter(|label| legend_entries.insert(label.to_string()));
        match layer {
            Layer::Line(line) => {
                let style = shape(&line.color, line.alpha, line.width, false);
                let anno = match line.dash {
                    Dash::Solid => chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p.x, p.y)),
                        style,
                    ))?,
                    dash => chart.draw_series(
                        dash_segments(&line.points, dash, spans)
                            .into_iter()
                            .map(|segment| {
                                PathElement::new(
                                    segment.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
                                    style,
                                )
                            }),
                    )?,
                };
                if let Some(label) = label {
                    anno.label(label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], style)
                    });
                }
            }
            Layer::Scatter(scatter) => {
                let outline = scatter.marker.outline(scatter.size);
                let anno = chart.draw_series(scatter.points.iter().enumerate().map(|(i, p)| {
                    EmptyElement::at((p.x, p.y))
                        + Polygon::new(
                            outline.clone(),
                            shape(&scatter.fill.color(i), 1., 1, true),
                        )
                }))?;
                if let Some(label) = label {
                    let color = scatter.fill.color(0);
                    anno.label(label).legend(move |(x, y)| {
                        Polygon::new(
                            outline
                                .iter()
                                .map(|(dx, dy)| (x + 10 + dx, y + dy))
                                .collect::<Vec<_>>(),
                            shape(&color, 1., 1, true),
                        )
                    });
                }
            }
            Layer::Arrow(arrow) => {
                let start = (arrow.start.x, arrow.start.y);
                let end = (arrow.end.x, arrow.end.y);
                let outline = arrow_head(
                    chart.backend_coord(&start),
                    chart.backend_coord(&end),
                    arrow.head_size,
                );
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![start, end],
                    shape(&arrow.color, 1., arrow.width, false),
                )))?;
                chart.draw_series(std::iter::once(
                    EmptyElement::at(end)
                        + Polygon::new(outline, shape(&arrow.head_fill, 1., 1, true)),
                ))?;
            }
            Layer::Label(text) => {
                let font = ("sans-serif", 14).into_font();
                let font = if text.bold {
                    font.style(FontStyle::Bold)
                } else {
                    font
                };
                let style = TextStyle::from(font).pos(text_pos(text)).color(&BLACK);
                chart.draw_series(std::iter::once(
                    EmptyElement::at((text.position.x, text.position.y))
                        + Text::new(text.text.clone(), (text.offset.0, -text.offset.1), style),
                ))?;
            }
        }
    }

    if let Some(position) = figure.legend.filter(|_| !legend_entries.is_empty()) {
        chart
            .configure_series_labels()
            .position(match position {
                LegendPosition::TopLeft => SeriesLabelPosition::UpperLeft,
                LegendPosition::TopRight => SeriesLabelPosition::UpperRight,
            })
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    if let Some(scale) = &figure.color_bar {
        draw_color_bar(&bar_area, scale)?;
    }
    Ok(())
}

fn draw_color_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scale: &ColorScale,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let (low, high) = if (scale.high - scale.low).abs() < f64::EPSILON {
        (scale.low - 0.5, scale.high + 0.5)
    } else {
        (scale.low, scale.high)
    };
    let mut chart = ChartBuilder::on(area)
        .caption(&scale.title, ("sans-serif", 14))
        .margin(10)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, low..high)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .draw()?;
    let steps = 64;
    chart.draw_series((0..steps).map(|i| {
        let v0 = low + (high - low) * i as f64 / steps as f64;
        let v1 = low + (high - low) * (i + 1) as f64 / steps as f64;
        Rectangle::new(
            [(0., v0), (1., v1)],
            rgb(&scale.color(0.5 * (v0 + v1))).filled(),
        )
    }))?;
    Ok(())
}

fn draw_cartesian_3d<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    figure: &Figure,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let [(x0, x1), (y0, y1), (z0, z1)] = figure.bounds();
    let mut chart = ChartBuilder::on(area)
        .caption(figure.title.replace('\n', ", "), ("sans-serif", 16))
        .margin(10)
        .build_cartesian_3d(x0..x1, y0..y1, z0..z1)?;
    chart.configure_axes().draw()?;

    let spans = (x1 - x0, y1 - y0, z1 - z0);
    for layer in &figure.layers {
        match layer {
            Layer::Line(line) => {
                let style = shape(&line.color, line.alpha, line.width, false);
                match line.dash {
                    Dash::Solid => {
                        chart.draw_series(LineSeries::new(
                            line.points.iter().map(|p| (p.x, p.y, p.z)),
                            style,
                        ))?;
                    }
                    dash => {
                        chart.draw_series(dash_segments(&line.points, dash, spans).into_iter().map(
                            |segment| {
                                PathElement::new(
                                    segment
                                        .iter()
                                        .map(|p| (p.x, p.y, p.z))
                                        .collect::<Vec<_>>(),
                                    style,
                                )
                            },
                        ))?;
                    }
                }
            }
            Layer::Scatter(scatter) => {
                chart.draw_series(scatter.points.iter().enumerate().map(|(i, p)| {
                    Circle::new(
                        (p.x, p.y, p.z),
                        scatter.size,
                        shape(&scatter.fill.color(i), 1., 1, true),
                    )
                }))?;
            }
            Layer::Arrow(_) | Layer::Label(_) => {
                log::debug!("annotations are not drawn on 3D charts");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{Arrow, ColorScale, Fill, Line, Marker, Scatter};

    fn layout() -> Layout {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, (i * i) as f64)).collect();
        let scale = ColorScale::new(0., 9., "log dec");
        let chart = Figure::new("Squares")
            .x_label("x")
            .y_label("y")
            .legend(LegendPosition::TopLeft)
            .color_bar(scale.clone())
            .with(Line::new(points.clone(), Rgb::BLACK).label("curve"))
            .with(Line::new(points.clone(), Rgb::BLACK).dash(Dash::DotDash))
            .with(
                Scatter::new(
                    points.clone(),
                    Marker::TriangleDown,
                    Fill::Mapped {
                        values: (0..10).map(|i| i as f64).collect(),
                        scale,
                    },
                )
                .label("markers"),
            )
            .with(Arrow::new(Point::new(2., 50.), Point::new(2., 0.)))
            .with(Label::new(Point::new(2., 50.), "W = 1.0N").bold());
        let orbit = Figure::new("Orbit")
            .projection(Projection::Cartesian3d)
            .with(
                Line::new(
                    (0..20)
                        .map(|i| {
                            let a = i as f64 * 0.3;
                            Point::xyz(0.5, a.cos(), a.sin())
                        })
                        .collect(),
                    Rgb::BLACK,
                )
                .dash(Dash::Dashed),
            );
        Layout::row(vec![chart, orbit])
    }

    #[test]
    fn svg_document() {
        let svg = StaticPlot::new(layout()).to_svg().unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Squares"));
        assert!(svg.contains("W = 1.0N"));
    }

    #[test]
    fn svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("squares.svg");
        StaticPlot::new(layout()).save(&path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Orbit"));
    }

    #[test]
    fn only_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("squares.png");
        assert!(matches!(
            StaticPlot::new(layout()).save(&path),
            Err(PlotError::UnsupportedFormat(p)) if p == path
        ));
        assert!(!path.exists());
        assert!(is_svg(Path::new("plots/squares.SVG")));
        assert!(!is_svg(Path::new("squares")));
    }

    #[test]
    fn dashes_follow_the_line() {
        let points = vec![Point::new(0., 0.), Point::new(1., 0.)];
        let segments = dash_segments(&points, Dash::Dashed, (1., 1., 1.));
        assert!(segments.len() > 10);
        for segment in &segments {
            assert!(segment.len() >= 2);
            assert!(segment.iter().all(|p| p.y == 0. && (0. ..=1.).contains(&p.x)));
        }
        assert_eq!(dash_segments(&points, Dash::Solid, (1., 1., 1.)), vec![points]);
    }

    #[test]
    fn arrow_head_points_backward() {
        // pointing down the screen
        let outline = arrow_head((10, 0), (10, 100), 16);
        assert_eq!(outline[0], (0, 0));
        assert!(outline[1].1 < 0 && outline[2].1 < 0);
        assert_eq!(outline[1].0, -outline[2].0);
    }
}
