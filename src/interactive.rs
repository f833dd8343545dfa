//! Interactive plots
//!
//! A [Layout] is written as a standalone HTML document where each figure is
//! drawn by [plotly.js](https://plotly.com/javascript/).

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use serde_json::{Map, Value, json};

use crate::figure::{
    Dash, Field, Figure, Fill, HAnchor, Layer, Layout, LegendPosition, Marker, PlotError, Point,
    Projection, VAnchor,
};

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

static SHOWN: AtomicUsize = AtomicUsize::new(0);

/// Interactive rendition of a [Layout]
#[derive(Debug, Clone)]
pub struct InteractivePlot {
    layout: Layout,
}

impl InteractivePlot {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
    /// Writes the HTML document
    pub fn to_html(&self) -> Result<String, PlotError> {
        let mut divs = String::new();
        let mut scripts = String::new();
        for (i, figure) in self.layout.figures().iter().enumerate() {
            let id = format!("figure-{i}");
            divs.push_str(&format!(
                "<div id=\"{id}\" style=\"width:{}px;height:{}px\"></div>\n",
                figure.width, figure.height
            ));
            let data = script_safe(serde_json::to_string(&traces(figure))?);
            let layout = script_safe(serde_json::to_string(&figure_layout(figure))?);
            scripts.push_str(&format!(
                "Plotly.newPlot(\"{id}\", {data}, {layout}, {{\"responsive\": true}});\n"
            ));
        }
        let title = self
            .layout
            .figures()
            .first()
            .map(|figure| html_escape(&figure.title.replace('\n', " ")))
            .unwrap_or_default();
        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_JS}"></script>
</head>
<body>
<div style="display:grid;grid-template-columns:repeat({columns},max-content)">
{divs}</div>
<script>
{scripts}</script>
</body>
</html>
"#,
            columns = self.layout.columns(),
        ))
    }
    /// Writes the HTML document to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PlotError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_html()?)?;
        log::info!("interactive plot saved to {path:?}");
        Ok(())
    }
    /// Writes the HTML document into the temporary directory and opens it
    /// with the platform browser
    ///
    /// Returns the path of the document
    pub fn show(&self) -> Result<PathBuf, PlotError> {
        let path = self.save_temporary()?;
        match open::that(&path) {
            Ok(()) => log::info!("opened {path:?}"),
            Err(e) => log::warn!("failed to open {path:?}: {e}"),
        }
        Ok(path)
    }
    /// Writes the HTML document to a new file in the temporary directory
    pub fn save_temporary(&self) -> Result<PathBuf, PlotError> {
        let path = std::env::temp_dir().join(format!(
            "rotor-results-{}-{}.html",
            std::process::id(),
            SHOWN.fetch_add(1, Ordering::Relaxed)
        ));
        self.save(&path)?;
        Ok(path)
    }
}

/// Prevents the JSON from closing the script element
fn script_safe(json: String) -> String {
    json.replace("</", "<\\/")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn dash(dash: Dash) -> &'static str {
    match dash {
        Dash::Solid => "solid",
        Dash::Dashed => "dash",
        Dash::DotDash => "dashdot",
    }
}

fn symbol(marker: Marker, projection: Projection) -> &'static str {
    match (marker, projection) {
        (_, Projection::Cartesian3d) | (Marker::Circle, _) => "circle",
        (Marker::TriangleUp, _) => "triangle-up",
        (Marker::TriangleDown, _) => "triangle-down",
    }
}

fn hover_template(figure: &Figure) -> Option<String> {
    if figure.tooltips.is_empty() {
        return None;
    }
    let rows: Vec<String> = figure
        .tooltips
        .iter()
        .map(|tooltip| {
            let field = match tooltip.field {
                Field::X => "%{x}",
                Field::Y => "%{y}",
                Field::Z => "%{z}",
            };
            format!("{} {field}", tooltip.label)
        })
        .collect();
    Some(format!("{}<extra></extra>", rows.join("<br>")))
}

fn coordinates(trace: &mut Map<String, Value>, points: &[Point], projection: Projection) {
    trace.insert("x".into(), points.iter().map(|p| p.x).collect());
    trace.insert("y".into(), points.iter().map(|p| p.y).collect());
    if projection == Projection::Cartesian3d {
        trace.insert("z".into(), points.iter().map(|p| p.z).collect());
    }
}

fn traces(figure: &Figure) -> Vec<Value> {
    let kind = match figure.projection {
        Projection::Cartesian2d => "scatter",
        Projection::Cartesian3d => "scatter3d",
    };
    let hover = hover_template(figure);
    let mut legend_entries = Vec::<String>::new();
    let mut color_bar = figure.color_bar.as_ref();
    let mut traces = Vec::new();
    for layer in &figure.layers {
        let mut trace = Map::new();
        trace.insert("type".into(), kind.into());
        match layer {
            Layer::Line(line) => {
                trace.insert("mode".into(), "lines".into());
                coordinates(&mut trace, &line.points, figure.projection);
                trace.insert(
                    "line".into(),
                    json!({
                        "color": line.color.to_hex(),
                        "width": line.width,
                        "dash": dash(line.dash),
                    }),
                );
                trace.insert("opacity".into(), line.alpha.into());
            }
            Layer::Scatter(scatter) => {
                trace.insert("mode".into(), "markers".into());
                coordinates(&mut trace, &scatter.points, figure.projection);
                let mut marker = json!({
                    "symbol": symbol(scatter.marker, figure.projection),
                    "size": 2 * scatter.size,
                });
                match &scatter.fill {
                    Fill::Solid(color) => marker["color"] = color.to_hex().into(),
                    Fill::Mapped { values, scale } => {
                        marker["color"] = values.clone().into();
                        marker["colorscale"] = "Viridis".into();
                        marker["cmin"] = scale.low.into();
                        marker["cmax"] = scale.high.into();
                        // a single color bar per figure
                        if let Some(bar) = color_bar.take() {
                            marker["showscale"] = true.into();
                            marker["colorbar"] = json!({"title": {"text": bar.title}});
                        }
                    }
                }
                trace.insert("marker".into(), marker);
            }
            Layer::Arrow(_) | Layer::Label(_) => continue,
        }
        match layer.label() {
            Some(label) => {
                trace.insert("name".into(), label.into());
                trace.insert("legendgroup".into(), label.into());
                let first = !legend_entries.iter().any(|entry| entry == label);
                if first {
                    legend_entries.push(label.to_string());
                }
                trace.insert("showlegend".into(), first.into());
            }
            None => {
                trace.insert("showlegend".into(), false.into());
            }
        }
        if let Some(template) = &hover {
            trace.insert("hovertemplate".into(), template.as_str().into());
        }
        traces.push(Value::Object(trace));
    }
    traces
}

fn annotations(figure: &Figure) -> Vec<Value> {
    figure
        .layers
        .iter()
        .filter_map(|layer| match layer {
            Layer::Arrow(arrow) => Some(json!({
                "x": arrow.end.x,
                "y": arrow.end.y,
                "ax": arrow.start.x,
                "ay": arrow.start.y,
                "xref": "x",
                "yref": "y",
                "axref": "x",
                "ayref": "y",
                "text": "",
                "showarrow": true,
                "arrowhead": 2,
                "arrowsize": arrow.head_size as f64 / 10.,
                "arrowwidth": arrow.width,
                "arrowcolor": arrow.color.to_hex(),
            })),
            Layer::Label(label) => {
                let text = html_escape(&label.text);
                let text = if label.bold { format!("<b>{text}</b>") } else { text };
                let xanchor = match label.h_anchor {
                    HAnchor::Left => "left",
                    HAnchor::Center => "center",
                    HAnchor::Right => "right",
                };
                let yanchor = match label.v_anchor {
                    VAnchor::Top => "top",
                    VAnchor::Middle => "middle",
                    VAnchor::Bottom => "bottom",
                };
                Some(json!({
                    "x": label.position.x,
                    "y": label.position.y,
                    "xref": "x",
                    "yref": "y",
                    "text": text,
                    "showarrow": false,
                    "xanchor": xanchor,
                    "yanchor": yanchor,
                    "xshift": label.offset.0,
                    "yshift": label.offset.1,
                }))
            }
            Layer::Line(_) | Layer::Scatter(_) => None,
        })
        .collect()
}

fn axis(label: &str, range: Option<(f64, f64)>) -> Value {
    let mut axis = json!({"title": {"text": label}});
    if let Some((lower, upper)) = range {
        axis["range"] = json!([lower, upper]);
    }
    axis
}

fn figure_layout(figure: &Figure) -> Value {
    let mut layout = json!({
        "title": {"text": figure.title.replace('\n', "<br>")},
        "width": figure.width,
        "height": figure.height,
        "hovermode": "closest",
        "showlegend": figure.legend.is_some(),
    });
    if let Some(position) = figure.legend {
        let (x, anchor) = match position {
            LegendPosition::TopLeft => (0.01, "left"),
            LegendPosition::TopRight => (0.99, "right"),
        };
        layout["legend"] = json!({
            "x": x,
            "xanchor": anchor,
            "y": 0.99,
            "yanchor": "top",
            "bgcolor": "rgba(255,255,255,0.1)",
        });
    }
    match figure.projection {
        Projection::Cartesian2d => {
            layout["xaxis"] = axis(&figure.x_label, figure.x_range);
            layout["yaxis"] = axis(&figure.y_label, figure.y_range);
            layout["annotations"] = annotations(figure).into();
        }
        Projection::Cartesian3d => {
            layout["scene"] = json!({
                "xaxis": axis(&figure.x_label, figure.x_range),
                "yaxis": axis(&figure.y_label, figure.y_range),
                "zaxis": axis(&figure.z_label, figure.z_range),
            });
        }
    }
    layout
}
