//! Mesh convergence study
//!
//! The payload rows are the number of elements, the eigenvalue and the
//! relative error of each mesh refinement.

use ndarray::{ArrayView2, Axis, Ix2};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError},
    figure::{Field, Fill, Figure, Layout, Line, Marker, PlotError, Point, Rgb, Scatter, palette},
    results::{ResultKind, TypedResults},
};

/// Eigenvalue and relative error against the number of shaft elements
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceResults(AnnotatedArray);

impl TypedResults for ConvergenceResults {
    const KIND: ResultKind = ResultKind::Convergence;
    type Element = f64;

    fn from_array(array: AnnotatedArray) -> Self {
        Self(array)
    }
    fn as_array(&self) -> &AnnotatedArray {
        &self.0
    }
    fn into_inner(self) -> AnnotatedArray {
        self.0
    }
}

fn evaluation(title: &str, y_label: &str, tooltip: &str, points: Vec<Point>, color: Rgb) -> Figure {
    Figure::new(title)
        .x_label("Number of Elements")
        .y_label(y_label)
        .size(800, 600)
        .tooltip(tooltip, Field::Y)
        .tooltip("Number of Elements", Field::X)
        .with(Line::new(points.clone(), color).width(3))
        .with(Scatter::new(points, Marker::Circle, Fill::Solid(color)).size(8))
}

impl ConvergenceResults {
    fn payload(&self) -> Result<ArrayView2<'_, f64>, AnnotatedArrayError> {
        self.0
            .expect_shape(2, &[(0, 3)], "[element count/eigenvalue/relative error, mesh]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix2>()?)
    }
}

impl Plot for ConvergenceResults {
    type Options = ();
    const HTML_FILE: &'static str = "convergence.html";

    fn layout(&self, _: &()) -> Result<Layout, PlotError> {
        let payload = self.payload()?;
        let series = |row: usize| -> Vec<Point> {
            payload
                .index_axis(Axis(0), 0)
                .iter()
                .zip(payload.index_axis(Axis(0), row))
                .map(|(&n, &y)| Point::new(n, y))
                .collect()
        };
        log::debug!("convergence over {} meshes", payload.len_of(Axis(1)));
        Ok(Layout::row(vec![
            evaluation(
                "Frequency Evaluation",
                "Frequency (rad/s)",
                "Frequency:",
                series(1),
                palette::CRIMSON,
            ),
            evaluation(
                "Relative Error Evaluation",
                "Relative Error (%)",
                "Relative Error:",
                series(2),
                palette::DARK_SLATE_GRAY,
            ),
        ]))
    }
}
