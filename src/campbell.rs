//! Campbell diagram
//!
//! The payload is indexed by `[speed step, mode, field]` with the fields
//!  * damped natural frequency,
//!  * log decrement,
//!  * whirl direction (0: forward, 0.5: mixed, 1: backward),
//!  * rotor speed,
//!  * undamped natural frequency.

use ndarray::{ArrayView3, Axis, Ix3};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError},
    figure::{
        ColorScale, Dash, Fill, Figure, Layout, LegendPosition, Line, Marker, PlotError, Point,
        Scatter, palette,
    },
    results::{ResultKind, TypedResults},
};

const FREQUENCY: usize = 0;
const LOG_DEC: usize = 1;
const WHIRL: usize = 2;
const SPEED: usize = 3;
const UNDAMPED_FREQUENCY: usize = 4;
const N_FIELD: usize = 5;

/// Precession sense of a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhirlDirection {
    Forward,
    Mixed,
    Backward,
}

impl WhirlDirection {
    pub const ALL: [WhirlDirection; 3] = [
        WhirlDirection::Forward,
        WhirlDirection::Mixed,
        WhirlDirection::Backward,
    ];
    /// Value of the direction in the payload
    pub fn value(&self) -> f64 {
        match self {
            WhirlDirection::Forward => 0.,
            WhirlDirection::Mixed => 0.5,
            WhirlDirection::Backward => 1.,
        }
    }
    pub fn marker(&self) -> Marker {
        match self {
            WhirlDirection::Forward => Marker::TriangleUp,
            WhirlDirection::Mixed => Marker::Circle,
            WhirlDirection::Backward => Marker::TriangleDown,
        }
    }
    pub fn label(&self) -> &'static str {
        match self {
            WhirlDirection::Forward => "Forward",
            WhirlDirection::Mixed => "Mixed",
            WhirlDirection::Backward => "Backward",
        }
    }
}

/// Campbell diagram options
#[derive(Debug, Clone, PartialEq)]
pub struct CampbellOptions {
    /// Multiples of the rotor speed drawn as lines
    pub harmonics: Vec<f64>,
    /// Plots the undamped natural frequencies instead of the damped ones
    pub undamped: bool,
}
impl Default for CampbellOptions {
    fn default() -> Self {
        Self {
            harmonics: vec![1.],
            undamped: false,
        }
    }
}

/// Natural frequencies, damping and whirl of the modes over a range of rotor speeds
#[derive(Debug, Clone, PartialEq)]
pub struct CampbellResults(AnnotatedArray);

impl TypedResults for CampbellResults {
    const KIND: ResultKind = ResultKind::Campbell;
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

impl CampbellResults {
    fn payload(&self) -> Result<ArrayView3<'_, f64>, AnnotatedArrayError> {
        self.0
            .expect_shape(3, &[(2, N_FIELD)], "[speed step, mode, 5]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix3>()?)
    }
    /// Points (speed, frequency) and log decrements of `mode` whirling in `direction`
    fn mode_series(
        payload: &ArrayView3<'_, f64>,
        mode: usize,
        direction: WhirlDirection,
        undamped: bool,
    ) -> (Vec<Point>, Vec<f64>) {
        let frequency = if undamped {
            UNDAMPED_FREQUENCY
        } else {
            FREQUENCY
        };
        payload
            .outer_iter()
            .map(|step| step.index_axis_move(Axis(0), mode))
            .filter(|fields| (fields[WHIRL] - direction.value()).abs() < 1e-9)
            .map(|fields| {
                (
                    Point::new(fields[SPEED], fields[frequency]),
                    fields[LOG_DEC],
                )
            })
            .unzip()
    }
    /// Returns the (speed, frequency) points of all the modes whirling in `direction`
    pub fn whirl_series(
        &self,
        direction: WhirlDirection,
        undamped: bool,
    ) -> Result<Vec<Point>, AnnotatedArrayError> {
        let payload = self.payload()?;
        Ok((0..payload.len_of(Axis(1)))
            .flat_map(|mode| Self::mode_series(&payload, mode, direction, undamped).0)
            .collect())
    }
}

impl Plot for CampbellResults {
    type Options = CampbellOptions;
    const HTML_FILE: &'static str = "Campbell_diagram.html";

    fn layout(&self, options: &CampbellOptions) -> Result<Layout, PlotError> {
        let payload = self.payload()?;
        let (n_step, n_mode, _) = payload.dim();
        log::debug!("Campbell diagram of {n_mode} modes over {n_step} speeds");

        let scale = ColorScale::spanning(
            payload.index_axis(Axis(2), LOG_DEC).iter().copied(),
            "log dec",
        );
        let mut figure = Figure::new("Campbell Diagram - Damped Natural Frequency Map")
            .x_label("Rotor speed (rad/s)")
            .y_label(if options.undamped {
                "Undamped natural frequencies (rad/s)"
            } else {
                "Damped natural frequencies (rad/s)"
            })
            .size(900, 600)
            .legend(LegendPosition::TopLeft)
            .color_bar(scale.clone());

        for direction in WhirlDirection::ALL {
            for mode in 0..n_mode {
                let (points, values) =
                    Self::mode_series(&payload, mode, direction, options.undamped);
                figure.push(
                    Scatter::new(
                        points,
                        direction.marker(),
                        Fill::Mapped {
                            values,
                            scale: scale.clone(),
                        },
                    )
                    .size(9)
                    .label(direction.label()),
                );
            }
        }

        if n_mode > 0 {
            let speed: Vec<f64> = payload
                .outer_iter()
                .map(|step| step[[0, SPEED]])
                .collect();
            for &harmonic in &options.harmonics {
                let line = Line::new(
                    speed.iter().map(|&w| Point::new(w, harmonic * w)).collect(),
                    palette::RD_GY[0],
                )
                .width(3)
                .alpha(0.75)
                .dash(Dash::DotDash);
                figure.push(if harmonic == 1. {
                    line.label("Rotor speed")
                } else {
                    line.label(format!("{harmonic}x"))
                });
            }
        }

        Ok(Layout::single(figure))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;
    use crate::{RenderConfig, data::Attributes};

    fn campbell(fields: &[[f64; 5]], n_mode: usize) -> CampbellResults {
        let n_step = fields.len() / n_mode;
        let payload = Array3::from_shape_fn((n_step, n_mode, 5), |(i, j, k)| {
            fields[i * n_mode + j][k]
        });
        CampbellResults::from_array(AnnotatedArray::new(payload, Attributes::new()))
    }

    #[test]
    fn forward_whirl_only() {
        let results = campbell(
            &[[80., 0.1, 0., 0., 82.], [95., 0.2, 0., 100., 97.]],
            1,
        );
        let forward = results
            .whirl_series(WhirlDirection::Forward, false)
            .unwrap();
        assert_eq!(forward, vec![Point::new(0., 80.), Point::new(100., 95.)]);
        for direction in [WhirlDirection::Mixed, WhirlDirection::Backward] {
            assert!(results.whirl_series(direction, false).unwrap().is_empty());
        }

        let layout = results.layout(&CampbellOptions::default()).unwrap();
        let figure = &layout.figures()[0];
        assert_eq!(figure.points_labeled("Forward").len(), 2);
        assert_eq!(figure.series("Mixed").count(), 1);
        assert!(figure.points_labeled("Mixed").is_empty());
        assert!(figure.points_labeled("Backward").is_empty());
    }

    #[test]
    fn undamped_frequencies() {
        let results = campbell(
            &[[80., 0.1, 1., 0., 82.], [95., 0.2, 1., 100., 97.]],
            1,
        );
        let backward = results
            .whirl_series(WhirlDirection::Backward, true)
            .unwrap();
        assert_eq!(backward, vec![Point::new(0., 82.), Point::new(100., 97.)]);
    }

    #[test]
    fn markers_colors_and_harmonics() {
        let results = campbell(
            &[
                [10., 0.5, 0., 0., 10.],
                [30., 2.5, 1., 0., 30.],
                [12., 1.5, 0.5, 50., 12.],
                [28., 0.5, 1., 50., 28.],
            ],
            2,
        );
        let options = CampbellOptions {
            harmonics: vec![1., 2.],
            ..Default::default()
        };
        let layout = results.layout(&options).unwrap();
        let figure = &layout.figures()[0];
        assert_eq!(figure.scatters().count(), 6);
        let scale = figure.color_bar.as_ref().unwrap();
        assert_eq!((scale.low, scale.high), (0.5, 2.5));
        let backward: Vec<_> = figure
            .scatters()
            .filter(|s| s.marker == Marker::TriangleDown)
            .collect();
        assert_eq!(backward[1].points.len(), 2);
        assert_eq!(backward[1].fill.color(0), scale.color(2.5));

        let rotor_speed = figure.points_labeled("Rotor speed");
        assert_eq!(rotor_speed, vec![Point::new(0., 0.), Point::new(50., 50.)]);
        assert_eq!(figure.points_labeled("2x")[1], Point::new(50., 100.));
        assert!(figure.lines().all(|line| line.dash == Dash::DotDash));
    }

    #[test]
    fn wrong_payload() {
        let results = CampbellResults::from_array(AnnotatedArray::new(
            Array3::<f64>::zeros((2, 1, 4)),
            Attributes::new(),
        ));
        assert!(matches!(
            results.layout(&CampbellOptions::default()),
            Err(PlotError::Data(AnnotatedArrayError::PayloadShape { .. }))
        ));
    }

    #[test]
    fn html_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::default()
            .output_html(true)
            .output_dir(dir.path());
        let results = campbell(&[[80., 0.1, 0., 0., 82.]], 1);
        let rendered = results.plot(&CampbellOptions::default(), &config).unwrap();
        assert!(dir.path().join("Campbell_diagram.html").exists());
        assert_eq!(rendered.layout(), rendered.interactive.layout());
    }
}
