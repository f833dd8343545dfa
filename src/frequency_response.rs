//! Frequency response functionalities
//!
//! The payload is indexed by `[part, input, output, frequency step]` where
//! the part is either the magnitude (0) or the phase (1) of the response.
//! The frequencies are given by the `frequency_range` attribute.

use ndarray::{ArrayD, ArrayView4, Axis, Ix4, s};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError, Attributes, Cartesian2Polar, if64},
    figure::{Figure, Layout, Line, PlotError, Point, palette},
    results::{ResultKind, TypedResults},
};

/// Magnitude units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Units {
    /// meters
    #[default]
    #[value(name = "m")]
    Meters,
    /// peak to peak microns
    #[value(name = "mic-pk-pk")]
    MicronsPeakToPeak,
    /// decibels
    #[value(name = "dB")]
    Decibels,
}

impl Units {
    pub fn axis_label(&self) -> &'static str {
        match self {
            Units::Meters => "Amplitude (m)",
            Units::MicronsPeakToPeak => "Amplitude (μ pk-pk)",
            Units::Decibels => "Amplitude (dB)",
        }
    }
    /// Converts a magnitude in meters
    pub fn convert(&self, magnitude: f64) -> f64 {
        match self {
            Units::Meters => magnitude,
            Units::MicronsPeakToPeak => 2e6 * magnitude,
            Units::Decibels => 20. * magnitude.log10(),
        }
    }
}

/// Magnitude and phase figures of a response
pub(crate) fn response_figures(
    title: &str,
    frequency_range: &[f64],
    magnitude: impl IntoIterator<Item = f64>,
    phase: impl IntoIterator<Item = f64>,
    units: Units,
) -> [Figure; 2] {
    let max_frequency = frequency_range
        .iter()
        .copied()
        .filter(|nu| nu.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let max_frequency = if max_frequency > 0. { max_frequency } else { 1. };
    let curve = |values: Vec<f64>| {
        Line::new(
            frequency_range
                .iter()
                .zip(values)
                .map(|(&nu, value)| Point::new(nu, value))
                .collect(),
            palette::RD_GY[0],
        )
        .width(3)
    };
    let figure = |part: &str| {
        Figure::new(format!("{title} - {part}"))
            .x_label("Frequency (rad/s)")
            .x_range(0., max_frequency)
            .size(900, 400)
    };
    [
        figure("Magnitude")
            .y_label(units.axis_label())
            .with(curve(magnitude.into_iter().map(|x| units.convert(x)).collect())),
        figure("Phase")
            .y_label("Phase")
            .with(curve(phase.into_iter().collect())),
    ]
}

/// Checks that the last payload axis has one step per frequency sample
pub(crate) fn frequency_range<T>(array: &AnnotatedArray<T>) -> Result<Vec<f64>, AnnotatedArrayError> {
    let frequency_range = array.attributes().require_f64_vec("frequency_range")?;
    match array.shape().last() {
        Some(&n) if n == frequency_range.len() => Ok(frequency_range),
        _ => Err(AnnotatedArrayError::PayloadShape {
            expected: "one frequency step per frequency_range sample",
            found: array.shape().to_vec(),
        }),
    }
}

/// Magnitude and phase splitting of a complex response
pub(crate) fn polar_payload(response: &ArrayD<if64>) -> Result<ArrayD<f64>, AnnotatedArrayError> {
    let (magnitude, phase) = (response.magnitude(), response.phase());
    Ok(ndarray::stack(Axis(0), &[magnitude.view(), phase.view()])?)
}

/// Frequency response selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrequencyResponseOptions {
    pub input: usize,
    pub output: usize,
    pub units: Units,
}

/// Transfer functions between inputs and outputs of the rotor
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResponseResults(AnnotatedArray);

impl TypedResults for FrequencyResponseResults {
    const KIND: ResultKind = ResultKind::FrequencyResponse;
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

impl FrequencyResponseResults {
    /// Creates the results from the complex response `[input, output, frequency step]`
    pub fn from_complex(
        response: &ArrayD<if64>,
        frequency_range: Vec<f64>,
    ) -> Result<Self, AnnotatedArrayError> {
        let results = AnnotatedArray::new(
            polar_payload(response)?,
            Attributes::new().with("frequency_range", frequency_range),
        );
        results.expect_shape(4, &[(0, 2)], "[2, input, output, frequency step]")?;
        self::frequency_range(&results)?;
        Ok(Self(results))
    }
    fn payload(&self) -> Result<ArrayView4<'_, f64>, AnnotatedArrayError> {
        self.0
            .expect_shape(4, &[(0, 2)], "[2, input, output, frequency step]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix4>()?)
    }
    /// Magnitude and phase figures from `input` to `output`
    fn figures(&self, input: usize, output: usize, units: Units) -> Result<[Figure; 2], PlotError> {
        let payload = self.payload()?;
        self.0.check_index(1, input)?;
        self.0.check_index(2, output)?;
        let frequency_range = frequency_range(&self.0)?;
        Ok(response_figures(
            "Frequency Response",
            &frequency_range,
            payload.slice(s![0, input, output, ..]).iter().copied(),
            payload.slice(s![1, input, output, ..]).iter().copied(),
            units,
        ))
    }
    /// Magnitude and phase of every input/output pair
    ///
    /// Each input adds a row of magnitudes and a row of phases with one column per output
    pub fn grid(
        &self,
        inputs: &[usize],
        outputs: &[usize],
        units: Units,
    ) -> Result<Layout, PlotError> {
        let mut rows = Vec::with_capacity(2 * inputs.len());
        for &input in inputs {
            let (magnitudes, phases): (Vec<_>, Vec<_>) = outputs
                .iter()
                .map(|&output| {
                    self.figures(input, output, units)
                        .map(|[magnitude, phase]| (magnitude, phase))
                })
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .unzip();
            rows.push(magnitudes);
            rows.push(phases);
        }
        Ok(Layout::grid(rows))
    }
}

impl Plot for FrequencyResponseResults {
    type Options = FrequencyResponseOptions;
    const HTML_FILE: &'static str = "freq_response.html";

    fn layout(&self, options: &FrequencyResponseOptions) -> Result<Layout, PlotError> {
        log::debug!(
            "frequency response from input #{} to output #{}",
            options.input,
            options.output
        );
        let [magnitude, phase] = self.figures(options.input, options.output, options.units)?;
        Ok(Layout::column(vec![magnitude, phase]))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, IxDyn};

    use super::*;

    fn frf() -> FrequencyResponseResults {
        // 1 input, 2 outputs, 3 frequencies
        let response = Array3::from_shape_fn((1, 2, 3), |(_, j, k)| {
            if64::new(0., 1e-6 * (j + 1) as f64 * (k + 1) as f64)
        })
        .into_dyn();
        FrequencyResponseResults::from_complex(&response, vec![0., 50., 100.]).unwrap()
    }

    #[test]
    fn complex_response_split() {
        let results = frf();
        let payload = results.as_array().payload();
        assert_eq!(payload.shape(), &[2, 1, 2, 3]);
        assert!((payload[IxDyn(&[0, 0, 1, 2])] - 6e-6).abs() < 1e-18);
        assert!((payload[IxDyn(&[1, 0, 0, 0])] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn magnitude_and_phase() {
        let results = frf();
        let options = FrequencyResponseOptions {
            input: 0,
            output: 1,
            units: Units::MicronsPeakToPeak,
        };
        let layout = results.layout(&options).unwrap();
        assert_eq!((layout.rows(), layout.columns()), (2, 1));
        let magnitude = layout.find("Frequency Response - Magnitude").unwrap();
        assert_eq!(magnitude.x_range, Some((0., 100.)));
        assert_eq!(magnitude.y_label, "Amplitude (μ pk-pk)");
        assert_eq!((magnitude.width, magnitude.height), (900, 400));
        let line = magnitude.lines().next().unwrap();
        assert!((line.points[2].y - 12.).abs() < 1e-9);
        assert_eq!(line.points[2].x, 100.);
        let phase = layout.find("Frequency Response - Phase").unwrap();
        assert!(phase.lines().next().unwrap().points.len() == 3);
    }

    #[test]
    fn decibels() {
        assert!((Units::Decibels.convert(10.) - 20.).abs() < 1e-12);
        assert_eq!(Units::Meters.convert(0.25), 0.25);
    }

    #[test]
    fn out_of_bounds_selection() {
        let options = FrequencyResponseOptions {
            input: 1,
            ..Default::default()
        };
        assert!(matches!(
            frf().layout(&options),
            Err(PlotError::Data(AnnotatedArrayError::OutOfBounds { axis: 1, .. }))
        ));
    }

    #[test]
    fn missing_frequency_range() {
        let results = FrequencyResponseResults::from_array(AnnotatedArray::new(
            ndarray::Array4::<f64>::zeros((2, 1, 1, 3)),
            Attributes::new(),
        ));
        assert!(matches!(
            results.layout(&Default::default()),
            Err(PlotError::Data(AnnotatedArrayError::MissingAttribute(name))) if name == "frequency_range"
        ));
    }

    #[test]
    fn frequency_mismatch() {
        let response = Array3::<if64>::zeros((1, 1, 4)).into_dyn();
        assert!(matches!(
            FrequencyResponseResults::from_complex(&response, vec![0., 1.]),
            Err(AnnotatedArrayError::PayloadShape { .. })
        ));
    }

    #[test]
    fn response_grid() {
        let layout = frf().grid(&[0], &[0, 1], Units::Meters).unwrap();
        assert_eq!((layout.rows(), layout.columns()), (2, 2));
        assert_eq!(
            layout.figure(1, 1).unwrap().title,
            "Frequency Response - Phase"
        );
    }
}
