//! Mode shapes
//!
//! The payload holds the complex eigenvectors, one column per mode, with 4
//! degrees of freedom per node: x, y, alpha and beta.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView2, Axis, Ix2};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError, Attributes, if64, invalid},
    figure::{Dash, Fill, Figure, Layout, Line, Marker, PlotError, Point, Projection, Rgb, Scatter},
    interpolate::linspace,
    results::{ResultKind, TypedResults},
};

const DOF_PER_NODE: usize = 4;
const ORBIT_SAMPLES: usize = 201;
// orbits start after this sample, leaving a gap that shows the whirl sense
const ORBIT_START: usize = 10;
const ELEMENT_SAMPLES: usize = 21;

/// Mode shape selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeShapeOptions {
    pub mode: usize,
}

/// Complex eigenvectors of the rotor
#[derive(Debug, Clone, PartialEq)]
pub struct ModeShapeResults(AnnotatedArray<if64>);

impl TypedResults for ModeShapeResults {
    const KIND: ResultKind = ResultKind::ModeShape;
    type Element = if64;

    fn from_array(array: AnnotatedArray<if64>) -> Self {
        Self(array)
    }
    fn as_array(&self) -> &AnnotatedArray<if64> {
        &self.0
    }
    fn into_inner(self) -> AnnotatedArray<if64> {
        self.0
    }
}

/// Normalizes the eigenvector by its largest y component, or by its largest
/// x component if the y components are small
fn normalize(evec: &mut [if64]) {
    let largest = |offset: usize| {
        evec.iter()
            .skip(offset)
            .step_by(DOF_PER_NODE)
            .copied()
            .fold(None, |largest: Option<if64>, c| match largest {
                Some(l) if l.norm() >= c.norm() => Some(l),
                _ => Some(c),
            })
    };
    let (x, y) = (largest(0), largest(1));
    let norm = |c: Option<if64>| c.map_or(0., |c| c.norm());
    let reference = if norm(y) > 0.4 * norm(x) { y } else { x };
    match reference {
        Some(reference) if reference.norm() > 0. => {
            evec.iter_mut().for_each(|c| *c /= reference);
        }
        _ => log::debug!("null eigenvector, normalization skipped"),
    }
}

/// Cubic Hermite shape functions of an element of length `length`
///
/// `sign` is -1 for the y plane where the rotation is opposite to the slope
fn shape_functions(length: f64, sign: f64) -> DMatrix<f64> {
    let zeta = linspace(0., 1., ELEMENT_SAMPLES);
    DMatrix::from_fn(ELEMENT_SAMPLES, 4, |i, j| {
        let z = zeta[i];
        match j {
            0 => 1. - 3. * z * z + 2. * z.powi(3),
            1 => sign * length * (z - 2. * z * z + z.powi(3)),
            2 => 3. * z * z - 2. * z.powi(3),
            _ => sign * length * (z.powi(3) - z * z),
        }
    })
}

/// Index of the degree of freedom `offset` counted from the first one of `node`
fn dof_index(node: usize, offset: usize) -> Result<usize, AnnotatedArrayError> {
    node.checked_mul(DOF_PER_NODE)
        .and_then(|n| n.checked_add(offset))
        .ok_or_else(|| invalid("nodes", "a list of node indices"))
}

fn element<T: Copy>(values: &[T], index: usize, name: &str) -> Result<T, AnnotatedArrayError> {
    values
        .get(index)
        .copied()
        .ok_or_else(|| invalid(name, "defined for every node and mode"))
}

fn whirl_colors(attributes: &Attributes, mode: usize) -> Result<Vec<Rgb>, AnnotatedArrayError> {
    const NAME: &str = "whirl_color_per_mode";
    attributes
        .require_list(NAME)?
        .get(mode)
        .and_then(|colors| colors.as_list())
        .ok_or_else(|| invalid(NAME, "a list of colors per mode"))?
        .iter()
        .map(|color| {
            color
                .as_str()
                .and_then(Rgb::parse)
                .ok_or_else(|| invalid(NAME, "a list of colors per mode"))
        })
        .collect()
}

impl ModeShapeResults {
    fn payload(&self) -> Result<ArrayView2<'_, if64>, AnnotatedArrayError> {
        self.0.expect_shape(2, &[], "[dof, mode]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix2>()?)
    }
    /// Normalized eigenvector of `mode`
    pub fn eigenvector(&self, mode: usize) -> Result<Vec<if64>, AnnotatedArrayError> {
        let payload = self.payload()?;
        self.0.check_index(1, mode)?;
        let mut evec = payload.index_axis(Axis(1), mode).to_vec();
        normalize(&mut evec);
        Ok(evec)
    }
}

impl Plot for ModeShapeResults {
    type Options = ModeShapeOptions;
    const HTML_FILE: &'static str = "mode_shape.html";

    fn layout(&self, options: &ModeShapeOptions) -> Result<Layout, PlotError> {
        let mode = options.mode;
        let evec = self.eigenvector(mode)?;
        let attributes = self.0.attributes();
        let nodes = attributes.require_usize_vec("nodes")?;
        let node_positions = attributes.require_f64_vec("node_positions")?;
        let element_lengths = attributes.require_f64_vec("element_lengths")?;
        let speed = attributes.require_f64("speed")?;
        let per_mode = |name: &str| element(&attributes.require_f64_vec(name)?, mode, name);
        let damped_frequency = per_mode("damped_freq_per_mode")?;
        let log_dec = per_mode("log_dec_per_mode")?;
        let colors = whirl_colors(attributes, mode)?;
        let dof = |index: usize| {
            evec.get(index).copied().ok_or(AnnotatedArrayError::OutOfBounds {
                axis: 0,
                index: index as isize,
                len: evec.len(),
            })
        };
        log::debug!("mode shape #{mode} of {} nodes", nodes.len());

        let mut figure = Figure::new(format!(
            "speed = {speed:.1} rad/s\ndamped frequency = {damped_frequency:.1} rad/s\nlog dec = {log_dec:.1}"
        ))
        .projection(Projection::Cartesian3d)
        .x_label("Rotor length")
        .y_label("x")
        .z_label("y")
        .size(800, 600);

        // whirl orbits
        let angles = linspace(0., 2. * PI, ORBIT_SAMPLES);
        for &node in &nodes {
            let x = dof(dof_index(node, 0)?)?;
            let y = dof(dof_index(node, 1)?)?;
            let position = element(&node_positions, node, "node_positions")?;
            let color = element(&colors, node, "whirl_color_per_mode")?;
            let orbit: Vec<Point> = angles
                .iter()
                .map(|&angle| {
                    let circle = if64::from_polar(1., angle);
                    Point::xyz(position, (x * circle).re, (y * circle).re)
                })
                .collect();
            figure.push(
                Scatter::new(vec![orbit[ORBIT_START]], Marker::Circle, Fill::Solid(color)).size(3),
            );
            figure.push(Line::new(orbit[ORBIT_START..].to_vec(), color).width(1));
        }

        // deformed centerline
        let mut centerline = Vec::with_capacity(ELEMENT_SAMPLES * element_lengths.len());
        let zeta = linspace(0., 1., ELEMENT_SAMPLES);
        for (&length, &node) in element_lengths.iter().zip(&nodes) {
            let position = element(&node_positions, node, "node_positions")?;
            let real = |offsets: [usize; 4]| -> Result<DVector<f64>, AnnotatedArrayError> {
                let values = offsets
                    .into_iter()
                    .map(|offset| dof(dof_index(node, offset)?).map(|c| c.re))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(DVector::from_vec(values))
            };
            let xn = shape_functions(length, 1.) * real([0, 3, 4, 7])?;
            let yn = shape_functions(length, -1.) * real([1, 2, 5, 6])?;
            centerline.extend(
                zeta.iter()
                    .zip(xn.iter().zip(yn.iter()))
                    .map(|(z, (x, y))| Point::xyz(position + length * z, *x, *y)),
            );
        }
        let end = centerline
            .last()
            .map(|p| p.x)
            .or_else(|| node_positions.last().copied())
            .unwrap_or(1.);
        figure.push(Line::new(centerline, Rgb::BLACK).dash(Dash::Dashed));

        // rotor axis
        let (start, end) = (-0.1 * end, 1.1 * end);
        figure.push(
            Line::new(
                linspace(start, end, 30)
                    .into_iter()
                    .map(|z| Point::xyz(z, 0., 0.))
                    .collect(),
                Rgb::BLACK,
            )
            .width(1)
            .dash(Dash::DotDash),
        );

        Ok(Layout::single(
            figure
                .x_range(start - 0.1, end + 0.1)
                .y_range(-2., 2.)
                .z_range(-2., 2.),
        ))
    }
}
