//! Static analysis
//!
//! The payload rows are the lateral displacement, the shear force and the
//! bending moment of the shaft. The displacement and the bending moment are
//! given at each node, the shear force at each abscissa of the `shear_axis`
//! attribute, with two abscissae per element for a step diagram. Each row
//! holds its series at the start, padded to the longest one. The diagrams are
//! laid out as
//!
//! | | |
//! |---|---|
//! | free-body diagram | shearing force |
//! | deformed shaft | bending moment |

use ndarray::{ArrayView2, Axis, Ix2};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError, Attributes, invalid},
    figure::{
        Arrow, Dash, Field, Fill, Figure, HAnchor, Label, Layout, LegendPosition, Line, Marker,
        PlotError, Point, Scatter, VAnchor, palette::RD_GY,
    },
    interpolate::{CubicSpline, Quadratic, linspace},
    results::{ResultKind, TypedResults},
};

/// Standard gravity [m/s²]
const GRAVITY: f64 = 9.8065;
const DISPLACEMENT_SCALE: f64 = 1e3;
const SAMPLES_PER_NODE: usize = 20;
const BENDING_SAMPLES: usize = 42;

/// Displacement, shear force and bending moment of the shaft
#[derive(Debug, Clone, PartialEq)]
pub struct StaticResults(AnnotatedArray);

impl TypedResults for StaticResults {
    const KIND: ResultKind = ResultKind::StaticAnalysis;
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

/// Point load of a bearing or of a disk
#[derive(Debug, Clone, Copy, PartialEq)]
struct PointLoad {
    node: usize,
    value: f64,
}

fn records<'a>(attributes: &'a Attributes, name: &str) -> Result<Vec<&'a Attributes>, AnnotatedArrayError> {
    attributes
        .require_list(name)?
        .iter()
        .map(|item| {
            item.as_record()
                .ok_or_else(|| invalid(name, "a list of records"))
        })
        .collect()
}

fn node_index(record: &Attributes, name: &str) -> Result<usize, AnnotatedArrayError> {
    record
        .require("n")?
        .as_usize()
        .ok_or_else(|| invalid(name, "a list of records with a node index"))
}

fn at(values: &[f64], index: usize, name: &str) -> Result<f64, AnnotatedArrayError> {
    values
        .get(index)
        .copied()
        .ok_or_else(|| invalid(name, "indexed by the nodes"))
}

/// Model of the shaft read from the attributes and its payload series
struct Shaft {
    node_positions: Vec<f64>,
    shear_axis: Vec<f64>,
    displacement: Vec<f64>,
    shear: Vec<f64>,
    moment: Vec<f64>,
    weight: f64,
    bearings: Vec<PointLoad>,
    disks: Vec<PointLoad>,
}

impl Shaft {
    fn new(attributes: &Attributes, payload: ArrayView2<'_, f64>) -> Result<Self, AnnotatedArrayError> {
        let columns = payload.len_of(Axis(1));
        let n_node = attributes.require_usize_vec("nodes")?.len();
        if n_node > columns {
            return Err(invalid("nodes", "at most one node per payload column"));
        }
        let node_positions = attributes.require_f64_vec("node_positions")?;
        if node_positions.len() != n_node {
            return Err(invalid("node_positions", "one position per node"));
        }
        let shear_axis = attributes.require_f64_vec("shear_axis")?;
        if shear_axis.len() > columns {
            return Err(invalid("shear_axis", "at most one abscissa per payload column"));
        }
        let row = |index: usize, len: usize| {
            payload
                .index_axis(Axis(0), index)
                .iter()
                .take(len)
                .copied()
                .collect::<Vec<f64>>()
        };
        let displacement = row(0, n_node);
        let shear = row(1, shear_axis.len());
        let moment = row(2, n_node);
        let weight = records(attributes, "shaft_segments")?
            .into_iter()
            .map(|segment| segment.require_f64("m"))
            .sum::<Result<f64, _>>()?
            * GRAVITY;
        // reaction of the bearings to the shaft displacement
        let bearings = records(attributes, "bearings")?
            .into_iter()
            .map(|bearing| {
                let node = node_index(bearing, "bearings")?;
                let kyy = bearing
                    .require_f64_vec("kyy")?
                    .first()
                    .copied()
                    .ok_or_else(|| invalid("kyy", "a stiffness coefficient"))?;
                Ok(PointLoad {
                    node,
                    value: -at(&displacement, node, "bearings")? * kyy,
                })
            })
            .collect::<Result<Vec<_>, AnnotatedArrayError>>()?;
        let disks = records(attributes, "disks")?
            .into_iter()
            .map(|disk| {
                Ok(PointLoad {
                    node: node_index(disk, "disks")?,
                    value: disk.require_f64("m")? * GRAVITY,
                })
            })
            .collect::<Result<Vec<_>, AnnotatedArrayError>>()?;
        Ok(Self {
            node_positions,
            shear_axis,
            displacement,
            shear,
            moment,
            weight,
            bearings,
            disks,
        })
    }
    fn length(&self) -> f64 {
        self.node_positions.last().copied().unwrap_or(1.)
    }
    fn x_range(&self) -> (f64, f64) {
        (-0.1 * self.length(), 1.1 * self.length())
    }
    fn centerline(&self) -> Line {
        let (start, end) = self.x_range();
        Line::new(vec![Point::new(start, 0.), Point::new(end, 0.)], RD_GY[0])
            .width(3)
            .dash(Dash::DotDash)
    }
    fn position(&self, load: &PointLoad, name: &str) -> Result<f64, AnnotatedArrayError> {
        at(&self.node_positions, load.node, name)
    }
}

fn markers(x: &[f64], y: impl IntoIterator<Item = f64>, color: usize) -> Scatter {
    Scatter::new(
        x.iter().zip(y).map(|(&x, y)| Point::new(x, y)).collect(),
        Marker::Circle,
        Fill::Solid(RD_GY[color]),
    )
}

fn polyline(x: &[f64], y: impl IntoIterator<Item = f64>, color: usize) -> Line {
    Line::new(
        x.iter().zip(y).map(|(&x, y)| Point::new(x, y)).collect(),
        RD_GY[color],
    )
}

fn force_arrow(position: f64, from: f64) -> Arrow {
    Arrow::new(Point::new(position, from), Point::new(position, 0.))
}

impl StaticResults {
    fn payload(&self) -> Result<ArrayView2<'_, f64>, AnnotatedArrayError> {
        self.0
            .expect_shape(2, &[(0, 3)], "[displacement/shear force/bending moment, sample]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix2>()?)
    }

    fn free_body_diagram(shaft: &Shaft) -> Result<Figure, AnnotatedArrayError> {
        let (start, end) = shaft.x_range();
        let y_max = std::iter::once(shaft.weight)
            .chain(shaft.bearings.iter().map(|bearing| bearing.value))
            .fold(0f64, |max, force| max.max(force.abs()));
        let y_max = if y_max > 0. { 1.4 * y_max } else { 1. };
        let positions = &shaft.node_positions;
        let mut figure = Figure::new("Free-Body Diagram")
            .x_label("Shaft length")
            .y_label("Force")
            .x_range(start, end)
            .y_range(-y_max, y_max)
            .with(polyline(positions, positions.iter().map(|_| 0.), 0).width(5))
            .with(polyline(positions, positions.iter().map(|_| shaft.weight), 0));
        // shaft weight distribution
        for &position in positions {
            figure.push(force_arrow(position, shaft.weight));
        }
        if let Some(&first) = positions.first() {
            figure.push(
                Label::new(
                    Point::new(first, shaft.weight),
                    format!("W = {:.1}N", shaft.weight),
                )
                .anchor(HAnchor::Left, VAnchor::Top)
                .offset(0, 20)
                .bold(),
            );
        }
        for bearing in &shaft.bearings {
            let position = shaft.position(bearing, "bearings")?;
            figure.push(force_arrow(position, -bearing.value));
            figure.push(
                Label::new(
                    Point::new(position, -bearing.value),
                    format!("Fb = {:.1}N", bearing.value),
                )
                .anchor(HAnchor::Center, VAnchor::Bottom)
                .offset(0, -20)
                .bold(),
            );
        }
        for disk in &shaft.disks {
            let position = shaft.position(disk, "disks")?;
            figure.push(force_arrow(position, disk.value));
            figure.push(
                Label::new(
                    Point::new(position, disk.value),
                    format!("Fd = {:.1}N", disk.value),
                )
                .anchor(HAnchor::Center, VAnchor::Top)
                .offset(0, 20)
                .bold(),
            );
        }
        Ok(figure)
    }

    fn deformed_shaft(shaft: &Shaft) -> Result<Figure, PlotError> {
        let positions = &shaft.node_positions;
        let scaled: Vec<f64> = shaft
            .displacement
            .iter()
            .map(|x| x * DISPLACEMENT_SCALE)
            .collect();
        let deformed = CubicSpline::not_a_knot(positions, &scaled)?
            .sample(positions.len() * SAMPLES_PER_NODE)
            .into_iter()
            .map(Point::from)
            .collect();
        Ok(Figure::new("Static Analysis")
            .x_label("Shaft length")
            .y_label("Lateral displacement")
            .legend(LegendPosition::TopRight)
            .tooltip("Shaft length:", Field::X)
            .tooltip("Displacement:", Field::Y)
            .with(Line::new(deformed, RD_GY[9]).width(3).label("Deformed shaft"))
            .with(markers(positions, scaled, 9).label("Deformed shaft"))
            .with(
                polyline(positions, positions.iter().map(|_| 0.), 0)
                    .width(3)
                    .label("Undeformed shaft"),
            )
            .with(markers(positions, positions.iter().map(|_| 0.), 0).label("Undeformed shaft")))
    }

    fn shearing_force(shaft: &Shaft) -> Figure {
        let (start, end) = shaft.x_range();
        Figure::new("Shearing Force Diagram")
            .x_label("Shaft length")
            .y_label("Force")
            .x_range(start, end)
            .tooltip("Shearing Force:", Field::Y)
            .with(polyline(&shaft.shear_axis, shaft.shear.iter().copied(), 0).width(4))
            .with(markers(&shaft.shear_axis, shaft.shear.iter().copied(), 0))
            .with(shaft.centerline())
    }

    /// Piecewise quadratic interpolation over the node triples (0,1,2), (2,3,4), ...
    fn bending_moment(shaft: &Shaft) -> Result<Figure, PlotError> {
        let (start, end) = shaft.x_range();
        let (positions, moment) = (&shaft.node_positions, &shaft.moment);
        let mut figure = Figure::new("Bending Moment Diagram")
            .x_label("Shaft length")
            .y_label("Bending Moment")
            .x_range(start, end)
            .tooltip("Bending Moment:", Field::Y);
        for i in (0..positions.len().saturating_sub(2)).step_by(2) {
            let quadratic = Quadratic::new(&positions[i..i + 3], &moment[i..i + 3])?;
            let x = linspace(positions[i], positions[i + 2], BENDING_SAMPLES);
            figure.push(polyline(&x, x.iter().map(|&x| quadratic.eval(x)), 0).width(4));
        }
        Ok(figure
            .with(markers(positions, moment.iter().copied(), 0))
            .with(shaft.centerline()))
    }
}

impl Plot for StaticResults {
    type Options = ();
    const HTML_FILE: &'static str = "static_analysis.html";

    fn layout(&self, _: &()) -> Result<Layout, PlotError> {
        let shaft = Shaft::new(self.0.attributes(), self.payload()?)?;
        log::debug!(
            "static analysis of {} nodes, {} bearings and {} disks",
            shaft.node_positions.len(),
            shaft.bearings.len(),
            shaft.disks.len()
        );
        Ok(Layout::grid(vec![
            vec![
                Self::free_body_diagram(&shaft)?,
                Self::shearing_force(&shaft),
            ],
            vec![
                Self::deformed_shaft(&shaft)?,
                Self::bending_moment(&shaft)?,
            ],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;
    use crate::{data::Attribute, interpolate::InterpolationError};

    fn record(fields: &[(&str, Attribute)]) -> Attribute {
        Attribute::Record(fields.iter().cloned().collect())
    }

    fn attributes() -> Attributes {
        let positions = vec![0., 0.25, 0.5, 0.75, 1.];
        Attributes::new()
            .with("nodes", vec![0usize, 1, 2, 3, 4])
            .with("node_positions", positions.clone())
            .with("shear_axis", positions)
            .with(
                "shaft_segments",
                vec![record(&[("m", 2.0.into())]); 4],
            )
            .with(
                "bearings",
                vec![
                    record(&[("n", 0usize.into()), ("kyy", 1e6.into())]),
                    record(&[("n", 4usize.into()), ("kyy", vec![1e6, 0.].into())]),
                ],
            )
            .with(
                "disks",
                vec![record(&[("n", 2usize.into()), ("m", 10.0.into())])],
            )
    }

    fn static_results(attributes: Attributes) -> StaticResults {
        let payload = Array2::from_shape_vec(
            (3, 5),
            vec![
                -1e-4, -2e-4, -3e-4, -2e-4, -1e-4, // displacement
                -50., -50., 50., 50., 0., // shear force
                0., 12.5, 25., 12.5, 0., // bending moment
            ],
        )
        .unwrap();
        StaticResults::from_array(AnnotatedArray::new(payload, attributes))
    }

    #[test]
    fn diagrams_grid() {
        let layout = static_results(attributes()).layout(&()).unwrap();
        assert_eq!((layout.rows(), layout.columns()), (2, 2));
        let titles: Vec<_> = layout.figures().iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Free-Body Diagram",
                "Shearing Force Diagram",
                "Static Analysis",
                "Bending Moment Diagram"
            ]
        );
    }

    #[test]
    fn free_body_diagram() {
        let layout = static_results(attributes()).layout(&()).unwrap();
        let fbd = layout.find("Free-Body Diagram").unwrap();
        assert_eq!(fbd.arrows().count(), 5 + 2 + 1);
        let labels: Vec<_> = fbd.labels().map(|l| l.text.as_str()).collect();
        assert_eq!(
            labels,
            vec!["W = 78.5N", "Fb = 100.0N", "Fb = 100.0N", "Fd = 98.1N"]
        );
        assert!(fbd.labels().all(|l| l.bold));
        assert_eq!(fbd.x_range, Some((-0.1, 1.1)));
        let (lower, upper) = fbd.y_range.unwrap();
        assert!((upper - 140.).abs() < 1e-9 && (lower + 140.).abs() < 1e-9);
        let bearing = fbd.arrows().nth(5).unwrap();
        assert!((bearing.start.y + 100.).abs() < 1e-9);
        assert_eq!(bearing.end, Point::new(0., 0.));
    }

    #[test]
    fn deformed_shaft() {
        let layout = static_results(attributes()).layout(&()).unwrap();
        let figure = layout.find("Static Analysis").unwrap();
        let deformed = figure.points_labeled("Deformed shaft");
        assert_eq!(deformed.len(), 100 + 5);
        let lowest = deformed.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert!((lowest + 0.3).abs() < 1e-2);
        assert!(figure.points_labeled("Undeformed shaft").iter().all(|p| p.y == 0.));
    }

    #[test]
    fn bending_moment() {
        let layout = static_results(attributes()).layout(&()).unwrap();
        let figure = layout.find("Bending Moment Diagram").unwrap();
        let lines: Vec<_> = figure.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines[..2] {
            assert_eq!(line.points.len(), BENDING_SAMPLES);
        }
        assert!((lines[0].points[BENDING_SAMPLES - 1].y - 25.).abs() < 1e-9);
        assert_eq!(lines[2].dash, Dash::DotDash);
    }

    #[test]
    fn missing_bearings() {
        let mut attributes: Vec<(String, Attribute)> = attributes()
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        attributes.retain(|(name, _)| name != "bearings");
        let results = static_results(attributes.into_iter().collect());
        assert!(matches!(
            results.layout(&()),
            Err(PlotError::Data(AnnotatedArrayError::MissingAttribute(name))) if name == "bearings"
        ));
    }

    #[test]
    fn bearing_beyond_the_shaft() {
        let results = static_results(attributes().with(
            "bearings",
            vec![record(&[("n", 7usize.into()), ("kyy", 1e6.into())])],
        ));
        assert!(matches!(
            results.layout(&()),
            Err(PlotError::Data(AnnotatedArrayError::InvalidAttribute { name, .. })) if name == "bearings"
        ));
    }

    #[test]
    fn unsorted_nodes() {
        let results =
            static_results(attributes().with("node_positions", vec![0., 0.5, 0.25, 0.75, 1.]));
        assert!(matches!(
            results.layout(&()),
            Err(PlotError::Interpolation(InterpolationError::NotIncreasing))
        ));
    }

    #[test]
    fn shear_on_a_doubled_axis() {
        let attributes = attributes()
            .with("nodes", vec![0usize, 1, 2])
            .with("node_positions", vec![0., 0.5, 1.])
            .with("shear_axis", vec![0., 0.5, 0.5, 1.])
            .with(
                "bearings",
                vec![
                    record(&[("n", 0usize.into()), ("kyy", 1e6.into())]),
                    record(&[("n", 2usize.into()), ("kyy", 1e6.into())]),
                ],
            )
            .with(
                "disks",
                vec![record(&[("n", 1usize.into()), ("m", 10.0.into())])],
            );
        let payload = Array2::from_shape_vec(
            (3, 4),
            vec![
                -1e-4, -2e-4, -1e-4, f64::NAN, // displacement
                -50., -50., 50., 50., // shear force
                0., 25., 0., f64::NAN, // bending moment
            ],
        )
        .unwrap();
        let results = StaticResults::from_array(AnnotatedArray::new(payload, attributes.clone()));
        let layout = results.layout(&()).unwrap();

        let shear = layout.find("Shearing Force Diagram").unwrap();
        let points = &shear.lines().next().unwrap().points;
        assert_eq!(
            *points,
            vec![
                Point::new(0., -50.),
                Point::new(0.5, -50.),
                Point::new(0.5, 50.),
                Point::new(1., 50.)
            ]
        );
        let deformed = layout.find("Static Analysis").unwrap();
        assert!(deformed.points_labeled("Deformed shaft").iter().all(|p| p.y.is_finite()));
        let moment = layout.find("Bending Moment Diagram").unwrap();
        assert_eq!(moment.scatters().next().unwrap().points.len(), 3);

        let results = StaticResults::from_array(AnnotatedArray::new(
            Array2::zeros((3, 4)),
            attributes.with("shear_axis", vec![0., 0.25, 0.25, 0.5, 0.5, 1.]),
        ));
        assert!(matches!(
            results.layout(&()),
            Err(PlotError::Data(AnnotatedArrayError::InvalidAttribute { name, .. })) if name == "shear_axis"
        ));
    }
}
