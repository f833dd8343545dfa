//! Annotated result arrays
//!
//! An [AnnotatedArray] is a numeric payload with a set of named [Attribute]s
//! riding alongside it. The attributes are opaque to the container: they are
//! never checked against the payload shape.
//!
//! Derived arrays (slices, copies, element-wise maps, concatenations) are
//! produced through the methods below, each of them carrying the attributes
//! over to the result.

use std::{collections::BTreeMap, fmt::Display};

use ndarray::{Array, Array1, ArrayD, Axis, Dimension, ErrorKind, ShapeError, Slice, Zip};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::figure::Rendered;

/// Complex double precision number
#[allow(non_camel_case_types)]
pub type if64 = Complex<f64>;

#[derive(Debug, thiserror::Error)]
pub enum AnnotatedArrayError {
    #[error("attributes must be a mapping of names to values, found {0}")]
    Construction(&'static str),
    #[error(r#"missing attribute "{0}""#)]
    MissingAttribute(String),
    #[error(r#"attribute "{name}" is not {expected}"#)]
    InvalidAttribute { name: String, expected: &'static str },
    #[error("payload of shape {found:?} does not match {expected}")]
    PayloadShape {
        expected: &'static str,
        found: Vec<usize>,
    },
    #[error("axis {axis} does not exist in a {ndim}-dimensional payload")]
    InvalidAxis { axis: usize, ndim: usize },
    #[error("index {index} is out of bounds for axis {axis} of length {len}")]
    OutOfBounds { axis: usize, index: isize, len: usize },
    #[error("{0} is not supported on a generic result")]
    UnsupportedOperation(&'static str),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
type Result<T> = std::result::Result<T, AnnotatedArrayError>;

/// Auxiliary value attached to a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(if64),
    Text(String),
    List(Vec<Attribute>),
    Array(ArrayD<f64>),
    Record(Attributes),
}

impl Attribute {
    /// Returns a short name of the attribute variant
    pub fn type_name(&self) -> &'static str {
        match self {
            Attribute::Null => "null",
            Attribute::Bool(_) => "a boolean",
            Attribute::Int(_) => "an integer",
            Attribute::Float(_) => "a float",
            Attribute::Complex(_) => "a complex number",
            Attribute::Text(_) => "a text",
            Attribute::List(_) => "a list",
            Attribute::Array(_) => "an array",
            Attribute::Record(_) => "a record",
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Attribute::Float(x) => Some(*x),
            Attribute::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Attribute::Int(i) if *i >= 0 => Some(*i as usize),
            Attribute::Float(x) if is_index(*x) => Some(*x as usize),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
    pub fn as_list(&self) -> Option<&[Attribute]> {
        match self {
            Attribute::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
    pub fn as_record(&self) -> Option<&Attributes> {
        match self {
            Attribute::Record(record) => Some(record),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Attribute::Array(array) => Some(array),
            _ => None,
        }
    }
    /// Flattens a numeric attribute into a vector
    ///
    /// Arrays are read in logical order, lists must hold numbers only and
    /// scalars give a single element vector
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Attribute::Array(array) => Some(array.iter().copied().collect()),
            Attribute::List(items) => items.iter().map(Attribute::as_f64).collect(),
            Attribute::Float(_) | Attribute::Int(_) => self.as_f64().map(|x| vec![x]),
            _ => None,
        }
    }
    /// Flattens an attribute of non-negative integers into a vector of indices
    pub fn to_usize_vec(&self) -> Option<Vec<usize>> {
        match self {
            Attribute::Array(array) => array
                .iter()
                .map(|x| is_index(*x).then_some(*x as usize))
                .collect(),
            Attribute::List(items) => items.iter().map(Attribute::as_usize).collect(),
            Attribute::Int(_) => self.as_usize().map(|i| vec![i]),
            _ => None,
        }
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Attribute::Float(value)
    }
}
impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::Int(value)
    }
}
impl From<i32> for Attribute {
    fn from(value: i32) -> Self {
        Attribute::Int(value as i64)
    }
}
impl From<usize> for Attribute {
    fn from(value: usize) -> Self {
        Attribute::Int(value as i64)
    }
}
impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}
impl From<if64> for Attribute {
    fn from(value: if64) -> Self {
        Attribute::Complex(value)
    }
}
impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::Text(value.to_string())
    }
}
impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::Text(value)
    }
}
impl From<Vec<f64>> for Attribute {
    fn from(value: Vec<f64>) -> Self {
        Attribute::Array(Array1::from_vec(value).into_dyn())
    }
}
impl From<Vec<usize>> for Attribute {
    fn from(value: Vec<usize>) -> Self {
        Attribute::List(value.into_iter().map(Attribute::from).collect())
    }
}
impl From<Vec<&str>> for Attribute {
    fn from(value: Vec<&str>) -> Self {
        Attribute::List(value.into_iter().map(Attribute::from).collect())
    }
}
impl From<Vec<Attribute>> for Attribute {
    fn from(value: Vec<Attribute>) -> Self {
        Attribute::List(value)
    }
}
impl<D: Dimension> From<Array<f64, D>> for Attribute {
    fn from(value: Array<f64, D>) -> Self {
        Attribute::Array(value.into_dyn())
    }
}
impl From<Attributes> for Attribute {
    fn from(value: Attributes) -> Self {
        Attribute::Record(value)
    }
}

/// Named attributes, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Attribute>);

impl Attributes {
    pub fn new() -> Self {
        Default::default()
    }
    /// Adds or replaces the attribute `name`
    pub fn with<K: Into<String>, V: Into<Attribute>>(mut self, name: K, value: V) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.get(name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    /// Returns the attribute names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Returns the attribute `name` or a [AnnotatedArrayError::MissingAttribute] error
    pub fn require(&self, name: &str) -> Result<&Attribute> {
        self.get(name)
            .ok_or_else(|| AnnotatedArrayError::MissingAttribute(name.to_string()))
    }
    pub fn require_f64(&self, name: &str) -> Result<f64> {
        self.require(name)?
            .as_f64()
            .ok_or_else(|| invalid(name, "a number"))
    }
    pub fn require_f64_vec(&self, name: &str) -> Result<Vec<f64>> {
        self.require(name)?
            .to_f64_vec()
            .ok_or_else(|| invalid(name, "a sequence of numbers"))
    }
    pub fn require_usize_vec(&self, name: &str) -> Result<Vec<usize>> {
        self.require(name)?
            .to_usize_vec()
            .ok_or_else(|| invalid(name, "a sequence of indices"))
    }
    pub fn require_list(&self, name: &str) -> Result<&[Attribute]> {
        self.require(name)?
            .as_list()
            .ok_or_else(|| invalid(name, "a list"))
    }
}

/// Non-negative integral float within the `usize` range
fn is_index(x: f64) -> bool {
    x >= 0. && x.fract() == 0. && x < usize::MAX as f64
}

pub(crate) fn invalid(name: &str, expected: &'static str) -> AnnotatedArrayError {
    AnnotatedArrayError::InvalidAttribute {
        name: name.to_string(),
        expected,
    }
}

impl<K: Into<String>, V: Into<Attribute>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Source of the attributes of a derived array
///
/// Bare arrays have none, in which case propagation is skipped
pub trait AttributeSource {
    fn attribute_source(&self) -> Option<&Attributes>;
}
impl<T> AttributeSource for AnnotatedArray<T> {
    fn attribute_source(&self) -> Option<&Attributes> {
        Some(&self.attributes)
    }
}
impl<T, D: Dimension> AttributeSource for Array<T, D> {
    fn attribute_source(&self) -> Option<&Attributes> {
        None
    }
}

/// Numeric payload with named attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedArray<T = f64> {
    payload: ArrayD<T>,
    attributes: Attributes,
}

impl<T> AnnotatedArray<T> {
    /// Creates an array from a payload and its attributes
    pub fn new<D: Dimension>(payload: Array<T, D>, attributes: Attributes) -> Self {
        Self {
            payload: payload.into_dyn(),
            attributes,
        }
    }
    /// Creates an array from a payload and an attribute value
    ///
    /// The value must be an [Attribute::Record], anything else is a construction error
    pub fn create<D: Dimension>(payload: Array<T, D>, attributes: Attribute) -> Result<Self> {
        match attributes {
            Attribute::Record(attributes) => Ok(Self::new(payload, attributes)),
            other => Err(AnnotatedArrayError::Construction(other.type_name())),
        }
    }
    /// Wraps `payload` with the attributes of `source`
    ///
    /// If `source` carries no attributes the derived array has none either
    pub fn derive<S: AttributeSource + ?Sized>(payload: ArrayD<T>, source: &S) -> Self {
        let attributes = match source.attribute_source() {
            Some(attributes) => attributes.clone(),
            None => {
                log::debug!("derivation source carries no attributes, propagation skipped");
                Attributes::default()
            }
        };
        Self {
            payload,
            attributes,
        }
    }
    pub fn payload(&self) -> &ArrayD<T> {
        &self.payload
    }
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
    pub fn shape(&self) -> &[usize] {
        self.payload.shape()
    }
    pub fn ndim(&self) -> usize {
        self.payload.ndim()
    }
    /// Consumes the array, dropping the attributes
    pub fn into_payload(self) -> ArrayD<T> {
        self.payload
    }
    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis < self.ndim() {
            Ok(())
        } else {
            Err(AnnotatedArrayError::InvalidAxis {
                axis,
                ndim: self.ndim(),
            })
        }
    }
    /// Checks that `ndim` and the given fixed axis lengths match the payload
    pub(crate) fn expect_shape(
        &self,
        ndim: usize,
        fixed: &[(usize, usize)],
        expected: &'static str,
    ) -> Result<()> {
        let shape = self.shape();
        if shape.len() == ndim && fixed.iter().all(|&(axis, len)| shape[axis] == len) {
            Ok(())
        } else {
            Err(AnnotatedArrayError::PayloadShape {
                expected,
                found: shape.to_vec(),
            })
        }
    }
    pub(crate) fn check_index(&self, axis: usize, index: usize) -> Result<()> {
        self.check_axis(axis)?;
        let len = self.payload.len_of(Axis(axis));
        if index < len {
            Ok(())
        } else {
            Err(AnnotatedArrayError::OutOfBounds {
                axis,
                index: index as isize,
                len,
            })
        }
    }
    /// Generic results have no rendering
    pub fn plot(&self) -> Result<Rendered> {
        Err(AnnotatedArrayError::UnsupportedOperation("plot"))
    }
}

impl<T: Clone> AnnotatedArray<T> {
    /// Slices the payload along `axis`, keeping the attributes
    pub fn slice_axis(&self, axis: usize, slice: Slice) -> Result<Self> {
        self.check_axis(axis)?;
        let len = self.payload.len_of(Axis(axis));
        let signed_len = len as isize;
        let absolute = |i: isize| if i < 0 { i + signed_len } else { i };
        let start = absolute(slice.start);
        let end = slice.end.map_or(signed_len, absolute);
        for index in [start, end] {
            if !(0..=signed_len).contains(&index) {
                return Err(AnnotatedArrayError::OutOfBounds { axis, index, len });
            }
        }
        if slice.step == 0 {
            return Err(ShapeError::from_kind(ErrorKind::Unsupported).into());
        }
        let payload = self.payload.slice_axis(Axis(axis), slice).to_owned();
        Ok(Self::derive(payload, self))
    }
    /// Selects the sub-array at `index` along `axis`, keeping the attributes
    ///
    /// The payload loses one dimension
    pub fn index_axis(&self, axis: usize, index: usize) -> Result<Self> {
        self.check_index(axis, index)?;
        let payload = self.payload.index_axis(Axis(axis), index).to_owned();
        Ok(Self::derive(payload, self))
    }
    /// Returns a copy of the payload without the attributes
    pub fn discard_attributes(&self) -> ArrayD<T> {
        self.payload.clone()
    }
    /// Applies `f` to every element, keeping the attributes
    pub fn mapv<U, F: FnMut(T) -> U>(&self, f: F) -> AnnotatedArray<U> {
        AnnotatedArray::derive(self.payload.mapv(f), self)
    }
    /// Combines two arrays of identical shape element by element
    ///
    /// The attributes are the ones of `self`
    pub fn zip_with<U, V, F>(&self, other: &AnnotatedArray<U>, mut f: F) -> Result<AnnotatedArray<V>>
    where
        F: FnMut(&T, &U) -> V,
    {
        if self.shape() != other.shape() {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        let payload = Zip::from(&self.payload)
            .and(&other.payload)
            .map_collect(|a, b| f(a, b));
        Ok(AnnotatedArray::derive(payload, self))
    }
    /// Joins arrays along `axis`, the attributes are the ones of the first array
    pub fn concatenate(axis: usize, arrays: &[&Self]) -> Result<Self> {
        let Some(first) = arrays.first() else {
            return Err(ShapeError::from_kind(ErrorKind::Unsupported).into());
        };
        first.check_axis(axis)?;
        let views: Vec<_> = arrays.iter().map(|a| a.payload.view()).collect();
        let payload = ndarray::concatenate(Axis(axis), &views)?;
        Ok(Self::derive(payload, *first))
    }
}

impl<T> Display for AnnotatedArray<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "annotated array:")?;
        writeln!(f, " + payload shape: {:?}", self.shape())?;
        if self.attributes.is_empty() {
            writeln!(f, " + no attributes")?;
        } else {
            for (name, value) in self.attributes.iter() {
                writeln!(f, " + {name}: {}", value.type_name())?;
            }
        }
        Ok(())
    }
}

/// Polar form of complex responses
pub trait Cartesian2Polar {
    type Output;
    fn magnitude(&self) -> Self::Output;
    fn phase(&self) -> Self::Output;
}

impl Cartesian2Polar for ArrayD<if64> {
    type Output = ArrayD<f64>;

    fn magnitude(&self) -> Self::Output {
        self.mapv(|x| x.norm())
    }

    fn phase(&self) -> Self::Output {
        self.mapv(|x| x.arg())
    }
}

impl Cartesian2Polar for if64 {
    type Output = f64;

    fn magnitude(&self) -> Self::Output {
        self.norm()
    }

    fn phase(&self) -> Self::Output {
        self.arg()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn sample() -> AnnotatedArray {
        let payload = Array2::from_shape_fn((4, 3), |(i, j)| (i * 3 + j) as f64);
        let attributes = Attributes::new()
            .with("frequency_range", vec![0., 10., 20.])
            .with("speed", 100.)
            .with(
                "bearing",
                Attributes::new().with("n", 0usize).with("kyy", 1e6),
            );
        AnnotatedArray::new(payload, attributes)
    }

    #[test]
    fn slice_keeps_attributes() {
        let results = sample();
        let sliced = results.slice_axis(0, Slice::new(1, Some(3), 1)).unwrap();
        assert_eq!(sliced.shape(), &[2, 3]);
        assert_eq!(sliced.attributes(), results.attributes());
        assert_eq!(sliced.payload()[[0, 0]], 3.);
        assert_eq!(sliced.payload()[[1, 2]], 8.);
    }

    #[test]
    fn index_keeps_attributes() {
        let results = sample();
        let row = results.index_axis(1, 2).unwrap();
        assert_eq!(row.shape(), &[4]);
        assert_eq!(row.attributes(), results.attributes());
        assert!(matches!(
            results.index_axis(1, 3),
            Err(AnnotatedArrayError::OutOfBounds { axis: 1, .. })
        ));
        assert!(matches!(
            results.index_axis(2, 0),
            Err(AnnotatedArrayError::InvalidAxis { axis: 2, ndim: 2 })
        ));
    }

    #[test]
    fn slice_out_of_bounds() {
        let results = sample();
        assert!(matches!(
            results.slice_axis(0, Slice::new(2, Some(9), 1)),
            Err(AnnotatedArrayError::OutOfBounds { index: 9, .. })
        ));
        let tail = results.slice_axis(0, Slice::new(-2, None, 1)).unwrap();
        assert_eq!(tail.shape(), &[2, 3]);
    }

    #[test]
    fn map_and_zip_keep_attributes() {
        let results = sample();
        let doubled = results.mapv(|x| 2. * x);
        assert_eq!(doubled.attributes(), results.attributes());
        let sum = results.zip_with(&doubled, |a, b| a + b).unwrap();
        assert_eq!(sum.payload()[[3, 2]], 33.);
        assert_eq!(sum.attributes(), results.attributes());
        let column = results.index_axis(1, 0).unwrap();
        assert!(results.zip_with(&column, |a, b| a + b).is_err());
    }

    #[test]
    fn concatenate_takes_first_attributes() {
        let results = sample();
        let other = AnnotatedArray::new(Array2::<f64>::zeros((1, 3)), Attributes::new());
        let joined = AnnotatedArray::concatenate(0, &[&results, &other]).unwrap();
        assert_eq!(joined.shape(), &[5, 3]);
        assert_eq!(joined.attributes(), results.attributes());
        assert!(AnnotatedArray::<f64>::concatenate(0, &[]).is_err());
    }

    #[test]
    fn bare_source_skips_propagation() {
        let bare = array![1., 2., 3.].into_dyn();
        let derived = AnnotatedArray::derive(bare.mapv(|x| x * x), &bare);
        assert!(derived.attributes().is_empty());
        assert_eq!(derived.payload(), &array![1., 4., 9.].into_dyn());
    }

    #[test]
    fn create_requires_a_record() {
        let payload = array![1., 2.];
        for attributes in [
            Attribute::Null,
            Attribute::List(vec![Attribute::Float(1.)]),
            Attribute::Float(1.),
            Attribute::Text("speed".into()),
        ] {
            assert!(matches!(
                AnnotatedArray::create(payload.clone(), attributes),
                Err(AnnotatedArrayError::Construction(_))
            ));
        }
        let results = AnnotatedArray::create(
            payload,
            Attributes::new().with("speed", 1.).into(),
        )
        .unwrap();
        assert_eq!(results.attribute("speed"), Some(&Attribute::Float(1.)));
    }

    #[test]
    fn required_attributes() {
        let results = sample();
        let attributes = results.attributes();
        assert_eq!(attributes.require_f64("speed").unwrap(), 100.);
        assert_eq!(
            attributes.require_f64_vec("frequency_range").unwrap(),
            vec![0., 10., 20.]
        );
        assert!(matches!(
            attributes.require("nodes"),
            Err(AnnotatedArrayError::MissingAttribute(name)) if name == "nodes"
        ));
        assert!(matches!(
            attributes.require_list("speed"),
            Err(AnnotatedArrayError::InvalidAttribute { .. })
        ));
        let bearing = attributes.require("bearing").unwrap().as_record().unwrap();
        assert_eq!(bearing.require_f64("kyy").unwrap(), 1e6);
    }

    #[test]
    fn float_indices_within_range() {
        assert_eq!(Attribute::from(vec![0., 2.]).to_usize_vec(), Some(vec![0, 2]));
        assert_eq!(Attribute::from(vec![1e20]).to_usize_vec(), None);
        assert_eq!(Attribute::from(vec![1.5]).to_usize_vec(), None);
        assert_eq!(Attribute::Float(-1.).as_usize(), None);
    }

    #[test]
    fn generic_plot_is_unsupported() {
        assert!(matches!(
            sample().plot(),
            Err(AnnotatedArrayError::UnsupportedOperation("plot"))
        ));
    }

    #[test]
    fn polar_form() {
        let response = array![if64::new(0., 2.), if64::new(-1., 0.)].into_dyn();
        assert_eq!(response.magnitude(), array![2., 1.].into_dyn());
        let phase = response.phase();
        assert!((phase[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((phase[1] - std::f64::consts::PI).abs() < 1e-12);
    }
}
