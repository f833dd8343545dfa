//! Forced response
//!
//! The payload is indexed by `[part, degree of freedom, frequency step]`, the
//! part being the magnitude (0) or the phase (1) of the response to the
//! excitation.

use ndarray::{ArrayD, ArrayView3, Ix3, s};

use crate::{
    Plot,
    data::{AnnotatedArray, AnnotatedArrayError, Attributes, if64},
    figure::{Layout, PlotError},
    frequency_response::{Units, frequency_range, polar_payload, response_figures},
    results::{ResultKind, TypedResults},
};

/// Forced response selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForcedResponseOptions {
    /// Degree of freedom
    pub dof: usize,
    pub units: Units,
}

/// Response of every degree of freedom to an excitation
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedResponseResults(AnnotatedArray);

impl TypedResults for ForcedResponseResults {
    const KIND: ResultKind = ResultKind::ForcedResponse;
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

impl ForcedResponseResults {
    /// Creates the results from the complex response `[degree of freedom, frequency step]`
    pub fn from_complex(
        response: &ArrayD<if64>,
        frequency_range: Vec<f64>,
    ) -> Result<Self, AnnotatedArrayError> {
        let results = AnnotatedArray::new(
            polar_payload(response)?,
            Attributes::new().with("frequency_range", frequency_range),
        );
        results.expect_shape(3, &[(0, 2)], "[2, dof, frequency step]")?;
        self::frequency_range(&results)?;
        Ok(Self(results))
    }
    fn payload(&self) -> Result<ArrayView3<'_, f64>, AnnotatedArrayError> {
        self.0
            .expect_shape(3, &[(0, 2)], "[2, dof, frequency step]")?;
        Ok(self.0.payload().view().into_dimensionality::<Ix3>()?)
    }
}

impl Plot for ForcedResponseResults {
    type Options = ForcedResponseOptions;
    const HTML_FILE: &'static str = "forced_rsponse.html";

    fn layout(&self, options: &ForcedResponseOptions) -> Result<Layout, PlotError> {
        let payload = self.payload()?;
        self.0.check_index(1, options.dof)?;
        let frequency_range = frequency_range(&self.0)?;
        log::debug!("forced response of dof #{}", options.dof);
        let [magnitude, phase] = response_figures(
            "Forced Response",
            &frequency_range,
            payload.slice(s![0, options.dof, ..]).iter().copied(),
            payload.slice(s![1, options.dof, ..]).iter().copied(),
            options.units,
        );
        Ok(Layout::column(vec![magnitude, phase]))
    }
}
