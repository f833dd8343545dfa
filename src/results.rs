//! Result kinds
//!
//! Each analysis result is an [AnnotatedArray] whose payload layout and
//! attributes depend on its [ResultKind]. The typed wrappers of the renderer
//! modules implement [TypedResults] and [Results] dispatches over all of them.

use std::{fmt::Display, path::Path};

use crate::{
    Plot, RenderConfig,
    campbell::{CampbellOptions, CampbellResults},
    codec::{self, CodecError, DeserializationError, Element},
    convergence::ConvergenceResults,
    data::{AnnotatedArray, Attributes},
    figure::{PlotError, Rendered},
    forced_response::{ForcedResponseOptions, ForcedResponseResults},
    frequency_response::{FrequencyResponseOptions, FrequencyResponseResults},
    mode_shape::{ModeShapeOptions, ModeShapeResults},
    static_analysis::StaticResults,
};

/// Tag of the result kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultKind {
    Generic = 0,
    Campbell = 1,
    FrequencyResponse = 2,
    ForcedResponse = 3,
    ModeShape = 4,
    StaticAnalysis = 5,
    Convergence = 6,
}

impl ResultKind {
    pub(crate) fn tag(&self) -> u8 {
        *self as u8
    }
    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        use ResultKind::*;
        [
            Generic,
            Campbell,
            FrequencyResponse,
            ForcedResponse,
            ModeShape,
            StaticAnalysis,
            Convergence,
        ]
        .into_iter()
        .find(|kind| kind.tag() == tag)
    }
}

impl Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResultKind::Generic => "generic",
            ResultKind::Campbell => "Campbell",
            ResultKind::FrequencyResponse => "frequency response",
            ResultKind::ForcedResponse => "forced response",
            ResultKind::ModeShape => "mode shape",
            ResultKind::StaticAnalysis => "static analysis",
            ResultKind::Convergence => "convergence",
        };
        f.write_str(name)
    }
}

/// Annotated array of a known [ResultKind]
pub trait TypedResults: Sized {
    const KIND: ResultKind;
    type Element: Element;

    fn from_array(array: AnnotatedArray<Self::Element>) -> Self;
    fn as_array(&self) -> &AnnotatedArray<Self::Element>;
    fn into_inner(self) -> AnnotatedArray<Self::Element>;

    /// Encodes the results, the frame records the result kind
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode(Self::KIND, self.as_array())
    }
    /// Decodes results encoded with [TypedResults::to_bytes]
    ///
    /// Frames of another kind are rejected
    fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let header = codec::read_header(bytes)?;
        if header.kind != Self::KIND {
            return Err(DeserializationError::UnexpectedKind {
                expected: Self::KIND,
                found: header.kind,
            });
        }
        Ok(Self::from_array(codec::decode_body(&header)?))
    }
    fn save(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        codec::save_as(Self::KIND, self.as_array(), path)
    }
    fn load(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let bytes = codec::read_frame(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
}

/// Renderer arguments of all the result kinds
///
/// Only the options matching the kind of the rendered result are used
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub campbell: CampbellOptions,
    pub frequency_response: FrequencyResponseOptions,
    pub forced_response: ForcedResponseOptions,
    pub mode_shape: ModeShapeOptions,
}

/// Results of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Results {
    Generic(AnnotatedArray),
    Campbell(CampbellResults),
    FrequencyResponse(FrequencyResponseResults),
    ForcedResponse(ForcedResponseResults),
    ModeShape(ModeShapeResults),
    StaticAnalysis(StaticResults),
    Convergence(ConvergenceResults),
}

impl Results {
    pub fn kind(&self) -> ResultKind {
        match self {
            Results::Generic(_) => ResultKind::Generic,
            Results::Campbell(_) => CampbellResults::KIND,
            Results::FrequencyResponse(_) => FrequencyResponseResults::KIND,
            Results::ForcedResponse(_) => ForcedResponseResults::KIND,
            Results::ModeShape(_) => ModeShapeResults::KIND,
            Results::StaticAnalysis(_) => StaticResults::KIND,
            Results::Convergence(_) => ConvergenceResults::KIND,
        }
    }
    pub fn shape(&self) -> &[usize] {
        match self {
            Results::Generic(array) => array.shape(),
            Results::Campbell(results) => results.as_array().shape(),
            Results::FrequencyResponse(results) => results.as_array().shape(),
            Results::ForcedResponse(results) => results.as_array().shape(),
            Results::ModeShape(results) => results.as_array().shape(),
            Results::StaticAnalysis(results) => results.as_array().shape(),
            Results::Convergence(results) => results.as_array().shape(),
        }
    }
    pub fn attributes(&self) -> &Attributes {
        match self {
            Results::Generic(array) => array.attributes(),
            Results::Campbell(results) => results.as_array().attributes(),
            Results::FrequencyResponse(results) => results.as_array().attributes(),
            Results::ForcedResponse(results) => results.as_array().attributes(),
            Results::ModeShape(results) => results.as_array().attributes(),
            Results::StaticAnalysis(results) => results.as_array().attributes(),
            Results::Convergence(results) => results.as_array().attributes(),
        }
    }
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Results::Generic(array) => array.to_bytes(),
            Results::Campbell(results) => results.to_bytes(),
            Results::FrequencyResponse(results) => results.to_bytes(),
            Results::ForcedResponse(results) => results.to_bytes(),
            Results::ModeShape(results) => results.to_bytes(),
            Results::StaticAnalysis(results) => results.to_bytes(),
            Results::Convergence(results) => results.to_bytes(),
        }
    }
    /// Decodes results of any kind, the kind recorded in the frame selects the variant
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let header = codec::read_header(bytes)?;
        log::debug!("decoding {} results", header.kind);
        Ok(match header.kind {
            ResultKind::Generic => Results::Generic(codec::decode_body(&header)?),
            ResultKind::Campbell => {
                Results::Campbell(CampbellResults::from_array(codec::decode_body(&header)?))
            }
            ResultKind::FrequencyResponse => Results::FrequencyResponse(
                FrequencyResponseResults::from_array(codec::decode_body(&header)?),
            ),
            ResultKind::ForcedResponse => Results::ForcedResponse(
                ForcedResponseResults::from_array(codec::decode_body(&header)?),
            ),
            ResultKind::ModeShape => {
                Results::ModeShape(ModeShapeResults::from_array(codec::decode_body(&header)?))
            }
            ResultKind::StaticAnalysis => {
                Results::StaticAnalysis(StaticResults::from_array(codec::decode_body(&header)?))
            }
            ResultKind::Convergence => Results::Convergence(ConvergenceResults::from_array(
                codec::decode_body(&header)?,
            )),
        })
    }
    /// Saves the results to `path`
    ///
    /// A `pkl` extension writes a Python pickle of the annotated array
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CodecError> {
        match self {
            Results::Generic(array) => array.save(path),
            Results::Campbell(results) => results.save(path),
            Results::FrequencyResponse(results) => results.save(path),
            Results::ForcedResponse(results) => results.save(path),
            Results::ModeShape(results) => results.save(path),
            Results::StaticAnalysis(results) => results.save(path),
            Results::Convergence(results) => results.save(path),
        }
    }
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let bytes = codec::read_frame(path)?;
        Ok(Self::from_bytes(&bytes)?)
    }
    /// Renders the results with the renderer of their kind
    ///
    /// Generic results cannot be rendered
    pub fn plot(&self, selection: &Selection, config: &RenderConfig) -> Result<Rendered, PlotError> {
        match self {
            Results::Generic(array) => Ok(array.plot()?),
            Results::Campbell(results) => results.plot(&selection.campbell, config),
            Results::FrequencyResponse(results) => {
                results.plot(&selection.frequency_response, config)
            }
            Results::ForcedResponse(results) => results.plot(&selection.forced_response, config),
            Results::ModeShape(results) => results.plot(&selection.mode_shape, config),
            Results::StaticAnalysis(results) => results.plot(&(), config),
            Results::Convergence(results) => results.plot(&(), config),
        }
    }
}

impl Display for Results {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} results", self.kind())?;
        writeln!(f, " + payload shape: {:?}", self.shape())?;
        let attributes = self.attributes();
        if attributes.is_empty() {
            writeln!(f, " + no attributes")?;
        } else {
            for (name, value) in attributes.iter() {
                writeln!(f, " + {name}: {}", value.type_name())?;
            }
        }
        Ok(())
    }
}

macro_rules! impl_from_results {
    ($($variant:ident($results:ty)),* $(,)?) => {
        $(
            impl From<$results> for Results {
                fn from(value: $results) -> Self {
                    Results::$variant(value)
                }
            }
        )*
    };
}
impl_from_results!(
    Generic(AnnotatedArray),
    Campbell(CampbellResults),
    FrequencyResponse(FrequencyResponseResults),
    ForcedResponse(ForcedResponseResults),
    ModeShape(ModeShapeResults),
    StaticAnalysis(StaticResults),
    Convergence(ConvergenceResults),
);

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};

    use super::*;
    use crate::data::AnnotatedArrayError;

    fn convergence() -> ConvergenceResults {
        let payload = Array2::from_shape_vec(
            (3, 3),
            vec![10., 20., 40., 100., 105., 106., 0., 4.76, 0.94],
        )
        .unwrap();
        ConvergenceResults::from_array(AnnotatedArray::new(payload, Attributes::new()))
    }

    #[test]
    fn kind_tags() {
        for tag in 0..7 {
            assert_eq!(ResultKind::from_tag(tag).unwrap().tag(), tag);
        }
        assert!(ResultKind::from_tag(7).is_none());
    }

    #[test]
    fn dispatch_on_recorded_kind() {
        let results = Results::from(convergence());
        let bytes = results.to_bytes().unwrap();
        let decoded = Results::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.kind(), ResultKind::Convergence);
        assert_eq!(decoded, results);
        assert_eq!(decoded.shape(), &[3, 3]);
    }

    #[test]
    fn typed_decoding_checks_the_kind() {
        let bytes = convergence().to_bytes().unwrap();
        assert!(matches!(
            CampbellResults::from_bytes(&bytes),
            Err(DeserializationError::UnexpectedKind {
                expected: ResultKind::Campbell,
                found: ResultKind::Convergence
            })
        ));
        // generic decoding accepts any kind
        let array = AnnotatedArray::<f64>::from_bytes(&bytes).unwrap();
        assert_eq!(&array, convergence().as_array());
    }

    #[test]
    fn generic_results_cannot_be_plotted() {
        let results = Results::Generic(AnnotatedArray::new(
            Array3::<f64>::zeros((1, 2, 5)),
            Attributes::new(),
        ));
        assert!(matches!(
            results.plot(&Selection::default(), &RenderConfig::default()),
            Err(PlotError::Data(AnnotatedArrayError::UnsupportedOperation(_)))
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convergence.rres");
        let results = Results::from(convergence());
        results.save(&path).unwrap();
        let loaded = Results::load(&path).unwrap();
        assert_eq!(loaded, results);
        assert!(loaded.to_string().starts_with("convergence results"));
    }
}
