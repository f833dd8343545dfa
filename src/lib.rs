//! Rotordynamics analysis results
//!
//! Results of a rotor analysis are [AnnotatedArray]s: a numeric payload with
//! named attributes riding alongside it. Each kind of result has a renderer
//! drawing a [Layout] of figures that is output both as a static chart
//! ([static_plot]) and as an interactive web document ([interactive]).
//!
//! ```no_run
//! use rotor_results::{RenderConfig, Results, Selection};
//!
//! # fn main() -> anyhow::Result<()> {
//! let results = Results::load("campbell.rres")?;
//! let config = RenderConfig::default().output_html(true).output_dir("plots");
//! let rendered = results.plot(&Selection::default(), &config)?;
//! rendered.static_plot.save("campbell.svg")?;
//! # Ok(())
//! # }
//! ```

pub mod campbell;
pub mod cli;
pub mod codec;
pub mod config;
pub mod convergence;
pub mod data;
pub mod figure;
pub mod forced_response;
pub mod frequency_response;
pub mod interactive;
pub mod interpolate;
pub mod mode_shape;
pub mod results;
pub mod static_analysis;
pub mod static_plot;

pub use campbell::{CampbellOptions, CampbellResults, WhirlDirection};
pub use codec::{CodecError, DeserializationError};
pub use config::RenderConfig;
pub use convergence::ConvergenceResults;
pub use data::{AnnotatedArray, AnnotatedArrayError, Attribute, Attributes, if64};
pub use figure::{Layout, PlotError, Rendered};
pub use forced_response::{ForcedResponseOptions, ForcedResponseResults};
pub use frequency_response::{FrequencyResponseOptions, FrequencyResponseResults, Units};
pub use mode_shape::{ModeShapeOptions, ModeShapeResults};
pub use results::{ResultKind, Results, Selection, TypedResults};
pub use static_analysis::StaticResults;

/// Rendering of a kind of results
pub trait Plot {
    /// Renderer arguments
    type Options: Default;
    /// Name of the interactive document written when [RenderConfig::output_html] is set
    const HTML_FILE: &'static str;

    /// Builds the figures
    fn layout(&self, options: &Self::Options) -> Result<Layout, PlotError>;
    /// Renders the figures into a static and an interactive plot
    ///
    /// The interactive plot is also written to the output directory if requested
    fn plot(&self, options: &Self::Options, config: &RenderConfig) -> Result<Rendered, PlotError> {
        let rendered = Rendered::new(self.layout(options)?);
        if let Some(path) = config.html_path(Self::HTML_FILE) {
            rendered.interactive.save(path)?;
        }
        Ok(rendered)
    }
}
