//! Command line interface

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::{
    CampbellOptions, ForcedResponseOptions, FrequencyResponseOptions, ModeShapeOptions,
    RenderConfig, Selection, Units, static_plot::is_svg,
};

/// Rotordynamics results rendering
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// prints the kind, the payload shape and the attributes of a results file
    Info { file: PathBuf },
    /// renders a results file
    Plot(PlotArgs),
    /// saves a results file into another file, a `pkl` extension writes a Python pickle
    Convert { file: PathBuf, out: PathBuf },
}

#[derive(Debug, Args)]
pub struct PlotArgs {
    /// results file
    pub file: PathBuf,
    /// writes the interactive plot to an HTML file, `--html=false` turns it off
    #[arg(
        long,
        env = "ROTOR_RESULTS_HTML",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub html: bool,
    /// HTML files directory
    #[arg(short, long, env = "ROTOR_RESULTS_DIR", default_value = ".")]
    pub dir: PathBuf,
    /// static plot SVG document
    #[arg(long, value_parser = svg_file)]
    pub svg: Option<PathBuf>,
    /// frequency response input
    #[arg(short, long, default_value_t = 0)]
    pub input: usize,
    /// frequency response output
    #[arg(short, long, default_value_t = 0)]
    pub output: usize,
    /// forced response degree of freedom
    #[arg(long, default_value_t = 0)]
    pub dof: usize,
    /// mode shape index
    #[arg(short, long, default_value_t = 0)]
    pub mode: usize,
    /// magnitude units of the frequency and forced responses
    #[arg(short, long, value_enum, default_value_t = Units::Meters)]
    pub units: Units,
    /// rotor speed multiples drawn on the Campbell diagram
    #[arg(long, num_args = 1.., default_values_t = vec![1f64])]
    pub harmonics: Vec<f64>,
    /// Campbell diagram of the undamped natural frequencies
    #[arg(long)]
    pub undamped: bool,
    /// opens the interactive plot in the web browser
    #[arg(long)]
    pub show: bool,
}

impl PlotArgs {
    /// Returns the renderer arguments
    pub fn selection(&self) -> Selection {
        Selection {
            campbell: CampbellOptions {
                harmonics: self.harmonics.clone(),
                undamped: self.undamped,
            },
            frequency_response: FrequencyResponseOptions {
                input: self.input,
                output: self.output,
                units: self.units,
            },
            forced_response: ForcedResponseOptions {
                dof: self.dof,
                units: self.units,
            },
            mode_shape: ModeShapeOptions { mode: self.mode },
        }
    }
    /// Returns the output settings
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::default()
            .output_html(self.html)
            .output_dir(&self.dir)
    }
}

fn svg_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if is_svg(&path) {
        Ok(path)
    } else {
        Err(format!("expected a file with the `svg` extension, found {value:?}"))
    }
}
