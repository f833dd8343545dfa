//! Rendering configuration

use std::path::PathBuf;

/// Output settings shared by all the renderers
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Writes the interactive plot to an HTML file
    pub output_html: bool,
    /// Directory of the HTML files
    pub output_dir: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_html: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl RenderConfig {
    pub fn output_html(mut self, output_html: bool) -> Self {
        self.output_html = output_html;
        self
    }
    pub fn output_dir<P: Into<PathBuf>>(mut self, output_dir: P) -> Self {
        self.output_dir = output_dir.into();
        self
    }
    /// Path of the HTML file `file_name` if HTML output is enabled
    pub fn html_path(&self, file_name: &str) -> Option<PathBuf> {
        self.output_html.then(|| self.output_dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert!(!config.output_html);
        assert!(config.html_path("convergence.html").is_none());
    }

    #[test]
    fn builder() {
        let config = RenderConfig::default()
            .output_html(true)
            .output_dir("/tmp/plots");
        assert_eq!(
            config.html_path("convergence.html"),
            Some(PathBuf::from("/tmp/plots/convergence.html"))
        );
        assert_eq!(config.output_html(false).html_path("convergence.html"), None);
    }
}
