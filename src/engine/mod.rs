//! Pipeline orchestration
//!
//! Runs the transformation stages in their fixed order over a parsed
//! document and serializes the result. The stage order matters: structure
//! first so later stages find a head and body, text repair before the
//! preheader touches hidden text, CSS inlining before the compatibility
//! passes that read inline styles.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info};

use crate::css;
use crate::dom::HtmlParser;
use crate::format;
use crate::transform::{anonymize, compat, preheader, structure, text};
use crate::utils::Result;

/// Knobs for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Value for the `lang` attribute on `<html>`
    pub lang: String,
    /// Text injected into the hidden preheader; empty leaves existing text alone
    pub preheader_text: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            preheader_text: String::new(),
        }
    }
}

/// The email normalization pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage over `html` and return the formatted result
    pub fn process(&self, html: &str) -> Result<String> {
        let mut document = HtmlParser::new().parse(html)?;

        debug!("stage: structure");
        structure::normalize(&mut document, &self.config);
        debug!("stage: text");
        text::normalize(&mut document);
        debug!("stage: preheader");
        preheader::inject(&mut document, &self.config);
        debug!("stage: inline");
        css::inline_styles(&mut document);
        debug!("stage: anonymize");
        let renamed = anonymize::rewrite_ids(&mut document, &mut rand::thread_rng());
        if renamed > 0 {
            debug!("anonymized {renamed} generated id(s)");
        }
        debug!("stage: compat");
        compat::apply(&mut document);

        Ok(format::serialize(&document))
    }

    /// Process `html` and hand the result to an emitter, capturing the
    /// outcome instead of propagating it
    pub fn process_and_emit(&self, html: &str, filename: &str, emitter: &dyn Emitter) -> EmitReport {
        let processed = match self.process(html) {
            Ok(p) => p,
            Err(e) => {
                return EmitReport {
                    success: false,
                    message: None,
                    error: Some(e.to_string()),
                };
            }
        };
        match emitter.emit(filename, &processed) {
            Ok(()) => {
                info!("wrote {filename}");
                EmitReport {
                    success: true,
                    message: Some(format!("wrote {filename}")),
                    error: None,
                }
            }
            Err(e) => EmitReport {
                success: false,
                message: None,
                error: Some(format!("failed to write {filename}: {e}")),
            },
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a process-and-emit run
#[derive(Debug)]
pub struct EmitReport {
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Destination for processed documents
pub trait Emitter {
    fn emit(&self, filename: &str, contents: &str) -> io::Result<()>;
}

/// Writes processed documents into a directory
pub struct FileEmitter {
    dir: std::path::PathBuf,
}

impl FileEmitter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Emitter for FileEmitter {
    fn emit(&self, filename: &str, contents: &str) -> io::Result<()> {
        fs::write(self.dir.join(filename), contents)
    }
}
