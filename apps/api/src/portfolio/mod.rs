// Portfolio site: fill a template with resume data, then publish it to
// GitHub Pages through the publisher.

pub mod builder;
pub mod fragments;
pub mod handlers;
pub mod template;

use std::path::PathBuf;

use thiserror::Error;

use template::TemplateId;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    Unknown(String),

    #[error("template {template} is not installed at {path}: {source}")]
    Missing {
        template: TemplateId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write site to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
