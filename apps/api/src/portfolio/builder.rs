use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use super::template::{fill_template, TemplateId};
use super::TemplateError;
use crate::models::resume::ResumeRecord;

const ENTRY_FILE: &str = "index.html";

#[derive(Debug, Clone, Serialize)]
pub struct BuiltSite {
    pub output_dir: PathBuf,
    pub template: TemplateId,
}

/// Renders `record` with `template` and writes the site into a fresh
/// directory under `output_root`, ready to be published.
pub async fn build_site(
    templates_dir: &Path,
    output_root: &Path,
    record: &ResumeRecord,
    template: TemplateId,
) -> Result<BuiltSite, TemplateError> {
    let template_path = templates_dir.join(template.as_str()).join(ENTRY_FILE);
    let source = fs::read_to_string(&template_path)
        .await
        .map_err(|source| TemplateError::Missing {
            template,
            path: template_path.clone(),
            source,
        })?;

    let html = fill_template(&source, record);

    let output_dir = output_root.join(format!("{}-{}", Uuid::new_v4(), template));
    let write = |source| TemplateError::Write {
        path: output_dir.clone(),
        source,
    };
    fs::create_dir_all(&output_dir).await.map_err(write)?;
    fs::write(output_dir.join(ENTRY_FILE), html)
        .await
        .map_err(write)?;

    info!(%template, output_dir = %output_dir.display(), "site built");
    Ok(BuiltSite {
        output_dir,
        template,
    })
}
