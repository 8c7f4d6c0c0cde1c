use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::fragments::{education_html, escape_html, experience_html, projects_html};
use super::TemplateError;
use crate::models::resume::ResumeRecord;

/// The pre-vetted templates users can pick from. Nothing else is ever read
/// from the templates directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateId {
    Template1,
    Template2,
    Template3,
    Template4,
}

impl TemplateId {
    pub const ALL: [TemplateId; 4] = [
        TemplateId::Template1,
        TemplateId::Template2,
        TemplateId::Template3,
        TemplateId::Template4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::Template1 => "template1",
            TemplateId::Template2 => "template2",
            TemplateId::Template3 => "template3",
            TemplateId::Template4 => "template4",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| TemplateError::Unknown(s.to_string()))
    }
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_]+)\s*\}\}").expect("placeholder regex is valid"))
}

/// Substitutes `{{ field }}` placeholders with values from `record`.
///
/// Scalars are HTML-escaped, list sections become HTML fragments, unknown
/// placeholders are left as they are.
pub fn fill_template(template: &str, record: &ResumeRecord) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "name" => escape_html(&record.name),
            "email" => escape_html(&record.email),
            "phone" => escape_html(&record.phone),
            "skills" => escape_html(&record.skills.join(", ")),
            "projects" => projects_html(&record.projects),
            "experience" => experience_html(&record.experience),
            "education" => education_html(&record.education),
            _ => caps[0].to_string(),
        })
        .into_owned()
}
