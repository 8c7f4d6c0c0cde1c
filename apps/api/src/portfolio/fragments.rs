//! HTML snippets for the list sections of a resume.

use crate::models::resume::{Education, Experience, Project};

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// `start – end`, or whichever side is present.
fn period(start: &str, end: &str) -> String {
    match (start.trim(), end.trim()) {
        ("", "") => String::new(),
        (s, "") => escape_html(s),
        ("", e) => escape_html(e),
        (s, e) => format!("{} – {}", escape_html(s), escape_html(e)),
    }
}

/// Only absolute http(s) URLs become links.
fn safe_link(url: &str) -> Option<&str> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("https://") || lower.starts_with("http://")).then_some(url)
}

pub fn experience_html(items: &[Experience]) -> String {
    items
        .iter()
        .map(|exp| {
            format!(
                "<div><h3>{} at {}</h3><p>{}</p><p>{}</p></div>",
                escape_html(&exp.position),
                escape_html(&exp.company),
                period(&exp.start_date, &exp.end_date),
                escape_html(&exp.description),
            )
        })
        .collect()
}

pub fn education_html(items: &[Education]) -> String {
    items
        .iter()
        .map(|edu| {
            let degree = if edu.field.trim().is_empty() {
                escape_html(&edu.degree)
            } else {
                format!("{}, {}", escape_html(&edu.degree), escape_html(&edu.field))
            };
            format!(
                "<div><h3>{} - {}</h3><p>{}</p></div>",
                degree,
                escape_html(&edu.institution),
                period(&edu.start_date, &edu.end_date),
            )
        })
        .collect()
}

pub fn projects_html(items: &[Project]) -> String {
    items
        .iter()
        .map(|project| {
            let title = match safe_link(&project.url) {
                Some(url) => format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(url),
                    escape_html(&project.name)
                ),
                None => escape_html(&project.name),
            };
            format!(
                "<div><h3>{}</h3><p>{}</p><p><strong>Tech:</strong> {}</p></div>",
                title,
                escape_html(&project.description),
                escape_html(&project.technologies.join(", ")),
            )
        })
        .collect()
}
