//! Portfolio content records.
//!
//! Content is an ordered JSON list. Each record places a label on the planet and
//! says where the camera goes when that label is opened.

use std::path::Path;

use glam::Vec3;
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_CONTENT: &str = include_str!("../assets/content.json");

/// One labelled item on the planet.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentRecord {
    pub name: String,
    /// Label anchor in the planet's rest frame.
    pub position: Vec3,
    /// Camera position when the item is focused.
    pub camera: Vec3,
    pub look_at: Vec3,
    /// Planet Y rotation (radians) the item is shown at.
    pub planet_rotation: f32,
    /// Opaque payload for the popup; light HTML-style markup is tolerated.
    pub body: String,
}

impl ContentRecord {
    fn validate(&self, index: usize) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Content(format!("record {index} has an empty name")));
        }
        let finite = self.position.is_finite()
            && self.camera.is_finite()
            && self.look_at.is_finite()
            && self.planet_rotation.is_finite();
        if !finite {
            return Err(Error::Content(format!(
                "record {index} ('{}') has non-finite coordinates",
                self.name
            )));
        }
        Ok(())
    }

    /// The body as plain paragraphs, with markup tags removed.
    pub fn paragraphs(&self) -> Vec<String> {
        strip_markup(&self.body)
    }
}

/// Parse and validate a content list.
pub fn parse_content(text: &str) -> Result<Vec<ContentRecord>> {
    let records: Vec<ContentRecord> = serde_json::from_str(text)?;
    for (i, record) in records.iter().enumerate() {
        record.validate(i)?;
    }
    Ok(records)
}

/// Load content from `path`, or the built-in list when no path is configured.
pub fn load_content(path: Option<&Path>) -> Result<Vec<ContentRecord>> {
    let records = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            parse_content(&text)?
        }
        None => parse_content(DEFAULT_CONTENT)?,
    };
    tracing::info!(count = records.len(), "loaded content records");
    Ok(records)
}

/// Split markup into paragraphs of plain text.
///
/// Paragraph and line-break tags end a paragraph; any other tag is dropped.
pub fn strip_markup(body: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut rest = body;

    while let Some(open) = rest.find('<') {
        current.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = &rest[open..];
            break;
        };
        let tag = rest[open + 1..open + close].trim().to_ascii_lowercase();
        if tag == "/p" || tag.starts_with("br") {
            push_paragraph(&mut paragraphs, &mut current);
        }
        rest = &rest[open + close + 1..];
    }
    current.push_str(rest);
    push_paragraph(&mut paragraphs, &mut current);
    paragraphs
}

fn push_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let text = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !text.is_empty() {
        paragraphs.push(text);
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_content_loads() {
        let records = load_content(None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "About");
        assert_eq!(records[0].position, Vec3::new(0.0, 1.2, 0.0));
        assert_eq!(records[1].planet_rotation, -0.4);
    }

    #[test]
    fn missing_field_is_rejected() {
        let text = r#"[{ "name": "X", "position": [0,0,0], "camera": [0,0,1], "lookAt": [0,0,0], "body": "" }]"#;
        assert!(matches!(parse_content(text), Err(Error::Json(_))));
    }

    #[test]
    fn empty_name_is_rejected() {
        let text = r#"[{ "name": "  ", "position": [0,0,0], "camera": [0,0,1], "lookAt": [0,0,0], "planetRotation": 0, "body": "" }]"#;
        assert!(matches!(parse_content(text), Err(Error::Content(_))));
    }

    #[test]
    fn markup_becomes_paragraphs() {
        let body = "<p>First   line\n here.</p>\n<p>Second <b>bold</b> one.</p>";
        assert_eq!(strip_markup(body), vec!["First line here.", "Second bold one."]);
    }

    #[test]
    fn plain_body_is_one_paragraph() {
        assert_eq!(strip_markup("Coral!"), vec!["Coral!"]);
        assert!(strip_markup("<p></p>").is_empty());
    }
}
