// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment failures into miette diagnostics.
//!
//! Unknown keys get a "did you mean" hint (Jaro-Winkler) and, when the
//! offending file can be located, a labelled source span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Similarity a valid key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem, ready for rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(chatwire::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted path of the offending key, e.g. `whatsapp.app_secert`.
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognised key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(chatwire::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(chatwire::config::missing_key),
        help("set `{key}` in chatwire.toml or the matching CHATWIRE_ variable")
    )]
    MissingKey { key: String },

    /// A value parsed but is out of range or inconsistent.
    #[error("invalid value for `{key}`: {message}")]
    #[diagnostic(code(chatwire::config::validation))]
    Validation { key: String, message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(chatwire::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error carried by a `figment::Error` into a [`ConfigError`].
///
/// `sources` holds `(path, contents)` pairs used to attach spans to unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.iter().map(ToString::to_string).collect();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate_key(&error, &section, field, sources);
                    let mut key = section.clone();
                    key.push(field.clone());
                    ConfigError::UnknownKey {
                        key: key.join("."),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => {
                    let mut key = section.clone();
                    key.push(field.to_string());
                    ConfigError::MissingKey { key: key.join(".") }
                }
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: section.join("."),
                    detail: format!("found {actual}"),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn locate_key(
    error: &figment::Error,
    section: &[String],
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(origin) = error.metadata.as_ref().and_then(|m| m.source.as_ref()) else {
        return (None, None);
    };
    let origin = match origin {
        figment::Source::File(path) => path.display().to_string(),
        _ => return (None, None),
    };

    sources
        .iter()
        .filter(|(path, _)| origin.ends_with(path.as_str()) || path.ends_with(origin.as_str()))
        .find_map(|(path, content)| {
            find_key_offset(content, section, field).map(|offset| {
                (
                    Some(SourceSpan::new(offset.into(), field.len())),
                    Some(NamedSource::new(path, content.clone())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `field` inside the `[section]` table of a TOML document.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let start = match section.first() {
        Some(name) => {
            let header = format!("[{name}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && section.first().is_some() && offset > start {
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(field) {
            if rest.trim_start().starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}
