//! INI text parsing, `%` interpolation, and rendering
//!
//! The format is the configparser dialect the bundled defaults are written in:
//! `[Section]` headers, `key = value` (or `key: value`) lines, full-line
//! comments starting with `#` or `;`, and `%%` for a literal percent sign.
//! Option names are case-insensitive and stored lowercase.

use super::error::{ConfigError, ConfigValidationError};
use figment::value::{Dict, Map, Value};
use figment::{Metadata, Profile, Provider};
use std::collections::BTreeMap;

/// Section name -> (option name -> raw value).
pub type Sections = BTreeMap<String, BTreeMap<String, String>>;

const MAX_INTERPOLATION_DEPTH: usize = 10;

/// A parsed INI document, values still in their raw (escaped) form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    origin: String,
    sections: Sections,
}

impl IniDocument {
    /// Parse INI text. `origin` names the source in error messages.
    pub fn parse(origin: &str, text: &str) -> Result<Self, ConfigError> {
        let syntax = |line: usize, message: String| ConfigError::Syntax {
            origin: origin.to_string(),
            line,
            message,
        };

        let mut sections = Sections::new();
        let mut current: Option<String> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim_start_matches('\u{feff}').trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(name) = rest.strip_suffix(']') else {
                    return Err(syntax(line_no, format!("unterminated section header '{line}'")));
                };
                let name = name.trim();
                if name.is_empty() {
                    return Err(syntax(line_no, "empty section name".to_string()));
                }
                if sections.contains_key(name) {
                    return Err(syntax(line_no, format!("duplicate section [{name}]")));
                }
                sections.insert(name.to_string(), BTreeMap::new());
                current = Some(name.to_string());
                continue;
            }

            let Some(split_at) = line.find(['=', ':']) else {
                return Err(syntax(line_no, format!("expected 'key = value', got '{line}'")));
            };
            let key = line[..split_at].trim().to_lowercase();
            let value = line[split_at + 1..].trim().to_string();
            if key.is_empty() {
                return Err(syntax(line_no, "missing option name before delimiter".to_string()));
            }

            let Some(section) = current.as_ref() else {
                return Err(syntax(line_no, format!("option '{key}' appears before any section header")));
            };
            let entries = sections.entry(section.clone()).or_default();
            if entries.contains_key(&key) {
                return Err(syntax(line_no, format!("duplicate option '{key}' in section [{section}]")));
            }
            entries.insert(key, value);
        }

        Ok(Self { origin: origin.to_string(), sections })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }
}

impl Provider for IniDocument {
    fn metadata(&self) -> Metadata {
        Metadata::named(format!("INI file {}", self.origin))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let mut root = Dict::new();
        for (section, entries) in &self.sections {
            let table: Dict =
                entries.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))).collect();
            root.insert(section.clone(), Value::from(table));
        }
        let mut map = Map::new();
        map.insert(Profile::Default, root);
        Ok(map)
    }
}

/// Expand `%%` and `%(name)s` references in a raw value.
///
/// References resolve against other options of the same section, after merge.
pub fn interpolate(
    section_name: &str,
    section: &BTreeMap<String, String>,
    key: &str,
    raw: &str,
) -> Result<String, ConfigValidationError> {
    expand(section_name, section, key, raw, 0)
}

fn expand(
    section_name: &str,
    section: &BTreeMap<String, String>,
    key: &str,
    raw: &str,
    depth: usize,
) -> Result<String, ConfigValidationError> {
    let fail = |message: String| ConfigValidationError::Interpolation {
        section: section_name.to_string(),
        key: key.to_string(),
        message,
    };

    if depth > MAX_INTERPOLATION_DEPTH {
        return Err(fail(format!("recursion deeper than {MAX_INTERPOLATION_DEPTH} levels")));
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if let Some(after) = tail.strip_prefix('%') {
            out.push('%');
            rest = after;
        } else if let Some(reference) = tail.strip_prefix('(') {
            let Some(close) = reference.find(")s") else {
                return Err(fail(format!("unterminated reference in '{raw}'")));
            };
            let name = reference[..close].to_lowercase();
            let Some(target) = section.get(&name) else {
                return Err(fail(format!("reference to missing option '{name}'")));
            };
            out.push_str(&expand(section_name, section, key, target, depth + 1)?);
            rest = &reference[close + 2..];
        } else {
            return Err(fail(format!("'%' must be followed by '%' or '(' in '{raw}'")));
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Escape literal `%` so the value survives a later [`interpolate`].
pub fn escape(value: &str) -> String {
    value.replace('%', "%%")
}

/// Render sections as INI text. Values must already be escaped.
pub fn render(sections: &[(&str, Vec<(String, String)>)]) -> String {
    let mut out = String::new();
    for (idx, (name, entries)) in sections.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&format!("[{name}]\n"));
        for (key, value) in entries {
            if value.is_empty() {
                out.push_str(&format!("{key} =\n"));
            } else {
                out.push_str(&format!("{key} = {value}\n"));
            }
        }
    }
    out
}
