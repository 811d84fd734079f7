//! HTTP path templates with `{label}` segments

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::DefinitionError;

/// One segment of a path template
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Literal(String),
    Label(String),
}

/// A parsed path template such as `/length/{string}`
///
/// Labels must occupy a whole segment. The root path `/` has no segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a path template
    pub fn parse(raw: impl Into<String>) -> Result<Self, DefinitionError> {
        let raw = raw.into();
        let invalid = |reason: &str| DefinitionError::InvalidPath {
            path: raw.clone(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if raw.contains('?') || raw.contains('#') {
            return Err(invalid("must not contain a query or fragment"));
        }

        let mut segments = Vec::new();
        if raw != "/" {
            for part in raw[1..].split('/') {
                if part.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                    if inner.is_empty()
                        || !inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(invalid("label names must be non-empty and alphanumeric"));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Label(l) if l == inner))
                    {
                        return Err(invalid("label used more than once"));
                    }
                    segments.push(Segment::Label(inner.to_string()));
                } else if part.contains('{') || part.contains('}') {
                    return Err(invalid("labels must occupy a whole segment"));
                } else {
                    segments.push(Segment::Literal(part.to_string()));
                }
            }
        }

        Ok(Self { raw, segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Label names in order of appearance
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Label(l) => Some(l.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a concrete request path, returning the captured labels
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let path = path.strip_prefix('/')?;
        let parts: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').collect()
        };
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut labels = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Label(_) if part.is_empty() => return None,
                Segment::Label(name) => {
                    labels.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(labels)
    }

    /// Template with every label name erased; templates with equal shapes
    /// match exactly the same request paths
    pub fn shape(&self) -> String {
        self.render_with(|_| "{}".to_string())
    }

    /// Render the template with each label replaced by `label`
    pub fn render_with<F>(&self, mut label: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Label(name) => out.push_str(&label(name)),
            }
        }
        out
    }
}

impl TryFrom<String> for PathTemplate {
    type Error = DefinitionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PathTemplate> for String {
    fn from(value: PathTemplate) -> Self {
        value.raw
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
