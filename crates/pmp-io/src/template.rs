//! File-naming templates with `%(name)` placeholders.
//!
//! A template such as `%(realm)/%(frequency)/%(variable)/%(filename)` is
//! parsed once into literal and placeholder segments and resolved against a
//! set of bindings. Every placeholder must be bound (an empty string counts)
//! or carry a declared default; anything else is an error rather than a
//! silent pass-through.
//!
//! A template can also be *pre-rendered*: a concrete path supplied in place
//! of a pattern. Pre-rendered templates are returned verbatim.

use std::collections::BTreeMap;

use crate::error::{DatasetError, Result};

/// Placeholder bindings, keyed by placeholder name.
pub type Bindings = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed file-naming template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pattern: String,
    segments: Vec<Segment>,
    defaults: Bindings,
    rendered: bool,
}

impl PathTemplate {
    /// Parse a `%(name)` pattern.
    pub fn parse(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let segments = parse_segments(&pattern)?;
        Ok(Self {
            pattern,
            segments,
            defaults: Bindings::new(),
            rendered: false,
        })
    }

    /// Wrap an already-rendered path; resolution returns it unchanged.
    pub fn rendered(path: impl Into<String>) -> Self {
        let pattern = path.into();
        Self {
            segments: vec![Segment::Literal(pattern.clone())],
            pattern,
            defaults: Bindings::new(),
            rendered: true,
        }
    }

    /// Declare a default used when `name` has no binding.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitute every placeholder.
    pub fn resolve(&self, bindings: &Bindings) -> Result<String> {
        if self.rendered {
            return Ok(self.pattern.clone());
        }

        let mut out = String::with_capacity(self.pattern.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = bindings
                        .get(name)
                        .or_else(|| self.defaults.get(name))
                        .ok_or_else(|| DatasetError::UnresolvedPlaceholder {
                            name: name.clone(),
                            template: self.pattern.clone(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Resolve `pattern` against `bindings` in one step.
pub fn resolve(pattern: &str, bindings: &Bindings) -> Result<String> {
    PathTemplate::parse(pattern)?.resolve(bindings)
}

fn parse_segments(pattern: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(pos) = rest.find("%(") {
        literal.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let end = after.find(')').ok_or_else(|| DatasetError::MalformedTemplate {
            template: pattern.to_string(),
            reason: "unterminated placeholder".to_string(),
        })?;

        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DatasetError::MalformedTemplate {
                template: pattern.to_string(),
                reason: format!("invalid placeholder name '{}'", name),
            });
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Placeholder(name.to_string()));
        rest = &after[end + 1..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_obs_template() {
        let template =
            PathTemplate::parse("%(realm)/%(frequency)/%(variable)/%(reference)/%(ac)/%(filename)")
                .unwrap();
        let b = bindings(&[
            ("realm", "ocn"),
            ("frequency", "mo"),
            ("variable", "ts"),
            ("reference", "HadISST"),
            ("ac", "ac"),
            ("filename", "sst.nc"),
        ]);
        assert_eq!(template.resolve(&b).unwrap(), "ocn/mo/ts/HadISST/ac/sst.nc");
    }

    #[test]
    fn test_empty_binding_is_valid() {
        let b = bindings(&[("realm", ""), ("frequency", "fx")]);
        assert_eq!(resolve("%(realm)/%(frequency)", &b).unwrap(), "/fx");
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let err = resolve("%(realm)/%(model_version).nc", &bindings(&[("realm", "atm")]))
            .unwrap_err();
        match err {
            DatasetError::UnresolvedPlaceholder { name, .. } => assert_eq!(name, "model_version"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_fills_missing_binding() {
        let template = PathTemplate::parse("%(realization)/x.nc")
            .unwrap()
            .with_default("realization", "r1i1p1");
        assert_eq!(template.resolve(&Bindings::new()).unwrap(), "r1i1p1/x.nc");

        let explicit = bindings(&[("realization", "r2i1p1")]);
        assert_eq!(template.resolve(&explicit).unwrap(), "r2i1p1/x.nc");
    }

    #[test]
    fn test_rendered_skips_resolution() {
        let template = PathTemplate::rendered("/obs/fx/sftlf/%(weird)/mask.nc");
        assert!(template.is_rendered());
        assert!(template.placeholders().is_empty());
        assert_eq!(
            template.resolve(&Bindings::new()).unwrap(),
            "/obs/fx/sftlf/%(weird)/mask.nc"
        );
    }

    #[test]
    fn test_placeholders_in_order() {
        let template = PathTemplate::parse("%(a)_%(b)/%(a).%(ext)").unwrap();
        assert_eq!(template.placeholders(), vec!["a", "b", "ext"]);
    }

    #[test]
    fn test_malformed_template() {
        assert!(matches!(
            PathTemplate::parse("%(realm/x"),
            Err(DatasetError::MalformedTemplate { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("%()/x"),
            Err(DatasetError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_lone_percent_is_literal() {
        let b = bindings(&[("v", "ts")]);
        assert_eq!(resolve("100%_%(v)", &b).unwrap(), "100%_ts");
    }
}
