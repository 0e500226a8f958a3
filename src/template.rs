//! Strict content template renderer with caching
//!
//! Renders `{{ .field }}` / `{{ .a.b }}` actions against a JSON object:
//! - Templates are tokenized once and cached behind an `Arc`
//! - Absent keys are errors, never empty strings
//! - `{{-` and `-}}` trim the whitespace next to the action

use std::ops::Range;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;

use crate::error::{CredflowError, Result};

/// Token representing a parsed template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text (stores range in original string)
    Literal(Range<usize>),
    /// Field lookup; an empty path is the root (`{{ . }}`)
    Field { path: Vec<String>, position: usize },
}

/// Template renderer with a tokenization cache
pub struct TemplateRenderer {
    cache: DashMap<String, Arc<Vec<Token>>>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Parse template into tokens (with caching)
    ///
    /// Only successful parses are cached.
    pub fn tokenize(&self, template: &str) -> Result<Arc<Vec<Token>>> {
        if let Some(cached) = self.cache.get(template) {
            return Ok(Arc::clone(&cached));
        }

        let mut tokens = Vec::new();
        let mut pos = 0;
        let mut trim_next = false;

        while let Some(rel) = template[pos..].find("{{") {
            let open = pos + rel;
            let mut body_start = open + 2;

            let trim_left = template[body_start..].starts_with('-')
                && template[body_start + 1..].starts_with(char::is_whitespace);
            if trim_left {
                body_start += 1;
            }

            let close_rel = template[body_start..]
                .find("}}")
                .ok_or_else(|| CredflowError::TemplateParse {
                    position: open,
                    details: "unclosed action, missing '}}'".to_string(),
                })?;
            let close = body_start + close_rel;

            let mut body_end = close;
            let trim_right = body_end >= body_start + 2
                && template[..body_end].ends_with('-')
                && template[..body_end - 1].ends_with(char::is_whitespace);
            if trim_right {
                body_end -= 1;
            }

            push_literal(&mut tokens, template, pos..open, trim_next, trim_left);
            tokens.push(Token::Field {
                path: parse_path(template[body_start..body_end].trim(), open)?,
                position: open,
            });

            pos = close + 2;
            trim_next = trim_right;
        }

        push_literal(&mut tokens, template, pos..template.len(), trim_next, false);

        let tokens = Arc::new(tokens);
        self.cache.insert(template.to_string(), Arc::clone(&tokens));
        Ok(tokens)
    }

    /// Render `template` against `data`
    pub fn render(&self, template: &str, data: &JsonValue) -> Result<String> {
        let tokens = self.tokenize(template)?;
        let mut result = String::with_capacity(template.len() * 2);

        for token in tokens.iter() {
            match token {
                Token::Literal(range) => result.push_str(&template[range.clone()]),
                Token::Field { path, .. } => write_value(&mut result, lookup(data, path)?),
            }
        }

        Ok(result)
    }

    pub fn cached_templates(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached tokenization
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn push_literal(
    tokens: &mut Vec<Token>,
    template: &str,
    range: Range<usize>,
    trim_leading: bool,
    trim_trailing: bool,
) {
    let text = &template[range.clone()];
    let lead = if trim_leading {
        text.len() - text.trim_start().len()
    } else {
        0
    };
    let tail = if trim_trailing {
        let rest = &text[lead..];
        rest.len() - rest.trim_end().len()
    } else {
        0
    };

    let (start, end) = (range.start + lead, range.end - tail);
    if start < end {
        tokens.push(Token::Literal(start..end));
    }
}

/// `.` → root; `.a.b` and `a.b` → `["a", "b"]`
fn parse_path(body: &str, position: usize) -> Result<Vec<String>> {
    if body.is_empty() {
        return Err(CredflowError::TemplateParse {
            position,
            details: "empty action".to_string(),
        });
    }
    if body == "." {
        return Ok(Vec::new());
    }

    let stripped = body.strip_prefix('.').unwrap_or(body);
    let segments: Vec<&str> = stripped.split('.').collect();
    let well_formed = segments
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_'));
    if !well_formed {
        return Err(CredflowError::TemplateParse {
            position,
            details: format!("malformed field path '{}'", body),
        });
    }

    Ok(segments.into_iter().map(str::to_string).collect())
}

fn lookup<'a>(data: &'a JsonValue, path: &[String]) -> Result<&'a JsonValue> {
    let missing = || CredflowError::MissingKey {
        key: if path.is_empty() {
            ".".to_string()
        } else {
            path.join(".")
        },
    };

    let mut current = data;
    for segment in path {
        current = current
            .as_object()
            .and_then(|map| map.get(segment))
            .ok_or_else(missing)?;
    }

    if current.is_null() {
        return Err(missing());
    }
    Ok(current)
}

fn write_value(out: &mut String, value: &JsonValue) {
    match value {
        JsonValue::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

/// Global renderer instance
///
/// Its cache is unbounded and lives for the process. Long-running callers
/// that render many distinct templates should own a [`TemplateRenderer`]
/// (see `SecretMaterializer::with_renderer`) or call
/// [`TemplateRenderer::clear_cache`].
pub static TEMPLATE_RENDERER: Lazy<TemplateRenderer> = Lazy::new(TemplateRenderer::new);

/// Convenience function for rendering with the global cache
pub fn render(template: &str, data: &JsonValue) -> Result<String> {
    TEMPLATE_RENDERER.render(template, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_flat_fields() {
        let data = json!({"user": "admin", "password": "s3cret"});
        let out = render("postgres://{{ .user }}:{{.password}}@db", &data).unwrap();
        assert_eq!(out, "postgres://admin:s3cret@db");
    }

    #[test]
    fn test_render_nested_and_dotless() {
        let data = json!({
            "metadata": {"inline": "dataset-value"},
            "connection": {"inline": "connection-value"}
        });
        let out = render("{{metadata.inline}}/{{ .connection.inline }}", &data).unwrap();
        assert_eq!(out, "dataset-value/connection-value");
    }

    #[test]
    fn test_missing_key_names_full_path() {
        let data = json!({"metadata": {"inline": "x"}});
        let err = render("{{ .metadata.table }}", &data).unwrap_err();
        assert!(matches!(err, CredflowError::MissingKey { key } if key == "metadata.table"));
    }

    #[test]
    fn test_traversing_into_string_is_missing_key() {
        let data = json!({"user": "admin"});
        let err = render("{{ .user.name }}", &data).unwrap_err();
        assert!(matches!(err, CredflowError::MissingKey { key } if key == "user.name"));
    }

    #[test]
    fn test_null_is_missing_key() {
        let data = json!({"user": null});
        assert!(matches!(
            render("{{ .user }}", &data),
            Err(CredflowError::MissingKey { .. })
        ));
    }

    #[test]
    fn test_unclosed_action_is_parse_error() {
        let err = render("abc {{ .user", &json!({})).unwrap_err();
        assert!(matches!(err, CredflowError::TemplateParse { position: 4, .. }));
    }

    #[test]
    fn test_empty_and_malformed_actions() {
        assert!(matches!(
            render("{{ }}", &json!({})),
            Err(CredflowError::TemplateParse { .. })
        ));
        assert!(matches!(
            render("{{ .a..b }}", &json!({})),
            Err(CredflowError::TemplateParse { .. })
        ));
        assert!(matches!(
            render("{{ .a | upper }}", &json!({})),
            Err(CredflowError::TemplateParse { .. })
        ));
    }

    #[test]
    fn test_trim_markers() {
        let data = json!({"a": "1", "b": "2"});
        let out = render("x  {{- .a -}}  \n y {{ .b }}", &data).unwrap();
        assert_eq!(out, "x1y 2");
    }

    #[test]
    fn test_non_string_values() {
        let data = json!({"port": 5432, "tls": true, "tags": ["a", "b"], "opts": {"k": "v"}});
        let out = render("{{.port}} {{.tls}} {{.tags}} {{.opts}}", &data).unwrap();
        assert_eq!(out, r#"5432 true ["a","b"] {"k":"v"}"#);
    }

    #[test]
    fn test_root_renders_whole_object() {
        let data = json!({"k": "v"});
        assert_eq!(render("{{ . }}", &data).unwrap(), r#"{"k":"v"}"#);
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(render("no actions } here {", &json!({})).unwrap(), "no actions } here {");
        assert_eq!(render("", &json!({})).unwrap(), "");
    }

    #[test]
    fn test_cache_reuse() {
        let renderer = TemplateRenderer::new();
        let tokens1 = renderer.tokenize("{{ .a }} and {{ .b }}").unwrap();
        let tokens2 = renderer.tokenize("{{ .a }} and {{ .b }}").unwrap();

        assert!(Arc::ptr_eq(&tokens1, &tokens2));
        assert_eq!(renderer.cached_templates(), 1);
    }

    #[test]
    fn test_clear_cache() {
        let renderer = TemplateRenderer::new();
        renderer.render("{{ .a }}", &json!({"a": "x"})).unwrap();
        renderer.render("{{ .b }}", &json!({"b": "y"})).unwrap();
        assert_eq!(renderer.cached_templates(), 2);

        renderer.clear_cache();
        assert_eq!(renderer.cached_templates(), 0);
        assert_eq!(renderer.render("{{ .a }}", &json!({"a": "z"})).unwrap(), "z");
    }

    #[test]
    fn test_parse_errors_not_cached() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.tokenize("{{").is_err());
        assert_eq!(renderer.cached_templates(), 0);
    }
}
