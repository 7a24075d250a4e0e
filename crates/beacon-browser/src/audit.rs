//! axe-core audit adapter.
//!
//! The rule engine ships as a JavaScript bundle. It is read from disk once
//! per worker, injected into each page and run with the result types the
//! aggregator consumes. Its JSON output is decoded into the `Raw*` types
//! below, which mirror axe-core's result schema.

use crate::error::{BrowserError, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Expression that runs the audit once the engine has been injected.
const RUN_AUDIT_EXPRESSION: &str = r#"axe.run(document, {
    resultTypes: ["passes", "violations", "incomplete", "inapplicable"]
})"#;

/// The axe-core bundle, shared by every page of every job.
#[derive(Debug, Clone)]
pub struct AxeScript {
    source: Arc<str>,
}

impl AxeScript {
    /// Load the bundle from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| BrowserError::ScriptLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_source(source).map_err(|reason| BrowserError::ScriptLoad {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Wrap an in-memory bundle.
    pub fn from_source(source: impl Into<String>) -> std::result::Result<Self, String> {
        let source: String = source.into();
        if source.trim().is_empty() {
            return Err("audit script is empty".to_string());
        }
        tracing::debug!("Loaded audit script ({} bytes)", source.len());
        Ok(Self {
            source: source.into(),
        })
    }

    /// Source evaluated to define `window.axe` in the page.
    #[must_use]
    pub fn injection_source(&self) -> &str {
        &self.source
    }

    /// Expression evaluated (awaiting its promise) to run the audit.
    #[must_use]
    pub fn run_expression(&self) -> &'static str {
        RUN_AUDIT_EXPRESSION
    }
}

/// Raw audit output grouped into the engine's four result buckets.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawAuditOutput {
    pub passes: Vec<RawRuleResult>,
    pub violations: Vec<RawRuleResult>,
    pub incomplete: Vec<RawRuleResult>,
    pub inapplicable: Vec<RawRuleResult>,
}

impl RawAuditOutput {
    /// Decode the value returned by `axe.run`.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| BrowserError::Audit(format!("unexpected audit output: {e}")))
    }
}

/// One rule's findings within a bucket.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRuleResult {
    pub id: String,
    pub impact: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub help: String,
    pub help_url: String,
    pub nodes: Vec<RawNode>,
}

/// A DOM node the rule was evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawNode {
    pub html: String,
    pub target: Vec<serde_json::Value>,
    pub any: Vec<RawCheck>,
    pub all: Vec<RawCheck>,
    pub none: Vec<RawCheck>,
}

impl RawNode {
    /// The node's selector as a single string.
    #[must_use]
    pub fn selector(&self) -> String {
        render_target(&self.target)
    }
}

/// A single check evaluated on a node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCheck {
    pub id: String,
    pub impact: Option<String>,
    pub message: String,
    pub data: serde_json::Value,
    pub related_nodes: Vec<RawRelatedNode>,
}

/// A node related to a check finding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRelatedNode {
    pub html: String,
    pub target: Vec<serde_json::Value>,
}

impl RawRelatedNode {
    /// The node's selector as a single string.
    #[must_use]
    pub fn selector(&self) -> String {
        render_target(&self.target)
    }
}

/// Render an axe target: frame-chain parts joined by spaces, shadow-DOM
/// parts (nested arrays) joined by `>>>`.
fn render_target(target: &[serde_json::Value]) -> String {
    target
        .iter()
        .map(|part| match part {
            serde_json::Value::String(selector) => selector.clone(),
            serde_json::Value::Array(shadow) => shadow
                .iter()
                .filter_map(serde_json::Value::as_str)
                .collect::<Vec<_>>()
                .join(" >>> "),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_axe_output() {
        let value = json!({
            "testEngine": { "name": "axe-core", "version": "4.10.0" },
            "url": "https://example.com/",
            "passes": [{
                "id": "image-alt",
                "impact": null,
                "tags": ["cat.text-alternatives", "wcag2a", "wcag111"],
                "description": "Ensures <img> elements have alternate text",
                "help": "Images must have alternate text",
                "helpUrl": "https://dequeuniversity.com/rules/axe/4.10/image-alt",
                "nodes": [{
                    "html": "<img src=\"a.png\" alt=\"A\">",
                    "target": ["img"],
                    "any": [{
                        "id": "has-alt",
                        "impact": "critical",
                        "message": "Element has an alt attribute",
                        "data": null,
                        "relatedNodes": []
                    }],
                    "all": [],
                    "none": []
                }]
            }],
            "violations": [],
            "incomplete": [],
            "inapplicable": []
        });

        let output = RawAuditOutput::from_value(value).expect("decode output");
        assert_eq!(output.passes.len(), 1);
        let rule = &output.passes[0];
        assert_eq!(rule.id, "image-alt");
        assert!(rule.impact.is_none());
        assert_eq!(rule.nodes[0].any[0].id, "has-alt");
        assert_eq!(rule.nodes[0].selector(), "img");
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            RawAuditOutput::from_value(json!("oops")),
            Err(BrowserError::Audit(_))
        ));
    }

    #[test]
    fn test_render_target_frames_and_shadow_dom() {
        let target = vec![json!("iframe#checkout"), json!(["my-widget", "button.pay"])];
        assert_eq!(render_target(&target), "iframe#checkout my-widget >>> button.pay");
    }

    #[test]
    fn test_script_from_source() {
        assert!(AxeScript::from_source("   ").is_err());
        let script = AxeScript::from_source("window.axe = {};").expect("script");
        assert_eq!(script.injection_source(), "window.axe = {};");
        assert!(script.run_expression().starts_with("axe.run"));
    }

    #[test]
    fn test_load_missing_script() {
        let err = AxeScript::load(Path::new("/nonexistent/axe.min.js")).unwrap_err();
        assert!(matches!(err, BrowserError::ScriptLoad { .. }));
    }
}
