//! Aggregation of raw audit output into the Rule/Check/Element tree.
//!
//! Every node an audit rule examined reports the checks it ran, grouped as
//! `any`, `all` and `none`. Each check evaluation counts once towards its
//! `(rule, check, type)` statistic, as passed, violated or incomplete
//! depending on the bucket the rule result came from. Violated and
//! incomplete evaluations also record the node as an element, so element
//! lists always match their counts.

use crate::failure::FailureCause;
use crate::wcag::wcag_references;
use beacon_browser::{RawAuditOutput, RawCheck, RawNode, RawRuleResult};
use beacon_core::{
    Check, CheckElement, CheckType, Element, Impact, Rule, ScanJob, WebpageResult, WebsiteResult,
};
use std::collections::HashMap;

/// Audit result bucket a rule result was reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Nodes that passed
    Passes,
    /// Nodes that violated the rule
    Violations,
    /// Nodes the engine could not decide
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CheckKey {
    rule: String,
    check: String,
    check_type: CheckType,
}

#[derive(Debug)]
struct RuleAccumulator {
    rule: Rule,
    check_keys: Vec<CheckKey>,
}

/// Accumulates check statistics across buckets, then flushes them into
/// rules in first-seen order.
#[derive(Debug, Default)]
pub struct ResultBuilder {
    rules: Vec<RuleAccumulator>,
    rule_index: HashMap<String, usize>,
    checks: HashMap<CheckKey, Check>,
}

impl ResultBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate every applicable bucket of an audit run.
    #[must_use]
    pub fn with_output(mut self, output: &RawAuditOutput) -> Self {
        self.add_bucket(Bucket::Passes, &output.passes);
        self.add_bucket(Bucket::Violations, &output.violations);
        self.add_bucket(Bucket::Incomplete, &output.incomplete);
        self
    }

    /// Accumulate the rule results of one bucket.
    pub fn add_bucket(&mut self, bucket: Bucket, results: &[RawRuleResult]) {
        for rule in results {
            for node in &rule.nodes {
                let groups = [
                    (CheckType::Any, &node.any),
                    (CheckType::All, &node.all),
                    (CheckType::None, &node.none),
                ];
                for (check_type, checks) in groups {
                    for check in checks {
                        self.record(bucket, rule, node, check_type, check);
                    }
                }
            }
        }
    }

    fn record(
        &mut self,
        bucket: Bucket,
        rule: &RawRuleResult,
        node: &RawNode,
        check_type: CheckType,
        raw: &RawCheck,
    ) {
        let key = CheckKey {
            rule: rule.id.clone(),
            check: raw.id.clone(),
            check_type,
        };
        let impact = raw
            .impact
            .as_deref()
            .or(rule.impact.as_deref())
            .and_then(Impact::parse);

        if !self.checks.contains_key(&key) {
            let index = self.rule_accumulator(rule);
            self.rules[index].check_keys.push(key.clone());
        }

        let check = self.checks.entry(key).or_insert_with(|| Check {
            code: raw.id.clone(),
            check_type,
            impact: impact.unwrap_or(Impact::Minor),
            tested_count: 0,
            passed_count: 0,
            violated_count: 0,
            incomplete_count: 0,
            violating_elements: Vec::new(),
            incomplete_elements: Vec::new(),
        });

        if let Some(impact) = impact {
            check.impact = check.impact.max(impact);
        }

        check.tested_count += 1;
        match bucket {
            Bucket::Passes => check.passed_count += 1,
            Bucket::Violations => {
                check.violated_count += 1;
                check.violating_elements.push(check_element(node, raw));
            }
            Bucket::Incomplete => {
                check.incomplete_count += 1;
                check.incomplete_elements.push(check_element(node, raw));
            }
        }
    }

    fn rule_accumulator(&mut self, rule: &RawRuleResult) -> usize {
        if let Some(&index) = self.rule_index.get(&rule.id) {
            return index;
        }

        let index = self.rules.len();
        self.rules.push(RuleAccumulator {
            rule: Rule {
                code: rule.id.clone(),
                description: rule.description.clone(),
                axe_url: rule.help_url.clone(),
                wcag_references: wcag_references(&rule.tags),
                checks: Vec::new(),
            },
            check_keys: Vec::new(),
        });
        self.rule_index.insert(rule.id.clone(), index);
        index
    }

    /// Flush the accumulated statistics into the rule tree.
    #[must_use]
    pub fn build(mut self) -> Vec<Rule> {
        self.rules
            .into_iter()
            .map(|accumulator| {
                let mut rule = accumulator.rule;
                rule.checks = accumulator
                    .check_keys
                    .iter()
                    .filter_map(|key| self.checks.remove(key))
                    .collect();
                rule
            })
            .collect()
    }
}

fn check_element(node: &RawNode, check: &RawCheck) -> CheckElement {
    CheckElement {
        target: node.selector(),
        html: node.html.clone(),
        issue_description: check.message.clone(),
        data: check.data.clone(),
        related_elements: check
            .related_nodes
            .iter()
            .map(|related| Element {
                target: related.selector(),
                html: related.html.clone(),
            })
            .collect(),
    }
}

/// Build the result for a successfully audited page.
#[must_use]
pub fn format_webpage_result(url: &str, output: &RawAuditOutput) -> WebpageResult {
    WebpageResult::success(url, ResultBuilder::new().with_output(output).build())
}

/// Build the result for a page whose scan gave up.
pub fn format_failed_webpage_result(url: &str, cause: impl Into<FailureCause>) -> WebpageResult {
    WebpageResult::failed(url, cause.into().message())
}

/// Build the result for a website whose pages were all attempted.
#[must_use]
pub fn format_website_result(job: &ScanJob, webpages: Vec<WebpageResult>) -> WebsiteResult {
    WebsiteResult::success(job, webpages)
}

/// Build the result for a website scan that failed before page fan-out.
pub fn format_failed_website_result(
    job: Option<&ScanJob>,
    cause: impl Into<FailureCause>,
) -> WebsiteResult {
    WebsiteResult::failed(job, cause.into().message())
}
