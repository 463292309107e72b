/*!
# Alignment Engine

Runs the enabled policies over one tree and collects their edits into one
[`EditSet`]. A pass never mutates its input; the host applies the edit set
once, and may repeat passes until nothing changes ([`AlignmentEngine::converge`]).
Independent sources are processed in parallel by [`AlignmentEngine::fix_all`].
*/

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::candidates::{Candidate, Slot};
use super::config::AlignConfig;
use super::geometry::Decision;
use super::{edit_builder, grouping, Policy};
use crate::ast_core::Tree;
use crate::core::errors::AlignResult;
use crate::core::read_source_file;
use crate::diagnostics::{Diagnostic, DiagnosticLevel, Location};
use crate::fixes::EditSet;
use crate::parser::parse;

/// Per-policy statistics of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStats {
    /// Eligible candidates, including ones already in final shape
    pub candidates: usize,
    /// Groups of two or more members
    pub groups: usize,
    pub aligned: usize,
    pub unaligned: usize,
    pub linearized: usize,
    pub unchanged: usize,
    pub edits: usize,
    /// Execution time in microseconds
    pub execution_time_us: u64,
}

impl PolicyStats {
    fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Unchanged => self.unchanged += 1,
            Decision::Unaligned => self.unaligned += 1,
            Decision::Aligned { .. } => self.aligned += 1,
            Decision::Linearized(_) => self.linearized += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    pub policies: BTreeMap<Policy, PolicyStats>,
}

impl PassStats {
    pub fn total_edits(&self) -> usize {
        self.policies.values().map(|stats| stats.edits).sum()
    }

    pub fn policy(&self, policy: Policy) -> Option<&PolicyStats> {
        self.policies.get(&policy)
    }

    /// Export statistics to JSON
    pub fn to_json(&self) -> Result<String> {
        use anyhow::Context;
        serde_json::to_string_pretty(self).context("Failed to serialize pass statistics")
    }
}

/// Result of one pass over one tree.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub edits: EditSet,
    /// One entry per rewrite, carrying its edit
    pub diagnostics: Vec<Diagnostic>,
    pub stats: PassStats,
}

/// Result of `fix`: one pass applied to a source.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub output: String,
    pub edits: EditSet,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: PassStats,
}

/// Result of repeating passes until a fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub output: String,
    /// Passes run, including the final one that found nothing to do
    pub passes: usize,
    /// `false` when the pass cap was hit first
    pub converged: bool,
    /// Diagnostics of every pass that produced edits
    pub diagnostics: Vec<Diagnostic>,
}

pub struct AlignmentEngine {
    config: AlignConfig,
    policies: Vec<Policy>,
}

impl AlignmentEngine {
    /// Validates the configuration before any pass can run.
    pub fn new(config: AlignConfig) -> AlignResult<Self> {
        config.validate()?;
        let policies = config.enabled_policies();
        tracing::debug!(?policies, max_line_length = config.max_line_length, "alignment engine ready");
        Ok(Self { config, policies })
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// One full scan: extract, group, decide and build edits for every
    /// enabled policy. The tree is only read.
    pub fn run_pass(&self, tree: &Tree) -> AlignResult<PassOutcome> {
        let max_width = self.config.max_line_length;
        let mut edits = Vec::new();
        let mut diagnostics = Vec::new();
        let mut stats = PassStats::default();

        for &policy in &self.policies {
            let started = Instant::now();
            let entry = stats.policies.entry(policy).or_default();
            let level: DiagnosticLevel = self.config.severity(policy).into();

            let mut planned: Vec<(Candidate, Decision)> = Vec::new();
            for run in policy.extract(tree) {
                entry.candidates += run.iter().filter(|slot| matches!(slot, Slot::Candidate(_))).count();
                let groups = if policy.is_aligning() {
                    grouping::group(run)
                } else {
                    run.into_iter()
                        .filter_map(|slot| match slot {
                            Slot::Candidate(candidate) => Some(vec![candidate]),
                            Slot::Barrier => None,
                        })
                        .collect()
                };
                for group in groups {
                    if policy.is_aligning() {
                        entry.groups += 1;
                    }
                    let decisions = policy.decide(&group, max_width);
                    tracing::debug!(
                        rule = policy.rule_id(),
                        members = group.len(),
                        first_line = group.first().map(|c| c.first_line + 1),
                        ?decisions,
                        "group decided"
                    );
                    planned.extend(group.into_iter().zip(decisions));
                }
            }

            for (candidate, decision) in planned {
                entry.record(decision);
                let Some(edit) = edit_builder::build(&candidate, decision, tree.source()) else { continue };
                entry.edits += 1;
                let location = Location::of_node(tree, candidate.node);
                let diagnostic = Diagnostic::new(level, policy.rule_id(), policy.message(decision), location)
                    .with_edit(edit.clone());
                diagnostics.push(diagnostic);
                edits.push(edit);
            }
            entry.execution_time_us = started.elapsed().as_micros() as u64;
        }

        let edits = EditSet::for_source(edits, tree.source())?;
        tracing::info!(edits = edits.len(), diagnostics = diagnostics.len(), "alignment pass finished");
        Ok(PassOutcome { edits, diagnostics, stats })
    }

    /// Parse, run one pass and apply it.
    pub fn fix(&self, source: &str) -> AlignResult<FixOutcome> {
        let tree = parse(source)?;
        let PassOutcome { edits, diagnostics, stats } = self.run_pass(&tree)?;
        let output = if edits.is_empty() { source.to_string() } else { edits.apply(source) };
        Ok(FixOutcome { output, edits, diagnostics, stats })
    }

    /// Repeat `fix` until a pass produces no edits or `max_passes` is reached.
    pub fn converge(&self, source: &str) -> AlignResult<Convergence> {
        let mut current = source.to_string();
        let mut diagnostics = Vec::new();
        for pass in 1..=self.config.max_passes {
            let outcome = self.fix(&current)?;
            if outcome.edits.is_empty() {
                tracing::debug!(passes = pass, "converged");
                return Ok(Convergence { output: current, passes: pass, converged: true, diagnostics });
            }
            diagnostics.extend(outcome.diagnostics);
            current = outcome.output;
        }
        tracing::warn!(max_passes = self.config.max_passes, "pass limit reached before a fixed point");
        Ok(Convergence { output: current, passes: self.config.max_passes, converged: false, diagnostics })
    }

    /// Converge independent sources in parallel.
    pub fn fix_all<S>(&self, sources: &[S]) -> Vec<AlignResult<Convergence>>
    where
        S: AsRef<str> + Sync,
    {
        sources.par_iter().map(|source| self.converge(source.as_ref())).collect()
    }

    /// Read and converge files in parallel; nothing is written back.
    pub fn fix_files<P>(&self, paths: &[P]) -> Vec<(PathBuf, Result<Convergence>)>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                let result = read_source_file(path).and_then(|source| Ok(self.converge(&source)?));
                (path.to_path_buf(), result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::AlignError;
    use pretty_assertions::assert_eq;

    fn engine(max: usize) -> AlignmentEngine {
        AlignmentEngine::new(AlignConfig::default().with_max_line_length(max)).unwrap()
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let result = AlignmentEngine::new(AlignConfig::default().with_max_line_length(0));
        assert!(matches!(result, Err(AlignError::InvalidMaxLineLength(0))));
    }

    #[test]
    fn test_pass_reports_diagnostics_with_edits() {
        let tree = parse("a = 1\nbbb = 2\n").unwrap();
        let outcome = engine(80).run_pass(&tree).unwrap();
        assert_eq!(outcome.edits.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        let diagnostic = &outcome.diagnostics[0];
        assert_eq!(diagnostic.code, "Layout/AlignAssignments");
        assert_eq!(diagnostic.level, DiagnosticLevel::Info);
        assert_eq!(diagnostic.location.line, 1);
        assert!(diagnostic.edit.is_some());

        let stats = outcome.stats.policy(Policy::AlignAssignments).unwrap();
        assert_eq!((stats.candidates, stats.groups, stats.aligned, stats.edits), (2, 1, 2, 1));
        assert_eq!(outcome.stats.total_edits(), 1);
    }

    #[test]
    fn test_disabled_policy_contributes_nothing() {
        let config = AlignConfig::default().with_policy(Policy::AlignAssignments, false);
        let engine = AlignmentEngine::new(config).unwrap();
        let fixed = engine.fix("a = 1\nbbb = 2\n").unwrap();
        assert!(fixed.edits.is_empty());
        assert_eq!(fixed.output, "a = 1\nbbb = 2\n");
        assert!(fixed.stats.policy(Policy::AlignAssignments).is_none());
    }

    #[test]
    fn test_parse_error_propagates() {
        assert!(matches!(engine(80).fix("def (\n"), Err(AlignError::Parse(_))));
    }

    #[test]
    fn test_converge_reaches_fixed_point() {
        let source = "def a\n  1\nend\ndef bbb\n  2\nend\n";
        let result = engine(80).converge(source).unwrap();
        assert!(result.converged);
        assert_eq!(result.output, "def a   = 1\ndef bbb = 2\n");
        // linearize, then align, then nothing left
        assert_eq!(result.passes, 3);
    }

    #[test]
    fn test_fix_all_keeps_order() {
        let sources = vec!["a = 1\nbb = 2\n".to_string(), "x = 1\n".to_string()];
        let results = engine(80).fix_all(&sources);
        let outputs: Vec<_> = results.into_iter().map(|r| r.unwrap().output).collect();
        assert_eq!(outputs, vec!["a  = 1\nbb = 2\n".to_string(), "x = 1\n".to_string()]);
    }

    #[test]
    fn test_stats_json() {
        let tree = parse("x = 1\n").unwrap();
        let outcome = engine(80).run_pass(&tree).unwrap();
        let json = outcome.stats.to_json().unwrap();
        assert!(json.contains("CondenseWhen"));
    }
}
