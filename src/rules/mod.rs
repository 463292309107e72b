/*!
# Alignment Rules

The four layout policies and the engine that runs them.

Every policy plugs into the same pipeline: candidate extraction, contiguity
grouping, geometry under the line-length budget, and edit building. A pass
runs all enabled policies over one tree and yields a single edit set.

## Usage

```rust
use ruby_aligner::rules::{AlignConfig, AlignmentEngine};

let engine = AlignmentEngine::new(AlignConfig::default()).unwrap();
let fixed = engine.fix("a = 1\nbbb = 2\n").unwrap();
assert_eq!(fixed.output, "a   = 1\nbbb = 2\n");
```

## Configuration Example

```toml
max_line_length = 100

[rules."Layout/AlignAssignments"]
enabled = true
severity = "warning"
```
*/

pub mod builtin;
pub mod candidates;
pub mod config;
pub mod edit_builder;
pub mod engine;
pub mod geometry;
pub mod grouping;

pub use candidates::{Candidate, Category, Rendering, Slot};
pub use config::{AlignConfig, RuleConfig, RuleSeverity};
pub use engine::{AlignmentEngine, Convergence, FixOutcome, PassOutcome, PassStats, PolicyStats};
pub use geometry::{Decision, Layout, Spelling};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostics::codes;

/// The closed set of layout strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Policy {
    /// Condense `when` branches onto one line each, aligning `then`.
    CondenseWhen,
    /// Align the operators of consecutive assignments.
    AlignAssignments,
    /// Align the `=` of consecutive single-line endless definitions.
    AlignEndlessDefs,
    /// Turn a one-statement multi-line definition into a single line.
    EndlessMethod,
}

impl Policy {
    pub const ALL: [Policy; 4] =
        [Policy::CondenseWhen, Policy::AlignAssignments, Policy::AlignEndlessDefs, Policy::EndlessMethod];

    pub fn rule_id(self) -> &'static str {
        match self {
            Policy::CondenseWhen => codes::CONDENSE_WHEN,
            Policy::AlignAssignments => codes::ALIGN_ASSIGNMENTS,
            Policy::AlignEndlessDefs => codes::ALIGN_ENDLESS_DEFS,
            Policy::EndlessMethod => codes::ENDLESS_METHOD,
        }
    }

    pub fn from_rule_id(rule_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|policy| policy.rule_id() == rule_id)
    }

    pub fn description(self) -> &'static str {
        match self {
            Policy::CondenseWhen => "Condense multi-line `when` branches and align their `then`",
            Policy::AlignAssignments => "Align operators of consecutive assignments",
            Policy::AlignEndlessDefs => "Align `=` of consecutive endless method definitions",
            Policy::EndlessMethod => "Write one-statement methods on a single line",
        }
    }

    /// Whether candidates are grouped and share an alignment column.
    pub fn is_aligning(self) -> bool {
        !matches!(self, Policy::EndlessMethod)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_id())
    }
}
