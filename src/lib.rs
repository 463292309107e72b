/*!
# Ruby Aligner

Structural alignment and condensation engine for Ruby source. It rewrites a
few multi-line shapes into denser, vertically aligned forms while keeping
every rewrite syntactically safe, inside a line-length budget and idempotent.

## Policies

- **Layout/CondenseWhen** - one `when` branch per line, `then` aligned
- **Layout/AlignAssignments** - operators of consecutive assignments aligned
- **Layout/AlignEndlessDefs** - `=` of consecutive endless definitions aligned
- **Style/EndlessMethod** - one-statement methods written on a single line

## Architecture

```text
ruby-aligner
├── Core         - positions, line index, errors
├── AST Core     - arena tree (read-only for the engine)
├── Parser       - logos lexer + recursive-descent parser
├── Rules        - candidates, grouping, geometry, policies, engine, config
├── Fixes        - edits and the one-rewrite edit set
└── Diagnostics  - one report per rewrite, carrying its edit
```

## Usage

```rust
use ruby_aligner::{AlignConfig, AlignmentEngine};

let config = AlignConfig::default().with_max_line_length(80);
let engine = AlignmentEngine::new(config).unwrap();

let source = "case x\nwhen 1\n  one\nwhen 22\n  two\nend\n";
let result = engine.converge(source).unwrap();
assert_eq!(result.output, "case x\nwhen 1  then one\nwhen 22 then two\nend\n");
```
*/

pub mod ast_core;
pub mod core;
pub mod diagnostics;
pub mod fixes;
pub mod parser;
pub mod rules;

pub use crate::core::{AlignError, AlignResult, LineIndex, PackedSpan, Position};
pub use ast_core::{NodeId, SyntaxKind, Tree};
pub use diagnostics::{Diagnostic, DiagnosticLevel, Location};
pub use fixes::{Edit, EditSet};
pub use parser::{parse, ParseError};
pub use rules::{AlignConfig, AlignmentEngine, Convergence, Decision, FixOutcome, PassOutcome, Policy};
