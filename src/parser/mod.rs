/*!
# Ruby Parser

Recursive-descent parser for the Ruby subset handled by the aligner.

## Features

- **Fast lexical analysis** with logos lexer
- **Arena tree** output (`ast_core::Tree`) with named child roles
- **Comment collection** for eligibility checks
- **Heredoc-aware** spans

## Usage

```rust
use ruby_aligner::parser::parse;

let tree = parse("x = 1\nyy = 2\n").unwrap();
assert_eq!(tree.comments().len(), 0);
```
*/

pub mod grammar;
pub mod lexer;

pub use lexer::{tokenize, Lexed, Token, TokenKind};

use thiserror::Error;

use crate::ast_core::Tree;
use crate::core::position::LineIndex;

/// Parse failure with a 1-based location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn at(index: &LineIndex, offset: usize, message: impl Into<String>) -> Self {
        let pos = index.to_position(offset as u32);
        Self { line: pos.line + 1, column: pos.column + 1, message: message.into() }
    }
}

/// Parse `source` into a tree.
pub fn parse(source: &str) -> Result<Tree, ParseError> {
    let lexed = tokenize(source)?;
    grammar::Parser::new(source, lexed).parse_program()
}
