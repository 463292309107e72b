/*!
# Ruby Lexical Analyzer

logos-based tokenizer for the Ruby subset understood by the parser.
Comments are collected on the side, heredoc bodies are skipped and folded
into the span of their opening token.
*/

use logos::Logos;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ParseError;
use crate::core::position::{LineIndex, PackedSpan};

/// Token types
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[logos(skip r"[ \t\f]+")]
#[logos(skip r"\\\r?\n")]
pub enum TokenKind {
    // Keywords
    #[token("def")]
    Def,
    #[token("end")]
    End,
    #[token("case")]
    Case,
    #[token("when")]
    When,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("elsif")]
    Elsif,
    #[token("if")]
    If,
    #[token("unless")]
    Unless,
    #[token("while")]
    While,
    #[token("until")]
    Until,
    #[token("do")]
    Do,
    #[token("return")]
    Return,
    #[token("rescue")]
    Rescue,
    #[token("ensure")]
    Ensure,
    #[token("begin")]
    Begin,
    #[token("class")]
    Class,
    #[token("module")]
    Module,
    #[token("yield")]
    Yield,
    #[token("break")]
    Break,
    #[token("next")]
    Next,
    #[token("redo")]
    Redo,
    #[token("retry")]
    Retry,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nil")]
    Nil,
    #[token("self")]
    SelfKw,

    // Assignment operators
    #[token("=")]
    Assign,
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("**=")]
    #[token("||=")]
    #[token("&&=")]
    #[token("|=")]
    #[token("&=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    OpAssign,

    // Binary operators
    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("=~")]
    Match,
    #[token("!~")]
    NotMatch,
    #[token("<=>")]
    Spaceship,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    Pow,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("..")]
    Range2,
    #[token("...")]
    Range3,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // Punctuation
    #[token(".")]
    Dot,
    #[token("&.")]
    SafeNav,
    #[token("::")]
    Colon2,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,

    // Literals
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    #[regex(r"'([^'\\]|\\(.|\n))*'")]
    Str,
    #[regex(r"<<[~-][A-Za-z_][A-Za-z0-9_]*")]
    #[regex(r#"<<[~-]'[A-Za-z_][A-Za-z0-9_]*'"#)]
    #[regex(r#"<<[~-]"[A-Za-z_][A-Za-z0-9_]*""#)]
    Heredoc,
    #[regex(r"[0-9][0-9_]*")]
    Integer,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    Float,
    #[regex(r":[a-zA-Z_][a-zA-Z0-9_]*[?!]?")]
    #[regex(r#":"([^"\\]|\\.)*""#)]
    Symbol,

    // Names
    #[regex(r"[a-z_][a-zA-Z0-9_]*[?!]?")]
    Ident,
    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    Constant,
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*")]
    InstanceVar,
    #[regex(r"@@[a-zA-Z_][a-zA-Z0-9_]*")]
    ClassVar,
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*")]
    GlobalVar,

    #[regex(r"#[^\n]*")]
    Comment,

    #[regex(r"\r?\n")]
    Newline,

    Eof,
}

impl TokenKind {
    /// Keywords that may still be used as method names after `.` or `def`.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Def | End | Case | When | Then | Else | Elsif | If | Unless | While | Until | Do
                | Return | Rescue | Ensure | Begin | Class | Module | Yield | Break | Next
                | Redo | Retry | And | Or | Not | True | False | Nil | SelfKw
        )
    }

    /// Statement separators.
    pub fn is_separator(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Str => write!(f, "STRING"),
            TokenKind::Heredoc => write!(f, "HEREDOC"),
            TokenKind::Integer | TokenKind::Float => write!(f, "NUMBER"),
            TokenKind::Symbol => write!(f, "SYMBOL"),
            TokenKind::Ident => write!(f, "IDENTIFIER"),
            TokenKind::Constant => write!(f, "CONSTANT"),
            TokenKind::Comment => write!(f, "COMMENT"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Token with position information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: PackedSpan,
    /// Whitespace (or line start) precedes the token.
    pub spaced: bool,
}

/// Output of the lexer: tokens without comments, plus the comment spans.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<PackedSpan>,
}

struct PendingHeredoc {
    token_index: usize,
    terminator: String,
    indented: bool,
}

/// Tokenize `source`. The returned token list always ends with `Eof`.
pub fn tokenize(source: &str) -> Result<Lexed, ParseError> {
    let index = LineIndex::new(source);
    let mut out = Lexed::default();
    let mut lexer = TokenKind::lexer(source);
    let mut pending: Vec<PendingHeredoc> = Vec::new();
    let mut prev_end: Option<usize> = None;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let kind = match result {
            Ok(kind) => kind,
            Err(()) => {
                return Err(ParseError::at(
                    &index,
                    range.start,
                    format!("unexpected character {:?}", lexer.slice()),
                ))
            }
        };
        let span = PackedSpan::from_bounds(range.start, range.end);
        let spaced = prev_end.map_or(true, |end| end < range.start);
        prev_end = Some(range.end);

        match kind {
            TokenKind::Comment => {
                out.comments.push(span);
                continue;
            }
            TokenKind::Heredoc => {
                let opener = lexer.slice();
                let indented = opener.as_bytes()[2] == b'~' || opener.as_bytes()[2] == b'-';
                let terminator = opener[3..].trim_matches(|c| c == '\'' || c == '"').to_string();
                pending.push(PendingHeredoc { token_index: out.tokens.len(), terminator, indented });
            }
            _ => {}
        }

        out.tokens.push(Token { kind, span, spaced });

        if kind == TokenKind::Newline && !pending.is_empty() {
            // Тела heredoc идут сразу после строки с открывающим токеном.
            let mut consumed = 0usize;
            for heredoc in pending.drain(..) {
                let body_start = range.end + consumed;
                let rest = &source[body_start..];
                let mut offset = 0usize;
                let mut closed = false;
                for line in rest.split_inclusive('\n') {
                    offset += line.len();
                    let content = line.trim_end_matches(['\n', '\r']);
                    let candidate = if heredoc.indented { content.trim_start() } else { content };
                    if candidate == heredoc.terminator {
                        closed = true;
                        let body_end = body_start + offset - (line.len() - content.len());
                        let token = &mut out.tokens[heredoc.token_index];
                        token.span = PackedSpan::from_bounds(token.span.start as usize, body_end);
                        break;
                    }
                }
                if !closed {
                    let start = out.tokens[heredoc.token_index].span.start as usize;
                    return Err(ParseError::at(
                        &index,
                        start,
                        format!("unterminated heredoc, expected {}", heredoc.terminator),
                    ));
                }
                consumed += offset;
            }
            lexer.bump(consumed);
            prev_end = Some(range.end + consumed);
        }
    }

    if let Some(heredoc) = pending.first() {
        let start = out.tokens[heredoc.token_index].span.start as usize;
        return Err(ParseError::at(&index, start, "heredoc body is missing"));
    }

    let end = source.len();
    out.tokens.push(Token { kind: TokenKind::Eof, span: PackedSpan::from_bounds(end, end), spaced: true });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("def foo_bar? = ending"),
            vec![Def, Ident, Assign, Ident, Eof]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        use TokenKind::*;
        assert_eq!(kinds("a ||= b <=> c"), vec![Ident, OpAssign, Ident, Spaceship, Ident, Eof]);
        assert_eq!(kinds("x&.y"), vec![Ident, SafeNav, Ident, Eof]);
    }

    #[test]
    fn test_comments_are_collected() {
        let lexed = tokenize("x = 1 # note\n# full line\n").unwrap();
        assert_eq!(lexed.comments.len(), 2);
        assert!(lexed.tokens.iter().all(|t| t.kind != TokenKind::Comment));
    }

    #[test]
    fn test_heredoc_body_is_skipped() {
        let source = "x = <<~SQL\n  select 1 # not a comment\n  SQL\ny = 2\n";
        let lexed = tokenize(source).unwrap();
        let heredoc = lexed.tokens.iter().find(|t| t.kind == TokenKind::Heredoc).unwrap();
        assert_eq!(&source[heredoc.span.range()], "<<~SQL\n  select 1 # not a comment\n  SQL");
        assert!(lexed.comments.is_empty());
        let idents: Vec<_> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| &source[t.span.range()])
            .collect();
        assert_eq!(idents, vec!["x", "y"]);
    }

    #[test]
    fn test_unterminated_heredoc() {
        assert!(tokenize("x = <<~EOS\nbody\n").is_err());
    }

    #[test]
    fn test_non_ascii_identifier_is_rejected() {
        let err = tokenize("é = 1\n").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("unexpected character"));
    }

    #[test]
    fn test_multiline_string_is_one_token() {
        use TokenKind::*;
        assert_eq!(kinds("\"a\nb\""), vec![Str, Eof]);
    }

    #[test]
    fn test_spacing_flag() {
        let lexed = tokenize("foo(1) bar (2)").unwrap();
        let parens: Vec<_> = lexed.tokens.iter().filter(|t| t.kind == TokenKind::LParen).collect();
        assert!(!parens[0].spaced);
        assert!(parens[1].spaced);
    }
}
