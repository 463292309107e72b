//! Grammar rules: statement lists, definitions, control flow and expressions.
//!
//! Every rule returns the id of the node it built. Nodes are created bottom-up,
//! children first, so a node's span always covers its children.

use std::collections::HashSet;

use super::lexer::{Lexed, Token, TokenKind};
use super::ParseError;
use crate::ast_core::{Field, NodeId, SyntaxKind, Tree, TreeBuilder};
use crate::core::position::{LineIndex, PackedSpan};

type PResult<T> = Result<T, ParseError>;

/// Binding power of binary operators: (precedence, right associative).
fn binary_precedence(kind: TokenKind) -> Option<(u8, bool)> {
    use TokenKind::*;
    let prec = match kind {
        OrOr => (1, false),
        AndAnd => (2, false),
        EqEq | NotEq | EqEqEq | Match | NotMatch | Spaceship => (4, false),
        Lt | LtEq | Gt | GtEq => (5, false),
        Pipe | Caret => (6, false),
        Amp => (7, false),
        Shl | Shr => (8, false),
        Plus | Minus => (9, false),
        Star | Slash | Percent => (10, false),
        Pow => (12, true),
        _ => return None,
    };
    Some(prec)
}

/// Tokens that can begin an operand (modifier keywords excluded).
fn can_start_operand(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Ident | Constant | InstanceVar | ClassVar | GlobalVar | Integer | Float | Str | Heredoc
            | Symbol | True | False | Nil | SelfKw | LParen | LBracket | LBrace | Arrow | Minus
            | Bang | Tilde | Colon2 | Def | Case | Begin | Not | Star | Pow | Amp | Yield
    )
}

fn is_method_name_token(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Ident | TokenKind::Constant) || kind.is_keyword()
}

pub struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    comments: Vec<PackedSpan>,
    pos: usize,
    /// End of the last significant token consumed.
    last_end: u32,
    /// While positive, `do` belongs to an enclosing construct (`while x do`, command args).
    no_do: usize,
    attribute_calls: HashSet<NodeId>,
    builder: TreeBuilder,
    index: LineIndex,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, lexed: Lexed) -> Self {
        Self {
            source,
            tokens: lexed.tokens,
            comments: lexed.comments,
            pos: 0,
            last_end: 0,
            no_do: 0,
            attribute_calls: HashSet::new(),
            builder: TreeBuilder::new(),
            index: LineIndex::new(source),
        }
    }

    pub fn parse_program(mut self) -> PResult<Tree> {
        let body = self.parse_statements(&[TokenKind::Eof])?;
        self.expect(TokenKind::Eof, "end of input")?;
        self.builder.set_field(body, Field::Body);
        let span = PackedSpan::from_bounds(0, self.source.len());
        let root = self.builder.node(SyntaxKind::Program, span, &[body]);
        let Parser { builder, source, comments, .. } = self;
        Ok(builder.build(root, source, comments))
    }

    // ----- token helpers -------------------------------------------------

    fn peek(&self) -> TokenKind { self.tokens[self.pos].kind }
    fn peek_tok(&self) -> Token { self.tokens[self.pos] }
    fn peek_nth(&self, n: usize) -> Token { self.tokens[(self.pos + n).min(self.tokens.len() - 1)] }
    fn at(&self, kind: TokenKind) -> bool { self.peek() == kind }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos];
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        if !matches!(tok.kind, TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof) {
            self.last_end = self.last_end.max(tok.span.end());
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<Token> {
        self.eat(kind).ok_or_else(|| self.error(format!("expected {what}")))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let tok = self.peek_tok();
        ParseError::at(&self.index, tok.span.start as usize, format!("{} (found {})", message.into(), tok.kind))
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    fn skip_separators(&mut self) {
        while self.peek().is_separator() {
            self.bump();
        }
    }

    fn leaf(&mut self, kind: SyntaxKind, tok: Token) -> NodeId { self.builder.leaf(kind, tok.span) }

    fn span_from(&self, start: u32) -> PackedSpan { PackedSpan::from_bounds(start as usize, self.last_end as usize) }

    fn field(&mut self, id: NodeId, field: Field) -> NodeId { self.builder.set_field(id, field) }

    fn binary(&mut self, left: NodeId, op: Token, right: NodeId) -> NodeId {
        self.field(left, Field::Left);
        self.field(right, Field::Right);
        let span = self.builder.span(left);
        let id = self.builder.node(SyntaxKind::Binary, span, &[left, right]);
        self.builder.set_token(id, op.span);
        id
    }

    fn unary(&mut self, op: Token, operand: NodeId) -> NodeId {
        self.field(operand, Field::Operand);
        let id = self.builder.node(SyntaxKind::Unary, op.span, &[operand]);
        self.builder.set_token(id, op.span);
        id
    }

    /// Run `f` with `no_do` reset, restoring it afterwards.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = std::mem::replace(&mut self.no_do, 0);
        let result = f(self);
        self.no_do = saved;
        result
    }

    fn without_do<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        self.no_do += 1;
        let result = f(self);
        self.no_do -= 1;
        result
    }

    // ----- statements ----------------------------------------------------

    fn parse_statements(&mut self, terminators: &[TokenKind]) -> PResult<NodeId> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            let kind = self.peek();
            if terminators.contains(&kind) {
                break;
            }
            if kind == TokenKind::Eof {
                return Err(self.error("unexpected end of input"));
            }
            let stmt = self.parse_statement()?;
            stmts.push(stmt);
            let next = self.peek();
            if !next.is_separator() && !terminators.contains(&next) {
                return Err(self.error("expected end of statement"));
            }
        }
        let span = match stmts.first() {
            Some(&first) => self.builder.span(first),
            None => PackedSpan::new(self.last_end, 0),
        };
        Ok(self.builder.node(SyntaxKind::Body, span, &stmts))
    }

    fn parse_statement(&mut self) -> PResult<NodeId> {
        let mut stmt = self.parse_expression_statement()?;
        loop {
            let kind = match self.peek() {
                TokenKind::If => SyntaxKind::ModifierIf,
                TokenKind::Unless => SyntaxKind::ModifierUnless,
                TokenKind::While => SyntaxKind::ModifierWhile,
                TokenKind::Until => SyntaxKind::ModifierUntil,
                TokenKind::Rescue => SyntaxKind::ModifierRescue,
                _ => break,
            };
            let keyword = self.bump();
            self.skip_newlines();
            let condition = self.parse_expression()?;
            self.field(stmt, Field::Body);
            self.field(condition, Field::Condition);
            let span = self.builder.span(stmt);
            let node = self.builder.node(kind, span, &[stmt, condition]);
            self.builder.set_token(node, keyword.span);
            stmt = node;
        }
        Ok(stmt)
    }

    fn parse_expression_statement(&mut self) -> PResult<NodeId> {
        let first = self.parse_expression()?;
        let splat = self.builder.kind(first) == SyntaxKind::Splat;
        if self.at(TokenKind::Comma) && (splat || self.is_assignable(first)) && self.multi_assign_ahead() {
            let mut targets = vec![first];
            while self.eat(TokenKind::Comma).is_some() {
                targets.push(self.parse_mlhs_item()?);
            }
            let eq = self.expect(TokenKind::Assign, "`=` in multiple assignment")?;
            self.skip_newlines();
            let mut values = vec![self.parse_arg()?];
            while self.eat(TokenKind::Comma).is_some() {
                self.skip_newlines();
                values.push(self.parse_arg()?);
            }
            for &target in &targets {
                self.field(target, Field::Target);
            }
            for &value in &values {
                self.field(value, Field::Value);
            }
            let children: Vec<NodeId> = targets.into_iter().chain(values).collect();
            let span = self.builder.span(first);
            let node = self.builder.node(SyntaxKind::MultiAssign, span, &children);
            self.builder.set_token(node, eq.span);
            return Ok(node);
        }
        Ok(first)
    }

    fn multi_assign_ahead(&self) -> bool {
        let mut depth = 0i32;
        for tok in &self.tokens[self.pos..] {
            match tok.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth < 0 {
                        return false;
                    }
                }
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof if depth == 0 => return false,
                TokenKind::Assign if depth == 0 => return true,
                _ => {}
            }
        }
        false
    }

    fn parse_mlhs_item(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::Star) {
            let star = self.bump();
            let mut children = Vec::new();
            if self.at(TokenKind::Ident) {
                let operand = self.parse_postfix()?;
                children.push(self.field(operand, Field::Operand));
            }
            return Ok(self.builder.node(SyntaxKind::Splat, star.span, &children));
        }
        self.parse_postfix()
    }

    fn is_assignable(&self, id: NodeId) -> bool {
        use SyntaxKind::*;
        match self.builder.kind(id) {
            Identifier | Constant | InstanceVar | ClassVar | GlobalVar | ScopedConstant | Index => true,
            Call => self.attribute_calls.contains(&id),
            _ => false,
        }
    }

    // ----- expressions ---------------------------------------------------

    pub(crate) fn parse_expression(&mut self) -> PResult<NodeId> {
        let mut left = self.parse_not_expr()?;
        while matches!(self.peek(), TokenKind::And | TokenKind::Or) {
            let op = self.bump();
            self.skip_newlines();
            let right = self.parse_not_expr()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_not_expr(&mut self) -> PResult<NodeId> {
        if self.at(TokenKind::Not) {
            let op = self.bump();
            let operand = self.parse_not_expr()?;
            return Ok(self.unary(op, operand));
        }
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<NodeId> {
        let left = self.parse_ternary()?;
        let kind = match self.peek() {
            TokenKind::Assign => SyntaxKind::Assign,
            TokenKind::OpAssign => SyntaxKind::OpAssign,
            _ => return Ok(left),
        };
        if !self.is_assignable(left) {
            return Err(self.error("invalid assignment target"));
        }
        let op = self.bump();
        self.skip_newlines();
        let value = self.parse_not_expr()?;
        let kind = if self.builder.kind(left) == SyntaxKind::Index { SyntaxKind::IndexAssign } else { kind };
        self.field(left, Field::Target);
        self.field(value, Field::Value);
        let span = self.builder.span(left);
        let node = self.builder.node(kind, span, &[left, value]);
        self.builder.set_token(node, op.span);
        Ok(node)
    }

    fn parse_ternary(&mut self) -> PResult<NodeId> {
        let condition = self.parse_range()?;
        if !self.at(TokenKind::Question) {
            return Ok(condition);
        }
        let question = self.bump();
        self.skip_newlines();
        let then = self.parse_ternary()?;
        self.skip_newlines();
        self.expect(TokenKind::Colon, "`:` in ternary expression")?;
        self.skip_newlines();
        let otherwise = self.parse_ternary()?;
        self.field(condition, Field::Condition);
        self.field(then, Field::Branch);
        self.field(otherwise, Field::Else);
        let span = self.builder.span(condition);
        let node = self.builder.node(SyntaxKind::Ternary, span, &[condition, then, otherwise]);
        self.builder.set_token(node, question.span);
        Ok(node)
    }

    fn parse_range(&mut self) -> PResult<NodeId> {
        let left = self.parse_binary(1)?;
        if !matches!(self.peek(), TokenKind::Range2 | TokenKind::Range3) {
            return Ok(left);
        }
        let op = self.bump();
        if can_start_operand(self.peek()) {
            let right = self.parse_binary(1)?;
            return Ok(self.binary(left, op, right));
        }
        // endless range `1..`
        self.field(left, Field::Operand);
        let span = self.builder.span(left);
        let node = self.builder.node(SyntaxKind::Unary, span.cover(op.span), &[left]);
        self.builder.set_token(node, op.span);
        Ok(node)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<NodeId> {
        let mut left = self.parse_unary()?;
        loop {
            let tok = self.peek_tok();
            let Some((prec, right_assoc)) = binary_precedence(tok.kind) else { break };
            if prec < min_prec {
                break;
            }
            self.bump();
            self.skip_newlines();
            let right = self.parse_binary(if right_assoc { prec } else { prec + 1 })?;
            left = self.binary(left, tok, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let tok = self.peek_tok();
        match tok.kind {
            TokenKind::Bang | TokenKind::Tilde | TokenKind::Plus => {
                self.bump();
                let operand = self.parse_unary()?;
                Ok(self.unary(tok, operand))
            }
            TokenKind::Minus => {
                self.bump();
                let next = self.peek_tok();
                if matches!(next.kind, TokenKind::Integer | TokenKind::Float) && !next.spaced {
                    self.bump();
                    let kind = if next.kind == TokenKind::Integer { SyntaxKind::Integer } else { SyntaxKind::Float };
                    return Ok(self.builder.leaf(kind, tok.span.cover(next.span)));
                }
                let operand = self.parse_unary()?;
                Ok(self.unary(tok, operand))
            }
            TokenKind::Star | TokenKind::Pow => {
                self.bump();
                let operand = self.parse_unary()?;
                self.field(operand, Field::Operand);
                Ok(self.builder.node(SyntaxKind::Splat, tok.span, &[operand]))
            }
            TokenKind::Amp => {
                self.bump();
                let mut children = Vec::new();
                if can_start_operand(self.peek()) {
                    let operand = self.parse_unary()?;
                    children.push(self.field(operand, Field::Operand));
                }
                Ok(self.builder.node(SyntaxKind::BlockPass, tok.span, &children))
            }
            TokenKind::Colon2 => {
                self.bump();
                let name = self.expect(TokenKind::Constant, "constant after `::`")?;
                let constant = self.leaf(SyntaxKind::Constant, name);
                self.field(constant, Field::Name);
                let node = self.builder.node(SyntaxKind::ScopedConstant, tok.span, &[constant]);
                self.parse_postfix_from(node)
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let expr = self.parse_primary()?;
        self.parse_postfix_from(expr)
    }

    fn parse_postfix_from(&mut self, mut expr: NodeId) -> PResult<NodeId> {
        loop {
            let tok = self.peek_tok();
            match tok.kind {
                TokenKind::Dot | TokenKind::SafeNav => {
                    self.bump();
                    self.skip_newlines();
                    let name = self.bump();
                    if !is_method_name_token(name.kind) {
                        return Err(ParseError::at(&self.index, name.span.start as usize, "expected method name"));
                    }
                    let start = self.builder.span(expr).start;
                    expr = self.finish_call(Some(expr), name, start)?;
                }
                TokenKind::Colon2 => {
                    self.bump();
                    let name = self.bump();
                    let start = self.builder.span(expr).start;
                    let next = self.peek_tok();
                    let called = next.kind == TokenKind::LParen && !next.spaced;
                    match name.kind {
                        TokenKind::Constant if !called => {
                            self.field(expr, Field::Receiver);
                            let constant = self.leaf(SyntaxKind::Constant, name);
                            self.field(constant, Field::Name);
                            let span = self.span_from(start);
                            expr = self.builder.node(SyntaxKind::ScopedConstant, span, &[expr, constant]);
                        }
                        TokenKind::Ident | TokenKind::Constant => {
                            expr = self.finish_call(Some(expr), name, start)?;
                        }
                        _ => {
                            return Err(ParseError::at(&self.index, name.span.start as usize, "expected name after `::`"))
                        }
                    }
                }
                TokenKind::LBracket if !tok.spaced => {
                    self.bump();
                    let args = self.nested(|p| p.parse_args_until(TokenKind::RBracket))?;
                    let close = self.expect(TokenKind::RBracket, "`]`")?;
                    let start = self.builder.span(expr).start;
                    self.field(expr, Field::Receiver);
                    let mut children = vec![expr];
                    for arg in args {
                        children.push(self.field(arg, Field::Args));
                    }
                    let span = PackedSpan::from_bounds(start as usize, close.span.end() as usize);
                    expr = self.builder.node(SyntaxKind::Index, span, &children);
                }
                TokenKind::Newline => {
                    // leading-dot method chains continue the expression
                    let mut ahead = self.pos;
                    while self.tokens[ahead].kind == TokenKind::Newline {
                        ahead += 1;
                    }
                    if matches!(self.tokens[ahead].kind, TokenKind::Dot | TokenKind::SafeNav) {
                        self.pos = ahead;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn can_start_command_arg(&self) -> bool {
        use TokenKind::*;
        let tok = self.peek_tok();
        if !tok.spaced {
            return false;
        }
        let next = self.peek_nth(1);
        match tok.kind {
            Ident | Constant | InstanceVar | ClassVar | GlobalVar | Integer | Float | Str | Heredoc
            | Symbol | True | False | Nil | SelfKw | Arrow | Bang | LBracket | LParen | Def => true,
            Minus | Star | Pow | Amp | Colon2 => !next.spaced,
            _ => false,
        }
    }

    fn finish_call(&mut self, receiver: Option<NodeId>, name_tok: Token, start: u32) -> PResult<NodeId> {
        let name = self.leaf(SyntaxKind::MethodName, name_tok);
        self.field(name, Field::Name);
        let mut children = Vec::new();
        if let Some(receiver) = receiver {
            children.push(self.field(receiver, Field::Receiver));
        }
        children.push(name);

        let mut has_args = false;
        let next = self.peek_tok();
        if next.kind == TokenKind::LParen && !next.spaced {
            self.bump();
            let args = self.nested(|p| p.parse_args_until(TokenKind::RParen))?;
            self.expect(TokenKind::RParen, "`)`")?;
            has_args = true;
            for arg in args {
                children.push(self.field(arg, Field::Args));
            }
        } else if self.can_start_command_arg() {
            let args = self.without_do(|p| p.parse_command_args())?;
            has_args = true;
            for arg in args {
                children.push(self.field(arg, Field::Args));
            }
        }

        let mut has_block = false;
        if self.at(TokenKind::LBrace) {
            let block = self.parse_brace_block()?;
            children.push(self.field(block, Field::Block));
            has_block = true;
        } else if self.at(TokenKind::Do) && self.no_do == 0 {
            let block = self.parse_do_block()?;
            children.push(self.field(block, Field::Block));
            has_block = true;
        }

        let span = self.span_from(start);
        let call = self.builder.node(SyntaxKind::Call, span, &children);
        self.builder.set_token(call, name_tok.span);
        if receiver.is_some() && !has_args && !has_block {
            self.attribute_calls.insert(call);
        }
        Ok(call)
    }

    fn parse_command_args(&mut self) -> PResult<Vec<NodeId>> {
        let mut args = vec![self.parse_arg()?];
        while self.eat(TokenKind::Comma).is_some() {
            self.skip_newlines();
            args.push(self.parse_arg()?);
        }
        Ok(args)
    }

    fn parse_args_until(&mut self, close: TokenKind) -> PResult<Vec<NodeId>> {
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(close) {
                break;
            }
            args.push(self.parse_arg()?);
            self.skip_newlines();
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(args)
    }

    fn is_label_start(&self) -> bool {
        let tok = self.peek_tok();
        let next = self.peek_nth(1);
        let keyish = is_method_name_token(tok.kind) || tok.kind == TokenKind::Str;
        keyish && next.kind == TokenKind::Colon && !next.spaced
    }

    /// Call argument, array element or hash entry.
    fn parse_arg(&mut self) -> PResult<NodeId> {
        if self.is_label_start() {
            let key_tok = self.bump();
            let colon = self.bump();
            let key = self.builder.leaf(SyntaxKind::Symbol, key_tok.span.cover(colon.span));
            self.field(key, Field::Key);
            let mut children = vec![key];
            let shorthand = matches!(
                self.peek(),
                TokenKind::Comma | TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket
            );
            if !shorthand {
                self.skip_newlines();
                let value = self.parse_not_expr()?;
                children.push(self.field(value, Field::Value));
            }
            return Ok(self.builder.node(SyntaxKind::Pair, key_tok.span, &children));
        }
        if matches!(self.peek(), TokenKind::Star | TokenKind::Pow | TokenKind::Amp) {
            return self.parse_unary();
        }
        let expr = self.parse_not_expr()?;
        if let Some(arrow) = self.eat(TokenKind::FatArrow) {
            self.skip_newlines();
            let value = self.parse_not_expr()?;
            self.field(expr, Field::Key);
            self.field(value, Field::Value);
            let span = self.builder.span(expr);
            let pair = self.builder.node(SyntaxKind::Pair, span, &[expr, value]);
            self.builder.set_token(pair, arrow.span);
            return Ok(pair);
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let tok = self.peek_tok();
        let simple = match tok.kind {
            TokenKind::Integer => Some(SyntaxKind::Integer),
            TokenKind::Float => Some(SyntaxKind::Float),
            TokenKind::Str => Some(SyntaxKind::Str),
            TokenKind::Heredoc => Some(SyntaxKind::Heredoc),
            TokenKind::Symbol => Some(SyntaxKind::Symbol),
            TokenKind::True => Some(SyntaxKind::True),
            TokenKind::False => Some(SyntaxKind::False),
            TokenKind::Nil => Some(SyntaxKind::Nil),
            TokenKind::SelfKw => Some(SyntaxKind::SelfRef),
            TokenKind::InstanceVar => Some(SyntaxKind::InstanceVar),
            TokenKind::ClassVar => Some(SyntaxKind::ClassVar),
            TokenKind::GlobalVar => Some(SyntaxKind::GlobalVar),
            _ => None,
        };
        if let Some(kind) = simple {
            self.bump();
            return Ok(self.leaf(kind, tok));
        }

        match tok.kind {
            TokenKind::Constant => {
                self.bump();
                let next = self.peek_tok();
                if next.kind == TokenKind::LParen && !next.spaced {
                    return self.finish_call(None, tok, tok.span.start);
                }
                Ok(self.leaf(SyntaxKind::Constant, tok))
            }
            TokenKind::Ident => {
                self.bump();
                let next = self.peek_tok();
                let is_call = (next.kind == TokenKind::LParen && !next.spaced)
                    || next.kind == TokenKind::LBrace
                    || (next.kind == TokenKind::Do && self.no_do == 0)
                    || self.can_start_command_arg();
                if is_call {
                    self.finish_call(None, tok, tok.span.start)
                } else {
                    Ok(self.leaf(SyntaxKind::Identifier, tok))
                }
            }
            TokenKind::LParen => {
                let open = self.bump();
                let body = self.nested(|p| p.parse_statements(&[TokenKind::RParen]))?;
                self.field(body, Field::Body);
                let close = self.expect(TokenKind::RParen, "`)`")?;
                let span = open.span.cover(close.span);
                Ok(self.builder.node(SyntaxKind::Paren, span, &[body]))
            }
            TokenKind::LBracket => {
                let open = self.bump();
                let items = self.nested(|p| p.parse_args_until(TokenKind::RBracket))?;
                let close = self.expect(TokenKind::RBracket, "`]`")?;
                Ok(self.builder.node(SyntaxKind::Array, open.span.cover(close.span), &items))
            }
            TokenKind::LBrace => {
                let open = self.bump();
                let entries = self.nested(|p| p.parse_args_until(TokenKind::RBrace))?;
                let close = self.expect(TokenKind::RBrace, "`}`")?;
                Ok(self.builder.node(SyntaxKind::Hash, open.span.cover(close.span), &entries))
            }
            TokenKind::Arrow => self.parse_lambda(),
            TokenKind::Def => self.parse_def(),
            TokenKind::Case => self.parse_case(),
            TokenKind::If | TokenKind::Unless => self.parse_if(),
            TokenKind::While | TokenKind::Until => self.parse_while(),
            TokenKind::Begin => self.parse_begin(),
            TokenKind::Class => self.parse_class(),
            TokenKind::Module => self.parse_module(),
            TokenKind::Return | TokenKind::Break | TokenKind::Next | TokenKind::Redo | TokenKind::Retry => {
                self.bump();
                let mut children = Vec::new();
                if can_start_operand(self.peek()) {
                    for value in self.parse_command_args()? {
                        children.push(self.field(value, Field::Value));
                    }
                }
                let kind = if tok.kind == TokenKind::Return { SyntaxKind::Return } else { SyntaxKind::Jump };
                let node = self.builder.node(kind, tok.span, &children);
                self.builder.set_token(node, tok.span);
                Ok(node)
            }
            TokenKind::Yield => {
                self.bump();
                let next = self.peek_tok();
                let mut args = Vec::new();
                if next.kind == TokenKind::LParen && !next.spaced {
                    self.bump();
                    args = self.nested(|p| p.parse_args_until(TokenKind::RParen))?;
                    self.expect(TokenKind::RParen, "`)`")?;
                } else if self.can_start_command_arg() {
                    args = self.parse_command_args()?;
                }
                for &arg in &args {
                    self.field(arg, Field::Args);
                }
                let span = self.span_from(tok.span.start);
                Ok(self.builder.node(SyntaxKind::Yield, span, &args))
            }
            _ => Err(self.error("unexpected token")),
        }
    }

    // ----- blocks and lambdas --------------------------------------------

    fn parse_block_params(&mut self) -> PResult<Option<NodeId>> {
        let open = self.peek_tok();
        match open.kind {
            TokenKind::OrOr => {
                self.bump();
                let node = self.builder.node(SyntaxKind::Params, open.span, &[]);
                self.builder.set_token(node, open.span);
                Ok(Some(self.field(node, Field::Params)))
            }
            TokenKind::Pipe => {
                self.bump();
                let mut params = Vec::new();
                while !self.at(TokenKind::Pipe) {
                    params.push(self.parse_param()?);
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                let close = self.expect(TokenKind::Pipe, "`|` closing block parameters")?;
                let node = self.builder.node(SyntaxKind::Params, open.span.cover(close.span), &params);
                self.builder.set_token(node, open.span);
                Ok(Some(self.field(node, Field::Params)))
            }
            _ => Ok(None),
        }
    }

    fn parse_brace_block(&mut self) -> PResult<NodeId> {
        let open = self.bump();
        let (params, body) = self.nested(|p| {
            let params = p.parse_block_params()?;
            let body = p.parse_statements(&[TokenKind::RBrace])?;
            Ok((params, body))
        })?;
        self.field(body, Field::Body);
        let close = self.expect(TokenKind::RBrace, "`}`")?;
        let children: Vec<NodeId> = params.into_iter().chain(Some(body)).collect();
        let node = self.builder.node(SyntaxKind::Block, open.span.cover(close.span), &children);
        self.builder.set_token(node, open.span);
        Ok(node)
    }

    fn parse_do_block(&mut self) -> PResult<NodeId> {
        let open = self.bump();
        let (params, clauses) = self.nested(|p| {
            let params = p.parse_block_params()?;
            let clauses = p.parse_body_with_clauses()?;
            Ok((params, clauses))
        })?;
        let close = self.expect(TokenKind::End, "`end` closing `do` block")?;
        let children: Vec<NodeId> = params.into_iter().chain(clauses).collect();
        let node = self.builder.node(SyntaxKind::Block, open.span.cover(close.span), &children);
        self.builder.set_token(node, open.span);
        Ok(node)
    }

    fn parse_lambda(&mut self) -> PResult<NodeId> {
        let arrow = self.bump();
        let mut children = Vec::new();
        if self.at(TokenKind::LParen) {
            let open = self.bump();
            let params = self.parse_params_list(TokenKind::RParen)?;
            let close = self.expect(TokenKind::RParen, "`)`")?;
            let node = self.builder.node(SyntaxKind::Params, open.span.cover(close.span), &params);
            self.builder.set_token(node, open.span);
            children.push(self.field(node, Field::Params));
        } else if self.at(TokenKind::Ident) {
            let start = self.peek_tok().span.start;
            let mut params = Vec::new();
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            let node = self.builder.node(SyntaxKind::Params, self.span_from(start), &params);
            children.push(self.field(node, Field::Params));
        }
        let block = match self.peek() {
            TokenKind::LBrace => self.parse_brace_block()?,
            TokenKind::Do => self.parse_do_block()?,
            _ => return Err(self.error("expected lambda body")),
        };
        children.push(self.field(block, Field::Block));
        Ok(self.builder.node(SyntaxKind::Lambda, arrow.span, &children))
    }

    // ----- definitions ---------------------------------------------------

    fn parse_params_list(&mut self, close: TokenKind) -> PResult<Vec<NodeId>> {
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.at(close) {
                break;
            }
            params.push(self.parse_param()?);
            self.skip_newlines();
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(params)
    }

    fn parse_param(&mut self) -> PResult<NodeId> {
        let tok = self.peek_tok();
        let mut children = Vec::new();
        match tok.kind {
            TokenKind::Star | TokenKind::Pow | TokenKind::Amp => {
                self.bump();
                self.eat(TokenKind::Ident);
            }
            TokenKind::LParen => {
                self.bump();
                children = self.parse_params_list(TokenKind::RParen)?;
                self.expect(TokenKind::RParen, "`)`")?;
            }
            TokenKind::Ident => {
                self.bump();
                let next = self.peek_tok();
                if next.kind == TokenKind::Colon && !next.spaced {
                    self.bump();
                    if can_start_operand(self.peek()) {
                        let default = self.parse_ternary()?;
                        children.push(self.field(default, Field::Default));
                    }
                } else if next.kind == TokenKind::Assign {
                    self.bump();
                    let default = self.parse_ternary()?;
                    children.push(self.field(default, Field::Default));
                }
            }
            _ => return Err(self.error("expected parameter")),
        }
        let span = self.span_from(tok.span.start);
        Ok(self.builder.node(SyntaxKind::Param, span, &children))
    }

    fn parse_method_name(&mut self) -> PResult<NodeId> {
        use TokenKind::*;
        let tok = self.bump();
        let mut end = tok.span.end();
        match tok.kind {
            Ident | Constant => {
                // setter: `def name=(value)`
                let next = self.peek_tok();
                let after = self.peek_nth(1);
                if next.kind == Assign && !next.spaced && after.kind == LParen && !after.spaced {
                    self.bump();
                    end = next.span.end();
                }
            }
            LBracket => {
                let close = self.expect(RBracket, "`]` in method name")?;
                end = close.span.end();
                let next = self.peek_tok();
                if next.kind == Assign && !next.spaced {
                    self.bump();
                    end = next.span.end();
                }
            }
            EqEq | EqEqEq | NotEq | Match | NotMatch | Spaceship | Lt | LtEq | Gt | GtEq | Plus | Minus
            | Star | Pow | Slash | Percent | Shl | Shr | Amp | Pipe | Caret | Bang | Tilde => {}
            kind if kind.is_keyword() => {}
            _ => return Err(ParseError::at(&self.index, tok.span.start as usize, "expected method name")),
        }
        let span = PackedSpan::from_bounds(tok.span.start as usize, end as usize);
        Ok(self.builder.leaf(SyntaxKind::MethodName, span))
    }

    fn parse_def(&mut self) -> PResult<NodeId> {
        let keyword = self.bump();
        let mut children = Vec::new();

        let first = self.peek_tok();
        let second = self.peek_nth(1);
        if matches!(first.kind, TokenKind::SelfKw | TokenKind::Ident | TokenKind::Constant)
            && second.kind == TokenKind::Dot
            && !second.spaced
        {
            self.bump();
            self.bump();
            let kind = match first.kind {
                TokenKind::SelfKw => SyntaxKind::SelfRef,
                TokenKind::Constant => SyntaxKind::Constant,
                _ => SyntaxKind::Identifier,
            };
            let receiver = self.leaf(kind, first);
            children.push(self.field(receiver, Field::Receiver));
        }

        let name = self.parse_method_name()?;
        children.push(self.field(name, Field::Name));

        let next = self.peek_tok();
        if next.kind == TokenKind::LParen && !next.spaced {
            let open = self.bump();
            let params = self.parse_params_list(TokenKind::RParen)?;
            let close = self.expect(TokenKind::RParen, "`)` closing parameters")?;
            let node = self.builder.node(SyntaxKind::Params, open.span.cover(close.span), &params);
            self.builder.set_token(node, open.span);
            children.push(self.field(node, Field::Params));
        } else if matches!(next.kind, TokenKind::Ident | TokenKind::Star | TokenKind::Pow | TokenKind::Amp) {
            let mut params = Vec::new();
            loop {
                params.push(self.parse_param()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            let node = self.builder.node(SyntaxKind::Params, self.span_from(next.span.start), &params);
            children.push(self.field(node, Field::Params));
        }

        if let Some(eq) = self.eat(TokenKind::Assign) {
            self.skip_newlines();
            let stmt = self.parse_expression()?;
            let span = self.builder.span(stmt);
            let body = self.builder.node(SyntaxKind::Body, span, &[stmt]);
            children.push(self.field(body, Field::Body));
            let def = self.builder.node(SyntaxKind::Def, keyword.span, &children);
            self.builder.set_token(def, eq.span);
            return Ok(def);
        }

        children.extend(self.parse_body_with_clauses()?);
        let end = self.expect(TokenKind::End, "`end` closing `def`")?;
        Ok(self.builder.node(SyntaxKind::Def, keyword.span.cover(end.span), &children))
    }

    /// Body followed by optional `rescue`/`else`/`ensure` clauses (def, begin, do-block).
    fn parse_body_with_clauses(&mut self) -> PResult<Vec<NodeId>> {
        use TokenKind::*;
        let body = self.parse_statements(&[Rescue, Else, Ensure, End])?;
        let mut nodes = vec![self.field(body, Field::Body)];

        while let Some(keyword) = self.eat(Rescue) {
            let mut children = Vec::new();
            while !self.peek().is_separator() && !matches!(self.peek(), Then | FatArrow) {
                let exception = self.parse_ternary()?;
                children.push(self.field(exception, Field::Value));
                if self.eat(Comma).is_none() {
                    break;
                }
                self.skip_newlines();
            }
            if self.eat(FatArrow).is_some() {
                let var = self.parse_postfix()?;
                children.push(self.field(var, Field::Target));
            }
            self.eat(Then);
            let body = self.parse_statements(&[Rescue, Else, Ensure, End])?;
            children.push(self.field(body, Field::Body));
            let node = self.builder.node(SyntaxKind::Rescue, keyword.span, &children);
            self.builder.set_token(node, keyword.span);
            nodes.push(self.field(node, Field::Rescue));
        }

        if let Some(keyword) = self.eat(Else) {
            let body = self.parse_statements(&[Ensure, End])?;
            self.field(body, Field::Body);
            let node = self.builder.node(SyntaxKind::Else, keyword.span, &[body]);
            nodes.push(self.field(node, Field::Else));
        }

        if let Some(keyword) = self.eat(Ensure) {
            let body = self.parse_statements(&[End])?;
            self.field(body, Field::Body);
            let node = self.builder.node(SyntaxKind::Ensure, keyword.span, &[body]);
            nodes.push(self.field(node, Field::Ensure));
        }
        Ok(nodes)
    }

    fn parse_constant_path(&mut self) -> PResult<NodeId> {
        let first = self.expect(TokenKind::Constant, "constant name")?;
        let mut path = self.leaf(SyntaxKind::Constant, first);
        while self.at(TokenKind::Colon2) && self.peek_nth(1).kind == TokenKind::Constant {
            self.bump();
            let name = self.bump();
            self.field(path, Field::Receiver);
            let constant = self.leaf(SyntaxKind::Constant, name);
            self.field(constant, Field::Name);
            let span = self.span_from(first.span.start);
            path = self.builder.node(SyntaxKind::ScopedConstant, span, &[path, constant]);
        }
        Ok(path)
    }

    fn parse_class(&mut self) -> PResult<NodeId> {
        let keyword = self.bump();
        let mut children = Vec::new();
        if self.eat(TokenKind::Shl).is_some() {
            let target = self.parse_expression()?;
            children.push(self.field(target, Field::Subject));
        } else {
            let name = self.parse_constant_path()?;
            children.push(self.field(name, Field::Name));
            if self.eat(TokenKind::Lt).is_some() {
                let parent = self.parse_expression()?;
                children.push(self.field(parent, Field::Value));
            }
        }
        children.extend(self.parse_body_with_clauses()?);
        let end = self.expect(TokenKind::End, "`end` closing `class`")?;
        Ok(self.builder.node(SyntaxKind::Class, keyword.span.cover(end.span), &children))
    }

    fn parse_module(&mut self) -> PResult<NodeId> {
        let keyword = self.bump();
        let name = self.parse_constant_path()?;
        let mut children = vec![self.field(name, Field::Name)];
        children.extend(self.parse_body_with_clauses()?);
        let end = self.expect(TokenKind::End, "`end` closing `module`")?;
        Ok(self.builder.node(SyntaxKind::Module, keyword.span.cover(end.span), &children))
    }

    // ----- control flow --------------------------------------------------

    fn parse_then(&mut self) -> PResult<()> {
        if self.eat(TokenKind::Then).is_none() && !self.peek().is_separator() {
            return Err(self.error("expected `then` or newline"));
        }
        Ok(())
    }

    fn parse_case(&mut self) -> PResult<NodeId> {
        use TokenKind::*;
        let keyword = self.bump();
        let mut children = Vec::new();
        if !self.peek().is_separator() {
            let subject = self.parse_expression()?;
            children.push(self.field(subject, Field::Subject));
        }
        self.skip_separators();

        let mut branches = 0usize;
        while let Some(when) = self.eat(When) {
            let mut parts = Vec::new();
            loop {
                let value = self.parse_arg()?;
                parts.push(self.field(value, Field::Value));
                if self.eat(Comma).is_none() {
                    break;
                }
                self.skip_newlines();
            }
            let then = self.eat(Then);
            if then.is_none() && !self.peek().is_separator() {
                return Err(self.error("expected `then` or newline after `when` values"));
            }
            let body = self.parse_statements(&[When, Else, End])?;
            parts.push(self.field(body, Field::Body));
            let node = self.builder.node(SyntaxKind::When, when.span, &parts);
            if let Some(then) = then {
                self.builder.set_token(node, then.span);
            }
            children.push(self.field(node, Field::Branch));
            branches += 1;
        }
        if branches == 0 {
            return Err(self.error("expected `when`"));
        }

        if let Some(keyword) = self.eat(Else) {
            let body = self.parse_statements(&[End])?;
            self.field(body, Field::Body);
            let node = self.builder.node(SyntaxKind::Else, keyword.span, &[body]);
            children.push(self.field(node, Field::Else));
        }
        let end = self.expect(End, "`end` closing `case`")?;
        Ok(self.builder.node(SyntaxKind::Case, keyword.span.cover(end.span), &children))
    }

    fn parse_if(&mut self) -> PResult<NodeId> {
        use TokenKind::*;
        let keyword = self.bump();
        let kind = if keyword.kind == If { SyntaxKind::If } else { SyntaxKind::Unless };
        let condition = self.parse_expression()?;
        self.parse_then()?;
        let body = self.parse_statements(&[Elsif, Else, End])?;
        let mut children = vec![self.field(condition, Field::Condition), self.field(body, Field::Body)];

        while let Some(elsif) = self.eat(Elsif) {
            let condition = self.parse_expression()?;
            self.parse_then()?;
            let body = self.parse_statements(&[Elsif, Else, End])?;
            let parts = [self.field(condition, Field::Condition), self.field(body, Field::Body)];
            let node = self.builder.node(SyntaxKind::Elsif, elsif.span, &parts);
            children.push(self.field(node, Field::Branch));
        }
        if let Some(keyword) = self.eat(Else) {
            let body = self.parse_statements(&[End])?;
            self.field(body, Field::Body);
            let node = self.builder.node(SyntaxKind::Else, keyword.span, &[body]);
            children.push(self.field(node, Field::Else));
        }
        let end = self.expect(End, "`end` closing conditional")?;
        Ok(self.builder.node(kind, keyword.span.cover(end.span), &children))
    }

    fn parse_while(&mut self) -> PResult<NodeId> {
        let keyword = self.bump();
        let kind = if keyword.kind == TokenKind::While { SyntaxKind::While } else { SyntaxKind::Until };
        let condition = self.without_do(|p| p.parse_expression())?;
        if self.eat(TokenKind::Do).is_none() && !self.peek().is_separator() {
            return Err(self.error("expected `do` or newline"));
        }
        let body = self.parse_statements(&[TokenKind::End])?;
        let children = [self.field(condition, Field::Condition), self.field(body, Field::Body)];
        let end = self.expect(TokenKind::End, "`end` closing loop")?;
        Ok(self.builder.node(kind, keyword.span.cover(end.span), &children))
    }

    fn parse_begin(&mut self) -> PResult<NodeId> {
        let keyword = self.bump();
        let children = self.parse_body_with_clauses()?;
        let end = self.expect(TokenKind::End, "`end` closing `begin`")?;
        Ok(self.builder.node(SyntaxKind::Begin, keyword.span.cover(end.span), &children))
    }
}
