//! Arena syntax tree consumed by the alignment engine.
//!
//! Узлы лежат в плоской арене и адресуются через `NodeId`; дети связаны через
//! first_child / next_sibling. Дерево неизменяемо после `TreeBuilder::build`,
//! движок только читает его.

use serde::{Deserialize, Serialize};

use crate::core::position::{display_width, LineIndex, PackedSpan};

/// Устойчивый идентификатор узла внутри одной арены.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Вид узла.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    Program,
    /// Statement list.
    Body,
    Def,
    Params,
    Param,
    Class,
    Module,
    Case,
    When,
    Else,
    If,
    Unless,
    Elsif,
    While,
    Until,
    Begin,
    Rescue,
    Ensure,
    ModifierIf,
    ModifierUnless,
    ModifierWhile,
    ModifierUntil,
    ModifierRescue,
    Ternary,
    Assign,
    OpAssign,
    MultiAssign,
    IndexAssign,
    Call,
    Index,
    Block,
    Lambda,
    Binary,
    Unary,
    Paren,
    Array,
    Hash,
    Pair,
    Splat,
    BlockPass,
    ScopedConstant,
    Return,
    Yield,
    Jump,
    Identifier,
    Constant,
    InstanceVar,
    ClassVar,
    GlobalVar,
    MethodName,
    Integer,
    Float,
    Symbol,
    Str,
    Heredoc,
    True,
    False,
    Nil,
    SelfRef,
}

impl SyntaxKind {
    /// Constructs whose line breaks are syntactically significant: joining their
    /// lines with plain spaces does not produce equivalent code.
    pub fn is_keyword_compound(self) -> bool {
        use SyntaxKind::*;
        matches!(self, Def | Class | Module | Case | If | Unless | While | Until | Begin)
    }

    pub fn is_variable(self) -> bool {
        use SyntaxKind::*;
        matches!(self, Identifier | InstanceVar | ClassVar | GlobalVar)
    }
}

/// Роль узла относительно родителя (именованный ребёнок).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Subject,
    Value,
    Body,
    Target,
    Receiver,
    Name,
    Params,
    Args,
    Block,
    Condition,
    Branch,
    Else,
    Rescue,
    Ensure,
    Key,
    Operand,
    Left,
    Right,
    Default,
}

/// Узел в арене.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: SyntaxKind,
    pub field: Option<Field>,
    pub span: PackedSpan,
    /// Notable sub-token: assignment operator, `then`, endless-def `=`, method name, etc.
    pub token: Option<PackedSpan>,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

/// Агрегатор всех узлов.
#[derive(Default, Debug, Clone)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self { Self { nodes: Vec::new() } }
    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }
    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id.0 as usize] }
    fn node_mut(&mut self, id: NodeId) -> &mut Node { &mut self.nodes[id.0 as usize] }
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }
}

/// Построитель дерева снизу вверх: дети создаются раньше родителя.
#[derive(Default)]
pub struct TreeBuilder {
    arena: Arena,
}

impl TreeBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn leaf(&mut self, kind: SyntaxKind, span: PackedSpan) -> NodeId {
        self.arena.alloc(Node { kind, field: None, span, token: None, first_child: None, next_sibling: None })
    }

    /// Allocate a node over `children` (in source order). The span is widened to
    /// cover every child.
    pub fn node(&mut self, kind: SyntaxKind, span: PackedSpan, children: &[NodeId]) -> NodeId {
        let mut span = span;
        for &child in children {
            span = span.cover(self.arena.node(child).span);
        }
        let id = self.leaf(kind, span);
        let mut prev: Option<NodeId> = None;
        for &child in children {
            match prev {
                None => self.arena.node_mut(id).first_child = Some(child),
                Some(p) => self.arena.node_mut(p).next_sibling = Some(child),
            }
            prev = Some(child);
        }
        id
    }

    pub fn set_field(&mut self, id: NodeId, field: Field) -> NodeId {
        self.arena.node_mut(id).field = Some(field);
        id
    }

    pub fn set_token(&mut self, id: NodeId, token: PackedSpan) {
        self.arena.node_mut(id).token = Some(token);
    }

    pub fn span(&self, id: NodeId) -> PackedSpan { self.arena.node(id).span }

    pub fn kind(&self, id: NodeId) -> SyntaxKind { self.arena.node(id).kind }

    pub fn build(self, root: NodeId, source: impl Into<String>, comments: Vec<PackedSpan>) -> Tree {
        let source = source.into();
        let mut parents = vec![None; self.arena.len()];
        for (nid, node) in self.arena.iter() {
            let mut child = node.first_child;
            while let Some(c) = child {
                parents[c.0 as usize] = Some(nid);
                child = self.arena.node(c).next_sibling;
            }
        }
        let line_index = LineIndex::new(&source);
        Tree { arena: self.arena, root, parents, line_index, source, comments }
    }
}

/// Дерево одного исходного файла вместе с текстом, индексом строк и комментариями.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena,
    root: NodeId,
    parents: Vec<Option<NodeId>>,
    line_index: LineIndex,
    source: String,
    comments: Vec<PackedSpan>,
}

impl Tree {
    pub fn root(&self) -> NodeId { self.root }
    pub fn node(&self, id: NodeId) -> &Node { self.arena.node(id) }
    pub fn kind(&self, id: NodeId) -> SyntaxKind { self.arena.node(id).kind }
    pub fn span(&self, id: NodeId) -> PackedSpan { self.arena.node(id).span }
    pub fn source(&self) -> &str { &self.source }
    pub fn line_index(&self) -> &LineIndex { &self.line_index }
    pub fn comments(&self) -> &[PackedSpan] { &self.comments }
    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.parents[id.0 as usize] }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).first_child, move |c| self.node(*c).next_sibling)
    }

    pub fn child_by_field(&self, id: NodeId, field: Field) -> Option<NodeId> {
        self.children(id).find(|c| self.node(*c).field == Some(field))
    }

    pub fn children_by_field(&self, id: NodeId, field: Field) -> Vec<NodeId> {
        self.children(id).filter(|c| self.node(*c).field == Some(field)).collect()
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    pub fn text(&self, id: NodeId) -> &str { &self.source[self.span(id).range()] }

    pub fn slice(&self, span: PackedSpan) -> &str { &self.source[span.range()] }

    pub fn first_line(&self, id: NodeId) -> usize { self.line_index.line_of(self.span(id).start) }

    pub fn last_line(&self, id: NodeId) -> usize {
        let span = self.span(id);
        self.line_index.line_of(span.end().saturating_sub(1).max(span.start))
    }

    pub fn is_single_line(&self, id: NodeId) -> bool { self.first_line(id) == self.last_line(id) }

    /// Character column where the node starts.
    pub fn start_column(&self, id: NodeId) -> usize {
        self.line_index.char_column(&self.source, self.span(id).start as usize)
    }

    /// Whether the node is the first thing on its line.
    pub fn starts_line(&self, id: NodeId) -> bool {
        let line = self.first_line(id);
        self.start_column(id) == self.line_index.indentation(&self.source, line)
    }

    /// Any comment starting inside `[start, end)`.
    pub fn has_comment_within(&self, start: usize, end: usize) -> bool {
        self.comments.iter().any(|c| (c.start as usize) >= start && (c.start as usize) < end)
    }

    /// Width of the text from `offset` to the end of its line.
    pub fn rest_of_line_width(&self, offset: usize) -> usize {
        let line = self.line_index.line_of(offset as u32);
        let end = self.line_index.line_range(&self.source, line).end;
        display_width(&self.source[offset.min(end)..end])
    }

    /// Preorder walk of the subtree rooted at `id` (including `id`).
    pub fn descendants(&self, id: NodeId) -> Preorder<'_> { preorder(self, id) }

    pub fn any_descendant(&self, id: NodeId, pred: impl Fn(NodeId) -> bool) -> bool {
        self.descendants(id).any(pred)
    }
}

/// Итеративный preorder обход.
pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children: Vec<NodeId> = self.tree.children(id).collect();
        self.stack.extend(children.into_iter().rev());
        Some(id)
    }
}

pub fn preorder(tree: &Tree, root: NodeId) -> Preorder<'_> {
    Preorder { tree, stack: vec![root] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        // "a = 1\nbb = 2\n"
        let source = "a = 1\nbb = 2\n";
        let mut b = TreeBuilder::new();
        let t1 = b.leaf(SyntaxKind::Identifier, PackedSpan::new(0, 1));
        b.set_field(t1, Field::Target);
        let v1 = b.leaf(SyntaxKind::Integer, PackedSpan::new(4, 1));
        b.set_field(v1, Field::Value);
        let a1 = b.node(SyntaxKind::Assign, PackedSpan::new(0, 0), &[t1, v1]);
        b.set_token(a1, PackedSpan::new(2, 1));
        let t2 = b.leaf(SyntaxKind::Identifier, PackedSpan::new(6, 2));
        let v2 = b.leaf(SyntaxKind::Integer, PackedSpan::new(11, 1));
        let a2 = b.node(SyntaxKind::Assign, PackedSpan::new(6, 0), &[t2, v2]);
        let body = b.node(SyntaxKind::Body, PackedSpan::new(0, 0), &[a1, a2]);
        let root = b.node(SyntaxKind::Program, PackedSpan::new(0, 13), &[body]);
        b.build(root, source, Vec::new())
    }

    #[test]
    fn test_spans_cover_children() {
        let tree = sample();
        let body = tree.children(tree.root()).next().unwrap();
        assert_eq!(tree.span(body), PackedSpan::new(0, 12));
        assert_eq!(tree.text(body), "a = 1\nbb = 2");
    }

    #[test]
    fn test_navigation() {
        let tree = sample();
        let body = tree.children(tree.root()).next().unwrap();
        let stmts: Vec<_> = tree.children(body).collect();
        assert_eq!(stmts.len(), 2);
        assert_eq!(tree.parent(stmts[0]), Some(body));
        assert_eq!(tree.ancestors(stmts[1]).count(), 2);
        let target = tree.child_by_field(stmts[0], Field::Target).unwrap();
        assert_eq!(tree.text(target), "a");
        assert_eq!(tree.first_line(stmts[1]), 1);
        assert!(tree.is_single_line(stmts[1]));
    }

    #[test]
    fn test_preorder_visits_in_source_order() {
        let tree = sample();
        let kinds: Vec<_> = tree.descendants(tree.root()).map(|id| tree.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::Program,
                SyntaxKind::Body,
                SyntaxKind::Assign,
                SyntaxKind::Identifier,
                SyntaxKind::Integer,
                SyntaxKind::Assign,
                SyntaxKind::Identifier,
                SyntaxKind::Integer,
            ]
        );
    }
}
