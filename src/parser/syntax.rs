//! Concrete syntax tree for one T-SQL batch.
//!
//! The tree is an arena: every node lives in one `Vec`, children are ordered
//! `NodeId`s and every node keeps a link to its parent. The root is always a
//! [`NodeKind::Batch`] node, which doubles as the sentinel that bounds every
//! upward walk.
//!
//! Node text is not stored per node. Each node records the span of
//! significant tokens it covers, and [`SyntaxTree::text`] rebuilds the source
//! text (whitespace and comments included) from the shared token stream.

use std::ops::Range;

use sqlparser::tokenizer::TokenWithSpan;

use super::identifier_utils::token_source_text;

/// Index of a node inside its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl SetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Except => "EXCEPT",
            SetOperator::Intersect => "INTERSECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
    CrossApply,
    OuterApply,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::CrossApply => "CROSS APPLY",
            JoinKind::OuterApply => "OUTER APPLY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Default,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Check => "CHECK",
            ConstraintKind::Default => "DEFAULT",
        }
    }
}

/// How a routine, view or trigger definition was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineVerb {
    Create,
    Alter,
    CreateOrAlter,
}

impl RoutineVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineVerb::Create => "CREATE",
            RoutineVerb::Alter => "ALTER",
            RoutineVerb::CreateOrAlter => "CREATE OR ALTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Scalar,
    InlineTable,
    MultiStatementTable,
    Clr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerScope {
    Table,
    Database,
    AllServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Plain,
    Try,
    Catch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    NationalString,
    Number,
    Hex,
    Null,
}

/// Every construct the tree producer can emit.
///
/// The classification dispatcher matches on this enum exhaustively, so a new
/// variant does not compile until it has a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Batch,
    Block {
        kind: BlockKind,
    },

    // Queries
    Query,
    WithClause,
    Cte {
        name: String,
    },
    SetOperation {
        operator: SetOperator,
    },
    QuerySpec {
        distinct: bool,
    },
    Top {
        percent: bool,
        with_ties: bool,
    },
    SelectItem {
        alias: Option<String>,
    },
    Star,
    Into {
        target: String,
    },
    From,
    TableRef {
        name: String,
        alias: Option<String>,
    },
    DerivedTable {
        alias: Option<String>,
    },
    TableFunction {
        name: String,
        alias: Option<String>,
    },
    Join {
        kind: JoinKind,
        hint: Option<String>,
    },
    Pivot {
        unpivot: bool,
    },
    TableHint {
        hint: String,
    },
    Where,
    GroupBy {
        modifier: Option<String>,
    },
    Having,
    OrderBy {
        offset_fetch: bool,
    },
    ForClause {
        mode: String,
    },
    OptionClause,
    QueryHint {
        hint: String,
    },

    // DML
    Insert {
        target: String,
    },
    Values {
        rows: usize,
    },
    DefaultValues,
    Update {
        target: String,
    },
    Delete {
        target: String,
    },
    Merge {
        target: String,
    },
    MergeAction {
        action: String,
    },
    Output {
        into: Option<String>,
    },
    Truncate {
        table: String,
    },
    ColumnAssignment {
        column: String,
        operator: String,
    },
    VariableAssignment {
        variable: String,
        operator: String,
    },

    // DDL
    CreateTable {
        name: String,
    },
    AlterTable {
        table: String,
    },
    AlterTableAction {
        action: String,
    },
    ColumnDef {
        name: String,
    },
    DataType {
        name: String,
        args: Option<String>,
    },
    ColumnAttribute {
        attribute: String,
    },
    ComputedColumn {
        persisted: bool,
    },
    Constraint {
        name: Option<String>,
        kind: ConstraintKind,
        clustered: Option<bool>,
        options: Vec<String>,
    },
    TableOption {
        option: String,
    },
    CreateView {
        name: String,
        verb: RoutineVerb,
        options: Vec<String>,
        check_option: bool,
    },
    CreateProcedure {
        name: String,
        verb: RoutineVerb,
        options: Vec<String>,
        number: Option<u32>,
    },
    Parameter {
        name: String,
        output: bool,
        readonly: bool,
        has_default: bool,
    },
    CreateFunction {
        name: String,
        verb: RoutineVerb,
        kind: FunctionKind,
        options: Vec<String>,
    },
    ReturnTable {
        variable: String,
    },
    CreateTrigger {
        name: String,
        verb: RoutineVerb,
        target: String,
        scope: TriggerScope,
        timing: String,
        events: Vec<String>,
        options: Vec<String>,
    },
    CreateIndex {
        name: String,
        table: String,
        unique: bool,
        clustered: Option<bool>,
        kind: Option<String>,
        included: bool,
        filtered: bool,
        options: Vec<String>,
    },
    CreateType {
        name: String,
        base: Option<String>,
        table: bool,
    },
    CreateOther {
        object_kind: String,
        name: String,
    },
    Drop {
        object_kind: String,
        names: Vec<String>,
        if_exists: bool,
    },

    // Procedural
    Declare,
    VariableDecl {
        name: String,
    },
    TableVariableDecl {
        name: String,
    },
    CursorDecl {
        name: String,
        options: Vec<String>,
    },
    SetOption {
        options: Vec<String>,
        value: String,
    },
    If,
    While,
    Break,
    Continue,
    Goto {
        label: String,
    },
    Label {
        name: String,
    },
    Return,
    WaitFor {
        kind: String,
    },
    Transaction {
        action: String,
        name: Option<String>,
    },
    Execute {
        procedure: Option<String>,
        options: Vec<String>,
    },
    ExecArg {
        name: Option<String>,
        output: bool,
    },
    Print,
    Raiserror {
        options: Vec<String>,
    },
    Throw,
    CursorOp {
        op: String,
        cursor: String,
        orientation: Option<String>,
    },
    Use {
        database: String,
    },
    Permission {
        action: String,
    },
    OtherStatement {
        keywords: String,
    },
    Unparsed {
        message: String,
    },

    // Expressions
    Literal {
        kind: LiteralKind,
    },
    Identifier {
        name: String,
        quote: Option<char>,
    },
    Variable {
        name: String,
    },
    SystemVariable {
        name: String,
    },
    FunctionCall {
        name: String,
    },
    Over {
        ordered: bool,
        frame: Option<String>,
    },
    BinaryOp {
        op: String,
    },
    UnaryOp {
        op: String,
    },
    Comparison {
        op: String,
    },
    Logical {
        op: String,
    },
    Not,
    InList {
        negated: bool,
    },
    InSubquery {
        negated: bool,
    },
    Between {
        negated: bool,
    },
    Like {
        negated: bool,
    },
    IsNull {
        negated: bool,
    },
    Exists,
    Case,
    Collate {
        collation: String,
    },
    NextValueFor {
        sequence: String,
    },
}

impl NodeKind {
    /// Whether this node is a statement (a direct child of a batch, block or
    /// control-flow construct).
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::Block { .. }
                | NodeKind::Query
                | NodeKind::Insert { .. }
                | NodeKind::Update { .. }
                | NodeKind::Delete { .. }
                | NodeKind::Merge { .. }
                | NodeKind::Truncate { .. }
                | NodeKind::CreateTable { .. }
                | NodeKind::AlterTable { .. }
                | NodeKind::CreateView { .. }
                | NodeKind::CreateProcedure { .. }
                | NodeKind::CreateFunction { .. }
                | NodeKind::CreateTrigger { .. }
                | NodeKind::CreateIndex { .. }
                | NodeKind::CreateType { .. }
                | NodeKind::CreateOther { .. }
                | NodeKind::Drop { .. }
                | NodeKind::Declare
                | NodeKind::SetOption { .. }
                | NodeKind::VariableAssignment { .. }
                | NodeKind::If
                | NodeKind::While
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Goto { .. }
                | NodeKind::Label { .. }
                | NodeKind::Return
                | NodeKind::WaitFor { .. }
                | NodeKind::Transaction { .. }
                | NodeKind::Execute { .. }
                | NodeKind::Print
                | NodeKind::Raiserror { .. }
                | NodeKind::Throw
                | NodeKind::CursorOp { .. }
                | NodeKind::Use { .. }
                | NodeKind::Permission { .. }
                | NodeKind::OtherStatement { .. }
                | NodeKind::Unparsed { .. }
        )
    }

    /// Whether this node is a stored-routine definition (procedure, function
    /// or trigger), i.e. a body in which session settings have no effect.
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            NodeKind::CreateProcedure { .. }
                | NodeKind::CreateFunction { .. }
                | NodeKind::CreateTrigger { .. }
        )
    }
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// 1-based line within the batch of the node's first token.
    pub line: usize,
    /// Range of significant-token indices covered by this node.
    pub(crate) span: Range<usize>,
}

/// A parsed batch.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    tokens: Vec<TokenWithSpan>,
    significant: Vec<usize>,
    nodes: Vec<SyntaxNode>,
    root: NodeId,
}

impl SyntaxTree {
    /// Assembles a tree from nodes built bottom-up; parent links are derived
    /// from the children lists.
    pub(crate) fn assemble(
        tokens: Vec<TokenWithSpan>,
        significant: Vec<usize>,
        mut nodes: Vec<SyntaxNode>,
        root: NodeId,
    ) -> Self {
        for index in 0..nodes.len() {
            let children = nodes[index].children.clone();
            for child in children {
                nodes[child.index()].parent = Some(NodeId::from_index(index));
            }
        }
        nodes[root.index()].parent = None;
        Self {
            tokens,
            significant,
            nodes,
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.nodes[id.index()].line
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.index()].children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    /// First child whose kind satisfies `pred`.
    pub fn find_child(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| pred(self.kind(*c)))
    }

    /// Walks up the parent chain, nearest ancestor first.
    ///
    /// The walk ends at the batch root, which is the only node without a parent.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
            remaining: self.nodes.len(),
        }
    }

    /// Nearest ancestor satisfying `pred`.
    pub fn enclosing(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|a| pred(self.kind(*a)))
    }

    /// Whether `id` lies lexically inside a construct satisfying `pred`.
    pub fn is_inside(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> bool {
        self.enclosing(id, pred).is_some()
    }

    /// Depth-first, pre-order list of every node below (and including) `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            for child in self.children(next).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// The statement-level ancestor of `id` that is a direct child of the
    /// batch root (or `id` itself when it already is one).
    pub fn top_level_statement(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.parent(current) {
                Some(parent) if parent == self.root => return Some(current),
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Source text of the node, including inner whitespace and comments.
    pub fn text(&self, id: NodeId) -> String {
        let span = &self.nodes[id.index()].span;
        if span.start >= span.end || span.start >= self.significant.len() {
            return String::new();
        }
        let first = self.significant[span.start];
        let last = self.significant[(span.end - 1).min(self.significant.len() - 1)];
        self.tokens[first..=last]
            .iter()
            .map(|t| token_source_text(&t.token))
            .collect()
    }
}

/// Iterator returned by [`SyntaxTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        // A well-formed tree is acyclic; `remaining` caps the walk regardless.
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        self.next = if current == self.tree.root {
            None
        } else {
            self.tree.parent(current)
        };
        Some(current)
    }
}
