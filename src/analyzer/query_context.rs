//! Query context stack
//!
//! Every `SELECT` specification gets a node with a synthetic id when the
//! traversal enters it. Attributes collect while its subtree is walked and
//! the node is classified when it is popped.

use std::collections::BTreeSet;

use crate::parser::{NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryAttribute {
    HasTop,
    HasOrderBy,
    HasFrom,
    Subquery,
    CteMember,
    DerivedTable,
    UnionArm,
    LeadingArm,
    InsertSource,
    InExists,
    IntoTemp,
    IntoGlobalTemp,
    IntoTable,
    VariableAssignment,
    Outermost,
    CursorSource,
    ViewBody,
    FunctionBody,
    ForClause,
}

#[derive(Debug, Clone)]
pub struct QueryNode {
    pub id: u32,
    pub node: NodeId,
    pub line: usize,
    pub attributes: BTreeSet<QueryAttribute>,
}

impl QueryNode {
    pub fn has(&self, attribute: QueryAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    fn has_into(&self) -> bool {
        self.has(QueryAttribute::IntoTemp)
            || self.has(QueryAttribute::IntoGlobalTemp)
            || self.has(QueryAttribute::IntoTable)
    }

    /// Statement shape reported in the `SELECT` section.
    pub fn shape(&self) -> &'static str {
        use QueryAttribute::*;
        if self.has(IntoGlobalTemp) {
            "SELECT..INTO ##tmp"
        } else if self.has(IntoTemp) {
            "SELECT..INTO #tmp"
        } else if self.has(IntoTable) {
            "SELECT..INTO table"
        } else if self.has(CteMember) {
            "SELECT in CTE"
        } else if self.has(Subquery) {
            "SELECT subquery"
        } else {
            "SELECT"
        }
    }

    /// TOP without ORDER BY. Row choice does not matter under EXISTS.
    pub fn is_top_without_order_by(&self) -> bool {
        use QueryAttribute::*;
        self.has(HasTop) && !self.has(HasOrderBy) && !self.has(InExists)
    }

    /// A result set returned to the caller in no defined order.
    ///
    /// Only the outermost query counts, and only its leading arm when it is
    /// a set operation. TOP queries are covered by the TOP rule instead.
    pub fn is_unordered_result_set(&self) -> bool {
        use QueryAttribute::*;
        self.has(Outermost)
            && !self.has(HasTop)
            && !self.has(InsertSource)
            && !self.has(InExists)
            && !self.has(VariableAssignment)
            && !self.has_into()
            && self.has(HasFrom)
            && !self.has(HasOrderBy)
            && !self.has(ForClause)
            && (!self.has(UnionArm) || self.has(LeadingArm))
    }
}

#[derive(Debug, Default)]
pub struct QueryContextStack {
    next_id: u32,
    stack: Vec<QueryNode>,
}

impl QueryContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: NodeId, line: usize, attributes: BTreeSet<QueryAttribute>) -> u32 {
        self.next_id += 1;
        self.stack.push(QueryNode {
            id: self.next_id,
            node,
            line,
            attributes,
        });
        self.next_id
    }

    /// Adds an attribute to the innermost open query.
    pub fn attribute(&mut self, attribute: QueryAttribute) {
        if let Some(top) = self.stack.last_mut() {
            top.attributes.insert(attribute);
        }
    }

    pub fn has(&self, attribute: QueryAttribute) -> bool {
        self.stack.last().is_some_and(|top| top.has(attribute))
    }

    /// Pops the innermost query if it was opened for `node`.
    pub fn pop(&mut self, node: NodeId) -> Option<QueryNode> {
        if self.stack.last().is_some_and(|top| top.node == node) {
            self.stack.pop()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// Structural attributes of the query specification `spec`, derived from
/// where it sits in the tree.
pub fn structural_attributes(tree: &SyntaxTree, spec: NodeId) -> BTreeSet<QueryAttribute> {
    use QueryAttribute::*;
    let mut attributes = BTreeSet::new();

    if tree.is_inside(spec, |k| matches!(k, NodeKind::Exists)) {
        attributes.insert(InExists);
    }

    // Climb through set operations and parenthesized queries to the node
    // that owns the whole query expression.
    let mut current = spec;
    let mut leading = true;
    let mut in_set_operation = false;
    let owner = loop {
        let Some(parent) = tree.parent(current) else {
            break None;
        };
        match tree.kind(parent) {
            NodeKind::SetOperation { .. } => {
                in_set_operation = true;
                if tree.child(parent, 0) != Some(current) {
                    leading = false;
                }
                current = parent;
            }
            NodeKind::Query => {
                // ORDER BY and FOR of a set operation cover every arm.
                for child in tree.children(parent) {
                    match tree.kind(*child) {
                        NodeKind::OrderBy { .. } => {
                            attributes.insert(HasOrderBy);
                        }
                        NodeKind::ForClause { .. } => {
                            attributes.insert(ForClause);
                        }
                        _ => {}
                    }
                }
                match tree.parent(parent).map(|p| tree.kind(p)) {
                    Some(NodeKind::SetOperation { .. }) => current = parent,
                    _ => break tree.parent(parent),
                }
            }
            _ => break Some(parent),
        }
    };

    if in_set_operation {
        attributes.insert(UnionArm);
        if leading {
            attributes.insert(LeadingArm);
        }
    }

    let Some(owner) = owner else {
        attributes.insert(Outermost);
        return attributes;
    };
    match tree.kind(owner) {
        NodeKind::Cte { .. } => {
            attributes.insert(CteMember);
        }
        NodeKind::DerivedTable { .. } => {
            attributes.insert(DerivedTable);
            attributes.insert(Subquery);
        }
        NodeKind::Exists | NodeKind::InSubquery { .. } => {
            attributes.insert(Subquery);
        }
        NodeKind::Insert { .. } => {
            attributes.insert(InsertSource);
        }
        NodeKind::CreateView { .. } => {
            attributes.insert(ViewBody);
        }
        NodeKind::CursorDecl { .. } => {
            attributes.insert(CursorSource);
        }
        NodeKind::Return | NodeKind::CreateFunction { .. } => {
            attributes.insert(FunctionBody);
        }
        NodeKind::Batch
        | NodeKind::Block { .. }
        | NodeKind::CreateProcedure { .. }
        | NodeKind::CreateTrigger { .. } => {
            attributes.insert(Outermost);
        }
        NodeKind::If | NodeKind::While => {
            // Child 0 is the condition; the rest are statements.
            let is_condition = tree
                .child(owner, 0)
                .is_some_and(|c| tree.descendants(c).contains(&spec));
            attributes.insert(if is_condition { Subquery } else { Outermost });
        }
        _ => {
            attributes.insert(Subquery);
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_batch;
    use QueryAttribute::*;

    fn specs(sql: &str) -> Vec<BTreeSet<QueryAttribute>> {
        let tree = parse_batch(sql);
        tree.descendants(tree.root())
            .into_iter()
            .filter(|id| matches!(tree.kind(*id), NodeKind::QuerySpec { .. }))
            .map(|id| structural_attributes(&tree, id))
            .collect()
    }

    #[test]
    fn test_top_level_select_is_outermost() {
        let attrs = specs("SELECT a FROM t ORDER BY a");
        assert!(attrs[0].contains(&Outermost));
        assert!(attrs[0].contains(&HasOrderBy));
    }

    #[test]
    fn test_union_arms() {
        let attrs = specs("SELECT a FROM t UNION SELECT a FROM u ORDER BY a");
        assert_eq!(attrs.len(), 2);
        assert!(attrs[0].contains(&LeadingArm));
        assert!(!attrs[1].contains(&LeadingArm));
        assert!(attrs.iter().all(|a| a.contains(&UnionArm) && a.contains(&HasOrderBy)));
    }

    #[test]
    fn test_exists_and_subqueries() {
        let attrs = specs("SELECT a FROM t WHERE EXISTS (SELECT TOP 1 b FROM u) AND a IN (SELECT c FROM v)");
        assert!(attrs[0].contains(&Outermost));
        assert!(attrs[1].contains(&InExists) && attrs[1].contains(&Subquery));
        assert!(attrs[2].contains(&Subquery) && !attrs[2].contains(&InExists));
    }

    #[test]
    fn test_cte_insert_and_derived() {
        let attrs = specs("WITH c AS (SELECT a FROM t) INSERT INTO x SELECT a FROM (SELECT a FROM c) d");
        assert!(attrs[0].contains(&CteMember));
        assert!(attrs[1].contains(&InsertSource));
        assert!(attrs[2].contains(&DerivedTable));
    }

    #[test]
    fn test_unordered_result_set_rule() {
        let mut node = QueryNode {
            id: 1,
            node: NodeId::from_index(0),
            line: 1,
            attributes: [Outermost, HasFrom].into_iter().collect(),
        };
        assert!(node.is_unordered_result_set());
        node.attributes.insert(HasTop);
        assert!(!node.is_unordered_result_set());
        assert!(node.is_top_without_order_by());
        node.attributes.insert(InExists);
        assert!(!node.is_top_without_order_by());
    }

    #[test]
    fn test_stack_pops_only_matching_node() {
        let mut stack = QueryContextStack::new();
        let a = NodeId::from_index(1);
        let b = NodeId::from_index(2);
        let first = stack.push(a, 1, BTreeSet::new());
        let second = stack.push(b, 2, BTreeSet::new());
        assert!(second > first);
        stack.attribute(HasTop);
        assert!(stack.pop(a).is_none());
        let popped = stack.pop(b).unwrap();
        assert!(popped.has(HasTop));
        assert!(!stack.has(HasTop));
        assert!(stack.pop(a).is_some());
        assert!(stack.pop(a).is_none());
    }
}
