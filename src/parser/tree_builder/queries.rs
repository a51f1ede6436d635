//! SELECT, set operations, CTEs, FROM clauses and the DML statements.

use sqlparser::tokenizer::Token;

use super::{TreeBuilder, STATEMENT_KEYWORDS};
use crate::parser::syntax::{JoinKind, NodeId, NodeKind, SetOperator};
use crate::util::is_one_of_ci;

/// Words that can never be a bare (AS-less) alias.
const ALIAS_STOP_WORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "UNION", "EXCEPT", "INTERSECT", "INTO",
    "OPTION", "FOR", "ON", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "APPLY",
    "PIVOT", "UNPIVOT", "WITH", "AS", "USING", "WHEN", "THEN", "OUTPUT", "VALUES", "TABLESAMPLE",
    "COLLATE", "OFFSET", "FETCH", "LOOP", "HASH", "REMOTE", "DEFAULT", "AND", "OR", "NOT", "IS",
    "IN", "LIKE", "BETWEEN", "ASC", "DESC", "CASE", "NULL",
];

/// Hints that may appear in the legacy `FROM t (NOLOCK)` form.
const LEGACY_TABLE_HINTS: &[&str] = &[
    "NOLOCK", "READUNCOMMITTED", "UPDLOCK", "HOLDLOCK", "ROWLOCK", "PAGLOCK", "TABLOCK",
    "TABLOCKX", "XLOCK", "READPAST", "NOWAIT", "INDEX", "READCOMMITTED", "REPEATABLEREAD",
    "SERIALIZABLE", "FASTFIRSTROW", "NOEXPAND",
];

impl TreeBuilder {
    fn start_of(&self, id: NodeId) -> usize {
        self.nodes[id.index()].span.start
    }

    fn at_query_start(&self, offset: usize) -> bool {
        self.p.peek_word_ci(offset, "SELECT") || self.p.peek_word_ci(offset, "WITH")
    }

    pub(super) fn parse_query_statement(&mut self) -> NodeId {
        if self.p.check_token(&Token::LParen) && !self.paren_starts_query() {
            return self.parse_other_statement();
        }
        self.parse_query()
    }

    /// Whether the `(` at the current position opens a query, possibly
    /// behind further parentheses.
    fn paren_starts_query(&self) -> bool {
        let mut offset = 0;
        while self.p.peek_token(offset, &Token::LParen) {
            offset += 1;
        }
        offset > 0 && self.at_query_start(offset)
    }

    /// A complete query: optional CTEs, the query expression and its
    /// trailing ORDER BY / FOR / OPTION clauses.
    pub(crate) fn parse_query(&mut self) -> NodeId {
        let start = self.p.pos();
        let mut children = Vec::new();
        if self.p.check_word_ci("WITH") {
            if let Some(with) = self.parse_with_clause() {
                children.push(with);
            }
        }
        children.push(self.parse_query_expression());
        self.parse_query_tail(&mut children);
        self.push(NodeKind::Query, start, children)
    }

    /// `WITH name [(cols)] AS (query), ...`. Returns `None` (without
    /// restoring the position) when the text is not a CTE list.
    pub(super) fn parse_with_clause(&mut self) -> Option<NodeId> {
        let start = self.p.pos();
        if !self.p.eat_word_ci("WITH") {
            return None;
        }
        let mut ctes = Vec::new();
        loop {
            let cte_start = self.p.pos();
            if self.p.check_word_ci("XMLNAMESPACES") {
                self.p.advance();
                self.p.skip_parenthesized();
            } else {
                let name = self.p.parse_identifier()?;
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                if !self.p.eat_word_ci("AS") || !self.p.eat_token(&Token::LParen) {
                    return None;
                }
                let query = self.parse_query();
                self.p.eat_token(&Token::RParen);
                ctes.push(self.push(NodeKind::Cte { name }, cte_start, vec![query]));
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        Some(self.push(NodeKind::WithClause, start, ctes))
    }

    /// Query terms joined by UNION / EXCEPT / INTERSECT, left-associative.
    pub(super) fn parse_query_expression(&mut self) -> NodeId {
        let mut left = self.parse_query_term();
        loop {
            let operator = if self.p.eat_words_ci(&["UNION", "ALL"]) {
                SetOperator::UnionAll
            } else if self.p.eat_word_ci("UNION") {
                SetOperator::Union
            } else if self.p.eat_word_ci("EXCEPT") {
                SetOperator::Except
            } else if self.p.eat_word_ci("INTERSECT") {
                SetOperator::Intersect
            } else {
                break;
            };
            let right = self.parse_query_term();
            let start = self.start_of(left);
            left = self.push(NodeKind::SetOperation { operator }, start, vec![left, right]);
        }
        left
    }

    fn parse_query_term(&mut self) -> NodeId {
        if self.p.check_token(&Token::LParen) {
            self.p.advance();
            let inner = self.parse_query();
            self.p.eat_token(&Token::RParen);
            return inner;
        }
        if self.p.check_word_ci("SELECT") {
            return self.parse_query_spec();
        }
        self.parse_other_statement()
    }

    pub(super) fn parse_query_tail(&mut self, children: &mut Vec<NodeId>) {
        if self.p.check_words_ci(&["ORDER", "BY"]) {
            children.push(self.parse_order_by());
        }
        if self.p.check_word_ci("FOR")
            && (self.p.peek_word_ci(1, "XML")
                || self.p.peek_word_ci(1, "JSON")
                || self.p.peek_word_ci(1, "BROWSE"))
        {
            children.push(self.parse_for_clause());
        }
        if self.p.check_word_ci("OPTION") && self.p.peek_token(1, &Token::LParen) {
            children.push(self.parse_option_clause());
        }
    }

    fn parse_query_spec(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut distinct = false;
        if self.p.eat_word_ci("DISTINCT") {
            distinct = true;
        } else {
            self.p.eat_word_ci("ALL");
        }

        let mut children = Vec::new();
        if self.p.check_word_ci("TOP") {
            children.push(self.parse_top());
        }
        loop {
            children.push(self.parse_select_item());
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        if self.p.check_word_ci("INTO") {
            let into_start = self.p.pos();
            self.p.advance();
            let target = self.p.parse_multipart_name().unwrap_or_default();
            children.push(self.push(NodeKind::Into { target }, into_start, Vec::new()));
        }
        if self.p.check_word_ci("FROM") {
            children.push(self.parse_from());
        }
        if self.p.check_word_ci("WHERE") {
            children.push(self.parse_where());
        }
        if self.p.check_words_ci(&["GROUP", "BY"]) {
            children.push(self.parse_group_by());
        }
        if self.p.check_word_ci("HAVING") {
            let having_start = self.p.pos();
            self.p.advance();
            let condition = self.parse_expr();
            children.push(self.push(NodeKind::Having, having_start, vec![condition]));
        }
        self.push(NodeKind::QuerySpec { distinct }, start, children)
    }

    pub(super) fn parse_top(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if self.p.eat_token(&Token::LParen) {
            children.push(self.parse_expr());
            self.p.eat_token(&Token::RParen);
        } else {
            children.push(self.parse_primary());
        }
        let percent = self.p.eat_word_ci("PERCENT");
        let with_ties = self.p.eat_words_ci(&["WITH", "TIES"]);
        self.push(NodeKind::Top { percent, with_ties }, start, children)
    }

    pub(super) fn parse_select_item(&mut self) -> NodeId {
        let start = self.p.pos();

        if self.p.check_token(&Token::Mul) {
            self.p.advance();
            return self.push(NodeKind::Star, start, Vec::new());
        }

        // @v = expr, @v += expr
        if let Some(variable) = self.current_variable() {
            if let Some((operator, width)) = self.assignment_operator_at(1) {
                self.p.advance();
                for _ in 0..width {
                    self.p.advance();
                }
                let value = self.parse_expr();
                return self.push(
                    NodeKind::VariableAssignment { variable, operator },
                    start,
                    vec![value],
                );
            }
        }

        // alias = expr
        if matches!(self.p.current(), Some(Token::Word(_))) && self.p.peek_token(1, &Token::Eq) {
            let alias = self.p.parse_identifier();
            self.p.advance();
            let value = self.parse_expr();
            return self.push(NodeKind::SelectItem { alias }, start, vec![value]);
        }

        let value = self.parse_expr();
        let alias = self.parse_column_alias();
        self.push(NodeKind::SelectItem { alias }, start, vec![value])
    }

    /// The variable name at the current position, if any (not `@@`).
    pub(super) fn current_variable(&self) -> Option<String> {
        match self.p.current() {
            Some(Token::Word(w))
                if w.quote_style.is_none() && w.value.starts_with('@') && !w.value.starts_with("@@") =>
            {
                Some(w.value.clone())
            }
            _ => None,
        }
    }

    fn parse_column_alias(&mut self) -> Option<String> {
        if self.p.eat_word_ci("AS") {
            return match self.p.current() {
                Some(Token::SingleQuotedString(s)) | Some(Token::NationalStringLiteral(s)) => {
                    let alias = s.clone();
                    self.p.advance();
                    Some(alias)
                }
                _ => self.p.parse_identifier(),
            };
        }
        match self.p.current() {
            Some(Token::SingleQuotedString(s)) => {
                let alias = s.clone();
                self.p.advance();
                Some(alias)
            }
            Some(Token::Word(w)) if w.quote_style.is_some() => self.p.parse_identifier(),
            Some(Token::Word(w))
                if !w.value.starts_with('@')
                    && !is_one_of_ci(&w.value, ALIAS_STOP_WORDS)
                    && !is_one_of_ci(&w.value, STATEMENT_KEYWORDS) =>
            {
                self.p.parse_identifier()
            }
            _ => None,
        }
    }

    fn parse_table_alias(&mut self) -> Option<String> {
        if self.p.eat_word_ci("AS") {
            return self.p.parse_identifier();
        }
        match self.p.current() {
            Some(Token::Word(w)) if w.quote_style.is_some() => self.p.parse_identifier(),
            Some(Token::Word(w))
                if !w.value.starts_with('@')
                    && !is_one_of_ci(&w.value, ALIAS_STOP_WORDS)
                    && !is_one_of_ci(&w.value, STATEMENT_KEYWORDS) =>
            {
                self.p.parse_identifier()
            }
            _ => None,
        }
    }

    pub(super) fn parse_from(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut sources = Vec::new();
        loop {
            sources.push(self.parse_table_source());
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        self.push(NodeKind::From, start, sources)
    }

    /// A table source with any joins chained onto it.
    pub(super) fn parse_table_source(&mut self) -> NodeId {
        let mut left = self.parse_table_primary();
        while let Some((kind, hint)) = self.parse_join_keyword() {
            let right = self.parse_table_primary();
            let mut children = vec![left, right];
            if matches!(
                kind,
                JoinKind::Inner | JoinKind::LeftOuter | JoinKind::RightOuter | JoinKind::FullOuter
            ) && self.p.eat_word_ci("ON")
            {
                children.push(self.parse_expr());
            }
            let start = self.start_of(left);
            left = self.push(NodeKind::Join { kind, hint }, start, children);
        }
        left
    }

    fn parse_join_keyword(&mut self) -> Option<(JoinKind, Option<String>)> {
        let checkpoint = self.p.pos();
        if self.p.eat_words_ci(&["CROSS", "JOIN"]) {
            return Some((JoinKind::Cross, None));
        }
        if self.p.eat_words_ci(&["CROSS", "APPLY"]) {
            return Some((JoinKind::CrossApply, None));
        }
        if self.p.eat_words_ci(&["OUTER", "APPLY"]) {
            return Some((JoinKind::OuterApply, None));
        }

        let kind = if self.p.eat_word_ci("INNER") {
            JoinKind::Inner
        } else if self.p.eat_word_ci("LEFT") {
            self.p.eat_word_ci("OUTER");
            JoinKind::LeftOuter
        } else if self.p.eat_word_ci("RIGHT") {
            self.p.eat_word_ci("OUTER");
            JoinKind::RightOuter
        } else if self.p.eat_word_ci("FULL") {
            self.p.eat_word_ci("OUTER");
            JoinKind::FullOuter
        } else {
            JoinKind::Inner
        };
        let hint = if self.p.check_any_word_ci(&["LOOP", "HASH", "MERGE", "REMOTE"])
            && self.p.peek_word_ci(1, "JOIN")
        {
            self.p.take_keyword()
        } else {
            None
        };
        if self.p.eat_word_ci("JOIN") {
            return Some((kind, hint));
        }
        self.p.set_pos(checkpoint);
        None
    }

    fn parse_table_primary(&mut self) -> NodeId {
        let start = self.p.pos();
        let source = if self.p.check_token(&Token::LParen) {
            if self.at_query_start(1) || self.paren_starts_query() {
                self.p.advance();
                let query = self.parse_query();
                self.p.eat_token(&Token::RParen);
                let alias = self.parse_table_alias();
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                self.push(NodeKind::DerivedTable { alias }, start, vec![query])
            } else if self.p.peek_word_ci(1, "VALUES") {
                self.p.advance();
                let values = self.parse_values();
                self.p.eat_token(&Token::RParen);
                let alias = self.parse_table_alias();
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                self.push(NodeKind::DerivedTable { alias }, start, vec![values])
            } else {
                self.p.advance();
                let inner = self.parse_table_source();
                self.p.eat_token(&Token::RParen);
                inner
            }
        } else if let Some(name) = self.p.parse_multipart_name() {
            if self.p.check_token(&Token::LParen) && !self.legacy_hint_follows() {
                let args = self.parse_paren_expr_list();
                let alias = self.parse_table_alias();
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                self.push(NodeKind::TableFunction { name, alias }, start, args)
            } else {
                let mut hints = Vec::new();
                if self.p.check_token(&Token::LParen) {
                    hints.extend(self.parse_hint_list());
                }
                if self.p.check_words_ci(&["FOR", "SYSTEM_TIME"]) {
                    hints.push(self.parse_temporal_clause());
                }
                let alias = self.parse_table_alias();
                if self.p.check_word_ci("TABLESAMPLE") {
                    let hint_start = self.p.pos();
                    self.p.advance();
                    self.p.eat_word_ci("SYSTEM");
                    self.p.skip_parenthesized();
                    if self.p.eat_word_ci("REPEATABLE") {
                        self.p.skip_parenthesized();
                    }
                    hints.push(self.push(
                        NodeKind::TableHint {
                            hint: "TABLESAMPLE".to_string(),
                        },
                        hint_start,
                        Vec::new(),
                    ));
                }
                hints.extend(self.parse_with_table_hints());
                self.push(NodeKind::TableRef { name, alias }, start, hints)
            }
        } else {
            self.parse_primary()
        };

        let mut source = source;
        while self.p.check_any_word_ci(&["PIVOT", "UNPIVOT"]) {
            let unpivot = self.p.check_word_ci("UNPIVOT");
            self.p.advance();
            self.p.skip_parenthesized();
            self.parse_table_alias();
            source = self.push(NodeKind::Pivot { unpivot }, start, vec![source]);
        }
        source
    }

    fn legacy_hint_follows(&self) -> bool {
        self.p.check_token(&Token::LParen)
            && self.p.peek_keyword(1).is_some_and(|w| is_one_of_ci(w, LEGACY_TABLE_HINTS))
            && (self.p.peek_token(2, &Token::RParen)
                || self.p.peek_token(2, &Token::Comma)
                || self.p.peek_token(2, &Token::LParen))
    }

    /// `WITH (hint, ...)` after a table name. Empty when absent.
    pub(super) fn parse_with_table_hints(&mut self) -> Vec<NodeId> {
        if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
            self.p.advance();
            return self.parse_hint_list();
        }
        Vec::new()
    }

    /// `(hint, hint(...), hint = value)`; one node per hint.
    fn parse_hint_list(&mut self) -> Vec<NodeId> {
        let mut hints = Vec::new();
        if !self.p.eat_token(&Token::LParen) {
            return hints;
        }
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let start = self.p.pos();
            let hint = self
                .p
                .take_keyword()
                .unwrap_or_else(|| self.p.current_text().to_ascii_uppercase());
            if self.p.pos() == start {
                self.p.advance();
            }
            while !self.p.is_at_end()
                && !self.p.check_token(&Token::Comma)
                && !self.p.check_token(&Token::RParen)
            {
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                } else {
                    self.p.advance();
                }
            }
            hints.push(self.push(NodeKind::TableHint { hint }, start, Vec::new()));
            self.p.eat_token(&Token::Comma);
        }
        self.p.eat_token(&Token::RParen);
        hints
    }

    fn parse_temporal_clause(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        if self.p.eat_words_ci(&["AS", "OF"]) {
            self.parse_additive();
        } else if self.p.eat_word_ci("FROM") {
            self.parse_additive();
            self.p.eat_word_ci("TO");
            self.parse_additive();
        } else if self.p.eat_word_ci("BETWEEN") {
            self.parse_additive();
            self.p.eat_word_ci("AND");
            self.parse_additive();
        } else if self.p.eat_words_ci(&["CONTAINED", "IN"]) {
            self.p.skip_parenthesized();
        } else {
            self.p.eat_word_ci("ALL");
        }
        self.push(
            NodeKind::TableHint {
                hint: "FOR SYSTEM_TIME".to_string(),
            },
            start,
            Vec::new(),
        )
    }

    pub(super) fn parse_where(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        if self.p.check_words_ci(&["CURRENT", "OF"]) {
            let op_start = self.p.pos();
            self.p.advance();
            self.p.advance();
            self.p.eat_word_ci("GLOBAL");
            let cursor = self.p.parse_identifier().unwrap_or_default();
            let current_of = self.push(
                NodeKind::CursorOp {
                    op: "CURRENT OF".to_string(),
                    cursor,
                    orientation: None,
                },
                op_start,
                Vec::new(),
            );
            return self.push(NodeKind::Where, start, vec![current_of]);
        }
        let condition = self.parse_expr();
        self.push(NodeKind::Where, start, vec![condition])
    }

    fn parse_group_by(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let mut modifier = None;
        if self.p.eat_word_ci("ALL") {
            modifier = Some("ALL".to_string());
        }
        let mut children = Vec::new();
        loop {
            if self.p.check_any_word_ci(&["ROLLUP", "CUBE"]) && self.p.peek_token(1, &Token::LParen) {
                modifier = self.p.take_keyword();
                children.extend(self.parse_paren_expr_list());
            } else if self.p.check_words_ci(&["GROUPING", "SETS"]) {
                self.p.advance();
                self.p.advance();
                self.p.skip_parenthesized();
                modifier = Some("GROUPING SETS".to_string());
            } else {
                children.push(self.parse_expr());
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        if self.p.check_word_ci("WITH") && self.p.check_any_word_ci_at(1, &["ROLLUP", "CUBE"]) {
            self.p.advance();
            let word = self.p.take_keyword().unwrap_or_default();
            modifier = Some(format!("WITH {word}"));
        }
        self.push(NodeKind::GroupBy { modifier }, start, children)
    }

    pub(super) fn parse_order_by(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let mut children = self.parse_order_items();
        let mut offset_fetch = false;
        if self.p.check_word_ci("OFFSET") {
            offset_fetch = true;
            self.p.advance();
            children.push(self.parse_expr());
            self.p.eat_word_ci("ROWS");
            self.p.eat_word_ci("ROW");
            if self.p.eat_word_ci("FETCH") {
                self.p.eat_word_ci("NEXT");
                self.p.eat_word_ci("FIRST");
                children.push(self.parse_expr());
                self.p.eat_word_ci("ROWS");
                self.p.eat_word_ci("ROW");
                self.p.eat_word_ci("ONLY");
            }
        }
        self.push(NodeKind::OrderBy { offset_fetch }, start, children)
    }

    pub(super) fn parse_order_items(&mut self) -> Vec<NodeId> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expr());
            if !self.p.eat_word_ci("ASC") {
                self.p.eat_word_ci("DESC");
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        items
    }

    fn parse_for_clause(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let kind = self.p.take_keyword().unwrap_or_default();
        let mode = match self.p.peek_keyword(0) {
            Some(w) if kind != "BROWSE" && !w.eq_ignore_ascii_case("OPTION") => {
                let mode = format!("{kind} {}", w.to_ascii_uppercase());
                self.p.advance();
                mode
            }
            _ => kind,
        };
        if self.p.check_token(&Token::LParen) {
            self.p.skip_parenthesized();
        }
        while self.p.eat_token(&Token::Comma) {
            while !self.at_statement_end()
                && !self.p.check_token(&Token::Comma)
                && !self.p.check_token(&Token::RParen)
                && !self.p.check_word_ci("OPTION")
            {
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                } else {
                    self.p.advance();
                }
            }
        }
        self.push(NodeKind::ForClause { mode }, start, Vec::new())
    }

    pub(super) fn parse_option_clause(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let mut hints = Vec::new();
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let hint_start = self.p.pos();
            let mut words = Vec::new();
            while let Some(word) = self.p.peek_keyword(0) {
                if word.starts_with('@') {
                    break;
                }
                words.push(word.to_ascii_uppercase());
                self.p.advance();
            }
            while !self.p.is_at_end()
                && !self.p.check_token(&Token::Comma)
                && !self.p.check_token(&Token::RParen)
            {
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                } else {
                    self.p.advance();
                }
            }
            let hint = if words.is_empty() {
                self.p.text_between(hint_start, self.p.pos()).to_ascii_uppercase()
            } else {
                words.join(" ")
            };
            hints.push(self.push(NodeKind::QueryHint { hint }, hint_start, Vec::new()));
            self.p.eat_token(&Token::Comma);
        }
        self.p.eat_token(&Token::RParen);
        self.push(NodeKind::OptionClause, start, hints)
    }

    /// `VALUES (...), (...)`; all row expressions become children.
    pub(super) fn parse_values(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        let mut rows = 0;
        while self.p.check_token(&Token::LParen) {
            children.extend(self.parse_paren_expr_list());
            rows += 1;
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        self.push(NodeKind::Values { rows }, start, children)
    }

    pub(super) fn parse_output(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        loop {
            children.push(self.parse_select_item());
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        let mut into = None;
        if self.p.eat_word_ci("INTO") {
            into = self.p.parse_multipart_name();
            if self.p.check_token(&Token::LParen) {
                self.p.skip_parenthesized();
            }
        }
        self.push(NodeKind::Output { into }, start, children)
    }

    fn parse_outputs(&mut self, children: &mut Vec<NodeId>) {
        while self.p.check_word_ci("OUTPUT") {
            children.push(self.parse_output());
        }
    }

    /// DML target: a name, optionally a rowset function such as OPENQUERY.
    fn parse_dml_target(&mut self) -> String {
        let name = self.p.parse_multipart_name().unwrap_or_default();
        if self.p.check_token(&Token::LParen) && !self.p.peek_word_ci(1, "SELECT") {
            let start = self.p.pos();
            self.p.skip_parenthesized();
            return format!("{name}{}", self.p.text_between(start, self.p.pos()));
        }
        name
    }

    pub(super) fn parse_insert(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if self.p.check_word_ci("TOP") {
            children.push(self.parse_top());
        }
        self.p.eat_word_ci("INTO");
        let target = self.p.parse_multipart_name().unwrap_or_default();
        let target = if self.p.check_token(&Token::LParen) && is_rowset_function(&target) {
            let args_start = self.p.pos();
            self.p.skip_parenthesized();
            format!("{target}{}", self.p.text_between(args_start, self.p.pos()))
        } else {
            target
        };
        children.extend(self.parse_with_table_hints());
        if self.p.check_token(&Token::LParen) && !self.paren_starts_query() {
            self.p.skip_parenthesized();
        }
        self.parse_outputs(&mut children);

        if self.p.check_word_ci("VALUES") {
            children.push(self.parse_values());
        } else if self.p.check_words_ci(&["DEFAULT", "VALUES"]) {
            let dv_start = self.p.pos();
            self.p.advance();
            self.p.advance();
            children.push(self.push(NodeKind::DefaultValues, dv_start, Vec::new()));
        } else if self.p.check_any_word_ci(&["EXEC", "EXECUTE"]) {
            children.push(self.parse_execute());
        } else if self.at_query_start(0) || self.p.check_token(&Token::LParen) {
            children.push(self.parse_query());
        }
        self.push(NodeKind::Insert { target }, start, children)
    }

    pub(super) fn parse_update(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if self.p.check_word_ci("TOP") {
            children.push(self.parse_top());
        }
        let target = self.parse_dml_target();
        children.extend(self.parse_with_table_hints());
        if self.p.eat_word_ci("SET") {
            loop {
                children.push(self.parse_set_assignment());
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.parse_outputs(&mut children);
        if self.p.check_word_ci("FROM") {
            children.push(self.parse_from());
        }
        if self.p.check_word_ci("WHERE") {
            children.push(self.parse_where());
        }
        if self.p.check_word_ci("OPTION") && self.p.peek_token(1, &Token::LParen) {
            children.push(self.parse_option_clause());
        }
        self.push(NodeKind::Update { target }, start, children)
    }

    /// One `SET` item of an UPDATE or a MERGE ... UPDATE action.
    fn parse_set_assignment(&mut self) -> NodeId {
        let start = self.p.pos();
        if let Some(variable) = self.current_variable() {
            if let Some((operator, width)) = self.assignment_operator_at(1) {
                self.p.advance();
                for _ in 0..width {
                    self.p.advance();
                }
                // @v = col = expr
                let value = if matches!(self.p.current(), Some(Token::Word(w)) if !w.value.starts_with('@'))
                    && self.p.peek_token(1, &Token::Eq)
                {
                    self.parse_column_assignment()
                } else {
                    self.parse_expr()
                };
                return self.push(
                    NodeKind::VariableAssignment { variable, operator },
                    start,
                    vec![value],
                );
            }
        }
        self.parse_column_assignment()
    }

    fn parse_column_assignment(&mut self) -> NodeId {
        let start = self.p.pos();
        let column = self.p.parse_multipart_name().unwrap_or_default();
        if self.p.check_token(&Token::LParen) {
            // col.WRITE(...), udt_col.Method(...)
            self.p.set_pos(start);
            let call = self.parse_expr();
            return self.push(
                NodeKind::ColumnAssignment {
                    column,
                    operator: "METHOD".to_string(),
                },
                start,
                vec![call],
            );
        }
        let (operator, width) = self
            .assignment_operator_at(0)
            .unwrap_or_else(|| ("=".to_string(), 0));
        for _ in 0..width {
            self.p.advance();
        }
        let value = self.parse_expr();
        self.push(NodeKind::ColumnAssignment { column, operator }, start, vec![value])
    }

    pub(super) fn parse_delete(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if self.p.check_word_ci("TOP") {
            children.push(self.parse_top());
        }
        self.p.eat_word_ci("FROM");
        let target = self.parse_dml_target();
        children.extend(self.parse_with_table_hints());
        self.parse_outputs(&mut children);
        if self.p.check_word_ci("FROM") {
            children.push(self.parse_from());
        }
        if self.p.check_word_ci("WHERE") {
            children.push(self.parse_where());
        }
        if self.p.check_word_ci("OPTION") && self.p.peek_token(1, &Token::LParen) {
            children.push(self.parse_option_clause());
        }
        self.push(NodeKind::Delete { target }, start, children)
    }

    pub(super) fn parse_merge(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if self.p.check_word_ci("TOP") {
            children.push(self.parse_top());
        }
        self.p.eat_word_ci("INTO");
        let target = self.p.parse_multipart_name().unwrap_or_default();
        children.extend(self.parse_with_table_hints());
        self.parse_table_alias();
        if self.p.eat_word_ci("USING") {
            children.push(self.parse_table_source());
        }
        if self.p.eat_word_ci("ON") {
            children.push(self.parse_expr());
        }
        while self.p.check_word_ci("WHEN") {
            children.push(self.parse_merge_action());
        }
        self.parse_outputs(&mut children);
        if self.p.check_word_ci("OPTION") && self.p.peek_token(1, &Token::LParen) {
            children.push(self.parse_option_clause());
        }
        self.push(NodeKind::Merge { target }, start, children)
    }

    fn parse_merge_action(&mut self) -> NodeId {
        let start = self.p.pos();
        let mut words = Vec::new();
        let mut children = Vec::new();
        while let Some(word) = self.p.take_keyword() {
            words.push(word);
            if self.p.check_word_ci("AND") {
                self.p.advance();
                children.push(self.parse_expr());
            }
            if words.last().map(String::as_str) == Some("THEN") {
                break;
            }
        }
        if self.p.check_word_ci("UPDATE") {
            self.p.advance();
            self.p.eat_word_ci("SET");
            words.push("UPDATE".to_string());
            loop {
                children.push(self.parse_set_assignment());
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        } else if self.p.eat_word_ci("DELETE") {
            words.push("DELETE".to_string());
        } else if self.p.eat_word_ci("INSERT") {
            words.push("INSERT".to_string());
            if self.p.check_token(&Token::LParen) {
                self.p.skip_parenthesized();
            }
            if self.p.check_word_ci("VALUES") {
                children.push(self.parse_values());
            } else if self.p.check_words_ci(&["DEFAULT", "VALUES"]) {
                let dv_start = self.p.pos();
                self.p.advance();
                self.p.advance();
                children.push(self.push(NodeKind::DefaultValues, dv_start, Vec::new()));
            }
        }
        self.push(
            NodeKind::MergeAction {
                action: words.join(" "),
            },
            start,
            children,
        )
    }

    pub(super) fn parse_truncate(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let table = self.p.parse_multipart_name().unwrap_or_default();
        if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
            self.p.advance();
            self.p.skip_parenthesized();
        }
        self.push(NodeKind::Truncate { table }, start, Vec::new())
    }
}

fn is_rowset_function(name: &str) -> bool {
    is_one_of_ci(name, &["OPENQUERY", "OPENROWSET", "OPENDATASOURCE", "OPENXML"])
}

#[cfg(test)]
mod tests {
    use crate::parser::syntax::{JoinKind, NodeKind, SetOperator};
    use crate::parser::tree_builder::parse_batch;

    fn kinds(sql: &str) -> Vec<NodeKind> {
        let tree = parse_batch(sql);
        tree.descendants(tree.root())
            .into_iter()
            .map(|id| tree.kind(id).clone())
            .collect()
    }

    #[test]
    fn test_select_with_top_and_order_by() {
        let k = kinds("SELECT TOP 10 PERCENT a, b AS x FROM t ORDER BY a");
        assert!(k.contains(&NodeKind::Top {
            percent: true,
            with_ties: false
        }));
        assert!(k.contains(&NodeKind::SelectItem {
            alias: Some("x".to_string())
        }));
        assert!(k.contains(&NodeKind::OrderBy {
            offset_fetch: false
        }));
    }

    #[test]
    fn test_union_all() {
        let k = kinds("SELECT 1 UNION ALL SELECT 2");
        assert!(k.contains(&NodeKind::SetOperation {
            operator: SetOperator::UnionAll
        }));
        assert_eq!(
            k.iter().filter(|k| matches!(k, NodeKind::QuerySpec { .. })).count(),
            2
        );
    }

    #[test]
    fn test_joins_and_hints() {
        let k = kinds(
            "SELECT * FROM a WITH (NOLOCK) LEFT OUTER HASH JOIN b ON a.id = b.id CROSS APPLY f(a.id) x",
        );
        assert!(k.contains(&NodeKind::TableHint {
            hint: "NOLOCK".to_string()
        }));
        assert!(k.contains(&NodeKind::Join {
            kind: JoinKind::LeftOuter,
            hint: Some("HASH".to_string())
        }));
        assert!(k.contains(&NodeKind::Join {
            kind: JoinKind::CrossApply,
            hint: None
        }));
        assert!(k.contains(&NodeKind::TableFunction {
            name: "f".to_string(),
            alias: Some("x".to_string())
        }));
    }

    #[test]
    fn test_legacy_table_hint() {
        let k = kinds("SELECT * FROM t (NOLOCK)");
        assert!(k.contains(&NodeKind::TableHint {
            hint: "NOLOCK".to_string()
        }));
    }

    #[test]
    fn test_cte() {
        let k = kinds("WITH c (n) AS (SELECT 1) SELECT n FROM c");
        assert!(k.contains(&NodeKind::WithClause));
        assert!(k.contains(&NodeKind::Cte {
            name: "c".to_string()
        }));
    }

    #[test]
    fn test_select_variable_assignment() {
        let k = kinds("SELECT @a = 1, @b += 2");
        assert!(k.contains(&NodeKind::VariableAssignment {
            variable: "@a".to_string(),
            operator: "=".to_string()
        }));
        assert!(k.contains(&NodeKind::VariableAssignment {
            variable: "@b".to_string(),
            operator: "+=".to_string()
        }));
    }

    #[test]
    fn test_select_into() {
        let k = kinds("SELECT a INTO #t FROM s");
        assert!(k.contains(&NodeKind::Into {
            target: "#t".to_string()
        }));
    }

    #[test]
    fn test_insert_select_and_values() {
        let k = kinds("INSERT INTO t (a) SELECT a FROM s; INSERT t VALUES (1), (2)");
        assert!(k.contains(&NodeKind::Insert {
            target: "t".to_string()
        }));
        assert!(k.contains(&NodeKind::Values { rows: 2 }));
        assert!(k.contains(&NodeKind::QuerySpec { distinct: false }));
    }

    #[test]
    fn test_update_with_from() {
        let k = kinds("UPDATE t SET a = 1, @v = b = 2 FROM t JOIN u ON t.id = u.id WHERE u.x = 1");
        assert!(k.contains(&NodeKind::ColumnAssignment {
            column: "a".to_string(),
            operator: "=".to_string()
        }));
        assert!(k.contains(&NodeKind::VariableAssignment {
            variable: "@v".to_string(),
            operator: "=".to_string()
        }));
        assert!(k.contains(&NodeKind::From));
        assert!(k.contains(&NodeKind::Where));
    }

    #[test]
    fn test_merge() {
        let k = kinds(
            "MERGE t AS tgt USING s ON tgt.id = s.id \
             WHEN MATCHED THEN UPDATE SET a = s.a \
             WHEN NOT MATCHED BY TARGET THEN INSERT (id) VALUES (s.id) \
             OUTPUT $action;",
        );
        assert!(k.contains(&NodeKind::Merge {
            target: "t".to_string()
        }));
        assert!(k.contains(&NodeKind::MergeAction {
            action: "WHEN MATCHED THEN UPDATE".to_string()
        }));
        assert!(k.contains(&NodeKind::MergeAction {
            action: "WHEN NOT MATCHED BY TARGET THEN INSERT".to_string()
        }));
    }

    #[test]
    fn test_for_xml_and_option() {
        let k = kinds("SELECT a FROM t FOR XML PATH('r'), TYPE OPTION (MAXDOP 1, RECOMPILE)");
        assert!(k.contains(&NodeKind::ForClause {
            mode: "XML PATH".to_string()
        }));
        assert!(k.contains(&NodeKind::QueryHint {
            hint: "MAXDOP".to_string()
        }));
        assert!(k.contains(&NodeKind::QueryHint {
            hint: "RECOMPILE".to_string()
        }));
    }

    #[test]
    fn test_pivot_and_derived_table() {
        let k = kinds("SELECT * FROM (SELECT a, b FROM t) s PIVOT (SUM(b) FOR a IN ([x], [y])) p");
        assert!(k.contains(&NodeKind::Pivot { unpivot: false }));
        assert!(k.contains(&NodeKind::DerivedTable {
            alias: Some("s".to_string())
        }));
    }

    #[test]
    fn test_delete_where_current_of() {
        let k = kinds("DELETE FROM t WHERE CURRENT OF c");
        assert!(k.contains(&NodeKind::CursorOp {
            op: "CURRENT OF".to_string(),
            cursor: "c".to_string(),
            orientation: None
        }));
    }
}
