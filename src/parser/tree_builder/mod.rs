//! Builds a [`SyntaxTree`] from one batch of T-SQL.
//!
//! A hand-written recursive-descent parser over the MsSql token stream.
//! It is deliberately forgiving: anything it does not recognize becomes an
//! [`NodeKind::OtherStatement`] spanning up to the next statement keyword,
//! and only a tokenizer failure yields [`NodeKind::Unparsed`].
//!
//! Nodes are pushed bottom-up into a flat arena; parent links are filled in
//! when the tree is assembled.

mod ddl;
mod expressions;
mod procedural;
mod queries;

use sqlparser::tokenizer::Token;

use super::syntax::{NodeId, NodeKind, SyntaxNode, SyntaxTree};
use super::token_parser_base::TokenParser;

/// Words that start a statement.
pub(crate) const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "TRUNCATE", "CREATE", "ALTER", "DROP",
    "DECLARE", "SET", "IF", "ELSE", "WHILE", "BEGIN", "END", "BREAK", "CONTINUE", "GOTO",
    "RETURN", "WAITFOR", "COMMIT", "ROLLBACK", "SAVE", "EXEC", "EXECUTE", "PRINT", "RAISERROR",
    "THROW", "OPEN", "FETCH", "CLOSE", "DEALLOCATE", "USE", "GRANT", "REVOKE", "DENY", "WITH",
    "DBCC", "BACKUP", "RESTORE", "CHECKPOINT", "KILL", "RECONFIGURE", "SHUTDOWN", "BULK",
    "ENABLE", "DISABLE", "READTEXT", "WRITETEXT", "UPDATETEXT", "SETUSER", "REVERT", "SEND",
    "RECEIVE", "GET", "MOVE",
];

/// Words that end an unrecognized statement. Narrower than
/// [`STATEMENT_KEYWORDS`]: `SET` and `WITH` routinely appear inside the
/// statements that end up here (`ALTER DATABASE ... SET`, `BACKUP ... WITH`).
const OTHER_STATEMENT_TERMINATORS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "TRUNCATE", "CREATE", "ALTER", "DROP",
    "DECLARE", "IF", "ELSE", "WHILE", "BEGIN", "END", "RETURN", "EXEC", "EXECUTE", "PRINT",
    "RAISERROR", "THROW", "USE", "GRANT", "REVOKE", "DENY", "COMMIT", "ROLLBACK", "GOTO",
];

/// Parses one batch. Never fails: a batch the tokenizer rejects becomes a
/// tree holding a single `Unparsed` node.
pub fn parse_batch(sql: &str) -> SyntaxTree {
    match TokenParser::new(sql) {
        Ok(parser) => TreeBuilder::new(parser).build(),
        Err(message) => {
            let unparsed = SyntaxNode {
                kind: NodeKind::Unparsed { message },
                parent: None,
                children: Vec::new(),
                line: 1,
                span: 0..0,
            };
            let root = SyntaxNode {
                kind: NodeKind::Batch,
                parent: None,
                children: vec![NodeId::from_index(0)],
                line: 1,
                span: 0..0,
            };
            SyntaxTree::assemble(
                Vec::new(),
                Vec::new(),
                vec![unparsed, root],
                NodeId::from_index(1),
            )
        }
    }
}

pub(crate) struct TreeBuilder {
    p: TokenParser,
    nodes: Vec<SyntaxNode>,
}

impl TreeBuilder {
    fn new(p: TokenParser) -> Self {
        Self {
            p,
            nodes: Vec::new(),
        }
    }

    fn build(mut self) -> SyntaxTree {
        let mut statements = Vec::new();
        while !self.p.is_at_end() {
            if self.p.eat_token(&Token::SemiColon) {
                continue;
            }
            statements.push(self.parse_statement());
        }
        let root = self.push(NodeKind::Batch, 0, statements);
        if let Some(node) = self.nodes.last_mut() {
            node.span = 0..self.p.len();
        }
        let (tokens, significant) = self.p.into_parts();
        SyntaxTree::assemble(tokens, significant, self.nodes, root)
    }

    /// Records a node spanning from `start` to the current position.
    fn push(&mut self, kind: NodeKind, start: usize, children: Vec<NodeId>) -> NodeId {
        let end = self.p.pos().max(start);
        let line = self.p.line_at(start);
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(SyntaxNode {
            kind,
            parent: None,
            children,
            line,
            span: start..end,
        });
        id
    }

    /// Extends a node's span to the current position (used after trailing
    /// clauses are attached to an already-built node).
    fn extend_to_here(&mut self, id: NodeId) {
        let end = self.p.pos();
        let node = &mut self.nodes[id.index()];
        if end > node.span.end {
            node.span.end = end;
        }
    }

    fn prepend_child(&mut self, id: NodeId, child: NodeId) {
        let start = self.nodes[child.index()].span.start;
        let line = self.nodes[child.index()].line;
        let node = &mut self.nodes[id.index()];
        node.children.insert(0, child);
        if start < node.span.start {
            node.span.start = start;
            node.line = line;
        }
    }

    fn kind_of(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub(crate) fn is_statement_keyword(&self) -> bool {
        self.p.check_any_word_ci(STATEMENT_KEYWORDS)
    }

    /// Whether the current position ends a statement: end of input, `;`, or
    /// the start of the next statement.
    fn at_statement_end(&self) -> bool {
        self.p.is_at_end() || self.p.check_token(&Token::SemiColon) || self.is_statement_keyword()
    }

    /// Parses statements until `END` (not consumed) or end of input.
    fn parse_statement_list(&mut self) -> Vec<NodeId> {
        let mut statements = Vec::new();
        loop {
            while self.p.eat_token(&Token::SemiColon) {}
            if self.p.is_at_end() || self.at_block_end() {
                break;
            }
            statements.push(self.parse_statement());
        }
        statements
    }

    fn at_block_end(&self) -> bool {
        self.p.check_word_ci("END")
            && !self.p.peek_word_ci(1, "CONVERSATION")
    }

    /// Parses one statement; always consumes at least one token.
    pub(crate) fn parse_statement(&mut self) -> NodeId {
        let start = self.p.pos();
        let node = self.parse_statement_inner();
        if self.p.pos() == start {
            self.p.advance();
            let keywords = self.p.text_between(start, start + 1).to_ascii_uppercase();
            return self.push(NodeKind::OtherStatement { keywords }, start, Vec::new());
        }
        node
    }

    fn parse_statement_inner(&mut self) -> NodeId {
        let start = self.p.pos();

        // Label
        if matches!(self.p.current(), Some(Token::Word(w)) if !w.value.starts_with('@'))
            && self.p.peek_token(1, &Token::Colon)
            && !self.is_statement_keyword()
        {
            let name = self.p.parse_identifier().unwrap_or_default();
            self.p.advance();
            return self.push(NodeKind::Label { name }, start, Vec::new());
        }

        if self.p.check_token(&Token::LParen) {
            return self.parse_query_statement();
        }

        let Some(keyword) = self.p.peek_keyword(0).map(str::to_ascii_uppercase) else {
            return self.parse_other_statement();
        };

        match keyword.as_str() {
            "SELECT" => self.parse_query_statement(),
            "WITH" => self.parse_with_statement(),
            "INSERT" => self.parse_insert(),
            "UPDATE" => self.parse_update(),
            "DELETE" => self.parse_delete(),
            "MERGE" => self.parse_merge(),
            "TRUNCATE" if self.p.peek_word_ci(1, "TABLE") => self.parse_truncate(),
            "CREATE" | "ALTER" => self.parse_create_or_alter(),
            "DROP" => self.parse_drop(),
            "DECLARE" => self.parse_declare(),
            "SET" => self.parse_set(),
            "IF" => self.parse_if(),
            "WHILE" => self.parse_while(),
            "BEGIN" => self.parse_begin(),
            "BREAK" => {
                self.p.advance();
                self.push(NodeKind::Break, start, Vec::new())
            }
            "CONTINUE" => {
                self.p.advance();
                self.push(NodeKind::Continue, start, Vec::new())
            }
            "GOTO" => {
                self.p.advance();
                let label = self.p.parse_identifier().unwrap_or_default();
                self.push(NodeKind::Goto { label }, start, Vec::new())
            }
            "RETURN" => self.parse_return(false),
            "WAITFOR" => self.parse_waitfor(),
            "COMMIT" | "ROLLBACK" | "SAVE" => self.parse_transaction_end(),
            "EXEC" | "EXECUTE" => self.parse_execute(),
            "PRINT" => self.parse_print(),
            "RAISERROR" => self.parse_raiserror(),
            "THROW" => self.parse_throw(),
            "OPEN" | "CLOSE" | "DEALLOCATE" | "FETCH" => self.parse_cursor_op(),
            "USE" => {
                self.p.advance();
                let database = self.p.parse_identifier().unwrap_or_default();
                self.push(NodeKind::Use { database }, start, Vec::new())
            }
            "GRANT" | "REVOKE" | "DENY" => self.parse_permission(),
            _ => self.parse_other_statement(),
        }
    }

    /// `WITH cte AS (...)` followed by SELECT, INSERT, UPDATE, DELETE or MERGE.
    fn parse_with_statement(&mut self) -> NodeId {
        let checkpoint = self.p.pos();
        let Some(with) = self.parse_with_clause() else {
            self.p.set_pos(checkpoint);
            return self.parse_other_statement();
        };
        let statement = match self.p.peek_keyword(0).map(str::to_ascii_uppercase).as_deref() {
            Some("INSERT") => self.parse_insert(),
            Some("UPDATE") => self.parse_update(),
            Some("DELETE") => self.parse_delete(),
            Some("MERGE") => self.parse_merge(),
            _ => {
                let start = self.p.pos();
                let body = self.parse_query_expression();
                let mut children = vec![body];
                self.parse_query_tail(&mut children);
                self.push(NodeKind::Query, start, children)
            }
        };
        self.prepend_child(statement, with);
        statement
    }

    /// Any statement the builder has no dedicated shape for.
    ///
    /// Consumes up to the next statement keyword at parenthesis depth zero.
    /// `CASE ... END` is tracked so that its `END` does not stop the scan.
    pub(crate) fn parse_other_statement(&mut self) -> NodeId {
        let start = self.p.pos();
        let (keywords, count) = self.leading_keywords();
        for _ in 0..count {
            self.p.advance();
        }
        self.skip_to_statement_end(start);
        self.push(NodeKind::OtherStatement { keywords }, start, Vec::new())
    }

    /// Skips the remainder of the current statement (see
    /// [`Self::parse_other_statement`]).
    pub(crate) fn skip_to_statement_end(&mut self, start: usize) {
        let mut depth = 0usize;
        let mut case_depth = 0usize;
        while let Some(token) = self.p.current() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::SemiColon if depth == 0 => break,
                _ => {
                    if depth == 0 && self.p.pos() > start {
                        if self.p.check_word_ci("CASE") {
                            case_depth += 1;
                        } else if self.p.check_word_ci("END") && case_depth > 0 {
                            case_depth -= 1;
                        } else if self.p.check_any_word_ci(OTHER_STATEMENT_TERMINATORS) {
                            break;
                        }
                    } else if self.p.check_word_ci("CASE") {
                        case_depth += 1;
                    } else if self.p.check_word_ci("END") && case_depth > 0 {
                        case_depth -= 1;
                    }
                }
            }
            self.p.advance();
        }
        if self.p.pos() == start {
            self.p.advance();
        }
    }

    /// First one or two words of a statement, uppercased (`DBCC CHECKIDENT`,
    /// `ALTER DATABASE`, `BULK INSERT`), and how many tokens they cover.
    fn leading_keywords(&self) -> (String, usize) {
        let Some(first) = self.p.peek_keyword(0) else {
            return (self.p.current_text().to_ascii_uppercase(), 0);
        };
        let first = first.to_ascii_uppercase();
        let takes_second = matches!(
            first.as_str(),
            "ALTER" | "CREATE" | "DROP" | "BEGIN" | "END" | "ENABLE" | "DISABLE" | "BULK" | "DBCC"
                | "BACKUP" | "RESTORE" | "EXECUTE" | "EXEC" | "GET" | "MOVE" | "SEND"
        );
        match self.p.peek_keyword(1) {
            Some(second)
                if takes_second
                    && (first == "BULK" || !crate::util::is_one_of_ci(second, STATEMENT_KEYWORDS)) =>
            {
                (format!("{first} {}", second.to_ascii_uppercase()), 2)
            }
            _ => (first, 1),
        }
    }

    /// Parses comma-separated option words after `WITH` in a routine or view
    /// header, stopping at the word that begins the body or trigger timing.
    fn parse_routine_options(&mut self) -> Vec<String> {
        let mut options = Vec::new();
        if !self.p.eat_word_ci("WITH") {
            return options;
        }
        loop {
            if self.p.check_any_word_ci(&["EXECUTE", "EXEC"]) && self.p.peek_word_ci(1, "AS") {
                self.p.advance();
                self.p.advance();
                // principal: CALLER, SELF, OWNER or 'name'
                self.p.advance();
                options.push("EXECUTE AS".to_string());
            } else {
                let start = self.p.pos();
                while !self.p.is_at_end()
                    && !self.p.check_token(&Token::Comma)
                    && !self.p.check_any_word_ci(&["AS", "FOR", "AFTER", "INSTEAD", "BEGIN", "RETURN"])
                {
                    if self.p.check_token(&Token::LParen) {
                        self.p.skip_parenthesized();
                    } else {
                        self.p.advance();
                    }
                }
                let text = self.p.text_between(start, self.p.pos());
                let option = crate::util::collapse_whitespace(&text).to_ascii_uppercase();
                if option.is_empty() {
                    break;
                }
                options.push(option);
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        options
    }
}
