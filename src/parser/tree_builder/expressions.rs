//! Scalar expressions and predicates.
//!
//! Precedence, loosest first: OR, AND, NOT, predicates (comparison, IN,
//! BETWEEN, LIKE, IS NULL), additive and bitwise, multiplicative, unary,
//! then primaries with an optional COLLATE suffix.

use sqlparser::tokenizer::Token;

use super::TreeBuilder;
use crate::parser::syntax::{LiteralKind, NodeId, NodeKind};

/// Operators that may be followed by `=` to form a compound assignment.
const COMPOUND_BASES: &[&str] = &["+", "-", "*", "/", "%", "&", "|", "^"];

impl TreeBuilder {
    pub(crate) fn parse_expr(&mut self) -> NodeId {
        self.parse_or()
    }

    fn parse_or(&mut self) -> NodeId {
        let mut left = self.parse_and();
        while self.p.check_word_ci("OR") {
            self.p.advance();
            let right = self.parse_and();
            let start = self.nodes[left.index()].span.start;
            left = self.push(
                NodeKind::Logical {
                    op: "OR".to_string(),
                },
                start,
                vec![left, right],
            );
        }
        left
    }

    fn parse_and(&mut self) -> NodeId {
        let mut left = self.parse_not();
        while self.p.check_word_ci("AND") {
            self.p.advance();
            let right = self.parse_not();
            let start = self.nodes[left.index()].span.start;
            left = self.push(
                NodeKind::Logical {
                    op: "AND".to_string(),
                },
                start,
                vec![left, right],
            );
        }
        left
    }

    fn parse_not(&mut self) -> NodeId {
        if self.p.check_word_ci("NOT") {
            let start = self.p.pos();
            self.p.advance();
            let inner = self.parse_not();
            return self.push(NodeKind::Not, start, vec![inner]);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> NodeId {
        let left = self.parse_additive();
        let start = self.nodes[left.index()].span.start;

        if let Some((op, width)) = self.comparison_operator() {
            for _ in 0..width {
                self.p.advance();
            }
            let right = if self.p.check_any_word_ci(&["ANY", "SOME", "ALL"])
                && self.p.peek_token(1, &Token::LParen)
            {
                let quantifier_start = self.p.pos();
                let name = self.p.take_keyword().unwrap_or_default();
                let args = self.parse_paren_expr_list();
                self.push(NodeKind::FunctionCall { name }, quantifier_start, args)
            } else {
                self.parse_additive()
            };
            return self.push(NodeKind::Comparison { op }, start, vec![left, right]);
        }

        let negated = self.p.check_word_ci("NOT")
            && self
                .p
                .check_any_word_ci_at(1, &["IN", "BETWEEN", "LIKE"]);
        if negated {
            self.p.advance();
        }

        if self.p.eat_word_ci("IN") {
            if self.p.check_token(&Token::LParen)
                && (self.p.peek_word_ci(1, "SELECT") || self.p.peek_word_ci(1, "WITH"))
            {
                self.p.advance();
                let query = self.parse_query();
                self.p.eat_token(&Token::RParen);
                return self.push(NodeKind::InSubquery { negated }, start, vec![left, query]);
            }
            let mut children = vec![left];
            children.extend(self.parse_paren_expr_list());
            return self.push(NodeKind::InList { negated }, start, children);
        }
        if self.p.eat_word_ci("BETWEEN") {
            let low = self.parse_additive();
            self.p.eat_word_ci("AND");
            let high = self.parse_additive();
            return self.push(NodeKind::Between { negated }, start, vec![left, low, high]);
        }
        if self.p.eat_word_ci("LIKE") {
            let mut children = vec![left, self.parse_additive()];
            if self.p.eat_word_ci("ESCAPE") {
                children.push(self.parse_additive());
            }
            return self.push(NodeKind::Like { negated }, start, children);
        }
        if self.p.check_word_ci("IS") {
            self.p.advance();
            let negated = self.p.eat_word_ci("NOT");
            self.p.eat_word_ci("NULL");
            return self.push(NodeKind::IsNull { negated }, start, vec![left]);
        }
        left
    }

    /// Comparison operator at the current position and the number of tokens
    /// it spans. Covers `!<`, `!>` and the legacy outer-join `*=` / `=*`.
    fn comparison_operator(&self) -> Option<(String, usize)> {
        let text = self.p.current_text();
        let next = self.p.peek(1).map(|t| t.to_string()).unwrap_or_default();
        match text.as_str() {
            "!" if matches!(next.as_str(), "<" | ">" | "=") => Some((format!("!{next}"), 2)),
            "*" if next == "=" && self.p.next_is_adjacent() => Some(("*=".to_string(), 2)),
            "=" if next == "*" && self.p.next_is_adjacent() => Some(("=*".to_string(), 2)),
            "=" | "<>" | "!=" | "<" | ">" | "<=" | ">=" | "!<" | "!>" | "*=" => Some((text, 1)),
            _ => None,
        }
    }

    /// Assignment operator `offset` tokens ahead: `=` or a compound form such
    /// as `+=`, whether the tokenizer delivers it as one token or two.
    pub(super) fn assignment_operator_at(&self, offset: usize) -> Option<(String, usize)> {
        let text = self.p.peek(offset)?.to_string();
        if text == "=" {
            return Some((text, 1));
        }
        if COMPOUND_BASES.contains(&text.as_str()) {
            if self.p.peek_token(offset + 1, &Token::Eq) {
                return Some((format!("{text}="), 2));
            }
            return None;
        }
        if text.len() == 2 && text.ends_with('=') && COMPOUND_BASES.contains(&&text[..1]) {
            return Some((text, 1));
        }
        None
    }

    pub(crate) fn parse_additive(&mut self) -> NodeId {
        let mut left = self.parse_multiplicative();
        loop {
            let op = self.p.current_text();
            if !matches!(op.as_str(), "+" | "-" | "&" | "|" | "^") {
                break;
            }
            // `a += 1` belongs to an assignment, not to this expression.
            if self.p.peek_token(1, &Token::Eq) {
                break;
            }
            self.p.advance();
            let right = self.parse_multiplicative();
            let start = self.nodes[left.index()].span.start;
            left = self.push(NodeKind::BinaryOp { op }, start, vec![left, right]);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> NodeId {
        let mut left = self.parse_unary();
        loop {
            let op = self.p.current_text();
            if !matches!(op.as_str(), "*" | "/" | "%") {
                break;
            }
            if self.p.peek_token(1, &Token::Eq) {
                break;
            }
            self.p.advance();
            let right = self.parse_unary();
            let start = self.nodes[left.index()].span.start;
            left = self.push(NodeKind::BinaryOp { op }, start, vec![left, right]);
        }
        left
    }

    fn parse_unary(&mut self) -> NodeId {
        let op = self.p.current_text();
        if matches!(op.as_str(), "-" | "+" | "~") {
            let start = self.p.pos();
            self.p.advance();
            let operand = self.parse_unary();
            return self.push(NodeKind::UnaryOp { op }, start, vec![operand]);
        }
        let primary = self.parse_primary();
        self.parse_postfix(primary)
    }

    /// COLLATE and chained method calls (`x.query(...).value(...)`).
    fn parse_postfix(&mut self, mut expr: NodeId) -> NodeId {
        let start = self.nodes[expr.index()].span.start;
        loop {
            if self.p.check_word_ci("COLLATE") {
                self.p.advance();
                let collation = self.p.parse_identifier().unwrap_or_default();
                expr = self.push(NodeKind::Collate { collation }, start, vec![expr]);
            } else if self.p.check_token(&Token::Period)
                && matches!(self.p.peek(1), Some(Token::Word(_)))
                && self.p.peek_token(2, &Token::LParen)
            {
                self.p.advance();
                let method = self.p.parse_identifier().unwrap_or_default();
                let mut children = vec![expr];
                children.extend(self.parse_paren_expr_list());
                expr = self.push(
                    NodeKind::FunctionCall {
                        name: format!(".{method}"),
                    },
                    start,
                    children,
                );
            } else {
                return expr;
            }
        }
    }

    pub(crate) fn parse_primary(&mut self) -> NodeId {
        let start = self.p.pos();
        let Some(token) = self.p.current().cloned() else {
            return self.push(
                NodeKind::Unparsed {
                    message: "unexpected end of batch".to_string(),
                },
                start,
                Vec::new(),
            );
        };

        match token {
            Token::LParen => {
                if self.p.peek_word_ci(1, "SELECT") || self.p.peek_word_ci(1, "WITH") {
                    self.p.advance();
                    let query = self.parse_query();
                    self.p.eat_token(&Token::RParen);
                    self.extend_to_here(query);
                    return query;
                }
                self.p.advance();
                let inner = self.parse_expr();
                // Row constructors: keep the remaining members as siblings.
                while self.p.eat_token(&Token::Comma) {
                    self.parse_expr();
                }
                self.p.eat_token(&Token::RParen);
                inner
            }
            Token::Number(_, _) => {
                self.p.advance();
                self.literal(LiteralKind::Number, start)
            }
            Token::SingleQuotedString(_) => {
                self.p.advance();
                self.literal(LiteralKind::String, start)
            }
            Token::NationalStringLiteral(_) => {
                self.p.advance();
                self.literal(LiteralKind::NationalString, start)
            }
            Token::HexStringLiteral(_) => {
                self.p.advance();
                self.literal(LiteralKind::Hex, start)
            }
            Token::Mul => {
                self.p.advance();
                self.push(NodeKind::Star, start, Vec::new())
            }
            Token::Placeholder(name) => {
                self.p.advance();
                self.push(NodeKind::Identifier { name, quote: None }, start, Vec::new())
            }
            Token::LBrace => {
                // ODBC escape: {fn ...}, {d '...'}
                let mut depth = 0usize;
                while let Some(t) = self.p.current() {
                    match t {
                        Token::LBrace => depth += 1,
                        Token::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                self.p.advance();
                                break;
                            }
                        }
                        _ => {}
                    }
                    self.p.advance();
                }
                self.push(
                    NodeKind::FunctionCall {
                        name: "{ODBC}".to_string(),
                    },
                    start,
                    Vec::new(),
                )
            }
            Token::Word(w) => self.parse_word_primary(&w.value, w.quote_style),
            Token::Comma | Token::RParen | Token::SemiColon => self.push(
                NodeKind::Unparsed {
                    message: format!("expected expression before '{token}'"),
                },
                start,
                Vec::new(),
            ),
            other => {
                self.p.advance();
                self.push(
                    NodeKind::Unparsed {
                        message: format!("unexpected token '{other}'"),
                    },
                    start,
                    Vec::new(),
                )
            }
        }
    }

    fn literal(&mut self, kind: LiteralKind, start: usize) -> NodeId {
        self.push(NodeKind::Literal { kind }, start, Vec::new())
    }

    fn parse_word_primary(&mut self, value: &str, quote_style: Option<char>) -> NodeId {
        let start = self.p.pos();

        if quote_style.is_none() {
            if value.starts_with("@@") {
                self.p.advance();
                return self.push(
                    NodeKind::SystemVariable {
                        name: value.to_ascii_uppercase(),
                    },
                    start,
                    Vec::new(),
                );
            }
            if value.starts_with('@') {
                self.p.advance();
                // @xml.value(...) is handled as a postfix method call.
                return self.push(
                    NodeKind::Variable {
                        name: value.to_string(),
                    },
                    start,
                    Vec::new(),
                );
            }
            let upper = value.to_ascii_uppercase();
            match upper.as_str() {
                "NULL" => {
                    self.p.advance();
                    return self.literal(LiteralKind::Null, start);
                }
                "CASE" => return self.parse_case(),
                "EXISTS" if self.p.peek_token(1, &Token::LParen) => {
                    self.p.advance();
                    self.p.advance();
                    let query = self.parse_query();
                    self.p.eat_token(&Token::RParen);
                    return self.push(NodeKind::Exists, start, vec![query]);
                }
                "CAST" | "TRY_CAST" if self.p.peek_token(1, &Token::LParen) => {
                    return self.parse_cast(upper);
                }
                "CONVERT" | "TRY_CONVERT" if self.p.peek_token(1, &Token::LParen) => {
                    return self.parse_convert(upper);
                }
                "NEXT" if self.p.check_words_ci(&["NEXT", "VALUE", "FOR"]) => {
                    self.p.advance();
                    self.p.advance();
                    self.p.advance();
                    let sequence = self.p.parse_multipart_name().unwrap_or_default();
                    let mut children = Vec::new();
                    if self.p.check_word_ci("OVER") {
                        children.push(self.parse_over());
                    }
                    return self.push(NodeKind::NextValueFor { sequence }, start, children);
                }
                _ => {}
            }
        }

        let name = self.p.parse_multipart_name().unwrap_or_else(|| value.to_string());
        if self.p.pos() == start {
            self.p.advance();
        }

        // t.*
        if name.ends_with('.') && self.p.check_token(&Token::Mul) {
            self.p.advance();
            return self.push(NodeKind::Star, start, Vec::new());
        }

        if self.p.check_token(&Token::LParen) {
            return self.parse_function_call(name, start);
        }

        let quote = if name.ends_with('"') {
            Some('"')
        } else if name.ends_with(']') {
            Some('[')
        } else {
            None
        };
        self.push(NodeKind::Identifier { name, quote }, start, Vec::new())
    }

    fn parse_function_call(&mut self, name: String, start: usize) -> NodeId {
        let mut children = Vec::new();
        self.p.advance();
        if self.p.check_token(&Token::Mul) {
            let star = self.p.pos();
            self.p.advance();
            children.push(self.push(NodeKind::Star, star, Vec::new()));
        }
        if self.p.check_any_word_ci(&["DISTINCT", "ALL"]) && !self.p.peek_token(1, &Token::Comma) {
            self.p.advance();
        }
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let before = self.p.pos();
            children.push(self.parse_expr());
            if self.p.eat_word_ci("AS") {
                children.push(self.parse_data_type());
            }
            if self.p.eat_word_ci("USING") {
                children.push(self.parse_expr());
            }
            if !self.p.eat_token(&Token::Comma) {
                if self.p.pos() == before {
                    self.p.advance();
                }
                if !self.p.check_token(&Token::RParen) && !self.at_statement_end() {
                    continue;
                }
                break;
            }
        }
        self.p.eat_token(&Token::RParen);

        if self.p.check_words_ci(&["WITHIN", "GROUP"]) {
            self.p.advance();
            self.p.advance();
            self.p.skip_parenthesized();
        }
        if self.p.check_word_ci("OVER") {
            children.push(self.parse_over());
        }
        self.push(NodeKind::FunctionCall { name }, start, children)
    }

    fn parse_cast(&mut self, name: String) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let value = self.parse_expr();
        self.p.eat_word_ci("AS");
        let target = self.parse_data_type();
        self.p.eat_token(&Token::RParen);
        self.push(NodeKind::FunctionCall { name }, start, vec![value, target])
    }

    fn parse_convert(&mut self, name: String) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        self.p.advance();
        let target = self.parse_data_type();
        let mut children = vec![target];
        while self.p.eat_token(&Token::Comma) {
            children.push(self.parse_expr());
        }
        self.p.eat_token(&Token::RParen);
        self.push(NodeKind::FunctionCall { name }, start, children)
    }

    fn parse_case(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if !self.p.check_word_ci("WHEN") {
            children.push(self.parse_expr());
        }
        while self.p.eat_word_ci("WHEN") {
            children.push(self.parse_expr());
            self.p.eat_word_ci("THEN");
            children.push(self.parse_expr());
        }
        if self.p.eat_word_ci("ELSE") {
            children.push(self.parse_expr());
        }
        self.p.eat_word_ci("END");
        self.push(NodeKind::Case, start, children)
    }

    /// `OVER ([PARTITION BY ...] [ORDER BY ...] [ROWS|RANGE ...])`.
    fn parse_over(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        let mut ordered = false;
        let mut frame = None;
        if self.p.eat_token(&Token::LParen) {
            if self.p.eat_words_ci(&["PARTITION", "BY"]) {
                loop {
                    children.push(self.parse_expr());
                    if !self.p.eat_token(&Token::Comma) {
                        break;
                    }
                }
            }
            if self.p.eat_words_ci(&["ORDER", "BY"]) {
                ordered = true;
                children.extend(self.parse_order_items());
            }
            if self.p.check_any_word_ci(&["ROWS", "RANGE"]) {
                let frame_start = self.p.pos();
                while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
                    self.p.advance();
                }
                frame = Some(crate::util::collapse_whitespace(
                    &self.p.text_between(frame_start, self.p.pos()).to_ascii_uppercase(),
                ));
            }
            self.p.eat_token(&Token::RParen);
        } else {
            // named window
            self.p.parse_identifier();
        }
        self.push(NodeKind::Over { ordered, frame }, start, children)
    }

    /// `( expr, expr, ... )`; returns the member expressions.
    pub(crate) fn parse_paren_expr_list(&mut self) -> Vec<NodeId> {
        let mut items = Vec::new();
        if !self.p.eat_token(&Token::LParen) {
            return items;
        }
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let before = self.p.pos();
            if self.p.check_word_ci("SELECT") || self.p.check_word_ci("WITH") {
                items.push(self.parse_query());
            } else {
                items.push(self.parse_expr());
            }
            if !self.p.eat_token(&Token::Comma) {
                if self.p.pos() == before {
                    self.p.advance();
                }
                if !self.p.check_token(&Token::RParen) && !self.at_statement_end() {
                    continue;
                }
                break;
            }
        }
        self.p.eat_token(&Token::RParen);
        items
    }
}
