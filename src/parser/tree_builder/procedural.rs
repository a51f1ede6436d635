//! DECLARE, SET, control flow, transactions, EXECUTE, error raising,
//! cursors and permissions.

use sqlparser::tokenizer::Token;

use super::TreeBuilder;
use crate::parser::syntax::{BlockKind, NodeId, NodeKind};

/// Orientation words accepted by FETCH.
const FETCH_ORIENTATIONS: &[&str] = &["NEXT", "PRIOR", "FIRST", "LAST", "ABSOLUTE", "RELATIVE"];

impl TreeBuilder {
    pub(super) fn parse_declare(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();

        // DECLARE name CURSOR ... is the only form without a variable.
        if self.current_variable().is_none() && matches!(self.p.current(), Some(Token::Word(_))) {
            let decl = self.parse_cursor_decl();
            return self.push(NodeKind::Declare, start, vec![decl]);
        }

        let mut children = Vec::new();
        while let Some(name) = self.current_variable() {
            let decl_start = self.p.pos();
            self.p.advance();
            self.p.eat_word_ci("AS");
            if self.p.eat_word_ci("TABLE") {
                let elements = self.parse_table_elements();
                if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                    // memory-optimized table variables
                    self.p.advance();
                    self.p.skip_parenthesized();
                }
                children.push(self.push(NodeKind::TableVariableDecl { name }, decl_start, elements));
            } else {
                let mut decl_children = vec![self.parse_data_type()];
                if self.p.eat_token(&Token::Eq) {
                    decl_children.push(self.parse_expr());
                }
                children.push(self.push(NodeKind::VariableDecl { name }, decl_start, decl_children));
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        self.push(NodeKind::Declare, start, children)
    }

    /// `name [INSENSITIVE] [SCROLL] CURSOR [options] FOR query [FOR UPDATE | READ ONLY]`.
    fn parse_cursor_decl(&mut self) -> NodeId {
        let start = self.p.pos();
        let name = self.p.parse_identifier().unwrap_or_default();
        let mut options = Vec::new();
        while self.p.check_any_word_ci(&["INSENSITIVE", "SCROLL"]) {
            options.extend(self.p.take_keyword());
        }
        self.p.eat_word_ci("CURSOR");
        let children = self.parse_cursor_tail(&mut options);
        self.push(NodeKind::CursorDecl { name, options }, start, children)
    }

    /// Cursor options, the FOR query and the trailing update clause.
    fn parse_cursor_tail(&mut self, options: &mut Vec<String>) -> Vec<NodeId> {
        while !self.p.is_at_end() && !self.p.check_word_ci("FOR") && !self.p.check_token(&Token::SemiColon) {
            match self.p.take_keyword() {
                Some(option) => options.push(option),
                None => break,
            }
        }
        let mut children = Vec::new();
        if self.p.eat_word_ci("FOR") {
            children.push(self.parse_query());
        }
        if self.p.eat_words_ci(&["FOR", "READ", "ONLY"]) {
            options.push("FOR READ ONLY".to_string());
        } else if self.p.eat_words_ci(&["FOR", "UPDATE"]) {
            if self.p.eat_word_ci("OF") {
                loop {
                    self.p.parse_identifier();
                    if !self.p.eat_token(&Token::Comma) {
                        break;
                    }
                }
                options.push("FOR UPDATE OF".to_string());
            } else {
                options.push("FOR UPDATE".to_string());
            }
        }
        children
    }

    pub(super) fn parse_set(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();

        if let Some(variable) = self.current_variable() {
            if let Some((operator, width)) = self.assignment_operator_at(1) {
                self.p.advance();
                for _ in 0..width {
                    self.p.advance();
                }
                let value = if self.p.check_word_ci("CURSOR") {
                    let cursor_start = self.p.pos();
                    self.p.advance();
                    let mut options = Vec::new();
                    let children = self.parse_cursor_tail(&mut options);
                    self.push(
                        NodeKind::CursorDecl {
                            name: variable.clone(),
                            options,
                        },
                        cursor_start,
                        children,
                    )
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

        let mut options = Vec::new();
        if self.p.eat_words_ci(&["TRANSACTION", "ISOLATION", "LEVEL"]) {
            options.push("TRANSACTION ISOLATION LEVEL".to_string());
            let mut words = Vec::new();
            while let Some(word) = self.p.peek_keyword(0) {
                if !matches!(
                    word.to_ascii_uppercase().as_str(),
                    "READ" | "COMMITTED" | "UNCOMMITTED" | "REPEATABLE" | "SNAPSHOT" | "SERIALIZABLE"
                ) {
                    break;
                }
                words.extend(self.p.take_keyword());
            }
            let value = words.join(" ");
            return self.push(NodeKind::SetOption { options, value }, start, Vec::new());
        }

        loop {
            let Some(word) = self.p.take_keyword() else {
                break;
            };
            match word.as_str() {
                "STATISTICS" => {
                    let kind = self.p.take_keyword().unwrap_or_default();
                    options.push(format!("STATISTICS {kind}"));
                }
                "IDENTITY_INSERT" => {
                    options.push(word);
                    self.p.parse_multipart_name();
                }
                _ => options.push(word),
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }

        let value = self.parse_set_value();
        self.push(NodeKind::SetOption { options, value }, start, Vec::new())
    }

    /// The single value after a SET option: `ON`, `OFF`, a number, a word,
    /// a variable or a string.
    fn parse_set_value(&mut self) -> String {
        if self.at_statement_end() {
            return String::new();
        }
        let negative = self.p.eat_token(&Token::Minus);
        let value = match self.p.current() {
            Some(Token::Word(w)) if w.quote_style.is_none() && !w.value.starts_with('@') => {
                w.value.to_ascii_uppercase()
            }
            Some(_) => self.p.text_between(self.p.pos(), self.p.pos() + 1),
            None => return String::new(),
        };
        self.p.advance();
        if negative {
            format!("-{value}")
        } else {
            value
        }
    }

    pub(super) fn parse_if(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = vec![self.parse_expr()];
        if !self.p.is_at_end() {
            children.push(self.parse_statement());
        }
        if self.p.check_token(&Token::SemiColon) && self.p.peek_word_ci(1, "ELSE") {
            self.p.advance();
        }
        if self.p.eat_word_ci("ELSE") && !self.p.is_at_end() {
            children.push(self.parse_statement());
        }
        self.push(NodeKind::If, start, children)
    }

    pub(super) fn parse_while(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = vec![self.parse_expr()];
        if !self.p.is_at_end() {
            children.push(self.parse_statement());
        }
        self.push(NodeKind::While, start, children)
    }

    /// `BEGIN ... END`, `BEGIN TRY/CATCH`, `BEGIN [DISTRIBUTED] TRAN`.
    pub(super) fn parse_begin(&mut self) -> NodeId {
        let start = self.p.pos();

        if self.p.check_any_word_ci_at(1, &["TRAN", "TRANSACTION"]) {
            self.p.advance();
            self.p.advance();
            return self.finish_begin_transaction(start, "BEGIN TRANSACTION");
        }
        if self.p.peek_word_ci(1, "DISTRIBUTED") {
            self.p.advance();
            self.p.advance();
            self.p.eat_word_ci("TRAN");
            self.p.eat_word_ci("TRANSACTION");
            return self.finish_begin_transaction(start, "BEGIN DISTRIBUTED TRANSACTION");
        }
        if self.p.check_any_word_ci_at(1, &["DIALOG", "CONVERSATION"]) {
            return self.parse_other_statement();
        }

        self.p.advance();
        let kind = if self.p.eat_word_ci("TRY") {
            BlockKind::Try
        } else if self.p.eat_word_ci("CATCH") {
            BlockKind::Catch
        } else {
            if self.p.eat_word_ci("ATOMIC") && self.p.check_word_ci("WITH") {
                self.p.advance();
                self.p.skip_parenthesized();
            }
            BlockKind::Plain
        };
        let statements = self.parse_statement_list();
        if self.p.eat_word_ci("END") {
            match kind {
                BlockKind::Try => {
                    self.p.eat_word_ci("TRY");
                }
                BlockKind::Catch => {
                    self.p.eat_word_ci("CATCH");
                }
                BlockKind::Plain => {}
            }
        }
        self.push(NodeKind::Block { kind }, start, statements)
    }

    fn finish_begin_transaction(&mut self, start: usize, action: &str) -> NodeId {
        let name = self.transaction_name();
        if self.p.eat_words_ci(&["WITH", "MARK"]) {
            if matches!(
                self.p.current(),
                Some(Token::SingleQuotedString(_)) | Some(Token::NationalStringLiteral(_))
            ) {
                self.p.advance();
            }
        }
        self.push(
            NodeKind::Transaction {
                action: action.to_string(),
                name,
            },
            start,
            Vec::new(),
        )
    }

    /// A transaction or savepoint name: a variable or a word that does not
    /// begin the next statement.
    fn transaction_name(&mut self) -> Option<String> {
        if self.at_statement_end() {
            return None;
        }
        match self.p.current() {
            Some(Token::Word(_)) => self.p.parse_identifier(),
            _ => None,
        }
    }

    /// `RETURN [expr]`; in an inline table function the operand is a query.
    pub(super) fn parse_return(&mut self, inline: bool) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if inline {
            if self.p.check_word_ci("SELECT") || self.p.check_word_ci("WITH") || self.p.check_token(&Token::LParen) {
                children.push(self.parse_query());
            }
        } else if !self.at_statement_end() {
            children.push(self.parse_expr());
        }
        self.push(NodeKind::Return, start, children)
    }

    pub(super) fn parse_waitfor(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        let kind = if self.p.check_token(&Token::LParen) {
            let kind = self
                .p
                .peek_keyword(1)
                .map(str::to_ascii_uppercase)
                .unwrap_or_default();
            self.p.skip_parenthesized();
            if self.p.eat_token(&Token::Comma) && self.p.eat_word_ci("TIMEOUT") {
                children.push(self.parse_primary());
            }
            kind
        } else {
            let kind = self.p.take_keyword().unwrap_or_default();
            children.push(self.parse_primary());
            kind
        };
        self.push(NodeKind::WaitFor { kind }, start, children)
    }

    /// COMMIT, ROLLBACK and SAVE, each with an optional TRAN/WORK word.
    pub(super) fn parse_transaction_end(&mut self) -> NodeId {
        let start = self.p.pos();
        let verb = self.p.take_keyword().unwrap_or_default();
        let (action, name) = if self.p.eat_word_ci("TRAN") || self.p.eat_word_ci("TRANSACTION") {
            (format!("{verb} TRANSACTION"), self.transaction_name())
        } else if self.p.eat_word_ci("WORK") {
            (format!("{verb} WORK"), None)
        } else {
            (verb, None)
        };
        if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
            // DELAYED_DURABILITY
            self.p.advance();
            self.p.skip_parenthesized();
        }
        self.push(NodeKind::Transaction { action, name }, start, Vec::new())
    }

    /// EXECUTE of a procedure or of a dynamic string. `EXECUTE AS` (a
    /// context switch) is left to the generic statement handler.
    pub(super) fn parse_execute(&mut self) -> NodeId {
        let start = self.p.pos();
        if self.p.peek_word_ci(1, "AS") {
            return self.parse_other_statement();
        }
        self.p.advance();
        let mut children = Vec::new();
        let mut options = Vec::new();

        if self.p.eat_token(&Token::LParen) {
            while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
                let before = self.p.pos();
                children.push(self.parse_expr());
                if !self.p.eat_token(&Token::Comma) && self.p.pos() == before {
                    self.p.advance();
                }
            }
            self.p.eat_token(&Token::RParen);
            self.parse_execute_options(&mut options);
            return self.push(
                NodeKind::Execute {
                    procedure: None,
                    options,
                },
                start,
                children,
            );
        }

        // EXEC @rc = proc
        if let Some(variable) = self.current_variable() {
            if self.p.peek_token(1, &Token::Eq) {
                let var_start = self.p.pos();
                self.p.advance();
                children.push(self.push(NodeKind::Variable { name: variable }, var_start, Vec::new()));
                self.p.advance();
            }
        }

        let procedure = self.p.parse_multipart_name();
        if self.p.check_token(&Token::SemiColon) && matches!(self.p.peek(1), Some(Token::Number(_, _))) {
            // numbered procedure
            self.p.advance();
            self.p.advance();
        }

        while !self.at_statement_end() {
            let before = self.p.pos();
            children.push(self.parse_exec_arg());
            if !self.p.eat_token(&Token::Comma) {
                if self.p.pos() == before {
                    self.p.advance();
                }
                break;
            }
        }
        self.parse_execute_options(&mut options);
        self.push(NodeKind::Execute { procedure, options }, start, children)
    }

    fn parse_exec_arg(&mut self) -> NodeId {
        let start = self.p.pos();
        let mut name = None;
        if let Some(variable) = self.current_variable() {
            if self.p.peek_token(1, &Token::Eq) {
                name = Some(variable);
                self.p.advance();
                self.p.advance();
            }
        }
        let mut children = Vec::new();
        if !self.p.eat_word_ci("DEFAULT") {
            children.push(self.parse_expr());
        }
        let output = self.p.eat_word_ci("OUTPUT") || self.p.eat_word_ci("OUT");
        self.push(NodeKind::ExecArg { name, output }, start, children)
    }

    /// `WITH RECOMPILE`, `WITH RESULT SETS (...)`, `AS USER = '...'`, `AT server`.
    fn parse_execute_options(&mut self, options: &mut Vec<String>) {
        loop {
            if self.p.check_word_ci("WITH")
                && self.p.check_any_word_ci_at(1, &["RECOMPILE", "RESULT"])
            {
                self.p.advance();
                loop {
                    if self.p.eat_words_ci(&["RESULT", "SETS"]) {
                        if self.p.check_token(&Token::LParen) {
                            self.p.skip_parenthesized();
                        } else {
                            self.p.advance();
                        }
                        options.push("RESULT SETS".to_string());
                    } else if let Some(word) = self.p.take_keyword() {
                        options.push(word);
                    }
                    if !self.p.eat_token(&Token::Comma) {
                        break;
                    }
                }
            } else if self.p.check_word_ci("AS") && self.p.check_any_word_ci_at(1, &["USER", "LOGIN"]) {
                self.p.advance();
                let principal = self.p.take_keyword().unwrap_or_default();
                self.p.eat_token(&Token::Eq);
                self.p.advance();
                options.push(format!("AS {principal}"));
            } else if self.p.eat_word_ci("AT") {
                self.p.eat_words_ci(&["DATA_SOURCE"]);
                self.p.parse_identifier();
                options.push("AT".to_string());
            } else {
                return;
            }
        }
    }

    pub(super) fn parse_print(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let expr = self.parse_expr();
        self.push(NodeKind::Print, start, vec![expr])
    }

    /// `RAISERROR (msg, severity, state [, args]) [WITH ...]` or the legacy
    /// `RAISERROR number 'text'` form.
    pub(super) fn parse_raiserror(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut options = Vec::new();
        let children = if self.p.check_token(&Token::LParen) {
            self.parse_paren_expr_list()
        } else {
            options.push("LEGACY SYNTAX".to_string());
            let mut legacy = Vec::new();
            while !self.at_statement_end() && legacy.len() < 2 {
                legacy.push(self.parse_primary());
            }
            legacy
        };
        if self.p.eat_word_ci("WITH") {
            loop {
                match self.p.take_keyword() {
                    Some(option) => options.push(option),
                    None => break,
                }
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.push(NodeKind::Raiserror { options }, start, children)
    }

    pub(super) fn parse_throw(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let mut children = Vec::new();
        if !self.at_statement_end() {
            loop {
                children.push(self.parse_expr());
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.push(NodeKind::Throw, start, children)
    }

    /// OPEN, CLOSE, DEALLOCATE and FETCH.
    pub(super) fn parse_cursor_op(&mut self) -> NodeId {
        let start = self.p.pos();
        let op = self.p.take_keyword().unwrap_or_default();
        let mut children = Vec::new();
        let mut orientation = None;

        if op == "FETCH" {
            if self.p.check_any_word_ci(FETCH_ORIENTATIONS) {
                let word = self.p.take_keyword().unwrap_or_default();
                if matches!(word.as_str(), "ABSOLUTE" | "RELATIVE") {
                    children.push(self.parse_unary_operand());
                }
                orientation = Some(word);
            }
            self.p.eat_word_ci("FROM");
        }
        self.p.eat_word_ci("GLOBAL");
        let cursor = self.p.parse_identifier().unwrap_or_default();

        if op == "FETCH" && self.p.eat_word_ci("INTO") {
            loop {
                children.push(self.parse_primary());
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.push(
            NodeKind::CursorOp {
                op,
                cursor,
                orientation,
            },
            start,
            children,
        )
    }

    /// A FETCH ABSOLUTE/RELATIVE offset, which may carry a sign.
    fn parse_unary_operand(&mut self) -> NodeId {
        if self.p.check_token(&Token::Minus) || self.p.check_token(&Token::Plus) {
            let start = self.p.pos();
            let op = self.p.current_text();
            self.p.advance();
            let operand = self.parse_primary();
            return self.push(NodeKind::UnaryOp { op }, start, vec![operand]);
        }
        self.parse_primary()
    }

    /// GRANT, REVOKE and DENY. Permission names overlap statement keywords
    /// (`GRANT SELECT, INSERT ON t TO u`), so the scan runs to the principal
    /// list instead of stopping at the next statement keyword.
    pub(super) fn parse_permission(&mut self) -> NodeId {
        let start = self.p.pos();
        let action = self.p.take_keyword().unwrap_or_default();
        while !self.p.is_at_end()
            && !self.p.check_token(&Token::SemiColon)
            && !self.p.check_any_word_ci(&["TO", "FROM"])
        {
            if self.p.check_token(&Token::LParen) {
                self.p.skip_parenthesized();
            } else {
                self.p.advance();
            }
        }
        if self.p.eat_word_ci("TO") || self.p.eat_word_ci("FROM") {
            loop {
                self.p.parse_identifier();
                if !self.p.eat_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.p.eat_words_ci(&["WITH", "GRANT", "OPTION"]);
        self.p.eat_word_ci("CASCADE");
        if self.p.eat_word_ci("AS") {
            self.p.parse_identifier();
        }
        self.push(NodeKind::Permission { action }, start, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::syntax::{BlockKind, NodeKind};
    use crate::parser::tree_builder::parse_batch;

    fn kinds(sql: &str) -> Vec<NodeKind> {
        let tree = parse_batch(sql);
        tree.descendants(tree.root())
            .into_iter()
            .map(|id| tree.kind(id).clone())
            .collect()
    }

    fn statements(sql: &str) -> Vec<NodeKind> {
        let tree = parse_batch(sql);
        tree.children(tree.root())
            .iter()
            .map(|id| tree.kind(*id).clone())
            .collect()
    }

    #[test]
    fn test_declare_forms() {
        let k = kinds("DECLARE @a INT = 1, @b AS VARCHAR(10), @t TABLE (id INT PRIMARY KEY)");
        assert!(k.contains(&NodeKind::VariableDecl {
            name: "@a".to_string()
        }));
        assert!(k.contains(&NodeKind::VariableDecl {
            name: "@b".to_string()
        }));
        assert!(k.contains(&NodeKind::TableVariableDecl {
            name: "@t".to_string()
        }));
        assert!(k.iter().any(|k| matches!(k, NodeKind::ColumnDef { name } if name == "id")));
    }

    #[test]
    fn test_declare_cursor() {
        let k = kinds("DECLARE c CURSOR LOCAL FAST_FORWARD FOR SELECT a FROM t FOR READ ONLY");
        assert!(k.contains(&NodeKind::CursorDecl {
            name: "c".to_string(),
            options: vec![
                "LOCAL".to_string(),
                "FAST_FORWARD".to_string(),
                "FOR READ ONLY".to_string()
            ],
        }));
        assert!(k.contains(&NodeKind::Query));
    }

    #[test]
    fn test_set_variable_and_options() {
        let s = statements(
            "SET @x = @@ERROR\nSET @n += 1\nSET NOCOUNT ON\nSET ANSI_NULLS, QUOTED_IDENTIFIER OFF\nSET TRANSACTION ISOLATION LEVEL READ COMMITTED",
        );
        assert_eq!(
            s[0],
            NodeKind::VariableAssignment {
                variable: "@x".to_string(),
                operator: "=".to_string()
            }
        );
        assert_eq!(
            s[1],
            NodeKind::VariableAssignment {
                variable: "@n".to_string(),
                operator: "+=".to_string()
            }
        );
        assert_eq!(
            s[2],
            NodeKind::SetOption {
                options: vec!["NOCOUNT".to_string()],
                value: "ON".to_string()
            }
        );
        assert_eq!(
            s[3],
            NodeKind::SetOption {
                options: vec!["ANSI_NULLS".to_string(), "QUOTED_IDENTIFIER".to_string()],
                value: "OFF".to_string()
            }
        );
        assert_eq!(
            s[4],
            NodeKind::SetOption {
                options: vec!["TRANSACTION ISOLATION LEVEL".to_string()],
                value: "READ COMMITTED".to_string()
            }
        );
    }

    #[test]
    fn test_if_else_and_while() {
        let s = statements("IF @x = 1 PRINT 'a' ELSE PRINT 'b'\nWHILE @i < 10 BEGIN SET @i += 1 BREAK END");
        assert_eq!(s.len(), 2);
        assert_eq!(s[0], NodeKind::If);
        assert_eq!(s[1], NodeKind::While);
        let tree = crate::parser::tree_builder::parse_batch("IF 1 = 1 PRINT 'a' ELSE PRINT 'b'");
        let if_node = tree.children(tree.root())[0];
        assert_eq!(tree.children(if_node).len(), 3);
    }

    #[test]
    fn test_try_catch_blocks() {
        let s = statements("BEGIN TRY SELECT 1 END TRY BEGIN CATCH THROW; END CATCH");
        assert_eq!(
            s,
            vec![
                NodeKind::Block {
                    kind: BlockKind::Try
                },
                NodeKind::Block {
                    kind: BlockKind::Catch
                }
            ]
        );
    }

    #[test]
    fn test_transactions() {
        let s = statements("BEGIN TRAN t1\nSAVE TRANSACTION sp\nROLLBACK TRANSACTION sp\nCOMMIT");
        assert_eq!(
            s[0],
            NodeKind::Transaction {
                action: "BEGIN TRANSACTION".to_string(),
                name: Some("t1".to_string())
            }
        );
        assert_eq!(
            s[1],
            NodeKind::Transaction {
                action: "SAVE TRANSACTION".to_string(),
                name: Some("sp".to_string())
            }
        );
        assert_eq!(
            s[3],
            NodeKind::Transaction {
                action: "COMMIT".to_string(),
                name: None
            }
        );
    }

    #[test]
    fn test_execute_forms() {
        let k = kinds("EXEC @rc = dbo.p @a = 1, @b OUTPUT, DEFAULT WITH RECOMPILE");
        assert!(k.contains(&NodeKind::Execute {
            procedure: Some("dbo.p".to_string()),
            options: vec!["RECOMPILE".to_string()],
        }));
        assert!(k.contains(&NodeKind::ExecArg {
            name: Some("@a".to_string()),
            output: false
        }));
        assert!(k.contains(&NodeKind::ExecArg {
            name: None,
            output: true
        }));
        let k = kinds("EXEC ('SELECT ' + @cols)");
        assert!(k.contains(&NodeKind::Execute {
            procedure: None,
            options: vec![],
        }));
        let s = statements("EXECUTE AS USER = 'u'\nREVERT");
        assert!(matches!(&s[0], NodeKind::OtherStatement { keywords } if keywords == "EXECUTE AS"));
    }

    #[test]
    fn test_raiserror_and_throw() {
        let s = statements("RAISERROR('x', 16, 1) WITH NOWAIT\nRAISERROR 50001 'legacy'\nTHROW 50000, 'm', 1");
        assert_eq!(
            s[0],
            NodeKind::Raiserror {
                options: vec!["NOWAIT".to_string()]
            }
        );
        assert_eq!(
            s[1],
            NodeKind::Raiserror {
                options: vec!["LEGACY SYNTAX".to_string()]
            }
        );
        assert_eq!(s[2], NodeKind::Throw);
    }

    #[test]
    fn test_cursor_operations() {
        let s = statements("OPEN c\nFETCH ABSOLUTE -2 FROM c INTO @a, @b\nCLOSE c\nDEALLOCATE c");
        assert_eq!(
            s[1],
            NodeKind::CursorOp {
                op: "FETCH".to_string(),
                cursor: "c".to_string(),
                orientation: Some("ABSOLUTE".to_string())
            }
        );
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_permission_spans_permission_names() {
        let s = statements("GRANT SELECT, INSERT ON dbo.t TO app WITH GRANT OPTION\nPRINT 1");
        assert_eq!(
            s[0],
            NodeKind::Permission {
                action: "GRANT".to_string()
            }
        );
        assert_eq!(s[1], NodeKind::Print);
    }

    #[test]
    fn test_waitfor_and_return() {
        let s = statements("WAITFOR DELAY '00:00:01'\nRETURN\nPRINT 1");
        assert_eq!(
            s[0],
            NodeKind::WaitFor {
                kind: "DELAY".to_string()
            }
        );
        assert_eq!(s[1], NodeKind::Return);
        assert_eq!(s[2], NodeKind::Print);
    }
}
