//! CREATE / ALTER / DROP statements, column and constraint definitions,
//! routine headers and data types.

use sqlparser::tokenizer::Token;

use super::TreeBuilder;
use crate::parser::syntax::{
    ConstraintKind, FunctionKind, NodeId, NodeKind, RoutineVerb, TriggerScope,
};
use crate::util::collapse_whitespace;

/// Words that may continue a multi-word object kind after `prev`
/// (`PARTITION FUNCTION`, `XML SCHEMA COLLECTION`, ...).
fn object_kind_continuation(prev: &str) -> &'static [&'static str] {
    match prev {
        "PARTITION" => &["FUNCTION", "SCHEME"],
        "FULLTEXT" => &["INDEX", "CATALOG", "STOPLIST"],
        "XML" => &["SCHEMA", "INDEX"],
        "SCHEMA" => &["COLLECTION"],
        "MESSAGE" => &["TYPE"],
        "EVENT" => &["NOTIFICATION", "SESSION"],
        "MASTER" | "SYMMETRIC" | "ASYMMETRIC" | "ENCRYPTION" => &["KEY"],
        "APPLICATION" => &["ROLE"],
        "SERVER" => &["ROLE", "AUDIT"],
        "AUDIT" => &["SPECIFICATION"],
        "DATABASE" => &["AUDIT", "ENCRYPTION", "SCOPED"],
        "SCOPED" => &["CREDENTIAL", "CONFIGURATION"],
        "EXTERNAL" => &["TABLE", "DATA", "FILE", "RESOURCE", "LIBRARY"],
        "DATA" => &["SOURCE"],
        "FILE" => &["FORMAT"],
        "SECURITY" => &["POLICY"],
        "PRIMARY" | "SELECTIVE" => &["XML"],
        "SPATIAL" => &["INDEX"],
        "REMOTE" => &["SERVICE"],
        "SERVICE" => &["BINDING"],
        "RESOURCE" => &["POOL"],
        "WORKLOAD" => &["GROUP"],
        "COLUMN" => &["MASTER", "ENCRYPTION"],
        "SEARCH" => &["PROPERTY"],
        "PROPERTY" => &["LIST"],
        "BROKER" => &["PRIORITY"],
        _ => &[],
    }
}

impl TreeBuilder {
    /// Reads an object kind such as `TABLE` or `PARTITION FUNCTION`.
    fn parse_object_kind(&mut self) -> String {
        let mut words: Vec<String> = Vec::new();
        if let Some(first) = self.p.take_keyword() {
            words.push(first);
        }
        while let Some(prev) = words.last() {
            let allowed = object_kind_continuation(prev);
            match self.p.peek_keyword(0) {
                Some(next) if allowed.iter().any(|a| a.eq_ignore_ascii_case(next)) => {
                    words.push(next.to_ascii_uppercase());
                    self.p.advance();
                }
                _ => break,
            }
        }
        match words.first().map(String::as_str) {
            Some("PROC") => "PROCEDURE".to_string(),
            _ => words.join(" "),
        }
    }

    pub(super) fn parse_create_or_alter(&mut self) -> NodeId {
        let start = self.p.pos();
        let verb = if self.p.check_words_ci(&["CREATE", "OR", "ALTER"]) {
            self.p.advance();
            self.p.advance();
            self.p.advance();
            RoutineVerb::CreateOrAlter
        } else if self.p.eat_word_ci("ALTER") {
            RoutineVerb::Alter
        } else {
            self.p.advance();
            RoutineVerb::Create
        };

        let object = self.p.peek_keyword(0).map(str::to_ascii_uppercase);
        match (verb, object.as_deref()) {
            (RoutineVerb::Create, Some("TABLE")) => self.parse_create_table(start),
            (RoutineVerb::Alter, Some("TABLE")) => self.parse_alter_table(start),
            (_, Some("VIEW")) => self.parse_create_view(start, verb),
            (_, Some("PROC") | Some("PROCEDURE")) => self.parse_create_procedure(start, verb),
            (_, Some("FUNCTION")) => self.parse_create_function(start, verb),
            (_, Some("TRIGGER")) => self.parse_create_trigger(start, verb),
            (RoutineVerb::Create, Some("TYPE")) => self.parse_create_type(start),
            (RoutineVerb::Create, Some("INDEX" | "UNIQUE" | "CLUSTERED" | "NONCLUSTERED" | "COLUMNSTORE")) => {
                self.parse_create_index(start)
            }
            (RoutineVerb::Create, _) => {
                let object_kind = self.parse_object_kind();
                let name = self.p.parse_multipart_name().unwrap_or_default();
                self.skip_to_statement_end(start);
                self.push(NodeKind::CreateOther { object_kind, name }, start, Vec::new())
            }
            _ => {
                self.p.set_pos(start);
                self.parse_other_statement()
            }
        }
    }

    fn parse_create_table(&mut self, start: usize) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        let mut children = Vec::new();
        if self.p.check_token(&Token::LParen) {
            children.extend(self.parse_table_elements());
        }
        children.extend(self.parse_table_options());
        self.push(NodeKind::CreateTable { name }, start, children)
    }

    /// `ON fg`, `TEXTIMAGE_ON fg`, `FILESTREAM_ON fg`, `WITH (...)` after a
    /// table definition.
    fn parse_table_options(&mut self) -> Vec<NodeId> {
        let mut options = Vec::new();
        loop {
            let start = self.p.pos();
            if self.p.check_any_word_ci(&["ON", "TEXTIMAGE_ON", "FILESTREAM_ON"]) {
                let option = self.p.take_keyword().unwrap_or_default();
                self.p.parse_identifier();
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                options.push(self.push(NodeKind::TableOption { option }, start, Vec::new()));
            } else if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                self.p.advance();
                options.extend(self.parse_table_option_list());
            } else {
                return options;
            }
        }
    }

    /// `(name = value, name (...), ...)` as one `TableOption` per entry,
    /// named by its uppercased first word.
    fn parse_table_option_list(&mut self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        if !self.p.eat_token(&Token::LParen) {
            return nodes;
        }
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let start = self.p.pos();
            let name = self
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
            nodes.push(self.push(NodeKind::TableOption { option: name }, start, Vec::new()));
            self.p.eat_token(&Token::Comma);
        }
        self.p.eat_token(&Token::RParen);
        nodes
    }

    /// Column definitions, table constraints and inline indexes between
    /// parentheses.
    pub(super) fn parse_table_elements(&mut self) -> Vec<NodeId> {
        let mut elements = Vec::new();
        if !self.p.eat_token(&Token::LParen) {
            return elements;
        }
        while !self.p.is_at_end() && !self.p.check_token(&Token::RParen) {
            let before = self.p.pos();
            elements.push(self.parse_table_element());
            if !self.p.eat_token(&Token::Comma) {
                if self.p.pos() == before {
                    self.p.advance();
                }
                if !self.p.check_token(&Token::RParen) && !self.p.is_at_end() {
                    continue;
                }
                break;
            }
        }
        self.p.eat_token(&Token::RParen);
        elements
    }

    fn parse_table_element(&mut self) -> NodeId {
        let start = self.p.pos();
        if self.p.check_any_word_ci(&["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]) {
            return self.parse_constraint(true);
        }
        if self.p.check_word_ci("INDEX") {
            self.p.advance();
            self.p.parse_identifier();
            self.skip_element();
            return self.push(
                NodeKind::TableOption {
                    option: "INDEX".to_string(),
                },
                start,
                Vec::new(),
            );
        }
        if self.p.check_words_ci(&["PERIOD", "FOR"]) {
            self.skip_element();
            return self.push(
                NodeKind::TableOption {
                    option: "PERIOD FOR SYSTEM_TIME".to_string(),
                },
                start,
                Vec::new(),
            );
        }
        self.parse_column_def()
    }

    /// Skips to the next `,` or `)` at the current nesting level.
    fn skip_element(&mut self) {
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
    }

    /// `name type [attributes]` or `name AS expr [PERSISTED]`.
    pub(super) fn parse_column_def(&mut self) -> NodeId {
        let start = self.p.pos();
        let name = self.p.parse_identifier().unwrap_or_default();
        let mut children = Vec::new();

        if self.p.eat_word_ci("AS") {
            let computed_start = self.p.pos();
            let expr = self.parse_expr();
            let persisted = self.p.eat_word_ci("PERSISTED");
            children.push(self.push(NodeKind::ComputedColumn { persisted }, computed_start, vec![expr]));
        } else if matches!(self.p.current(), Some(Token::Word(_)))
            && !self.p.check_any_word_ci(&["NULL", "NOT", "CONSTRAINT", "DEFAULT", "COLLATE"])
        {
            children.push(self.parse_data_type());
        }

        self.parse_column_attributes(&mut children);
        self.push(NodeKind::ColumnDef { name }, start, children)
    }

    fn parse_column_attributes(&mut self, children: &mut Vec<NodeId>) {
        loop {
            let start = self.p.pos();
            if self.p.check_token(&Token::Comma)
                || self.p.check_token(&Token::RParen)
                || self.at_statement_end()
            {
                return;
            }

            let attribute = if self.p.eat_words_ci(&["NOT", "NULL"]) {
                "NOT NULL".to_string()
            } else if self.p.eat_words_ci(&["NOT", "FOR", "REPLICATION"]) {
                "NOT FOR REPLICATION".to_string()
            } else if self.p.eat_word_ci("NULL") {
                "NULL".to_string()
            } else if self.p.eat_word_ci("IDENTITY") {
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                "IDENTITY".to_string()
            } else if self.p.check_word_ci("COLLATE") {
                self.p.advance();
                let collation = self.p.parse_identifier().unwrap_or_default();
                children.push(self.push(NodeKind::Collate { collation }, start, Vec::new()));
                continue;
            } else if self.p.check_any_word_ci(&[
                "CONSTRAINT", "DEFAULT", "PRIMARY", "UNIQUE", "CHECK", "REFERENCES", "FOREIGN",
            ]) {
                children.push(self.parse_constraint(false));
                continue;
            } else if self.p.check_words_ci(&["GENERATED", "ALWAYS"]) {
                while !self.p.is_at_end()
                    && !self.p.check_token(&Token::Comma)
                    && !self.p.check_token(&Token::RParen)
                    && !self.p.check_any_word_ci(&["HIDDEN", "NOT", "NULL", "CONSTRAINT"])
                {
                    self.p.advance();
                }
                "GENERATED ALWAYS".to_string()
            } else if self.p.check_any_word_ci(&["MASKED", "ENCRYPTED"]) {
                let word = self.p.take_keyword().unwrap_or_default();
                if self.p.eat_word_ci("WITH") {
                    self.p.skip_parenthesized();
                }
                word
            } else if self.p.eat_word_ci("INDEX") {
                self.p.parse_identifier();
                self.p.eat_word_ci("CLUSTERED");
                self.p.eat_word_ci("NONCLUSTERED");
                "INDEX".to_string()
            } else if let Some(word) = self.p.take_keyword() {
                // ROWGUIDCOL, SPARSE, FILESTREAM, HIDDEN, PERSISTED ...
                word
            } else {
                self.p.advance();
                continue;
            };
            children.push(self.push(NodeKind::ColumnAttribute { attribute }, start, Vec::new()));
        }
    }

    /// A column or table constraint, including an optional `CONSTRAINT name`.
    pub(super) fn parse_constraint(&mut self, table_level: bool) -> NodeId {
        let start = self.p.pos();
        let name = if self.p.eat_word_ci("CONSTRAINT") {
            self.p.parse_identifier()
        } else {
            None
        };
        let mut children = Vec::new();
        let mut options = Vec::new();
        let mut clustered = None;

        let kind = if self.p.eat_words_ci(&["PRIMARY", "KEY"]) {
            ConstraintKind::PrimaryKey
        } else if self.p.eat_word_ci("UNIQUE") {
            ConstraintKind::Unique
        } else if self.p.eat_word_ci("CHECK") {
            ConstraintKind::Check
        } else if self.p.eat_word_ci("DEFAULT") {
            ConstraintKind::Default
        } else {
            self.p.eat_words_ci(&["FOREIGN", "KEY"]);
            ConstraintKind::ForeignKey
        };

        match kind {
            ConstraintKind::PrimaryKey | ConstraintKind::Unique => {
                if self.p.eat_word_ci("CLUSTERED") {
                    clustered = Some(true);
                } else if self.p.eat_word_ci("NONCLUSTERED") {
                    clustered = Some(false);
                }
                if self.p.eat_word_ci("HASH") {
                    options.push("HASH".to_string());
                }
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                self.parse_index_tail_options(&mut options);
            }
            ConstraintKind::Check => {
                if self.p.eat_words_ci(&["NOT", "FOR", "REPLICATION"]) {
                    options.push("NOT FOR REPLICATION".to_string());
                }
                if self.p.eat_token(&Token::LParen) {
                    children.push(self.parse_expr());
                    self.p.eat_token(&Token::RParen);
                }
            }
            ConstraintKind::Default => {
                children.push(self.parse_expr());
                if self.p.eat_word_ci("FOR") {
                    self.p.parse_identifier();
                }
                if self.p.eat_words_ci(&["WITH", "VALUES"]) {
                    options.push("WITH VALUES".to_string());
                }
            }
            ConstraintKind::ForeignKey => {
                if table_level && self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                if self.p.eat_word_ci("REFERENCES") {
                    self.p.parse_multipart_name();
                    if self.p.check_token(&Token::LParen) {
                        self.p.skip_parenthesized();
                    }
                }
                while self.p.check_word_ci("ON")
                    && self.p.check_any_word_ci_at(1, &["DELETE", "UPDATE"])
                {
                    self.p.advance();
                    let event = self.p.take_keyword().unwrap_or_default();
                    let action = if self.p.eat_words_ci(&["NO", "ACTION"]) {
                        "NO ACTION".to_string()
                    } else if self.p.eat_words_ci(&["SET", "NULL"]) {
                        "SET NULL".to_string()
                    } else if self.p.eat_words_ci(&["SET", "DEFAULT"]) {
                        "SET DEFAULT".to_string()
                    } else {
                        self.p.take_keyword().unwrap_or_default()
                    };
                    options.push(format!("ON {event} {action}"));
                }
                if self.p.eat_words_ci(&["NOT", "FOR", "REPLICATION"]) {
                    options.push("NOT FOR REPLICATION".to_string());
                }
            }
        }

        self.push(
            NodeKind::Constraint {
                name,
                kind,
                clustered,
                options,
            },
            start,
            children,
        )
    }

    /// `WITH (...)`, `WITH FILLFACTOR = n`, `ON fg` after an index or key.
    fn parse_index_tail_options(&mut self, options: &mut Vec<String>) {
        loop {
            if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                self.p.advance();
                let inner = self.p.consume_parenthesized().unwrap_or_default();
                for option in split_top_level(&inner) {
                    if let Some(name) = option.split(|c: char| c == '=' || c.is_whitespace()).next() {
                        if !name.is_empty() {
                            options.push(name.to_ascii_uppercase());
                        }
                    }
                }
            } else if self.p.check_words_ci(&["WITH", "FILLFACTOR"]) {
                self.p.advance();
                self.p.advance();
                self.p.eat_token(&Token::Eq);
                self.p.advance();
                options.push("FILLFACTOR".to_string());
            } else if self.p.check_word_ci("ON") && !self.p.check_any_word_ci_at(1, &["DELETE", "UPDATE"]) {
                self.p.advance();
                self.p.parse_identifier();
                if self.p.check_token(&Token::LParen) {
                    self.p.skip_parenthesized();
                }
                options.push("ON FILEGROUP".to_string());
            } else {
                return;
            }
        }
    }

    /// A data type name with optional arguments: `VARCHAR(MAX)`,
    /// `DECIMAL(10, 2)`, `dbo.MyType`, `DOUBLE PRECISION`.
    pub(crate) fn parse_data_type(&mut self) -> NodeId {
        let start = self.p.pos();
        let mut name = self.p.parse_multipart_name().unwrap_or_default();
        let upper = name.to_ascii_uppercase();
        if upper == "DOUBLE" && self.p.eat_word_ci("PRECISION") {
            name.push_str(" PRECISION");
        } else if upper == "NATIONAL" {
            if let Some(next) = self.p.take_keyword() {
                name = format!("{name} {next}");
            }
            if self.p.eat_word_ci("VARYING") {
                name.push_str(" VARYING");
            }
        } else if matches!(upper.as_str(), "CHARACTER" | "CHAR" | "BINARY") && self.p.eat_word_ci("VARYING") {
            name.push_str(" VARYING");
        }
        let args = self
            .p
            .consume_parenthesized()
            .map(|a| collapse_whitespace(&a).to_ascii_uppercase());
        if self.p.check_word_ci("VARYING") {
            // cursor parameters: CURSOR VARYING
            self.p.advance();
        }
        self.push(NodeKind::DataType { name, args }, start, Vec::new())
    }

    pub(super) fn parse_alter_table(&mut self, start: usize) -> NodeId {
        self.p.advance();
        let table = self.p.parse_multipart_name().unwrap_or_default();
        let mut actions = Vec::new();

        if !self.p.is_at_end() && !self.p.check_token(&Token::SemiColon) {
            actions.push(self.parse_alter_table_action());
        }
        self.push(NodeKind::AlterTable { table }, start, actions)
    }

    fn parse_alter_table_action(&mut self) -> NodeId {
        let start = self.p.pos();
        let mut prefix = String::new();
        if self.p.check_word_ci("WITH") && self.p.check_any_word_ci_at(1, &["CHECK", "NOCHECK"]) {
            self.p.advance();
            let check = self.p.take_keyword().unwrap_or_default();
            prefix = format!("WITH {check} ");
        }

        let mut children = Vec::new();
        let action = if self.p.eat_word_ci("ADD") {
            loop {
                if self.p.check_any_word_ci(&["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "DEFAULT"]) {
                    children.push(self.parse_constraint(true));
                } else if self.p.check_words_ci(&["PERIOD", "FOR"]) {
                    let period_start = self.p.pos();
                    self.skip_element();
                    children.push(self.push(
                        NodeKind::TableOption {
                            option: "PERIOD FOR SYSTEM_TIME".to_string(),
                        },
                        period_start,
                        Vec::new(),
                    ));
                } else {
                    children.push(self.parse_column_def());
                }
                if !(self.p.check_token(&Token::Comma)
                    && !self.p.check_any_word_ci_at(1, &["ADD", "DROP", "ALTER"]))
                {
                    break;
                }
                self.p.advance();
            }
            "ADD".to_string()
        } else if self.p.check_words_ci(&["ALTER", "COLUMN"]) {
            self.p.advance();
            self.p.advance();
            children.push(self.parse_column_def());
            "ALTER COLUMN".to_string()
        } else if self.p.eat_word_ci("DROP") {
            let target = if self.p.eat_word_ci("COLUMN") {
                "COLUMN"
            } else if self.p.eat_word_ci("CONSTRAINT") {
                "CONSTRAINT"
            } else if self.p.eat_word_ci("PERIOD") {
                self.skip_element();
                "PERIOD"
            } else {
                "CONSTRAINT"
            };
            self.p.eat_words_ci(&["IF", "EXISTS"]);
            loop {
                self.p.parse_identifier();
                if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                    self.p.advance();
                    self.p.skip_parenthesized();
                }
                if self.p.check_token(&Token::Comma)
                    && !self.p.check_any_word_ci_at(1, &["COLUMN", "CONSTRAINT"])
                    && matches!(self.p.peek(1), Some(Token::Word(_)))
                {
                    self.p.advance();
                    continue;
                }
                break;
            }
            format!("DROP {target}")
        } else if self.p.check_any_word_ci(&["CHECK", "NOCHECK"]) && self.p.peek_word_ci(1, "CONSTRAINT") {
            let word = self.p.take_keyword().unwrap_or_default();
            self.p.advance();
            self.skip_name_list();
            format!("{word} CONSTRAINT")
        } else if self.p.check_any_word_ci(&["ENABLE", "DISABLE"]) && self.p.peek_word_ci(1, "TRIGGER") {
            let word = self.p.take_keyword().unwrap_or_default();
            self.p.advance();
            self.skip_name_list();
            format!("{word} TRIGGER")
        } else {
            let word = self.p.take_keyword().unwrap_or_default();
            let action = match self.p.peek_keyword(0) {
                Some(next) if matches!(word.as_str(), "ENABLE" | "DISABLE") => {
                    format!("{word} {}", next.to_ascii_uppercase())
                }
                _ => word,
            };
            self.skip_to_statement_end(start);
            action
        };

        self.push(
            NodeKind::AlterTableAction {
                action: format!("{prefix}{action}"),
            },
            start,
            children,
        )
    }

    /// `ALL` or `name, name, ...`.
    fn skip_name_list(&mut self) {
        loop {
            self.p.parse_identifier();
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
    }

    fn parse_create_view(&mut self, start: usize, verb: RoutineVerb) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        if self.p.check_token(&Token::LParen) {
            self.p.skip_parenthesized();
        }
        let options = self.parse_routine_options();
        self.p.eat_word_ci("AS");
        let query = self.parse_query();
        let check_option = self.p.eat_words_ci(&["WITH", "CHECK", "OPTION"]);
        self.push(
            NodeKind::CreateView {
                name,
                verb,
                options,
                check_option,
            },
            start,
            vec![query],
        )
    }

    /// Routine parameters, with or without surrounding parentheses.
    fn parse_parameters(&mut self) -> Vec<NodeId> {
        let mut params = Vec::new();
        let parenthesized = self.p.eat_token(&Token::LParen);
        while self.current_variable().is_some() {
            params.push(self.parse_parameter());
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        if parenthesized {
            self.p.eat_token(&Token::RParen);
        }
        params
    }

    fn parse_parameter(&mut self) -> NodeId {
        let start = self.p.pos();
        let name = self.current_variable().unwrap_or_default();
        self.p.advance();
        self.p.eat_word_ci("AS");
        let mut children = vec![self.parse_data_type()];
        self.p.eat_word_ci("NULL");
        self.p.eat_words_ci(&["NOT", "NULL"]);
        let mut has_default = false;
        if self.p.eat_token(&Token::Eq) {
            has_default = true;
            children.push(self.parse_expr());
        }
        let mut output = false;
        let mut readonly = false;
        loop {
            if self.p.eat_word_ci("OUTPUT") || self.p.eat_word_ci("OUT") {
                output = true;
            } else if self.p.eat_word_ci("READONLY") {
                readonly = true;
            } else {
                break;
            }
        }
        self.push(
            NodeKind::Parameter {
                name,
                output,
                readonly,
                has_default,
            },
            start,
            children,
        )
    }

    fn parse_create_procedure(&mut self, start: usize, verb: RoutineVerb) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        let mut number = None;
        if self.p.eat_token(&Token::SemiColon) {
            number = self.p.parse_positive_integer().map(|n| n as u32);
        }
        let mut children = self.parse_parameters();
        let mut options = self.parse_routine_options();
        if self.p.eat_words_ci(&["FOR", "REPLICATION"]) {
            options.push("FOR REPLICATION".to_string());
        }
        self.p.eat_word_ci("AS");
        if self.p.eat_words_ci(&["EXTERNAL", "NAME"]) {
            self.p.parse_multipart_name();
            options.push("EXTERNAL NAME".to_string());
        } else {
            children.extend(self.parse_statement_list());
        }
        self.push(
            NodeKind::CreateProcedure {
                name,
                verb,
                options,
                number,
            },
            start,
            children,
        )
    }

    fn parse_create_function(&mut self, start: usize, verb: RoutineVerb) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        let mut children = self.parse_parameters();

        let mut kind = FunctionKind::Scalar;
        if self.p.eat_word_ci("RETURNS") {
            if let Some(variable) = self.current_variable() {
                let rt_start = self.p.pos();
                self.p.advance();
                self.p.eat_word_ci("TABLE");
                let columns = self.parse_table_elements();
                children.push(self.push(NodeKind::ReturnTable { variable }, rt_start, columns));
                kind = FunctionKind::MultiStatementTable;
            } else if self.p.check_word_ci("TABLE") {
                self.p.advance();
                kind = FunctionKind::InlineTable;
            } else {
                children.push(self.parse_data_type());
            }
        }

        let options = self.parse_routine_options();
        self.p.eat_word_ci("AS");
        if self.p.eat_words_ci(&["EXTERNAL", "NAME"]) {
            self.p.parse_multipart_name();
            kind = FunctionKind::Clr;
        } else if kind == FunctionKind::InlineTable {
            if self.p.check_word_ci("RETURN") {
                children.push(self.parse_return(true));
            } else if self.p.check_token(&Token::LParen) || self.p.check_word_ci("SELECT") || self.p.check_word_ci("WITH") {
                children.push(self.parse_query());
            }
        } else {
            children.extend(self.parse_statement_list());
        }

        self.push(
            NodeKind::CreateFunction {
                name,
                verb,
                kind,
                options,
            },
            start,
            children,
        )
    }

    fn parse_create_trigger(&mut self, start: usize, verb: RoutineVerb) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        self.p.eat_word_ci("ON");
        let (scope, target) = if self.p.eat_words_ci(&["ALL", "SERVER"]) {
            (TriggerScope::AllServer, "ALL SERVER".to_string())
        } else if self.p.eat_word_ci("DATABASE") {
            (TriggerScope::Database, "DATABASE".to_string())
        } else {
            (
                TriggerScope::Table,
                self.p.parse_multipart_name().unwrap_or_default(),
            )
        };
        let mut options = self.parse_routine_options();
        let timing = if self.p.eat_words_ci(&["INSTEAD", "OF"]) {
            "INSTEAD OF".to_string()
        } else {
            self.p.take_keyword().unwrap_or_default()
        };
        let mut events = Vec::new();
        loop {
            match self.p.take_keyword() {
                Some(event) if event != "AS" && event != "WITH" && event != "NOT" => events.push(event),
                Some(_) => {
                    self.p.set_pos(self.p.pos() - 1);
                    break;
                }
                None => break,
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        if self.p.eat_words_ci(&["WITH", "APPEND"]) {
            options.push("WITH APPEND".to_string());
        }
        if self.p.eat_words_ci(&["NOT", "FOR", "REPLICATION"]) {
            options.push("NOT FOR REPLICATION".to_string());
        }
        self.p.eat_word_ci("AS");
        let children = if self.p.eat_words_ci(&["EXTERNAL", "NAME"]) {
            self.p.parse_multipart_name();
            options.push("EXTERNAL NAME".to_string());
            Vec::new()
        } else {
            self.parse_statement_list()
        };
        self.push(
            NodeKind::CreateTrigger {
                name,
                verb,
                target,
                scope,
                timing,
                events,
                options,
            },
            start,
            children,
        )
    }

    fn parse_create_index(&mut self, start: usize) -> NodeId {
        let unique = self.p.eat_word_ci("UNIQUE");
        let clustered = if self.p.eat_word_ci("CLUSTERED") {
            Some(true)
        } else if self.p.eat_word_ci("NONCLUSTERED") {
            Some(false)
        } else {
            None
        };
        let kind = if self.p.eat_word_ci("COLUMNSTORE") {
            Some("COLUMNSTORE".to_string())
        } else {
            None
        };
        self.p.eat_word_ci("INDEX");
        let name = self.p.parse_identifier().unwrap_or_default();
        self.p.eat_word_ci("ON");
        let table = self.p.parse_multipart_name().unwrap_or_default();
        if self.p.check_token(&Token::LParen) {
            self.p.skip_parenthesized();
        }
        let included = self.p.eat_word_ci("INCLUDE");
        if included {
            self.p.skip_parenthesized();
        }
        let mut children = Vec::new();
        let filtered = self.p.check_word_ci("WHERE");
        if filtered {
            children.push(self.parse_where());
        }
        let mut options = Vec::new();
        self.parse_index_tail_options(&mut options);
        self.push(
            NodeKind::CreateIndex {
                name,
                table,
                unique,
                clustered,
                kind,
                included,
                filtered,
                options,
            },
            start,
            children,
        )
    }

    fn parse_create_type(&mut self, start: usize) -> NodeId {
        self.p.advance();
        let name = self.p.parse_multipart_name().unwrap_or_default();
        let mut children = Vec::new();
        let mut base = None;
        let mut table = false;
        if self.p.eat_word_ci("FROM") {
            let data_type = self.parse_data_type();
            if let NodeKind::DataType { name, .. } = self.kind_of(data_type) {
                base = Some(name.clone());
            }
            children.push(data_type);
            self.p.eat_words_ci(&["NOT", "NULL"]);
            self.p.eat_word_ci("NULL");
        } else if self.p.eat_words_ci(&["AS", "TABLE"]) {
            table = true;
            children.extend(self.parse_table_elements());
            if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                self.p.advance();
                self.p.skip_parenthesized();
            }
        } else if self.p.eat_words_ci(&["EXTERNAL", "NAME"]) {
            self.p.parse_multipart_name();
        }
        self.push(NodeKind::CreateType { name, base, table }, start, children)
    }

    pub(super) fn parse_drop(&mut self) -> NodeId {
        let start = self.p.pos();
        self.p.advance();
        let object_kind = self.parse_object_kind();
        let if_exists = self.p.eat_words_ci(&["IF", "EXISTS"]);
        let mut names = Vec::new();
        loop {
            match self.p.parse_multipart_name() {
                Some(name) => names.push(name),
                None => break,
            }
            if self.p.check_word_ci("ON") {
                // DROP INDEX ix ON t, DROP TRIGGER t ON DATABASE
                self.p.advance();
                if !self.p.eat_words_ci(&["ALL", "SERVER"]) {
                    self.p.parse_multipart_name();
                }
                if self.p.check_word_ci("WITH") && self.p.peek_token(1, &Token::LParen) {
                    self.p.advance();
                    self.p.skip_parenthesized();
                }
            }
            if !self.p.eat_token(&Token::Comma) {
                break;
            }
        }
        self.push(
            NodeKind::Drop {
                object_kind,
                names,
                if_exists,
            },
            start,
            Vec::new(),
        )
    }
}

/// Splits on commas that are not inside parentheses.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use crate::parser::syntax::{ConstraintKind, FunctionKind, NodeKind, RoutineVerb};
    use crate::parser::tree_builder::parse_batch;

    fn kinds(sql: &str) -> Vec<NodeKind> {
        let tree = parse_batch(sql);
        tree.descendants(tree.root())
            .into_iter()
            .map(|id| tree.kind(id).clone())
            .collect()
    }

    #[test]
    fn test_create_table_columns_and_constraints() {
        let k = kinds(
            "CREATE TABLE dbo.t (
                id INT IDENTITY(1,1) NOT NULL CONSTRAINT pk_t PRIMARY KEY CLUSTERED,
                name NVARCHAR(MAX) COLLATE Latin1_General_CI_AS NULL DEFAULT N'x',
                total AS qty * price PERSISTED,
                CONSTRAINT fk_t FOREIGN KEY (pid) REFERENCES dbo.p (id) ON DELETE CASCADE
            ) ON [PRIMARY]",
        );
        assert!(k.contains(&NodeKind::CreateTable {
            name: "dbo.t".to_string()
        }));
        assert!(k.contains(&NodeKind::ColumnAttribute {
            attribute: "IDENTITY".to_string()
        }));
        assert!(k.contains(&NodeKind::DataType {
            name: "NVARCHAR".to_string(),
            args: Some("MAX".to_string())
        }));
        assert!(k.contains(&NodeKind::ComputedColumn { persisted: true }));
        assert!(k.contains(&NodeKind::Constraint {
            name: Some("pk_t".to_string()),
            kind: ConstraintKind::PrimaryKey,
            clustered: Some(true),
            options: vec![],
        }));
        assert!(k.contains(&NodeKind::Constraint {
            name: Some("fk_t".to_string()),
            kind: ConstraintKind::ForeignKey,
            clustered: None,
            options: vec!["ON DELETE CASCADE".to_string()],
        }));
        assert!(k.contains(&NodeKind::Collate {
            collation: "Latin1_General_CI_AS".to_string()
        }));
        assert!(k.contains(&NodeKind::TableOption {
            option: "ON".to_string()
        }));
    }

    #[test]
    fn test_create_procedure_with_parameters() {
        let k = kinds(
            "CREATE PROCEDURE dbo.p @a INT = 1, @b VARCHAR(10) OUTPUT WITH RECOMPILE AS
             BEGIN
                SELECT @b = 'x'
             END",
        );
        assert!(k.contains(&NodeKind::CreateProcedure {
            name: "dbo.p".to_string(),
            verb: RoutineVerb::Create,
            options: vec!["RECOMPILE".to_string()],
            number: None,
        }));
        assert!(k.contains(&NodeKind::Parameter {
            name: "@b".to_string(),
            output: true,
            readonly: false,
            has_default: false,
        }));
        assert!(k.contains(&NodeKind::VariableAssignment {
            variable: "@b".to_string(),
            operator: "=".to_string()
        }));
    }

    #[test]
    fn test_create_function_kinds() {
        let k = kinds("CREATE FUNCTION f (@x INT) RETURNS INT AS BEGIN RETURN @x END");
        assert!(k.iter().any(|k| matches!(
            k,
            NodeKind::CreateFunction {
                kind: FunctionKind::Scalar,
                ..
            }
        )));
        let k = kinds("CREATE FUNCTION f () RETURNS TABLE AS RETURN SELECT 1 AS a");
        assert!(k.iter().any(|k| matches!(
            k,
            NodeKind::CreateFunction {
                kind: FunctionKind::InlineTable,
                ..
            }
        )));
        assert!(k.contains(&NodeKind::QuerySpec { distinct: false }));
        let k = kinds(
            "CREATE FUNCTION f () RETURNS @r TABLE (a INT) AS BEGIN INSERT @r VALUES (1) RETURN END",
        );
        assert!(k.contains(&NodeKind::ReturnTable {
            variable: "@r".to_string()
        }));
    }

    #[test]
    fn test_create_trigger() {
        let k = kinds("CREATE TRIGGER trg ON dbo.t AFTER INSERT, UPDATE AS BEGIN PRINT 1 END");
        assert!(k.iter().any(|k| matches!(
            k,
            NodeKind::CreateTrigger { timing, events, .. }
                if timing == "AFTER" && events == &vec!["INSERT".to_string(), "UPDATE".to_string()]
        )));
    }

    #[test]
    fn test_create_or_alter_view() {
        let k = kinds("CREATE OR ALTER VIEW v WITH SCHEMABINDING AS SELECT a FROM dbo.t WITH CHECK OPTION");
        assert!(k.contains(&NodeKind::CreateView {
            name: "v".to_string(),
            verb: RoutineVerb::CreateOrAlter,
            options: vec!["SCHEMABINDING".to_string()],
            check_option: true,
        }));
    }

    #[test]
    fn test_alter_table_actions() {
        let k = kinds("ALTER TABLE t ADD a INT NULL, b INT");
        assert!(k.contains(&NodeKind::AlterTableAction {
            action: "ADD".to_string()
        }));
        assert_eq!(
            k.iter().filter(|k| matches!(k, NodeKind::ColumnDef { .. })).count(),
            2
        );
        let k = kinds("ALTER TABLE t WITH NOCHECK ADD CONSTRAINT c CHECK (a > 0)");
        assert!(k.contains(&NodeKind::AlterTableAction {
            action: "WITH NOCHECK ADD".to_string()
        }));
        let k = kinds("ALTER TABLE t DROP COLUMN a, b");
        assert!(k.contains(&NodeKind::AlterTableAction {
            action: "DROP COLUMN".to_string()
        }));
    }

    #[test]
    fn test_create_index_and_type() {
        let k = kinds("CREATE UNIQUE NONCLUSTERED INDEX ix ON t (a) INCLUDE (b) WHERE a > 0 WITH (ONLINE = ON)");
        assert!(k.contains(&NodeKind::CreateIndex {
            name: "ix".to_string(),
            table: "t".to_string(),
            unique: true,
            clustered: Some(false),
            kind: None,
            included: true,
            filtered: true,
            options: vec!["ONLINE".to_string()],
        }));
        let k = kinds("CREATE TYPE dbo.Phone FROM VARCHAR(20) NOT NULL");
        assert!(k.contains(&NodeKind::CreateType {
            name: "dbo.Phone".to_string(),
            base: Some("VARCHAR".to_string()),
            table: false,
        }));
    }

    #[test]
    fn test_create_other_and_drop() {
        let k = kinds("CREATE PARTITION FUNCTION pf (INT) AS RANGE LEFT FOR VALUES (1, 2)");
        assert!(k.contains(&NodeKind::CreateOther {
            object_kind: "PARTITION FUNCTION".to_string(),
            name: "pf".to_string()
        }));
        let k = kinds("DROP TABLE IF EXISTS a, b");
        assert!(k.contains(&NodeKind::Drop {
            object_kind: "TABLE".to_string(),
            names: vec!["a".to_string(), "b".to_string()],
            if_exists: true
        }));
    }
}
