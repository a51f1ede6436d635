//! Coarse static typing of expressions and declared types

use super::symbols::SymbolTable;
use crate::parser::{LiteralKind, NodeId, NodeKind, SyntaxTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    Numeric,
    String,
    DateTime,
    Binary,
    Null,
    Unknown,
}

const NUMERIC_TYPES: &[&str] = &[
    "BIT", "TINYINT", "SMALLINT", "INT", "INTEGER", "BIGINT", "DECIMAL", "DEC", "NUMERIC", "MONEY",
    "SMALLMONEY", "FLOAT", "REAL", "DOUBLE PRECISION",
];

const STRING_TYPES: &[&str] = &[
    "CHAR", "CHARACTER", "VARCHAR", "CHAR VARYING", "CHARACTER VARYING", "NCHAR", "NVARCHAR",
    "NATIONAL CHAR", "NATIONAL CHARACTER", "NATIONAL CHARACTER VARYING", "TEXT", "NTEXT", "SYSNAME",
    "XML",
];

const DATETIME_TYPES: &[&str] = &[
    "DATE", "TIME", "DATETIME", "DATETIME2", "SMALLDATETIME", "DATETIMEOFFSET",
];

const BINARY_TYPES: &[&str] = &[
    "BINARY", "VARBINARY", "BINARY VARYING", "IMAGE", "TIMESTAMP", "ROWVERSION", "UNIQUEIDENTIFIER",
];

const DATETIME_FUNCTIONS: &[&str] = &[
    "GETDATE", "GETUTCDATE", "SYSDATETIME", "SYSUTCDATETIME", "SYSDATETIMEOFFSET", "DATEADD",
    "EOMONTH", "DATEFROMPARTS", "DATETIMEFROMPARTS", "DATETIME2FROMPARTS", "SMALLDATETIMEFROMPARTS",
    "TIMEFROMPARTS", "SWITCHOFFSET", "TODATETIMEOFFSET", "DATETRUNC",
];

const STRING_FUNCTIONS: &[&str] = &[
    "SUBSTRING", "LEFT", "RIGHT", "UPPER", "LOWER", "LTRIM", "RTRIM", "TRIM", "REPLACE", "CONCAT",
    "CONCAT_WS", "STUFF", "REPLICATE", "REVERSE", "CHAR", "NCHAR", "SPACE", "FORMAT", "DATENAME",
    "QUOTENAME", "STR", "STRING_AGG", "TRANSLATE", "OBJECT_NAME", "DB_NAME", "SUSER_SNAME",
    "USER_NAME", "APP_NAME", "HOST_NAME", "ERROR_MESSAGE", "ERROR_PROCEDURE", "NEWID_STRING",
];

const NUMERIC_FUNCTIONS: &[&str] = &[
    "LEN", "DATALENGTH", "DATEDIFF", "DATEDIFF_BIG", "DATEPART", "YEAR", "MONTH", "DAY", "COUNT",
    "COUNT_BIG", "ABS", "CEILING", "FLOOR", "ROUND", "POWER", "SQRT", "SIGN", "CHARINDEX",
    "PATINDEX", "ASCII", "UNICODE", "ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "ERROR_NUMBER",
    "ERROR_SEVERITY", "ERROR_STATE", "ERROR_LINE", "OBJECT_ID", "DB_ID", "SCOPE_IDENTITY",
    "IDENT_CURRENT", "@@ROWCOUNT", "RAND", "ISNUMERIC", "ISDATE", "SUM", "AVG",
];

const STRING_SYSTEM_VARIABLES: &[&str] = &["@@SERVERNAME", "@@SERVICENAME", "@@VERSION", "@@LANGUAGE"];

/// Upper-cased type name without length/precision suffix, brackets or a
/// `sys.` qualifier.
pub fn base_type_name(type_text: &str) -> String {
    let without_args = match type_text.find('(') {
        Some(open) => &type_text[..open],
        None => type_text,
    };
    let unbracketed: String = without_args
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '"'))
        .collect();
    let collapsed = unbracketed.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = collapsed.to_ascii_uppercase();
    match upper.strip_prefix("SYS.") {
        Some(rest) => rest.to_string(),
        None => upper,
    }
}

/// Category of a declared type name, after stripping any suffix.
pub fn classify_type_name(type_text: &str) -> DataCategory {
    let base = base_type_name(type_text);
    let base = base.as_str();
    if NUMERIC_TYPES.contains(&base) {
        DataCategory::Numeric
    } else if STRING_TYPES.contains(&base) {
        DataCategory::String
    } else if DATETIME_TYPES.contains(&base) {
        DataCategory::DateTime
    } else if BINARY_TYPES.contains(&base) {
        DataCategory::Binary
    } else {
        DataCategory::Unknown
    }
}

/// Category from literal shape alone, if the text is a literal.
pub fn classify_literal_text(text: &str) -> Option<DataCategory> {
    let trimmed = text.trim();
    let first = trimmed.chars().next()?;
    if first == '\'' {
        return Some(DataCategory::String);
    }
    if (first == 'N' || first == 'n') && trimmed[1..].starts_with('\'') {
        return Some(DataCategory::String);
    }
    if trimmed.len() > 1 && (trimmed.starts_with("0x") || trimmed.starts_with("0X")) {
        return Some(DataCategory::Binary);
    }
    let unsigned = trimmed.trim_start_matches(['-', '+']);
    if unsigned
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || (c == '.' && unsigned.len() > 1))
    {
        return Some(DataCategory::Numeric);
    }
    if trimmed.eq_ignore_ascii_case("NULL") {
        return Some(DataCategory::Null);
    }
    None
}

/// Resolves a declared type through user-defined types to a category.
fn classify_declared(type_text: &str, symbols: &SymbolTable, default_schema: &str) -> DataCategory {
    match classify_type_name(type_text) {
        DataCategory::Unknown => {
            let key = super::names::ResolvedName::resolve(type_text).symbol_key(default_schema);
            match symbols.type_base(&key) {
                Some(base) => classify_type_name(base),
                None => DataCategory::Unknown,
            }
        }
        known => known,
    }
}

/// Classifies free text: a literal, a variable, or a type name.
///
/// Unknown variables are assumed numeric; anything else unmatched is
/// `Unknown`.
pub fn classify_text(text: &str, symbols: &SymbolTable, default_schema: &str) -> DataCategory {
    if let Some(category) = classify_literal_text(text) {
        return category;
    }
    let trimmed = text.trim();
    if trimmed.starts_with("@@") {
        return system_variable_category(trimmed);
    }
    if trimmed.starts_with('@') {
        return match symbols.variable_type(trimmed) {
            Some(base) => classify_declared(base, symbols, default_schema),
            None => DataCategory::Numeric,
        };
    }
    classify_declared(trimmed, symbols, default_schema)
}

fn system_variable_category(name: &str) -> DataCategory {
    if STRING_SYSTEM_VARIABLES.iter().any(|v| v.eq_ignore_ascii_case(name)) {
        DataCategory::String
    } else {
        DataCategory::Numeric
    }
}

/// Typing environment of an expression.
pub struct TypeEnv<'a> {
    pub symbols: &'a SymbolTable,
    pub default_schema: &'a str,
    /// Whether double-quoted tokens are identifiers (`QUOTED_IDENTIFIER ON`).
    pub quoted_identifier: bool,
}

/// Classifies an expression node.
pub fn classify_expr(tree: &SyntaxTree, id: NodeId, env: &TypeEnv<'_>) -> DataCategory {
    match tree.kind(id) {
        NodeKind::Literal { kind } => match kind {
            LiteralKind::String | LiteralKind::NationalString => DataCategory::String,
            LiteralKind::Number => DataCategory::Numeric,
            LiteralKind::Hex => DataCategory::Binary,
            LiteralKind::Null => DataCategory::Null,
        },
        NodeKind::Identifier { name, quote } => {
            if *quote == Some('"') && !env.quoted_identifier {
                DataCategory::String
            } else if is_datetime_niladic(name) {
                DataCategory::DateTime
            } else {
                DataCategory::Unknown
            }
        }
        NodeKind::Variable { name } => match env.symbols.variable_type(name) {
            Some(base) => classify_declared(base, env.symbols, env.default_schema),
            None => DataCategory::Numeric,
        },
        NodeKind::SystemVariable { name } => system_variable_category(name),
        NodeKind::DataType { name, .. } => classify_declared(name, env.symbols, env.default_schema),
        NodeKind::FunctionCall { name } => classify_call(tree, id, name, env),
        NodeKind::BinaryOp { op } => {
            let children = tree.children(id);
            let (Some(left), Some(right)) = (children.first(), children.get(1)) else {
                return DataCategory::Unknown;
            };
            let left = classify_expr(tree, *left, env);
            let right = classify_expr(tree, *right, env);
            combine_binary(op, left, right)
        }
        NodeKind::UnaryOp { .. } | NodeKind::Collate { .. } => tree
            .child(id, 0)
            .map_or(DataCategory::Unknown, |c| classify_expr(tree, c, env)),
        NodeKind::Comparison { .. }
        | NodeKind::InList { .. }
        | NodeKind::InSubquery { .. }
        | NodeKind::Between { .. }
        | NodeKind::Like { .. }
        | NodeKind::IsNull { .. }
        | NodeKind::Exists => DataCategory::Numeric,
        NodeKind::NextValueFor { .. } => DataCategory::Numeric,
        _ => DataCategory::Unknown,
    }
}

fn is_datetime_niladic(name: &str) -> bool {
    name.eq_ignore_ascii_case("CURRENT_TIMESTAMP")
}

fn classify_call(tree: &SyntaxTree, id: NodeId, name: &str, env: &TypeEnv<'_>) -> DataCategory {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "CAST" | "TRY_CAST" => tree
            .child(id, 1)
            .map_or(DataCategory::Unknown, |t| classify_expr(tree, t, env)),
        "CONVERT" | "TRY_CONVERT" => tree
            .child(id, 0)
            .map_or(DataCategory::Unknown, |t| classify_expr(tree, t, env)),
        "ISNULL" | "COALESCE" => tree
            .children(id)
            .iter()
            .map(|c| classify_expr(tree, *c, env))
            .find(|c| !matches!(c, DataCategory::Null | DataCategory::Unknown))
            .unwrap_or(DataCategory::Unknown),
        _ if DATETIME_FUNCTIONS.contains(&upper.as_str()) => DataCategory::DateTime,
        _ if STRING_FUNCTIONS.contains(&upper.as_str()) => DataCategory::String,
        _ if NUMERIC_FUNCTIONS.contains(&upper.as_str()) => DataCategory::Numeric,
        _ => {
            let key = super::names::ResolvedName::resolve(name).symbol_key(env.default_schema);
            match env.symbols.scalar_function_type(&key) {
                Some(return_type) => classify_declared(return_type, env.symbols, env.default_schema),
                None => DataCategory::Unknown,
            }
        }
    }
}

fn combine_binary(op: &str, left: DataCategory, right: DataCategory) -> DataCategory {
    use DataCategory::*;
    match op {
        "+" => match (left, right) {
            (String, _) | (_, String) => String,
            (DateTime, _) | (_, DateTime) => DateTime,
            (Numeric, Numeric) => Numeric,
            (Binary, Binary) => Binary,
            (Null, _) | (_, Null) => Null,
            _ => Unknown,
        },
        "-" => match (left, right) {
            (DateTime, _) | (_, DateTime) => DateTime,
            (Numeric, Numeric) => Numeric,
            _ => Unknown,
        },
        _ => match (left, right) {
            (Numeric, Numeric) => Numeric,
            _ => Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::symbols::Symbol;
    use crate::parser::parse_batch;

    #[test]
    fn test_type_names_strip_suffix() {
        assert_eq!(classify_type_name("varchar(50)"), DataCategory::String);
        assert_eq!(classify_type_name("[DECIMAL] (10, 2)"), DataCategory::Numeric);
        assert_eq!(classify_type_name("sys.datetime2(7)"), DataCategory::DateTime);
        assert_eq!(classify_type_name("uniqueidentifier"), DataCategory::Binary);
        assert_eq!(classify_type_name("geography"), DataCategory::Unknown);
    }

    #[test]
    fn test_literal_shape_wins() {
        let symbols = SymbolTable::new();
        assert_eq!(classify_text("'2020-01-01'", &symbols, "dbo"), DataCategory::String);
        assert_eq!(classify_text("N'x'", &symbols, "dbo"), DataCategory::String);
        assert_eq!(classify_text("0x1F", &symbols, "dbo"), DataCategory::Binary);
        assert_eq!(classify_text("-12.5", &symbols, "dbo"), DataCategory::Numeric);
        assert_eq!(classify_text("null", &symbols, "dbo"), DataCategory::Null);
        assert_eq!(classify_text("INT", &symbols, "dbo"), DataCategory::Numeric);
        assert_eq!(classify_text("Phone", &symbols, "dbo"), DataCategory::Unknown);
    }

    #[test]
    fn test_variables_resolve_through_symbols() {
        let mut symbols = SymbolTable::new();
        symbols.enter_batch(0);
        symbols.declare(
            "@d",
            Symbol::Variable {
                base_type: "SMALLDATETIME".to_string(),
            },
        );
        symbols.declare(
            "@p",
            Symbol::Variable {
                base_type: "PHONE".to_string(),
            },
        );
        symbols.declare(
            "dbo.Phone",
            Symbol::UserDefinedType {
                base: "VARCHAR".to_string(),
            },
        );
        assert_eq!(classify_text("@d", &symbols, "dbo"), DataCategory::DateTime);
        assert_eq!(classify_text("@p", &symbols, "dbo"), DataCategory::String);
        assert_eq!(classify_text("@unknown", &symbols, "dbo"), DataCategory::Numeric);
    }

    #[test]
    fn test_expression_categories() {
        let symbols = SymbolTable::new();
        let env = TypeEnv {
            symbols: &symbols,
            default_schema: "dbo",
            quoted_identifier: true,
        };
        let tree = parse_batch("SELECT 'a' + 'b', GETDATE() - 1, CAST(1 AS DATE), 1 + 2");
        let categories: Vec<DataCategory> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|id| matches!(tree.kind(*id), NodeKind::SelectItem { .. }))
            .map(|item| classify_expr(&tree, tree.children(item)[0], &env))
            .collect();
        assert_eq!(
            categories,
            vec![
                DataCategory::String,
                DataCategory::DateTime,
                DataCategory::DateTime,
                DataCategory::Numeric
            ]
        );
    }

    #[test]
    fn test_double_quoted_token_is_string_when_quoted_identifier_off() {
        let symbols = SymbolTable::new();
        let tree = parse_batch("SELECT \"abc\"");
        let id = tree
            .descendants(tree.root())
            .into_iter()
            .find(|id| matches!(tree.kind(*id), NodeKind::Identifier { .. }))
            .unwrap();
        let mut env = TypeEnv {
            symbols: &symbols,
            default_schema: "dbo",
            quoted_identifier: true,
        };
        assert_eq!(classify_expr(&tree, id, &env), DataCategory::Unknown);
        env.quoted_identifier = false;
        assert_eq!(classify_expr(&tree, id, &env), DataCategory::String);
    }
}
