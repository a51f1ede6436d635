//! Section names of the feature matrix used by the classifier.
//!
//! Every name here must exist in the embedded matrix; a missing one is
//! configuration drift.

pub const SELECT: &str = "SELECT";
pub const SELECT_TOP_WO_ORDER_BY: &str = "SelectTopWoOrderBy";
pub const SELECT_RESULT_WO_ORDER_BY: &str = "SelectResultWoOrderBy";
pub const SELECT_TOP: &str = "SELECT TOP";
pub const QUERY_CLAUSES: &str = "Query clauses";
pub const FOR_CLAUSE: &str = "FOR clause";
pub const SET_OPERATORS: &str = "Set operators";
pub const COMMON_TABLE_EXPRESSIONS: &str = "Common table expressions";
pub const JOINS: &str = "Joins";
pub const JOIN_HINTS: &str = "Join hints";
pub const TABLE_HINTS: &str = "Table hints";
pub const QUERY_HINTS: &str = "Query hints";

pub const INSERT: &str = "INSERT";
pub const UPDATE: &str = "UPDATE";
pub const DELETE: &str = "DELETE";
pub const MERGE: &str = "MERGE";
pub const TRUNCATE_TABLE: &str = "TRUNCATE TABLE";
pub const OUTPUT_CLAUSE: &str = "OUTPUT clause";
pub const DML_ON_VIEWS: &str = "DML on views";
pub const COMPOUND_ASSIGNMENT: &str = "Compound assignment";
pub const VARIABLE_ASSIGNMENT: &str = "Variable assignment";
pub const VARIABLE_ASSIGNMENT_DEPENDENCY: &str = "Variable assignment dependency";
pub const IMPLICIT_CONVERSION: &str = "Implicit conversion";

pub const DATATYPES: &str = "Datatypes";
pub const USER_DEFINED_DATATYPES: &str = "User-defined datatypes";
pub const IDENTIFIERS: &str = "Identifiers";
pub const MAX_IDENTIFIER_LENGTH: &str = "Maximum identifier length";
pub const SPECIAL_COLUMN_NAMES: &str = "Special column names";
pub const COLUMN_ATTRIBUTES: &str = "Column attributes";
pub const COMPUTED_COLUMNS: &str = "Computed columns";
pub const CONSTRAINTS: &str = "Constraints";
pub const CONSTRAINT_OPTIONS: &str = "Constraint options";
pub const TABLE_OPTIONS: &str = "Table options";
pub const CREATE_TABLE: &str = "CREATE TABLE";
pub const ALTER_TABLE: &str = "ALTER TABLE";
pub const VIEWS: &str = "Views";
pub const VIEW_OPTIONS: &str = "View options";
pub const PROCEDURES: &str = "Procedures";
pub const PROCEDURE_OPTIONS: &str = "Procedure options";
pub const PARAMETERS: &str = "Parameters";
pub const FUNCTIONS: &str = "Functions";
pub const FUNCTION_OPTIONS: &str = "Function options";
pub const OBJECT_DEFINITIONS: &str = "Object definitions";
pub const TRIGGERS: &str = "Triggers";
pub const TRIGGER_OPTIONS: &str = "Trigger options";
pub const INDEXES: &str = "Indexes";
pub const INDEX_OPTIONS: &str = "Index options";
pub const CREATE_OTHER: &str = "CREATE other";
pub const DROP: &str = "DROP";

pub const VARIABLES: &str = "Variables";
pub const CURSORS: &str = "Cursors";
pub const CURSOR_OPTIONS: &str = "Cursor options";
pub const FETCH_ORIENTATION: &str = "FETCH orientation";
pub const SET_OPTIONS: &str = "SET options";
pub const QUOTED_IDENTIFIER: &str = "Quoted identifier";
pub const CONTROL_FLOW: &str = "Control flow";
pub const ERROR_HANDLING: &str = "Error handling";
pub const RAISERROR_OPTIONS: &str = "RAISERROR options";
pub const WAITFOR: &str = "WAITFOR";
pub const TRANSACTIONS: &str = "Transactions";
pub const DYNAMIC_SQL: &str = "Dynamic SQL";
pub const SYSTEM_STORED_PROCEDURES: &str = "System stored procedures";
pub const PROCEDURE_CALLS: &str = "Procedure calls";
pub const EXECUTE_OPTIONS: &str = "EXECUTE options";
pub const MISC_STATEMENTS: &str = "Miscellaneous statements";
pub const PERMISSIONS: &str = "Permissions";
pub const PARSE_ERRORS: &str = "Parse errors";

pub const SYSTEM_VARIABLES: &str = "System variables";
pub const BUILT_IN_FUNCTIONS: &str = "Built-in functions";
pub const FUNCTIONS_IN_COMPUTED_COLUMN: &str = "Functions in computed column";
pub const USER_DEFINED_FUNCTIONS: &str = "User-defined functions";
pub const TABLE_FUNCTIONS: &str = "Table functions";
pub const XML_METHODS: &str = "XML methods";
pub const WINDOW_FUNCTIONS: &str = "Window functions";
pub const OPERATORS: &str = "Operators";
pub const COLLATIONS: &str = "Collations";
pub const SEQUENCES: &str = "Sequences";

pub const CROSS_DATABASE_REFERENCES: &str = "Cross-database references";
pub const REMOTE_OBJECT_REFERENCES: &str = "Remote object references";
pub const ERROR_CODES: &str = "Error codes";
pub const CATALOG_VIEWS: &str = "Catalog views";
pub const SQLCMD_DIRECTIVES: &str = "SQLCMD directives";

/// Every section the classifier may look up.
pub const ALL: &[&str] = &[
    SELECT,
    SELECT_TOP_WO_ORDER_BY,
    SELECT_RESULT_WO_ORDER_BY,
    SELECT_TOP,
    QUERY_CLAUSES,
    FOR_CLAUSE,
    SET_OPERATORS,
    COMMON_TABLE_EXPRESSIONS,
    JOINS,
    JOIN_HINTS,
    TABLE_HINTS,
    QUERY_HINTS,
    INSERT,
    UPDATE,
    DELETE,
    MERGE,
    TRUNCATE_TABLE,
    OUTPUT_CLAUSE,
    DML_ON_VIEWS,
    COMPOUND_ASSIGNMENT,
    VARIABLE_ASSIGNMENT,
    VARIABLE_ASSIGNMENT_DEPENDENCY,
    IMPLICIT_CONVERSION,
    DATATYPES,
    USER_DEFINED_DATATYPES,
    IDENTIFIERS,
    MAX_IDENTIFIER_LENGTH,
    SPECIAL_COLUMN_NAMES,
    COLUMN_ATTRIBUTES,
    COMPUTED_COLUMNS,
    CONSTRAINTS,
    CONSTRAINT_OPTIONS,
    TABLE_OPTIONS,
    CREATE_TABLE,
    ALTER_TABLE,
    VIEWS,
    VIEW_OPTIONS,
    PROCEDURES,
    PROCEDURE_OPTIONS,
    PARAMETERS,
    FUNCTIONS,
    FUNCTION_OPTIONS,
    OBJECT_DEFINITIONS,
    TRIGGERS,
    TRIGGER_OPTIONS,
    INDEXES,
    INDEX_OPTIONS,
    CREATE_OTHER,
    DROP,
    VARIABLES,
    CURSORS,
    CURSOR_OPTIONS,
    FETCH_ORIENTATION,
    SET_OPTIONS,
    QUOTED_IDENTIFIER,
    CONTROL_FLOW,
    ERROR_HANDLING,
    RAISERROR_OPTIONS,
    WAITFOR,
    TRANSACTIONS,
    DYNAMIC_SQL,
    SYSTEM_STORED_PROCEDURES,
    PROCEDURE_CALLS,
    EXECUTE_OPTIONS,
    MISC_STATEMENTS,
    PERMISSIONS,
    PARSE_ERRORS,
    SYSTEM_VARIABLES,
    BUILT_IN_FUNCTIONS,
    FUNCTIONS_IN_COMPUTED_COLUMN,
    USER_DEFINED_FUNCTIONS,
    TABLE_FUNCTIONS,
    XML_METHODS,
    WINDOW_FUNCTIONS,
    OPERATORS,
    COLLATIONS,
    SEQUENCES,
    CROSS_DATABASE_REFERENCES,
    REMOTE_OBJECT_REFERENCES,
    ERROR_CODES,
    CATALOG_VIEWS,
    SQLCMD_DIRECTIVES,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ConfigMatrix, FeatureMatrix};

    #[test]
    fn test_every_section_is_in_embedded_matrix() {
        let matrix = ConfigMatrix::embedded().unwrap();
        let missing: Vec<&str> = ALL
            .iter()
            .copied()
            .filter(|s| !matrix.exists(s, None))
            .collect();
        assert!(missing.is_empty(), "missing sections: {:?}", missing);
    }
}
