//! Advisory SQL syntax diagnostics.
//!
//! Runs the text through `sqlparser` for the chosen dialect and reports the
//! first syntax error with its line/column and a fix suggestion. The lenient
//! DDL parser in [`crate::core::sql_parser`] never depends on this check; it is
//! purely informational for the editor and the `check` command.

use crate::core::dialect::SqlDialect;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::{Parser, ParserError};

/// Severity level for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The statement will not run as written
    Error,
    Warning,
    Hint,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// Position in SQL source code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    /// Byte offset from start of string
    pub offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Create position from a byte offset in source text
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;

        for (idx, ch) in source.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            line,
            column,
            offset,
        }
    }

    /// Inverse of [`SourcePosition::from_offset`] for a known line/column
    pub fn from_line_column(source: &str, line: usize, column: usize) -> Self {
        let line_start: usize = source
            .split_inclusive('\n')
            .take(line.saturating_sub(1))
            .map(str::len)
            .sum();
        let offset = source[line_start.min(source.len())..]
            .char_indices()
            .nth(column.saturating_sub(1))
            .map(|(idx, _)| line_start + idx)
            .unwrap_or(source.len());
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Span in SQL source code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    pub fn single_position(pos: SourcePosition) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// One diagnostic with optional position and fix suggestion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SqlDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<SourceSpan>,
    /// Stable code for programmatic handling
    pub code: String,
    pub suggestion: Option<String>,
}

impl SqlDiagnostic {
    fn with_severity(severity: Severity, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            span: None,
            code: code.into(),
            suggestion: None,
        }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message, code)
    }

    pub fn warning(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message, code)
    }

    pub fn hint(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::with_severity(Severity::Hint, message, code)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for SqlDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(ref span) = self.span {
            write!(
                f,
                " at line {}, column {}",
                span.start.line, span.start.column
            )?;
        }
        Ok(())
    }
}

/// Result of a syntax check
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SqlCheckReport {
    pub diagnostics: Vec<SqlDiagnostic>,
    /// No error-level diagnostics (warnings and hints are fine)
    pub is_valid: bool,
    pub statement_count: usize,
    pub table_count: usize,
}

impl SqlCheckReport {
    fn push(&mut self, diagnostic: SqlDiagnostic) {
        if diagnostic.severity == Severity::Error {
            self.is_valid = false;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn errors(&self) -> impl Iterator<Item = &SqlDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// Plain-text listing for terminals
    pub fn format_for_display(&self) -> String {
        let mut output = String::new();

        for diag in &self.diagnostics {
            output.push_str(&diag.severity.to_string());
            if let Some(ref span) = diag.span {
                output.push_str(&format!(" [L{}:{}]", span.start.line, span.start.column));
            }
            output.push_str(": ");
            output.push_str(&diag.message);
            output.push('\n');

            if let Some(ref suggestion) = diag.suggestion {
                output.push_str(&format!("  suggestion: {}\n", suggestion));
            }
        }

        if self.diagnostics.is_empty() {
            output.push_str("No issues found\n");
        }

        output.push_str(&format!(
            "{} statements, {} tables",
            self.statement_count, self.table_count
        ));
        output
    }
}

/// sqlparser dialect matching a target dialect
pub fn sqlparser_dialect(dialect: SqlDialect) -> Box<dyn Dialect> {
    match dialect {
        SqlDialect::MySQL => Box::new(MySqlDialect {}),
        SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
        SqlDialect::SQLite => Box::new(SQLiteDialect {}),
        SqlDialect::SqlServer => Box::new(MsSqlDialect {}),
    }
}

/// Check `sql` against the grammar of `dialect`
pub fn check_sql(sql: &str, dialect: SqlDialect) -> SqlCheckReport {
    let mut report = SqlCheckReport {
        is_valid: true,
        ..Default::default()
    };

    let parser_dialect = sqlparser_dialect(dialect);
    match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(statements) => {
            report.statement_count = statements.len();
            report.table_count = statements
                .iter()
                .filter(|s| matches!(s, Statement::CreateTable(_)))
                .count();
            if report.table_count == 0 {
                report.push(
                    SqlDiagnostic::warning("No CREATE TABLE statement found", "W001_NO_TABLES")
                        .with_suggestion("Only table definitions are imported into the diagram."),
                );
            }
        }
        Err(e) => {
            tracing::debug!(%dialect, error = %e, "SQL syntax check failed");
            report.push(parser_error_to_diagnostic(sql, &e));
        }
    }

    report
}

fn parser_error_to_diagnostic(sql: &str, error: &ParserError) -> SqlDiagnostic {
    let message = error.to_string();
    let mut diagnostic = SqlDiagnostic::error(message.clone(), "E001_SYNTAX_ERROR");

    // sqlparser format: "Expected: ..., found: ... at Line: X, Column: Y"
    if let (Some(line), Some(column)) = extract_position(&message) {
        let pos = SourcePosition::from_line_column(sql, line, column);
        diagnostic = diagnostic.with_span(SourceSpan::single_position(pos));
    }

    if let Some(suggestion) = syntax_suggestion(&message) {
        diagnostic = diagnostic.with_suggestion(suggestion);
    }

    diagnostic
}

fn extract_position(message: &str) -> (Option<usize>, Option<usize>) {
    let number_after = |label: &str| {
        let start = message.rfind(label)? + label.len();
        let digits: String = message[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        digits.parse::<usize>().ok()
    };
    (number_after("Line: "), number_after("Column: "))
}

fn syntax_suggestion(message: &str) -> Option<&'static str> {
    if message.contains("identifier") {
        Some("Make sure you have a valid table or column name.")
    } else if message.contains("Expected: )") {
        Some("Check for matching parentheses.")
    } else if message.contains("Expected: ;") || message.contains("end of statement") {
        Some("Add a semicolon at the end of the statement.")
    } else if message.contains("Expected: ,") {
        Some("Separate column definitions with commas.")
    } else if message.contains("Expected") {
        Some("Check for typos in SQL keywords.")
    } else {
        None
    }
}
