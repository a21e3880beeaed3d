//! Lenient SQL DDL parser.
//!
//! Reads `CREATE TABLE` (and `ALTER TABLE ... ADD`) statements into a
//! [`Schema`]. The text is tokenized with `sqlparser`, then walked clause by
//! clause. Parsing is skip-and-continue:
//! - a malformed `CREATE TABLE` statement (missing name, no column list,
//!   unbalanced parentheses, no usable columns) is skipped and recorded in
//!   [`ParseReport::skipped`]
//! - a malformed column clause or an unresolvable foreign key is dropped and
//!   recorded in [`ParseReport::warnings`]
//! - anything that is not a table definition (`CREATE INDEX`, `INSERT`, ...) is ignored
//!
//! [`ParseError`] is only returned when nothing usable is left: the text
//! cannot be tokenized, has no `CREATE TABLE` at all, or every one of them
//! was skipped.
//!
//! Types and default expressions are kept verbatim (`DECIMAL(10,2)` stays
//! `DECIMAL(10,2)`), except that every autoincrement spelling is folded back
//! to the dialect-neutral `SERIAL` / `BIGSERIAL`.

use crate::core::dialect::SerialKind;
use crate::core::schema::{
    Entity, EntityId, Field, Position, Relationship, RelationshipType, Schema,
};
use sqlparser::dialect::Dialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, Whitespace};
use std::collections::HashSet;

/// Grid used for entities that carry no position comment
const LAYOUT_START: f64 = 100.0;
const LAYOUT_COLUMNS: usize = 3;
const LAYOUT_CELL_WIDTH: f64 = 300.0;
const LAYOUT_CELL_HEIGHT: f64 = 250.0;

/// Keywords that end a column's type and start its modifier list
const COLUMN_MODIFIERS: &[Keyword] = &[
    Keyword::PRIMARY,
    Keyword::NOT,
    Keyword::NULL,
    Keyword::UNIQUE,
    Keyword::DEFAULT,
    Keyword::REFERENCES,
    Keyword::CHECK,
    Keyword::CONSTRAINT,
    Keyword::AUTO_INCREMENT,
    Keyword::AUTOINCREMENT,
    Keyword::IDENTITY,
    Keyword::COLLATE,
    Keyword::GENERATED,
    Keyword::COMMENT,
    Keyword::ON,
    Keyword::CHARSET,
    Keyword::AS,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no CREATE TABLE statement found")]
    NoTables,
    /// The text could not be tokenized, or every table definition was
    /// malformed; carries the first failure
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// A table definition that was dropped
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStatement {
    /// 1-based line of the statement's first token
    pub line: usize,
    pub reason: String,
    /// Start of the statement text, for display
    pub snippet: String,
}

/// Parsed schema plus everything that was dropped on the way
#[derive(Debug, Clone, Default)]
pub struct ParseReport {
    pub schema: Schema,
    pub skipped: Vec<SkippedStatement>,
    pub warnings: Vec<String>,
}

/// Parse DDL text into a schema, discarding diagnostics
pub fn parse(sql: &str) -> Result<Schema, ParseError> {
    parse_with_report(sql).map(|report| report.schema)
}

/// Parse DDL text into a schema and report what was skipped
pub fn parse_with_report(sql: &str) -> Result<ParseReport, ParseError> {
    let lexemes = lex(sql)?;
    let mut builder = SchemaBuilder::new();

    for statement in split_statements(lexemes) {
        builder.statement(&statement);
    }

    builder.finish()
}

/// Deterministic first-render position for the `index`-th entity
pub fn default_position(index: usize) -> Position {
    Position::new(
        LAYOUT_START + (index % LAYOUT_COLUMNS) as f64 * LAYOUT_CELL_WIDTH,
        LAYOUT_START + (index / LAYOUT_COLUMNS) as f64 * LAYOUT_CELL_HEIGHT,
    )
}

// ============================================================================
// Tokens
// ============================================================================

/// Identifier rules shared by the supported engines: `"..."`, `` `...` ``
/// and `[...]` all delimit identifiers.
#[derive(Debug)]
struct DdlDialect;

impl Dialect for DdlDialect {
    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        matches!(ch, '"' | '`' | '[')
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        ch.is_alphanumeric() || matches!(ch, '_' | '$' | '@' | '#')
    }
}

/// A token together with the source text it was read from
#[derive(Clone, Debug)]
struct Lexeme<'a> {
    token: Token,
    /// Raw source text including delimiters
    text: &'a str,
    line: usize,
    start: usize,
    end: usize,
}

impl Lexeme<'_> {
    /// `NoKeyword` for anything but an unquoted keyword
    fn keyword(&self) -> Keyword {
        match &self.token {
            Token::Word(word) => word.keyword,
            _ => Keyword::NoKeyword,
        }
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.keyword() == keyword
    }

    /// Unquoted word outside the keyword table
    fn is_word_ci(&self, word: &str) -> bool {
        matches!(&self.token, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word))
    }

    fn is_comment(&self) -> bool {
        matches!(
            self.token,
            Token::Whitespace(Whitespace::SingleLineComment { .. } | Whitespace::MultiLineComment(_))
        )
    }

    fn is_identifier(&self) -> bool {
        matches!(
            self.token,
            Token::Word(_) | Token::SingleQuotedString(_) | Token::DoubleQuotedString(_)
        )
    }

    /// Identifier text with delimiters stripped and escapes resolved
    fn identifier(&self) -> String {
        match &self.token {
            Token::Word(word) => word.value.clone(),
            Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => s.clone(),
            _ => self.text.to_string(),
        }
    }
}

/// Maps tokenizer locations (1-based line, 1-based char column) to byte offsets
struct LineIndex<'a> {
    src: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(src: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { src, starts }
    }

    fn offset(&self, location: Location) -> usize {
        let line_start = usize::try_from(location.line)
            .ok()
            .and_then(|line| line.checked_sub(1))
            .and_then(|line| self.starts.get(line).copied());
        let Some(line_start) = line_start else {
            return self.src.len();
        };
        let column = usize::try_from(location.column).unwrap_or(0).saturating_sub(1);
        self.src[line_start..]
            .char_indices()
            .nth(column)
            .map_or(self.src.len(), |(i, _)| line_start + i)
    }
}

/// Tokenize `sql`, dropping blanks but keeping comments
fn lex(sql: &str) -> Result<Vec<Lexeme<'_>>, ParseError> {
    let tokens = Tokenizer::new(&DdlDialect, sql)
        .tokenize_with_location()
        .map_err(|e| ParseError::Malformed {
            line: usize::try_from(e.location.line).unwrap_or(0).max(1),
            reason: e.message,
        })?;

    let index = LineIndex::new(sql);
    let lexemes = tokens
        .into_iter()
        .filter(|TokenWithSpan { token, .. }| match token {
            Token::EOF => false,
            Token::Whitespace(whitespace) => !matches!(
                whitespace,
                Whitespace::Space | Whitespace::Newline | Whitespace::Tab
            ),
            _ => true,
        })
        .map(|TokenWithSpan { token, span }| {
            let start = index.offset(span.start);
            let end = index.offset(span.end).max(start);
            Lexeme {
                token,
                text: sql.get(start..end).unwrap_or_default(),
                line: usize::try_from(span.start.line).unwrap_or(0).max(1),
                start,
                end,
            }
        })
        .collect();

    Ok(lexemes)
}

/// Tokens of one `;`-terminated statement plus the comments right before it
#[derive(Default)]
struct Statement<'a> {
    tokens: Vec<Lexeme<'a>>,
    comments: Vec<Lexeme<'a>>,
}

fn split_statements(lexemes: Vec<Lexeme<'_>>) -> Vec<Statement<'_>> {
    let mut statements = Vec::new();
    let mut current = Statement::default();

    for lexeme in lexemes {
        if lexeme.token == Token::SemiColon {
            if !current.tokens.is_empty() {
                statements.push(std::mem::take(&mut current));
            }
        } else if lexeme.is_comment() {
            if current.tokens.is_empty() {
                current.comments.push(lexeme);
            }
        } else {
            current.tokens.push(lexeme);
        }
    }
    if !current.tokens.is_empty() {
        statements.push(current);
    }

    statements
}

/// Split on commas that are not nested in parentheses
fn split_top_level<'t, 'a>(tokens: &'t [Lexeme<'a>]) -> Vec<&'t [Lexeme<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, lexeme) in tokens.iter().enumerate() {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);

    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

fn matching_paren(tokens: &[Lexeme<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, lexeme) in tokens.iter().enumerate().skip(open) {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rebuild source text from tokens, collapsing any gap to a single space
fn raw_text(tokens: &[Lexeme<'_>]) -> String {
    let mut out = String::new();
    let mut prev_end = None;
    for lexeme in tokens {
        if let Some(end) = prev_end
            && lexeme.start > end
        {
            out.push(' ');
        }
        out.push_str(lexeme.text);
        prev_end = Some(lexeme.end);
    }
    out
}

/// First identifier of each comma-separated entry: `(a, b DESC, c(10))` → `[a, b, c]`
fn column_list(tokens: &[Lexeme<'_>]) -> Vec<String> {
    split_top_level(tokens)
        .into_iter()
        .filter_map(|part| part.first().filter(|t| t.is_identifier()))
        .map(Lexeme::identifier)
        .collect()
}

struct Cursor<'t, 'a> {
    tokens: &'t [Lexeme<'a>],
    pos: usize,
}

impl<'t, 'a> Cursor<'t, 'a> {
    fn new(tokens: &'t [Lexeme<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Lexeme<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'t Lexeme<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn next(&mut self) -> Option<&'t Lexeme<'a>> {
        let lexeme = self.tokens.get(self.pos);
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn rest(&self) -> &'t [Lexeme<'a>] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_token(&self, token: &Token) -> bool {
        self.peek().is_some_and(|t| &t.token == token)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    /// Consume the whole keyword sequence or nothing
    fn eat_keywords(&mut self, keywords: &[Keyword]) -> bool {
        let matched = keywords
            .iter()
            .enumerate()
            .all(|(i, kw)| self.peek_nth(i).is_some_and(|t| t.is_keyword(*kw)));
        if matched {
            self.pos += keywords.len();
        }
        matched
    }

    /// Consume one of the keywords if present
    fn eat_any(&mut self, keywords: &[Keyword]) -> bool {
        keywords.iter().any(|kw| self.eat_keyword(*kw))
    }

    fn eat_word_ci(&mut self, word: &str) -> bool {
        let found = self.peek().is_some_and(|t| t.is_word_ci(word));
        if found {
            self.pos += 1;
        }
        found
    }

    /// `schema.table` → `table`
    fn qualified_name(&mut self) -> Option<String> {
        let mut name = self.peek().filter(|t| t.is_identifier())?.identifier();
        self.pos += 1;
        while self.at_token(&Token::Period) {
            match self.peek_nth(1) {
                Some(part) if part.is_identifier() => {
                    name = part.identifier();
                    self.pos += 2;
                }
                _ => break,
            }
        }
        Some(name)
    }

    /// Consume a parenthesized group and return its inner tokens. An
    /// unterminated group swallows the rest of the clause.
    fn group(&mut self) -> Option<&'t [Lexeme<'a>]> {
        if !self.at_token(&Token::LParen) {
            return None;
        }
        let open = self.pos;
        let close = matching_paren(self.tokens, open).unwrap_or(self.tokens.len());
        self.pos = (close + 1).min(self.tokens.len());
        Some(&self.tokens[open + 1..close.max(open + 1)])
    }
}

fn is_modifier(tokens: &[Lexeme<'_>], index: usize) -> bool {
    let Some(lexeme) = tokens.get(index) else {
        return false;
    };
    let keyword = lexeme.keyword();
    COLUMN_MODIFIERS.contains(&keyword)
        || (keyword == Keyword::CHARACTER
            && tokens.get(index + 1).is_some_and(|t| t.is_keyword(Keyword::SET)))
}

/// Token index where a run starting at `start` ends: the next modifier word
/// outside parentheses. The token at `start` itself is always included when
/// `include_first` is set.
fn run_end(tokens: &[Lexeme<'_>], start: usize, include_first: bool) -> usize {
    let mut depth = 0usize;
    let mut pos = start;
    while let Some(lexeme) = tokens.get(pos) {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && !(include_first && pos == start) && is_modifier(tokens, pos) => {
                break;
            }
            _ => {}
        }
        pos += 1;
    }
    pos
}

// ============================================================================
// Clause parsing
// ============================================================================

struct ColumnDef {
    name: String,
    data_type: String,
    primary_key: bool,
    not_null: bool,
    unique: bool,
    default_value: Option<String>,
    auto_increment: bool,
    /// Inline `REFERENCES table(column)`
    reference: Option<(String, Option<String>)>,
}

impl ColumnDef {
    fn into_field(self, id: String) -> Field {
        let data_type = match (self.auto_increment, serial_for(&self.data_type)) {
            (true, Some(kind)) => kind.canonical().to_string(),
            _ => self.data_type,
        };
        Field {
            is_primary_key: self.primary_key,
            is_not_null: self.not_null,
            is_unique: self.unique,
            default_value: self.default_value,
            ..Field::new(id, self.name, data_type)
        }
    }
}

/// Integer types that an autoincrement modifier turns into a serial
fn serial_for(data_type: &str) -> Option<SerialKind> {
    let base = data_type
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()?
        .to_ascii_uppercase();
    match base.as_str() {
        "INT" | "INTEGER" | "INT4" | "MEDIUMINT" | "SERIAL" => Some(SerialKind::Serial),
        "BIGINT" | "INT8" | "BIGSERIAL" => Some(SerialKind::BigSerial),
        _ => None,
    }
}

fn parse_column(tokens: &[Lexeme<'_>]) -> Result<ColumnDef, String> {
    let name = match tokens.first() {
        Some(lexeme) if lexeme.is_identifier() => lexeme.identifier(),
        Some(lexeme) => {
            return Err(format!("unexpected '{}' where a column name was expected", lexeme.text));
        }
        None => return Err("empty column definition".into()),
    };

    let type_end = run_end(tokens, 1, false);
    let data_type = raw_text(&tokens[1..type_end]);
    if data_type.is_empty() {
        return Err(format!("column '{}' has no type", name));
    }

    let mut column = ColumnDef {
        name,
        data_type,
        primary_key: false,
        not_null: false,
        unique: false,
        default_value: None,
        auto_increment: false,
        reference: None,
    };

    let mut cursor = Cursor::new(tokens);
    cursor.pos = type_end;

    while let Some(lexeme) = cursor.next() {
        match lexeme.keyword() {
            Keyword::PRIMARY => {
                cursor.eat_keyword(Keyword::KEY);
                column.primary_key = true;
            }
            Keyword::NOT => {
                if cursor.eat_keyword(Keyword::NULL) {
                    column.not_null = true;
                }
            }
            Keyword::UNIQUE => {
                cursor.eat_keyword(Keyword::KEY);
                column.unique = true;
            }
            Keyword::DEFAULT => {
                let end = run_end(tokens, cursor.pos, true);
                let value = raw_text(&tokens[cursor.pos..end]);
                cursor.pos = end;
                if !value.is_empty() {
                    column.default_value = Some(value);
                }
            }
            Keyword::REFERENCES => {
                if let Some(table) = cursor.qualified_name() {
                    let referenced = cursor
                        .group()
                        .and_then(|inner| column_list(inner).into_iter().next());
                    column.reference = Some((table, referenced));
                }
            }
            Keyword::AUTO_INCREMENT | Keyword::AUTOINCREMENT => column.auto_increment = true,
            Keyword::IDENTITY => {
                column.auto_increment = true;
                cursor.group();
            }
            Keyword::GENERATED => {
                cursor.eat_keyword(Keyword::ALWAYS);
                cursor.eat_keywords(&[Keyword::BY, Keyword::DEFAULT]);
                if cursor.eat_keyword(Keyword::AS) {
                    if cursor.eat_keyword(Keyword::IDENTITY) {
                        column.auto_increment = true;
                    }
                    cursor.group();
                    cursor.eat_any(&[Keyword::STORED, Keyword::VIRTUAL]);
                }
            }
            Keyword::AS => {
                cursor.group();
                if !cursor.eat_any(&[Keyword::STORED, Keyword::VIRTUAL]) {
                    cursor.eat_word_ci("PERSISTED");
                }
            }
            Keyword::ON => {
                cursor.eat_any(&[Keyword::UPDATE, Keyword::DELETE]);
                if cursor.eat_any(&[Keyword::SET, Keyword::NO]) {
                    cursor.next();
                } else {
                    cursor.next();
                    cursor.group();
                }
            }
            Keyword::CHECK => {
                cursor.group();
            }
            Keyword::CONSTRAINT | Keyword::COLLATE | Keyword::COMMENT | Keyword::CHARSET => {
                cursor.next();
            }
            Keyword::CHARACTER => {
                cursor.eat_keyword(Keyword::SET);
                cursor.next();
            }
            _ if lexeme.token == Token::LParen => {
                cursor.pos -= 1;
                cursor.group();
            }
            _ if !matches!(lexeme.token, Token::Word(_)) => {}
            _ => {
                cursor.group();
            }
        }
    }

    Ok(column)
}

enum TableConstraint {
    PrimaryKey(Vec<String>),
    ForeignKey {
        columns: Vec<String>,
        table: Option<String>,
        referenced: Vec<String>,
    },
    Unique(Vec<String>),
    /// CHECK, INDEX and friends: recognized, no effect on the model
    Ignored,
}

/// Classify a body clause; `None` means it is a column definition
fn table_constraint(tokens: &[Lexeme<'_>]) -> Option<TableConstraint> {
    let mut cursor = Cursor::new(tokens);

    let named = cursor.eat_keyword(Keyword::CONSTRAINT);
    if named
        && ![Keyword::PRIMARY, Keyword::FOREIGN, Keyword::UNIQUE, Keyword::CHECK]
            .iter()
            .any(|kw| cursor.at_keyword(*kw))
    {
        cursor.next();
    }

    if cursor.eat_keywords(&[Keyword::PRIMARY, Keyword::KEY]) {
        let columns = cursor.group().map(column_list).unwrap_or_default();
        return Some(TableConstraint::PrimaryKey(columns));
    }

    if cursor.eat_keywords(&[Keyword::FOREIGN, Keyword::KEY]) {
        if !cursor.at_token(&Token::LParen) {
            cursor.next();
        }
        let columns = cursor.group().map(column_list).unwrap_or_default();
        let mut table = None;
        let mut referenced = Vec::new();
        if cursor.eat_keyword(Keyword::REFERENCES) {
            table = cursor.qualified_name();
            referenced = cursor.group().map(column_list).unwrap_or_default();
        }
        return Some(TableConstraint::ForeignKey {
            columns,
            table,
            referenced,
        });
    }

    if cursor.eat_keyword(Keyword::UNIQUE) {
        cursor.eat_any(&[Keyword::KEY, Keyword::INDEX]);
        if !cursor.at_token(&Token::LParen) {
            cursor.next();
        }
        let columns = cursor.group().map(column_list).unwrap_or_default();
        return Some(TableConstraint::Unique(columns));
    }

    if named || is_ignored_clause(&mut cursor) {
        return Some(TableConstraint::Ignored);
    }
    None
}

/// Table-level clauses with no effect on the model. The leading words are
/// also plausible column names (`period VARCHAR(10)`), so each one only
/// counts when the tokens after it have the clause's shape.
fn is_ignored_clause(cursor: &mut Cursor<'_, '_>) -> bool {
    let Some(first) = cursor.next() else {
        return false;
    };
    match first.keyword() {
        Keyword::CHECK => cursor.at_token(&Token::LParen),
        Keyword::FULLTEXT | Keyword::SPATIAL => {
            cursor.eat_any(&[Keyword::INDEX, Keyword::KEY]);
            index_columns_follow(cursor.rest())
        }
        Keyword::KEY | Keyword::INDEX => index_columns_follow(cursor.rest()),
        Keyword::EXCLUDE => cursor.at_keyword(Keyword::USING) || cursor.at_token(&Token::LParen),
        Keyword::LIKE => {
            cursor.qualified_name().is_some()
                && cursor
                    .peek()
                    .is_none_or(|t| t.is_keyword(Keyword::INCLUDING) || t.is_keyword(Keyword::EXCLUDING))
        }
        Keyword::PERIOD => cursor.at_keyword(Keyword::FOR),
        _ => false,
    }
}

/// `[name] (col, ...)` after `KEY` / `INDEX`, versus a column that happens to
/// be named `key` (`key VARCHAR(50)`, `key ENUM('a')`): index column lists
/// start with an identifier.
fn index_columns_follow(tokens: &[Lexeme<'_>]) -> bool {
    let open = match tokens.first() {
        Some(t) if t.token == Token::LParen => 0,
        Some(t) if t.is_identifier() && tokens.get(1).is_some_and(|t| t.token == Token::LParen) => 1,
        _ => return false,
    };
    tokens
        .get(open + 1)
        .is_some_and(|t| matches!(t.token, Token::Word(_)))
}

fn position_comment(comments: &[Lexeme<'_>]) -> Option<Position> {
    comments.iter().rev().find_map(|comment| {
        let body = comment.text.trim_start_matches('-').trim();
        let coords = body.strip_prefix("Position:")?.trim().strip_prefix('(')?;
        let (coords, _) = coords.split_once(')')?;
        let (x, y) = coords.split_once(',')?;
        Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    })
}

// ============================================================================
// Schema assembly
// ============================================================================

/// Foreign key waiting for the post-pass, so tables may appear in any order
struct PendingForeignKey {
    child: EntityId,
    column: String,
    parent_table: String,
    /// `None` means "the parent's primary key at `key_index`"
    parent_column: Option<String>,
    key_index: usize,
    line: usize,
}

#[derive(Default)]
struct Collected {
    foreign_keys: Vec<PendingForeignKey>,
    skipped: Vec<SkippedStatement>,
    warnings: Vec<String>,
}

impl Collected {
    fn warn(&mut self, line: usize, message: String) {
        tracing::debug!("SQL parse warning at line {}: {}", line, message);
        self.warnings.push(format!("line {}: {}", line, message));
    }

    fn add_column(&mut self, entity: &mut Entity, entity_index: usize, clause: &[Lexeme<'_>], line: usize) {
        let column = match parse_column(clause) {
            Ok(column) => column,
            Err(reason) => {
                self.warn(line, format!("table '{}': {}, column skipped", entity.name, reason));
                return;
            }
        };

        if entity.field_by_name(&column.name).is_some() {
            self.warn(
                line,
                format!("table '{}': duplicate column '{}' skipped", entity.name, column.name),
            );
            return;
        }

        if let Some((table, referenced)) = column.reference.clone() {
            self.foreign_keys.push(PendingForeignKey {
                child: entity.id.clone(),
                column: column.name.clone(),
                parent_table: table,
                parent_column: referenced,
                key_index: 0,
                line,
            });
        }

        let id = format!("field-{}-{}", entity_index, entity.fields.len());
        entity.fields.push(column.into_field(id));
    }

    fn apply_constraint(&mut self, entity: &mut Entity, constraint: TableConstraint, line: usize) {
        match constraint {
            TableConstraint::PrimaryKey(columns) => {
                for name in columns {
                    match entity.fields.iter_mut().find(|f| f.name.eq_ignore_ascii_case(&name)) {
                        Some(field) => field.is_primary_key = true,
                        None => self.warn(
                            line,
                            format!("table '{}': PRIMARY KEY names unknown column '{}'", entity.name, name),
                        ),
                    }
                }
            }
            TableConstraint::Unique(columns) => {
                if let [name] = columns.as_slice()
                    && let Some(field) = entity.fields.iter_mut().find(|f| f.name.eq_ignore_ascii_case(name))
                {
                    field.is_unique = true;
                }
            }
            TableConstraint::ForeignKey {
                columns,
                table: Some(table),
                referenced,
            } => {
                for (key_index, column) in columns.into_iter().enumerate() {
                    self.foreign_keys.push(PendingForeignKey {
                        child: entity.id.clone(),
                        column,
                        parent_table: table.clone(),
                        parent_column: referenced.get(key_index).cloned(),
                        key_index,
                        line,
                    });
                }
            }
            TableConstraint::ForeignKey { table: None, .. } => self.warn(
                line,
                format!("table '{}': FOREIGN KEY without REFERENCES ignored", entity.name),
            ),
            TableConstraint::Ignored => {}
        }
    }
}

struct SchemaBuilder {
    schema: Schema,
    collected: Collected,
    tables_seen: usize,
}

impl SchemaBuilder {
    fn new() -> Self {
        Self {
            schema: Schema::new(),
            collected: Collected::default(),
            tables_seen: 0,
        }
    }

    fn statement(&mut self, statement: &Statement<'_>) {
        let Some(first) = statement.tokens.first() else {
            return;
        };
        let line = first.line;
        let mut cursor = Cursor::new(&statement.tokens);

        if cursor.eat_keyword(Keyword::CREATE) {
            cursor.eat_keywords(&[Keyword::OR, Keyword::REPLACE]);
            while cursor.eat_any(&[
                Keyword::TEMPORARY,
                Keyword::TEMP,
                Keyword::GLOBAL,
                Keyword::LOCAL,
                Keyword::UNLOGGED,
            ]) {}
            if cursor.eat_keyword(Keyword::TABLE) {
                self.tables_seen += 1;
                if let Err(reason) = self.create_table(&mut cursor, statement, line) {
                    self.skip(statement, line, reason);
                }
                return;
            }
        } else if cursor.eat_keywords(&[Keyword::ALTER, Keyword::TABLE]) {
            self.alter_table(&mut cursor, line);
            return;
        }

        tracing::debug!("Ignoring non-table statement at line {}", line);
    }

    fn skip(&mut self, statement: &Statement<'_>, line: usize, reason: String) {
        tracing::warn!("Skipping CREATE TABLE at line {}: {}", line, reason);
        let snippet: String = raw_text(&statement.tokens).chars().take(60).collect();
        self.collected.skipped.push(SkippedStatement {
            line,
            reason,
            snippet,
        });
    }

    fn create_table(
        &mut self,
        cursor: &mut Cursor<'_, '_>,
        statement: &Statement<'_>,
        line: usize,
    ) -> Result<(), String> {
        cursor.eat_keywords(&[Keyword::IF, Keyword::NOT, Keyword::EXISTS]);
        let name = cursor
            .qualified_name()
            .ok_or_else(|| "missing table name".to_string())?;

        if !cursor.at_token(&Token::LParen) {
            return Err(format!("expected a column list after table '{}'", name));
        }
        let open = cursor.pos;
        let close = matching_paren(&statement.tokens, open)
            .ok_or_else(|| format!("unbalanced parentheses in table '{}'", name))?;
        let body = &statement.tokens[open + 1..close];
        if body.is_empty() {
            return Err(format!("table '{}' has no columns", name));
        }

        if self.schema.entity_by_name(&name).is_some() {
            self.collected
                .warn(line, format!("duplicate table '{}' skipped", name));
            return Ok(());
        }

        let index = self.schema.entities.len();
        let mut entity = Entity::new(format!("entity-{}", index), name);
        entity.position =
            position_comment(&statement.comments).unwrap_or_else(|| default_position(index));

        let mut constraints = Vec::new();
        for clause in split_top_level(body) {
            match table_constraint(clause) {
                Some(constraint) => constraints.push(constraint),
                None => self.collected.add_column(&mut entity, index, clause, line),
            }
        }

        if entity.fields.is_empty() {
            return Err(format!("table '{}' has no usable columns", entity.name));
        }

        for constraint in constraints {
            self.collected.apply_constraint(&mut entity, constraint, line);
        }

        self.schema.entities.push(entity);
        Ok(())
    }

    fn alter_table(&mut self, cursor: &mut Cursor<'_, '_>, line: usize) {
        cursor.eat_keyword(Keyword::ONLY);
        cursor.eat_keywords(&[Keyword::IF, Keyword::EXISTS]);
        let Some(name) = cursor.qualified_name() else {
            self.collected
                .warn(line, "ALTER TABLE without a table name ignored".into());
            return;
        };
        let Some(index) = self
            .schema
            .entities
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(&name))
        else {
            self.collected
                .warn(line, format!("ALTER TABLE on unknown table '{}' ignored", name));
            return;
        };

        let entity = &mut self.schema.entities[index];
        for action in split_top_level(cursor.rest()) {
            let mut action = Cursor::new(action);
            if !action.eat_keyword(Keyword::ADD) {
                tracing::debug!("Ignoring ALTER TABLE action on '{}' at line {}", name, line);
                continue;
            }
            match table_constraint(action.rest()) {
                Some(constraint) => self.collected.apply_constraint(entity, constraint, line),
                None => {
                    action.eat_keyword(Keyword::COLUMN);
                    action.eat_keywords(&[Keyword::IF, Keyword::NOT, Keyword::EXISTS]);
                    self.collected
                        .add_column(entity, index, action.rest(), line);
                }
            }
        }
    }

    fn resolve_foreign_keys(&mut self) {
        let mut relationships: Vec<Relationship> = Vec::new();
        let mut seen = HashSet::new();

        for fk in std::mem::take(&mut self.collected.foreign_keys) {
            let Some(child) = self.schema.entity(&fk.child) else {
                continue;
            };
            let Some(child_field) = child.field_by_name(&fk.column) else {
                self.collected.warn(
                    fk.line,
                    format!("foreign key on unknown column '{}.{}' ignored", child.name, fk.column),
                );
                continue;
            };
            let Some(parent) = self.schema.entity_by_name(&fk.parent_table) else {
                self.collected.warn(
                    fk.line,
                    format!(
                        "foreign key '{}.{}' references unknown table '{}'",
                        child.name, child_field.name, fk.parent_table
                    ),
                );
                continue;
            };
            let parent_field = match &fk.parent_column {
                Some(column) => parent.field_by_name(column),
                None => parent.primary_keys().nth(fk.key_index),
            };
            let Some(parent_field) = parent_field else {
                self.collected.warn(
                    fk.line,
                    format!(
                        "foreign key '{}.{}' references unknown column in '{}'",
                        child.name, child_field.name, parent.name
                    ),
                );
                continue;
            };

            let key = (
                parent.id.clone(),
                parent_field.id.clone(),
                child.id.clone(),
                child_field.id.clone(),
            );
            if seen.insert(key) {
                relationships.push(Relationship::new(
                    format!("relationship-{}", relationships.len()),
                    (&parent.id, &parent_field.id),
                    (&child.id, &child_field.id),
                    RelationshipType::OneToMany,
                ));
            }
        }

        self.schema.relationships = relationships;
        self.schema.sync_foreign_keys();
    }

    fn finish(mut self) -> Result<ParseReport, ParseError> {
        if self.tables_seen == 0 {
            return Err(ParseError::NoTables);
        }
        if self.schema.entities.is_empty() {
            let first = self.collected.skipped.first();
            return Err(ParseError::Malformed {
                line: first.map_or(1, |s| s.line),
                reason: first.map_or_else(|| "no usable table".to_string(), |s| s.reason.clone()),
            });
        }

        self.resolve_foreign_keys();
        tracing::debug!(
            "Parsed {} tables and {} relationships ({} statements skipped)",
            self.schema.entities.len(),
            self.schema.relationships.len(),
            self.collected.skipped.len()
        );

        Ok(ParseReport {
            schema: self.schema,
            skipped: self.collected.skipped,
            warnings: self.collected.warnings,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldReference;

    const USERS: &str = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(255) NOT NULL);";
    const POSTS: &str = "CREATE TABLE posts (id INT PRIMARY KEY, user_id INT, FOREIGN KEY (user_id) REFERENCES users(id));";

    #[test]
    fn test_primary_key_extraction() {
        let schema = parse(USERS).unwrap();

        assert_eq!(schema.entities.len(), 1);
        let users = &schema.entities[0];
        assert_eq!(users.name, "users");
        assert_eq!(users.fields.len(), 2);
        assert!(users.fields[0].is_primary_key);
        assert_eq!(users.fields[0].name, "id");
        assert!(users.fields[1].is_not_null);
        assert!(!users.fields[1].is_primary_key);
        assert_eq!(users.fields[1].data_type, "VARCHAR(255)");
    }

    #[test]
    fn test_foreign_key_derivation() {
        let schema = parse(&format!("{}\n{}", USERS, POSTS)).unwrap();

        assert_eq!(schema.relationships.len(), 1);
        let rel = &schema.relationships[0];
        assert_eq!(rel.relationship_type, RelationshipType::OneToMany);

        let ((source, source_field), (target, target_field)) = schema.resolve(rel).unwrap();
        assert_eq!((source.name.as_str(), source_field.name.as_str()), ("users", "id"));
        assert_eq!((target.name.as_str(), target_field.name.as_str()), ("posts", "user_id"));
        assert!(target_field.is_foreign_key);
        assert_eq!(
            target_field.references,
            Some(FieldReference {
                table: "users".into(),
                field: "id".into()
            })
        );
    }

    #[test]
    fn test_forward_reference_resolves() {
        let schema = parse(&format!("{}\n{}", POSTS, USERS)).unwrap();
        assert_eq!(schema.entities[0].name, "posts");
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].source_entity_id.as_str(), "entity-1");
    }

    #[test]
    fn test_self_reference() {
        let sql = "CREATE TABLE employees (id INT PRIMARY KEY, manager_id INT REFERENCES employees(id));";
        let schema = parse(sql).unwrap();
        let rel = &schema.relationships[0];
        assert_eq!(rel.source_entity_id, rel.target_entity_id);
        assert_eq!(rel.target_field_id.as_str(), "field-0-1");
    }

    #[test]
    fn test_ids_and_default_layout() {
        let sql = (0..4)
            .map(|i| format!("CREATE TABLE t{} (id INT PRIMARY KEY);", i))
            .collect::<Vec<_>>()
            .join("\n");
        let schema = parse(&sql).unwrap();

        assert_eq!(schema.entities[2].id.as_str(), "entity-2");
        assert_eq!(schema.entities[2].fields[0].id.as_str(), "field-2-0");
        assert_eq!(schema.entities[2].position, Position::new(700.0, 100.0));
        assert_eq!(schema.entities[3].position, Position::new(100.0, 350.0));
    }

    #[test]
    fn test_types_and_defaults_verbatim() {
        let sql = r#"
            CREATE TABLE products (
                id INT PRIMARY KEY,
                price DECIMAL(10,2) NOT NULL DEFAULT 0.00,
                status ENUM('draft', 'live') DEFAULT 'draft',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                ratio DOUBLE PRECISION DEFAULT NULL
            );
        "#;
        let schema = parse(sql).unwrap();
        let fields = &schema.entities[0].fields;

        assert_eq!(fields[1].data_type, "DECIMAL(10,2)");
        assert!(fields[1].is_not_null);
        assert_eq!(fields[1].default_value.as_deref(), Some("0.00"));
        assert_eq!(fields[2].data_type, "ENUM('draft', 'live')");
        assert_eq!(fields[2].default_value.as_deref(), Some("'draft'"));
        assert_eq!(fields[3].default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert_eq!(fields[4].data_type, "DOUBLE PRECISION");
        assert_eq!(fields[4].default_value.as_deref(), Some("NULL"));
    }

    #[test]
    fn test_table_level_composite_primary_key() {
        let sql = r#"
            CREATE TABLE enrollments (
                student_id INT NOT NULL,
                course_id INT NOT NULL,
                PRIMARY KEY (student_id, course_id)
            );
        "#;
        let schema = parse(sql).unwrap();
        let keys: Vec<&str> = schema.entities[0]
            .primary_keys()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(keys, vec!["student_id", "course_id"]);
    }

    #[test]
    fn test_quoted_identifiers_are_stripped() {
        let sql = r#"
            CREATE TABLE IF NOT EXISTS `users` (`id` INT PRIMARY KEY);
            CREATE TABLE "public"."order" ("id" INT PRIMARY KEY, [user id] INT, 'note' TEXT);
        "#;
        let schema = parse(sql).unwrap();
        assert_eq!(schema.entities[0].name, "users");
        assert_eq!(schema.entities[1].name, "order");
        let names: Vec<&str> = schema.entities[1].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "user id", "note"]);
    }

    #[test]
    fn test_autoincrement_spellings_fold_to_serial() {
        let sql = r#"
            CREATE TABLE a (id INT AUTO_INCREMENT PRIMARY KEY);
            CREATE TABLE b (id INTEGER PRIMARY KEY AUTOINCREMENT);
            CREATE TABLE c (id INT IDENTITY(1,1) PRIMARY KEY);
            CREATE TABLE d (id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY);
            CREATE TABLE e (id serial PRIMARY KEY);
        "#;
        let schema = parse(sql).unwrap();
        let types: Vec<&str> = schema
            .entities
            .iter()
            .map(|e| e.fields[0].data_type.as_str())
            .collect();
        assert_eq!(types, vec!["SERIAL", "SERIAL", "SERIAL", "BIGSERIAL", "serial"]);
    }

    #[test]
    fn test_constraint_clauses() {
        let sql = r#"
            CREATE TABLE users (id INT, PRIMARY KEY (id));
            CREATE TABLE posts (
                id INT NOT NULL,
                user_id INT,
                slug VARCHAR(100),
                `key` VARCHAR(50),
                PRIMARY KEY (id),
                UNIQUE KEY uq_slug (slug),
                KEY idx_user (user_id),
                CHECK (id > 0),
                CONSTRAINT fk_posts_user FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            ) ENGINE=InnoDB;
        "#;
        let report = parse_with_report(sql).unwrap();
        let posts = report.schema.entity_by_name("posts").unwrap();

        assert_eq!(posts.fields.len(), 4);
        assert!(posts.field_by_name("slug").unwrap().is_unique);
        assert!(posts.field_by_name("user_id").unwrap().is_foreign_key);
        assert_eq!(report.schema.relationships.len(), 1);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_column_named_key_is_not_an_index() {
        let schema = parse("CREATE TABLE settings (id INT PRIMARY KEY, key VARCHAR(50));").unwrap();
        assert_eq!(schema.entities[0].fields[1].name, "key");
        assert_eq!(schema.entities[0].fields[1].data_type, "VARCHAR(50)");
    }

    #[test]
    fn test_alter_table_foreign_key_and_dedup() {
        let sql = r#"
            CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));
            CREATE TABLE posts (
                id INT NOT NULL,
                user_id INT,
                PRIMARY KEY (id),
                CONSTRAINT fk_posts_user FOREIGN KEY (user_id) REFERENCES users(id)
            );
            ALTER TABLE posts ADD CONSTRAINT fk_dup FOREIGN KEY (user_id) REFERENCES users(id);
            ALTER TABLE posts ADD COLUMN title VARCHAR(200) NOT NULL;
        "#;
        let schema = parse(sql).unwrap();
        assert_eq!(schema.relationships.len(), 1);
        let posts = schema.entity_by_name("posts").unwrap();
        assert_eq!(posts.fields[2].name, "title");
        assert_eq!(posts.fields[2].id.as_str(), "field-1-2");
    }

    #[test]
    fn test_foreign_key_defaults_to_parent_primary_key() {
        let sql = "CREATE TABLE users (uid INT PRIMARY KEY); CREATE TABLE posts (id INT PRIMARY KEY, author INT REFERENCES users);";
        let schema = parse(sql).unwrap();
        let ((_, parent_field), _) = schema.resolve(&schema.relationships[0]).unwrap();
        assert_eq!(parent_field.name, "uid");
    }

    #[test]
    fn test_multiple_foreign_keys_to_same_table() {
        let sql = r#"
            CREATE TABLE users (id INT PRIMARY KEY);
            CREATE TABLE messages (
                id INT PRIMARY KEY,
                sender_id INT,
                recipient_id INT,
                FOREIGN KEY (sender_id) REFERENCES users(id),
                FOREIGN KEY (recipient_id) REFERENCES users(id)
            );
        "#;
        let schema = parse(sql).unwrap();
        assert_eq!(schema.relationships.len(), 2);
        assert_eq!(schema.relationships[1].id.as_str(), "relationship-1");
    }

    #[test]
    fn test_unresolvable_foreign_key_is_a_warning() {
        let sql = "CREATE TABLE posts (id INT PRIMARY KEY, user_id INT, FOREIGN KEY (user_id) REFERENCES users(id));";
        let report = parse_with_report(sql).unwrap();
        assert!(report.schema.relationships.is_empty());
        assert!(!report.schema.entities[0].fields[1].is_foreign_key);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("unknown table 'users'"));
    }

    #[test]
    fn test_skip_and_continue() {
        let sql = r#"
CREATE TABLE users (id INT PRIMARY KEY);
CREATE TABLE broken (id INT PRIMARY KEY, name VARCHAR(255;
CREATE TABLE posts (id INT PRIMARY KEY, 123);
CREATE INDEX idx_posts ON posts(id);
"#;
        let report = parse_with_report(sql).unwrap();

        let names: Vec<&str> = report.schema.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["users", "posts"]);
        assert_eq!(report.schema.entities[1].id.as_str(), "entity-1");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 3);
        assert!(report.skipped[0].reason.contains("unbalanced"));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_no_tables_error() {
        assert_eq!(parse(""), Err(ParseError::NoTables));
        assert_eq!(parse("SELECT * FROM users;"), Err(ParseError::NoTables));
    }

    #[test]
    fn test_all_tables_malformed_error() {
        let err = parse("\nCREATE TABLE (id INT);").unwrap_err();
        assert_eq!(
            err,
            ParseError::Malformed {
                line: 2,
                reason: "missing table name".into()
            }
        );
        assert!(matches!(parse("CREATE TABLE t ();"), Err(ParseError::Malformed { .. })));
    }

    #[test]
    fn test_duplicate_table_is_skipped_with_warning() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY); CREATE TABLE USERS (uid INT PRIMARY KEY);";
        let report = parse_with_report(sql).unwrap();
        assert_eq!(report.schema.entities.len(), 1);
        assert_eq!(report.schema.entities[0].fields[0].name, "id");
        assert!(report.warnings[0].contains("duplicate table"));
    }

    #[test]
    fn test_position_comments() {
        let sql = r#"-- Position: (500.5, 300.25)
CREATE TABLE users (
    id INT NOT NULL,
    PRIMARY KEY (id)
);
CREATE TABLE posts (id INT PRIMARY KEY);
"#;
        let schema = parse(sql).unwrap();
        assert_eq!(schema.entities[0].position, Position::new(500.5, 300.25));
        assert_eq!(schema.entities[1].position, default_position(1));
    }

    #[test]
    fn test_comments_and_semicolons_in_strings() {
        let sql = r#"
            /* header */
            CREATE TABLE notes (
                id INT PRIMARY KEY, -- the key
                body TEXT DEFAULT 'a; b, (c'
            );
        "#;
        let schema = parse(sql).unwrap();
        let body = &schema.entities[0].fields[1];
        assert_eq!(body.default_value.as_deref(), Some("'a; b, (c'"));
    }

    #[test]
    fn test_inline_modifiers() {
        let sql = r#"
            CREATE TABLE accounts (
                id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                email VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                tag TEXT CONSTRAINT tag_nn NOT NULL CHECK (length(tag) > 0) COMMENT 'label'
            );
        "#;
        let fields = &parse(sql).unwrap().entities[0].fields;
        assert_eq!(fields[0].data_type, "BIGSERIAL");
        assert_eq!(fields[1].data_type, "VARCHAR(255)");
        assert!(fields[1].is_not_null && fields[1].is_unique);
        assert_eq!(fields[2].data_type, "TEXT");
        assert!(fields[2].is_not_null);
    }

    #[test]
    fn test_clause_keywords_as_column_names() {
        let sql = r#"
            CREATE TABLE billing (
                id INT PRIMARY KEY,
                period VARCHAR(10),
                spatial GEOMETRY,
                fulltext TEXT NOT NULL,
                exclude BOOLEAN DEFAULT FALSE,
                key ENUM('a', 'b')
            );
        "#;
        let report = parse_with_report(sql).unwrap();
        let fields = &report.schema.entities[0].fields;
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "period", "spatial", "fulltext", "exclude", "key"]);
        assert_eq!(fields[1].data_type, "VARCHAR(10)");
        assert!(fields[3].is_not_null);
        assert_eq!(fields[5].data_type, "ENUM('a', 'b')");
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_table_level_clauses_are_ignored() {
        let sql = r#"
            CREATE TABLE docs (
                id INT PRIMARY KEY,
                body TEXT,
                area GEOMETRY NOT NULL,
                valid_from DATE,
                valid_to DATE,
                CHECK (id > 0),
                FULLTEXT KEY ft_body (body),
                SPATIAL INDEX (area),
                EXCLUDE USING gist (area WITH &&),
                PERIOD FOR validity (valid_from, valid_to),
                INDEX idx_body (body)
            );
            CREATE TABLE docs_copy (LIKE docs INCLUDING ALL, note TEXT);
        "#;
        let report = parse_with_report(sql).unwrap();
        assert_eq!(report.schema.entities[0].fields.len(), 5);
        let copy = report.schema.entity_by_name("docs_copy").unwrap();
        assert_eq!(copy.fields.len(), 1);
        assert_eq!(copy.fields[0].name, "note");
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_lines_come_from_token_positions() {
        let sql = "CREATE TABLE users (id INT PRIMARY KEY);\n\n  /* spans\n   lines */\n  CREATE TABLE\n    broken (id INT;";
        let report = parse_with_report(sql).unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 5);
        assert_eq!(report.skipped[0].snippet, "CREATE TABLE broken (id INT");
    }

    #[test]
    fn test_unterminated_quote_is_malformed() {
        let err = parse("CREATE TABLE users (id INT PRIMARY KEY);\nCREATE TABLE \"notes (id INT);").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 2, .. }), "{:?}", err);
    }

    #[test]
    fn test_bracket_identifiers_and_computed_columns() {
        let sql = "CREATE TABLE lines ([id] INT IDENTITY(1,1) PRIMARY KEY, qty INT, total DECIMAL(10,2) AS (qty * 2) PERSISTED NOT NULL, [note] NVARCHAR(50));";
        let fields = &parse(sql).unwrap().entities[0].fields;
        assert_eq!(fields[0].data_type, "SERIAL");
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "qty", "total", "note"]);
        assert_eq!(fields[2].data_type, "DECIMAL(10,2)");
        assert!(fields[2].is_not_null);
    }
}
