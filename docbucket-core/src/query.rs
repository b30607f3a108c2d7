//! Statement model for bucket queries.
//!
//! Query text such as `SELECT * FROM default WHERE cost < "30"` is parsed into a
//! [`Statement`] before it reaches a backend. Backends either evaluate the
//! statement's filter [`Expr`] directly or translate it into their native query
//! language through the [`QueryVisitor`] trait.
//!
//! Statements can also be built programmatically:
//!
//! ```ignore
//! use docbucket::query::{Statement, Filter, SortDirection};
//!
//! let statement = Statement::builder("default")
//!     .filter(Filter::like("name", "Minecraft%").and(Filter::lt("cost", "30")))
//!     .sort("name", SortDirection::Asc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides static constructors for filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Pattern: `like`
//! - Membership: `any_of`, `none_of`
//! - Null and presence: `is_null`, `is_not_null`, `exists`, `missing`
//! - Logical: `and`, `or`

use std::fmt;

use bson::Bson;

use crate::{
    document::Content,
    error::{DocumentStoreError, DocumentStoreResult},
    options::QueryOptions,
    parser::Parser,
    rows::Row,
};

/// Field path standing for the document key (`META().id`).
pub const META_ID_FIELD: &str = "META().id";

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String matches a `LIKE` pattern (`%` any run, `_` any single character).
    Like,
    /// Field equals any element of an array (or, for array fields, shares an element).
    AnyOf,
    /// Negation of [`FieldOp::AnyOf`] for fields that are present.
    NoneOf,
}

impl FieldOp {
    /// The operator seen from the other side, for `literal op field` comparisons.
    pub fn flipped(self) -> Self {
        match self {
            FieldOp::Gt => FieldOp::Lt,
            FieldOp::Gte => FieldOp::Lte,
            FieldOp::Lt => FieldOp::Gt,
            FieldOp::Lte => FieldOp::Gte,
            other => other,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            FieldOp::Eq => "=",
            FieldOp::Ne => "!=",
            FieldOp::Gt => ">",
            FieldOp::Gte => ">=",
            FieldOp::Lt => "<",
            FieldOp::Lte => "<=",
            FieldOp::Like => "LIKE",
            FieldOp::AnyOf => "IN",
            FieldOp::NoneOf => "NOT IN",
        }
    }
}

/// A filter expression over a single document.
///
/// A comparison against a field the document does not have is false.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field is present (`IS NOT MISSING`) or absent (`IS MISSING`).
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// What each result row contains.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `SELECT *`: each row is `{ <alias>: <document> }`.
    All,
    /// `SELECT alias.*`: each row is the document itself.
    Document,
    /// `SELECT a, b AS c, META().id`: each row holds the listed fields.
    Fields(Vec<ProjectedField>),
}

/// One entry of a field list projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedField {
    /// Field path inside the document, or [`META_ID_FIELD`].
    pub path: String,
    /// Name of the field in the result row.
    pub name: String,
}

impl ProjectedField {
    /// Projects `path` under its last path segment (`a.b` becomes `b`, `META().id` becomes `id`).
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = if path == META_ID_FIELD {
            "id".to_string()
        } else {
            path.rsplit('.').next().unwrap_or(&path).to_string()
        };

        Self { path, name }
    }

    pub fn aliased(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into() }
    }
}

/// A parsed `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Bucket named in the `FROM` clause.
    pub keyspace: String,
    /// Optional `AS` alias of the keyspace.
    pub alias: Option<String>,
    /// Shape of each result row.
    pub projection: Projection,
    /// Optional `WHERE` condition.
    pub filter: Option<Expr>,
    /// `ORDER BY` terms, most significant first.
    pub sort: Vec<Sort>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
    /// Number of rows to skip.
    pub offset: Option<usize>,
}

impl Statement {
    /// Parses statement text, binding placeholders from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Query`] for syntax errors, unsupported
    /// constructs and unbound parameters.
    pub fn parse(text: &str, options: &QueryOptions) -> DocumentStoreResult<Self> {
        Parser::new(text, options)?.parse_statement()
    }

    /// Creates a builder selecting `*` from `keyspace`.
    pub fn builder(keyspace: impl Into<String>) -> StatementBuilder {
        StatementBuilder::new(keyspace)
    }

    /// The name rows are keyed by under `SELECT *`.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.keyspace)
    }

    /// Builds the result row for one matching document.
    pub fn project(&self, key: &str, content: &Content) -> Row {
        let mut row = Content::new();

        match &self.projection {
            Projection::All => {
                row.insert(self.alias().to_string(), Bson::Document(content.clone()));
            }
            Projection::Document => {
                row = content.clone();
            }
            Projection::Fields(fields) => {
                for field in fields {
                    if let Some(value) = resolve_field(key, content, &field.path) {
                        row.insert(field.name.clone(), value);
                    }
                }
            }
        }

        Row::new(row)
    }
}

/// Looks up a dotted path inside stored content.
pub fn resolve_path<'a>(content: &'a Content, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = content.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Like [`resolve_path`], but also understands [`META_ID_FIELD`].
pub fn resolve_field(key: &str, content: &Content, path: &str) -> Option<Bson> {
    if path == META_ID_FIELD {
        return Some(Bson::String(key.to_string()));
    }

    resolve_path(content, path).cloned()
}

/// Translates a `LIKE` pattern into an anchored regular expression.
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^'
            | '$' | '#' | '&' | '-' | '~' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }

    regex.push('$');
    regex
}

/// Helper struct for constructing filter expressions.
///
/// All methods accept field names and values as `Into<String>` and `Into<Bson>`.
///
/// # Example
///
/// ```ignore
/// use docbucket::query::Filter;
///
/// let expr = Filter::eq("name", "Minecraft Modding with Forge")
///     .and(Filter::lt("cost", "30"));
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field is present and differs from the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches string fields against a `LIKE` pattern.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Like, Bson::String(pattern.into()))
    }

    /// Matches documents whose field equals one of `values`.
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, values.into())
    }

    /// Matches documents whose field is present and equals none of `values`.
    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, values.into())
    }

    /// Matches documents where the field is an explicit null.
    pub fn is_null(field: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, Bson::Null)
    }

    /// Matches documents where the field is present and not null.
    pub fn is_not_null(field: impl Into<String>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, Bson::Null)
    }

    /// Matches documents that have the field (any value, including null).
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Matches documents that do not have the field at all.
    pub fn missing(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Fluent construction of [`Statement`]s without going through query text.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    statement: Statement,
}

impl StatementBuilder {
    pub fn new(keyspace: impl Into<String>) -> Self {
        StatementBuilder {
            statement: Statement {
                keyspace: keyspace.into(),
                alias: None,
                projection: Projection::All,
                filter: None,
                sort: Vec::new(),
                limit: None,
                offset: None,
            },
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.statement.alias = Some(alias.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.statement.projection = projection;
        self
    }

    /// Shorthand for a [`Projection::Fields`] list of plain paths.
    pub fn select<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection(Projection::Fields(
            paths.into_iter().map(ProjectedField::new).collect(),
        ))
    }

    /// Sets the filter expression for this statement.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.statement.filter = Some(filter);
        self
    }

    /// Appends an `ORDER BY` term.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.statement.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.statement.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.statement.offset = Some(offset);
        self
    }

    pub fn build(self) -> Statement {
        self.statement
    }
}

/// Walks a filter [`Expr`], producing one output per node.
///
/// The in-memory backend implements it to evaluate filters, the MongoDB backend
/// to translate them into find documents.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

fn write_identifier(f: &mut fmt::Formatter<'_>, ident: &str) -> fmt::Result {
    let plain = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !crate::parser::is_keyword(ident);

    if plain {
        f.write_str(ident)
    } else {
        write!(f, "`{}`", ident.replace('`', "``"))
    }
}

fn write_path(f: &mut fmt::Formatter<'_>, path: &str) -> fmt::Result {
    if path == META_ID_FIELD {
        return f.write_str(META_ID_FIELD);
    }

    for (i, segment) in path.split('.').enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write_identifier(f, segment)?;
    }

    Ok(())
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &Bson) -> fmt::Result {
    match value {
        Bson::Null => f.write_str("NULL"),
        Bson::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
        Bson::Int32(n) => write!(f, "{n}"),
        Bson::Int64(n) => write!(f, "{n}"),
        Bson::Double(n) => write!(f, "{n:?}"),
        Bson::String(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Bson::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str("]")
        }
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) if exprs.is_empty() => {
                f.write_str(if matches!(self, Expr::And(_)) { "TRUE" } else { "FALSE" })
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                let joiner = if matches!(self, Expr::And(_)) { " AND " } else { " OR " };
                f.write_str("(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(joiner)?;
                    }
                    write!(f, "{expr}")?;
                }
                f.write_str(")")
            }
            Expr::Not(expr) => write!(f, "NOT {expr}"),
            Expr::Exists(field, should_exist) => {
                write_path(f, field)?;
                f.write_str(if *should_exist { " IS NOT MISSING" } else { " IS MISSING" })
            }
            Expr::Field { field, op, value } => {
                write_path(f, field)?;
                match (op, value) {
                    (FieldOp::Eq, Bson::Null) => f.write_str(" IS NULL"),
                    (FieldOp::Ne, Bson::Null) => f.write_str(" IS NOT NULL"),
                    _ => {
                        write!(f, " {} ", op.symbol())?;
                        write_literal(f, value)
                    }
                }
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;

        match &self.projection {
            Projection::All => f.write_str("*")?,
            Projection::Document => {
                write_identifier(f, self.alias())?;
                f.write_str(".*")?;
            }
            Projection::Fields(fields) => {
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_path(f, &field.path)?;
                    if ProjectedField::new(field.path.clone()).name != field.name {
                        f.write_str(" AS ")?;
                        write_identifier(f, &field.name)?;
                    }
                }
            }
        }

        f.write_str(" FROM ")?;
        write_identifier(f, &self.keyspace)?;

        if let Some(alias) = &self.alias {
            f.write_str(" AS ")?;
            write_identifier(f, alias)?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {filter}")?;
        }
        if !self.sort.is_empty() {
            f.write_str(" ORDER BY ")?;
            for (i, sort) in self.sort.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_path(f, &sort.field)?;
                f.write_str(match sort.direction {
                    SortDirection::Asc => " ASC",
                    SortDirection::Desc => " DESC",
                })?;
            }
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn book() -> Content {
        doc! {
            "isbn": "978-1-4919-1889-0",
            "name": "Minecraft Modding with Forge",
            "cost": "29.99",
            "publisher": { "name": "O'Reilly", "city": "Sebastopol" },
        }
    }

    #[test]
    fn test_select_star_wraps_document_under_alias() {
        let statement = Statement::builder("default").build();
        let row = statement.project("u:book1", &book());
        assert_eq!(row.get("default"), Some(&Bson::Document(book())));

        let statement = Statement::builder("default").alias("b").build();
        let row = statement.project("u:book1", &book());
        assert!(row.get("default").is_none());
        assert!(row.get("b").is_some());
    }

    #[test]
    fn test_field_projection_omits_missing_values() {
        let statement = Statement::builder("default")
            .projection(Projection::Fields(vec![
                ProjectedField::new(META_ID_FIELD),
                ProjectedField::new("publisher.city"),
                ProjectedField::aliased("cost", "price"),
                ProjectedField::new("pages"),
            ]))
            .build();

        let row = statement.project("u:book1", &book());
        assert_eq!(
            row.into_document(),
            doc! { "id": "u:book1", "city": "Sebastopol", "price": "29.99" }
        );
    }

    #[test]
    fn test_resolve_path() {
        let content = book();
        assert_eq!(
            resolve_path(&content, "publisher.name"),
            Some(&Bson::String("O'Reilly".into()))
        );
        assert_eq!(resolve_path(&content, "name.first"), None);
        assert_eq!(resolve_path(&content, "missing"), None);
    }

    #[test]
    fn test_like_to_regex_escapes_metacharacters() {
        assert_eq!(like_to_regex("978-%"), "^978\\-.*$");
        assert_eq!(like_to_regex("a_c.d"), "^a.c\\.d$");
    }

    #[test]
    fn test_flipped_operators() {
        assert_eq!(FieldOp::Lt.flipped(), FieldOp::Gt);
        assert_eq!(FieldOp::Gte.flipped(), FieldOp::Lte);
        assert_eq!(FieldOp::Eq.flipped(), FieldOp::Eq);
    }

    #[test]
    fn test_display_renders_parseable_text() {
        let statement = Statement::builder("travel-sample")
            .alias("t")
            .select(["name", "publisher.city"])
            .filter(
                Filter::like("name", "Mine%")
                    .and(Filter::any_of("cost", vec![Bson::from("29.99"), Bson::from("30")]))
                    .and(Filter::is_not_null("isbn").not()),
            )
            .sort("name", SortDirection::Desc)
            .limit(5)
            .offset(1)
            .build();

        let text = statement.to_string();
        assert!(text.starts_with("SELECT name, publisher.city FROM `travel-sample` AS t WHERE"));
        assert_eq!(Statement::parse(&text, &QueryOptions::default()).unwrap(), statement);
    }
}
