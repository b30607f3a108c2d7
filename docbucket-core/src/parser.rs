//! Parser for the `SELECT` dialect accepted by [`Statement::parse`](crate::query::Statement::parse).
//!
//! The parser is a hand-written lexer plus recursive descent. Placeholders are
//! bound while parsing, so the resulting [`Statement`] only holds concrete values.

use bson::Bson;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    options::QueryOptions,
    query::{Expr, FieldOp, META_ID_FIELD, ProjectedField, Projection, Sort, SortDirection, Statement},
};

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "AS", "WHERE", "AND", "OR", "NOT", "LIKE", "IN", "IS", "NULL", "MISSING",
    "TRUE", "FALSE", "ORDER", "BY", "ASC", "DESC", "LIMIT", "OFFSET", "META",
];

/// Returns true if `ident` must be back-quoted to be used as a name.
pub(crate) fn is_keyword(ident: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(ident))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    QuotedIdent(String),
    Str(String),
    Int(i64),
    Float(f64),
    Positional(usize),
    Named(String),
    Star,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semicolon,
    Cmp(FieldOp),
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("`{s}`"),
            Token::QuotedIdent(s) => format!("`{s}`"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Int(n) => format!("number {n}"),
            Token::Float(n) => format!("number {n}"),
            Token::Positional(n) => format!("parameter ${n}"),
            Token::Named(n) => format!("parameter ${n}"),
            Token::Star => "`*`".into(),
            Token::Comma => "`,`".into(),
            Token::Dot => "`.`".into(),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::LBracket => "`[`".into(),
            Token::RBracket => "`]`".into(),
            Token::Semicolon => "`;`".into(),
            Token::Cmp(_) => "comparison operator".into(),
            Token::Eof => "end of statement".into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

fn syntax_error(offset: usize, message: impl AsRef<str>) -> DocumentStoreError {
    DocumentStoreError::Query(format!("syntax error at offset {offset}: {}", message.as_ref()))
}

fn tokenize(text: &str) -> DocumentStoreResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '-' if text[offset..].starts_with("--") => {
                while chars.next_if(|&(_, c)| c != '\n').is_some() {}
                continue;
            }
            '/' if text[offset..].starts_with("/*") => {
                let end = text[offset + 2..]
                    .find("*/")
                    .ok_or_else(|| syntax_error(offset, "unterminated comment"))?;
                let resume = offset + 2 + end + 2;
                while chars.next_if(|&(i, _)| i < resume).is_some() {}
                continue;
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_') {
                    ident.push(c);
                }
                Token::Ident(ident)
            }
            '`' => {
                chars.next();
                let mut ident = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) if chars.next_if(|&(_, c)| c == '`').is_some() => ident.push('`'),
                        Some((_, '`')) => break,
                        Some((_, c)) => ident.push(c),
                        None => return Err(syntax_error(offset, "unterminated quoted identifier")),
                    }
                }
                Token::QuotedIdent(ident)
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote && chars.next_if(|&(_, n)| n == quote).is_some() => {
                            value.push(quote)
                        }
                        Some((_, c)) if c == quote => break,
                        Some((i, '\\')) => match chars.next() {
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, 'r')) => value.push('\r'),
                            Some((_, c @ ('\\' | '\'' | '"' | '/'))) => value.push(c),
                            _ => return Err(syntax_error(i, "invalid escape sequence")),
                        },
                        Some((_, c)) => value.push(c),
                        None => return Err(syntax_error(offset, "unterminated string")),
                    }
                }
                Token::Str(value)
            }
            '0'..='9' | '-' => lex_number(text, offset, &mut chars)?,
            '$' => {
                chars.next();
                let mut name = String::new();
                while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_') {
                    name.push(c);
                }
                if name.is_empty() {
                    return Err(syntax_error(offset, "expected parameter name after `$`"));
                }
                match name.parse::<usize>() {
                    Ok(index) => Token::Positional(index),
                    Err(_) => Token::Named(name),
                }
            }
            '=' => {
                chars.next();
                chars.next_if(|&(_, c)| c == '=');
                Token::Cmp(FieldOp::Eq)
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(syntax_error(offset, "expected `!=`"));
                }
                Token::Cmp(FieldOp::Ne)
            }
            '<' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::Cmp(FieldOp::Lte)
                } else if chars.next_if(|&(_, c)| c == '>').is_some() {
                    Token::Cmp(FieldOp::Ne)
                } else {
                    Token::Cmp(FieldOp::Lt)
                }
            }
            '>' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::Cmp(FieldOp::Gte)
                } else {
                    Token::Cmp(FieldOp::Gt)
                }
            }
            '*' | ',' | '.' | '(' | ')' | '[' | ']' | ';' => {
                chars.next();
                match c {
                    '*' => Token::Star,
                    ',' => Token::Comma,
                    '.' => Token::Dot,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    _ => Token::Semicolon,
                }
            }
            other => return Err(syntax_error(offset, format!("unexpected character {other:?}"))),
        };

        tokens.push(Spanned { token, offset });
    }

    tokens.push(Spanned { token: Token::Eof, offset: text.len() });
    Ok(tokens)
}

fn lex_number(
    text: &str,
    offset: usize,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> DocumentStoreResult<Token> {
    let mut end = offset;
    let mut is_float = false;

    if chars.next_if(|&(_, c)| c == '-').is_some() {
        end += 1;
        if !chars.peek().is_some_and(|&(_, c)| c.is_ascii_digit()) {
            return Err(syntax_error(offset, "expected digits after `-`"));
        }
    }
    while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
        end = i + c.len_utf8();
    }
    if let Some(&(i, '.')) = chars.peek() {
        if text[i + 1..].starts_with(|c: char| c.is_ascii_digit()) {
            is_float = true;
            chars.next();
            while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
                end = i + c.len_utf8();
            }
        }
    }
    if let Some((i, _)) = chars.next_if(|&(_, c)| c == 'e' || c == 'E') {
        is_float = true;
        end = i + 1;
        if let Some((i, _)) = chars.next_if(|&(_, c)| c == '+' || c == '-') {
            end = i + 1;
        }
        let mut digits = false;
        while let Some((i, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
            end = i + c.len_utf8();
            digits = true;
        }
        if !digits {
            return Err(syntax_error(offset, "malformed exponent"));
        }
    }

    let literal = &text[offset..end];
    if is_float {
        literal
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| syntax_error(offset, format!("invalid number {literal}")))
    } else {
        literal
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| syntax_error(offset, format!("invalid number {literal}")))
    }
}

/// A field reference before alias resolution.
#[derive(Debug, Clone)]
enum FieldRef {
    Path(Vec<String>),
    Meta(Option<String>, usize),
}

#[derive(Debug)]
enum RawProjection {
    All,
    AliasAll(String, usize),
    Fields(Vec<(FieldRef, Option<String>)>),
}

pub(crate) struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    options: &'a QueryOptions,
    alias: String,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(text: &str, options: &'a QueryOptions) -> DocumentStoreResult<Self> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
            options,
            alias: String::new(),
        })
    }

    pub(crate) fn parse_statement(mut self) -> DocumentStoreResult<Statement> {
        self.expect_keyword("SELECT")?;
        let projection = self.parse_projection()?;
        self.expect_keyword("FROM")?;

        let keyspace = self.parse_identifier()?;
        let alias = if self.eat_keyword("AS") {
            Some(self.parse_identifier()?)
        } else if matches!(self.peek(), Token::Ident(name) if !is_keyword(name))
            || matches!(self.peek(), Token::QuotedIdent(_))
        {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        self.alias = alias.clone().unwrap_or_else(|| keyspace.clone());

        let projection = self.resolve_projection(projection)?;

        let filter = if self.eat_keyword("WHERE") {
            Some(self.parse_or()?)
        } else {
            None
        };

        let mut sort = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let field = self.parse_field_ref()?;
                let direction = if self.eat_keyword("DESC") {
                    SortDirection::Desc
                } else {
                    self.eat_keyword("ASC");
                    SortDirection::Asc
                };
                sort.push(Sort { field: self.resolve_field(field)?, direction });

                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let mut limit = None;
        let mut offset = None;
        loop {
            if limit.is_none() && self.eat_keyword("LIMIT") {
                limit = Some(self.parse_count("LIMIT")?);
            } else if offset.is_none() && self.eat_keyword("OFFSET") {
                offset = Some(self.parse_count("OFFSET")?);
            } else {
                break;
            }
        }

        self.eat(&Token::Semicolon);
        if self.peek() != &Token::Eof {
            return Err(self.unexpected("end of statement"));
        }

        Ok(Statement {
            keyspace,
            alias,
            projection,
            filter,
            sort,
            limit,
            offset,
        })
    }

    fn parse_projection(&mut self) -> DocumentStoreResult<RawProjection> {
        if self.eat(&Token::Star) {
            return Ok(RawProjection::All);
        }

        // `alias.*`
        if matches!(self.peek(), Token::Ident(_) | Token::QuotedIdent(_))
            && self.peek_at(1) == &Token::Dot
            && self.peek_at(2) == &Token::Star
        {
            let offset = self.offset();
            let alias = self.parse_identifier()?;
            self.advance();
            self.advance();
            return Ok(RawProjection::AliasAll(alias, offset));
        }

        let mut fields = Vec::new();
        loop {
            let field = self.parse_field_ref()?;
            let name = if self.eat_keyword("AS") {
                Some(self.parse_identifier()?)
            } else {
                None
            };
            fields.push((field, name));

            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok(RawProjection::Fields(fields))
    }

    fn resolve_projection(&self, projection: RawProjection) -> DocumentStoreResult<Projection> {
        match projection {
            RawProjection::All => Ok(Projection::All),
            RawProjection::AliasAll(alias, offset) => {
                if alias == self.alias {
                    Ok(Projection::Document)
                } else {
                    Err(syntax_error(offset, format!("unknown keyspace alias `{alias}`")))
                }
            }
            RawProjection::Fields(fields) => Ok(Projection::Fields(
                fields
                    .into_iter()
                    .map(|(field, name)| {
                        let path = self.resolve_field(field)?;
                        Ok(match name {
                            Some(name) => ProjectedField::aliased(path, name),
                            None => ProjectedField::new(path),
                        })
                    })
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )),
        }
    }

    /// Strips the keyspace alias from a path and validates `META(alias)`.
    fn resolve_field(&self, field: FieldRef) -> DocumentStoreResult<String> {
        match field {
            FieldRef::Meta(Some(alias), offset) if alias != self.alias => {
                Err(syntax_error(offset, format!("unknown keyspace alias `{alias}`")))
            }
            FieldRef::Meta(..) => Ok(META_ID_FIELD.to_string()),
            FieldRef::Path(segments) => {
                let skip = usize::from(segments.len() > 1 && segments[0] == self.alias);
                Ok(segments[skip..].join("."))
            }
        }
    }

    fn parse_or(&mut self) -> DocumentStoreResult<Expr> {
        let mut exprs = vec![self.parse_and()?];
        while self.eat_keyword("OR") {
            exprs.push(self.parse_and()?);
        }

        Ok(if exprs.len() == 1 { exprs.remove(0) } else { Expr::Or(exprs) })
    }

    fn parse_and(&mut self) -> DocumentStoreResult<Expr> {
        let mut exprs = vec![self.parse_not()?];
        while self.eat_keyword("AND") {
            exprs.push(self.parse_not()?);
        }

        Ok(if exprs.len() == 1 { exprs.remove(0) } else { Expr::And(exprs) })
    }

    fn parse_not(&mut self) -> DocumentStoreResult<Expr> {
        if self.eat_keyword("NOT") {
            return Ok(self.parse_not()?.not());
        }

        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> DocumentStoreResult<Expr> {
        if self.eat(&Token::LParen) {
            let expr = self.parse_or()?;
            self.expect(&Token::RParen)?;
            return Ok(expr);
        }

        if self.at_literal() {
            let value = self.parse_literal()?;
            let op = self.parse_comparison()?;
            let field = self.parse_field_ref()?;
            return Ok(Expr::field(self.resolve_field(field)?, op.flipped(), value));
        }

        let field = self.parse_field_ref()?;
        let field = self.resolve_field(field)?;

        if let Token::Cmp(op) = *self.peek() {
            self.advance();
            if !self.at_literal() {
                return Err(self.unexpected("a literal value (comparisons between fields are not supported)"));
            }
            return Ok(Expr::field(field, op, self.parse_literal()?));
        }

        let negated = self.eat_keyword("NOT");

        if self.eat_keyword("LIKE") {
            let offset = self.offset();
            let pattern = match self.parse_literal()? {
                Bson::String(pattern) => pattern,
                _ => return Err(syntax_error(offset, "LIKE expects a string pattern")),
            };
            let expr = Expr::field(field, FieldOp::Like, Bson::String(pattern));
            return Ok(if negated { expr.not() } else { expr });
        }

        if self.eat_keyword("IN") {
            let offset = self.offset();
            let values = match self.parse_literal()? {
                values @ Bson::Array(_) => values,
                _ => return Err(syntax_error(offset, "IN expects an array")),
            };
            let op = if negated { FieldOp::NoneOf } else { FieldOp::AnyOf };
            return Ok(Expr::field(field, op, values));
        }

        if negated {
            return Err(self.unexpected("LIKE or IN after NOT"));
        }

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if self.eat_keyword("NULL") {
                let op = if negated { FieldOp::Ne } else { FieldOp::Eq };
                return Ok(Expr::field(field, op, Bson::Null));
            }
            if self.eat_keyword("MISSING") {
                return Ok(Expr::Exists(field, negated));
            }
            return Err(self.unexpected("NULL or MISSING"));
        }

        Err(self.unexpected("a comparison"))
    }

    fn parse_comparison(&mut self) -> DocumentStoreResult<FieldOp> {
        match *self.peek() {
            Token::Cmp(op) => {
                self.advance();
                Ok(op)
            }
            _ => Err(self.unexpected("a comparison operator")),
        }
    }

    fn parse_field_ref(&mut self) -> DocumentStoreResult<FieldRef> {
        let offset = self.offset();

        if self.eat_keyword("META") {
            self.expect(&Token::LParen)?;
            let alias = if self.peek() == &Token::RParen {
                None
            } else {
                Some(self.parse_identifier()?)
            };
            self.expect(&Token::RParen)?;
            self.expect(&Token::Dot)?;

            let attribute = self.parse_identifier()?;
            if !attribute.eq_ignore_ascii_case("id") {
                return Err(syntax_error(offset, format!("unsupported metadata attribute `{attribute}`")));
            }
            return Ok(FieldRef::Meta(alias, offset));
        }

        let mut segments = vec![self.parse_identifier()?];
        while self.peek() == &Token::Dot && self.peek_at(1) != &Token::Star {
            self.advance();
            segments.push(self.parse_identifier()?);
        }

        Ok(FieldRef::Path(segments))
    }

    fn parse_identifier(&mut self) -> DocumentStoreResult<String> {
        match self.peek().clone() {
            Token::Ident(name) if !is_keyword(&name) => {
                self.advance();
                Ok(name)
            }
            Token::QuotedIdent(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn at_literal(&self) -> bool {
        match self.peek() {
            Token::Str(_)
            | Token::Int(_)
            | Token::Float(_)
            | Token::Positional(_)
            | Token::Named(_)
            | Token::LBracket => true,
            Token::Ident(word) => ["TRUE", "FALSE", "NULL"]
                .iter()
                .any(|k| k.eq_ignore_ascii_case(word)),
            _ => false,
        }
    }

    fn parse_literal(&mut self) -> DocumentStoreResult<Bson> {
        let offset = self.offset();

        let value = match self.peek().clone() {
            Token::Str(s) => Bson::String(s),
            Token::Int(n) => match i32::try_from(n) {
                Ok(n) => Bson::Int32(n),
                Err(_) => Bson::Int64(n),
            },
            Token::Float(n) => Bson::Double(n),
            Token::Positional(index) => self
                .options
                .positional(index)
                .cloned()
                .ok_or_else(|| syntax_error(offset, format!("no value bound for parameter ${index}")))?,
            Token::Named(name) => self
                .options
                .named(&name)
                .cloned()
                .ok_or_else(|| syntax_error(offset, format!("no value bound for parameter ${name}")))?,
            Token::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_literal()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                return Ok(Bson::Array(items));
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("TRUE") => Bson::Boolean(true),
            Token::Ident(word) if word.eq_ignore_ascii_case("FALSE") => Bson::Boolean(false),
            Token::Ident(word) if word.eq_ignore_ascii_case("NULL") => Bson::Null,
            _ => return Err(self.unexpected("a literal value")),
        };

        self.advance();
        Ok(value)
    }

    fn parse_count(&mut self, clause: &str) -> DocumentStoreResult<usize> {
        let offset = self.offset();
        let count = match self.parse_literal()? {
            Bson::Int32(n) => i64::from(n),
            Bson::Int64(n) => n,
            _ => return Err(syntax_error(offset, format!("{clause} expects an integer"))),
        };

        usize::try_from(count)
            .map_err(|_| syntax_error(offset, format!("{clause} must not be negative")))
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        self.tokens
            .get(self.pos + ahead)
            .map_or(&Token::Eof, |t| &t.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |t| t.offset)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Token::Ident(word) if word.eq_ignore_ascii_case(keyword) => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token) -> DocumentStoreResult<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.describe()))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> DocumentStoreResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn unexpected(&self, expected: &str) -> DocumentStoreError {
        syntax_error(
            self.offset(),
            format!("expected {expected}, found {}", self.peek().describe()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, query::Filter};

    fn parse(text: &str) -> DocumentStoreResult<Statement> {
        Statement::parse(text, &QueryOptions::default())
    }

    #[test]
    fn test_select_star() {
        let statement = parse("SELECT * FROM default").unwrap();
        assert_eq!(statement, Statement::builder("default").build());
        assert_eq!(statement.alias(), "default");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let statement = parse("select * from `travel-sample` b where b.type = 'airline';").unwrap();
        assert_eq!(statement.keyspace, "travel-sample");
        assert_eq!(statement.alias.as_deref(), Some("b"));
        assert_eq!(statement.filter, Some(Filter::eq("type", "airline")));
    }

    #[test]
    fn test_projection_forms() {
        let statement = parse("SELECT b.* FROM default AS b").unwrap();
        assert_eq!(statement.projection, Projection::Document);

        let err = parse("SELECT name, cost price FROM default b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);

        let statement =
            parse("SELECT META(b).id, name, b.publisher.city AS town FROM default b").unwrap();
        assert_eq!(
            statement.projection,
            Projection::Fields(vec![
                ProjectedField::aliased(META_ID_FIELD, "id"),
                ProjectedField::new("name"),
                ProjectedField::aliased("publisher.city", "town"),
            ])
        );

        assert!(parse("SELECT x.* FROM default b").is_err());
        assert!(parse("SELECT META(x).id FROM default b").is_err());
    }

    #[test]
    fn test_where_precedence_and_operators() {
        let statement = parse(
            "SELECT * FROM default WHERE NOT cost >= 30 AND name LIKE 'Mine%' OR isbn IS MISSING",
        )
        .unwrap();

        assert_eq!(
            statement.filter,
            Some(Expr::Or(vec![
                Expr::And(vec![
                    Filter::gte("cost", 30).not(),
                    Filter::like("name", "Mine%"),
                ]),
                Filter::missing("isbn"),
            ]))
        );
    }

    #[test]
    fn test_literal_on_left_flips_operator() {
        let statement = parse("SELECT * FROM default WHERE 10 < pages").unwrap();
        assert_eq!(statement.filter, Some(Filter::gt("pages", 10)));
    }

    #[test]
    fn test_in_null_and_negations() {
        let statement = parse(
            "SELECT * FROM default WHERE cost IN ['29.99', \"30\"] AND name NOT IN [] \
             AND isbn IS NOT NULL AND name NOT LIKE '%Forge' AND tag IS NOT MISSING AND x <> -1.5e1",
        )
        .unwrap();

        assert_eq!(
            statement.filter,
            Some(Filter::and([
                Filter::any_of("cost", vec![Bson::from("29.99"), Bson::from("30")]),
                Filter::none_of("name", Bson::Array(vec![])),
                Filter::is_not_null("isbn"),
                Filter::like("name", "%Forge").not(),
                Filter::exists("tag"),
                Filter::ne("x", -15.0),
            ]))
        );
    }

    #[test]
    fn test_order_limit_offset() {
        let statement =
            parse("SELECT * FROM default ORDER BY cost DESC, name LIMIT 10 OFFSET 5").unwrap();
        assert_eq!(
            statement.sort,
            vec![
                Sort { field: "cost".into(), direction: SortDirection::Desc },
                Sort { field: "name".into(), direction: SortDirection::Asc },
            ]
        );
        assert_eq!(statement.limit, Some(10));
        assert_eq!(statement.offset, Some(5));

        let statement = parse("SELECT * FROM default OFFSET 2 LIMIT 1").unwrap();
        assert_eq!((statement.limit, statement.offset), (Some(1), Some(2)));
    }

    #[test]
    fn test_parameters_are_bound() {
        let options = QueryOptions::new()
            .positional_parameter("978-1-4919-1889-0")
            .named_parameter("max", 3);

        let statement =
            Statement::parse("SELECT * FROM default WHERE isbn = $1 LIMIT $max", &options).unwrap();
        assert_eq!(statement.filter, Some(Filter::eq("isbn", "978-1-4919-1889-0")));
        assert_eq!(statement.limit, Some(3));

        let err = Statement::parse("SELECT * FROM default WHERE isbn = $2", &options).unwrap_err();
        assert!(err.to_string().contains("$2"));
    }

    #[test]
    fn test_malformed_statements_are_query_errors() {
        for text in [
            "",
            "SELEC * FROM default",
            "SELECT * FROM",
            "SELECT * FROM default WHERE",
            "SELECT * FROM default WHERE name =",
            "SELECT * FROM default WHERE name = other",
            "SELECT * FROM default WHERE (name = 'a'",
            "SELECT * FROM default WHERE name = 'unterminated",
            "SELECT * FROM default LIMIT -1",
            "SELECT * FROM default LIMIT 'ten'",
            "SELECT * FROM default garbage trailing",
            "SELECT * FROM default WHERE name LIKE 5",
            "SELECT * FROM default WHERE name IN 'a'",
            "SELECT META().cas FROM default",
            "SELECT * FROM default WHERE a ! b",
        ] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Query, "{text:?}");
        }
    }

    #[test]
    fn test_comments_and_escapes() {
        let statement = parse(
            "SELECT * -- everything\nFROM default /* the bucket */ WHERE name = 'O''Reilly\\n'",
        )
        .unwrap();
        assert_eq!(statement.filter, Some(Filter::eq("name", "O'Reilly\n")));
    }
}
