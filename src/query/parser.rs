//! Recursive-descent query parser.
//!
//! Precedence inside WHERE, lowest first: OR, AND, primary. Both binary
//! levels fold left. The cursor is a `Copy` index into the token slice;
//! every rule takes one and hands back the advanced one.

use super::ast::{LogicalOp, ParsedQuery, QueryType, SortClause, SortOrder, Value, WhereClause};
use super::error::QueryError;
use super::token::{tokenize, Keyword, Token, TokenKind};

/// Tokenize and parse query text. Errors carry a snippet of `input`.
pub fn parse_query(input: &str) -> Result<ParsedQuery, QueryError> {
    tokenize(input)
        .and_then(|tokens| parse(&tokens))
        .map_err(|e| e.with_source(input))
}

/// Parse a token stream produced by [`tokenize`].
pub fn parse(tokens: &[Token]) -> Result<ParsedQuery, QueryError> {
    let cur = Cursor::new(tokens)?;
    let (query, cur) = parse_top(cur)?;
    debug_assert!(cur.at_eof());
    Ok(query)
}

type Parsed<'a, T> = Result<(T, Cursor<'a>), QueryError>;

#[derive(Clone, Copy)]
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token]) -> Result<Self, QueryError> {
        match tokens.last() {
            Some(Token {
                kind: TokenKind::Eof,
                ..
            }) => Ok(Self { tokens, pos: 0 }),
            Some(last) => Err(QueryError::syntax(
                "Token stream is missing its end marker",
                last.position,
            )),
            None => Err(QueryError::syntax("Empty token stream", 0)),
        }
    }

    fn peek(&self) -> &'a Token {
        // The Eof token is never consumed, so pos stays in bounds.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(self) -> Self {
        if self.at_eof() {
            self
        } else {
            Self {
                pos: self.pos + 1,
                ..self
            }
        }
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek().kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    fn error(&self, expected: &str) -> QueryError {
        let token = self.peek();
        QueryError::syntax(
            format!("Expected {}, found {}", expected, token.kind.describe()),
            token.position,
        )
    }

    fn expect(self, kind: TokenKind, what: &str) -> Result<Self, QueryError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(what))
        }
    }

    fn expect_identifier(self, what: &str) -> Parsed<'a, String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => Ok((name.clone(), self.advance())),
            _ => Err(self.error(what)),
        }
    }
}

fn parse_top(cur: Cursor<'_>) -> Parsed<'_, ParsedQuery> {
    let query_type = match cur.peek_keyword() {
        Some(Keyword::Table) => QueryType::Table,
        Some(Keyword::List) => QueryType::List,
        Some(Keyword::Task) => QueryType::Task,
        _ => return Err(cur.error("query type (TABLE, LIST, or TASK)")),
    };
    let mut cur = cur.advance();
    let mut query = ParsedQuery::new(query_type);

    if query_type == QueryType::Table {
        if let TokenKind::Identifier(_) = cur.peek().kind {
            let (fields, next) = parse_field_list(cur)?;
            query.fields = Some(fields);
            cur = next;
        }
    }

    while !cur.at_eof() {
        let token = cur.peek();
        let keyword = match cur.peek_keyword() {
            Some(k) if k.is_clause() => k,
            _ => {
                return Err(QueryError::syntax(
                    format!("Unexpected {}", token.kind.describe()),
                    token.position,
                ))
            }
        };

        let already_seen = match keyword {
            Keyword::From => query.from.is_some(),
            Keyword::Where => query.where_clause.is_some(),
            Keyword::Sort => query.sort.is_some(),
            _ => query.limit.is_some(),
        };
        if already_seen {
            return Err(QueryError::syntax(
                format!("Duplicate {} clause", keyword),
                token.position,
            ));
        }

        let body = cur.advance();
        cur = match keyword {
            Keyword::From => {
                let (from, next) = parse_from(body)?;
                query.from = Some(from);
                next
            }
            Keyword::Where => {
                let (clause, next) = parse_or(body)?;
                query.where_clause = Some(clause);
                next
            }
            Keyword::Sort => {
                let (sort, next) = parse_sort(body)?;
                query.sort = Some(sort);
                next
            }
            _ => {
                let (limit, next) = parse_limit(body)?;
                query.limit = Some(limit);
                next
            }
        };
    }

    Ok((query, cur))
}

fn parse_field_list(cur: Cursor<'_>) -> Parsed<'_, Vec<String>> {
    let (first, mut cur) = cur.expect_identifier("field name")?;
    let mut fields = vec![first];

    while cur.peek().kind == TokenKind::Comma {
        let (field, next) = cur.advance().expect_identifier("field name after ','")?;
        fields.push(field);
        cur = next;
    }

    Ok((fields, cur))
}

fn parse_from(cur: Cursor<'_>) -> Parsed<'_, String> {
    match &cur.peek().kind {
        TokenKind::String(s) | TokenKind::Identifier(s) => Ok((s.clone(), cur.advance())),
        _ => Err(cur.error("path after FROM")),
    }
}

fn parse_or(cur: Cursor<'_>) -> Parsed<'_, WhereClause> {
    let (mut left, mut cur) = parse_and(cur)?;

    while cur.peek_keyword() == Some(Keyword::Or) {
        let (right, next) = parse_and(cur.advance())?;
        left = WhereClause::logical(LogicalOp::Or, left, right);
        cur = next;
    }

    Ok((left, cur))
}

fn parse_and(cur: Cursor<'_>) -> Parsed<'_, WhereClause> {
    let (mut left, mut cur) = parse_primary(cur)?;

    while cur.peek_keyword() == Some(Keyword::And) {
        let (right, next) = parse_primary(cur.advance())?;
        left = WhereClause::logical(LogicalOp::And, left, right);
        cur = next;
    }

    Ok((left, cur))
}

fn parse_primary(cur: Cursor<'_>) -> Parsed<'_, WhereClause> {
    match &cur.peek().kind {
        TokenKind::LParen => {
            let (inner, cur) = parse_or(cur.advance())?;
            let cur = cur.expect(TokenKind::RParen, "')'")?;
            Ok((inner, cur))
        }
        TokenKind::Keyword(Keyword::Contains) => {
            let cur = cur.advance().expect(TokenKind::LParen, "'(' after CONTAINS")?;
            let (field, cur) = cur.expect_identifier("field name")?;
            let cur = cur.expect(TokenKind::Comma, "','")?;
            let (value, cur) = parse_value(cur)?;
            let cur = cur.expect(TokenKind::RParen, "')'")?;
            Ok((WhereClause::Contains { field, value }, cur))
        }
        TokenKind::Identifier(field) => {
            let cur = cur.advance();
            let operator = match cur.peek().kind {
                TokenKind::Operator(op) => op,
                _ => return Err(cur.error("comparison operator")),
            };
            let (value, cur) = parse_value(cur.advance())?;
            Ok((
                WhereClause::Comparison {
                    field: field.clone(),
                    operator,
                    value,
                },
                cur,
            ))
        }
        _ => Err(cur.error("condition")),
    }
}

fn parse_value(cur: Cursor<'_>) -> Parsed<'_, Value> {
    let value = match &cur.peek().kind {
        TokenKind::String(s) => Value::String(s.clone()),
        TokenKind::Number { value, .. } => Value::Number(*value),
        TokenKind::Boolean(b) => Value::Boolean(*b),
        // A bare word in value position is a string, never a field reference.
        TokenKind::Identifier(word) => Value::String(word.clone()),
        _ => return Err(cur.error("value")),
    };
    Ok((value, cur.advance()))
}

fn parse_sort(cur: Cursor<'_>) -> Parsed<'_, SortClause> {
    let (field, cur) = cur.expect_identifier("field name after SORT")?;
    let (order, cur) = match cur.peek_keyword() {
        Some(Keyword::Asc) => (SortOrder::Asc, cur.advance()),
        Some(Keyword::Desc) => (SortOrder::Desc, cur.advance()),
        _ => (SortOrder::Asc, cur),
    };
    Ok((SortClause { field, order }, cur))
}

fn parse_limit(cur: Cursor<'_>) -> Parsed<'_, u64> {
    match cur.peek().kind {
        TokenKind::Number {
            value,
            integer: true,
        } if value <= u64::MAX as f64 => Ok((value as u64, cur.advance())),
        _ => Err(cur.error("integer after LIMIT")),
    }
}
