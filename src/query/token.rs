//! Query tokenizer.
//!
//! Keywords are case-insensitive and only recognized when they form a whole
//! identifier (`TABLE` is a keyword, `table.x` is an identifier). Every token
//! carries its byte offset; the stream always ends with `Eof` at the input
//! length.

use std::iter::Peekable;
use std::str::CharIndices;

use super::ast::CompareOp;
use super::error::QueryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Table,
    List,
    Task,
    From,
    Where,
    Sort,
    Limit,
    And,
    Or,
    Asc,
    Desc,
    Contains,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        let kw = match word.to_ascii_uppercase().as_str() {
            "TABLE" => Keyword::Table,
            "LIST" => Keyword::List,
            "TASK" => Keyword::Task,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "SORT" => Keyword::Sort,
            "LIMIT" => Keyword::Limit,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "CONTAINS" => Keyword::Contains,
            _ => return None,
        };
        Some(kw)
    }

    /// Keywords that open a clause after the query type.
    pub fn is_clause(self) -> bool {
        matches!(
            self,
            Keyword::From | Keyword::Where | Keyword::Sort | Keyword::Limit
        )
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Keyword::Table => "TABLE",
            Keyword::List => "LIST",
            Keyword::Task => "TASK",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Sort => "SORT",
            Keyword::Limit => "LIMIT",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Contains => "CONTAINS",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    String(String),
    /// `integer` is false when the literal had a decimal point.
    Number { value: f64, integer: bool },
    Boolean(bool),
    Operator(CompareOp),
    LParen,
    RParen,
    Comma,
    Eof,
}

impl TokenKind {
    /// Short human description for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(k) => format!("keyword {}", k),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::String(s) => format!("string \"{}\"", s),
            TokenKind::Number { value, .. } => format!("number {}", value),
            TokenKind::Boolean(b) => format!("boolean {}", b),
            TokenKind::Operator(op) => format!("operator '{}'", op),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Split query text into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
        input,
    };
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
    });

    Ok(tokens)
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    input: &'a str,
}

impl<'a> Lexer<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Offset of the next unread character (input length at the end).
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |(i, _)| *i)
    }

    fn next_token(&mut self) -> Result<Option<Token>, QueryError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
        }

        let Some(&(start, c)) = self.chars.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            '"' => self.string(start)?,
            '=' | '!' | '<' | '>' => self.operator(start, c)?,
            c if c.is_ascii_digit() => self.number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.word(start),
            other => {
                return Err(QueryError::lexical(
                    format!("Unexpected character '{}'", other),
                    start,
                ))
            }
        };

        Ok(Some(Token {
            kind,
            position: start,
        }))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.chars.next();
        kind
    }

    fn operator(&mut self, start: usize, first: char) -> Result<TokenKind, QueryError> {
        self.chars.next();
        // Two-character operators win over their one-character prefixes.
        if self.peek() == Some('=') {
            let op = match first {
                '!' => Some(CompareOp::Ne),
                '>' => Some(CompareOp::Ge),
                '<' => Some(CompareOp::Le),
                _ => None,
            };
            if let Some(op) = op {
                self.chars.next();
                return Ok(TokenKind::Operator(op));
            }
        }
        match first {
            '=' => Ok(TokenKind::Operator(CompareOp::Eq)),
            '>' => Ok(TokenKind::Operator(CompareOp::Gt)),
            '<' => Ok(TokenKind::Operator(CompareOp::Lt)),
            _ => Err(QueryError::lexical("Unexpected character '!'", start)),
        }
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, QueryError> {
        self.chars.next(); // opening quote
        let mut value = String::new();

        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(TokenKind::String(value)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                Some((_, c)) => value.push(c),
                None => break,
            }
        }

        Err(QueryError::lexical("Unterminated string", start))
    }

    fn number(&mut self, start: usize) -> TokenKind {
        let mut end = start;
        let mut integer = true;

        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                end = i + 1;
                self.chars.next();
            } else if c == '.' && integer && self.digit_follows_dot(i) {
                integer = false;
                end = i + 1;
                self.chars.next();
            } else {
                break;
            }
        }

        let text = &self.input[start..end];
        // Digits with at most one interior dot always parse.
        let value = text.parse::<f64>().unwrap_or_default();
        TokenKind::Number { value, integer }
    }

    fn digit_follows_dot(&self, dot: usize) -> bool {
        self.input[dot + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn word(&mut self, start: usize) -> TokenKind {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            self.chars.next();
        }
        let end = self.offset();
        let word = &self.input[start..end];

        if let Some(keyword) = Keyword::from_word(word) {
            return TokenKind::Keyword(keyword);
        }
        if word.eq_ignore_ascii_case("true") {
            return TokenKind::Boolean(true);
        }
        if word.eq_ignore_ascii_case("false") {
            return TokenKind::Boolean(false);
        }
        TokenKind::Identifier(word.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::error::QueryErrorKind;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("table From wHeRe"),
            vec![
                TokenKind::Keyword(Keyword::Table),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_only_as_whole_identifier() {
        assert_eq!(
            kinds("tables sort.order"),
            vec![
                TokenKind::Identifier("tables".to_string()),
                TokenKind::Identifier("sort.order".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dotted_identifier() {
        assert_eq!(
            kinds("file.path"),
            vec![TokenKind::Identifier("file.path".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""say \"hi\" \\ now""#),
            vec![
                TokenKind::String(r#"say "hi" \ now"#.to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("10 0.75"),
            vec![
                TokenKind::Number {
                    value: 10.0,
                    integer: true
                },
                TokenKind::Number {
                    value: 0.75,
                    integer: false
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            kinds("true FALSE"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("= != > < >= <="),
            vec![
                TokenKind::Operator(CompareOp::Eq),
                TokenKind::Operator(CompareOp::Ne),
                TokenKind::Operator(CompareOp::Gt),
                TokenKind::Operator(CompareOp::Lt),
                TokenKind::Operator(CompareOp::Ge),
                TokenKind::Operator(CompareOp::Le),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("a>=1"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Operator(CompareOp::Ge),
                TokenKind::Number {
                    value: 1.0,
                    integer: true
                },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_and_eof() {
        let tokens = tokenize("LIST  WHERE x").unwrap();
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 6, 12, 13]);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("LIST WHERE a = #x").unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::Lexical);
        assert_eq!(err.position, 15);
        assert!(err.message.contains('#'));
    }

    #[test]
    fn test_bang_without_equals() {
        let err = tokenize("a ! b").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("FROM \"research").unwrap_err();
        assert_eq!(err.kind, QueryErrorKind::Lexical);
        assert_eq!(err.position, 5);
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        let tokens = tokenize("   ").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].position, 3);
    }
}
