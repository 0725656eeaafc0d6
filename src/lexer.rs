//! Tokenizer for the SQL-like query surfaces.
//!
//! Keywords are not distinguished here; each parser decides which
//! identifiers it treats as keywords (case-insensitively).

use crate::error::{InfParquetError, Result};

/// A lexical token
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Bare or dotted identifier, e.g. `price` or `column.min`
    Ident(String),
    /// Quoted string literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    Comma,
    Star,
}

impl Token {
    /// Whether this is the identifier `keyword`, ignoring case
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

/// A token with its byte offset in the query text
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Split `input` into tokens
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let err = |pos: usize, msg: &str| {
        Err(InfParquetError::InvalidQuery(format!(
            "{} at position {}",
            msg, pos
        )))
    };

    while i < chars.len() {
        let (pos, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '*' => Token::Star,
            '=' => {
                if next == Some('=') {
                    i += 1;
                }
                Token::Eq
            }
            '!' if next == Some('=') => {
                i += 1;
                Token::NotEq
            }
            '<' => match next {
                Some('=') => {
                    i += 1;
                    Token::LtEq
                }
                Some('>') => {
                    i += 1;
                    Token::NotEq
                }
                _ => Token::Lt,
            },
            '>' => {
                if next == Some('=') {
                    i += 1;
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return err(pos, "unterminated string literal"),
                        // A doubled quote is an escaped quote
                        Some(&(_, ch)) if ch == quote => {
                            if chars.get(i + 1).map(|&(_, c)| c) == Some(quote) {
                                value.push(quote);
                                i += 2;
                            } else {
                                break;
                            }
                        }
                        Some(&(_, ch)) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                Token::Str(value)
            }
            c if c.is_ascii_digit()
                || (c == '-' && next.map_or(false, |n| n.is_ascii_digit() || n == '.'))
                || (c == '.' && next.map_or(false, |n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() {
                    let ch = chars[i].1;
                    let exp_sign = (ch == '-' || ch == '+')
                        && matches!(chars[i - 1].1, 'e' | 'E');
                    if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exp_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[start..i].iter().map(|&(_, c)| c).collect();
                i -= 1;
                if text.contains(['.', 'e', 'E']) {
                    match text.parse::<f64>() {
                        Ok(v) => Token::Float(v),
                        Err(_) => return err(pos, &format!("invalid number '{}'", text)),
                    }
                } else {
                    match text.parse::<i64>() {
                        Ok(v) => Token::Int(v),
                        Err(_) => return err(pos, &format!("invalid integer '{}'", text)),
                    }
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i + 1 < chars.len() {
                    let ch = chars[i + 1].1;
                    if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                Token::Ident(chars[start..=i].iter().map(|&(_, c)| c).collect())
            }
            '`' => {
                // Backquoted identifier for names with spaces or symbols
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return err(pos, "unterminated quoted identifier"),
                        Some(&(_, '`')) => break,
                        Some(&(_, ch)) => {
                            value.push(ch);
                            i += 1;
                        }
                    }
                }
                Token::Ident(value)
            }
            other => return err(pos, &format!("unexpected character '{}'", other)),
        };
        tokens.push(Spanned { token, pos });
        i += 1;
    }
    Ok(tokens)
}

/// Deepest `NOT` / parenthesis nesting either parser accepts
pub(crate) const MAX_NESTING: usize = 256;

/// Cursor over a token list, shared by the recursive-descent parsers
pub(crate) struct TokenStream {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl TokenStream {
    pub(crate) fn new(input: &str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            end: input.len(),
        })
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    pub(crate) fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Byte offset of the current token (end of input when exhausted)
    pub(crate) fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.pos)
    }

    /// Enter one more level of nesting below `depth`
    pub(crate) fn descend(&self, depth: usize) -> Result<usize> {
        if depth >= MAX_NESTING {
            return self.error("expression nested too deeply");
        }
        Ok(depth + 1)
    }

    pub(crate) fn error<T>(&self, message: impl AsRef<str>) -> Result<T> {
        Err(InfParquetError::InvalidQuery(format!(
            "{} at position {}",
            message.as_ref(),
            self.position()
        )))
    }

    /// Consume `keyword` if it is next
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().map_or(false, |t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            self.error(format!("expected {}", keyword.to_uppercase()))
        }
    }

    /// Consume `token` if it is next
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: &Token, what: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            self.error(format!("expected {}", what))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("a >= 1 AND b != 'x' OR c <> 2.5 AND d < -3"),
            vec![
                Token::Ident("a".into()),
                Token::GtEq,
                Token::Int(1),
                Token::Ident("AND".into()),
                Token::Ident("b".into()),
                Token::NotEq,
                Token::Str("x".into()),
                Token::Ident("OR".into()),
                Token::Ident("c".into()),
                Token::NotEq,
                Token::Float(2.5),
                Token::Ident("AND".into()),
                Token::Ident("d".into()),
                Token::Lt,
                Token::Int(-3),
            ]
        );
    }

    #[test]
    fn test_dotted_and_quoted_identifiers() {
        assert_eq!(
            kinds("column.min = `total rows`"),
            vec![
                Token::Ident("column.min".into()),
                Token::Eq,
                Token::Ident("total rows".into()),
            ]
        );
    }

    #[test]
    fn test_escaped_quote_and_exponent() {
        assert_eq!(
            kinds("'it''s' 1e3 2.5E-2"),
            vec![
                Token::Str("it's".into()),
                Token::Float(1000.0),
                Token::Float(0.025),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a ; b").is_err());
        assert!(tokenize("99999999999999999999").is_err());
    }
}
