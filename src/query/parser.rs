use std::cmp::Ordering;
use std::fmt;

use crate::error::Result;
use crate::lexer::{Token, TokenStream};
use crate::value::Scalar;

const RESERVED: &[&str] = &["select", "from", "where", "and", "or", "not", "limit"];

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=` or `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CompareOp {
    /// Whether `lhs op rhs` holds given `lhs.cmp(rhs)`
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        })
    }
}

/// Parsed filter expression
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPredicate {
    /// `attribute op literal`
    Compare {
        /// Attribute name as written
        attribute: String,
        /// Operator
        op: CompareOp,
        /// String, integer or float literal
        literal: Scalar,
    },
    /// Both sides hold
    And(Box<QueryPredicate>, Box<QueryPredicate>),
    /// Either side holds
    Or(Box<QueryPredicate>, Box<QueryPredicate>),
    /// Negation
    Not(Box<QueryPredicate>),
}

impl QueryPredicate {
    /// Every attribute name referenced, in order of appearance
    pub fn attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryPredicate::Compare { attribute, .. } => out.push(attribute),
            QueryPredicate::And(l, r) | QueryPredicate::Or(l, r) => {
                l.collect_attributes(out);
                r.collect_attributes(out);
            }
            QueryPredicate::Not(inner) => inner.collect_attributes(out),
        }
    }
}

impl fmt::Display for QueryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPredicate::Compare {
                attribute,
                op,
                literal,
            } => write!(f, "{} {} {}", attribute, op, literal),
            QueryPredicate::And(l, r) => write!(f, "({} AND {})", l, r),
            QueryPredicate::Or(l, r) => write!(f, "({} OR {})", l, r),
            QueryPredicate::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

/// A parsed `SELECT * [WHERE ...]` query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Filter; `None` selects every file
    pub predicate: Option<QueryPredicate>,
}

/// Parse a metadata query.
///
/// Grammar (keywords are case-insensitive):
///
/// ```text
/// query     := SELECT '*' [FROM ident] [WHERE or_expr]
/// or_expr   := and_expr (OR and_expr)*
/// and_expr  := not_expr (AND not_expr)*
/// not_expr  := NOT not_expr | primary
/// primary   := '(' or_expr ')' | ident op literal
/// ```
pub fn parse(text: &str) -> Result<Query> {
    let mut tokens = TokenStream::new(text)?;
    if tokens.is_empty() {
        return tokens.error("empty query");
    }
    tokens.expect_keyword("select")?;
    tokens.expect(&Token::Star, "'*' after SELECT")?;
    if tokens.eat_keyword("from") {
        match tokens.next() {
            Some(Token::Ident(_)) => {}
            _ => return tokens.error("expected a name after FROM"),
        }
    }
    let predicate = if tokens.eat_keyword("where") {
        Some(parse_or(&mut tokens, 0)?)
    } else {
        None
    };
    if !tokens.is_empty() {
        return tokens.error("unexpected trailing input");
    }
    Ok(Query { predicate })
}

fn parse_or(tokens: &mut TokenStream, depth: usize) -> Result<QueryPredicate> {
    let mut left = parse_and(tokens, depth)?;
    while tokens.eat_keyword("or") {
        let right = parse_and(tokens, depth)?;
        left = QueryPredicate::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(tokens: &mut TokenStream, depth: usize) -> Result<QueryPredicate> {
    let mut left = parse_not(tokens, depth)?;
    while tokens.eat_keyword("and") {
        let right = parse_not(tokens, depth)?;
        left = QueryPredicate::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_not(tokens: &mut TokenStream, depth: usize) -> Result<QueryPredicate> {
    if tokens.eat_keyword("not") {
        let depth = tokens.descend(depth)?;
        return Ok(QueryPredicate::Not(Box::new(parse_not(tokens, depth)?)));
    }
    parse_primary(tokens, depth)
}

fn parse_primary(tokens: &mut TokenStream, depth: usize) -> Result<QueryPredicate> {
    if tokens.eat(&Token::LParen) {
        let depth = tokens.descend(depth)?;
        let inner = parse_or(tokens, depth)?;
        tokens.expect(&Token::RParen, "')'")?;
        return Ok(inner);
    }

    let attribute = match tokens.peek() {
        Some(Token::Ident(name)) if !is_reserved(name) => name.clone(),
        Some(_) => return tokens.error("expected an attribute name"),
        None => return tokens.error("unexpected end of query"),
    };
    tokens.next();

    let op = match tokens.next() {
        Some(Token::Eq) => CompareOp::Eq,
        Some(Token::NotEq) => CompareOp::NotEq,
        Some(Token::Lt) => CompareOp::Lt,
        Some(Token::LtEq) => CompareOp::LtEq,
        Some(Token::Gt) => CompareOp::Gt,
        Some(Token::GtEq) => CompareOp::GtEq,
        _ => return tokens.error(format!("expected a comparison after '{}'", attribute)),
    };

    let literal = match tokens.next() {
        Some(Token::Str(s)) => Scalar::Str(s),
        Some(Token::Int(v)) => Scalar::Int(v),
        Some(Token::Float(v)) => Scalar::Float(v),
        _ => return tokens.error("expected a string or number literal"),
    };

    Ok(QueryPredicate::Compare {
        attribute,
        op,
        literal,
    })
}

fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|k| name.eq_ignore_ascii_case(k))
}
