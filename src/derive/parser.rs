use std::fmt;

use crate::error::Result;
use crate::lexer::{Token, TokenStream};
use crate::query::CompareOp;
use crate::value::Scalar;

/// Largest table a projection may produce
pub const MAX_TABLE_ROWS: usize = 1000;

const RESERVED: &[&str] = &[
    "select", "from", "where", "limit", "and", "or", "not", "is", "null", "true", "false",
];

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

impl AggregateFn {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFn::Count),
            "sum" => Some(AggregateFn::Sum),
            "avg" => Some(AggregateFn::Avg),
            "min" => Some(AggregateFn::Min),
            "max" => Some(AggregateFn::Max),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        })
    }
}

/// `FN(column)` or `COUNT(*)`
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Function
    pub func: AggregateFn,
    /// Argument column; `None` for `COUNT(*)`
    pub column: Option<String>,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}({})", self.func, column),
            None => write!(f, "{}(*)", self.func),
        }
    }
}

/// What a derivation query returns
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// `SELECT *`
    All,
    /// Named columns
    Columns(Vec<String>),
    /// Aggregates only
    Aggregates(Vec<Aggregate>),
}

/// Row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op literal`
    Compare {
        /// Column name
        column: String,
        /// Operator
        op: CompareOp,
        /// Literal operand
        literal: Scalar,
    },
    /// `column IS [NOT] NULL`
    IsNull {
        /// Column name
        column: String,
        /// True for `IS NOT NULL`
        negated: bool,
    },
    /// Conjunction
    And(Box<Condition>, Box<Condition>),
    /// Disjunction
    Or(Box<Condition>, Box<Condition>),
    /// Negation
    Not(Box<Condition>),
}

/// A parsed derivation query
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationQuery {
    /// Output items
    pub selection: Selection,
    /// Table name after `FROM`, informational only
    pub from: Option<String>,
    /// Row filter
    pub filter: Option<Condition>,
    /// Row cap for projections
    pub limit: Option<usize>,
}

/// Parse a derivation query.
///
/// ```text
/// query     := SELECT items [FROM ident] [WHERE or_cond] [LIMIT int]
/// items     := '*' | item (',' item)*
/// item      := ident | FN '(' ('*' | ident) ')'
/// or_cond   := and_cond (OR and_cond)*
/// and_cond  := not_cond (AND not_cond)*
/// not_cond  := NOT not_cond | '(' or_cond ')' | ident op literal | ident IS [NOT] NULL
/// literal   := string | int | float | TRUE | FALSE
/// ```
pub fn parse(text: &str) -> Result<DerivationQuery> {
    let mut tokens = TokenStream::new(text)?;
    if tokens.is_empty() {
        return tokens.error("empty derivation query");
    }
    tokens.expect_keyword("select")?;
    let selection = parse_selection(&mut tokens)?;

    let from = if tokens.eat_keyword("from") {
        match tokens.next() {
            Some(Token::Ident(name)) => Some(name),
            _ => return tokens.error("expected a table name after FROM"),
        }
    } else {
        None
    };

    let filter = if tokens.eat_keyword("where") {
        Some(parse_or(&mut tokens, 0)?)
    } else {
        None
    };

    let limit = if tokens.eat_keyword("limit") {
        match tokens.next() {
            Some(Token::Int(n)) if n >= 0 => {
                let n = n as usize;
                if n > MAX_TABLE_ROWS {
                    return tokens.error(format!("LIMIT may not exceed {}", MAX_TABLE_ROWS));
                }
                Some(n)
            }
            _ => return tokens.error("expected a non-negative integer after LIMIT"),
        }
    } else {
        None
    };

    if !tokens.is_empty() {
        return tokens.error("unexpected trailing input");
    }
    Ok(DerivationQuery {
        selection,
        from,
        filter,
        limit,
    })
}

fn parse_selection(tokens: &mut TokenStream) -> Result<Selection> {
    if tokens.eat(&Token::Star) {
        return Ok(Selection::All);
    }

    let mut columns = Vec::new();
    let mut aggregates = Vec::new();
    loop {
        let name = match tokens.peek() {
            Some(Token::Ident(name)) if !is_reserved(name) => name.clone(),
            _ => return tokens.error("expected a column or aggregate"),
        };
        tokens.next();

        match (AggregateFn::from_name(&name), tokens.peek()) {
            (Some(func), Some(Token::LParen)) => {
                tokens.next();
                let column = if tokens.eat(&Token::Star) {
                    if func != AggregateFn::Count {
                        return tokens.error(format!("{}(*) is not supported", func));
                    }
                    None
                } else {
                    match tokens.next() {
                        Some(Token::Ident(c)) if !is_reserved(&c) => Some(c),
                        _ => return tokens.error("expected a column name"),
                    }
                };
                tokens.expect(&Token::RParen, "')'")?;
                aggregates.push(Aggregate { func, column });
            }
            _ => columns.push(name),
        }

        if !tokens.eat(&Token::Comma) {
            break;
        }
    }

    match (columns.is_empty(), aggregates.is_empty()) {
        (true, false) => Ok(Selection::Aggregates(aggregates)),
        (false, true) => Ok(Selection::Columns(columns)),
        _ => tokens.error("aggregates cannot be mixed with plain columns"),
    }
}

fn parse_or(tokens: &mut TokenStream, depth: usize) -> Result<Condition> {
    let mut left = parse_and(tokens, depth)?;
    while tokens.eat_keyword("or") {
        let right = parse_and(tokens, depth)?;
        left = Condition::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(tokens: &mut TokenStream, depth: usize) -> Result<Condition> {
    let mut left = parse_not(tokens, depth)?;
    while tokens.eat_keyword("and") {
        let right = parse_not(tokens, depth)?;
        left = Condition::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_not(tokens: &mut TokenStream, depth: usize) -> Result<Condition> {
    if tokens.eat_keyword("not") {
        let depth = tokens.descend(depth)?;
        return Ok(Condition::Not(Box::new(parse_not(tokens, depth)?)));
    }
    if tokens.eat(&Token::LParen) {
        let depth = tokens.descend(depth)?;
        let inner = parse_or(tokens, depth)?;
        tokens.expect(&Token::RParen, "')'")?;
        return Ok(inner);
    }

    let column = match tokens.peek() {
        Some(Token::Ident(name)) if !is_reserved(name) => name.clone(),
        Some(_) => return tokens.error("expected a column name"),
        None => return tokens.error("unexpected end of query"),
    };
    tokens.next();

    if tokens.eat_keyword("is") {
        let negated = tokens.eat_keyword("not");
        tokens.expect_keyword("null")?;
        return Ok(Condition::IsNull { column, negated });
    }

    let op = match tokens.next() {
        Some(Token::Eq) => CompareOp::Eq,
        Some(Token::NotEq) => CompareOp::NotEq,
        Some(Token::Lt) => CompareOp::Lt,
        Some(Token::LtEq) => CompareOp::LtEq,
        Some(Token::Gt) => CompareOp::Gt,
        Some(Token::GtEq) => CompareOp::GtEq,
        _ => return tokens.error(format!("expected a comparison after '{}'", column)),
    };

    let literal = match tokens.next() {
        Some(Token::Str(s)) => Scalar::Str(s),
        Some(Token::Int(v)) => Scalar::Int(v),
        Some(Token::Float(v)) => Scalar::Float(v),
        Some(t) if t.is_keyword("true") => Scalar::Bool(true),
        Some(t) if t.is_keyword("false") => Scalar::Bool(false),
        Some(t) if t.is_keyword("null") => {
            return tokens.error("use IS NULL to compare with NULL");
        }
        _ => return tokens.error("expected a literal"),
    };

    Ok(Condition::Compare {
        column,
        op,
        literal,
    })
}

fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|k| name.eq_ignore_ascii_case(k))
}
