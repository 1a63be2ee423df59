//! Pointcuts: predicates selecting which operations advice applies to.
//!
//! Patterns are globs over the fully qualified operation name
//! (`pkg.dao.AccountDao.findAccounts`):
//!
//! - `*` matches any run of characters within one segment
//! - `?` matches one character within a segment
//! - `..` matches any number of whole segments, including none
//!
//! Expressions combine terms with `!`, `&&`, `||` and parentheses:
//!
//! ```ignore
//! let pointcut = Pointcut::parse("joinpoint.dao.*.* && !(getter() || setter())")?;
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use wildmatch::WildMatch;

use super::join_point::OperationId;

/// A rule selecting operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pointcut {
    /// Matches every operation.
    Any,
    /// Matches one fully qualified operation name.
    Exact(String),
    /// Glob over the fully qualified operation name.
    Pattern(Glob),
    /// Method name starts with `get`.
    Getter,
    /// Method name starts with `set`.
    Setter,
    And(Box<Pointcut>, Box<Pointcut>),
    Or(Box<Pointcut>, Box<Pointcut>),
    Not(Box<Pointcut>),
}

impl Pointcut {
    pub fn any() -> Self {
        Pointcut::Any
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Pointcut::Exact(name.into())
    }

    pub fn pattern(glob: impl Into<String>) -> Self {
        Pointcut::Pattern(Glob::new(glob))
    }

    pub fn getter() -> Self {
        Pointcut::Getter
    }

    pub fn setter() -> Self {
        Pointcut::Setter
    }

    /// Any method of any type directly in `package`, except accessors and
    /// mutators.
    pub fn package_excluding_accessors(package: &str) -> Self {
        Pointcut::pattern(format!("{package}.*.*"))
            .and(Pointcut::getter().or(Pointcut::setter()).negate())
    }

    pub fn and(self, other: Pointcut) -> Self {
        Pointcut::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Pointcut) -> Self {
        Pointcut::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Pointcut::Not(Box::new(self))
    }

    pub fn matches(&self, operation: &OperationId) -> bool {
        match self {
            Pointcut::Any => true,
            Pointcut::Exact(name) => *name == operation.full_name(),
            Pointcut::Pattern(glob) => glob.matches(&operation.full_name()),
            Pointcut::Getter => operation.method().starts_with("get"),
            Pointcut::Setter => operation.method().starts_with("set"),
            Pointcut::And(a, b) => a.matches(operation) && b.matches(operation),
            Pointcut::Or(a, b) => a.matches(operation) || b.matches(operation),
            Pointcut::Not(inner) => !inner.matches(operation),
        }
    }

    /// Parse a pointcut expression.
    ///
    /// Terms are `exact:<name>`, a glob, `getter()`, `setter()` or `any()`.
    /// `!` binds tightest, then `&&`, then `||`.
    pub fn parse(expr: &str) -> Result<Self, PointcutError> {
        let mut parser = Parser::new(expr)?;
        let pointcut = parser.parse_or()?;
        match parser.next() {
            None => Ok(pointcut),
            Some((position, token)) => Err(PointcutError::UnexpectedToken {
                position,
                found: token.to_string(),
            }),
        }
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointcut::Any => f.write_str("any()"),
            Pointcut::Exact(name) => write!(f, "exact:{name}"),
            Pointcut::Pattern(glob) => f.write_str(glob.as_str()),
            Pointcut::Getter => f.write_str("getter()"),
            Pointcut::Setter => f.write_str("setter()"),
            Pointcut::And(a, b) => write!(f, "({a} && {b})"),
            Pointcut::Or(a, b) => write!(f, "({a} || {b})"),
            Pointcut::Not(inner) => write!(f, "!{inner}"),
        }
    }
}

impl std::str::FromStr for Pointcut {
    type Err = PointcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointcut::parse(s)
    }
}

/// Errors from [`Pointcut::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PointcutError {
    #[error("empty pointcut expression")]
    Empty,

    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedChar { position: usize, found: char },

    #[error("unexpected '{found}' at position {position}")]
    UnexpectedToken { position: usize, found: String },

    #[error("unexpected end of pointcut expression")]
    UnexpectedEnd,
}

/// A compiled operation-name glob.
///
/// Segments are matched with [`WildMatch`]; `..` is a segment-level
/// wildcard.
#[derive(Clone)]
pub struct Glob {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Clone)]
enum Segment {
    /// `..`: any number of segments.
    Any,
    One(WildMatch),
}

impl Glob {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        // `a..b` splits into `a`, ``, `b`.
        let segments = source
            .split('.')
            .map(|part| match part {
                "" => Segment::Any,
                glob => Segment::One(WildMatch::new(glob)),
            })
            .collect();
        Self { source, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Greedy match; only the latest `..` is ever resumed.
    pub fn matches(&self, name: &str) -> bool {
        let names: Vec<&str> = name.split('.').collect();
        let (mut p, mut n) = (0, 0);
        let mut resume: Option<(usize, usize)> = None;

        while n < names.len() {
            match self.segments.get(p) {
                Some(Segment::Any) => {
                    resume = Some((p + 1, n));
                    p += 1;
                }
                Some(Segment::One(glob)) if glob.matches(names[n]) => {
                    p += 1;
                    n += 1;
                }
                _ => match resume {
                    Some((after_any, spanned_to)) => {
                        resume = Some((after_any, spanned_to + 1));
                        p = after_any;
                        n = spanned_to + 1;
                    }
                    None => return false,
                },
            }
        }

        self.segments[p..]
            .iter()
            .all(|segment| matches!(segment, Segment::Any))
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Glob {}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.source).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Term(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Not => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Term(term) => f.write_str(term),
        }
    }
}

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '*' | '?' | ':')
}

fn tokenize(expr: &str) -> Result<Vec<(usize, Token)>, PointcutError> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices<'_>> = expr.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '!' => Token::Not,
            '&' | '|' => match chars.next() {
                Some((_, next)) if next == c => {
                    if c == '&' {
                        Token::And
                    } else {
                        Token::Or
                    }
                }
                _ => return Err(PointcutError::UnexpectedChar { position, found: c }),
            },
            c if is_term_char(c) => {
                let mut term = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if !is_term_char(next) {
                        break;
                    }
                    term.push(next);
                    chars.next();
                }
                // `getter()`, `setter()` and `any()` carry an empty argument list.
                if matches!(term.as_str(), "getter" | "setter" | "any") {
                    let mut lookahead = chars.clone();
                    if let (Some((_, '(')), Some((_, ')'))) = (lookahead.next(), lookahead.next()) {
                        chars = lookahead;
                        term.push_str("()");
                    }
                }
                Token::Term(term)
            }
            found => return Err(PointcutError::UnexpectedChar { position, found }),
        };
        tokens.push((position, token));
    }

    Ok(tokens)
}

struct Parser {
    tokens: std::vec::IntoIter<(usize, Token)>,
    peeked: Option<(usize, Token)>,
}

impl Parser {
    fn new(expr: &str) -> Result<Self, PointcutError> {
        let tokens = tokenize(expr)?;
        if tokens.is_empty() {
            return Err(PointcutError::Empty);
        }
        Ok(Self {
            tokens: tokens.into_iter(),
            peeked: None,
        })
    }

    fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.tokens.next();
        }
        self.peeked.as_ref().map(|(_, token)| token)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        self.peeked.take().or_else(|| self.tokens.next())
    }

    fn parse_or(&mut self) -> Result<Pointcut, PointcutError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            left = left.or(self.parse_and()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Pointcut, PointcutError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            left = left.and(self.parse_unary()?);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Pointcut, PointcutError> {
        match self.next() {
            None => Err(PointcutError::UnexpectedEnd),
            Some((_, Token::Not)) => Ok(self.parse_unary()?.negate()),
            Some((_, Token::LParen)) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((position, token)) => Err(PointcutError::UnexpectedToken {
                        position,
                        found: token.to_string(),
                    }),
                    None => Err(PointcutError::UnexpectedEnd),
                }
            }
            Some((_, Token::Term(term))) => Ok(term_to_pointcut(term)),
            Some((position, token)) => Err(PointcutError::UnexpectedToken {
                position,
                found: token.to_string(),
            }),
        }
    }
}

fn term_to_pointcut(term: String) -> Pointcut {
    match term.as_str() {
        "getter()" => Pointcut::Getter,
        "setter()" => Pointcut::Setter,
        "any()" => Pointcut::Any,
        _ => match term.strip_prefix("exact:") {
            Some(name) => Pointcut::exact(name),
            None => Pointcut::pattern(term),
        },
    }
}
