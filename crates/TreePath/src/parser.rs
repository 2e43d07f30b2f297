//! # Expression Parser
//!
//! Turns path expression source text into the closed [`Expression`] tree the
//! evaluator walks. The grammar is implemented with `chumsky` and follows the usual
//! operator ladder, from tightest to loosest binding:
//!
//! 1. Postfix: member access and function calls (`.`), indexers (`[]`)
//! 2. Prefix polarity: `+`, `-`
//! 3. Multiplicative: `*`, `/`, `div`, `mod`
//! 4. Additive: `+`, `-`, `&`
//! 5. Union: `|`
//! 6. Inequality: `<`, `<=`, `>`, `>=`
//! 7. Type: `is`, `as`
//! 8. Equality: `=`, `~`, `!=`, `!~`
//! 9. Membership: `in`, `contains`
//! 10. `and`
//! 11. `or`, `xor`
//! 12. `implies`
//!
//! Every literal and identifier keeps the exact source text it was parsed from.
//! The evaluator uses that text as the key of its literal and identifier caches.
//!
//! ```rust
//! use treepath::parser::parse;
//!
//! let expr = parse("item.where(active = true).select(name)").unwrap();
//! assert!(parse("item.where(").is_err());
//! # let _ = expr;
//! ```

use chumsky::Parser;
use chumsky::error::Rich;
use chumsky::prelude::*;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use treepath_support::{PrecisionDate, PrecisionDateTime, PrecisionTime, Value};

/// A literal value as written in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `{}`
    Null,
    Boolean(bool),
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Date(PrecisionDate),
    DateTime(PrecisionDateTime),
    Time(PrecisionTime),
    /// Magnitude and unit, e.g. `5 'mg'` or `3 days`
    Quantity(Decimal, String),
}

impl Literal {
    /// The value this literal denotes. `{}` denotes nothing.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Literal::Null => None,
            Literal::Boolean(b) => Some(Value::Boolean(*b)),
            Literal::String(s) => Some(Value::String(s.clone())),
            Literal::Integer(i) => Some(Value::Integer(*i)),
            Literal::Decimal(d) => Some(Value::Decimal(*d)),
            Literal::Date(d) => Some(Value::Date(d.clone())),
            Literal::DateTime(dt) => Some(Value::DateTime(dt.clone())),
            Literal::Time(t) => Some(Value::Time(t.clone())),
            Literal::Quantity(value, unit) => Some(Value::Quantity(*value, unit.clone())),
        }
    }
}

/// A literal together with the source text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralTerm {
    pub source: String,
    pub literal: Literal,
}

/// An identifier. `source` includes the back-ticks of a delimited identifier,
/// `name` is the identifier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub source: String,
    pub name: String,
}

impl Identifier {
    pub fn new(source: &str, name: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Type name used by `is` and `as`, optionally namespace qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpecifier {
    pub namespace: Option<String>,
    pub name: String,
}

impl TypeSpecifier {
    /// `Namespace.Name`, or just `Name` when unqualified.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolarityOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiplicativeOp {
    Multiply,
    Divide,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditiveOp {
    Add,
    Subtract,
    Concatenate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOp {
    Is,
    As,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InequalityOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOp {
    Equal,
    NotEqual,
    Equivalent,
    NotEquivalent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOp {
    In,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrOp {
    Or,
    Xor,
}

/// A parsed expression. One variant per grammar production.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Term(Term),
    /// `left.member` or `left.function(args)`
    Invocation(Box<Expression>, Invocation),
    /// `left[index]`
    Indexer(Box<Expression>, Box<Expression>),
    Polarity(PolarityOp, Box<Expression>),
    Multiplicative(Box<Expression>, MultiplicativeOp, Box<Expression>),
    Additive(Box<Expression>, AdditiveOp, Box<Expression>),
    Type(Box<Expression>, TypeOp, TypeSpecifier),
    Union(Box<Expression>, Box<Expression>),
    Inequality(Box<Expression>, InequalityOp, Box<Expression>),
    Equality(Box<Expression>, EqualityOp, Box<Expression>),
    Membership(Box<Expression>, MembershipOp, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, OrOp, Box<Expression>),
    Implies(Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Invocation(Invocation),
    Literal(LiteralTerm),
    /// `%name` or `%'name'`
    ExternalConstant(String),
    Parenthesized(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Member(Identifier),
    Function(Identifier, Vec<Expression>),
    This,
    Index,
    Total,
}

enum Postfix {
    Invoke(Invocation),
    Index(Expression),
}

/// Parses `text` into an expression, joining all syntax errors into one message.
pub fn parse(text: &str) -> Result<Expression, String> {
    parser().parse(text).into_result().map_err(|errors| {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    })
}

/// Skips whitespace, `//` line comments and `/* */` block comments around `parser`.
fn custom_padded<'src, T, P>(
    parser: P,
) -> impl Parser<'src, &'src str, T, extra::Err<Rich<'src, char>>> + Clone
where
    P: Parser<'src, &'src str, T, extra::Err<Rich<'src, char>>> + Clone,
    T: Clone,
{
    let ws_or_comment = choice((
        text::whitespace().at_least(1).ignored(),
        just("//")
            .then(any().and_is(text::newline().or(end()).not()).repeated())
            .ignored(),
        just("/*")
            .then(any().and_is(just("*/").not()).repeated())
            .then(just("*/"))
            .ignored(),
    ))
    .repeated()
    .ignored();

    ws_or_comment
        .then(parser)
        .map(|(_, result)| result)
        .then_ignore(ws_or_comment)
}

/// Builds the expression parser.
pub fn parser<'src>()
-> impl Parser<'src, &'src str, Expression, extra::Err<Rich<'src, char>>> + Clone + 'src {
    let esc = just('\\').ignore_then(choice((
        just('`').to('`'),
        just('\'').to('\''),
        just('\\').to('\\'),
        just('/').to('/'),
        just('f').to('\u{000C}'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
        just('"').to('"'),
        just('u').ignore_then(
            any()
                .filter(|c: &char| c.is_ascii_hexdigit())
                .repeated()
                .exactly(4)
                .collect::<String>()
                .try_map(
                    |digits: String, span| match u32::from_str_radix(&digits, 16) {
                        Ok(code) => char::from_u32(code)
                            .ok_or_else(|| Rich::custom(span, "Invalid Unicode code point")),
                        Err(_) => Err(Rich::custom(span, "Invalid hex digits")),
                    },
                ),
        ),
    )));

    macro_rules! padded {
        ($p:expr) => {
            custom_padded($p)
        };
    }

    let digits = || {
        any()
            .filter(|c: &char| c.is_ascii_digit())
            .repeated()
            .at_least(1)
    };
    let fixed_digits = |count: usize| {
        any()
            .filter(|c: &char| c.is_ascii_digit())
            .repeated()
            .exactly(count)
    };

    // LITERALS

    let null = just('{').then(just('}')).to(Literal::Null);

    let boolean = choice((
        text::keyword("true").to(Literal::Boolean(true)),
        text::keyword("false").to(Literal::Boolean(false)),
    ));

    let quoted = just('\'')
        .ignore_then(none_of("\\\'").or(esc).repeated().collect::<String>())
        .then_ignore(just('\''));

    let string = quoted.clone().map(Literal::String);

    // Integer when the text converts exactly to i64, decimal otherwise.
    let number_text = digits().then(just('.').then(digits()).or_not()).to_slice();
    let number = number_text.clone().try_map(|text: &str, span| {
        match Value::from_number_literal(text) {
            Some(Value::Integer(i)) => Ok(Literal::Integer(i)),
            Some(Value::Decimal(d)) => Ok(Literal::Decimal(d)),
            _ => Err(Rich::custom(span, format!("Invalid number: {}", text))),
        }
    });

    let unit_keyword = choice((
        text::keyword("years"),
        text::keyword("year"),
        text::keyword("months"),
        text::keyword("month"),
        text::keyword("weeks"),
        text::keyword("week"),
        text::keyword("days"),
        text::keyword("day"),
        text::keyword("hours"),
        text::keyword("hour"),
        text::keyword("minutes"),
        text::keyword("minute"),
        text::keyword("seconds"),
        text::keyword("second"),
        text::keyword("milliseconds"),
        text::keyword("millisecond"),
    ))
    .map(|unit: &str| unit.to_string());

    let quantity = number_text
        .then_ignore(text::whitespace().at_least(1))
        .then(choice((unit_keyword, quoted.clone())))
        .try_map(|(text, unit), span| {
            Decimal::from_str(text)
                .map(|value| Literal::Quantity(value, unit))
                .map_err(|_| Rich::custom(span, format!("Invalid quantity: {}", text)))
        });

    let time_format = fixed_digits(2)
        .then(
            just(':')
                .then(fixed_digits(2))
                .then(
                    just(':')
                        .then(fixed_digits(2))
                        .then(just('.').then(digits()).or_not())
                        .or_not(),
                )
                .or_not(),
        )
        .to_slice();

    let timezone_format = just('Z')
        .ignored()
        .or(one_of("+-")
            .then(fixed_digits(2))
            .then(just(':'))
            .then(fixed_digits(2))
            .ignored())
        .to_slice();

    let date_format = fixed_digits(4)
        .then(
            just('-')
                .then(fixed_digits(2))
                .then(just('-').then(fixed_digits(2)).or_not())
                .or_not(),
        )
        .to_slice();

    // @DATE T TIME [TZ]
    let datetime_literal = just('@')
        .ignore_then(
            date_format
                .clone()
                .then(just('T'))
                .then(time_format.clone())
                .then(timezone_format.clone().or_not())
                .to_slice(),
        )
        .try_map(|text: &str, span| {
            PrecisionDateTime::parse(text)
                .map(Literal::DateTime)
                .ok_or_else(|| Rich::custom(span, format!("Invalid datetime format: {}", text)))
        });

    // @DATE T
    let partial_datetime_literal = just('@')
        .ignore_then(date_format.clone().then(just('T')).to_slice())
        .try_map(|text: &str, span| {
            PrecisionDateTime::parse(text)
                .map(Literal::DateTime)
                .ok_or_else(|| Rich::custom(span, format!("Invalid datetime format: {}", text)))
        });

    // @T TIME, which never carries a timezone
    let time_literal = just("@T")
        .ignore_then(time_format)
        .then(timezone_format.or_not())
        .try_map(|(text, tz): (&str, Option<&str>), span| {
            if tz.is_some() {
                return Err(Rich::custom(span, "Time literal cannot have a timezone offset"));
            }
            PrecisionTime::parse(text)
                .map(Literal::Time)
                .ok_or_else(|| Rich::custom(span, format!("Invalid time format: {}", text)))
        });

    let date_literal = just('@').ignore_then(date_format).try_map(|text: &str, span| {
        PrecisionDate::parse(text)
            .map(Literal::Date)
            .ok_or_else(|| Rich::custom(span, format!("Invalid date format: {}", text)))
    });

    // Quantities before bare numbers, date-times before dates.
    let literal = choice((
        null,
        boolean,
        string,
        quantity,
        number,
        datetime_literal,
        partial_datetime_literal,
        time_literal,
        date_literal,
    ))
    .map_with(|literal, e| {
        let source: &str = e.slice();
        LiteralTerm {
            source: source.to_string(),
            literal,
        }
    })
    .boxed();
    let literal = padded!(literal).map(Term::Literal);

    // IDENTIFIERS

    let standard_identifier = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .map(|text: &str| Identifier::new(text, text));

    let delimited_identifier = just('`')
        .ignore_then(none_of("`\\").or(esc).repeated().collect::<String>())
        .then_ignore(just('`'))
        .map_with(|name: String, e| {
            let source: &str = e.slice();
            Identifier {
                source: source.to_string(),
                name,
            }
        });

    let identifier = padded!(choice((standard_identifier, delimited_identifier)).boxed());

    let qualified_identifier = identifier
        .clone()
        .then(just('.').ignore_then(identifier.clone()).or_not())
        .map(|(first, second)| match second {
            Some(name) => TypeSpecifier {
                namespace: Some(first.name),
                name: name.name,
            },
            None => TypeSpecifier {
                namespace: None,
                name: first.name,
            },
        })
        .boxed();

    let external_constant = just('%')
        .ignore_then(choice((identifier.clone().map(|id| id.name), quoted.clone())))
        .map(Term::ExternalConstant);
    let external_constant = padded!(external_constant);

    recursive(|expr| {
        let arguments = expr
            .clone()
            .separated_by(just(',').padded())
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just('(').padded(), just(')').padded())
            .boxed();

        let atom = choice((
            literal.clone().map(Expression::Term).boxed(),
            external_constant.clone().map(Expression::Term).boxed(),
            identifier
                .clone()
                .then(arguments.clone())
                .map(|(name, args)| {
                    Expression::Term(Term::Invocation(Invocation::Function(name, args)))
                })
                .boxed(),
            choice((
                just("$this").to(Invocation::This),
                just("$index").to(Invocation::Index),
                just("$total").to(Invocation::Total),
                identifier.clone().map(Invocation::Member),
            ))
            .map(|invocation| Expression::Term(Term::Invocation(invocation)))
            .boxed(),
            expr.clone()
                .delimited_by(just('(').padded(), just(')').padded())
                .map(|inner| Expression::Term(Term::Parenthesized(Box::new(inner))))
                .boxed(),
        ));
        let atom = padded!(atom);

        let postfix = choice((
            just('.')
                .ignore_then(identifier.clone().then(arguments.clone().or_not()))
                .map(|(name, args)| {
                    Postfix::Invoke(match args {
                        Some(args) => Invocation::Function(name, args),
                        None => Invocation::Member(name),
                    })
                }),
            expr.clone()
                .delimited_by(just('[').padded(), just(']').padded())
                .map(Postfix::Index),
        ))
        .boxed();

        let atom_with_postfix = atom
            .then(postfix.repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, op| match op {
                    Postfix::Invoke(invocation) => Expression::Invocation(Box::new(acc), invocation),
                    Postfix::Index(index) => Expression::Indexer(Box::new(acc), Box::new(index)),
                })
            });

        let prefix_op = choice((
            just('+').to(PolarityOp::Plus),
            just('-').to(PolarityOp::Minus),
        ))
        .padded();

        let polarity = prefix_op
            .repeated()
            .collect::<Vec<_>>()
            .then(atom_with_postfix)
            .map(|(ops, operand)| {
                ops.into_iter()
                    .rev()
                    .fold(operand, |acc, op| Expression::Polarity(op, Box::new(acc)))
            })
            .boxed();

        let op_mul = choice((
            just('*').to(MultiplicativeOp::Multiply),
            just('/').to(MultiplicativeOp::Divide),
            text::keyword("div").to(MultiplicativeOp::Div),
            text::keyword("mod").to(MultiplicativeOp::Mod),
        ))
        .padded();
        let multiplicative = polarity
            .clone()
            .then(op_mul.then(polarity).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Multiplicative(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        let op_add = choice((
            just('+').to(AdditiveOp::Add),
            just('-').to(AdditiveOp::Subtract),
            just('&').to(AdditiveOp::Concatenate),
        ))
        .padded();
        let additive = multiplicative
            .clone()
            .then(op_add.then(multiplicative).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Additive(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        let union = additive
            .clone()
            .then(just('|').padded().ignore_then(additive).repeated().collect::<Vec<_>>())
            .map(|(left, rights)| {
                rights.into_iter().fold(left, |acc, right| {
                    Expression::Union(Box::new(acc), Box::new(right))
                })
            })
            .boxed();

        let op_ineq = choice((
            just("<=").to(InequalityOp::LessOrEqual),
            just("<").to(InequalityOp::Less),
            just(">=").to(InequalityOp::GreaterOrEqual),
            just(">").to(InequalityOp::Greater),
        ))
        .padded();
        let inequality = union
            .clone()
            .then(op_ineq.then(union).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Inequality(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        let op_type = choice((
            text::keyword("is").to(TypeOp::Is),
            text::keyword("as").to(TypeOp::As),
        ))
        .padded();
        let type_expr = inequality
            .then(op_type.then(qualified_identifier.clone()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, type_spec)| {
                    Expression::Type(Box::new(acc), op, type_spec)
                })
            })
            .boxed();

        let op_eq = choice((
            just("=").to(EqualityOp::Equal),
            just("~").to(EqualityOp::Equivalent),
            just("!=").to(EqualityOp::NotEqual),
            just("!~").to(EqualityOp::NotEquivalent),
        ))
        .padded();
        let equality = type_expr
            .clone()
            .then(op_eq.then(type_expr).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Equality(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        let op_mem = choice((
            text::keyword("in").to(MembershipOp::In),
            text::keyword("contains").to(MembershipOp::Contains),
        ))
        .padded();
        let membership = equality
            .clone()
            .then(op_mem.then(equality).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Membership(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        let logical_and = membership
            .clone()
            .then(
                text::keyword("and")
                    .padded()
                    .ignore_then(membership)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(left, rights)| {
                rights.into_iter().fold(left, |acc, right| {
                    Expression::And(Box::new(acc), Box::new(right))
                })
            })
            .boxed();

        let op_or = choice((
            text::keyword("or").to(OrOp::Or),
            text::keyword("xor").to(OrOp::Xor),
        ))
        .padded();
        let logical_or = logical_and
            .clone()
            .then(op_or.then(logical_and).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Or(Box::new(acc), op, Box::new(right))
                })
            })
            .boxed();

        logical_or
            .clone()
            .then(
                text::keyword("implies")
                    .padded()
                    .ignore_then(logical_or)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(left, rights)| {
                rights.into_iter().fold(left, |acc, right| {
                    Expression::Implies(Box::new(acc), Box::new(right))
                })
            })
    })
    .then_ignore(end())
}
