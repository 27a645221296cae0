//! nom grammar for the expression language.
//!
//! Precedence, loosest first: `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* / %`, unary `! -`, then primaries (literals, column references,
//! function calls, parenthesised expressions).

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{map, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    Finish, IResult,
};

use super::{ExprError, Expression, Literal, Operator, UnaryOperator};

type PResult<'a, T> = IResult<&'a str, T>;

/// Parse a complete expression; trailing input is an error.
pub fn parse(input: &str) -> Result<Expression, ExprError> {
    let (rest, expr) = preceded(multispace0, or_expr)(input)
        .finish()
        .map_err(|e: nom::error::Error<&str>| {
            ExprError::Syntax(format!("near '{}'", e.input.trim()))
        })?;
    if !rest.trim().is_empty() {
        return Err(ExprError::Syntax(format!(
            "unexpected trailing input '{}'",
            rest.trim()
        )));
    }
    Ok(expr)
}

fn binary_chain(
    init: Expression,
    rest: Vec<(Operator, Expression)>,
) -> Expression {
    rest.into_iter().fold(init, |left, (op, right)| Expression::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

fn or_expr(input: &str) -> PResult<'_, Expression> {
    let (input, init) = and_expr(input)?;
    let (input, rest) = many0(pair(
        value(Operator::Or, preceded(multispace0, tag("||"))),
        preceded(multispace0, and_expr),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn and_expr(input: &str) -> PResult<'_, Expression> {
    let (input, init) = equality(input)?;
    let (input, rest) = many0(pair(
        value(Operator::And, preceded(multispace0, tag("&&"))),
        preceded(multispace0, equality),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn equality(input: &str) -> PResult<'_, Expression> {
    let (input, init) = comparison(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(Operator::Equal, tag("==")),
                value(Operator::NotEqual, tag("!=")),
            )),
        ),
        preceded(multispace0, comparison),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn comparison(input: &str) -> PResult<'_, Expression> {
    let (input, init) = additive(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(Operator::LessThanOrEqual, tag("<=")),
                value(Operator::GreaterThanOrEqual, tag(">=")),
                value(Operator::LessThan, tag("<")),
                value(Operator::GreaterThan, tag(">")),
            )),
        ),
        preceded(multispace0, additive),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn additive(input: &str) -> PResult<'_, Expression> {
    let (input, init) = term(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(Operator::Add, char('+')),
                value(Operator::Subtract, char('-')),
            )),
        ),
        preceded(multispace0, term),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn term(input: &str) -> PResult<'_, Expression> {
    let (input, init) = unary(input)?;
    let (input, rest) = many0(pair(
        preceded(
            multispace0,
            alt((
                value(Operator::Multiply, char('*')),
                value(Operator::Divide, char('/')),
                value(Operator::Modulo, char('%')),
            )),
        ),
        preceded(multispace0, unary),
    ))(input)?;
    Ok((input, binary_chain(init, rest)))
}

fn unary(input: &str) -> PResult<'_, Expression> {
    alt((
        map(
            preceded(pair(char('!'), multispace0), unary),
            |expr| Expression::Unary {
                op: UnaryOperator::Not,
                expr: Box::new(expr),
            },
        ),
        map(
            preceded(pair(char('-'), multispace0), unary),
            |expr| Expression::Unary {
                op: UnaryOperator::Negate,
                expr: Box::new(expr),
            },
        ),
        primary,
    ))(input)
}

fn primary(input: &str) -> PResult<'_, Expression> {
    alt((
        number,
        map(string_literal, |s| Expression::Literal(Literal::String(s))),
        ident_or_call,
        delimited(
            terminated(char('('), multispace0),
            or_expr,
            preceded(multispace0, char(')')),
        ),
    ))(input)
}

fn number(input: &str) -> PResult<'_, Expression> {
    let (rest, text) = recognize(pair(digit1, opt(preceded(char('.'), digit1))))(input)?;
    let literal = if text.contains('.') {
        match text.parse::<f64>() {
            Ok(f) => Literal::Float(f),
            Err(_) => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Float,
                )))
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(n) => Literal::Int(n),
            Err(_) => {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Digit,
                )))
            }
        }
    };
    Ok((rest, Expression::Literal(literal)))
}

fn string_literal(input: &str) -> PResult<'_, String> {
    alt((quoted('"'), quoted('\'')))(input)
}

/// Quoted string with the usual escapes; the delimiter itself must be
/// escaped inside.
fn quoted<'a>(delim: char) -> impl Fn(&'a str) -> PResult<'a, String> {
    move |input| {
        let escapable: &str = if delim == '"' { "\\\"" } else { "\\'" };
        delimited(
            char(delim),
            map(
                many0(alt((
                    value('\n', tag("\\n")),
                    value('\t', tag("\\t")),
                    value('\r', tag("\\r")),
                    value('\\', tag("\\\\")),
                    value('"', tag("\\\"")),
                    value('\'', tag("\\'")),
                    none_of(escapable),
                ))),
                |chars: Vec<char>| chars.into_iter().collect(),
            ),
            char(delim),
        )(input)
    }
}

/// Identifier, then either a call (when followed by `(`) or a column
/// reference. Dotted names are part of the identifier so generated
/// columns like `body.id` resolve directly.
fn ident_or_call(input: &str) -> PResult<'_, Expression> {
    let (after_ident, ident) = identifier(input)?;
    match ident {
        "true" => Ok((after_ident, Expression::Literal(Literal::Bool(true)))),
        "false" => Ok((after_ident, Expression::Literal(Literal::Bool(false)))),
        "null" => Ok((after_ident, Expression::Literal(Literal::Null))),
        _ => {
            let (rest, args) = opt(preceded(
                multispace0,
                delimited(
                    terminated(char('('), multispace0),
                    separated_list0(
                        preceded(multispace0, terminated(char(','), multispace0)),
                        or_expr,
                    ),
                    preceded(multispace0, char(')')),
                ),
            ))(after_ident)?;
            match args {
                Some(args) => Ok((
                    rest,
                    Expression::Call {
                        name: ident.to_string(),
                        args,
                    },
                )),
                None => Ok((after_ident, Expression::Column(ident.to_string()))),
            }
        }
    }
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    ))(input)
}
