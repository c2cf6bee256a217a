use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, one_of, space0},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};

// Sandboxed arithmetic for expression parameters and comparison
// side-conditions. The grammar covers numeric literals, `+ - * /` and
// parenthesised grouping; there is no name resolution and no calls.
// Evaluation happens in f64 so that literals like `0.8` work; integer
// results are truncated toward zero.

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )
    .parse(input)
}

fn parse_factor(input: &str) -> IResult<&str, f64> {
    alt((
        map(preceded(ws(char('-')), parse_factor), |v| -v),
        delimited(ws(char('(')), parse_expr, ws(char(')'))),
        ws(parse_number),
    ))
    .parse(input)
}

fn parse_term(input: &str) -> IResult<&str, f64> {
    let (input, first) = parse_factor(input)?;
    let (input, rest) = many0(pair(ws(one_of("*/")), parse_factor)).parse(input)?;
    let mut acc = first;
    for (op, value) in rest {
        if op == '*' {
            acc *= value;
        } else {
            if value == 0.0 {
                return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify)));
            }
            acc /= value;
        }
    }
    Ok((input, acc))
}

fn parse_expr(input: &str) -> IResult<&str, f64> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), parse_term)).parse(input)?;
    let mut acc = first;
    for (op, value) in rest {
        if op == '+' {
            acc += value;
        } else {
            acc -= value;
        }
    }
    Ok((input, acc))
}

fn parse_comparison_op(input: &str) -> IResult<&str, &str> {
    alt((tag("=="), tag("<"), tag(">"))).parse(input)
}

pub fn eval_arith(input: &str) -> Option<f64> {
    all_consuming(ws(parse_expr))
        .parse(input)
        .ok()
        .map(|(_, value)| value)
}

/// Evaluates an arithmetic expression to an integer, truncating toward
/// zero. Anything that fails to parse (unbound variables included)
/// yields `None`.
pub fn eval_int(input: &str) -> Option<i64> {
    eval_arith(input).map(|value| value.trunc() as i64)
}

/// Evaluates a binary comparison `expr (<|>|==) expr`.
pub fn eval_comparison(input: &str) -> Option<bool> {
    let (_, (lhs, op, rhs)) = all_consuming((
        ws(parse_expr),
        delimited(space0, parse_comparison_op, space0),
        ws(parse_expr),
    ))
    .parse(input)
    .ok()?;
    Some(match op {
        "<" => lhs < rhs,
        ">" => lhs > rhs,
        _ => lhs == rhs,
    })
}
