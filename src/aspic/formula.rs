use std::collections::BTreeMap;
use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1, take_while_m_n},
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, opt, recognize},
    sequence::{delimited, pair},
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

use super::error::AspicError;
use super::expr;

/// True when a token names a variable (uppercase initial).
pub fn is_variable(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// A bracketed arithmetic parameter: the variables it mentions and the
/// evaluable text (grouping braces already rewritten to parentheses).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Expression {
    parameters: Vec<String>,
    expression: String,
}

/// A literal `term(p1,...,pn)`.
///
/// Parameters are constants (lowercase or numeric), variables (uppercase
/// initial) or bracketed arithmetic expressions such as `[X*0.8]`. A
/// formula whose term is itself a binary comparison (`X>65`) acts as a
/// side-condition in rule antecedents and carries no parameters.
///
/// Two formulas are equal when term and parameter sequence match;
/// `variable_mapping` only affects rendering of unresolved parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub term: String,
    pub parameters: Vec<String>,
    pub variables: Vec<String>,
    pub is_comparison: bool,
    expressions: BTreeMap<usize, Expression>,
    expression_map: BTreeMap<String, String>,
    pub variable_mapping: BTreeMap<String, String>,
}

fn formula_body(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, term) = take_while1(|c| c != '(' && c != ')' && c != ' ')(input)?;
    let (input, params) = opt(delimited(
        char('('),
        take_while1(|c| c != '(' && c != ')'),
        char(')'),
    ))
    .parse(input)?;
    Ok((input, (term, params)))
}

// One comparison operand: a variable (`X`, `Age`) or a numeric literal.
fn comparison_operand(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(
            take_while_m_n(1, 1, |c: char| c.is_ascii_uppercase()),
            take_while(|c: char| c.is_ascii_lowercase()),
        )),
        digit1,
    ))
    .parse(input)
}

fn comparison_operands(term: &str) -> Option<(String, String)> {
    let mut parser = all_consuming((
        comparison_operand,
        delimited(space0, alt((tag("=="), tag("<"), tag(">"))), space0),
        comparison_operand,
    ));
    let (_, (lhs, _, rhs)) = parser.parse(term).ok()?;
    Some((lhs.to_string(), rhs.to_string()))
}

// Content of the first bracketed section of a parameter, if any.
fn bracket_content(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let rest = &raw[start + 1..];
    let end = rest.find(']')?;
    let inner = &rest[..end];
    if inner.is_empty() || inner.contains('[') {
        None
    } else {
        Some(inner)
    }
}

impl Formula {
    pub fn parse(text: &str) -> Result<Formula, AspicError> {
        let trimmed = text.trim();
        let (term, params) = match formula_body(trimmed) {
            Ok((_, parts)) => parts,
            Err(_) => return Err(AspicError::MalformedFormula(text.to_string())),
        };

        let mut formula = Formula {
            term: term.to_string(),
            parameters: Vec::new(),
            variables: Vec::new(),
            is_comparison: false,
            expressions: BTreeMap::new(),
            expression_map: BTreeMap::new(),
            variable_mapping: BTreeMap::new(),
        };

        match params {
            Some(list) => {
                for raw in list.split(',') {
                    let param = raw.trim();
                    if param.is_empty() {
                        continue;
                    }
                    if !formula.record_expression(param) {
                        formula.parameters.push(param.to_string());
                        if is_variable(param) {
                            formula.variables.push(param.to_string());
                        }
                    }
                }
            }
            None => {
                if let Some((lhs, rhs)) = comparison_operands(&formula.term) {
                    formula.is_comparison = true;
                    for operand in [lhs, rhs] {
                        if is_variable(&operand) {
                            formula.variables.push(operand);
                        }
                    }
                }
            }
        }
        Ok(formula)
    }

    // Records `raw` as a bracketed expression parameter. Returns false
    // when the parameter is not an expression.
    fn record_expression(&mut self, raw: &str) -> bool {
        let Some(inner) = bracket_content(raw) else {
            return false;
        };
        self.parameters.push(inner.to_string());

        let mut expr_parameters = Vec::new();
        let mut current = String::new();
        for ch in inner.chars() {
            if matches!(ch, '+' | '-' | '*' | '/' | '{' | '}') {
                if !current.is_empty() && is_variable(&current) {
                    self.variables.push(current.clone());
                    expr_parameters.push(current.clone());
                }
                current.clear();
            } else {
                current.push(ch);
            }
        }
        if !current.is_empty() && is_variable(&current) {
            self.variables.push(current.clone());
            expr_parameters.push(current.clone());
        }

        let expression = inner.replace('{', "(").replace('}', ")");
        self.expressions.insert(
            self.parameters.len() - 1,
            Expression {
                parameters: expr_parameters,
                expression,
            },
        );
        self.expression_map.insert(inner.to_string(), inner.to_string());
        true
    }

    pub fn has_variables(&self) -> bool {
        !self.variables.is_empty()
    }

    /// Substitutes bound values into the comparison term and evaluates the
    /// result. Anything that fails to evaluate counts as `false`.
    pub fn evaluate_comparison(&self, variable_mapping: &BTreeMap<String, String>) -> bool {
        if !self.is_comparison {
            return false;
        }
        let mut expression = self.term.clone();
        for (var, value) in variable_mapping {
            expression = expression.replace(var.as_str(), value);
        }
        expr::eval_comparison(&expression).unwrap_or(false)
    }

    /// Substitutes bound variables into every expression parameter and
    /// replaces the parameter with the truncated integer result. An
    /// expression that still fails to evaluate resolves to `0`.
    pub fn resolve_expressions(&mut self) {
        for (&idx, info) in &self.expressions {
            let mut expression = info.expression.clone();
            for p in &info.parameters {
                if let Some(value) = self.variable_mapping.get(p) {
                    expression = expression.replace(p.as_str(), value);
                }
            }
            let result = expr::eval_int(&expression).unwrap_or(0);
            self.parameters[idx] = result.to_string();
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parameters.is_empty() {
            return write!(f, "{}", self.term);
        }
        let rendered: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if let Some(original) = self.expression_map.get(p) {
                    format!("[{}]", original)
                } else if let Some(value) = self.variable_mapping.get(p) {
                    value.clone()
                } else {
                    p.clone()
                }
            })
            .collect();
        write!(f, "{}({})", self.term, rendered.join(", "))
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.parameters == other.parameters
    }
}

impl Eq for Formula {}
