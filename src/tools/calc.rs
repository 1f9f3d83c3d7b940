//! Arithmetic expression tool.

use std::iter::Peekable;
use std::path::Path;
use std::str::CharIndices;

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;

/// Deepest nesting of parentheses, signs and exponents accepted.
const MAX_DEPTH: usize = 256;

/// Evaluate an arithmetic expression.
pub struct Calculate;

#[async_trait]
impl Tool for Calculate {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression such as '2+2' or '(10*5)/3'. Supports + - * / % ^, parentheses and decimals."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. '2+2' or '10*5'"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let expression = args["expression"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("'expression' must be a string"))?;

        tracing::debug!("Evaluating expression: {}", expression);

        let value = evaluate(expression)?;
        Ok(format!("Result: {}", format_number(value)))
    }
}

/// Evaluate `input` with the usual precedence: `^` (right-assoc) over
/// unary minus over `* / %` over `+ -`.
pub fn evaluate(input: &str) -> anyhow::Result<f64> {
    let mut parser = Parser {
        input,
        chars: input.char_indices().peekable(),
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some((pos, c)) = parser.chars.peek() {
        bail!("Unexpected '{}' at position {}", c, pos);
    }
    if !value.is_finite() {
        bail!("Result is not a finite number");
    }
    Ok(value)
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        self.chars.next_if(|&(_, c)| c == expected).is_some()
    }

    fn expr(&mut self) -> anyhow::Result<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> anyhow::Result<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    bail!("Division by zero");
                }
                value /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    bail!("Division by zero");
                }
                value %= rhs;
            } else {
                return Ok(value);
            }
        }
    }

    // Every recursive path (parentheses, signs, exponents) goes through here.
    fn unary(&mut self) -> anyhow::Result<f64> {
        if self.depth >= MAX_DEPTH {
            bail!("Expression nested too deeply");
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> anyhow::Result<f64> {
        if self.eat('-') {
            Ok(-self.unary()?)
        } else if self.eat('+') {
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> anyhow::Result<f64> {
        let base = self.primary()?;
        if self.eat('^') {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> anyhow::Result<f64> {
        if self.eat('(') {
            let value = self.expr()?;
            if !self.eat(')') {
                bail!("Expected ')'");
            }
            return Ok(value);
        }

        self.skip_whitespace();
        let start = match self.chars.peek() {
            Some(&(pos, c)) if c.is_ascii_digit() || c == '.' => pos,
            Some(&(pos, c)) => bail!("Unexpected '{}' at position {}", c, pos),
            None => bail!("Unexpected end of expression"),
        };

        let mut end = start;
        while let Some((pos, c)) = self.chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
            end = pos + c.len_utf8();
        }

        let literal = &self.input[start..end];
        literal
            .parse::<f64>()
            .map_err(|_| anyhow::anyhow!("Invalid number '{}'", literal))
    }
}
