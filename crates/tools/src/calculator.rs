//! `calculate`: arithmetic over a strict character class.
//!
//! Input is restricted to digits, `.`, whitespace, parentheses and
//! `+ - * / %` before anything is parsed. The grammar is the usual one:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := power (('*' | '/' | '%') power)*
//! power   := unary ('**' power)?
//! unary   := ('+' | '-') unary | primary
//! primary := number | '(' expr ')'
//! ```
//!
//! `%` is the floating-point remainder (sign follows the dividend). A result
//! that is not finite, e.g. after dividing by zero, is rejected. Input is
//! capped at [`MAX_EXPRESSION_CHARS`] and nesting (parentheses, unary signs,
//! `**` chains) at [`MAX_DEPTH`] so the parser's recursion stays bounded.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

static SAFE_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-*/%().\s]+$").expect("valid expression regex"));

pub const MAX_EXPRESSION_CHARS: usize = 512;
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct CalculateArgs {
    pub expression: String,
}

#[derive(Debug, Serialize)]
pub struct Calculation {
    pub expression: String,
    pub result: f64,
}

pub fn calculate(args: CalculateArgs) -> Result<Calculation, ToolError> {
    let result = evaluate(&args.expression)?;
    Ok(Calculation {
        expression: args.expression,
        result,
    })
}

pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    if !SAFE_EXPRESSION.is_match(expression) {
        return Err(ToolError::invalid("Expression contains invalid characters."));
    }
    if expression.len() > MAX_EXPRESSION_CHARS {
        return Err(ToolError::invalid(format!(
            "Expression is longer than {MAX_EXPRESSION_CHARS} characters."
        )));
    }

    let mut parser = Parser {
        src: expression.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(syntax_error());
    }

    if !value.is_finite() {
        return Err(ToolError::invalid("Expression did not produce a valid number."));
    }
    Ok(value)
}

fn syntax_error() -> ToolError {
    ToolError::invalid("Expression is not valid arithmetic.")
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn at_pow(&mut self) -> bool {
        self.peek() == Some(b'*') && self.src.get(self.pos + 1) == Some(&b'*')
    }

    /// Run `f` one nesting level deeper.
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<f64, ToolError>,
    ) -> Result<f64, ToolError> {
        if self.depth >= MAX_DEPTH {
            return Err(ToolError::invalid("Expression is nested too deeply."));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    acc += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    acc -= self.term()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ToolError> {
        let mut acc = self.power()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    acc *= self.power()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    acc /= self.power()?;
                }
                Some(b'%') => {
                    self.pos += 1;
                    acc %= self.power()?;
                }
                _ => return Ok(acc),
            }
        }
    }

    fn power(&mut self) -> Result<f64, ToolError> {
        let base = self.unary()?;
        if self.at_pow() {
            self.pos += 2;
            let exp = self.nested(Self::power)?;
            return Ok(base.powf(exp));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.nested(Self::unary)?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let v = self.nested(Self::expr)?;
                if self.peek() != Some(b')') {
                    return Err(syntax_error());
                }
                self.pos += 1;
                Ok(v)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            _ => Err(syntax_error()),
        }
    }

    fn number(&mut self) -> Result<f64, ToolError> {
        let start = self.pos;
        let mut dots = 0;
        while let Some(&c) = self.src.get(self.pos) {
            if c == b'.' {
                dots += 1;
            } else if !c.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|_| syntax_error())?;
        if dots > 1 || text == "." {
            return Err(syntax_error());
        }
        text.parse::<f64>().map_err(|_| syntax_error())
    }
}
