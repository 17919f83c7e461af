//! Sandboxed arithmetic for per-university override formulas.
//!
//! A formula such as `({kor_score} + {math_score}) * 1.1 + {hist_score}` is evaluated in two
//! passes. Placeholders are substituted from a numeric context first, and the substituted
//! text may then only contain digits, `+ - * /`, `.`, parentheses and whitespace. Text that
//! passes that check is tokenized and evaluated by a small recursive-descent parser; nothing
//! else is ever interpreted.

use std::collections::BTreeMap;
use std::fmt;

/// Named values available to `{placeholder}` substitution.
pub type FormulaContext = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("disallowed character '{character}' at position {position}")]
    DisallowedCharacter { character: char, position: usize },
    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("formula ended unexpectedly")]
    UnexpectedEnd,
    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,
    #[error("formula nests deeper than {MAX_NESTING_DEPTH} levels")]
    TooDeep,
    #[error("formula is longer than {MAX_FORMULA_LENGTH} characters")]
    TooLong,
}

/// Parenthesis and unary-sign nesting allowed before the parser gives up.
pub const MAX_NESTING_DEPTH: usize = 64;
/// Length cap on the substituted formula text.
pub const MAX_FORMULA_LENGTH: usize = 4096;

/// Result of a successful evaluation with the trail of substitutions.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaEvaluation {
    pub value: f64,
    pub substituted: String,
    pub notes: Vec<String>,
}

pub fn evaluate(
    formula: &str,
    context: &FormulaContext,
) -> Result<FormulaEvaluation, FormulaError> {
    let mut notes = Vec::new();
    let substituted = substitute_placeholders(formula, context, &mut notes);
    if substituted.chars().count() > MAX_FORMULA_LENGTH {
        return Err(FormulaError::TooLong);
    }

    if let Some((position, character)) = substituted
        .char_indices()
        .find(|(_, character)| !is_allowed(*character))
    {
        return Err(FormulaError::DisallowedCharacter {
            character,
            position,
        });
    }

    let tokens = tokenize(&substituted)?;
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(match token {
            Token::RightParen => FormulaError::UnbalancedParenthesis,
            other => FormulaError::UnexpectedToken(other.to_string()),
        });
    }

    let value = if value.is_finite() {
        value
    } else {
        notes.push(format!("formula result {value} is not finite, using 0"));
        0.0
    };

    Ok(FormulaEvaluation {
        value,
        substituted,
        notes,
    })
}

fn is_allowed(character: char) -> bool {
    character.is_ascii_digit()
        || character.is_whitespace()
        || matches!(character, '+' | '-' | '*' | '/' | '.' | '(' | ')')
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
}

/// Replaces every well-formed `{name}` with its context value. Unknown names become 0;
/// malformed braces are left in place so the character check rejects them.
fn substitute_placeholders(
    formula: &str,
    context: &FormulaContext,
    notes: &mut Vec<String>,
) -> String {
    let mut output = String::with_capacity(formula.len());
    let mut rest = formula;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                let value = match context.get(&name.to_ascii_lowercase()) {
                    Some(value) if value.is_finite() => {
                        notes.push(format!("placeholder {name} = {value}"));
                        *value
                    }
                    _ => {
                        notes.push(format!("placeholder {name} has no value, using 0"));
                        0.0
                    }
                };
                output.push_str(&format!("({value})"));
                rest = &after[close + 1..];
            }
            _ => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{value}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, character)) = chars.next() {
        let token = match character {
            c if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some((index, next)) = chars.peek().copied() {
                    if next.is_ascii_digit() || next == '.' {
                        end = index + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &text[start..end];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(literal.to_string()))?;
                Token::Number(value)
            }
            other => {
                return Err(FormulaError::DisallowedCharacter {
                    character: other,
                    position: start,
                })
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// expression := term (('+' | '-') term)*
/// term       := unary (('*' | '/') unary)*
/// unary      := ('+' | '-') unary | primary
/// primary    := number | '(' expression ')'
struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    value /= self.unary()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64, FormulaError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.descend()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.advance();
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, FormulaError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LeftParen) => {
                self.descend()?;
                let value = self.expression()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RightParen) => Ok(value),
                    Some(other) => Err(FormulaError::UnexpectedToken(other.to_string())),
                    None => Err(FormulaError::UnbalancedParenthesis),
                }
            }
            Some(Token::RightParen) => Err(FormulaError::UnbalancedParenthesis),
            Some(other) => Err(FormulaError::UnexpectedToken(other.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}
