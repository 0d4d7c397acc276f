//! Standalone utility tools. These are pure string-to-string helpers listed
//! on the tools endpoint and named in agent metadata; the chat and agent
//! paths never invoke them.

use chrono::Utc;

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn available() -> &'static [ToolSpec] {
    &[
        ToolSpec {
            name: "calculator",
            description: "Useful for mathematical calculations. Input should be a mathematical expression.",
        },
        ToolSpec {
            name: "text_analyzer",
            description: "Analyze text for sentiment, word count, and key phrases.",
        },
        ToolSpec {
            name: "timestamp",
            description: "Get current timestamp and date information.",
        },
    ]
}

/// Evaluates an arithmetic expression over `+ - * / ( )` and decimal
/// literals. No dynamic evaluation, just a small recursive-descent parser.
pub fn calculator(expression: &str) -> String {
    match eval_expression(expression) {
        Ok(value) => format!("Result: {}", value),
        Err(e) => format!("Error: {}", e),
    }
}

pub fn text_analyzer(text: &str) -> String {
    const POSITIVE_WORDS: [&str; 6] =
        ["good", "great", "excellent", "amazing", "wonderful", "fantastic"];
    const NEGATIVE_WORDS: [&str; 6] =
        ["bad", "terrible", "awful", "horrible", "worst", "hate"];

    let word_count = text.split_whitespace().count();
    let char_count = text.chars().count();
    let sentences =
        text.matches('.').count() + text.matches('!').count() + text.matches('?').count();

    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(**w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(**w)).count();
    let sentiment = if positive > negative {
        "Positive"
    } else if negative > positive {
        "Negative"
    } else {
        "Neutral"
    };

    format!(
        "Text Analysis:\n- Word count: {}\n- Character count: {}\n- Sentences: {}\n- Sentiment: {}",
        word_count, char_count, sentences, sentiment
    )
}

pub fn timestamp(_query: &str) -> String {
    format!(
        "Current timestamp: {} UTC",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}

fn eval_expression(input: &str) -> Result<f64, String> {
    let mut parser = Parser {
        src: input.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    if let Some(c) = parser.peek() {
        return Err(format!("invalid character '{}' in expression", c as char));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&mut self) -> Option<u8> {
        while self.src.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        self.src.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    if rhs == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= rhs;
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("invalid character '{}' in expression", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while self
            .src
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == b'.')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| "malformed number".to_string())
    }
}
