//! Recursive-descent evaluator for arithmetic expressions over `+ - * / ( )`,
//! decimal numbers and unary sign. No dynamic code evaluation of any kind.
//!
//! Grammar:
//!   expr    := term (('+' | '-') term)*
//!   term    := factor (('*' | '/') factor)*
//!   factor  := ('+' | '-')* primary
//!   primary := number | '(' expr ')'

// Backend-supplied expressions can nest arbitrarily deep; without a bound
// the recursion would overflow the stack and abort the process instead of
// producing a recoverable error.
const MAX_DEPTH: usize = 64;

pub fn evaluate(input: &str) -> Result<f64, String> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    parser.skip_spaces();
    if let Some(c) = parser.peek() {
        return Err(format!("unexpected character `{}`", c as char));
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        loop {
            self.skip_spaces();
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
            self.skip_spaces();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // Every nested construct re-enters through here, so this single counter
    // bounds the recursion of the whole grammar.
    fn factor(&mut self) -> Result<f64, String> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err("expression too deeply nested".to_string());
        }

        self.skip_spaces();
        let value = match self.peek() {
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            _ => self.primary(),
        };

        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64, String> {
        self.skip_spaces();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                self.skip_spaces();
                if self.peek() != Some(b')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(format!("unexpected character `{}`", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        // The whitelist guarantees ASCII, so this slice is valid UTF-8.
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| "invalid number".to_string())?;
        text.parse::<f64>()
            .map_err(|_| format!("invalid number `{text}`"))
    }
}
