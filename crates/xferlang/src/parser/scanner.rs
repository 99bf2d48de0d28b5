use crate::element::delimiter::is_terminator;
use crate::error::Position;

/// Character cursor with one-based row/column tracking.
pub(crate) struct Scanner {
    chars: Vec<char>,
    pos: usize,
    row: usize,
    column: usize,
}

impl Scanner {
    pub(crate) fn new(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Self { chars: text.chars().collect(), pos: 0, row: 1, column: 1 }
    }

    pub(crate) fn position(&self) -> Position {
        Position::new(self.row, self.column)
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        match c {
            '\n' => {
                self.row += 1;
                self.column = 1;
            }
            // \r\n counts once, on the \n
            '\r' if self.peek() == Some('\n') => {}
            '\r' => {
                self.row += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    pub(crate) fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.bump().is_none() {
                break;
            }
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Number of consecutive `c` at the cursor (plus `offset`).
    pub(crate) fn run_length(&self, c: char, offset: usize) -> usize {
        self.chars[(self.pos + offset).min(self.chars.len())..].iter().take_while(|x| **x == c).count()
    }

    pub(crate) fn starts_with(&self, s: &str) -> bool {
        let mut i = self.pos;
        for c in s.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Whether `c` repeated `n` times followed by `>` is at the cursor.
    pub(crate) fn at_explicit_close(&self, c: char, n: usize) -> bool {
        self.run_length(c, 0) >= n
            && (0..n).all(|i| self.peek_at(i) == Some(c))
            && self.peek_at(n) == Some('>')
    }

    /// Whether the cursor is at whitespace, a structural character or the end.
    pub(crate) fn at_token_end(&self) -> bool {
        self.peek().is_none_or(|c| c.is_whitespace() || is_terminator(c))
    }
}
