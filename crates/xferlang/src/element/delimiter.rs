use itertools::Itertools;

/// How an element's delimiters are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DelimiterStyle {
    /// No delimiters at all (bare keys and integers).
    Implicit,
    /// Delimiter runs directly around the content.
    #[default]
    Compact,
    /// `<` + run + content + run + `>`.
    Explicit,
}

/// Opening/closing specifier characters of an element plus their run length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delimiter {
    pub opening: char,
    pub closing: char,
    pub count: usize,
    pub style: DelimiterStyle,
}

impl Delimiter {
    pub const fn new(opening: char, closing: char) -> Self {
        Self { opening, closing, count: 1, style: DelimiterStyle::Compact }
    }

    pub const fn symmetric(ch: char) -> Self {
        Self::new(ch, ch)
    }

    #[must_use]
    pub const fn with_style(mut self, style: DelimiterStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = if count == 0 { 1 } else { count };
        self
    }

    pub fn opening_run(&self) -> String {
        std::iter::repeat_n(self.opening, self.count).collect()
    }

    pub fn closing_run(&self) -> String {
        std::iter::repeat_n(self.closing, self.count).collect()
    }
}

/// Characters that end a compact numeric, boolean, character or null
/// token besides whitespace.
pub const fn is_terminator(c: char) -> bool {
    matches!(c, '<' | '>' | '(' | ')' | '[' | ']' | '{' | '}' | '!')
}

/// Characters that may follow `<` to start an element embedded in
/// interpolated text.
pub const fn is_embedded_sigil(c: char) -> bool {
    matches!(c, '"' | '\'' | ':' | '#' | '&' | '*' | '^' | '~' | '@' | '\\' | '|' | '_' | '?')
}

/// First character of a bare key.
pub fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '.' || c == '-'
}

pub fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Whether `key` can be written without delimiters.
pub fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !is_key_start(first) || !key.chars().all(is_key_char) {
        return false;
    }
    !(first == '-' && chars.next().is_some_and(|c| c.is_ascii_digit()))
}

/// Length of the longest run of `ch` inside `content`.
pub fn longest_run(content: &str, ch: char) -> usize {
    content
        .chars()
        .chunk_by(|c| *c == ch)
        .into_iter()
        .filter(|(is_ch, _)| *is_ch)
        .map(|(_, run)| run.count())
        .max()
        .unwrap_or(0)
}

/// Delimiter for a text-bearing literal, sized and styled so that `content`
/// can be written without terminating or extending the delimiter run.
pub fn for_text(opening: char, closing: char, content: &str) -> Delimiter {
    let count = longest_run(content, closing) + 1;
    let explicit = content.is_empty()
        || content.starts_with(opening)
        || content.ends_with(closing)
        || content.starts_with(char::is_whitespace)
        || content.ends_with(char::is_whitespace)
        || content.starts_with([')', ']', '}', '!']);
    let style = if explicit { DelimiterStyle::Explicit } else { DelimiterStyle::Compact };
    Delimiter::new(opening, closing).with_count(count).with_style(style)
}

/// Whether explicit content needs one pad space after the opening run.
///
/// Content that begins (after any spaces) with the opening character would
/// otherwise be read as part of the greedy opening run; a leading `>` would
/// read as the end of an empty literal.
pub fn needs_leading_pad(content: &str, opening: char) -> bool {
    let trimmed = content.trim_start_matches(' ');
    trimmed.starts_with(opening) || trimmed.starts_with('>')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("plain", 1, DelimiterStyle::Compact)]
    #[case("It's a test", 1, DelimiterStyle::Compact)]
    #[case("say \"hi\"", 2, DelimiterStyle::Explicit)]
    #[case("a\"\"b", 3, DelimiterStyle::Compact)]
    #[case("", 1, DelimiterStyle::Explicit)]
    #[case("\"quoted", 2, DelimiterStyle::Explicit)]
    #[case(")x", 1, DelimiterStyle::Explicit)]
    fn string_delimiters(#[case] content: &str, #[case] count: usize, #[case] style: DelimiterStyle) {
        let d = for_text('"', '"', content);
        assert_eq!(d.count, count);
        assert_eq!(d.style, style);
    }

    #[test]
    fn longest_run_counts_consecutive_only() {
        assert_eq!(longest_run("a'b''c'''", '\''), 3);
        assert_eq!(longest_run("abc", '\''), 0);
    }

    #[rstest]
    #[case("name", true)]
    #[case("first_name", true)]
    #[case("-x", true)]
    #[case("-1", false)]
    #[case("1a", false)]
    #[case("_a", false)]
    #[case("has space", false)]
    #[case("", false)]
    fn bare_keys(#[case] key: &str, #[case] bare: bool) {
        assert_eq!(is_bare_key(key), bare);
    }

    #[test]
    fn leading_pad_ignores_spaces() {
        assert!(needs_leading_pad("  \"x", '"'));
        assert!(needs_leading_pad(">x", '"'));
        assert!(!needs_leading_pad("x\"", '"'));
    }
}
