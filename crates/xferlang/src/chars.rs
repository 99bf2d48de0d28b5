//! Named characters for `\name` literals.

use std::collections::HashMap;

const BUILTIN: &[(&str, char)] = &[
    ("nul", '\u{00}'),
    ("soh", '\u{01}'),
    ("stx", '\u{02}'),
    ("etx", '\u{03}'),
    ("eot", '\u{04}'),
    ("enq", '\u{05}'),
    ("ack", '\u{06}'),
    ("bel", '\u{07}'),
    ("bksp", '\u{08}'),
    ("tab", '\t'),
    ("lf", '\n'),
    ("nl", '\n'),
    ("vtab", '\u{0B}'),
    ("ff", '\u{0C}'),
    ("cr", '\r'),
    ("so", '\u{0E}'),
    ("si", '\u{0F}'),
    ("dle", '\u{10}'),
    ("dc1", '\u{11}'),
    ("dc2", '\u{12}'),
    ("dc3", '\u{13}'),
    ("dc4", '\u{14}'),
    ("nak", '\u{15}'),
    ("syn", '\u{16}'),
    ("etb", '\u{17}'),
    ("can", '\u{18}'),
    ("em", '\u{19}'),
    ("sub", '\u{1A}'),
    ("esc", '\u{1B}'),
    ("fs", '\u{1C}'),
    ("gs", '\u{1D}'),
    ("rs", '\u{1E}'),
    ("us", '\u{1F}'),
    ("space", ' '),
    ("lt", '<'),
    ("gt", '>'),
    ("lessThan", '<'),
    ("greaterThan", '>'),
    ("dollar", '$'),
    ("percent", '%'),
    ("euro", '\u{20AC}'),
    ("pound", '\u{00A3}'),
    ("yen", '\u{00A5}'),
    ("cent", '\u{00A2}'),
    ("rupee", '\u{20B9}'),
    ("won", '\u{20A9}'),
    ("franc", '\u{20A3}'),
    ("peso", '\u{20B1}'),
    ("bitcoin", '\u{20BF}'),
    ("ruble", '\u{20BD}'),
    ("shekel", '\u{20AA}'),
    ("dong", '\u{20AB}'),
    ("baht", '\u{0E3F}'),
    ("lira", '\u{20BA}'),
    ("naira", '\u{20A6}'),
    ("plus", '+'),
    ("minus", '-'),
    ("multiply", '\u{00D7}'),
    ("divide", '\u{00F7}'),
    ("equals", '='),
    ("notEquals", '\u{2260}'),
    ("lessThanOrEqualTo", '\u{2264}'),
    ("greaterThanOrEqualTo", '\u{2265}'),
    ("pi", '\u{03C0}'),
    ("infinity", '\u{221E}'),
    ("sqrt", '\u{221A}'),
    ("integral", '\u{222B}'),
    ("summation", '\u{2211}'),
    ("product", '\u{220F}'),
    ("degree", '\u{00B0}'),
    ("arrowLeft", '\u{2190}'),
    ("arrowUp", '\u{2191}'),
    ("arrowRight", '\u{2192}'),
    ("arrowDown", '\u{2193}'),
    ("checkmark", '\u{2713}'),
    ("crossmark", '\u{2717}'),
    ("alpha", '\u{03B1}'),
    ("beta", '\u{03B2}'),
    ("gamma", '\u{03B3}'),
    ("delta", '\u{03B4}'),
    ("epsilon", '\u{03B5}'),
    ("lambda", '\u{03BB}'),
    ("mu", '\u{03BC}'),
    ("sigma", '\u{03C3}'),
    ("omega", '\u{03C9}'),
];

/// Case-insensitive map from character names to characters.
///
/// Custom definitions (from `chardef` or the host) shadow built-ins.
#[derive(Debug, Clone, Default)]
pub struct CharacterRegistry {
    builtin: HashMap<String, char>,
    custom: HashMap<String, char>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        let builtin = BUILTIN.iter().map(|(name, ch)| (name.to_lowercase(), *ch)).collect();
        Self { builtin, custom: HashMap::new() }
    }

    pub fn resolve(&self, name: &str) -> Option<char> {
        let name = name.to_lowercase();
        self.custom.get(&name).or_else(|| self.builtin.get(&name)).copied()
    }

    pub fn define(&mut self, name: &str, ch: char) {
        self.custom.insert(name.to_lowercase(), ch);
    }

    pub fn clear_custom(&mut self) {
        self.custom.clear();
    }

    pub fn custom_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.custom.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
