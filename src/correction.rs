//! Deterministic cleanup of raw OCR text.
//!
//! Rules run in a fixed order. Circled digits are rewritten before the
//! full-width shift because they sit outside the full-width block and would
//! otherwise pass through untouched; whitespace collapses last so runs created
//! by earlier rules are folded too.

use std::sync::OnceLock;

use regex::Regex;

/// Offset between a full-width form and its ASCII counterpart
const FULL_WIDTH_OFFSET: u32 = 0xFEE0;

const CIRCLED_DIGITS: [(char, &str); 11] = [
    ('①', "1"),
    ('②', "2"),
    ('③', "3"),
    ('④', "4"),
    ('⑤', "5"),
    ('⑥', "6"),
    ('⑦', "7"),
    ('⑧', "8"),
    ('⑨', "9"),
    ('⑩', "10"),
    ('⓪', "0"),
];

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid regex"))
}

/// A single rewrite rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionRule {
    /// ①..⑩ and ⓪ become ASCII digits
    CircledDigits,
    /// Full-width digits and Latin letters shift down to ASCII
    FullWidthToHalfWidth,
    /// Every whitespace run becomes one ASCII space
    CollapseWhitespace,
}

impl CorrectionRule {
    pub fn apply(&self, text: &str) -> String {
        match self {
            CorrectionRule::CircledDigits => replace_circled_digits(text),
            CorrectionRule::FullWidthToHalfWidth => text.chars().map(to_half_width).collect(),
            CorrectionRule::CollapseWhitespace => {
                whitespace_run().replace_all(text, " ").into_owned()
            }
        }
    }
}

/// Ordered list of rules applied to recognized text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRuleSet {
    rules: Vec<CorrectionRule>,
}

impl Default for CorrectionRuleSet {
    fn default() -> Self {
        Self {
            rules: vec![
                CorrectionRule::CircledDigits,
                CorrectionRule::FullWidthToHalfWidth,
                CorrectionRule::CollapseWhitespace,
            ],
        }
    }
}

impl CorrectionRuleSet {
    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Run every rule in order. Total over all inputs and idempotent.
    pub fn correct(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}

/// Apply the standard rule set
pub fn correct(text: &str) -> String {
    CorrectionRuleSet::default().correct(text)
}

fn replace_circled_digits(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match CIRCLED_DIGITS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, digits)) => out.push_str(digits),
            None => out.push(c),
        }
    }
    out
}

/// Map ０-９, Ａ-Ｚ and ａ-ｚ to their ASCII forms; other chars pass through
pub fn to_half_width(c: char) -> char {
    match c {
        '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
            char::from_u32(c as u32 - FULL_WIDTH_OFFSET).unwrap_or(c)
        }
        _ => c,
    }
}
