//! HTML markup in ADS titles (`<SUP>`, `<SUB>`, `<i>`) rewritten as plain Unicode.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sup>([^<]+)</sup>").unwrap());
static SUB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sub>([^<]+)</sub>").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?i>").unwrap());

fn superscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        '+' => '⁺',
        '-' => '⁻',
        '=' => '⁼',
        '(' => '⁽',
        ')' => '⁾',
        'n' => 'ⁿ',
        'i' => 'ⁱ',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<char> {
    Some(match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        '+' => '₊',
        '-' => '₋',
        '=' => '₌',
        '(' => '₍',
        ')' => '₎',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'o' => 'ₒ',
        'x' => 'ₓ',
        'h' => 'ₕ',
        'k' => 'ₖ',
        'l' => 'ₗ',
        'm' => 'ₘ',
        'n' => 'ₙ',
        'p' => 'ₚ',
        's' => 'ₛ',
        't' => 'ₜ',
        _ => return None,
    })
}

fn map_span(content: &str, table: fn(char) -> Option<char>, kind: &str) -> String {
    let unmapped: Vec<char> = content
        .chars()
        .filter(|c| !c.is_whitespace() && table(*c).is_none())
        .collect();
    if !unmapped.is_empty() {
        tracing::warn!(?unmapped, content, "no {kind} mapping");
    }
    content.chars().map(|c| table(c).unwrap_or(c)).collect()
}

/// Rewrite `<sup>`/`<sub>` spans as Unicode and drop `<i>` tags, keeping their content.
/// Characters without a Unicode form are left as they are.
pub fn html_to_unicode(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = SUP_RE.replace_all(text, |c: &Captures| map_span(&c[1], superscript, "superscript"));
    let text = SUB_RE.replace_all(&text, |c: &Captures| map_span(&c[1], subscript, "subscript"));
    ITALIC_RE.replace_all(&text, "").into_owned()
}
