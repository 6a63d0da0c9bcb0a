//! Lexical helpers shared by the segment and fulltext passes.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters counted in the punctuation profile of a line.
pub const FULL_PUNCTUATIONS: &str =
    "(（[ •*,:;?.!/)）-−–‐«»„\"“”‘’'`$#@]*\u{2666}\u{2665}\u{2663}\u{2660}\u{00A0}";

/// Characters that split a token into sub-tokens; each is kept as its own sub-token.
const SPLIT_PUNCTUATIONS: &str = ",:;?.!/()-\"“”‘’'`$";

static YEAR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[12]\d{3}$").unwrap());

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$").unwrap()
});

static HTTP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?://|ftp://|www\.)").unwrap());

static MONTHS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december", "jan", "feb", "mar", "apr", "jun",
        "jul", "aug", "sep", "sept", "oct", "nov", "dec",
    ]
    .into_iter()
    .collect()
});

static COMMON_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "an", "analysis",
        "and", "any", "approach", "are", "as", "at", "be", "because", "been", "before",
        "being", "below", "between", "both", "but", "by", "can", "case", "could", "data",
        "did", "different", "do", "does", "each", "effect", "example", "few", "figure",
        "first", "for", "from", "further", "general", "given", "had", "has", "have", "he",
        "her", "here", "high", "his", "how", "however", "if", "in", "into", "is", "it",
        "its", "large", "last", "less", "level", "low", "made", "make", "many", "method",
        "model", "more", "most", "much", "must", "new", "no", "not", "now", "number", "of",
        "on", "one", "only", "or", "order", "other", "our", "out", "over", "paper", "part",
        "problem", "result", "results", "same", "second", "section", "set", "she", "should",
        "show", "since", "small", "so", "some", "such", "system", "table", "than", "that",
        "the", "their", "them", "then", "there", "these", "they", "this", "those", "three",
        "through", "time", "to", "two", "under", "until", "up", "use", "used", "using",
        "very", "was", "we", "well", "were", "what", "when", "where", "which", "while",
        "who", "why", "will", "with", "within", "without", "work", "would", "you",
    ]
    .into_iter()
    .collect()
});

pub fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Split token text on whitespace and the split punctuation class, keeping punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else if SPLIT_PUNCTUATIONS.contains(c) {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            parts.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Map typographic punctuation onto its ASCII counterpart.
pub fn normalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '“' | '”' | '„' | '«' | '»' => '"',
            '‘' | '’' | '`' => '\'',
            '−' | '–' | '—' | '‐' => '-',
            '（' => '(',
            '）' => ')',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Drop interior whitespace so a value always occupies exactly one vector column.
pub fn squash_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// First 1..=n characters; shorter text yields the whole text.
pub fn prefixes(text: &str, n: usize) -> Vec<String> {
    (1..=n).map(|i| text.chars().take(i).collect()).collect()
}

/// Last 1..=n characters; shorter text yields the whole text.
pub fn suffixes(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    (1..=n)
        .map(|i| chars[chars.len().saturating_sub(i)..].iter().collect())
        .collect()
}

pub fn capital(text: &str) -> &'static str {
    let mut chars = text.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return "NOCAPS",
    };

    let has_cased = text.chars().any(|c| c.is_uppercase() || c.is_lowercase());
    let all_upper = has_cased && !text.chars().any(char::is_lowercase);
    let all_punct = text.chars().all(|c| FULL_PUNCTUATIONS.contains(c));

    if all_upper || all_punct {
        "ALLCAP"
    } else if first.is_uppercase() {
        "INITCAP"
    } else {
        "NOCAPS"
    }
}

pub fn digital(text: &str) -> &'static str {
    if text.is_empty() {
        return "NODIGIT";
    }
    let digits = text.chars().filter(char::is_ascii_digit).count();
    if digits == text.chars().count() {
        "ALLDIGIT"
    } else if digits > 0 {
        "CONTAINSDIGITS"
    } else {
        "NODIGIT"
    }
}

/// Punctuation class of a single-character token; NOPUNCT for anything else.
pub fn punct(text: &str) -> &'static str {
    let mut chars = text.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return "NOPUNCT",
    };
    if c.is_alphanumeric() {
        return "NOPUNCT";
    }
    match c {
        '(' => "OPENBRACKET",
        ')' => "ENDBRACKET",
        '.' => "DOT",
        ',' => "COMMA",
        '-' => "HYPHEN",
        '\'' | '"' => "QUOTE",
        _ => "PUNCT",
    }
}

/// Punctuation characters of a line in order, ignoring plain spaces.
pub fn punct_profile(line: &str) -> String {
    line.chars()
        .filter(|&c| c != ' ' && FULL_PUNCTUATIONS.contains(c))
        .collect()
}

/// `floor(current * buckets / total)`, 0 when the total is empty.
pub fn bucket(current: usize, total: usize, buckets: usize) -> usize {
    if total == 0 {
        return 0;
    }
    current * buckets / total
}

pub fn bucket_f32(current: f32, total: f32, buckets: usize) -> i64 {
    if total <= 0.0 {
        return 0;
    }
    (current * buckets as f32 / total).floor() as i64
}

pub fn is_year(text: &str) -> bool {
    YEAR_REGEX.is_match(text)
}

pub fn is_email(text: &str) -> bool {
    EMAIL_REGEX.is_match(text)
}

pub fn is_http(text: &str) -> bool {
    HTTP_REGEX.is_match(text)
}

pub fn is_month(text: &str) -> bool {
    MONTHS.contains(text.to_lowercase().trim_end_matches('.'))
}

pub fn is_common_word(text: &str) -> bool {
    COMMON_WORDS.contains(text.to_lowercase().as_str())
}
