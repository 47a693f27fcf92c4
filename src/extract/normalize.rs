//! Field normalization: text cleanup, truncation, authors, dates, tags.
//!
//! Everything here is deterministic so that extracting the same markup twice
//! yields identical fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static BYLINE_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(written\s+)?by[:\s]+").unwrap());
static DATE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(last\s+updated|updated|published|posted|first\s+published)(\s+on)?\s*:?\s*").unwrap());
static MONTH_DAY_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b").unwrap()
});
static DAY_MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b").unwrap()
});

const MAX_AUTHOR_CHARS: usize = 200;
const MAX_TAG_CHARS: usize = 50;
const MAX_TITLE_CHARS: usize = 300;

/// URL path segments that never name a section.
const NON_SECTION_SEGMENTS: &[&str] = &[
    "article", "articles", "story", "stories", "amp", "live", "video", "videos", "index.html", "news",
];

/// Collapse runs of whitespace into single spaces and trim.
pub fn clean_text(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Truncate to at most `max` characters, on a char boundary.
///
/// When the cut falls mid-word and a word break exists in the last fifth of
/// the kept text, the partial word is dropped.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let Some((cut, _)) = s.char_indices().nth(max) else {
        return s.to_string();
    };
    let head = &s[..cut];
    let floor = head.len() - head.len() / 5;
    match head.rfind(char::is_whitespace) {
        Some(pos) if pos >= floor => head[..pos].trim_end().to_string(),
        _ => head.trim_end().to_string(),
    }
}

/// [`truncate_chars`] for article bodies already known to hold at least
/// `min` characters: when the word-break trim would leave fewer than `min`,
/// the body is cut at exactly `max` characters instead.
pub fn truncate_body(s: &str, max: usize, min: usize) -> String {
    let soft = truncate_chars(s, max);
    if char_len(&soft) >= min {
        return soft;
    }
    s.chars().take(max).collect()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Clean a headline and strip a site suffix such as `" - BBC News"`.
pub fn normalize_title(raw: &str, suffixes: &[String], site_name: &str) -> Option<String> {
    let mut title = clean_text(raw);
    for suffix in suffixes.iter().filter(|s| !s.trim().is_empty()) {
        if let Some(stripped) = strip_suffix_ci(&title, suffix) {
            title = stripped;
            break;
        }
    }
    for sep in [" | ", " - ", " — ", " : "] {
        let site_suffix = format!("{sep}{site_name}");
        if let Some(stripped) = strip_suffix_ci(&title, &site_suffix) {
            title = stripped;
            break;
        }
    }
    let title = truncate_chars(&title, MAX_TITLE_CHARS);
    (!title.is_empty()).then_some(title)
}

fn strip_suffix_ci(s: &str, suffix: &str) -> Option<String> {
    if s.len() <= suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    if !s.is_char_boundary(split) || !s[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    let head = s[..split].trim_end();
    let head = head.trim_end_matches(['|', '-', '—', ':']).trim_end();
    (!head.is_empty()).then(|| head.to_string())
}

/// Normalize a byline: drop a leading "By", trailing source names and
/// separators, and reject values that are links rather than names.
pub fn normalize_author(raw: &str, source_name: &str) -> Option<String> {
    let mut author = clean_text(raw);
    if author.starts_with("http://") || author.starts_with("https://") || author.contains("://") {
        return None;
    }
    author = BYLINE_PREFIX_RE.replace(&author, "").to_string();

    if !source_name.is_empty() {
        for sep in [", ", " - ", " | ", " for ", " "] {
            let suffix = format!("{sep}{source_name}");
            if let Some(stripped) = strip_suffix_ci(&author, &suffix) {
                author = stripped;
                break;
            }
        }
    }
    let author = author
        .trim_matches(|c: char| c == ',' || c == '|' || c == '-' || c.is_whitespace())
        .to_string();
    if author.is_empty() || author.eq_ignore_ascii_case(source_name) {
        return None;
    }
    Some(truncate_chars(&author, MAX_AUTHOR_CHARS))
}

/// Join several author names into one byline.
pub fn join_authors(names: &[String]) -> Option<String> {
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .unique()
        .collect();
    match names.as_slice() {
        [] => None,
        [one] => Some(one.to_string()),
        [init @ .., last] => Some(format!("{} and {}", init.join(", "), last)),
    }
}

/// Lenient date parsing. Returns `None` when nothing recognisable is found.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = clean_text(raw);
    let s = DATE_PREFIX_RE.replace(&cleaned, "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return midnight(date);
        }
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return parse_epoch(s);
    }
    // Free text such as "10:15 AM EST, Fri March 1, 2024".
    if let Some(caps) = MONTH_DAY_YEAR_RE.captures(s) {
        let candidate = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%b %d %Y") {
            return midnight(date);
        }
    }
    if let Some(caps) = DAY_MONTH_YEAR_RE.captures(s) {
        let candidate = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
        if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%d %b %Y") {
            return midnight(date);
        }
    }
    None
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let n: i64 = s.parse().ok()?;
    match s.len() {
        10 => Utc.timestamp_opt(n, 0).single(),
        13 => Utc.timestamp_millis_opt(n).single(),
        _ => None,
    }
}

/// Split comma-separated keyword strings, clean, cap and de-duplicate
/// case-insensitively while keeping first-seen order.
pub fn normalize_tags<I, S>(raw: I, max: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .flat_map(|s| {
            s.as_ref()
                .split([',', ';'])
                .map(clean_text)
                .collect::<Vec<_>>()
        })
        .filter(|t| !t.is_empty() && char_len(t) <= MAX_TAG_CHARS)
        .unique_by(|t| t.to_lowercase())
        .take(max)
        .collect()
}

/// Derive a section from the first meaningful URL path segment.
pub fn section_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();
    // The last segment is the article slug itself.
    let candidates = segments.len().saturating_sub(1);
    segments
        .into_iter()
        .take(candidates)
        .map(|s| s.to_lowercase())
        .find(|s| {
            s.len() > 2
                && !s.chars().all(|c| c.is_ascii_digit())
                && s.chars().any(|c| c.is_ascii_alphabetic())
                && !NON_SECTION_SEGMENTS.contains(&s.as_str())
        })
}

/// Resolve a possibly relative reference against the page URL.
pub fn resolve_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
        return None;
    }
    let resolved = match Url::parse(base) {
        Ok(base) => base.join(href).ok()?,
        Err(_) => Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a \n\t b  c "), "a b c");
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        let s = "ééééé";
        assert_eq!(truncate_chars(s, 3), "ééé");
    }

    #[test]
    fn test_truncate_chars_prefers_word_break() {
        let s = "alpha beta gamma delta";
        assert_eq!(truncate_chars(s, 12), "alpha beta");
        assert!(char_len(&truncate_chars(&"x".repeat(5000), 2000)) == 2000);
    }

    #[test]
    fn test_truncate_body_never_drops_below_minimum() {
        let body = "abcd ".repeat(40);
        let body = body.trim_end();
        assert_eq!(char_len(&truncate_chars(body, 100)), 99);
        assert_eq!(char_len(&truncate_body(body, 100, 100)), 100);
        assert_eq!(truncate_body(body, 100, 50), truncate_chars(body, 100));
        assert_eq!(truncate_body("short", 100, 1), "short");
    }

    #[test]
    fn test_normalize_title_strips_suffixes() {
        let suffixes = vec![" - BBC News".to_string()];
        assert_eq!(
            normalize_title("Markets rally  - BBC News", &suffixes, "BBC News").as_deref(),
            Some("Markets rally")
        );
        assert_eq!(normalize_title("Story | CNN", &[], "CNN").as_deref(), Some("Story"));
        assert_eq!(normalize_title("   ", &[], "CNN"), None);
        // A title that is only the suffix is kept rather than emptied.
        assert_eq!(normalize_title("CNN", &[], "CNN").as_deref(), Some("CNN"));
    }

    #[test]
    fn test_normalize_author() {
        assert_eq!(normalize_author("By Jane Doe, CNN", "CNN").as_deref(), Some("Jane Doe"));
        assert_eq!(normalize_author("by  John Smith | Reuters", "Reuters").as_deref(), Some("John Smith"));
        assert_eq!(normalize_author("BY: Ana Ruiz", "").as_deref(), Some("Ana Ruiz"));
        assert_eq!(normalize_author("https://www.facebook.com/someone", "CNN"), None);
        assert_eq!(normalize_author("CNN", "CNN"), None);
        assert_eq!(normalize_author("   ", "CNN"), None);
    }

    #[test]
    fn test_join_authors() {
        assert_eq!(join_authors(&[]), None);
        assert_eq!(join_authors(&["A".into()]).as_deref(), Some("A"));
        assert_eq!(join_authors(&["A".into(), "B".into(), "A".into()]).as_deref(), Some("A and B"));
        assert_eq!(join_authors(&["A".into(), "B".into(), "C".into()]).as_deref(), Some("A, B and C"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2024-03-01T12:30:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date("2024-03-01T12:30:00+0100"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap())
        );
        assert_eq!(
            parse_date("Fri, 01 Mar 2024 12:30:00 GMT"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap())
        );
        assert_eq!(parse_date("2024-03-01"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("March 1, 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("1 March 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("Updated: 2024-02-01"), Some(ymd(2024, 2, 1)));
        assert_eq!(parse_date("Updated 10:15 AM EST, Fri March 1, 2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("Published 3 Jan 2024"), Some(ymd(2024, 1, 3)));
        assert_eq!(parse_date("1709251200"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("12345"), None);
    }

    #[test]
    fn test_normalize_tags_dedupes_case_insensitively() {
        let tags = normalize_tags(["Politics, economy", "politics", " Elections ;Economy"], 10);
        assert_eq!(tags, vec!["Politics", "economy", "Elections"]);
        assert_eq!(normalize_tags(["a,b,c,d"], 2), vec!["a", "b"]);
    }

    #[test]
    fn test_section_from_url() {
        assert_eq!(section_from_url("https://www.theguardian.com/world/2024/mar/01/slug").as_deref(), Some("world"));
        assert_eq!(section_from_url("https://edition.cnn.com/2024/03/01/politics/slug/index.html").as_deref(), Some("politics"));
        assert_eq!(section_from_url("https://www.bbc.com/news/articles/c123"), None);
        assert_eq!(section_from_url("https://example.com/slug"), None);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://news.example/a/b", "/img/x.jpg").as_deref(),
            Some("https://news.example/img/x.jpg")
        );
        assert_eq!(
            resolve_url("https://news.example/a/b", "//cdn.example/x.jpg").as_deref(),
            Some("https://cdn.example/x.jpg")
        );
        assert_eq!(resolve_url("https://news.example/", "data:image/png;base64,xx"), None);
        assert_eq!(resolve_url("https://news.example/", "mailto:a@b.c"), None);
    }
}
