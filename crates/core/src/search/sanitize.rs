use once_cell::sync::Lazy;
use regex_lite::Regex;

static ILLEGAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[:;|<>"/\\*?]"#).expect("illegal-character pattern is valid")
});
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip characters indexers reject in free-text queries, collapse runs of
/// whitespace and trim.
pub fn sanitize_query(query: &str) -> String {
    let stripped = ILLEGAL.replace_all(query, " ");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}
