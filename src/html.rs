use scraper::{Html, Selector};
use std::sync::LazyLock;

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("Failed to parse title selector - this is a bug")
});

static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form").expect("Failed to parse form selector - this is a bug")
});

/// Parse `body` and return its title and form actions. The parsed document
/// is dropped before returning, so callers can stay `Send` across awaits.
pub fn summarize_page(body: &str) -> (String, Vec<String>) {
    let document = Html::parse_document(body);
    (extract_title(&document), extract_form_actions(&document))
}

/// Text of the first `<title>`, whitespace trimmed; empty if there is none.
pub fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().map(str::trim).collect::<String>())
        .unwrap_or_default()
}

/// The `action` attribute of every `<form>`, in document order. A form
/// without an action contributes an empty string.
pub fn extract_form_actions(document: &Html) -> Vec<String> {
    document
        .select(&FORM_SELECTOR)
        .map(|el| el.value().attr("action").unwrap_or_default().to_owned())
        .collect()
}
