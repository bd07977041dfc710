//! Splitting rendered notebooks for incremental delivery.

use scraper::{Html, Selector};

use crate::error::ServiceError;

/// Everything before the first `<div` start tag.
#[must_use]
pub fn preamble(html: &str) -> &str {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    while let Some(found) = lower.get(from..).and_then(|rest| rest.find("<div")) {
        let start = from.saturating_add(found);
        let next = lower.as_bytes().get(start.saturating_add(4)).copied();
        if matches!(next, None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r')) {
            return html.get(..start).unwrap_or(html);
        }
        from = start.saturating_add(4);
    }
    html
}

/// Outermost `div` elements of `html` that can be sent.
///
/// While the notebook is still streaming the last div may be cut short, so it
/// is held back until `done`. Divs before `already_sent` are skipped.
///
/// # Errors
/// Returns an error when the document contains no div at all.
pub fn complete_divs(
    done: bool,
    html: &str,
    already_sent: usize,
) -> Result<Vec<String>, ServiceError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div").map_err(|e| ServiceError::Html(e.to_string()))?;
    let mut divs: Vec<String> = document
        .select(&selector)
        .filter(|el| {
            !el.ancestors().any(|a| a.value().as_element().is_some_and(|e| e.name() == "div"))
        })
        .map(|el| el.html())
        .collect();

    if !done {
        divs.pop();
    }
    if divs.is_empty() {
        return Err(ServiceError::Html(String::from("no divs found")));
    }
    Ok(divs.into_iter().skip(already_sent).collect())
}
