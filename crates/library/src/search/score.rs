use scraper::Html;

/// Words of context kept on either side of the first match.
const EXCERPT_RADIUS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Score {
    pub(crate) weight: usize,
    pub(crate) excerpt: String,
}

/// Plain text of an HTML fragment, whitespace collapsed to single spaces.
pub(crate) fn text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    for word in fragment.root_element().text().flat_map(str::split_whitespace) {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(word);
    }
    text
}

/// Weigh `text` against already-lowercased `keywords`.
///
/// The weight is the number of times any keyword occurs in the text, ignoring
/// case. `None` when nothing matches.
pub(crate) fn score(text: &str, keywords: &[String]) -> Option<Score> {
    let lower = text.to_lowercase();
    let weight = keywords.iter().filter(|keyword| !keyword.is_empty()).map(|keyword| lower.matches(keyword.as_str()).count()).sum();
    if weight == 0 {
        return None;
    }
    Some(Score {
        weight,
        excerpt: excerpt(text, keywords),
    })
}

fn excerpt(text: &str, keywords: &[String]) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let hit = words
        .iter()
        .position(|word| {
            let word = word.to_lowercase();
            keywords.iter().any(|keyword| !keyword.is_empty() && word.contains(keyword.as_str()))
        })
        .unwrap_or(0);
    let start = hit.saturating_sub(EXCERPT_RADIUS);
    let end = (hit + EXCERPT_RADIUS + 1).min(words.len());
    let mut excerpt = words[start..end].join(" ");
    if start > 0 {
        excerpt.insert_str(0, "… ");
    }
    if end < words.len() {
        excerpt.push_str(" …");
    }
    excerpt
}
