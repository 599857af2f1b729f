use std::collections::HashSet;

/// Entities ammonia emits when serializing text nodes. `&amp;` must come last.
const TEXT_ENTITIES: [(&str, &str); 4] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

/// Reduces imported text to plain text using the ammonia library.
///
/// Every tag is removed; `<script>`/`<style>` lose their content as well.
/// The result is plain text, not markup: `&` stays `&`, so stored labels
/// compare equal to what an operator types.
pub fn strip_markup(input: &str) -> String {
    let cleaned = ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string();

    TEXT_ENTITIES
        .iter()
        .fold(cleaned, |text, (entity, plain)| text.replace(entity, plain))
        .trim()
        .to_string()
}
