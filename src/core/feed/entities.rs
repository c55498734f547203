//! Decoding of the HTML entities WordPress leaves in rendered titles.
//!
//! This is an allowlist, not a general HTML decoder: it covers the entities
//! that show up in feed titles and maps typographic quotes and dashes to
//! their plain ASCII forms so notification text stays readable everywhere.

const ENTITIES: [(&str, &str); 15] = [
    ("&amp;", "&"),
    ("&#038;", "&"),
    ("&quot;", "\""),
    ("&#8220;", "\""),
    ("&#8221;", "\""),
    ("&#8216;", "'"),
    ("&#8217;", "'"),
    ("&apos;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", " "),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
    ("&#8211;", "-"),
    ("&#8212;", "-"),
];

/// Replaces every allowlisted entity in `value`, in table order.
pub fn decode_html_entities(value: &str) -> String {
    ENTITIES
        .iter()
        .fold(value.to_string(), |acc, (entity, literal)| {
            if acc.contains(entity) {
                acc.replace(entity, literal)
            } else {
                acc
            }
        })
}
