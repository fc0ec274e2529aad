use ammonia;

/// Clean user-supplied free text (review bodies, comments, bios) using the
/// ammonia library.
///
/// Whitelist-based sanitization: safe tags (like <b>, <p>) are preserved,
/// dangerous tags (like <script>, <iframe>) and attributes (like onclick)
/// are stripped. Fail-safe against stored XSS in any client rendering the
/// text as HTML.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
