use ammonia;

/// Clean essay answer text using the ammonia library.
///
/// Essay answers are free-form text that teachers later read in a
/// browser while grading. This employs a whitelist-based sanitization
/// strategy: safe formatting tags (like <b>, <p>) survive, dangerous
/// tags (like <script>, <iframe>) and malicious attributes (like
/// onclick) are stripped before the text is stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
