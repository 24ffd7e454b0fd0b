/// Builds a case-insensitive `LIKE` pattern for a contains-style search.
/// `%`, `_` and the escape character in the input are escaped so they match
/// literally; queries using the pattern must carry `ESCAPE '\'`.
pub fn contains_pattern(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut escaped = String::with_capacity(lowered.len() + 2);
    escaped.push('%');
    for c in lowered.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
