/// Collapses whitespace in extracted document text.
///
/// A whitespace run containing a line break becomes one `\n`; any other run
/// becomes one space. The result is trimmed. Idempotent.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending: Option<char> = None;

    for ch in input.chars() {
        if ch.is_whitespace() {
            pending = match (pending, ch) {
                (_, '\n') | (Some('\n'), _) => Some('\n'),
                _ => Some(' '),
            };
            continue;
        }
        if let Some(sep) = pending.take() {
            if !out.is_empty() {
                out.push(sep);
            }
        }
        out.push(ch);
    }

    out
}
