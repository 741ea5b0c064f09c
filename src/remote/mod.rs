pub mod firestore;
pub mod gauth;
pub mod identity;

pub(crate) fn truncate_for_log(s: String, max_len: usize) -> String {
    if s.len() <= max_len {
        return s;
    }
    // Back off to a char boundary; error bodies are not guaranteed ASCII.
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut out = s[..cut].to_string();
    out.push('…');
    out
}
