//! Small helpers shared by the job engine and the media library.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random alphanumeric text of `len` characters.
pub fn random_text(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Keep `[A-Za-z0-9._-]`, replacing everything else with `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
