/// Check if a sender may use the posting flow.
///
/// An empty allowlist means everyone is allowed. Entries are matched
/// case-insensitively against the full sender id and against its user part
/// (before `@`), so a bare phone number matches `15551234567@s.whatsapp.net`.
/// Glob-style `*` wildcards are supported.
pub fn is_allowed(sender: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let sender = sender.to_lowercase();
    let user = sender.split_once('@').map_or(sender.as_str(), |(u, _)| u);
    // Linked-device ids carry a `:device` suffix on the user part.
    let user = user.split_once(':').map_or(user, |(u, _)| u);

    allowlist.iter().any(|pattern| {
        let pat = pattern.trim().trim_start_matches('+').to_lowercase();
        if pat.contains('*') {
            glob_match(&pat, &sender)
        } else {
            pat == sender || pat == user
        }
    })
}

/// Simple glob matching supporting `*` as a wildcard for any sequence of chars.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match text[pos..].find(part) {
            Some(idx) => {
                // First segment must match at start
                if i == 0 && idx != 0 {
                    return false;
                }
                pos += idx + part.len();
            },
            None => return false,
        }
    }
    // Last segment must match at end (unless pattern ends with *)
    if !parts.last().unwrap_or(&"").is_empty() {
        pos == text.len()
    } else {
        true
    }
}
