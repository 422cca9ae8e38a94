//! Redis-style glob patterns as accepted by `SCAN ... MATCH`.
//!
//! Supported syntax: `*` matches any sequence, `?` matches one byte, `[abc]`, `[^abc]`
//! and `[a-z]` match a class of bytes, `\` escapes the next byte.

/// Returns `true` if `key` matches `pattern`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    matches(pattern.as_bytes(), key.as_bytes())
}

fn matches(pattern: &[u8], key: &[u8]) -> bool {
    let (mut p, mut k) = (0, 0);
    // Position of the last `*` in the pattern and the key position it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, k));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'[') => match class(&pattern[p..], key[k]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                // an unterminated class is taken literally
                None if key[k] == b'[' => Some(1),
                None => None,
            },
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == key[k]).then_some(2),
            Some(&c) => (c == key[k]).then_some(1),
            None => None,
        };

        match (step, backtrack) {
            (Some(len), _) => {
                p += len;
                k += 1;
            }
            (None, Some((star, tried))) => {
                // let the last `*` swallow one more byte
                backtrack = Some((star, tried + 1));
                p = star + 1;
                k = tried + 1;
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Match `byte` against the class at the start of `pattern`.
///
/// Returns whether the byte matched and the length of the class, or `None` if the class
/// is not terminated.
fn class(pattern: &[u8], byte: u8) -> Option<(bool, usize)> {
    let mut i = 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut found = false;
    loop {
        match *pattern.get(i)? {
            b']' => break,
            b'\\' => {
                found |= *pattern.get(i + 1)? == byte;
                i += 2;
            }
            lo if pattern.get(i + 1) == Some(&b'-')
                && pattern.get(i + 2).map_or(false, |&c| c != b']') =>
            {
                let hi = pattern[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                found |= (lo..=hi).contains(&byte);
                i += 3;
            }
            c => {
                found |= c == byte;
                i += 1;
            }
        }
    }

    Some((found != negate, i + 1))
}
