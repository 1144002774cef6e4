//! Glob matching with the same rules the store applies to `KEYS`:
//! `*`, `?`, `[abc]`, `[^abc]`, `[a-z]` and `\` escapes. Always a full-key match.

/// Key names are matched byte-wise, so binary keys behave as they do on the server.
pub fn matches(p: &[u8], s: &[u8]) -> bool {
    let (mut pi, mut si) = (0, 0);
    // pattern index after the last `*`, and the key index it is currently absorbing up to
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        let step = match p.get(pi) {
            Some(b'*') => {
                star = Some((pi + 1, si));
                pi += 1;
                continue;
            }
            Some(b'?') => Some(pi + 1),
            Some(b'[') => {
                let (ok, next) = match_class(p, pi, s[si]);
                ok.then_some(next)
            }
            Some(b'\\') if pi + 1 < p.len() => (p[pi + 1] == s[si]).then_some(pi + 2),
            Some(&c) => (c == s[si]).then_some(pi + 1),
            None => None,
        };

        match (step, star) {
            (Some(next), _) => {
                pi = next;
                si += 1;
            }
            (None, Some((after_star, absorbed))) => {
                star = Some((after_star, absorbed + 1));
                pi = after_star;
                si = absorbed + 1;
            }
            (None, None) => return false,
        }
    }

    p[pi..].iter().all(|&c| c == b'*')
}

/// Matches `c` against the class opening at `open`. Returns the verdict and the index
/// just past the closing `]` (an unterminated class runs to the end of the pattern).
fn match_class(p: &[u8], open: usize, c: u8) -> (bool, usize) {
    let mut i = open + 1;
    let negate = p.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut hit = false;
    while i < p.len() && p[i] != b']' {
        if p[i] == b'\\' && i + 1 < p.len() {
            hit |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == b'-' && p[i + 2] != b']' {
            let (lo, hi) = if p[i] <= p[i + 2] { (p[i], p[i + 2]) } else { (p[i + 2], p[i]) };
            hit |= lo <= c && c <= hi;
            i += 3;
        } else {
            hit |= p[i] == c;
            i += 1;
        }
    }

    let next = if i < p.len() { i + 1 } else { i };
    (hit != negate, next)
}
