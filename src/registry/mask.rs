/// Match a name against a DOS-style wildcard mask, ignoring ASCII case.
///
/// `*` matches any run of characters, `?` exactly one. An empty mask
/// matches everything.
pub fn matches_mask(mask: &str, name: &str) -> bool {
    if mask.is_empty() {
        return true;
    }
    let pattern: Vec<char> = mask.chars().map(|c| c.to_ascii_lowercase()).collect();
    let text: Vec<char> = name.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut p, mut t) = (0, 0);
    // position after the last '*' and the text position it was tried at
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p + 1, t));
            p += 1;
        } else if let Some((after, tried)) = star {
            p = after;
            t = tried + 1;
            star = Some((after, tried + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_and_question() {
        assert!(matches_mask("*", "anything"));
        assert!(matches_mask("QC_*", "qc_run01"));
        assert!(matches_mask("run??", "run42"));
        assert!(!matches_mask("run??", "run4"));
        assert!(matches_mask("*_01*", "plasma_01_rep"));
        assert!(!matches_mask("*.raw", "sample"));
    }

    #[test]
    fn test_empty_mask_matches_all() {
        assert!(matches_mask("", "sample"));
    }

    #[test]
    fn test_backtracking() {
        assert!(matches_mask("a*b*c", "axxbyybzc"));
        assert!(!matches_mask("a*b*c", "axxbyy"));
    }
}
