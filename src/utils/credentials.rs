//! Helpers for handling provider credentials.

/// Number of trailing characters left visible when a credential is displayed.
const VISIBLE_SUFFIX_CHARS: usize = 4;

/// Mask a credential for display, keeping only its last four characters.
///
/// ```
/// use waav_studio::utils::mask_credential;
/// assert_eq!(mask_credential("sk-1234567890abcd"), "...abcd");
/// ```
pub fn mask_credential(credential: &str) -> String {
    let total = credential.chars().count();
    let suffix: String = credential
        .chars()
        .skip(total.saturating_sub(VISIBLE_SUFFIX_CHARS))
        .collect();
    format!("...{suffix}")
}

/// Trim, drop empty entries and dedupe, keeping the first occurrence.
pub fn normalize_credentials<I, S>(credentials: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    credentials
        .into_iter()
        .map(|c| c.as_ref().trim().to_string())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
