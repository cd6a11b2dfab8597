use crate::config::IdentityRule;
use crate::constants::cleaning::NAN_PLACEHOLDER;
use crate::types::Identity;

impl IdentityRule {
    /// Normalize one raw identity; absent input becomes `""`.
    pub fn clean(self, raw: Option<&str>) -> Identity {
        let Some(raw) = raw else {
            return Identity::new();
        };
        match self {
            IdentityRule::Enron => clean_enron(raw),
            IdentityRule::Seattle => clean_seattle(raw),
        }
    }
}

/// Remove `[`, `]`, `'`, `"` and spaces.
pub fn clean_enron(raw: &str) -> Identity {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"' | ' '))
        .collect()
}

/// Keep the text before the first `<` and then before the first `(`, minus quotes and spaces.
pub fn clean_seattle(raw: &str) -> Identity {
    let head = raw.split('<').next().unwrap_or(raw);
    let head = head.split('(').next().unwrap_or(head);
    head.chars()
        .filter(|c| !matches!(c, '"' | '\'' | ' '))
        .collect()
}

/// Split a delimiter-joined receiver cell into cleaned recipients.
///
/// With `single_required`, anything other than exactly one recipient yields
/// an empty list so the row is dropped.
pub fn split_recipients(
    raw: Option<&str>,
    rule: IdentityRule,
    delimiter: &str,
    single_required: bool,
) -> Vec<Identity> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let recipients: Vec<Identity> = raw
        .split(delimiter)
        .map(|recipient| rule.clean(Some(recipient)))
        .collect();
    if single_required && recipients.len() != 1 {
        return Vec::new();
    }
    recipients
}

/// True for an empty identity or the textual `nan` placeholder (any case).
pub fn is_missing(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case(NAN_PLACEHOLDER)
}
