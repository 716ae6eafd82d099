//! Mail address syntax check

const LOCAL_PART_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~.";

/// Returns true if `value` is a plausible mail address.
///
/// Rules: shorter than 256 characters, exactly one `@`, a local part of at
/// most 64 characters made of ASCII letters, digits, the usual specials or
/// any non-ASCII character, and a domain with a non-empty name and TLD.
/// No `..` anywhere and no whitespace in the domain.
pub fn is_valid_email(value: &str) -> bool {
    if value.is_empty() || value.chars().count() >= 256 || value.contains("..") {
        return false;
    }

    let mut parts = value.split('@');
    let (Some(account), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    let Some((sub_domain, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    if account.is_empty() || sub_domain.is_empty() || tld.is_empty() {
        return false;
    }
    if sub_domain.starts_with('.') || account.chars().count() > 64 {
        return false;
    }

    let account_ok = account
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SPECIALS.contains(c) || !c.is_ascii());
    if !account_ok {
        return false;
    }

    !domain.chars().any(|c| c.is_whitespace() || c.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(is_valid_email("jörg@example.de"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a..b@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@exa mple.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@.com"));
    }

    #[test]
    fn test_length_limits() {
        let long_local = format!("{}@x.com", "a".repeat(65));
        assert!(!is_valid_email(&long_local));
        let ok_local = format!("{}@x.com", "a".repeat(64));
        assert!(is_valid_email(&ok_local));
        let huge = format!("a@{}.com", "b".repeat(260));
        assert!(!is_valid_email(&huge));
    }
}
