/// Identities that never appear in the permission report.
///
/// Built-in system and service principals are present on nearly every ACL
/// and carry no migration meaning. Unresolvable SIDs belong to deleted
/// accounts and cannot be mapped to a target identity.
enum AccountPattern {
    Exact(&'static str),
    Prefix(&'static str),
}

const EXCLUDED_ACCOUNTS: &[AccountPattern] = &[
    AccountPattern::Exact("NT AUTHORITY\\SYSTEM"),
    AccountPattern::Exact("SYSTEM"),
    AccountPattern::Exact("NT AUTHORITY\\LOCAL SERVICE"),
    AccountPattern::Exact("NT AUTHORITY\\NETWORK SERVICE"),
    AccountPattern::Exact("CREATOR OWNER"),
    AccountPattern::Exact("CREATOR GROUP"),
    AccountPattern::Prefix("NT SERVICE\\"),
    AccountPattern::Prefix("APPLICATION PACKAGE AUTHORITY\\"),
    AccountPattern::Prefix("NT VIRTUAL MACHINE\\"),
    AccountPattern::Prefix("IIS APPPOOL\\"),
    AccountPattern::Prefix("Window Manager\\"),
    AccountPattern::Prefix("Font Driver Host\\"),
    AccountPattern::Prefix("S-1-"),
];

/// `true` if `account` is a system, service, or orphaned-SID identity.
pub fn is_excluded_account(account: &str) -> bool {
    let account = account.trim();
    EXCLUDED_ACCOUNTS.iter().any(|pattern| match pattern {
        AccountPattern::Exact(name) => account.eq_ignore_ascii_case(name),
        AccountPattern::Prefix(prefix) => account
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_identities_are_excluded() {
        assert!(is_excluded_account("NT AUTHORITY\\SYSTEM"));
        assert!(is_excluded_account("nt authority\\system"));
        assert!(is_excluded_account("NT SERVICE\\TrustedInstaller"));
        assert!(is_excluded_account("CREATOR OWNER"));
        assert!(is_excluded_account("S-1-5-21-1004336348-1177238915-682003330-1001"));
    }

    #[test]
    fn people_and_groups_are_kept() {
        assert!(!is_excluded_account("CONTOSO\\alice"));
        assert!(!is_excluded_account("BUILTIN\\Users"));
        assert!(!is_excluded_account("CONTOSO\\Finance Team"));
        assert!(!is_excluded_account("SYSTEMS\\bob"));
    }
}
