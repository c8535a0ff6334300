/// Decides which submitters skip human review.
///
/// Entries are exact addresses (`jane@corp.com`) or domain wildcards
/// (`*@corp.com`). A wildcard matches addresses whose domain is exactly
/// `corp.com`; `jane@eu.corp.com` does not match `*@corp.com`.
#[derive(Debug, Clone, Default)]
pub struct ApprovalGate {
    addresses: Vec<String>,
    domains: Vec<String>,
}

impl ApprovalGate {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut gate = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            match entry.strip_prefix('*') {
                Some(suffix) if suffix.starts_with('@') => {
                    gate.domains.push(suffix.to_lowercase());
                }
                _ => gate.addresses.push(entry.to_lowercase()),
            }
        }
        gate
    }

    /// Build from a comma-separated list such as `a@x.com, *@corp.com`.
    pub fn from_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn needs_approval(&self, submission_email: &str) -> bool {
        let email = submission_email.trim().to_lowercase();
        if email.is_empty() {
            return true;
        }
        let exempt = self.addresses.iter().any(|a| *a == email)
            || self.domains.iter().any(|d| email.ends_with(d.as_str()));
        !exempt
    }
}
