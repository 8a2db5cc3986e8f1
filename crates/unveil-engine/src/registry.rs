//! Bookkeeping for template instantiations.

use indexmap::IndexSet;
use smol_str::SmolStr;
use std::fmt;
use unveil_tree::TemplateUse;

/// Identity of one specialization: the template's qualified name and the
/// canonical spelling of its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstantiationKey {
    pub template: SmolStr,
    pub args: SmolStr,
}

impl InstantiationKey {
    pub fn new(template: &str, args: &str) -> Self {
        Self {
            template: SmolStr::new(template.trim_start_matches("::")),
            args: SmolStr::new(args),
        }
    }
}

impl fmt::Display for InstantiationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.template, self.args)
    }
}

/// A use of a template seen while synthesizing, not yet resolved.
#[derive(Debug, Clone)]
pub struct PendingUse {
    pub key: InstantiationKey,
    pub used: TemplateUse,
}

/// Per-run record of which specializations have been handled.
///
/// A key is claimed once; every later use of it is a no-op.
#[derive(Debug, Default)]
pub struct InstantiationRegistry {
    claimed: IndexSet<InstantiationKey>,
    emitted: IndexSet<InstantiationKey>,
    failed: IndexSet<InstantiationKey>,
}

impl InstantiationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for synthesis. False if it was already claimed.
    pub fn claim(&mut self, key: &InstantiationKey) -> bool {
        self.claimed.insert(key.clone())
    }

    /// Record a user-written specialization, which is printed where declared.
    pub fn preregister(&mut self, key: InstantiationKey) {
        self.claimed.insert(key.clone());
        self.emitted.insert(key);
    }

    pub fn mark_emitted(&mut self, key: InstantiationKey) {
        self.emitted.insert(key);
    }

    pub fn mark_failed(&mut self, key: InstantiationKey) {
        self.failed.insert(key);
    }

    pub fn is_claimed(&self, key: &InstantiationKey) -> bool {
        self.claimed.contains(key)
    }

    pub fn is_emitted(&self, key: &InstantiationKey) -> bool {
        self.emitted.contains(key)
    }

    /// Emitted keys in emission order.
    pub fn emitted(&self) -> impl Iterator<Item = &InstantiationKey> {
        self.emitted.iter()
    }

    pub fn failed(&self) -> impl Iterator<Item = &InstantiationKey> {
        self.failed.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let mut registry = InstantiationRegistry::new();
        let key = InstantiationKey::new("::Box", "int");
        assert_eq!(key.to_string(), "Box<int>");
        assert!(registry.claim(&key));
        assert!(!registry.claim(&InstantiationKey::new("Box", "int")));
        assert!(!registry.is_emitted(&key));
        registry.mark_emitted(key.clone());
        assert!(registry.is_emitted(&key));
    }

    #[test]
    fn test_preregistered_keys_are_never_claimed() {
        let mut registry = InstantiationRegistry::new();
        let key = InstantiationKey::new("max", "bool");
        registry.preregister(key.clone());
        assert!(!registry.claim(&key));
        assert_eq!(registry.emitted().collect::<Vec<_>>(), vec![&key]);
    }
}
