use std::collections::BTreeMap;
use std::net::IpAddr;

/// Where an enumerated interface stands with respect to the operator's
/// interface restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceScope {
    InScope,
    OutOfScope,
    /// Traffic on this interface is handled as if it arrived on `canonical`.
    AliasOf(String),
}

#[derive(Debug, Clone)]
struct BridgeAlias {
    canonical: String,
    used: bool,
}

/// Operator-supplied interface restrictions.
///
/// Besides answering "do we listen here?", the filter remembers which allowed
/// names and addresses ever matched so that typos can be reported.
#[derive(Debug, Clone, Default)]
pub struct InterfaceNameFilter {
    allowed_names: BTreeMap<String, bool>,
    allowed_addresses: BTreeMap<IpAddr, bool>,
    excluded_names: Vec<String>,
    bridge_aliases: BTreeMap<String, BridgeAlias>,
}

impl InterfaceNameFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_name(mut self, name: impl Into<String>) -> Self {
        self.allowed_names.insert(name.into(), false);
        self
    }

    pub fn allow_address(mut self, addr: IpAddr) -> Self {
        self.allowed_addresses.insert(addr, false);
        self
    }

    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        self.excluded_names.push(name.into());
        self
    }

    pub fn bridge_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.bridge_aliases.insert(
            alias.into(),
            BridgeAlias {
                canonical: canonical.into(),
                used: false,
            },
        );
        self
    }

    /// True when neither names nor addresses restrict where we listen.
    pub fn is_unrestricted(&self) -> bool {
        self.allowed_names.is_empty() && self.allowed_addresses.is_empty()
    }

    pub fn accepts(&mut self, name: &str, addr: IpAddr) -> bool {
        let mut accepted = self.is_unrestricted();

        // Every entry is visited so each one's `used` flag stays accurate.
        for (pattern, used) in self.allowed_names.iter_mut() {
            if name_matches(pattern, name) {
                *used = true;
                accepted = true;
            }
        }

        for (allowed, used) in self.allowed_addresses.iter_mut() {
            if *allowed == addr {
                *used = true;
                accepted = true;
            }
        }

        if self
            .excluded_names
            .iter()
            .any(|pattern| name_matches(pattern, name))
        {
            accepted = false;
        }

        accepted
    }

    /// Maps a bridged interface onto the interface it is bridged into.
    pub fn resolve_alias<'a>(&'a mut self, name: &'a str) -> &'a str {
        match self.bridge_aliases.get_mut(name) {
            Some(alias) => {
                alias.used = true;
                alias.canonical.as_str()
            }
            None => name,
        }
    }

    pub fn classify(&mut self, name: &str, addr: IpAddr) -> InterfaceScope {
        let resolved = self.resolve_alias(name);
        if resolved != name {
            return InterfaceScope::AliasOf(resolved.to_string());
        }

        if self.accepts(name, addr) {
            InterfaceScope::InScope
        } else {
            InterfaceScope::OutOfScope
        }
    }

    pub fn unused_names(&self) -> Vec<&str> {
        self.allowed_names
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn unused_addresses(&self) -> Vec<IpAddr> {
        self.allowed_addresses
            .iter()
            .filter(|(_, used)| !**used)
            .map(|(addr, _)| *addr)
            .collect()
    }

    pub fn unused_aliases(&self) -> Vec<&str> {
        self.bridge_aliases
            .iter()
            .filter(|(_, alias)| !alias.used)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// `eth*` matches every name starting with `eth`; anything else is literal.
fn name_matches(pattern: &str, name: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => pattern == name,
    }
}
