//! Document-wide namespace accumulation.

/// Well-known namespace URIs.
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Ordered mapping from prefix to every distinct URI observed for that
/// prefix across the whole document.
///
/// A prefix may be rebound to different URIs at different scopes; all
/// distinct URIs are retained in first-seen order. `None` is the default
/// namespace. The table is append-only and deduplicates by URI equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: Vec<(Option<String>, Vec<String>)>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        NamespaceTable::default()
    }

    /// Record a binding. The prefix keeps its first-seen position; the URI
    /// is appended to that prefix's list unless already present.
    pub fn insert(&mut self, prefix: Option<&str>, uri: &str) {
        match self
            .entries
            .iter_mut()
            .find(|(p, _)| p.as_deref() == prefix)
        {
            Some((_, uris)) => {
                if !uris.iter().any(|u| u == uri) {
                    uris.push(uri.to_string());
                }
            }
            None => {
                self.entries
                    .push((prefix.map(str::to_string), vec![uri.to_string()]));
            }
        }
    }

    /// The first URI seen for a prefix.
    pub fn first_uri(&self, prefix: Option<&str>) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p.as_deref() == prefix)
            .and_then(|(_, uris)| uris.first())
            .map(String::as_str)
    }

    /// All URIs seen for a prefix, in first-seen order.
    pub fn uris(&self, prefix: Option<&str>) -> &[String] {
        self.entries
            .iter()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uris)| uris.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &[String])> {
        self.entries
            .iter()
            .map(|(p, uris)| (p.as_deref(), uris.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a mapping with a unique prefix per URI, suitable for an XPath
    /// prefix map. Prefixes bound to a single URI keep their name (`None`
    /// becomes `replace_none_with`); a prefix bound to several URIs gets
    /// numbered variants starting from `start`, skipping names that are
    /// already taken.
    ///
    /// Returns `(unique prefix, (uri, original prefix))` pairs in document
    /// order.
    pub fn unique_prefixes(
        &self,
        replace_none_with: &str,
        start: usize,
    ) -> Vec<(String, (String, Option<String>))> {
        let mut unique: Vec<(String, (String, Option<String>))> = Vec::new();
        for (prefix, uris) in &self.entries {
            let base = prefix.as_deref().unwrap_or(replace_none_with);
            if uris.len() == 1 {
                unique.push((base.to_string(), (uris[0].clone(), prefix.clone())));
            } else {
                let mut index = start.wrapping_sub(1);
                for uri in uris {
                    let try_key = loop {
                        index = index.wrapping_add(1);
                        let candidate = format!("{}{}", base, index);
                        let taken = unique.iter().any(|(k, _)| *k == candidate)
                            || self
                                .entries
                                .iter()
                                .any(|(p, _)| p.as_deref() == Some(candidate.as_str()));
                        if !taken {
                            break candidate;
                        }
                    };
                    unique.push((try_key, (uri.clone(), prefix.clone())));
                }
            }
        }
        unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates_by_uri() {
        let mut table = NamespaceTable::new();
        table.insert(Some("a"), "http://one");
        table.insert(Some("a"), "http://one");
        assert_eq!(table.uris(Some("a")), &["http://one".to_string()]);
    }

    #[test]
    fn test_rebinding_keeps_first_seen_order() {
        let mut table = NamespaceTable::new();
        table.insert(Some("a"), "http://one");
        table.insert(Some("b"), "http://two");
        table.insert(Some("a"), "http://three");
        assert_eq!(
            table.uris(Some("a")),
            &["http://one".to_string(), "http://three".to_string()]
        );
        let prefixes: Vec<_> = table.iter().map(|(p, _)| p).collect();
        assert_eq!(prefixes, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn test_default_namespace_entry() {
        let mut table = NamespaceTable::new();
        table.insert(None, "http://default");
        assert_eq!(table.first_uri(None), Some("http://default"));
    }

    #[test]
    fn test_unique_prefixes_single_binding() {
        let mut table = NamespaceTable::new();
        table.insert(None, "http://default");
        table.insert(Some("x"), "http://x");
        let unique = table.unique_prefixes("default", 1);
        assert_eq!(unique[0].0, "default");
        assert_eq!(unique[0].1 .0, "http://default");
        assert_eq!(unique[1].0, "x");
    }

    #[test]
    fn test_unique_prefixes_numbered_for_rebound() {
        let mut table = NamespaceTable::new();
        table.insert(Some("ns"), "http://one");
        table.insert(Some("ns"), "http://two");
        let unique = table.unique_prefixes("default", 1);
        assert_eq!(unique[0].0, "ns1");
        assert_eq!(unique[0].1 .0, "http://one");
        assert_eq!(unique[1].0, "ns2");
        assert_eq!(unique[1].1 .0, "http://two");
    }

    #[test]
    fn test_unique_prefixes_skips_taken_names() {
        let mut table = NamespaceTable::new();
        table.insert(Some("ns1"), "http://taken");
        table.insert(Some("ns"), "http://one");
        table.insert(Some("ns"), "http://two");
        let unique = table.unique_prefixes("default", 1);
        // "ns1" is an existing prefix, so the numbered names skip it.
        let keys: Vec<_> = unique.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["ns1", "ns2", "ns3"]);
        assert_eq!(unique[1].1 .0, "http://one");
    }
}
