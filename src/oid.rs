//! OID string helpers for the poller.

use anyhow::{Result, anyhow};
use snmp2::Oid;

/// Parse a dotted OID string (e.g., "1.3.6.1.4.1.28507.27") into an Oid.
pub fn parse_oid(oid_str: &str) -> Result<Oid<'static>> {
    oid_str
        .parse::<Oid>()
        .map_err(|e| anyhow!("Failed to parse OID '{}': {:?}", oid_str, e))
        .map(|oid| oid.to_owned())
}

/// Convert an Oid back to its dotted string representation.
pub fn oid_to_string(oid: &Oid) -> String {
    oid.to_id_string()
}

/// Check if an OID is a child of (or equal to) a parent OID.
pub fn oid_starts_with(oid: &Oid, parent: &Oid) -> bool {
    oid.starts_with(parent)
}

/// Dotted path of `oid` relative to `root`.
///
/// Returns `None` unless `oid` is a strict descendant of `root`.
pub fn oid_suffix(oid: &Oid, root: &Oid) -> Option<String> {
    if !oid.starts_with(root) {
        return None;
    }

    let full = oid.to_id_string();
    let prefix = root.to_id_string();

    full.strip_prefix(&prefix)?
        .strip_prefix('.')
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_oid_roundtrip() {
        let oid = parse_oid("1.3.6.1.4.1.28507.27.1.1.1.1.0").unwrap();
        assert_eq!(oid_to_string(&oid), "1.3.6.1.4.1.28507.27.1.1.1.1.0");
    }

    #[test]
    fn test_oid_starts_with() {
        let parent = parse_oid("1.3.6.1.4.1.28507.27").unwrap();
        let child = parse_oid("1.3.6.1.4.1.28507.27.1.5.1.2.1.4.2").unwrap();
        let other = parse_oid("1.3.6.1.4.1.28507.38.1.1.1.1.0").unwrap();

        assert!(oid_starts_with(&child, &parent));
        assert!(oid_starts_with(&parent, &parent)); // equal
        assert!(!oid_starts_with(&other, &parent));
        assert!(!oid_starts_with(&parent, &child)); // parent is shorter
    }

    #[test]
    fn test_oid_suffix() {
        let root = parse_oid("1.3.6.1.4.1.28507.27").unwrap();
        let child = parse_oid("1.3.6.1.4.1.28507.27.1.5.1.2.1.4.2").unwrap();
        let other = parse_oid("1.3.6.1.2.1.1.3.0").unwrap();

        assert_eq!(oid_suffix(&child, &root).as_deref(), Some("1.5.1.2.1.4.2"));
        assert_eq!(oid_suffix(&root, &root), None); // not a strict descendant
        assert_eq!(oid_suffix(&other, &root), None);
    }
}
