//! Known canonical namespace URIs and their short rewritten prefixes.

/// Base applicability namespace, rewritten to the `b.` prefix.
pub const NS_BASE_APPLICABILITY: &str = "http://schemas.microsoft.com/msus/2002/12/Applicability";
/// MSI applicability namespace, rewritten to the `m.` prefix.
pub const NS_MSI_APPLICABILITY: &str =
    "http://schemas.microsoft.com/msus/2002/12/Applicability/Msi";
/// Windows driver handler namespace, rewritten to the `d.` prefix.
pub const NS_WINDOWS_DRIVER: &str = "http://schemas.microsoft.com/msus/2002/12/Applicability/Driver";

const KNOWN: &[(&str, &str)] = &[
    (NS_BASE_APPLICABILITY, "b"),
    (NS_MSI_APPLICABILITY, "m"),
    (NS_WINDOWS_DRIVER, "d"),
];

/// Short prefix for a known namespace URI, or `None` if the URI (including
/// the unprefixed update-root namespace) is not one of the three known ones.
#[must_use]
pub fn short_prefix_for(uri: &str) -> Option<&'static str> {
    KNOWN.iter().find(|(known, _)| *known == uri).map(|(_, short)| *short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_namespaces_map_to_expected_prefixes() {
        assert_eq!(short_prefix_for(NS_BASE_APPLICABILITY), Some("b"));
        assert_eq!(short_prefix_for(NS_MSI_APPLICABILITY), Some("m"));
        assert_eq!(short_prefix_for(NS_WINDOWS_DRIVER), Some("d"));
    }

    #[test]
    fn unknown_namespace_has_no_prefix() {
        assert_eq!(short_prefix_for("http://example.invalid/other"), None);
    }
}
