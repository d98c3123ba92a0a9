//! Node identifier classification.
//!
//! A boot request names its node by hardware name (XName), numeric node ID or
//! boot MAC address. Classification is total: anything unrecognised is
//! [`IdentifierKind::Unknown`].

use std::fmt;
use std::sync::LazyLock;

use crds::NodeSpec;
use regex::Regex;

/// `x<cabinet>c<chassis>s<slot>b<bmc>n<node>`, accepting the shorter
/// cabinet/chassis/slot/bmc prefixes as well.
static XNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^x\d{1,4}(c\d{1,2}(s\d{1,2}(b\d{1,2}(n\d{1,2})?)?)?)?$").expect("valid XName pattern")
});

/// Six hex octets, all separated by `:` or all by `-`.
static MAC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(([0-9A-Fa-f]{2}:){5}|([0-9A-Fa-f]{2}-){5})[0-9A-Fa-f]{2}$").expect("valid MAC pattern")
});

/// Which node field an identifier is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    XName,
    Nid,
    Mac,
    Unknown,
}

/// A raw request identifier together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentifier {
    value: String,
    kind: IdentifierKind,
}

impl NodeIdentifier {
    /// Raw identifier as received.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Whether `node` is the node this identifier names.
    ///
    /// XNames compare exactly, MACs case-insensitively against the boot MAC
    /// with `-` read as `:`. Unknown identifiers match nothing.
    pub fn matches(&self, node: &NodeSpec) -> bool {
        match self.kind {
            IdentifierKind::XName => node.xname == self.value,
            IdentifierKind::Nid => node
                .nid
                .zip(self.value.parse::<u64>().ok())
                .is_some_and(|(nid, wanted)| u64::try_from(nid).is_ok_and(|nid| nid == wanted)),
            IdentifierKind::Mac => node.has_boot_mac(&self.value.replace('-', ":")),
            IdentifierKind::Unknown => false,
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            IdentifierKind::XName => "xname",
            IdentifierKind::Nid => "nid",
            IdentifierKind::Mac => "mac",
            IdentifierKind::Unknown => "unknown",
        };
        write!(f, "{} ({kind})", self.value)
    }
}

/// Classify a raw identifier.
///
/// Checked in order: XName, non-negative integer NID, MAC, otherwise unknown.
pub fn classify(raw: &str) -> NodeIdentifier {
    let kind = if XNAME_RE.is_match(raw) {
        IdentifierKind::XName
    } else if is_nid(raw) {
        IdentifierKind::Nid
    } else if MAC_RE.is_match(raw) {
        IdentifierKind::Mac
    } else {
        IdentifierKind::Unknown
    };

    NodeIdentifier {
        value: raw.to_string(),
        kind,
    }
}

/// Any run of decimal digits, however long. Values no node can carry simply
/// match nothing.
fn is_nid(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit())
}
