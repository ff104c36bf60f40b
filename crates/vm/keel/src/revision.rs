use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Ruleset selector. Decides which opcodes exist, what they cost and a few
/// behavioural details. Fixed for a whole call tree.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[repr(u8)]
pub enum Revision {
    Frontier = 0,
    Homestead = 1,
    #[strum(to_string = "TangerineWhistle", serialize = "Tangerine")]
    TangerineWhistle = 2,
    #[strum(to_string = "SpuriousDragon", serialize = "Spurious")]
    SpuriousDragon = 3,
    Byzantium = 4,
    /// Constantinople as amended by Petersburg (no EIP-1283).
    #[strum(to_string = "Constantinople", serialize = "Petersburg")]
    Constantinople = 5,
    Istanbul = 6,
    Berlin = 7,
    London = 8,
    #[strum(to_string = "Paris", serialize = "Merge")]
    Paris = 9,
    Shanghai = 10,
    #[default]
    Cancun = 11,
    Prague = 12,
}

impl Revision {
    pub const LATEST: Revision = Revision::Prague;

    pub const ALL: [Revision; 13] = [
        Revision::Frontier,
        Revision::Homestead,
        Revision::TangerineWhistle,
        Revision::SpuriousDragon,
        Revision::Byzantium,
        Revision::Constantinople,
        Revision::Istanbul,
        Revision::Berlin,
        Revision::London,
        Revision::Paris,
        Revision::Shanghai,
        Revision::Cancun,
        Revision::Prague,
    ];

    /// Ordering usable in `const fn` contexts, where `PartialOrd` is not.
    pub const fn is_at_least(self, other: Revision) -> bool {
        #[allow(clippy::as_conversions)]
        let (this, other) = (self as u8, other as u8);
        this >= other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn revisions_are_ordered() {
        for pair in Revision::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1].is_at_least(pair[0]));
            assert!(!pair[0].is_at_least(pair[1]));
        }
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(
            Revision::from_str("Petersburg").unwrap(),
            Revision::Constantinople
        );
        assert_eq!(Revision::from_str("Merge").unwrap(), Revision::Paris);
        assert_eq!(Revision::from_str("Cancun").unwrap(), Revision::Cancun);
        assert!(Revision::from_str("Osaka").is_err());
    }

    #[test]
    fn serde_uses_variant_names() {
        let json = serde_json::to_string(&Revision::Shanghai).unwrap();
        assert_eq!(json, "\"Shanghai\"");
        let back: Revision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Revision::Shanghai);
    }
}
