//! Entry name normalization
//!
//! Every name an archive hands us is turned into lowercase, NFC-precomposed
//! UTF-8 with forward slashes before it enters the directory. Names that are
//! not valid UTF-8 go through a fallback ladder that never fails: IBM437 for
//! formats that declare it, otherwise every high byte becomes a placeholder.

use std::borrow::Cow;
use std::rc::Rc;

use codepage_437::{CP437_CONTROL, FromCp437};
use unicode_normalization::UnicodeNormalization;

use crate::pool::PoolHandle;
use crate::utils::fix_path_separators;

/// Replacement for undecodable bytes.
pub const PLACEHOLDER: char = '@';

/// Legacy encoding to try when a raw name is not valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackCodepage {
    /// Replace each byte >= 0x80 with [`PLACEHOLDER`].
    #[default]
    Placeholder,
    /// Decode as IBM PC codepage 437 (legacy ZIP member names).
    Ibm437,
}

impl FallbackCodepage {
    /// Map a numeric codepage; anything other than 437 uses the placeholder.
    #[must_use]
    pub fn from_number(codepage: u32) -> Self {
        if codepage == 437 { Self::Ibm437 } else { Self::Placeholder }
    }
}

/// Convert a raw archive name into its canonical form.
///
/// The name ends at the first NUL byte, if any.
#[must_use]
pub fn normalize_name(raw: &[u8], fallback: FallbackCodepage) -> String {
    let raw = raw.split(|&b| b == 0).next().unwrap_or_default();
    if raw.is_empty() {
        return String::new();
    }

    let decoded: Cow<'_, str> = match std::str::from_utf8(raw) {
        Ok(name) => Cow::Borrowed(name),
        Err(_) => match fallback {
            FallbackCodepage::Ibm437 => Cow::Owned(String::from_cp437(raw.to_vec(), &CP437_CONTROL)),
            FallbackCodepage::Placeholder => Cow::Owned(
                raw.iter()
                    .map(|&b| if b >= 0x80 { PLACEHOLDER } else { char::from(b) })
                    .collect(),
            ),
        },
    };

    let canonical: String = decoded.to_lowercase().nfc().collect();
    fix_path_separators(canonical)
}

/// Normalize `raw` and intern the result in `pool`.
pub fn normalize_pooled(pool: &PoolHandle, raw: &[u8], fallback: FallbackCodepage) -> Rc<str> {
    pool.intern(&normalize_name(raw, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_names_are_lowercased() {
        assert_eq!(normalize_name(b"MAPS\\E1M1.WAD", FallbackCodepage::Placeholder), "maps/e1m1.wad");
    }

    #[test]
    fn test_nul_terminates_name() {
        assert_eq!(normalize_name(b"PLAYPAL\0\0", FallbackCodepage::Placeholder), "playpal");
        assert_eq!(normalize_name(b"\0junk", FallbackCodepage::Placeholder), "");
    }

    #[test]
    fn test_decomposed_input_is_precomposed() {
        // "E" + COMBINING ACUTE ACCENT
        let raw = "Caf\u{0045}\u{0301}.txt".as_bytes();
        assert_eq!(normalize_name(raw, FallbackCodepage::Placeholder), "caf\u{e9}.txt");
    }

    #[test]
    fn test_cp437_fallback() {
        // 0x81 is u-umlaut and 0x8E is A-umlaut in codepage 437
        let raw = b"M\x81LLER/\x8eRGER.TXT";
        assert_eq!(normalize_name(raw, FallbackCodepage::Ibm437), "m\u{fc}ller/\u{e4}rger.txt");
    }

    #[test]
    fn test_placeholder_fallback() {
        let raw = b"M\x81LLER.TXT";
        assert_eq!(normalize_name(raw, FallbackCodepage::Placeholder), "m@ller.txt");
    }

    #[test]
    fn test_fallback_from_number() {
        assert_eq!(FallbackCodepage::from_number(437), FallbackCodepage::Ibm437);
        assert_eq!(FallbackCodepage::from_number(1252), FallbackCodepage::Placeholder);
        assert_eq!(FallbackCodepage::from_number(0), FallbackCodepage::Placeholder);
    }

    #[test]
    fn test_pooled_names_share_storage() {
        let pool = PoolHandle::owned();
        let a = normalize_pooled(&pool, b"Sounds/Shot.OGG", FallbackCodepage::Placeholder);
        let b = normalize_pooled(&pool, b"sounds\\shot.ogg", FallbackCodepage::Placeholder);
        assert!(Rc::ptr_eq(&a, &b));
    }

    proptest! {
        #[test]
        fn normalizing_is_idempotent(name in "[a-zA-Z0-9_./\\\\ \u{c0}-\u{ff}-]{0,40}") {
            let once = normalize_name(name.as_bytes(), FallbackCodepage::Placeholder);
            let twice = normalize_name(once.as_bytes(), FallbackCodepage::Placeholder);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn placeholder_fallback_is_idempotent(
            raw in prop::collection::vec(prop_oneof![0x20u8..0x7f, 0x80u8..0xc0], 0..40)
        ) {
            let once = normalize_name(&raw, FallbackCodepage::Placeholder);
            let twice = normalize_name(once.as_bytes(), FallbackCodepage::Placeholder);
            prop_assert!(!once.contains('\\'));
            prop_assert_eq!(once, twice);
        }
    }
}
