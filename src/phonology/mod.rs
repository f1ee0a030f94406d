//! Phonological validators for candidate root/suffix splits.
//!
//! Pure functions over fixed vowel and consonant tables: major (backness)
//! and minor (backness + roundness) vowel harmony, and the root-final
//! consonant softening alternation (kitap → kitabı). The segmenter
//! consults these to accept or reject candidate splits; `soften` models
//! an alternation, not an error, so callers must try both the literal
//! and the alternated form against the lexicon.

const BACK_VOWELS: &str = "aıou";
const FRONT_VOWELS: &str = "eiöü";

const UNROUNDED: &str = "aeıi";
const ROUNDED_FRONT: &str = "öü";
const ROUNDED_BACK: &str = "ou";

/// Whether `ch` is a Turkish vowel.
#[inline(always)]
pub fn is_vowel(ch: char) -> bool {
    BACK_VOWELS.contains(ch) || FRONT_VOWELS.contains(ch)
}

/// Whether `word` begins with a vowel. Vacuously false for the empty
/// string.
#[inline(always)]
pub fn starts_with_vowel(word: &str) -> bool {
    word.chars().next().map(is_vowel).unwrap_or(false)
}

/// Major vowel harmony: every vowel in `word` belongs to the same
/// backness class. Words with no vowel vacuously pass.
pub fn harmonizes_major(word: &str) -> bool {
    let mut vowels = word.chars().filter(|&c| is_vowel(c));

    let first = match vowels.next() {
        Some(v) => v,
        None => return true,
    };

    if BACK_VOWELS.contains(first) {
        vowels.all(|v| BACK_VOWELS.contains(v))
    } else {
        vowels.all(|v| FRONT_VOWELS.contains(v))
    }
}

/// Minor vowel harmony across a root-suffix boundary: the root's last
/// vowel and the suffix's first vowel must share a roundness class.
/// Unrounded vowels form a single class spanning both backness classes
/// (`aeıi`), so e.g. kapı + lar harmonizes; rounded vowels split into
/// front (`öü`) and back (`ou`). Vacuously passes when either side has
/// no vowel.
pub fn harmonizes_minor(root: &str, suffix: &str) -> bool {
    let last_root_vowel = match root.chars().rev().find(|&c| is_vowel(c)) {
        Some(v) => v,
        None => return true,
    };
    let first_suffix_vowel = match suffix.chars().find(|&c| is_vowel(c)) {
        Some(v) => v,
        None => return true,
    };

    if UNROUNDED.contains(last_root_vowel) {
        UNROUNDED.contains(first_suffix_vowel)
    } else if ROUNDED_FRONT.contains(last_root_vowel) {
        ROUNDED_FRONT.contains(first_suffix_vowel)
    } else if ROUNDED_BACK.contains(last_root_vowel) {
        ROUNDED_BACK.contains(first_suffix_vowel)
    } else {
        true
    }
}

/// The softening alternation: a root-final voiceless stop becomes voiced
/// before a vowel-initial suffix (p→b, t→d, ç→c, k→ğ). Returns the
/// alternated form, or `None` when the root does not end in the devoicing
/// set. The caller is responsible for checking that the following suffix
/// begins with a vowel.
pub fn soften(root: &str) -> Option<String> {
    let last = root.chars().last()?;
    let voiced = match last {
        'p' => 'b',
        't' => 'd',
        'ç' => 'c',
        'k' => 'ğ',
        _ => return None,
    };
    Some(replace_last(root, last, voiced))
}

/// Inverse of [`soften`]: restores the voiceless stop of a surface form
/// that has already undergone the alternation (kitab → kitap). The
/// segmenter uses this to map a stripped surface root back to its
/// lexicon form.
pub fn harden(form: &str) -> Option<String> {
    let last = form.chars().last()?;
    let voiceless = match last {
        'b' => 'p',
        'd' => 't',
        'c' => 'ç',
        'ğ' => 'k',
        _ => return None,
    };
    Some(replace_last(form, last, voiceless))
}

fn replace_last(word: &str, last: char, replacement: char) -> String {
    let mut out = String::with_capacity(word.len());
    out.push_str(&word[..word.len() - last.len_utf8()]);
    out.push(replacement);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_harmony() {
        assert!(harmonizes_major("ev"));
        assert!(harmonizes_major("evler"));
        assert!(harmonizes_major("okul"));
        assert!(harmonizes_major("arkadaş"));

        // mixed backness
        assert!(!harmonizes_major("kitap"));
        assert!(!harmonizes_major("elma"));

        // no vowels: vacuous pass
        assert!(harmonizes_major("xyz"));
        assert!(harmonizes_major(""));
    }

    #[test]
    fn minor_harmony() {
        assert!(harmonizes_minor("ev", "de"));
        assert!(harmonizes_minor("kapı", "lar"));
        assert!(harmonizes_minor("göz", "lük"));
        assert!(harmonizes_minor("okul", "u"));

        assert!(!harmonizes_minor("ev", "lük"));
        assert!(!harmonizes_minor("okul", "ler"));

        // vowel-less sides: vacuous pass
        assert!(harmonizes_minor("xyz", "de"));
        assert!(harmonizes_minor("ev", "n"));
    }

    #[test]
    fn softening() {
        assert_eq!(soften("kitap").as_deref(), Some("kitab"));
        assert_eq!(soften("ağaç").as_deref(), Some("ağac"));
        assert_eq!(soften("çocuk").as_deref(), Some("çocuğ"));
        assert_eq!(soften("kağıt").as_deref(), Some("kağıd"));
        assert_eq!(soften("ev"), None);
        assert_eq!(soften(""), None);
    }

    #[test]
    fn hardening_inverts_softening() {
        for root in ["kitap", "ağaç", "çocuk", "kağıt"] {
            let softened = soften(root).unwrap();
            assert_eq!(harden(&softened).as_deref(), Some(root));
        }
        assert_eq!(harden("ev"), None);
    }

    #[test]
    fn vowel_predicates() {
        assert!(is_vowel('ı'));
        assert!(is_vowel('ö'));
        assert!(!is_vowel('ğ'));
        assert!(starts_with_vowel("ı"));
        assert!(!starts_with_vowel("de"));
        assert!(!starts_with_vowel(""));
    }
}
