//! Replacement name generation.
//!
//! A [`NameGenerator`] owns its random source, so each engine invocation
//! carries independent state and tests can pin the output with a seed.
//! Candidates are drawn at random and re-rolled on collision; when a small
//! name space is close to full the generator falls back to walking the space
//! from a random offset, so a name is found whenever one is free.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::config::{GenerationSpec, NameStrategy};
use crate::core::errors::{Result, ScramblerError};
use crate::core::symbols::{NameExclusions, Scope, SymbolCategory};

/// Random draws per name before falling back to enumeration.
pub const MAX_ATTEMPTS: usize = 512;

/// Name spaces up to this size can be enumerated exhaustively.
const ENUMERATION_LIMIT: u128 = 1 << 20;

/// Ranges up to this many code points are materialized as a list.
const LISTED_RANGE_LIMIT: u32 = 0x1_0000;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Whether a code point may appear in a generated name.
///
/// Surrogates, noncharacters and control characters are rejected.
pub fn is_usable_code_point(code_point: u32) -> bool {
    match char::from_u32(code_point) {
        None => false,
        Some(c) if c.is_control() => false,
        Some(_) => !is_noncharacter(code_point),
    }
}

fn is_noncharacter(code_point: u32) -> bool {
    (0xFDD0..=0xFDEF).contains(&code_point) || (code_point & 0xFFFE) == 0xFFFE
}

/// Number of usable code points in the inclusive range.
pub fn usable_code_points(range_start: u32, range_end: u32) -> u32 {
    if range_start > range_end {
        return 0;
    }

    let overlap = |lo: u32, hi: u32| -> u32 {
        let lo = lo.max(range_start);
        let hi = hi.min(range_end);
        if lo > hi {
            0
        } else {
            hi - lo + 1
        }
    };

    let total = range_end - range_start + 1;
    let controls = overlap(0x00, 0x1F) + overlap(0x7F, 0x9F);
    let surrogates = overlap(0xD800, 0xDFFF);
    let beyond = overlap(0x11_0000, u32::MAX);
    let mut nonchars = overlap(0xFDD0, 0xFDEF);
    for plane in 0..=0x10u32 {
        let base = plane << 16;
        nonchars += overlap(base | 0xFFFE, base | 0xFFFF);
    }

    total.saturating_sub(controls + surrogates + beyond + nonchars)
}

/// The characters a strategy draws from.
#[derive(Debug)]
enum Alphabet {
    /// Every usable character, in code point order
    Listed(Vec<char>),
    /// A large range sampled by rejection
    Sparse { start: u32, end: u32, size: u32 },
}

impl Alphabet {
    fn for_strategy(strategy: &NameStrategy) -> Self {
        match *strategy {
            NameStrategy::RandomHex => {
                Alphabet::Listed(HEX_DIGITS.iter().map(|&b| char::from(b)).collect())
            }
            NameStrategy::RandomUnicodeCharRange {
                range_start,
                range_end,
            } => {
                if range_end.saturating_sub(range_start) < LISTED_RANGE_LIMIT {
                    Alphabet::Listed(
                        (range_start..=range_end)
                            .filter(|&cp| is_usable_code_point(cp))
                            .filter_map(char::from_u32)
                            .collect(),
                    )
                } else {
                    Alphabet::Sparse {
                        start: range_start,
                        end: range_end,
                        size: usable_code_points(range_start, range_end),
                    }
                }
            }
        }
    }

    fn size(&self) -> u32 {
        match self {
            Alphabet::Listed(chars) => chars.len() as u32,
            Alphabet::Sparse { size, .. } => *size,
        }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> char {
        match self {
            Alphabet::Listed(chars) => chars[rng.gen_range(0..chars.len())],
            Alphabet::Sparse { start, end, .. } => loop {
                // Sparse ranges span more than a plane, so at least ~95% of
                // draws are usable.
                let code_point = rng.gen_range(*start..=*end);
                if is_usable_code_point(code_point) {
                    if let Some(c) = char::from_u32(code_point) {
                        return c;
                    }
                }
            },
        }
    }
}

/// Number of distinct names a generation setting can produce (saturating).
pub fn capacity(spec: &GenerationSpec) -> u128 {
    let alphabet = match spec.strategy {
        NameStrategy::RandomHex => HEX_DIGITS.len() as u128,
        NameStrategy::RandomUnicodeCharRange {
            range_start,
            range_end,
        } => u128::from(usable_code_points(range_start, range_end)),
    };
    match u32::try_from(spec.name_length) {
        Ok(exponent) => alphabet.checked_pow(exponent).unwrap_or(u128::MAX),
        Err(_) if alphabet <= 1 => alphabet,
        Err(_) => u128::MAX,
    }
}

/// Generates unique replacement names under a [`GenerationSpec`].
pub struct NameGenerator<R: Rng = StdRng> {
    rng: R,
    alphabets: HashMap<NameStrategy, Alphabet>,
}

impl NameGenerator<StdRng> {
    /// Generator with a fixed seed (reproducible output).
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> NameGenerator<R> {
    /// Wrap an existing random source.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            alphabets: HashMap::new(),
        }
    }

    /// Fail fast if `required` distinct names cannot fit in the name space.
    pub fn ensure_capacity(
        &self,
        category: SymbolCategory,
        scope: &Scope,
        spec: &GenerationSpec,
        required: usize,
    ) -> Result<()> {
        let available = capacity(spec);
        let required = required as u128;
        if required > available {
            return Err(ScramblerError::exhausted(category, scope, required, available));
        }
        Ok(())
    }

    /// Produce a name that `exclude` does not rule out.
    pub fn generate<E: NameExclusions + ?Sized>(
        &mut self,
        category: SymbolCategory,
        scope: &Scope,
        spec: &GenerationSpec,
        exclude: &E,
    ) -> Result<String> {
        let length = spec.name_length;
        let alphabet = self
            .alphabets
            .entry(spec.strategy)
            .or_insert_with(|| Alphabet::for_strategy(&spec.strategy));

        if alphabet.size() == 0 {
            return Err(ScramblerError::exhausted(
                category,
                scope,
                exclude.excluded_count() as u128 + 1,
                0,
            ));
        }

        for _ in 0..MAX_ATTEMPTS {
            let candidate: String = (0..length).map(|_| alphabet.sample(&mut self.rng)).collect();
            if !exclude.excludes(&candidate) {
                return Ok(candidate);
            }
        }

        let available = capacity(spec);
        if let Alphabet::Listed(chars) = alphabet {
            if available <= ENUMERATION_LIMIT {
                let offset = self.rng.gen_range(0..available);
                for step in 0..available {
                    let candidate = name_at(chars, length, (offset + step) % available);
                    if !exclude.excludes(&candidate) {
                        return Ok(candidate);
                    }
                }
            }
        }

        Err(ScramblerError::exhausted(
            category,
            scope,
            exclude.excluded_count() as u128 + 1,
            available,
        ))
    }
}

/// The `index`-th name of the space, reading `index` in base `chars.len()`.
fn name_at(chars: &[char], length: usize, mut index: u128) -> String {
    let base = chars.len() as u128;
    let mut out = vec![chars[0]; length];
    for slot in out.iter_mut().rev() {
        *slot = chars[(index % base) as usize];
        index /= base;
    }
    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn hex(len: usize) -> GenerationSpec {
        GenerationSpec {
            strategy: NameStrategy::RandomHex,
            name_length: len,
        }
    }

    fn unicode(len: usize, range_start: u32, range_end: u32) -> GenerationSpec {
        GenerationSpec {
            strategy: NameStrategy::RandomUnicodeCharRange {
                range_start,
                range_end,
            },
            name_length: len,
        }
    }

    #[test]
    fn test_hex_names_match_alphabet_and_length() {
        let mut generator = NameGenerator::from_seed(1);
        for _ in 0..50 {
            let name = generator
                .generate(SymbolCategory::Variable, &Scope::Global, &hex(8), &HashSet::<String>::new())
                .unwrap();
            assert_eq!(name.len(), 8);
            assert!(name.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_unicode_names_stay_in_range() {
        let mut generator = NameGenerator::from_seed(2);
        let spec = unicode(6, 0x4E00, 0x9FFF);
        for _ in 0..50 {
            let name = generator
                .generate(SymbolCategory::List, &Scope::Global, &spec, &HashSet::<String>::new())
                .unwrap();
            assert_eq!(name.chars().count(), 6);
            assert!(name.chars().all(|c| (0x4E00..=0x9FFF).contains(&(c as u32))));
        }
    }

    #[test]
    fn test_unicode_skips_surrogates() {
        let mut generator = NameGenerator::from_seed(3);
        // Only U+D7FF and U+E000 are usable.
        let spec = unicode(4, 0xD7FF, 0xE000);
        for _ in 0..20 {
            let name = generator
                .generate(SymbolCategory::Sound, &Scope::target(0), &spec, &HashSet::<String>::new())
                .unwrap();
            assert!(name.chars().all(|c| c == '\u{D7FF}' || c == '\u{E000}'));
        }
    }

    #[test]
    fn test_large_sparse_range() {
        let mut generator = NameGenerator::from_seed(4);
        let spec = unicode(3, 0x0, 0x10FFFF);
        let name = generator
            .generate(SymbolCategory::Sprite, &Scope::Global, &spec, &HashSet::<String>::new())
            .unwrap();
        assert_eq!(name.chars().count(), 3);
        assert!(name.chars().all(|c| is_usable_code_point(c as u32)));
    }

    #[test]
    fn test_generation_avoids_excluded_names() {
        let mut generator = NameGenerator::from_seed(5);
        let spec = hex(1);
        let mut taken = HashSet::new();
        for _ in 0..16 {
            let name = generator
                .generate(SymbolCategory::Variable, &Scope::Global, &spec, &taken)
                .unwrap();
            assert!(taken.insert(name));
        }
        assert_eq!(taken.len(), 16);

        let err = generator
            .generate(SymbolCategory::Variable, &Scope::Global, &spec, &taken)
            .unwrap_err();
        assert!(matches!(err, ScramblerError::GenerationExhausted { available: 16, .. }));
    }

    #[test]
    fn test_ensure_capacity_detects_small_spaces() {
        let generator = NameGenerator::from_seed(6);
        assert!(generator
            .ensure_capacity(SymbolCategory::Variable, &Scope::Global, &hex(1), 16)
            .is_ok());
        let err = generator
            .ensure_capacity(SymbolCategory::Variable, &Scope::Global, &hex(1), 20)
            .unwrap_err();
        if let ScramblerError::GenerationExhausted {
            required,
            available,
            ..
        } = err
        {
            assert_eq!(required, 20);
            assert_eq!(available, 16);
        } else {
            panic!("Expected GenerationExhausted");
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let spec = hex(12);
        let mut a = NameGenerator::from_seed(42);
        let mut b = NameGenerator::from_seed(42);
        for _ in 0..10 {
            assert_eq!(
                a.generate(SymbolCategory::Costume, &Scope::target(1), &spec, &HashSet::<String>::new())
                    .unwrap(),
                b.generate(SymbolCategory::Costume, &Scope::target(1), &spec, &HashSet::<String>::new())
                    .unwrap()
            );
        }
    }

    #[test]
    fn test_usable_code_point_counts() {
        assert_eq!(usable_code_points(0x41, 0x5A), 26);
        assert_eq!(usable_code_points(0xD800, 0xDFFF), 0);
        assert_eq!(usable_code_points(0x0, 0x1F), 0);
        assert_eq!(usable_code_points(0xFDD0, 0xFDEF), 0);
        assert_eq!(usable_code_points(0xFFFE, 0xFFFF), 0);
        assert_eq!(usable_code_points(0x42, 0x41), 0);
        let counted = (0xFD00..=0x1_0010)
            .filter(|&cp| is_usable_code_point(cp))
            .count() as u32;
        assert_eq!(usable_code_points(0xFD00, 0x1_0010), counted);
    }

    #[test]
    fn test_capacity_saturates() {
        assert_eq!(capacity(&hex(2)), 256);
        assert_eq!(capacity(&hex(64)), u128::MAX);
        assert_eq!(capacity(&unicode(2, 0x41, 0x43)), 9);
    }

    #[test]
    fn test_name_at_enumerates_every_name() {
        let chars: Vec<char> = "ab".chars().collect();
        let names: Vec<String> = (0..4).map(|i| name_at(&chars, 2, i)).collect();
        assert_eq!(names, vec!["aa", "ab", "ba", "bb"]);
    }
}
