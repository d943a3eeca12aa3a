//! Random test data for the `source` table.
//!
//! This is a helper for seeding demos and tests, not part of the demos themselves.
use rand::Rng;

use crate::rows::SourceRow;

/// The longest text the generator will produce, exclusive.
pub const MAX_TEXT_LEN: usize = 5_000;

/// Digits and ASCII letters only, so the text never needs escaping to be readable in a log line.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generate a string of random length in `0..max_len` drawn from [ALPHABET].
pub fn random_text(rng: &mut impl Rng, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    let len = rng.gen_range(0..max_len);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Lazily generate `count` rows with consecutive ids starting at `first_id`.
pub fn random_source_rows<'a, R: Rng>(
    rng: &'a mut R,
    first_id: i64,
    count: usize,
    max_len: usize,
) -> impl Iterator<Item = SourceRow> + 'a {
    (0..count).map(move |i| SourceRow::new(first_id + i as i64, random_text(&mut *rng, max_len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;

    #[test]
    fn text_respects_length_and_alphabet() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let text = random_text(&mut rng, 64);
            assert!(text.len() < 64);
            assert!(text.bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn zero_length_limit_gives_empty_text() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        assert_eq!(random_text(&mut rng, 0), "");
    }

    #[test]
    fn rows_have_consecutive_ids() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let ids = random_source_rows(&mut rng, 10, 4, 8)
            .map(|r| r.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![10, 11, 12, 13]);
    }
}
