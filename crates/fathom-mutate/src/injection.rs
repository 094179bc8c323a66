//! Default injection generator chains (spec §4.3): content to inject
//! before/after a field.

use fathom_generators::{Chain, Generator, Static};

use crate::mix_and_match::MixAndMatch;

fn random_byte_pool() -> Vec<u8> {
    (0u16..=255).map(|b| b as u8).collect()
}

fn ascii_alphabetic_pool() -> Vec<u8> {
    (b'a'..=b'z').chain(b'A'..=b'Z').collect()
}

fn syntactic_token_pool() -> Vec<u8> {
    b"'\"();{}[]<>=%&|$`\\\n\t".to_vec()
}

fn bad_surrogate_pool() -> Vec<u8> {
    // Lone UTF-16 surrogate halves (0xD800-0xDFFF range), low byte varies,
    // high byte fixed — these never form a valid surrogate pair.
    vec![0x00, 0xD8, 0xFF, 0xDF, 0x00, 0xDC, 0xFF, 0xDB]
}

/// 70/85/100-weighted mix of random bytes, ASCII alphabetics, and
/// syntactic tokens (spec §4.3).
pub fn default_injection_generator(max_len: usize) -> MixAndMatch {
    MixAndMatch::new(
        max_len,
        vec![random_byte_pool(), ascii_alphabetic_pool(), syntactic_token_pool()],
        vec![70, 85, 100],
        false,
    )
}

/// UTF-16-mode variant: the default mix chained with bad-surrogate
/// sequences (spec §4.3).
pub fn utf16_injection_generator(max_len: usize) -> Chain<Vec<u8>> {
    let default: Box<dyn Generator<Vec<u8>> + Send> = Box::new(MixAndMatch::new(
        max_len,
        vec![random_byte_pool(), ascii_alphabetic_pool(), syntactic_token_pool()],
        vec![70, 85, 100],
        true,
    ));
    let surrogates: Box<dyn Generator<Vec<u8>> + Send> =
        Box::new(Static::new(bad_surrogate_pool(), 1, vec![]));
    Chain::new(vec![default, surrogates])
}

/// String-kind override: front-loads a mostly-ASCII mix ahead of the
/// default chain (spec §4.3).
pub fn string_injection_generator(max_len: usize) -> Chain<Vec<u8>> {
    let mostly_ascii: Box<dyn Generator<Vec<u8>> + Send> = Box::new(MixAndMatch::new(
        max_len,
        vec![ascii_alphabetic_pool(), random_byte_pool()],
        vec![90, 100],
        false,
    ));
    let default: Box<dyn Generator<Vec<u8>> + Send> =
        Box::new(default_injection_generator(max_len));
    Chain::new(vec![mostly_ascii, default])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chain_emits_max_len_tokens() {
        let mut g = default_injection_generator(4);
        assert_eq!(g.collect_remaining().len(), 4);
    }

    #[test]
    fn utf16_chain_appends_surrogates() {
        let mut g = utf16_injection_generator(2);
        let all = g.collect_remaining();
        // 2 from the mix + 1 surrogate entry
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn string_override_front_loads_ascii_mix() {
        let mut g = string_injection_generator(3);
        assert_eq!(g.collect_remaining().len(), 6);
    }
}
