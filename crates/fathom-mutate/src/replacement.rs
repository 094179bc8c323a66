//! Default replacement generator (spec §4.3): replacement content for a
//! single field, selected by its length type and width.

use fathom_binstruct::{Endianness as FieldEndian, Field, LengthType};
use fathom_generators::{chop, Chain, Endianness, Generator, RollingCorrupt, VecGenerator};

fn to_generator_endian(e: FieldEndian) -> Endianness {
    match e {
        FieldEndian::Big => Endianness::Big,
        FieldEndian::Little => Endianness::Little,
    }
}

fn enumerate_small_values(length_bits: usize) -> Vec<Vec<u8>> {
    let count = 1u64 << length_bits;
    let n_bytes = (length_bits + 7) / 8;
    (0..count)
        .map(|v| v.to_be_bytes()[8 - n_bytes..].to_vec())
        .collect()
}

/// Repeat `bytes` 1, 2, 3, … times while the total length stays within
/// `max_len` (spec §4.3: "replicates the field up to `max_len`").
fn replicate_up_to(bytes: &[u8], max_len: usize) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut reps = 1usize;
    while bytes.len() * reps <= max_len {
        out.push(bytes.repeat(reps));
        reps += 1;
    }
    out
}

fn boxed(g: impl Generator<Vec<u8>> + Send + 'static) -> Box<dyn Generator<Vec<u8>> + Send> {
    Box::new(g)
}

/// Default replacement generator for field `f` (spec §4.3).
pub fn default_replacement_generator(
    f: &Field,
    max_len: usize,
    preserve_length: bool,
    random_cases: usize,
    fuzz_level: usize,
) -> Box<dyn Generator<Vec<u8>> + Send> {
    let endian = to_generator_endian(f.endianness);
    let bytes = f.get_bytes();

    if f.length_type == LengthType::Fixed || max_len == 0 {
        if f.length_bits > 8 {
            return boxed(RollingCorrupt::new(
                &bytes,
                f.length_bits,
                f.length_bits,
                random_cases,
                endian,
            ));
        }
        return boxed(VecGenerator::new(enumerate_small_values(f.length_bits)));
    }

    // Variable length: pick window width by current length bucket.
    let mut chain: Vec<Box<dyn Generator<Vec<u8>> + Send>> = Vec::new();
    if f.length_bits < 16 {
        chain.push(boxed(RollingCorrupt::new(&bytes, 8, 8, random_cases, endian)));
    } else if f.length_bits < 32 {
        chain.push(boxed(RollingCorrupt::new(&bytes, 16, 16, random_cases, endian)));
    } else {
        chain.push(boxed(RollingCorrupt::new(&bytes, 16, 16, random_cases, endian)));
        chain.push(boxed(RollingCorrupt::new(&bytes, 32, 32, random_cases, endian)));
    }
    if fuzz_level > 1 {
        chain.push(boxed(RollingCorrupt::new(&bytes, 13, 5, random_cases, endian)));
        chain.push(boxed(RollingCorrupt::new(&bytes, 7, 7, random_cases, endian)));
    }

    if !preserve_length {
        chain.push(boxed(VecGenerator::new(replicate_up_to(&bytes, max_len))));
        chain.push(boxed(VecGenerator::new(chop(&bytes))));
    }

    boxed(Chain::new(chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_binstruct::Endianness as FE;

    #[test]
    fn small_fixed_field_enumerates_every_value() {
        let f = Field::unsigned("v", 3, FE::Big);
        let mut g = default_replacement_generator(&f, 0, false, 0, 1);
        assert_eq!(g.collect_remaining().len(), 8);
    }

    #[test]
    fn wide_fixed_field_uses_rolling_corrupt() {
        let mut f = Field::unsigned("v", 16, FE::Big);
        f.set_unsigned(0x1234).unwrap();
        let mut g = default_replacement_generator(&f, 0, false, 0, 1);
        let all = g.collect_remaining();
        assert!(!all.is_empty());
        assert!(all.iter().all(|v| v.len() == 2));
    }

    #[test]
    fn variable_field_chains_replicate_and_chop_unless_preserved() {
        let mut f = Field::string("s", 64, FE::Big);
        f.set_string_bytes(b"hello").unwrap();
        let mut g = default_replacement_generator(&f, 32, false, 0, 1);
        assert!(!g.collect_remaining().is_empty());
    }
}
