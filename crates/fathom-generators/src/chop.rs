//! `Chop(bytes)` (spec §4.1, §8 invariant/property 7): repeatedly remove
//! the middle third until length < 3.
//!
//! The symmetric left/right-keep sizes below follow the prose rule in
//! spec §4.1 literally. The worked example in spec §8 property 7 implies
//! an asymmetric (left-heavy-by-one) split in places the prose doesn't
//! describe; DESIGN.md records that as a resolved open question — this
//! implementation follows the textual rule, which is the one thing both
//! examples agree is being computed (thirds of the current length, kept
//! symmetrically, removed from the center).

use crate::vecgen::VecGenerator;

fn keep_size(len: usize) -> usize {
    match len % 3 {
        0 => len / 3,
        1 => (len - 1) / 3,
        _ => (len + 1) / 3,
    }
}

fn chop_once(bytes: &[u8]) -> Vec<u8> {
    let len = bytes.len();
    let keep = keep_size(len);
    let mut out = Vec::with_capacity(keep * 2);
    out.extend_from_slice(&bytes[..keep]);
    out.extend_from_slice(&bytes[len - keep..]);
    out
}

/// Eagerly compute the full `Chop` sequence: each successive chop of
/// `bytes`, stopping once a result's length drops below 3.
pub fn chop(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut current = bytes.to_vec();
    while current.len() >= 3 {
        let next = chop_once(&current);
        out.push(next.clone());
        if next.len() >= current.len() {
            // keep_size degenerates (can happen only below length 3);
            // guard against an infinite loop rather than hang.
            break;
        }
        current = next;
        if current.len() < 3 {
            break;
        }
    }
    out
}

pub fn generator(bytes: &[u8]) -> VecGenerator<Vec<u8>> {
    VecGenerator::new(chop(bytes))
}
