//! The per-structure fuzz driver (spec §4.3): `basic_tests` yields a
//! sequence of mutated structures across four phases — Replace, Delete,
//! Inject, Group.

use std::collections::HashSet;

use fathom_binstruct::{Binstruct, Endianness, Field, FieldKind, Node};
use fathom_generators::{Cartesian, Generator};

use crate::registry::MutationRegistry;
use crate::Result;

/// The registry lookup key for a field (spec §9: "users register new field
/// kinds by inserting into this map"); built-in kinds get a fixed name,
/// user-defined ones carry their own key through unchanged.
fn type_key(kind: &FieldKind) -> &str {
    match kind {
        FieldKind::Unsigned => "unsigned",
        FieldKind::Signed => "signed",
        FieldKind::StringKind => "string",
        FieldKind::HexString => "hex_string",
        FieldKind::OctetString => "octet_string",
        FieldKind::BitString => "bit_string",
        FieldKind::Custom(name) => name,
    }
}

/// An ordered, pure `Struct -> Struct` transform applied left-to-right
/// before a test case is emitted (spec §4.3).
pub type Fixup = Box<dyn Fn(&mut Binstruct) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct BasicTestsConfig {
    pub max_len: usize,
    pub send_unfixed: bool,
    pub skip: HashSet<String>,
    pub fuzz_level: usize,
    pub preserve_length: bool,
    pub random_cases: usize,
}

impl Default for BasicTestsConfig {
    fn default() -> Self {
        Self {
            max_len: 64,
            send_unfixed: false,
            skip: HashSet::new(),
            fuzz_level: 1,
            preserve_length: false,
            random_cases: 4,
        }
    }
}

fn apply_fixups(s: &Binstruct, fixups: &[Fixup]) -> Binstruct {
    let mut fixed = s.clone();
    for fixup in fixups {
        fixup(&mut fixed);
    }
    fixed
}

fn emit(results: &mut Vec<Vec<u8>>, s: &Binstruct, cfg: &BasicTestsConfig, fixups: &[Fixup]) {
    if cfg.send_unfixed {
        results.push(s.encode());
    }
    results.push(apply_fixups(s, fixups).encode())
}

/// Replace phase: for each leaf field, for each replacement value, set
/// it, emit, then restore (spec §4.3 step 1).
fn replace_phase(
    s: &mut Binstruct,
    cfg: &BasicTestsConfig,
    registry: &MutationRegistry,
    fixups: &[Fixup],
    out: &mut Vec<Vec<u8>>,
) -> Result<()> {
    let names: Vec<String> = s.deep_each().iter().map(|f| f.name.clone()).collect();
    let original = s.encode();

    for name in names {
        if cfg.skip.contains(&name) {
            continue;
        }
        let field_snapshot = s.find_field(&name)?.clone();
        let mut generator = registry.replacement_for(
            type_key(&field_snapshot.kind),
            &field_snapshot,
            cfg.max_len,
            cfg.preserve_length,
            cfg.random_cases,
            cfg.fuzz_level,
        );

        while generator.has_next() {
            let value = generator.next().expect("has_next() just returned true");
            s.find_field_mut(&name)?.set_truncated_bits(&bytes_to_bits(&value))?;
            emit(out, s, cfg, fixups);
            s.replace(&name, Node::Field(field_snapshot.clone()))?;
        }
        debug_assert_eq!(s.encode(), original, "replace phase must restore original encoding");
    }
    Ok(())
}

/// Delete phase: unless `preserve_length`, replace each leaf field with
/// an empty substructure, emit, restore (spec §4.3 step 2).
fn delete_phase(s: &mut Binstruct, cfg: &BasicTestsConfig, fixups: &[Fixup], out: &mut Vec<Vec<u8>>) -> Result<()> {
    if cfg.preserve_length {
        return Ok(());
    }
    let names: Vec<String> = s.deep_each().iter().map(|f| f.name.clone()).collect();
    for name in names {
        if cfg.skip.contains(&name) {
            continue;
        }
        let original_field = s.find_field(&name)?.clone();
        let endian = original_field.endianness;
        s.replace(&name, Node::Field(Field::string(&name, 0, endian)))?;
        emit(out, s, cfg, fixups);
        s.replace(&name, Node::Field(original_field))?;
    }
    Ok(())
}

/// Inject phase: unless `preserve_length`, for each leaf field, chain
/// injection-generator chunks before (and, for the first field, also
/// after) the field's own bytes (spec §4.3 step 3).
fn inject_phase(
    s: &mut Binstruct,
    cfg: &BasicTestsConfig,
    registry: &MutationRegistry,
    fixups: &[Fixup],
    out: &mut Vec<Vec<u8>>,
) -> Result<()> {
    if cfg.preserve_length {
        return Ok(());
    }
    let names: Vec<String> = s.deep_each().iter().map(|f| f.name.clone()).collect();
    for (idx, name) in names.iter().enumerate() {
        if cfg.skip.contains(name) {
            continue;
        }
        let original_field = s.find_field(name)?.clone();
        let endian = original_field.endianness;
        let encoded_field = original_field.get_bytes();
        let mut injector = registry.injection_for(type_key(&original_field.kind), cfg.max_len);

        while injector.has_next() {
            let chunk = injector.next().expect("has_next() just returned true");

            let mut before = chunk.clone();
            before.extend_from_slice(&encoded_field);
            let replacement_name = format!("{name}__inject");
            let mut string_field = Field::string(&replacement_name, (before.len() * 8).max(1), endian);
            string_field.set_string_bytes(&before)?;
            s.replace(name, Node::Field(string_field.clone()))?;
            emit(out, s, cfg, fixups);
            s.replace(&replacement_name, Node::Field(original_field.clone()))?;

            if idx == 0 {
                let mut after = encoded_field.clone();
                after.extend_from_slice(&chunk);
                let mut after_field = Field::string(&replacement_name, (after.len() * 8).max(1), endian);
                after_field.set_string_bytes(&after)?;
                s.replace(name, Node::Field(after_field))?;
                emit(out, s, cfg, fixups);
                s.replace(&replacement_name, Node::Field(original_field.clone()))?;
            }
        }
    }
    Ok(())
}

/// Group phase: cartesian product of each declared group's members'
/// replacement generators, `8 * fuzz_level` random cases each (spec
/// §4.3 step 4).
fn group_phase(
    s: &mut Binstruct,
    cfg: &BasicTestsConfig,
    registry: &MutationRegistry,
    fixups: &[Fixup],
    out: &mut Vec<Vec<u8>>,
) -> Result<()> {
    let groups: Vec<(String, Vec<String>)> =
        s.groups().iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    for (_group_name, members) in groups {
        let mut originals: Vec<Field> = Vec::with_capacity(members.len());
        for m in &members {
            originals.push(s.find_field(m)?.clone());
        }

        let gens: Vec<Box<dyn Generator<Vec<u8>> + Send>> = originals
            .iter()
            .map(|f| {
                registry.replacement_for(
                    type_key(&f.kind),
                    f,
                    cfg.max_len,
                    cfg.preserve_length,
                    8 * cfg.fuzz_level,
                    cfg.fuzz_level,
                )
            })
            .collect();
        let mut cartesian = Cartesian::new(gens);

        while cartesian.has_next() {
            let tuple = cartesian.next().expect("has_next() just returned true");
            for (member, value) in members.iter().zip(tuple.iter()) {
                s.find_field_mut(member)?.set_truncated_bits(&bytes_to_bits(value))?;
            }
            emit(out, s, cfg, fixups);
        }

        for (member, original) in members.iter().zip(originals.into_iter()) {
            s.replace(member, Node::Field(original))?;
        }
    }
    Ok(())
}

fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    let mut out = Vec::with_capacity(bytes.len() * 8);
    for &b in bytes {
        for i in (0..8).rev() {
            out.push((b >> i) & 1 == 1);
        }
    }
    out
}

/// Run all four phases against `s`, returning every emitted encoding in
/// order (spec §4.3). Replacement/injection generators are looked up per
/// field through `registry`, so a caller's custom registrations (spec §9)
/// actually take effect in the fuzz loop.
pub fn basic_tests(
    s: &mut Binstruct,
    cfg: &BasicTestsConfig,
    registry: &MutationRegistry,
    fixups: &[Fixup],
) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    replace_phase(s, cfg, registry, fixups, &mut out)?;
    delete_phase(s, cfg, fixups, &mut out)?;
    inject_phase(s, cfg, registry, fixups, &mut out)?;
    group_phase(s, cfg, registry, fixups, &mut out)?;
    Ok(out)
}

/// `count_tests()`: must match the number of yields a normal
/// `basic_tests` run produces (spec §4.3) — true by construction since
/// both share the same eager traversal.
pub fn count_tests(
    s: &mut Binstruct,
    cfg: &BasicTestsConfig,
    registry: &MutationRegistry,
    fixups: &[Fixup],
) -> Result<usize> {
    Ok(basic_tests(s, cfg, registry, fixups)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_binstruct::Endianness as E;

    fn sample() -> Binstruct {
        Binstruct::new("pkt", E::Big)
            .push_field(Field::unsigned("a", 4, E::Big))
            .unwrap()
            .push_field(Field::unsigned("b", 4, E::Big))
            .unwrap()
    }

    #[test]
    fn count_tests_matches_basic_tests_len() {
        let mut s1 = sample();
        let mut s2 = sample();
        let cfg = BasicTestsConfig::default();
        let registry = MutationRegistry::with_defaults();
        let direct = basic_tests(&mut s1, &cfg, &registry, &[]).unwrap();
        let counted = count_tests(&mut s2, &cfg, &registry, &[]).unwrap();
        assert_eq!(direct.len(), counted);
    }

    #[test]
    fn replace_phase_restores_original_encoding() {
        let mut s = sample();
        let original = s.encode();
        let cfg = BasicTestsConfig::default();
        let registry = MutationRegistry::with_defaults();
        basic_tests(&mut s, &cfg, &registry, &[]).unwrap();
        assert_eq!(s.encode(), original);
    }

    #[test]
    fn preserve_length_skips_delete_and_inject_phases() {
        let mut with_mutation = sample();
        let mut preserved = sample();
        let mut cfg = BasicTestsConfig::default();
        cfg.random_cases = 0;
        cfg.fuzz_level = 1;
        let registry = MutationRegistry::with_defaults();
        let full = basic_tests(&mut with_mutation, &cfg, &registry, &[]).unwrap().len();

        cfg.preserve_length = true;
        let reduced = basic_tests(&mut preserved, &cfg, &registry, &[]).unwrap().len();
        assert!(reduced < full);
    }

    #[test]
    fn registered_custom_replacement_generator_is_actually_used() {
        // A field registered under a custom type key must drive the
        // replace phase through the registry, not the hardcoded default.
        let mut v = Field::unsigned("v", 8, E::Big);
        v.kind = FieldKind::Custom("always_zero".to_string());
        let mut s = Binstruct::new("pkt", E::Big).push_field(v).unwrap();
        let mut registry = MutationRegistry::with_defaults();
        registry.register_replacement(
            "always_zero",
            Box::new(|_f, _max_len, _preserve, _random, _fuzz| {
                Box::new(fathom_generators::Static::new(vec![0xAAu8], 1, vec![]))
            }),
        );
        let cfg = BasicTestsConfig {
            random_cases: 0,
            ..BasicTestsConfig::default()
        };
        let out = basic_tests(&mut s, &cfg, &registry, &[]).unwrap();
        assert!(out.iter().any(|enc| enc == &vec![0xAA]));
    }
}
