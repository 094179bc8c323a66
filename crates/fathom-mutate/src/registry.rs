//! Two registries keyed by field-type string (spec §4.3, §9): capability
//! maps open for user extension at runtime — "users register new field
//! kinds by inserting into this map."

use std::collections::HashMap;

use fathom_binstruct::Field;
use fathom_generators::Generator;

pub type InjectionGeneratorFn =
    Box<dyn Fn(usize) -> Box<dyn Generator<Vec<u8>> + Send> + Send + Sync>;
pub type ReplacementGeneratorFn = Box<
    dyn Fn(&Field, usize, bool, usize, usize) -> Box<dyn Generator<Vec<u8>> + Send> + Send + Sync,
>;

pub struct MutationRegistry {
    injection_generators: HashMap<String, InjectionGeneratorFn>,
    replacement_generators: HashMap<String, ReplacementGeneratorFn>,
}

impl MutationRegistry {
    pub fn new() -> Self {
        Self {
            injection_generators: HashMap::new(),
            replacement_generators: HashMap::new(),
        }
    }

    /// Seeded with the built-in default chains for `string` and the
    /// fallback unkeyed default (spec §4.3).
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register_injection(
            "string",
            Box::new(|max_len| Box::new(crate::injection::string_injection_generator(max_len))),
        );
        reg.register_injection(
            "__default__",
            Box::new(|max_len| Box::new(crate::injection::default_injection_generator(max_len))),
        );
        reg.register_replacement(
            "__default__",
            Box::new(|f, max_len, preserve_length, random_cases, fuzz_level| {
                crate::replacement::default_replacement_generator(
                    f,
                    max_len,
                    preserve_length,
                    random_cases,
                    fuzz_level,
                )
            }),
        );
        reg
    }

    pub fn register_injection(&mut self, type_key: &str, gen_fn: InjectionGeneratorFn) {
        self.injection_generators.insert(type_key.to_string(), gen_fn);
    }

    pub fn register_replacement(&mut self, type_key: &str, gen_fn: ReplacementGeneratorFn) {
        self.replacement_generators.insert(type_key.to_string(), gen_fn);
    }

    pub fn injection_for(&self, type_key: &str, max_len: usize) -> Box<dyn Generator<Vec<u8>> + Send> {
        let gen_fn = self
            .injection_generators
            .get(type_key)
            .or_else(|| self.injection_generators.get("__default__"))
            .expect("__default__ injection generator always registered via with_defaults");
        gen_fn(max_len)
    }

    pub fn replacement_for(
        &self,
        type_key: &str,
        field: &Field,
        max_len: usize,
        preserve_length: bool,
        random_cases: usize,
        fuzz_level: usize,
    ) -> Box<dyn Generator<Vec<u8>> + Send> {
        let gen_fn = self
            .replacement_generators
            .get(type_key)
            .or_else(|| self.replacement_generators.get("__default__"))
            .expect("__default__ replacement generator always registered via with_defaults");
        gen_fn(field, max_len, preserve_length, random_cases, fuzz_level)
    }
}

impl Default for MutationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fathom_binstruct::{Endianness, Field};

    #[test]
    fn default_registry_falls_back_for_unknown_type() {
        let reg = MutationRegistry::with_defaults();
        let mut g = reg.injection_for("nonexistent_type", 3);
        assert_eq!(g.collect_remaining().len(), 3);
    }

    #[test]
    fn user_can_register_a_custom_replacement_generator() {
        let mut reg = MutationRegistry::with_defaults();
        reg.register_replacement(
            "always_zero",
            Box::new(|_f, _max_len, _preserve, _random, _fuzz| {
                Box::new(fathom_generators::Static::new(vec![0u8], 1, vec![]))
            }),
        );
        let f = Field::unsigned("v", 8, Endianness::Big);
        let mut g = reg.replacement_for("always_zero", &f, 0, false, 0, 1);
        assert_eq!(g.collect_remaining(), vec![vec![0u8]]);
    }
}
