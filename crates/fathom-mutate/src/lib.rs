//! The mutation engine (spec §4.3): injection/replacement generator
//! registries and the per-structure fuzz driver built on top of them.

pub mod basic_tests;
pub mod error;
pub mod injection;
pub mod mix_and_match;
pub mod registry;
pub mod replacement;

pub use basic_tests::{basic_tests, count_tests, BasicTestsConfig, Fixup};
pub use error::{MutateError, Result};
pub use mix_and_match::MixAndMatch;
pub use registry::MutationRegistry;
