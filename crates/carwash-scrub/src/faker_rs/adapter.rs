use std::collections::BTreeMap;
use std::sync::Mutex;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use carwash_core::{Arg, Value};

use super::catalog::default_capabilities;
use super::locales::LocaleKey;
use crate::args::validate_args;
use crate::errors::FormatError;
use crate::generators::{Capability, Generator};

/// Generator backed by the `fake` crate.
///
/// Randomness comes from a single seeded ChaCha stream, so a run with a fixed
/// seed and sequential tables reproduces the same values.
pub struct FakerGenerator {
    capabilities: BTreeMap<String, Box<dyn Capability>>,
    locale: LocaleKey,
    rng: Mutex<ChaCha8Rng>,
}

impl FakerGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(ChaCha8Rng::from_rng(&mut rand::rng()))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        let mut generator = Self {
            capabilities: BTreeMap::new(),
            locale: LocaleKey::default(),
            rng: Mutex::new(rng),
        };
        for capability in default_capabilities() {
            generator.register(capability);
        }
        generator
    }

    pub fn with_locale(mut self, locale: LocaleKey) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> LocaleKey {
        self.locale
    }

    /// Add or replace a capability.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        self.capabilities
            .insert(capability.id().to_string(), capability);
    }
}

impl Generator for FakerGenerator {
    fn invoke(&self, name: &str, args: &[Arg]) -> Result<Value, FormatError> {
        let capability = self
            .capabilities
            .get(name)
            .ok_or_else(|| FormatError::UnknownGenerator(name.to_string()))?;
        let args = validate_args(args, capability.arg_specs(), name)?;
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| FormatError::Failed("generator rng lock poisoned".to_string()))?;
        capability.generate(&args, self.locale, &mut *rng)
    }

    fn capabilities(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }

    fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }
}
