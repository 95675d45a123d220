//! Generator capability contracts.
//!
//! A [`Generator`] is the whole set of named value generators handed to
//! formatters. A [`Capability`] is one entry of that set.

use rand::RngCore;

use carwash_core::{Arg, Value};

use crate::args::{ArgList, ArgSpec};
use crate::errors::FormatError;
use crate::faker_rs::LocaleKey;

/// Source of realistic random values, looked up by capability name.
///
/// Names are resolved on every call, so a generator may gain capabilities
/// after formatters referencing them were resolved. Implementations own any
/// synchronization their randomness needs.
pub trait Generator: Send + Sync {
    /// Produce a value from the capability `name`.
    fn invoke(&self, name: &str, args: &[Arg]) -> Result<Value, FormatError>;

    /// Sorted capability names.
    fn capabilities(&self) -> Vec<&str>;

    fn has_capability(&self, name: &str) -> bool {
        self.capabilities().contains(&name)
    }
}

/// One named generator.
pub trait Capability: Send + Sync {
    fn id(&self) -> &str;

    /// Positional arguments, in order. All are optional.
    fn arg_specs(&self) -> &'static [ArgSpec] {
        &[]
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError>;
}
