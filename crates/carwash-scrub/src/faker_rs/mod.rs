//! `fake`-backed implementation of the generator capability.

mod adapter;
mod catalog;
mod locales;

pub use adapter::FakerGenerator;
pub use locales::LocaleKey;
