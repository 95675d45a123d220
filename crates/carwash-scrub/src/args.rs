use chrono::NaiveDate;

use carwash_core::Arg;

use crate::errors::FormatError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Bool,
    Int,
    Float,
    String,
    Date,
}

/// Positional argument accepted by a generator capability.
#[derive(Clone, Copy, Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
}

impl ArgSpec {
    pub const fn new(name: &'static str, kind: ArgKind) -> Self {
        Self { name, kind }
    }
}

/// Arguments checked against a capability's positional specs.
#[derive(Debug, Clone, Copy)]
pub struct ArgList<'a> {
    args: &'a [Arg],
}

pub fn validate_args<'a>(
    args: &'a [Arg],
    specs: &[ArgSpec],
    ctx: &str,
) -> Result<ArgList<'a>, FormatError> {
    if args.len() > specs.len() {
        return Err(FormatError::invalid_args(
            ctx,
            format!("expected at most {} arguments, got {}", specs.len(), args.len()),
        ));
    }

    for (arg, spec) in args.iter().zip(specs) {
        if !kind_matches(spec.kind, arg) {
            return Err(FormatError::invalid_args(
                ctx,
                format!("invalid value '{arg}' for argument '{}'", spec.name),
            ));
        }
    }

    Ok(ArgList { args })
}

impl<'a> ArgList<'a> {
    pub fn empty() -> Self {
        Self { args: &[] }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get_i64(&self, index: usize) -> Option<i64> {
        self.args.get(index).and_then(Arg::as_i64)
    }

    pub fn get_usize(&self, index: usize) -> Option<usize> {
        self.get_i64(index).and_then(|value| usize::try_from(value).ok())
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.args.get(index).and_then(|arg| match arg {
            Arg::Int(value) => Some(*value as f64),
            Arg::Float(value) => Some(*value),
            _ => None,
        })
    }

    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.args.get(index).and_then(Arg::as_bool)
    }

    pub fn get_str(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).and_then(Arg::as_str)
    }

    pub fn get_date(&self, index: usize) -> Option<NaiveDate> {
        self.get_str(index).and_then(parse_date_value)
    }
}

fn kind_matches(kind: ArgKind, arg: &Arg) -> bool {
    match kind {
        ArgKind::Bool => matches!(arg, Arg::Bool(_)),
        ArgKind::Int => matches!(arg, Arg::Int(_)),
        ArgKind::Float => matches!(arg, Arg::Int(_) | Arg::Float(_)),
        ArgKind::String => matches!(arg, Arg::Text(_)),
        ArgKind::Date => arg.as_str().and_then(parse_date_value).is_some(),
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Reject a word/sentence count that would make a generator allocate without bound.
pub fn bounded_count(
    ctx: &str,
    name: &str,
    value: usize,
    max: usize,
) -> Result<usize, FormatError> {
    if value > max {
        return Err(FormatError::invalid_args(
            ctx,
            format!("{name} must be <= {max}"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ArgSpec] = &[
        ArgSpec::new("count", ArgKind::Int),
        ArgSpec::new("as_text", ArgKind::Bool),
    ];

    #[test]
    fn accepts_prefix_of_positional_args() {
        let args = [Arg::Int(3)];
        let list = validate_args(&args, SPECS, "words").expect("valid args");
        assert_eq!(list.get_usize(0), Some(3));
        assert_eq!(list.get_bool(1), None);
    }

    #[test]
    fn rejects_wrong_kind_and_extra_args() {
        let args = [Arg::Text("three".to_string())];
        assert!(matches!(
            validate_args(&args, SPECS, "words"),
            Err(FormatError::InvalidArgs { .. })
        ));

        let args = [Arg::Int(3), Arg::Bool(true), Arg::Int(1)];
        assert!(matches!(
            validate_args(&args, SPECS, "words"),
            Err(FormatError::InvalidArgs { .. })
        ));
    }

    #[test]
    fn dates_must_parse() {
        let specs = [ArgSpec::new("from", ArgKind::Date)];
        assert!(validate_args(&[Arg::Text("2020-02-30".to_string())], &specs, "date").is_err());
        let args = [Arg::Text("2020-02-28".to_string())];
        let list = validate_args(&args, &specs, "date").expect("valid date");
        assert_eq!(list.get_date(0), NaiveDate::from_ymd_opt(2020, 2, 28));
    }
}
