use chrono::NaiveDate;
use fake::Fake;
use rand::{Rng, RngCore};

use carwash_core::Value;

use super::locales::LocaleKey;
use crate::args::{ArgKind, ArgList, ArgSpec, bounded_count};
use crate::errors::FormatError;
use crate::generators::Capability;

const MAX_WORDS: usize = 1_000;
const MAX_SENTENCES: usize = 100;
const DEFAULT_DATE_FROM: (i32, u32, u32) = (1970, 1, 1);
const DEFAULT_DATE_TO: (i32, u32, u32) = (2024, 1, 1);

pub fn default_capabilities() -> Vec<Box<dyn Capability>> {
    vec![
        Box::new(FirstNameGen),
        Box::new(LastNameGen),
        Box::new(NameGen),
        Box::new(UserNameGen),
        Box::new(EmailGen),
        Box::new(SafeEmailGen),
        Box::new(FreeEmailGen),
        Box::new(PasswordGen),
        Box::new(WordGen),
        Box::new(WordsGen),
        Box::new(SentenceGen),
        Box::new(ParagraphGen),
        Box::new(PhoneNumberGen),
        Box::new(CityGen),
        Box::new(StreetNameGen),
        Box::new(StreetAddressGen),
        Box::new(PostcodeGen),
        Box::new(CountryGen),
        Box::new(CompanyGen),
        Box::new(JobTitleGen),
        Box::new(Ipv4Gen),
        Box::new(UuidGen),
        Box::new(RandomNumberGen),
        Box::new(NumberBetweenGen),
        Box::new(BooleanGen),
        Box::new(DateGen),
    ]
}

macro_rules! text_faker {
    ($ty:ident, $id:literal, $($path:ident)::+) => {
        struct $ty;

        impl Capability for $ty {
            fn id(&self) -> &str {
                $id
            }

            fn generate(
                &self,
                _args: &ArgList<'_>,
                _locale: LocaleKey,
                rng: &mut dyn RngCore,
            ) -> Result<Value, FormatError> {
                let value: String = $($path)::+().fake_with_rng(rng);
                Ok(Value::Text(value))
            }
        }
    };
}

macro_rules! localized_name_faker {
    ($ty:ident, $id:literal, $faker:ident) => {
        struct $ty;

        impl Capability for $ty {
            fn id(&self) -> &str {
                $id
            }

            fn generate(
                &self,
                _args: &ArgList<'_>,
                locale: LocaleKey,
                rng: &mut dyn RngCore,
            ) -> Result<Value, FormatError> {
                let value: String = match locale {
                    LocaleKey::EnUs => fake::faker::name::en::$faker().fake_with_rng(rng),
                    LocaleKey::PtBr => fake::faker::name::pt_br::$faker().fake_with_rng(rng),
                };
                Ok(Value::Text(value))
            }
        }
    };
}

localized_name_faker!(FirstNameGen, "firstName", FirstName);
localized_name_faker!(LastNameGen, "lastName", LastName);
localized_name_faker!(NameGen, "name", Name);

text_faker!(UserNameGen, "userName", fake::faker::internet::en::Username);
text_faker!(EmailGen, "email", fake::faker::internet::en::FreeEmail);
text_faker!(SafeEmailGen, "safeEmail", fake::faker::internet::en::SafeEmail);
text_faker!(FreeEmailGen, "freeEmail", fake::faker::internet::en::FreeEmail);
text_faker!(WordGen, "word", fake::faker::lorem::en::Word);
text_faker!(PhoneNumberGen, "phoneNumber", fake::faker::phone_number::en::PhoneNumber);
text_faker!(CityGen, "city", fake::faker::address::en::CityName);
text_faker!(StreetNameGen, "streetName", fake::faker::address::en::StreetName);
text_faker!(PostcodeGen, "postcode", fake::faker::address::en::ZipCode);
text_faker!(CountryGen, "country", fake::faker::address::en::CountryName);
text_faker!(CompanyGen, "company", fake::faker::company::en::CompanyName);
text_faker!(JobTitleGen, "jobTitle", fake::faker::job::en::Title);
text_faker!(Ipv4Gen, "ipv4", fake::faker::internet::en::IPv4);

struct PasswordGen;

const PASSWORD_ARGS: &[ArgSpec] = &[
    ArgSpec::new("min_len", ArgKind::Int),
    ArgSpec::new("max_len", ArgKind::Int),
];

impl Capability for PasswordGen {
    fn id(&self) -> &str {
        "password"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        PASSWORD_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let min = args.get_usize(0).unwrap_or(8);
        let max = args.get_usize(1).unwrap_or(min.max(20));
        if min == 0 || min > max {
            return Err(FormatError::invalid_args(
                self.id(),
                "min_len must be >= 1 and <= max_len",
            ));
        }
        let max = bounded_count(self.id(), "max_len", max, MAX_WORDS)?;
        let value: String = fake::faker::internet::en::Password(min..max + 1).fake_with_rng(rng);
        Ok(Value::Text(value))
    }
}

struct WordsGen;

const WORDS_ARGS: &[ArgSpec] = &[
    ArgSpec::new("count", ArgKind::Int),
    ArgSpec::new("as_text", ArgKind::Bool),
];

impl Capability for WordsGen {
    fn id(&self) -> &str {
        "words"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        WORDS_ARGS
    }

    // Records only hold scalars, so the words are always joined; `as_text`
    // is accepted for compatibility with existing configs.
    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let count = bounded_count(self.id(), "count", args.get_usize(0).unwrap_or(3), MAX_WORDS)?;
        let words: Vec<String> = fake::faker::lorem::en::Words(count..count + 1).fake_with_rng(rng);
        Ok(Value::Text(words.join(" ")))
    }
}

struct SentenceGen;

const SENTENCE_ARGS: &[ArgSpec] = &[ArgSpec::new("words", ArgKind::Int)];

impl Capability for SentenceGen {
    fn id(&self) -> &str {
        "sentence"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        SENTENCE_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let words = bounded_count(self.id(), "words", args.get_usize(0).unwrap_or(6), MAX_WORDS)?;
        if words == 0 {
            return Err(FormatError::invalid_args(self.id(), "words must be >= 1"));
        }
        let value: String = fake::faker::lorem::en::Sentence(words..words + 1).fake_with_rng(rng);
        Ok(Value::Text(value))
    }
}

struct ParagraphGen;

const PARAGRAPH_ARGS: &[ArgSpec] = &[ArgSpec::new("sentences", ArgKind::Int)];

impl Capability for ParagraphGen {
    fn id(&self) -> &str {
        "paragraph"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        PARAGRAPH_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let sentences = bounded_count(
            self.id(),
            "sentences",
            args.get_usize(0).unwrap_or(3),
            MAX_SENTENCES,
        )?;
        if sentences == 0 {
            return Err(FormatError::invalid_args(self.id(), "sentences must be >= 1"));
        }
        let value: String =
            fake::faker::lorem::en::Paragraph(sentences..sentences + 1).fake_with_rng(rng);
        Ok(Value::Text(value))
    }
}

struct StreetAddressGen;

impl Capability for StreetAddressGen {
    fn id(&self) -> &str {
        "streetAddress"
    }

    fn generate(
        &self,
        _args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let number: String = fake::faker::address::en::BuildingNumber().fake_with_rng(rng);
        let street: String = fake::faker::address::en::StreetName().fake_with_rng(rng);
        Ok(Value::Text(format!("{number} {street}")))
    }
}

struct UuidGen;

impl Capability for UuidGen {
    fn id(&self) -> &str {
        "uuid"
    }

    fn generate(
        &self,
        _args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let mut bytes = [0_u8; 16];
        rng.fill_bytes(&mut bytes);
        let value = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Ok(Value::Text(value.to_string()))
    }
}

struct RandomNumberGen;

const RANDOM_NUMBER_ARGS: &[ArgSpec] = &[ArgSpec::new("digits", ArgKind::Int)];

impl Capability for RandomNumberGen {
    fn id(&self) -> &str {
        "randomNumber"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        RANDOM_NUMBER_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let digits = args.get_i64(0).unwrap_or(6);
        if !(1..=18).contains(&digits) {
            return Err(FormatError::invalid_args(
                self.id(),
                "digits must be between 1 and 18",
            ));
        }
        let upper = 10_i64.pow(digits as u32);
        Ok(Value::Int(rng.random_range(0..upper)))
    }
}

struct NumberBetweenGen;

const NUMBER_BETWEEN_ARGS: &[ArgSpec] = &[
    ArgSpec::new("min", ArgKind::Int),
    ArgSpec::new("max", ArgKind::Int),
];

impl Capability for NumberBetweenGen {
    fn id(&self) -> &str {
        "numberBetween"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        NUMBER_BETWEEN_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let min = args.get_i64(0).unwrap_or(0);
        let max = args.get_i64(1).unwrap_or(9999);
        if min > max {
            return Err(FormatError::invalid_args(self.id(), "min must be <= max"));
        }
        Ok(Value::Int(rng.random_range(min..=max)))
    }
}

struct BooleanGen;

const BOOLEAN_ARGS: &[ArgSpec] = &[ArgSpec::new("chance_of_true", ArgKind::Int)];

impl Capability for BooleanGen {
    fn id(&self) -> &str {
        "boolean"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        BOOLEAN_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let chance = args.get_i64(0).unwrap_or(50);
        if !(0..=100).contains(&chance) {
            return Err(FormatError::invalid_args(
                self.id(),
                "chance_of_true must be between 0 and 100",
            ));
        }
        Ok(Value::Bool(rng.random_bool(chance as f64 / 100.0)))
    }
}

struct DateGen;

const DATE_ARGS: &[ArgSpec] = &[
    ArgSpec::new("from", ArgKind::Date),
    ArgSpec::new("to", ArgKind::Date),
];

impl Capability for DateGen {
    fn id(&self) -> &str {
        "date"
    }

    fn arg_specs(&self) -> &'static [ArgSpec] {
        DATE_ARGS
    }

    fn generate(
        &self,
        args: &ArgList<'_>,
        _locale: LocaleKey,
        rng: &mut dyn RngCore,
    ) -> Result<Value, FormatError> {
        let from = args.get_date(0).unwrap_or_else(|| ymd(DEFAULT_DATE_FROM));
        let to = args.get_date(1).unwrap_or_else(|| ymd(DEFAULT_DATE_TO));
        if from > to {
            return Err(FormatError::invalid_args(self.id(), "from must be <= to"));
        }
        let span = (to - from).num_days();
        let offset = rng.random_range(0..=span);
        let date = from + chrono::Duration::days(offset);
        Ok(Value::Text(date.format("%Y-%m-%d").to_string()))
    }
}

fn ymd((year, month, day): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
