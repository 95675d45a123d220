use carwash_core::{Arg, Value};
use carwash_scrub::{FakerGenerator, FormatError, Generator, LocaleKey};

const EXPECTED: &[&str] = &[
    "boolean",
    "city",
    "company",
    "country",
    "date",
    "email",
    "firstName",
    "freeEmail",
    "ipv4",
    "jobTitle",
    "lastName",
    "name",
    "numberBetween",
    "paragraph",
    "password",
    "phoneNumber",
    "postcode",
    "randomNumber",
    "safeEmail",
    "sentence",
    "streetAddress",
    "streetName",
    "userName",
    "uuid",
    "word",
    "words",
];

#[test]
fn catalog_lists_every_capability() {
    let generator = FakerGenerator::new(1);
    let mut expected = EXPECTED.to_vec();
    expected.sort();
    assert_eq!(generator.capabilities(), expected);
}

#[test]
fn every_capability_produces_a_value_without_args() {
    let generator = FakerGenerator::new(17);
    for name in EXPECTED {
        let value = generator
            .invoke(name, &[])
            .unwrap_or_else(|err| panic!("{name}: {err}"));
        assert!(!value.is_null(), "{name}");
    }
}

#[test]
fn wrong_argument_kinds_are_rejected() {
    let generator = FakerGenerator::new(1);
    let err = generator
        .invoke("words", &[Arg::Text("three".to_string())])
        .expect_err("kind mismatch");
    assert!(matches!(err, FormatError::InvalidArgs { ref generator, .. } if generator == "words"));
    assert!(generator.invoke("firstName", &[Arg::Int(1)]).is_err());
}

#[test]
fn safe_email_uses_example_domains() {
    let generator = FakerGenerator::new(99);
    for _ in 0..20 {
        let value = generator.invoke("safeEmail", &[]).expect("email");
        let email = value.as_str().expect("text");
        let domain = email.split('@').nth(1).expect("domain");
        assert!(domain.starts_with("example."), "{email}");
    }
}

#[test]
fn uuid_is_version_four() {
    let generator = FakerGenerator::new(2);
    let value = generator.invoke("uuid", &[]).expect("uuid");
    let text = value.as_str().expect("text");
    assert_eq!(text.len(), 36);
    assert_eq!(text.as_bytes()[14], b'4');
}

#[test]
fn boolean_extremes_are_deterministic() {
    let generator = FakerGenerator::new(6);
    for _ in 0..10 {
        assert_eq!(generator.invoke("boolean", &[Arg::Int(0)]), Ok(Value::Bool(false)));
        assert_eq!(generator.invoke("boolean", &[Arg::Int(100)]), Ok(Value::Bool(true)));
    }
}

#[test]
fn locale_parses_common_spellings() {
    assert_eq!(LocaleKey::parse("pt_BR"), Some(LocaleKey::PtBr));
    assert_eq!(LocaleKey::parse("en"), Some(LocaleKey::EnUs));
    assert_eq!(LocaleKey::parse("fr_FR"), None);
}
