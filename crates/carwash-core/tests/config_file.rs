use carwash_core::{Arg, ConfigFile, RawFormatter, RawTableEntry, config_json_schema};

const SAMPLE: &str = r#"
[tables]
sessions = "app::ScrubSession"

[tables.users]
first_name = "firstName"
bio = "words:3,true"
password = { generator = "password", args = [12, 16] }
ssn = { type = "carwash::Redact" }

[tables.audit]
primary_key = "audit_id"
record = { type = "app::ScrubAudit" }
"#;

fn parse(input: &str) -> ConfigFile {
    toml::from_str(input).expect("parse config")
}

#[test]
fn parses_all_table_shapes() {
    let config = parse(SAMPLE);
    assert_eq!(
        config.table_names().collect::<Vec<_>>(),
        vec!["audit", "sessions", "users"]
    );

    match &config.tables["sessions"] {
        RawTableEntry::Shorthand(name) => assert_eq!(name, "app::ScrubSession"),
        other => panic!("unexpected sessions entry: {other:?}"),
    }

    let RawTableEntry::Block(users) = &config.tables["users"] else {
        panic!("users should be a block");
    };
    assert!(users.record.is_none());
    let fields = users.field_entries("users").expect("fields");
    assert_eq!(fields.len(), 4);
    assert_eq!(fields["first_name"], RawFormatter::Spec("firstName".to_string()));
    match &fields["password"] {
        RawFormatter::Generator(entry) => {
            assert_eq!(entry.generator, "password");
            assert_eq!(entry.args, vec![Arg::Int(12), Arg::Int(16)]);
        }
        other => panic!("unexpected password entry: {other:?}"),
    }
    match &fields["ssn"] {
        RawFormatter::Type(entry) => assert_eq!(entry.type_name, "carwash::Redact"),
        other => panic!("unexpected ssn entry: {other:?}"),
    }

    let RawTableEntry::Block(audit) = &config.tables["audit"] else {
        panic!("audit should be a block");
    };
    assert_eq!(audit.primary_key.as_deref(), Some("audit_id"));
    assert!(audit.record.is_some());
    assert!(!audit.has_fields());
}

#[test]
fn json_and_toml_describe_the_same_config() {
    let json = r#"{
        "tables": {
            "users": {
                "first_name": "firstName",
                "password": {"generator": "password", "args": [12, 16]}
            }
        }
    }"#;
    let from_json = ConfigFile::from_json_str(json).expect("parse json");
    let from_toml = parse(
        r#"
        [tables.users]
        first_name = "firstName"
        password = { generator = "password", args = [12, 16] }
        "#,
    );
    assert_eq!(
        serde_json::to_value(&from_json).expect("json value"),
        serde_json::to_value(&from_toml).expect("toml value")
    );
}

#[test]
fn unknown_root_keys_are_rejected() {
    let result = ConfigFile::from_json_str(r#"{"tabels": {}}"#);
    assert!(result.is_err());
}

#[test]
fn json_schema_names_the_tables_property() {
    let schema = serde_json::to_value(config_json_schema()).expect("schema json");
    assert!(schema["properties"]["tables"].is_object());
}
