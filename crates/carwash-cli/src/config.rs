use std::path::{Path, PathBuf};

use thiserror::Error;

use carwash_core::{ConfigError, ConfigFile};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("'{path}': {source}")]
    Parse { path: PathBuf, source: ConfigError },
    #[error("'{0}': expected a .toml or .json config file")]
    UnknownFormat(PathBuf),
}

/// Read a config file, choosing the parser by extension.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, LoadError> {
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Format::Toml,
        Some("json") => Format::Json,
        _ => return Err(LoadError::UnknownFormat(path.to_path_buf())),
    };
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents, format).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Toml,
    Json,
}

fn parse_config(contents: &str, format: Format) -> Result<ConfigFile, ConfigError> {
    match format {
        Format::Toml => toml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string())),
        Format::Json => ConfigFile::from_json_str(contents),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_load_the_same_tables() {
        let toml = parse_config(
            r#"
            [tables.users]
            first_name = "firstName"
            bio = "words:3,true"
            "#,
            Format::Toml,
        )
        .expect("toml");
        let json = parse_config(
            r#"{"tables": {"users": {"first_name": "firstName", "bio": "words:3,true"}}}"#,
            Format::Json,
        )
        .expect("json");
        assert_eq!(
            toml.table_names().collect::<Vec<_>>(),
            json.table_names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            load_config_file(Path::new("carwash.yaml")),
            Err(LoadError::UnknownFormat(_))
        ));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let path = std::env::temp_dir().join(format!("carwash_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "tables = 3").expect("write");
        let err = load_config_file(&path).expect_err("invalid");
        assert!(err.to_string().contains(&*path.to_string_lossy()));
        std::fs::remove_file(path).ok();
    }
}
