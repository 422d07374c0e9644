use tracing_jsonmap::template::{render, resolve_from_env_recursive, FormatStyle, VarError};

#[cfg(test)]
mod directory {
    #[derive(Debug, thiserror::Error)]
    pub enum LookupError {
        #[error("unknown user `{0}`")]
        UnknownUser(String),
    }

    pub fn display_name(user: &str) -> Result<String, LookupError> {
        match user {
            "jdoe" => Ok("John Doe".to_owned()),
            other => Err(LookupError::UnknownUser(other.to_owned())),
        }
    }
}

#[test]
fn test_resolver_error_is_returned() {
    let rendered = render::<directory::LookupError, _>(
        "Hello %(user)s",
        FormatStyle::Percent,
        |key| match key {
            "user" => directory::display_name("nobody").map(Some),
            _ => Ok(None),
        },
    );
    assert!(matches!(
        rendered,
        Err(directory::LookupError::UnknownUser(user)) if user == "nobody"
    ));
}

#[test]
fn test_resolver_value_is_used() -> Result<(), directory::LookupError> {
    let rendered = render::<directory::LookupError, _>(
        "Hello ${user}, bye $user. Not replaced : ${other}",
        FormatStyle::Dollar,
        |key| match key {
            "user" => directory::display_name("jdoe").map(Some),
            _ => Ok(None),
        },
    )?;
    assert_eq!(rendered, "Hello John Doe, bye John Doe. Not replaced : ${other}");
    Ok(())
}

#[test]
fn test_resolve_env() -> Result<(), VarError> {
    std::env::set_var("TRACING_JSONMAP_TEST_GREETING", "Hello ${env:TRACING_JSONMAP_TEST_NAME}");
    std::env::set_var("TRACING_JSONMAP_TEST_NAME", "John");

    let resolved =
        resolve_from_env_recursive("${env:TRACING_JSONMAP_TEST_GREETING} $HOME $$ ${other:key}", 5)?;
    // only braced env tokens are resolved, anything else is kept as is
    assert_eq!(resolved, "Hello John $HOME $$ ${other:key}");
    Ok(())
}

#[test]
fn test_resolve_env_depth() -> Result<(), VarError> {
    std::env::set_var("TRACING_JSONMAP_TEST_OUTER", "${env:TRACING_JSONMAP_TEST_INNER}");
    std::env::set_var("TRACING_JSONMAP_TEST_INNER", "value");

    let resolved = resolve_from_env_recursive("${env:TRACING_JSONMAP_TEST_OUTER}", 1)?;
    assert_eq!(resolved, "${env:TRACING_JSONMAP_TEST_INNER}");
    Ok(())
}

#[test]
fn test_missing_env_var() {
    let resolved = resolve_from_env_recursive("${env:TRACING_JSONMAP_TEST_NOT_SET}", 5);
    match resolved {
        Err(VarError::NotPresent { key }) => assert_eq!(key, "TRACING_JSONMAP_TEST_NOT_SET"),
        other => panic!("unexpected : {other:?}"),
    }
}

#[test]
fn test_resolve_toml() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("TRACING_JSONMAP_TEST_TZ", "Europe/Bucharest");

    let mut value: toml::Value = toml::from_str(
        r#"
        timezone = "${env:TRACING_JSONMAP_TEST_TZ}"
        strip = true
        [nested]
        zones = ["${env:TRACING_JSONMAP_TEST_TZ}", "UTC"]
        "#,
    )?;
    tracing_jsonmap::template::toml::resolve_from_env_recursive(&mut value, 5)?;

    assert_eq!(value["timezone"].as_str(), Some("Europe/Bucharest"));
    assert_eq!(value["strip"].as_bool(), Some(true));
    assert_eq!(value["nested"]["zones"][0].as_str(), Some("Europe/Bucharest"));
    Ok(())
}
