// tests/config_load.rs

//! Config loading and validation against real files.

use cmdrelay::config::{load_and_validate, load_from_path};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_config(contents: &str) -> Result<(tempfile::TempDir, std::path::PathBuf), std::io::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Commands.toml");
    std::fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn valid_config_loads_and_validates() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [default]
        paths = ["/usr/local/bin"]

        [command.submit]
        url = "http://localhost:8080/api/submit"
        method = "post"
        content-type = "json"
        data = { origin = "gateway" }

        [command.notify]
        bin = "notify-send"
        args = ["%TITLE%", "%MESSAGE%"]
        "#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.command.len(), 2);
    assert_eq!(cfg.default.paths, vec!["/usr/local/bin"]);
    assert_eq!(
        cfg.command["submit"].data.get("origin").map(String::as_str),
        Some("gateway")
    );
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    let result = load_from_path("/definitely/not/here.toml");
    assert!(result.is_err());
}

#[test]
fn config_without_commands_fails_validation() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [default]
        paths = []
        "#,
    )?;
    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[test]
fn command_mixing_url_and_bin_fails_validation() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [command.mixed]
        url = "http://localhost/api"
        bin = "curl"
        "#,
    )?;
    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[test]
fn invalid_url_fails_validation() -> TestResult {
    let (_dir, path) = write_config(
        r#"
        [command.broken]
        url = "this is not a url"
        "#,
    )?;
    assert!(load_and_validate(&path).is_err());
    Ok(())
}
