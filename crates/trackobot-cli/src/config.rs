use std::io::Read;

use anyhow::{Context, Result, bail};

use crate::credentials::Credentials;

const USERNAME_VAR: &str = "TRACKOBOT_USERNAME";
const PASSWORD_VAR: &str = "TRACKOBOT_PASSWORD";

/// Resolve credentials: CLI flags take precedence over env vars.
/// Pass `Some("-")` as the password to read it from stdin.
pub fn resolve_credentials(username: Option<&str>, password: Option<&str>) -> Result<Credentials> {
    resolve_credentials_with(username, password, |k| std::env::var(k), std::io::stdin())
}

fn resolve_credentials_with(
    cli_username: Option<&str>,
    cli_password: Option<&str>,
    env_var: impl Fn(&str) -> Result<String, std::env::VarError>,
    stdin: impl Read,
) -> Result<Credentials> {
    let username = match cli_username {
        Some(name) => {
            let trimmed = name.trim();
            anyhow::ensure!(!trimmed.is_empty(), "--username value must not be empty");
            trimmed.to_string()
        }
        None => from_env(&env_var, USERNAME_VAR)?,
    };
    let password = match cli_password {
        Some("-") => read_password_from_reader(stdin)?,
        Some(password) => {
            anyhow::ensure!(!password.is_empty(), "--password value must not be empty");
            password.to_string()
        }
        None => from_env(&env_var, PASSWORD_VAR)?,
    };
    Ok(Credentials::new(username, password)?)
}

fn from_env(
    env_var: &impl Fn(&str) -> Result<String, std::env::VarError>,
    key: &str,
) -> Result<String> {
    if let Ok(val) = env_var(key)
        && !val.is_empty()
    {
        return Ok(val);
    }
    bail!(
        "No Track-o-Bot credentials found. Pass --username and --password or set {USERNAME_VAR} and {PASSWORD_VAR}"
    )
}

fn read_password_from_reader(mut reader: impl Read) -> Result<String> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .context("failed to read password from stdin")?;
    let trimmed = buf.trim().to_string();
    anyhow::ensure!(!trimmed.is_empty(), "stdin was empty; expected a password");
    Ok(trimmed)
}
