//! Leakosint setup wizard.
//!
//! Asks for the Telegram application credentials and account phone number in
//! the terminal and writes `config.toml` to the project root. Afterwards run
//! `leakosint --login` once to authorize the Telegram session.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    api_id: &'a str,
    api_hash: &'a str,
    phone_number: &'a str,
    bot_username: &'a str,
    session_file: &'a str,
    port: u16,
    country_code: &'a str,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let api_id = p.api_id;
    let api_hash = p.api_hash;
    let phone_number = p.phone_number;
    let bot_username = p.bot_username.trim_start_matches('@');
    let session_file = p.session_file;
    let port = p.port;
    let country_code = p.country_code.trim_start_matches('+');

    format!(
        r#"[telegram]
api_id = {api_id}
api_hash = "{api_hash}"
phone_number = "{phone_number}"
bot_username = "{bot_username}"
session_file = "{session_file}"

[server]
host = "0.0.0.0"
port = {port}
# Echo the bot's unparsed reply in search responses (debugging only)
include_raw_response = false

[gateway]
poll_interval_ms = 500
reply_window_secs = 5
round_trip_timeout_secs = 30

[search]
country_code = "{country_code}"
"#
    )
}

fn check_api_id(raw: &str) -> Result<()> {
    let id: i32 = raw
        .parse()
        .with_context(|| format!("API ID must be a number, got '{raw}'"))?;
    if id <= 0 {
        anyhow::bail!("API ID must be positive");
    }
    Ok(())
}

fn run_cli(project_root: &Path) -> Result<()> {
    println!("=== Leakosint Setup ===\n");
    println!("Get an API ID and hash at https://my.telegram.org/apps\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let or_default = |s: String, default: &str| {
        if s.is_empty() {
            default.to_owned()
        } else {
            s
        }
    };

    let api_id = read_line("Telegram API ID: ")?;
    check_api_id(&api_id)?;
    let api_hash = read_line("Telegram API hash: ")?;
    if api_hash.is_empty() {
        anyhow::bail!("API hash is required");
    }
    let phone_number = read_line("Account phone number (e.g. +911234567890): ")?;
    if phone_number.is_empty() {
        anyhow::bail!("Phone number is required");
    }
    let bot_username = or_default(read_line("Bot username [ZaverinBot]: ")?, "ZaverinBot");
    let session_file = or_default(
        read_line("Session file [leakosint.session]: ")?,
        "leakosint.session",
    );
    let port: u16 = or_default(read_line("HTTP port [5000]: ")?, "5000")
        .parse()
        .context("Port must be a number")?;
    let country_code = or_default(read_line("Query country code [91]: ")?, "91");

    let config = format_config(&ConfigParams {
        api_id: &api_id,
        api_hash: &api_hash,
        phone_number: &phone_number,
        bot_username: &bot_username,
        session_file: &session_file,
        port,
        country_code: &country_code,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Authorize the session with:  cargo run -- --login");
    println!("   Then start the API with:     cargo run");
    Ok(())
}

fn main() -> Result<()> {
    // Resolve project root: prefer LEAKOSINT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("LEAKOSINT_ROOT").unwrap_or_else(|_| ".".to_string()));
    run_cli(&project_root)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(api_id: &str, bot_username: &str, port: u16, country_code: &str) -> String {
        format_config(&ConfigParams {
            api_id,
            api_hash: "abcdef0123456789",
            phone_number: "+911234567890",
            bot_username,
            session_file: "leakosint.session",
            port,
            country_code,
        })
    }

    #[test]
    fn test_telegram_section_present() {
        let out = cfg("12345", "ZaverinBot", 5000, "91");
        assert!(out.contains("[telegram]"));
        assert!(out.contains("api_id = 12345"));
        assert!(out.contains(r#"api_hash = "abcdef0123456789""#));
        assert!(out.contains(r#"phone_number = "+911234567890""#));
        assert!(out.contains(r#"session_file = "leakosint.session""#));
    }

    #[test]
    fn test_bot_username_at_stripped() {
        let out = cfg("1", "@SomeBot", 5000, "91");
        assert!(out.contains(r#"bot_username = "SomeBot""#));
    }

    #[test]
    fn test_server_and_search_sections() {
        let out = cfg("1", "ZaverinBot", 8080, "+44");
        assert!(out.contains("[server]"));
        assert!(out.contains("port = 8080"));
        assert!(out.contains("include_raw_response = false"));
        assert!(out.contains("[search]"));
        assert!(out.contains(r#"country_code = "44""#));
    }

    #[test]
    fn test_output_is_valid_toml() {
        let out = cfg("12345", "ZaverinBot", 5000, "91");
        let parsed: toml::Value = toml::from_str(&out).unwrap();
        assert_eq!(parsed["telegram"]["api_id"].as_integer(), Some(12345));
        assert_eq!(parsed["gateway"]["reply_window_secs"].as_integer(), Some(5));
    }

    #[test]
    fn test_api_id_checked() {
        assert!(check_api_id("12345").is_ok());
        assert!(check_api_id("YOUR_API_ID").is_err());
        assert!(check_api_id("-3").is_err());
    }
}
