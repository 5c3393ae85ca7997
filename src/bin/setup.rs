//! homeline setup helper.
//!
//! Prompts for the LINE channel credentials, target group and Firebase
//! endpoint, then writes `config.toml` to the project root (`HOMELINE_ROOT`,
//! default the current directory). Pass `--print` to write to stdout instead.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    channel_secret: &'a str,
    channel_token: &'a str,
    group_id: &'a str,
    firebase_url: &'a str,
    firebase_secret: &'a str,
    bind_addr: &'a str,
    beacon_hwid: &'a str,
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let channel_secret = p.channel_secret;
    let channel_token = p.channel_token;
    let group_id = p.group_id;
    let firebase_url = p.firebase_url.trim_end_matches('/');
    let firebase_secret = p.firebase_secret;
    let bind_addr = p.bind_addr;

    let beacon_section = if p.beacon_hwid.is_empty() {
        "# [beacon]\n# hwid = \"your-beacon-hwid\"\n".to_owned()
    } else {
        format!("[beacon]\nhwid = \"{}\"\n", p.beacon_hwid)
    };

    format!(
        r#"[line]
channel_secret = "{channel_secret}"
channel_token = "{channel_token}"
group_id = "{group_id}"

[firebase]
base_url = "{firebase_url}"
secret = "{firebase_secret}"
path = "linebot/receive"

[server]
bind_addr = "{bind_addr}"

{beacon_section}"#
    )
}

// ── Prompting ──────────────────────────────────────────────────────────────────

fn read_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_owned())
}

fn or_default(s: String, default: &str) -> String {
    if s.is_empty() {
        default.to_owned()
    } else {
        s
    }
}

// ── Entry point ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let print_only = std::env::args().any(|a| a == "--print");

    let project_root =
        PathBuf::from(std::env::var("HOMELINE_ROOT").unwrap_or_else(|_| ".".to_string()));

    eprintln!("=== homeline setup ===\n");

    let channel_secret = read_line("LINE channel secret: ")?;
    let channel_token = read_line("LINE channel access token: ")?;
    let group_id = read_line("LINE group ID to relay into: ")?;
    let firebase_url = read_line("Firebase database URL (https://<db>.firebaseio.com): ")?;
    let firebase_secret = read_line("Firebase database secret (optional): ")?;
    let bind_addr = or_default(read_line("Listen address [0.0.0.0:8080]: ")?, "0.0.0.0:8080");
    let beacon_hwid = read_line("LINE beacon hwid (optional): ")?;

    let config = format_config(&ConfigParams {
        channel_secret: &channel_secret,
        channel_token: &channel_token,
        group_id: &group_id,
        firebase_url: &firebase_url,
        firebase_secret: &firebase_secret,
        bind_addr: &bind_addr,
        beacon_hwid: &beacon_hwid,
    });

    if print_only {
        print!("{config}");
        return Ok(());
    }

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    eprintln!("\n✓  config.toml saved to {}", config_path.display());
    eprintln!("   Run the relay with:  cargo run");
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
