use anyhow::Result;
use colored::Colorize;
use deckhand_core::mask_token;

use crate::auth::{self, StoredCredentials};
use crate::output::{print_error, print_success};

pub fn login(server: &str, token: &str, profile: &str) -> Result<()> {
    if token.trim().is_empty() {
        anyhow::bail!("Refusing to store an empty token");
    }
    let creds = StoredCredentials {
        server: server.to_string(),
        token: token.to_string(),
    };
    auth::save_credentials(profile, &creds)?;
    print_success(&format!(
        "Saved API token for {} (profile: {})",
        server.cyan(),
        profile.cyan()
    ));
    Ok(())
}

pub fn logout(profile: &str) -> Result<()> {
    if auth::remove_credentials(profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

pub fn whoami(profile: &str) -> Result<()> {
    match auth::load_credentials(profile)? {
        Some(creds) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Server".cyan(), creds.server.cyan());
            println!("{}: Bearer (token: {})", "Auth".cyan(), mask_token(&creds.token));
        }
        None => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
    }
    Ok(())
}
