//! Credential management implementation for Netatmo authentication
//!
//! This module handles secure storage, retrieval, and validation of the
//! OAuth2 application credentials. Credentials are stored in .env files with
//! appropriate security permissions.

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::app::client::NetatmoClient;
use crate::constants::{auth, env as env_constants, files};
use crate::errors::{AuthError, AuthResult};

/// OAuth2 application credentials plus the long-lived refresh token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    /// Reads credentials from the process environment
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if any variable is unset or empty
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuthResult<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(AuthError::MissingCredentials)
        };

        Ok(Self {
            client_id: read(env_constants::CLIENT_ID)?,
            client_secret: read(env_constants::CLIENT_SECRET)?,
            refresh_token: read(env_constants::REFRESH_TOKEN)?,
        })
    }

    /// All three values are present
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty() && !self.refresh_token.is_empty()
    }

    /// Basic plausibility checks before anything is written to disk
    pub fn validate(&self) -> AuthResult<()> {
        if !self.is_complete() {
            return Err(AuthError::InvalidCredential {
                reason: "Client id, client secret and refresh token are all required".to_string(),
            });
        }
        if self.client_id.len() < auth::MIN_CLIENT_ID_LENGTH {
            return Err(AuthError::InvalidCredential {
                reason: format!(
                    "Client id should be at least {} characters",
                    auth::MIN_CLIENT_ID_LENGTH
                ),
            });
        }
        let values = [&self.client_id, &self.client_secret, &self.refresh_token];
        if values.iter().any(|v| v.chars().any(char::is_whitespace)) {
            return Err(AuthError::InvalidCredential {
                reason: "Credentials cannot contain whitespace".to_string(),
            });
        }
        Ok(())
    }

    fn env_pairs(&self) -> [(&'static str, &str); 3] {
        [
            (env_constants::CLIENT_ID, self.client_id.as_str()),
            (env_constants::CLIENT_SECRET, self.client_secret.as_str()),
            (env_constants::REFRESH_TOKEN, self.refresh_token.as_str()),
        ]
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    pub client_id_set: bool,
    pub client_secret_set: bool,
    pub refresh_token_set: bool,
    /// Whether .env file exists in current directory
    pub dotenv_file_exists: bool,
    /// Whether credentials have been verified (None = not tested)
    pub credentials_valid: Option<bool>,
}

impl AuthStatus {
    /// Check if all credentials are available in environment
    pub fn has_credentials(&self) -> bool {
        self.client_id_set && self.client_secret_set && self.refresh_token_set
    }

    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.has_credentials(), self.credentials_valid) {
            (false, _) => "Missing credentials - run 'auth setup' to configure".to_string(),
            (true, None) => "Credentials configured but not verified".to_string(),
            (true, Some(true)) => "Credentials configured and verified".to_string(),
            (true, Some(false)) => "Credentials configured but invalid".to_string(),
        }
    }
}

fn env_is_set(name: &str) -> bool {
    env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    AuthStatus {
        client_id_set: env_is_set(env_constants::CLIENT_ID),
        client_secret_set: env_is_set(env_constants::CLIENT_SECRET),
        refresh_token_set: env_is_set(env_constants::REFRESH_TOKEN),
        dotenv_file_exists: Path::new(files::DOTENV_FILE).exists(),
        credentials_valid: None,
    }
}

/// Check if credentials exist in environment variables
pub fn check_credentials() -> bool {
    env_constants::ALL.iter().all(|name| env_is_set(name))
}

/// Prompt user for credentials interactively
pub fn prompt_credentials() -> AuthResult<Credentials> {
    print!("Netatmo client id: ");
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let mut client_id = String::new();
    io::stdin()
        .read_line(&mut client_id)
        .map_err(AuthError::CredentialStorage)?;

    let client_secret = rpassword::prompt_password("Netatmo client secret: ")
        .map_err(AuthError::CredentialStorage)?;
    let refresh_token = rpassword::prompt_password("Netatmo refresh token: ")
        .map_err(AuthError::CredentialStorage)?;

    let credentials = Credentials {
        client_id: client_id.trim().to_string(),
        client_secret: client_secret.trim().to_string(),
        refresh_token: refresh_token.trim().to_string(),
    };
    credentials.validate()?;

    Ok(credentials)
}

/// Save credentials to the .env file in the working directory and export
/// them to the current process
pub fn save_credentials(credentials: &Credentials) -> AuthResult<()> {
    save_credentials_to(Path::new(files::DOTENV_FILE), credentials)?;

    // Later lookups in this process must see the new values
    for (name, value) in credentials.env_pairs() {
        env::set_var(name, value);
    }

    println!("Credentials saved to {}", files::DOTENV_FILE);

    #[cfg(unix)]
    println!("File permissions set to owner-only (600)");

    #[cfg(not(unix))]
    println!(
        "Warning: File permissions not set (non-Unix system). Please ensure .env file is protected."
    );

    Ok(())
}

/// Writes credentials into an env file, replacing earlier values and keeping
/// unrelated lines
pub fn save_credentials_to(env_path: &Path, credentials: &Credentials) -> AuthResult<()> {
    let mut lines = Vec::new();
    let mut written = [false; 3];
    let pairs = credentials.env_pairs();

    for line in read_env_lines(env_path)? {
        match pairs
            .iter()
            .position(|(name, _)| line.trim().starts_with(&format!("{}=", name)))
        {
            Some(index) => {
                lines.push(format!("{}={}", pairs[index].0, pairs[index].1));
                written[index] = true;
            }
            None => lines.push(line),
        }
    }

    for (index, (name, value)) in pairs.iter().enumerate() {
        if !written[index] {
            lines.push(format!("{}={}", name, value));
        }
    }

    write_env_lines(env_path, &lines)
}

/// Removes stored credentials from the .env file and the current process
pub fn clear_credentials() -> AuthResult<()> {
    let removed = clear_credentials_in(Path::new(files::DOTENV_FILE))?;

    for name in env_constants::ALL {
        env::remove_var(name);
    }

    if removed > 0 {
        println!("Removed {} credential entries from {}", removed, files::DOTENV_FILE);
    } else {
        println!("No stored credentials found");
    }
    Ok(())
}

/// Drops credential lines from an env file; returns how many were removed
pub fn clear_credentials_in(env_path: &Path) -> AuthResult<usize> {
    if !env_path.exists() {
        return Ok(0);
    }

    let all_lines = read_env_lines(env_path)?;
    let before = all_lines.len();
    let kept: Vec<String> = all_lines
        .into_iter()
        .filter(|line| {
            !env_constants::ALL
                .iter()
                .any(|name| line.trim().starts_with(&format!("{}=", name)))
        })
        .collect();
    let removed = before - kept.len();

    if kept.iter().all(|line| line.trim().is_empty()) {
        fs::remove_file(env_path)?;
    } else {
        write_env_lines(env_path, &kept)?;
    }
    Ok(removed)
}

fn read_env_lines(env_path: &Path) -> AuthResult<Vec<String>> {
    if !env_path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(env_path)?);
    Ok(reader.lines().collect::<io::Result<Vec<_>>>()?)
}

fn write_env_lines(env_path: &Path, lines: &[String]) -> AuthResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(env_path)?;

    for line in lines {
        writeln!(file, "{}", line)?;
    }

    // Set restrictive permissions (Unix-like systems only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(auth::ENV_FILE_PERMISSIONS);
        file.set_permissions(perms)?;
    }

    Ok(())
}

/// Verify credentials by requesting an access token
///
/// Returns `Ok(false)` when the token endpoint refuses the grant.
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` if the client has no credentials
pub async fn verify_credentials(client: &NetatmoClient) -> AuthResult<bool> {
    println!("Verifying credentials with Netatmo...");

    match client.authorize().await {
        Ok(_) => {
            println!("Credentials verified successfully!");
            Ok(true)
        }
        Err(AuthError::MissingCredentials) => Err(AuthError::MissingCredentials),
        Err(e) => {
            println!("Credential verification failed: {}", e);
            Ok(false)
        }
    }
}

/// Interactive credential setup workflow
pub async fn setup_credentials(client: &NetatmoClient, force: bool) -> AuthResult<()> {
    println!("Netatmo Authentication Setup");
    println!("============================");
    println!();
    println!("You need the client id and secret of a Netatmo developer application");
    println!("and a refresh token with the read_station scope.");
    println!("They will be stored in a .env file in the current directory.");
    println!();

    let status = get_auth_status();
    if status.has_credentials() && !force {
        println!("Warning: Credentials are already configured.");
        print!("Do you want to update them? [y/N]: ");
        io::stdout().flush().map_err(AuthError::CredentialStorage)?;

        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .map_err(AuthError::CredentialStorage)?;

        if !response.trim().to_lowercase().starts_with('y') {
            println!("Setup cancelled.");
            return Ok(());
        }
        println!();
    }

    let credentials = prompt_credentials()?;

    println!();
    println!("Saving credentials...");
    save_credentials(&credentials)?;

    println!();
    let is_valid = verify_credentials(client).await?;

    println!();
    if is_valid {
        println!("Setup complete! You can now fetch station data.");
    } else {
        println!("Setup failed. Please check your credentials and try again.");
        println!("   You can run 'auth setup' again to re-enter your credentials.");
    }

    Ok(())
}

/// Show current authentication status
pub async fn show_auth_status(client: &NetatmoClient) -> AuthResult<()> {
    let mut status = get_auth_status();

    println!("Netatmo Authentication Status");
    println!("=============================");
    println!();

    match env::var(env_constants::CLIENT_ID) {
        Ok(client_id) if !client_id.is_empty() => println!("Client id: {} (set)", client_id),
        _ => println!("Client id: Not set"),
    }

    let set = |flag: bool| if flag { "Set" } else { "Not set" };
    println!("Client secret: {}", set(status.client_secret_set));
    println!("Refresh token: {}", set(status.refresh_token_set));
    println!(
        ".env file: {}",
        if status.dotenv_file_exists {
            "Exists"
        } else {
            "Not found"
        }
    );
    println!();

    if status.has_credentials() {
        println!("Testing credentials...");
        status.credentials_valid = Some(verify_credentials(client).await?);
        println!();
    }

    println!("Status: {}", status.status_message());

    if !status.has_credentials() {
        println!();
        println!("To configure credentials, run: netatmo_fetcher auth setup");
    } else if status.credentials_valid == Some(false) {
        println!();
        println!("To update credentials, run: netatmo_fetcher auth setup --force");
    }

    Ok(())
}
