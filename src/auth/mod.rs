//! Authentication management for Netatmo credentials
//!
//! This module provides functions for managing the OAuth2 application
//! credentials, including interactive setup, verification, and secure storage
//! in .env files.
//!
//! # Examples
//!
//! ```rust,no_run
//! use netatmo_fetcher::app::NetatmoClient;
//! use netatmo_fetcher::auth::{check_credentials, setup_credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NetatmoClient::new()?;
//! if !check_credentials() {
//!     println!("Setting up credentials...");
//!     setup_credentials(&client, false).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    check_credentials, clear_credentials, get_auth_status, prompt_credentials, save_credentials,
    save_credentials_to, setup_credentials, show_auth_status, verify_credentials, AuthStatus,
    Credentials,
};
