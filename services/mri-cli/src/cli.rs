//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mri-client")]
#[command(version)]
#[command(about = "Client for the MRI tumor-classification API")]
pub struct Cli {
    /// Path to the TOML config file (default: mri-client.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print raw JSON instead of the formatted summary
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account (a confirmation code is emailed)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long, env = "MRI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        gender: String,
        /// Date of birth, YYYY-MM-DD (sent as a UTC timestamp)
        #[arg(long, value_name = "DATE")]
        birth_date: String,
    },

    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long, env = "MRI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Confirm an email address with the emailed code
    ConfirmEmail {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },

    /// Send the confirmation code again
    ResendConfirmation {
        #[arg(long)]
        email: String,
    },

    /// Request a password reset code
    ForgotPassword {
        #[arg(long)]
        email: String,
    },

    /// Set a new password using a reset code
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
        /// Prompted for when omitted
        #[arg(long, env = "MRI_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },

    /// Exchange the stored refresh token for a new access token
    Refresh,

    /// Revoke the session and clear stored credentials
    Logout,

    /// Show whether a session is stored and when it expires
    Status,

    /// Show the current user's profile
    Whoami,

    /// Update profile fields
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        /// Date of birth, YYYY-MM-DD
        #[arg(long, value_name = "DATE")]
        birth_date: Option<String>,
    },

    /// Permanently delete the account
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Upload an MRI image for classification
    Upload {
        /// Image file (jpg, png, ...)
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Show one medical record
    Record {
        #[arg(value_name = "RECORD_ID")]
        id: String,
    },

    /// List the current user's medical records
    Records,
}
