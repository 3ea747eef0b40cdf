//! Subcommand handlers

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use common::Secret;
use mri_api::{
    ApiClient, ApiError, ConfirmEmailRequest, EmailRequest, GENERIC_ERROR_MESSAGE, LoginRequest,
    MedicalRecord, RegisterRequest, ResetPasswordRequest, UpdateUserRequest,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::Command;

/// Turn an API failure into a message fit for the terminal.
fn failed(action: &'static str) -> impl FnOnce(ApiError) -> anyhow::Error {
    move |err| {
        debug!(error = ?err, action, "command failed");
        anyhow::anyhow!("{action}: {}", err.user_message(GENERIC_ERROR_MESSAGE))
    }
}

/// Use the flag value, or prompt without echo.
fn password(value: Option<String>, prompt: &str) -> Result<Secret<String>> {
    let password = match value {
        Some(p) => Secret::new(p),
        None => Secret::new(rpassword::prompt_password(prompt).context("reading password")?),
    };
    if password.is_blank() {
        bail!("password must not be empty");
    }
    Ok(password)
}

pub async fn run(api: &ApiClient, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Register {
            name,
            email,
            password: pw,
            gender,
            birth_date,
        } => {
            // Checked before the password prompt
            let birth_date =
                mri_api::iso_birth_date(&birth_date).map_err(failed("Registration failed"))?;
            let request = RegisterRequest::new(
                name,
                email,
                password(pw, "Password: ")?,
                gender,
                &birth_date,
            )
            .map_err(failed("Registration failed"))?;
            let reply = api
                .auth()
                .register(&request)
                .await
                .map_err(failed("Registration failed"))?;
            print_reply(&reply, "Registered. Check your email for the confirmation code.", json)
        }

        Command::Login {
            email,
            password: pw,
        } => {
            let request = LoginRequest {
                email,
                password: password(pw, "Password: ")?,
            };
            let login = api
                .auth()
                .login(&request)
                .await
                .map_err(failed("Login failed"))?;
            if json {
                print_json(&Value::Object(login.user))
            } else {
                let who = login
                    .user
                    .get("name")
                    .or_else(|| login.user.get("email"))
                    .and_then(Value::as_str)
                    .unwrap_or(&request.email);
                println!("Logged in as {who}");
                Ok(())
            }
        }

        Command::ConfirmEmail { email, code } => {
            let reply = api
                .auth()
                .confirm_email(&ConfirmEmailRequest {
                    user_email: email,
                    code,
                })
                .await
                .map_err(failed("Email confirmation failed"))?;
            print_reply(&reply, "Email confirmed. You can log in now.", json)
        }

        Command::ResendConfirmation { email } => {
            let reply = api
                .auth()
                .resend_confirmation(&EmailRequest { email })
                .await
                .map_err(failed("Could not resend the confirmation code"))?;
            print_reply(&reply, "Confirmation code sent.", json)
        }

        Command::ForgotPassword { email } => {
            let reply = api
                .auth()
                .forget_password(&EmailRequest { email })
                .await
                .map_err(failed("Password reset request failed"))?;
            print_reply(&reply, "Reset code sent. Check your email.", json)
        }

        Command::ResetPassword {
            email,
            code,
            new_password,
        } => {
            let request = ResetPasswordRequest {
                email,
                code,
                new_password: password(new_password, "New password: ")?,
            };
            let reply = api
                .auth()
                .reset_password(&request)
                .await
                .map_err(failed("Password reset failed"))?;
            print_reply(&reply, "Password changed. You can log in now.", json)
        }

        Command::Refresh => {
            api.auth()
                .refresh()
                .await
                .map_err(failed("Session refresh failed"))?;
            println!("Session refreshed.");
            Ok(())
        }

        Command::Logout => {
            api.auth().logout().await.map_err(failed("Logout failed"))?;
            println!("Logged out.");
            Ok(())
        }

        Command::Status => status(api, json).await,

        Command::Whoami => {
            let user = api
                .users()
                .get_user_info()
                .await
                .map_err(failed("Could not load your profile"))?;
            if json {
                print_json(&user)
            } else {
                print_profile(&user);
                Ok(())
            }
        }

        Command::UpdateProfile {
            name,
            gender,
            birth_date,
        } => {
            let update = UpdateUserRequest {
                name,
                gender,
                birth_date,
            };
            if update.is_empty() {
                bail!("nothing to update: pass --name, --gender or --birth-date");
            }
            let user = api
                .users()
                .update_user_info(&update)
                .await
                .map_err(failed("Profile update failed"))?;
            if json {
                print_json(&user)
            } else {
                println!("Profile updated.");
                print_profile(&user);
                Ok(())
            }
        }

        Command::DeleteAccount { yes } => {
            if !yes {
                bail!("account deletion is permanent; pass --yes to confirm");
            }
            api.users()
                .delete_user()
                .await
                .map_err(failed("Account deletion failed"))?;
            println!("Account deleted.");
            Ok(())
        }

        Command::Upload { path } => {
            let record = api
                .records()
                .upload_file(&path)
                .await
                .map_err(failed("Upload failed"))?;
            if json {
                print_json(&record)
            } else {
                print_record(&record);
                Ok(())
            }
        }

        Command::Record { id } => {
            let record = api
                .records()
                .get_by_id(&id)
                .await
                .map_err(failed("Could not load the record"))?;
            if json {
                print_json(&record)
            } else {
                print_record(&record);
                Ok(())
            }
        }

        Command::Records => {
            let records = api
                .records()
                .current_user_records()
                .await
                .map_err(failed("Could not load your records"))?;
            if json {
                return print_json(&records);
            }
            if records.is_empty() {
                println!("No medical records yet.");
            }
            for record in &records {
                println!(
                    "{:<8} {:<20} {}",
                    record
                        .id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "-".into()),
                    record.tumor_label(),
                    record.image_url.as_deref().unwrap_or("")
                );
            }
            Ok(())
        }
    }
}

async fn status(api: &ApiClient, json: bool) -> Result<()> {
    let store = api.store();
    let token = store.access_token().await;
    let has_refresh = store.refresh_token().await.is_some();
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let remaining = token
        .as_deref()
        .and_then(|t| mri_auth::jwt::seconds_remaining(t, now));

    if json {
        return print_json(&serde_json::json!({
            "logged_in": token.is_some(),
            "refresh_token": has_refresh,
            "expires_in_secs": remaining,
            "session_file": store.path().display().to_string(),
            "base_url": api.base_url(),
        }));
    }

    match (&token, remaining) {
        (None, _) => println!("Not logged in."),
        (Some(_), Some(secs)) if secs > 0 => {
            println!("Logged in. Access token expires in {}.", human_duration(secs))
        }
        (Some(_), Some(_)) => {
            println!("Logged in. Access token expired; it will be refreshed on the next call.")
        }
        (Some(_), None) => println!("Logged in."),
    }
    if token.is_some() && !has_refresh {
        println!("No refresh token stored; you will need to log in again when it expires.");
    }
    println!("Session file: {}", store.path().display());
    Ok(())
}

fn human_duration(secs: i64) -> String {
    match secs {
        s if s >= 3600 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s if s >= 60 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{s}s"),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("formatting response")?;
    println!("{out}");
    Ok(())
}

/// Print the server's message when it sent one, `default` otherwise.
fn print_reply(reply: &Value, default: &str, json: bool) -> Result<()> {
    if json {
        return print_json(reply);
    }
    let message = match reply {
        Value::String(s) if !s.trim().is_empty() => s.as_str(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(default),
        _ => default,
    };
    println!("{message}");
    Ok(())
}

fn print_profile(user: &Value) {
    for (label, key) in [
        ("Name", "name"),
        ("Email", "email"),
        ("Gender", "gender"),
        ("Birth date", "birthDate"),
    ] {
        if let Some(value) = user.get(key).and_then(Value::as_str) {
            println!("{label:<11} {value}");
        }
    }
}

fn print_record(record: &MedicalRecord) {
    if let Some(id) = &record.id {
        println!("Record     {id}");
    }
    println!("Result     {}", record.tumor_label());
    if let Some(has_tumor) = record.has_tumor {
        println!("Tumor      {}", if has_tumor { "yes" } else { "no" });
    }
    if let Some(url) = &record.image_url {
        println!("Image      {url}");
    }
}
