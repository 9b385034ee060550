use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use neatcctv_core::auth::{CredentialStore, DEMO_PASSWORD, DEMO_USERNAME};
use neatcctv_core::models::{Device, StreamAddress};
use neatcctv_core::{Config, SessionManager};

use crate::Command;

/// Environment variables consulted before prompting
const USERNAME_ENV: &str = "NEATCCTV_USERNAME";
const PASSWORD_ENV: &str = "NEATCCTV_PASSWORD";

pub async fn run(command: Command) -> Result<()> {
    let mut config = Config::load()?;
    let store = config.open_store()?;
    let api = config.api_client(store.clone())?;
    let mut session = SessionManager::new(api, store);
    session.subscribe(|event| debug!(state = ?event.state, "Session state changed"));

    match command {
        Command::Login {
            username,
            password,
            remember,
        } => login(&mut session, &mut config, username, password, remember).await,
        Command::Demo => {
            session.login(DEMO_USERNAME, DEMO_PASSWORD).await?;
            println!("Demo session started");
            Ok(())
        }
        Command::Logout { forget } => {
            session.logout().await;
            if forget {
                if let Some(ref username) = config.last_username {
                    CredentialStore::forget(username)?;
                }
            }
            println!("Logged out");
            Ok(())
        }
        Command::Status => {
            let logged_in = session.initialize().await;
            match session.current_user() {
                Some(user) if logged_in => {
                    let mode = if user.demo { " (demo)" } else { "" };
                    println!("Logged in as {}{} since {}", user.username, mode, user.login_time);
                }
                _ => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Vehicles { fallback } => {
            require_session(&mut session).await?;
            let devices = if fallback {
                session.device_list().await?
            } else {
                session.vehicles().await?
            };
            print_devices(&devices);
            Ok(())
        }
        Command::Online { device } => {
            require_session(&mut session).await?;
            print_json(&session.device_online_status(&device).await?)
        }
        Command::Gps { device } => {
            require_session(&mut session).await?;
            print_json(&session.device_gps_status(&device).await?)
        }
        Command::Track { device, start, end } => {
            require_session(&mut session).await?;
            print_json(&session.device_track(&device, &start, &end).await?)
        }
        Command::Position { device } => {
            require_session(&mut session).await?;
            print_json(&session.latest_position(&device).await?)
        }
        Command::Stream {
            device,
            channel,
            rtsp,
        } => {
            require_session(&mut session).await?;
            let address = if rtsp {
                session.rtsp_live_address(&device, channel).await?
            } else {
                session.hls_live_address(&device, channel).await?
            };
            print_stream(&address);
            Ok(())
        }
    }
}

async fn login(
    session: &mut SessionManager,
    config: &mut Config,
    username: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let env_username = std::env::var(USERNAME_ENV).ok();
    let resolved = resolve_username(username, env_username, config.last_username.as_deref());
    let username = match resolved {
        Some(username) => username,
        None => prompt("Username: ")?,
    };

    let password = match password.or_else(|| std::env::var(PASSWORD_ENV).ok()) {
        Some(password) => password,
        None => match CredentialStore::recall(&username) {
            Ok(Some(password)) => password,
            Ok(None) => rpassword::prompt_password("Password: ")?,
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                rpassword::prompt_password("Password: ")?
            }
        },
    };

    let user = session
        .login(&username, &password)
        .await
        .context("Login failed")?;

    if remember && !user.demo {
        CredentialStore::remember(&username, &password)?;
    }
    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {}", user.username);
    Ok(())
}

/// Username from the flag, then the environment, then the last one used.
/// Blank values are skipped.
fn resolve_username(
    flag: Option<String>,
    env: Option<String>,
    configured: Option<&str>,
) -> Option<String> {
    flag.into_iter()
        .chain(env)
        .chain(configured.map(str::to_string))
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
}

async fn require_session(session: &mut SessionManager) -> Result<()> {
    if !session.initialize().await {
        bail!("Not logged in. Run `neatcctv login` first.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("Username required");
    }
    Ok(value)
}

fn print_devices(devices: &[Device]) {
    if devices.is_empty() {
        println!("No vehicles");
        return;
    }
    println!("{:<20} {:<24} STATUS", "DEVICE", "NAME");
    for device in devices {
        println!(
            "{:<20} {:<24} {}",
            device.id.as_deref().unwrap_or("-"),
            device.display_name(),
            device.status.as_str()
        );
    }
}

fn print_stream(address: &StreamAddress) {
    println!("{} {}", address.protocol, address.stream_url);
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
