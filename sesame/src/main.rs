mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use sesame_plugin::{keys, SaslPlugin, SessionData, Signal, SignonPlugin};
use sesame_sasl::{NoCallback, Property, ServerSession, Step64};

use config::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(short, long, env = "SESAME_CONFIG", default_value = "sesame.toml")]
    /// Path to the credentials file used by the auth command
    config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported mechanisms
    Mechanisms,
    /// Run one authentication attempt against an in-process server
    Auth {
        /// Mechanism name, e.g. PLAIN or SCRAM-SHA-1
        #[clap(short, long)]
        mechanism: String,
    },
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "sesame=info,sesame_plugin=info,sesame_sasl=info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Command::Mechanisms => {
            let plugin = SaslPlugin::new();
            for name in plugin.mechanisms() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Auth { mechanism } => {
            let config = read_config(args.config_file).context("failed to read the config file")?;
            auth(&mechanism, config)
        }
    }
}

fn auth(mechanism: &str, config: Config) -> Result<()> {
    let mut server = ServerSession::start(mechanism)?;
    if let Some(secret) = &config.secret {
        server.set_property(Property::Password, secret.as_str());
    }
    if let Some(hostname) = &config.hostname {
        server.set_property(Property::Hostname, hostname.as_str());
    }
    if let Some(realm) = &config.realm {
        server.set_property(Property::Realm, realm.as_str());
    }

    let mut data = SessionData::new();
    if let Some(username) = config.username {
        data.set_username(username);
    }
    if let Some(secret) = config.secret {
        data.set_secret(secret);
    }
    if let Some(authzid) = config.authzid {
        data.set(keys::AUTHZID, authzid);
    }
    if let Some(token) = config.anonymous_token {
        data.set(keys::ANONYMOUS_TOKEN, token);
    }
    if let Some(service) = config.service {
        data.set(keys::SERVICE, service);
    }
    if let Some(hostname) = config.hostname {
        data.set(keys::HOSTNAME, hostname);
    }
    if let Some(realm) = config.realm {
        data.set_realm(realm);
    }
    if !config.allowed_realms.is_empty() {
        data.set_allowed_realms(config.allowed_realms);
    }
    if let Some(qop) = config.qop {
        data.set(keys::QOP, qop);
    }
    if let Some(salted) = config.scram_salted_password {
        data.set(keys::SCRAM_SALTED_PASSWORD, salted);
    }

    // Challenge-first mechanisms publish their initial challenge here;
    // the others answer with an empty continuation.
    match server.step64(None, &NoCallback)? {
        Step64::NeedsMore(challenge) => {
            if !challenge.is_empty() {
                data.set(keys::CHALLENGE_BASE64, challenge);
            }
        }
        Step64::Done(_) => bail!("server concluded before the client spoke"),
    }

    let mut plugin = SaslPlugin::new();
    let mut signal = plugin.request_initial(Arc::new(data), None, mechanism);
    loop {
        match signal {
            Signal::Response(resp) => {
                let out = resp.response_base64().unwrap_or("").to_string();
                tracing::info!(response = %out, "got intermediate response");
                let challenge = match server.step64(Some(&out), &NoCallback)? {
                    Step64::NeedsMore(challenge) | Step64::Done(challenge) => challenge,
                };
                tracing::info!(challenge = %challenge, "server answered");
                let mut next = SessionData::new();
                next.set(keys::CHALLENGE_BASE64, challenge);
                signal = plugin.request(&next);
            }
            Signal::ResponseFinal(resp) => {
                let out = resp.response_base64().unwrap_or("");
                if !out.is_empty() {
                    match server.step64(Some(out), &NoCallback)? {
                        Step64::Done(_) => (),
                        Step64::NeedsMore(_) => {
                            bail!("server expected more data after the final response")
                        }
                    }
                }
                println!("Authenticated successfully, got final response:\n{}", out);
                return Ok(());
            }
            Signal::Error(err) => bail!("authentication failed: {}", err),
        }
    }
}
