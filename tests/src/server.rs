//! A throwaway SSH server on `127.0.0.1:0` for login tests.

use std::borrow::Cow;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::MethodSet;
use russh::server::{self, Auth, Config, Response};
use russh_keys::key::KeyPair;
use tokio::net::TcpListener;

pub const USER: &str = "operator";
pub const PASSWORD: &str = "correct horse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStyle {
    Password,
    /// Only `keyboard-interactive`, with a single password prompt.
    KeyboardInteractive,
    /// Completes the handshake, then sits on the password request.
    Stall,
}

/// Starts a server and returns its port. It lives until the test runtime
/// shuts down.
pub async fn spawn(style: LoginStyle) -> anyhow::Result<u16> {
    let methods = match style {
        LoginStyle::KeyboardInteractive => MethodSet::KEYBOARD_INTERACTIVE,
        LoginStyle::Password | LoginStyle::Stall => MethodSet::PASSWORD,
    };
    let host_key =
        KeyPair::generate_ed25519().ok_or_else(|| anyhow::anyhow!("cannot generate host key"))?;
    let config = Arc::new(Config {
        methods,
        keys: vec![host_key],
        auth_rejection_time: Duration::ZERO,
        auth_rejection_time_initial: Some(Duration::ZERO),
        ..Default::default()
    });

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let port = listener.local_addr()?.port();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                if let Ok(session) = server::run_stream(config, socket, Login { style }).await {
                    let _ = session.await;
                }
            });
        }
    });

    Ok(port)
}

struct Login {
    style: LoginStyle,
}

fn verdict(accepted: bool) -> Auth {
    if accepted {
        Auth::Accept
    } else {
        Auth::Reject {
            proceed_with_methods: None,
        }
    }
}

#[async_trait]
impl server::Handler for Login {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if self.style == LoginStyle::Stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(verdict(user == USER && password == PASSWORD))
    }

    async fn auth_keyboard_interactive(
        &mut self,
        user: &str,
        _submethods: &str,
        response: Option<Response<'async_trait>>,
    ) -> Result<Auth, Self::Error> {
        match response {
            None => Ok(Auth::Partial {
                name: Cow::Borrowed(""),
                instructions: Cow::Borrowed(""),
                prompts: Cow::Owned(vec![(Cow::Borrowed("Password: "), false)]),
            }),
            Some(mut answers) => {
                let answer = answers.next();
                Ok(verdict(user == USER && answer == Some(PASSWORD.as_bytes())))
            }
        }
    }
}
