// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standalone launcher for the relay.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ccr_server::{start_server, stop_server, RelayConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ccr-server",
    version,
    about = "OpenAI-compatible chat-completions relay over the Claude Code CLI"
)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Bind address.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Claude CLI executable name or path.
    #[arg(long, default_value = "claude")]
    claude_bin: String,

    /// Enable request debug logging.
    #[arg(long, env = "DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new(
            "ccr.server=debug,ccr.http=debug,ccr.dispatch=debug,ccr.driver=debug,\
             ccr.driver.stderr=warn,ccr.sessions=debug,ccr.toolcall=debug",
        )
    } else {
        EnvFilter::new("ccr.server=info,ccr.http=info,ccr.sessions=info,ccr.driver.stderr=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.port == 0 {
        bail!("invalid port: 0");
    }

    if which(&args.claude_bin).is_none() {
        bail!(
            "claude CLI not found ({}); install it with `npm install -g @anthropic-ai/claude-code`",
            args.claude_bin
        );
    }

    verify_auth();

    let config = RelayConfig {
        host: args.host,
        port: args.port,
        claude_bin: args.claude_bin,
        ..RelayConfig::default()
    };
    let handle = start_server(config).await.context("start relay server")?;
    info!(target: "ccr.server", addr = %handle.addr(), "ready; press ctrl-c to stop");

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    stop_server().await;

    Ok(())
}

/// Credentials live in the OS keychain and are only exercised when the CLI
/// makes its first call, so there is nothing to check up front. Auth errors
/// surface on the first completion instead.
fn verify_auth() {
    info!(target: "ccr.server", "auth deferred to first CLI call");
}

fn which(bin: &str) -> Option<PathBuf> {
    // An explicit path bypasses the PATH search.
    if bin.contains('/') {
        let candidate = PathBuf::from(bin);
        return candidate.exists().then_some(candidate);
    }
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(bin);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}
