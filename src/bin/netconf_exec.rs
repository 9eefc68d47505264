//! Send one NETCONF RPC payload to a device and print the reply
//!
//! Usage:
//!   netconf-exec --host 10.0.0.1 --username admin --password admin get-config.xml
//!   netconf-exec --config session.json - < edit-config.xml
//!   netconf-exec --check edit-config.xml
//!
//! The exit code is 0 for `<ok/>` and data replies, 1 for replies carrying
//! `<rpc-error>` and 2 for client errors.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rust_ydk::{
    Connector, NetconfClient, ReplyKind, RpcReply, RpcRequest, SessionParams, SshConnector,
    TcpConnector, YdkError,
};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "netconf-exec")]
#[command(about = "Execute a NETCONF RPC payload against a device")]
struct Args {
    /// Session parameters as JSON (username, password, host, port)
    #[arg(short, long, conflicts_with_all = ["host", "username", "password"])]
    config: Option<PathBuf>,

    /// Device address
    #[arg(long, required_unless_present_any = ["config", "check"])]
    host: Option<String>,

    /// Device port
    #[arg(long, default_value_t = rust_ydk::config::DEFAULT_NETCONF_PORT)]
    port: u16,

    #[arg(short, long, default_value = "admin")]
    username: String,

    #[arg(short, long, default_value = "")]
    password: String,

    /// Connect and I/O timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Only validate the payload, do not connect
    #[arg(long)]
    check: bool,

    /// Speak NETCONF over bare TCP instead of SSH
    #[arg(long)]
    tcp: bool,

    /// Print a classified summary instead of the raw reply
    #[arg(short, long)]
    summary: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Payload file, `-` for stdin
    #[arg(default_value = "-")]
    payload: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::WARN };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, YdkError> {
    let payload = read_payload(&args.payload)?;

    if args.check {
        let request = RpcRequest::parse(&payload).map_err(|e| match &e {
            YdkError::BuildPayload { reason } => YdkError::InvalidArgument(reason.clone()),
            _ => e,
        })?;
        println!("valid <{}> payload", request.operation());
        return Ok(ExitCode::SUCCESS);
    }

    let params = session_params(args)?;
    debug!(?params, "session parameters");
    let timeout = Duration::from_secs(args.timeout);
    let connector: Arc<dyn Connector> = if args.tcp {
        Arc::new(TcpConnector::with_timeout(timeout))
    } else {
        Arc::new(SshConnector::with_timeout(timeout))
    };
    let mut client = NetconfClient::with_connector(params, connector);
    client.connect()?;

    let reply = client.execute_payload(&payload)?;
    client.close()?;

    let classified = RpcReply::parse(&reply)?;
    if args.summary {
        print_summary(&classified);
    } else {
        println!("{}", reply);
    }

    Ok(match classified.kind {
        ReplyKind::Errors(_) => ExitCode::from(1),
        _ => ExitCode::SUCCESS,
    })
}

fn read_payload(source: &str) -> Result<String, YdkError> {
    if source == "-" {
        let mut payload = String::new();
        io::stdin().read_to_string(&mut payload)?;
        Ok(payload)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

fn session_params(args: &Args) -> Result<SessionParams, YdkError> {
    if let Some(path) = &args.config {
        return SessionParams::from_file(path);
    }
    let host = args
        .host
        .clone()
        .ok_or_else(|| YdkError::InvalidArgument("--host or --config is required".into()))?;
    Ok(SessionParams::new(
        args.username.clone(),
        args.password.clone(),
        host,
        args.port,
    ))
}

fn print_summary(reply: &RpcReply) {
    let id = reply.message_id.as_deref().unwrap_or("-");
    match &reply.kind {
        ReplyKind::Ok => println!("[{}] ok", id),
        ReplyKind::Data(data) => {
            println!("[{}] data ({} bytes)", id, data.len());
            println!("{}", data.trim());
        }
        ReplyKind::Errors(errors) => {
            println!("[{}] {} rpc-error(s)", id, errors.len());
            for error in errors {
                println!("  {}", error);
                if let Some(path) = &error.error_path {
                    println!("    at {}", path);
                }
            }
        }
    }
}
