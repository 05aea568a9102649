//! hdlink host endpoint
//!
//! Runs one end of an hdlink connection over stdin/stdout or a device file.
//! Incoming packets are dispatched by command byte; command 0x01 echoes its
//! payload back. Packets given with `--send` are queued at startup and go
//! out once the link is up.
//!
//! Threads:
//! - main: reads the transport and feeds the link
//! - timer dispatcher: forwards timer expiry to the link
//! - one short-lived sleeper per scheduled timer

mod config;
mod timers;
mod transport;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use hdlink_core::{
    CommandDispatcher, Link, LinkState, Outbox, PacketBuilder, PacketListener, PayloadReader,
    Role, SharedLink,
};
use hdlink_hal::{TimerService, UartRx, UartTx};
use log::{debug, error, info, warn};

use crate::config::HostConfig;
use crate::timers::ThreadTimers;
use crate::transport::{BoxedTx, StreamRx};

/// Replies with the received payload
const CMD_ECHO: u8 = 0x01;

const READ_CHUNK: usize = 256;

type HostLink = SharedLink<CriticalSectionRawMutex, BoxedTx, ThreadTimers, CommandDispatcher<Session>>;

/// Reliable packet link over a serial byte stream
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device file to use instead of stdin/stdout
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Endpoint role, overriding the configuration file
    #[arg(short, long, value_enum)]
    role: Option<RoleArg>,

    /// Packet to send once the link is up, as CMD:HEXPAYLOAD (e.g. 01:cafe)
    #[arg(short, long = "send", value_parser = parse_packet)]
    send: Vec<(u8, Vec<u8>)>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Primary,
    Secondary,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Primary => Role::Primary,
            RoleArg::Secondary => Role::Secondary,
        }
    }
}

/// Handler context
#[derive(Debug, Default)]
struct Session {
    echoed: u32,
}

fn echo(session: &mut Session, reader: &mut PayloadReader<'_>, outbox: &mut Outbox<'_>) {
    session.echoed += 1;
    debug!("Echoing {} bytes", reader.remaining().len());
    if let Err(e) = PacketBuilder::new(CMD_ECHO)
        .add_bytes(reader.remaining())
        .reply(outbox)
    {
        error!("Echo reply dropped: {:?}", e);
    }
}

/// Parse `CMD:HEX` into a command byte and payload
fn parse_packet(arg: &str) -> Result<(u8, Vec<u8>), String> {
    let (command, payload) = arg.split_once(':').unwrap_or((arg, ""));
    let command = u8::from_str_radix(command, 16)
        .map_err(|e| format!("bad command byte {command:?}: {e}"))?;
    if !payload.is_ascii() || payload.len() % 2 != 0 {
        return Err(format!("payload {payload:?} is not an even run of hex digits"));
    }
    let payload = (0..payload.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&payload[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("bad payload {payload:?}: {e}"))?;
    Ok((command, payload))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if let Some(device) = cli.device {
        config.device = Some(device);
    }
    if let Some(role) = cli.role {
        config.link.role = role.into();
    }
    info!("Starting hdlink endpoint: {:?}", config);

    let (tx, rx) = match &config.device {
        Some(path) => transport::open_device(path)?,
        None => transport::stdio(),
    };

    let (expired_tx, expired_rx) = mpsc::channel();
    let mut dispatcher = CommandDispatcher::new(Session::default());
    dispatcher.register(CMD_ECHO, echo);

    let link: Arc<HostLink> = Arc::new(SharedLink::new(Link::new(
        config.link,
        tx,
        ThreadTimers::new(expired_tx),
        dispatcher,
    )));

    {
        let link = Arc::clone(&link);
        thread::Builder::new()
            .name("timers".into())
            .spawn(move || {
                for handle in expired_rx {
                    link.on_timer_expired(handle);
                }
            })
            .context("spawning timer dispatcher")?;
    }

    for (command, payload) in &cli.send {
        link.submit_packet(*command, payload)
            .map_err(|e| anyhow::anyhow!("cannot queue packet {command:#04x}: {e:?}"))?;
    }

    if config.link.role == Role::Primary {
        link.start_link();
    }

    let result = receive_loop(&link, rx);

    let stats = link.stats();
    info!(
        "Link {:?}: {} frames sent, {} received, {} retransmissions, {} checksum errors",
        link.state(),
        stats.frames_sent,
        stats.frames_received,
        stats.retransmissions,
        stats.checksum_errors
    );
    result
}

/// Feed the link until the transport reports end of stream
fn receive_loop<R: std::io::Read>(link: &HostLink, mut rx: StreamRx<R>) -> Result<()> {
    let mut buffer = [0u8; READ_CHUNK];
    loop {
        let n = rx.read_blocking(&mut buffer).context("reading transport")?;
        if n == 0 {
            info!("Transport closed");
            return Ok(());
        }
        link.on_bytes_received(&buffer[..n]);

        if link.with(|link| link.transport_failed()) {
            bail!("transport write failed");
        }
        link.with(restart_if_down);
    }
}

/// Re-request the link when a primary has been disconnected by its peer
fn restart_if_down<T: UartTx, S: TimerService, L: PacketListener>(
    link: &mut Link<T, S, L>,
) -> bool {
    if link.config().role != Role::Primary || link.state() != LinkState::Down {
        return false;
    }
    warn!("Link lost, requesting it again");
    link.start_link();
    true
}
