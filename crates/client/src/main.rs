mod game;
mod net;

use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;
use clap::Parser;

use net::{ClientConfig, NetworkClient};

#[derive(Parser)]
#[command(name = "posesync-client")]
#[command(about = "Demo host replicating animated objects to a pose sync server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1", help = "Server host to connect to")]
    host: String,

    #[arg(long, default_value_t = posesync::DEFAULT_PORT)]
    target_port: u16,

    #[arg(long, default_value_t = posesync::DEFAULT_LISTEN_PORT)]
    listen_port: u16,

    #[arg(short, long, default_value_t = posesync::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 100)]
    ping_after_ticks: u32,

    #[arg(long, help = "Accept datagrams from any source IP")]
    no_strict_ip: bool,

    #[arg(long, help = "Accept datagrams from any source port")]
    no_strict_port: bool,

    #[arg(long, help = "Never send keep-alive pings")]
    no_manual_ping: bool,

    #[arg(long, default_value_t = 3, help = "Number of pre-placed objects")]
    objects: usize,

    #[arg(long, default_value_t = 120, help = "Spawn a runtime object after this many ticks")]
    spawn_after_ticks: u64,

    #[arg(long, help = "Stop after this many ticks")]
    ticks: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let target = resolve(&args.host, args.target_port)?;

    let mut config = ClientConfig::new(target);
    config.listen_port = args.listen_port;
    config.tick_rate = args.tick_rate;
    config.ping_after_ticks = args.ping_after_ticks;
    config.strict_source_ip = !args.no_strict_ip;
    config.strict_source_port = !args.no_strict_port;
    config.manual_ping = !args.no_manual_ping;

    let mut client = NetworkClient::new(&config, args.objects)?;
    client.run(args.ticks, Some(args.spawn_after_ticks));

    Ok(())
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .with_context(|| format!("could not resolve {}", host))
}
