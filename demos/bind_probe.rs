// ABOUTME: Binds to an SMSC, keeps the session alive with enquire_link and unbinds
// ABOUTME: Useful for checking credentials and link health against a real SMSC

//! # Bind probe
//!
//! ```bash
//! # Bind as transceiver and probe for a minute
//! cargo run --example bind_probe -- --system-id test --password secret
//!
//! # Receiver bind with a faster keep-alive
//! cargo run --example bind_probe -- \
//!   --system-id test --password secret \
//!   --bind-type receiver \
//!   --keep-alive-interval 5 \
//!   --run-duration 30
//! ```

use argh::FromArgs;
use smpp_session::client::{
    BindType, KeepAliveConfig, KeepAliveManager, Session, SessionConfigurationBuilder,
};
use std::error::Error;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Bind to an SMSC and keep the session alive
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the system id
    #[argh(option)]
    system_id: String,

    /// the password
    #[argh(option)]
    password: String,

    /// the hostname of IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// transmitter, receiver or transceiver (default: transceiver)
    #[argh(option, from_str_fn(parse_bind_type))]
    bind_type: Option<BindType>,

    /// keep-alive interval in seconds (default: 30)
    #[argh(option)]
    keep_alive_interval: Option<u64>,

    /// maximum consecutive failures before giving up (default: 3)
    #[argh(option)]
    max_failures: Option<u32>,

    /// how long to stay bound in seconds (default: 60)
    #[argh(option)]
    run_duration: Option<u64>,
}

fn parse_bind_type(value: &str) -> Result<BindType, String> {
    match value {
        "transmitter" | "tx" => Ok(BindType::Transmitter),
        "receiver" | "rx" => Ok(BindType::Receiver),
        "transceiver" | "trx" => Ok(BindType::Transceiver),
        other => Err(format!("unknown bind type '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let run_duration = Duration::from_secs(cli_args.run_duration.unwrap_or(60));

    let mut builder = SessionConfigurationBuilder::new(host, port)
        .system_id(cli_args.system_id)
        .password(cli_args.password)
        .bind_type(cli_args.bind_type.unwrap_or_default());
    if let Some(seconds) = cli_args.keep_alive_interval {
        builder = builder.enquire_link_interval(Duration::from_secs(seconds));
    }
    let config = builder.build()?;

    let mut keep_alive_config = KeepAliveConfig::from(&config);
    if let Some(max_failures) = cli_args.max_failures {
        keep_alive_config = keep_alive_config.with_max_failures(max_failures);
    }
    let mut keep_alive = KeepAliveManager::new(keep_alive_config);

    let mut session = Session::new(config);
    if let Err(e) = session.bind().await {
        error!("Bind failed: {}", e);
        return Err(e.into());
    }
    info!("Bound, staying up for {} seconds", run_duration.as_secs());

    let deadline = sleep(run_duration);
    tokio::pin!(deadline);
    let mut keep_alive_timer = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Run duration elapsed, shutting down");
                break;
            }

            _ = keep_alive_timer.tick() => {
                match session.maintain_keep_alive(&mut keep_alive).await {
                    Ok(true) => debug!("enquire_link sent"),
                    Ok(false) => {}
                    Err(e) => {
                        error!("Session lost: {}", e);
                        break;
                    }
                }

                if keep_alive.is_connection_failed() {
                    error!("Giving up after {} failed enquire_links", keep_alive.status().consecutive_failures);
                    break;
                }
            }
        }
    }

    session.unbind().await;

    let status = keep_alive.status();
    info!(
        pings = status.total_pings,
        pongs = status.total_pongs,
        failures = status.consecutive_failures,
        "Final keep-alive statistics"
    );
    if status.total_pings != status.total_pongs {
        warn!("{} enquire_links went unanswered", status.total_pings - status.total_pongs);
    }

    Ok(())
}
