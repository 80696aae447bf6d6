//! `txradar-listen` - print announcements from a txradar notify feed.
//!
//! Announcements go to stdout, one per line; logs go to stderr and are
//! filtered with `RUST_LOG` (default `info`). The listener stops once stdout
//! is closed, so piping into `head` terminates.
//!
//! ```text
//! txradar-listen --endpoint tcp://127.0.0.1:7678
//! txradar-listen --format json --max-retries 20
//! ```

use std::error::Error;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use txradar_listener::{
    default_endpoint, Announcement, AnnouncementSink, BackoffConfig, FatalError, ListenerBuilder,
    ListenerConfig, SinkClosed, ZmqConnector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT,
};

/// Output line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `<node_id> <tx_hash>`
    Text,
    /// One JSON object per line
    Json,
}

/// Subscribe to a txradar feed and print every transaction announcement.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Publisher endpoint
    #[arg(long, env = "TXRADAR_ENDPOINT", default_value_t = default_endpoint())]
    endpoint: String,

    /// Topic prefix to subscribe to (empty: everything)
    #[arg(long, env = "TXRADAR_TOPIC", default_value = "")]
    topic: String,

    /// Output format
    #[arg(long, value_enum, env = "TXRADAR_FORMAT", default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print hashes byte-reversed, as block explorers show txids
    #[arg(long, env = "TXRADAR_REVERSE_HASH")]
    reverse_hash: bool,

    /// Per-receive deadline in milliseconds
    #[arg(long, env = "TXRADAR_RECEIVE_TIMEOUT_MS", default_value_t = 1_000)]
    receive_timeout_ms: u64,

    /// Reconnect after this many seconds without a message (0: never)
    #[arg(long, env = "TXRADAR_IDLE_TIMEOUT_SECS", default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    idle_timeout_secs: u64,

    /// Give up on an unreachable publisher after this many milliseconds
    #[arg(
        long,
        env = "TXRADAR_CONNECT_TIMEOUT_MS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
    )]
    connect_timeout_ms: u64,

    /// Give up after this many consecutive reconnect retries have failed
    #[arg(long, env = "TXRADAR_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// First reconnect delay in milliseconds
    #[arg(long, env = "TXRADAR_BACKOFF_INITIAL_MS", default_value_t = 200)]
    backoff_initial_ms: u64,

    /// Largest reconnect delay in milliseconds
    #[arg(long, env = "TXRADAR_BACKOFF_MAX_MS", default_value_t = 10_000)]
    backoff_max_ms: u64,
}

impl Cli {
    fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            endpoint: self.endpoint.clone(),
            topic: self.topic.as_bytes().to_vec(),
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
            idle_timeout: match self.idle_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            max_retries: self.max_retries,
            backoff: BackoffConfig {
                initial: Duration::from_millis(self.backoff_initial_ms),
                max: Duration::from_millis(self.backoff_max_ms),
                ..BackoffConfig::default()
            },
        }
    }

    fn connector(&self) -> ZmqConnector {
        ZmqConnector::with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
    }
}

/// Render one output line.
fn render(ann: &Announcement, format: OutputFormat, reverse_hash: bool) -> String {
    let hash = if reverse_hash {
        ann.tx_hash_hex_reversed()
    } else {
        ann.tx_hash_hex()
    };

    match format {
        OutputFormat::Text => format!("{} {}", ann.node_id(), hash),
        OutputFormat::Json => serde_json::json!({
            "node_id": ann.node_id(),
            "tx_hash": hash,
        })
        .to_string(),
    }
}

/// Writes one rendered line per announcement.
///
/// A failed write means nobody is reading anymore, so it closes the sink.
struct LineSink<W> {
    writer: W,
    format: OutputFormat,
    reverse_hash: bool,
}

impl<W: Write + Send> AnnouncementSink for LineSink<W> {
    async fn deliver(&mut self, announcement: Announcement) -> Result<(), SinkClosed> {
        let line = render(&announcement, self.format, self.reverse_hash);
        writeln!(self.writer, "{line}").map_err(|e| {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                info!("output closed");
            } else {
                warn!(error = %e, "failed to write announcement");
            }
            SinkClosed
        })
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let mut listener = ListenerBuilder::with_connector(cli.connector())
        .config(cli.listener_config())
        .build();
    let stats = listener.stats();

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("interrupt received, shutting down");
        ctrl_c_cancel.cancel();
    });

    let sink = LineSink {
        writer: std::io::stdout(),
        format: cli.format,
        reverse_hash: cli.reverse_hash,
    };

    info!(endpoint = %cli.endpoint, "starting listener");
    let result = listener.run(sink, cancel).await;

    info!(stats = %serde_json::to_string(&stats.snapshot())?, "final stats");
    match result {
        // Output consumer went away, e.g. `| head`.
        Ok(()) | Err(FatalError::SinkClosed) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txradar_listener::FrameDecoder;

    fn sample() -> Announcement {
        FrameDecoder::decode(&[1, 0, 0, 0], &[0xde, 0xad, 0xbe, 0xef]).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["txradar-listen"]).unwrap();
        let config = cli.listener_config();

        assert_eq!(config.endpoint, default_endpoint());
        assert!(config.topic.is_empty());
        assert_eq!(config.receive_timeout, Duration::from_secs(1));
        assert_eq!(config.idle_timeout, Some(DEFAULT_IDLE_TIMEOUT));
        assert_eq!(config.max_retries, None);
        assert_eq!(cli.connector().connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.backoff, BackoffConfig::default());
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.reverse_hash);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "txradar-listen",
            "--endpoint",
            "tcp://10.1.2.3:7678",
            "--format",
            "json",
            "--reverse-hash",
            "--idle-timeout-secs",
            "30",
            "--max-retries",
            "4",
            "--backoff-initial-ms",
            "50",
        ])
        .unwrap();
        let config = cli.listener_config();

        assert_eq!(config.endpoint, "tcp://10.1.2.3:7678");
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_retries, Some(4));
        assert_eq!(config.backoff.initial, Duration::from_millis(50));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.reverse_hash);
    }

    #[test]
    fn test_cli_idle_timeout_zero_disables() {
        let cli = Cli::try_parse_from([
            "txradar-listen",
            "--idle-timeout-secs",
            "0",
            "--connect-timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(cli.listener_config().idle_timeout, None);
        assert_eq!(cli.connector().connect_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render(&sample(), OutputFormat::Text, false), "1 deadbeef");
        assert_eq!(render(&sample(), OutputFormat::Text, true), "1 efbeadde");
    }

    /// Writer whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_line_sink_writes_lines() {
        let mut sink = LineSink {
            writer: Vec::new(),
            format: OutputFormat::Text,
            reverse_hash: false,
        };
        sink.deliver(sample()).await.unwrap();
        sink.deliver(sample()).await.unwrap();

        assert_eq!(String::from_utf8(sink.writer).unwrap(), "1 deadbeef\n1 deadbeef\n");
    }

    #[tokio::test]
    async fn test_line_sink_closes_on_broken_pipe() {
        let mut sink = LineSink {
            writer: ClosedPipe,
            format: OutputFormat::Text,
            reverse_hash: false,
        };
        assert_eq!(sink.deliver(sample()).await, Err(SinkClosed));
    }

    #[test]
    fn test_render_json() {
        let line = render(&sample(), OutputFormat::Json, false);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["node_id"], 1);
        assert_eq!(value["tx_hash"], "deadbeef");
    }
}
