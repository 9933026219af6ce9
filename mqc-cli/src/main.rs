//! mqc — send, browse and receive through an in-process broker.
//!
//! Every run opens one connection, publishes `--count` text messages and
//! reads them back, printing each message as it arrives.

#![allow(missing_docs, clippy::print_stderr, clippy::print_stdout)]

use std::process;
use std::time::Duration;

use clap::Parser;
use mqc::{AckMode, ConnectionFactory, Destination, Message, Session};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Round-trip messages through an mqc broker.
#[derive(Parser)]
#[command(name = "mqc", version, about, long_about = None)]
struct Args {
    /// Broker URI, e.g. `vm://localhost?create=true`.
    #[arg(short, long, default_value = "vm://localhost")]
    uri: String,

    /// Destination name.
    #[arg(short, long, default_value = "mqc.demo")]
    destination: String,

    /// Use a topic instead of a queue.
    #[arg(long)]
    topic: bool,

    /// Number of messages to send.
    #[arg(short = 'n', long, default_value = "3")]
    count: u32,

    /// Send inside a transaction committed after the last message.
    #[arg(long)]
    transacted: bool,

    /// Browse the queue before consuming it.
    #[arg(long)]
    browse: bool,

    /// Receive timeout per message in milliseconds.
    #[arg(long, default_value = "1000")]
    timeout: u64,

    /// Log filter (falls back to `RUST_LOG`).
    #[arg(long)]
    log: Option<String>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    if let Err(e) = rt.block_on(run(&args)) {
        eprintln!("fatal: {e}");
        process::exit(1);
    }
}

/// `--log` wins over `RUST_LOG`; with neither only warnings are shown.
fn log_filter(filter: Option<&str>) -> EnvFilter {
    filter.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    )
}

fn init_logging(filter: Option<&str>) {
    let filter = log_filter(filter);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn run(args: &Args) -> mqc::Result<()> {
    if args.topic && args.browse {
        return Err(mqc::Error::Other("--browse needs a queue".into()));
    }

    let factory = ConnectionFactory::new(&args.uri)?;
    let connection = factory.create_connection()?;
    println!("connected {} to {}", connection.id(), factory.uri().as_str());

    let sender = connection.create_session(if args.transacted {
        AckMode::Transacted
    } else {
        AckMode::Auto
    })?;
    let receiver = connection.create_session(AckMode::Auto)?;
    let destination = if args.topic {
        receiver.create_topic(&args.destination)?
    } else {
        receiver.create_queue(&args.destination)?
    };

    // Topic subscribers only see what is published after they exist.
    let consumer = receiver.create_consumer(&destination, None, false)?;
    connection.start()?;

    send(&sender, &destination, args.count)?;
    if args.transacted {
        sender.commit()?;
        println!("committed {} message(s)", args.count);
    }

    if args.browse {
        browse(&receiver, &destination)?;
    }

    let timeout = Duration::from_millis(args.timeout);
    let mut received = 0;
    while received < args.count {
        let Some(message) = consumer.receive_timeout(timeout).await? else {
            break;
        };
        received += 1;
        print_message("received", &message);
    }

    connection.close();
    if received < args.count {
        return Err(mqc::Error::Other(format!(
            "received {received} of {} message(s) before timing out",
            args.count
        )));
    }
    println!("done: {received} message(s) round-tripped through {destination}");
    Ok(())
}

fn send(session: &Session, destination: &Destination, count: u32) -> mqc::Result<()> {
    let producer = session.create_producer(Some(destination))?;
    for i in 1..=count {
        let mut message = session.create_text_message(&format!("message {i} of {count}"))?;
        message.set_property("sequence", i64::from(i))?;
        producer.send(&mut message)?;
        println!("sent {}", message.message_id());
    }
    producer.close();
    Ok(())
}

fn browse(session: &Session, queue: &Destination) -> mqc::Result<()> {
    let browser = session.create_browser(queue, None)?;
    let mut pending = 0;
    while let Some(message) = browser.next_message()? {
        pending += 1;
        print_message("pending", &message);
    }
    println!("{pending} message(s) pending on {queue}");
    browser.close();
    Ok(())
}

fn print_message(label: &str, message: &Message) {
    let text = message.get_text().unwrap_or("<no text>");
    let flag = if message.redelivered() { " (redelivered)" } else { "" };
    println!("{label} {}: {text}{flag}", message.message_id());
}
