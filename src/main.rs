use clap::Parser;
use p0f_syn::capture::FrameSource;
use p0f_syn::metrics_server::spawn_metrics_server;
use p0f_syn::parallel::{DispatchResult, WorkerPool};
use p0f_syn::{
    Database, P0fSynError, PipelineConfig, SynAnalyzer, SynEvent, SynMetrics, SynPipeline,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Passive TCP SYN fingerprinting: prints the OS label of every client SYN seen.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Network interface to capture from
    #[arg(short = 'i', long = "iface", env = "IFACE", default_value = "eth0")]
    iface: String,

    /// Read frames from a pcap file instead of a live interface
    #[arg(long)]
    pcap: Option<PathBuf>,

    /// Signature file, defaults to the bundled database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,

    /// Max events per second, 0 for unlimited
    #[arg(long, default_value_t = 0)]
    rate: u64,

    /// Sampling ratio 0..1
    #[arg(long, default_value_t = 1.0)]
    sample: f64,

    /// Destination TCP port filter, 0 for any
    #[arg(long, default_value_t = 0)]
    dport: u16,

    /// Source TCP port filter, 0 for any
    #[arg(long, default_value_t = 0)]
    sport: u16,

    /// Exclude source IP (host or CIDR)
    #[arg(long)]
    src: Option<String>,

    /// Exclude destination IP (host or CIDR)
    #[arg(long)]
    dst: Option<String>,

    /// Serve Prometheus metrics on /metrics
    #[arg(long)]
    metrics: bool,

    /// Metrics listen address
    #[arg(long = "metrics-addr", alias = "metrics.addr", default_value = "0.0.0.0:9100")]
    metrics_addr: SocketAddr,

    /// Number of worker threads, 0 for sequential mode
    #[arg(short = 'w', long = "workers", default_value_t = 0)]
    workers: usize,

    /// Queue size per worker
    #[arg(short = 'q', long = "queue-size", default_value_t = 100)]
    queue_size: usize,

    /// Log file path
    #[arg(short = 'l', long = "log-file")]
    log_file: Option<String>,
}

fn initialize_logging(log_file: Option<String>) {
    let console_writer = std::io::stderr.with_max_level(tracing::Level::INFO);

    let subscriber = fmt().with_env_filter(EnvFilter::from_default_env());
    let result = match log_file {
        Some(log_file) => {
            let file_appender = RollingFileAppender::new(Rotation::NEVER, ".", log_file)
                .with_max_level(tracing::Level::INFO);
            tracing::subscriber::set_global_default(
                subscriber
                    .with_writer(console_writer.and(file_appender))
                    .finish(),
            )
        }
        None => tracing::subscriber::set_global_default(
            subscriber.with_writer(console_writer).finish(),
        ),
    };

    if let Err(e) = result {
        eprintln!("Failed to set subscriber: {e}");
        std::process::exit(1);
    }
}

fn main() {
    let args = Args::parse();
    initialize_logging(args.log_file.clone());

    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), P0fSynError> {
    let db = match &args.db {
        Some(path) => Database::load_from_file(path)?,
        None => Database::load_default()?,
    };
    let db = Arc::new(db);
    debug!("Loaded signature database: {} entries", db.len());

    let config = PipelineConfig {
        dport: args.dport,
        sport: args.sport,
        exclude_src: args.src.clone(),
        exclude_dst: args.dst.clone(),
        sampling_ratio: args.sample,
        rate_limit: args.rate,
    };
    let mut pipeline = SynPipeline::new(&config)?;

    let metrics = if args.metrics {
        let metrics = Arc::new(SynMetrics::new(args.sample, args.rate)?);
        spawn_metrics_server(args.metrics_addr, Arc::clone(&metrics))?;
        pipeline = pipeline.with_metrics(Arc::clone(&metrics));
        Some(metrics)
    } else {
        None
    };

    let cancel_signal = Arc::new(AtomicBool::new(false));
    let ctrl_c_signal = Arc::clone(&cancel_signal);
    ctrlc::set_handler(move || {
        info!("Received signal, initiating graceful shutdown...");
        ctrl_c_signal.store(true, Ordering::Relaxed);
    })
    .map_err(|e| P0fSynError::Misconfiguration(format!("Error setting signal handler: {e}")))?;

    let (sender, receiver): (Sender<SynEvent>, Receiver<SynEvent>) = mpsc::channel();

    let pool = if args.workers > 0 {
        info!(
            "Using parallel mode with {} workers, queue_size={}",
            args.workers, args.queue_size
        );
        let source = open_source(&args)?;
        let pool = Arc::new(WorkerPool::new(
            args.workers,
            args.queue_size,
            source.link_type(),
            sender,
            Arc::clone(&db),
            pipeline,
        )?);
        spawn_dispatcher(source, Arc::clone(&pool), Arc::clone(&cancel_signal));
        Some(pool)
    } else {
        info!("Using sequential mode");
        spawn_sequential(&args, db, pipeline, sender, Arc::clone(&cancel_signal));
        None
    };

    const LOG_STATS_EVERY: u64 = 1000;
    let mut event_count: u64 = 0;

    for event in receiver {
        if cancel_signal.load(Ordering::Relaxed) {
            info!("Shutdown signal received, stopping result processing");
            break;
        }

        if args.json {
            match event.to_json() {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    warn!("Failed to serialize event: {e}");
                    if let Some(metrics) = &metrics {
                        metrics.record_output_error();
                    }
                }
            }
        } else {
            print!("{event}");
        }

        if let Some(ref pool) = pool {
            event_count = event_count.saturating_add(1);
            if event_count % LOG_STATS_EVERY == 0 {
                info!("{}", pool.stats());
            }
        }
    }

    if let Some(pool) = pool {
        info!("{}", pool.stats());
    }

    Ok(())
}

fn open_source(args: &Args) -> Result<FrameSource, P0fSynError> {
    match &args.pcap {
        Some(path) => FrameSource::pcap(path),
        None => FrameSource::network(&args.iface),
    }
}

fn spawn_sequential(
    args: &Args,
    db: Arc<Database>,
    pipeline: SynPipeline,
    sender: Sender<SynEvent>,
    cancel_signal: Arc<AtomicBool>,
) {
    let pcap = args.pcap.clone();
    let iface = args.iface.clone();

    thread::spawn(move || {
        let analyzer = SynAnalyzer::new(db.as_ref(), pipeline);
        let result = match pcap {
            Some(path) => analyzer.analyze_pcap(path, sender, Some(cancel_signal)),
            None => analyzer.analyze_network(&iface, sender, Some(cancel_signal)),
        };

        if let Err(e) = result {
            error!("SYN analysis failed: {e}");
        }
    });
}

fn spawn_dispatcher(mut source: FrameSource, pool: Arc<WorkerPool>, cancel_signal: Arc<AtomicBool>) {
    thread::spawn(move || {
        while let Some(frame) = source.next_frame() {
            if cancel_signal.load(Ordering::Relaxed) {
                debug!("Cancellation signal received, stopping dispatch");
                break;
            }
            match frame {
                Ok(frame) => {
                    if pool.dispatch(frame) == DispatchResult::Dropped {
                        debug!("Worker queue full, frame dropped");
                    }
                }
                Err(e) => error!("Failed to read packet: {e}"),
            }
        }
        pool.join();
    });
}
