use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use relay_core::{SendTask, TaskEvent};
use relay_engine::{
    describe_sync_age, run_realtime, AutomationConfig, AutomationService, ChannelReportSink,
    ContactStore, FileContactStore, Script, ScriptedHost, ServiceEvent,
};
use relay_logging::{relay_info, LogDestination};

#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Contact sync and batch messaging driven through a scripted accessibility host"
)]
struct Cli {
    /// Automation config (RON); built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Contact list store
    #[arg(long, default_value = "contacts.json")]
    store: PathBuf,
    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, short, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Harvest the contact list and store it
    Harvest(RunArgs),
    /// Run a send task described by a JSON file
    Send {
        #[command(flatten)]
        run: RunArgs,
        /// `{"recipients": [...], "messages": [{"type": "text", "content": "hi"}, ...]}`
        task: PathBuf,
    },
    /// Print the stored contact list
    Contacts,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Screen script played by the replay host
    #[arg(long)]
    script: PathBuf,
    /// Pace the run on the wall clock instead of virtual time
    #[arg(long, action = ArgAction::SetTrue)]
    realtime: bool,
    /// Give up after this much timeline time
    #[arg(long, default_value_t = 3_600_000)]
    limit_ms: u64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    relay_logging::initialize(destination, level);

    let config = match &cli.config {
        Some(path) => AutomationConfig::load(path)?,
        None => AutomationConfig::default(),
    };
    let store = FileContactStore::new(cli.store.clone());

    match cli.command {
        Commands::Harvest(run) => {
            let (mut service, events) = build_service(&run, config, store)?;
            service.sync_contacts()?;
            drive(&mut service, &run)?;
            print_events(&events);
        }
        Commands::Send { run, task } => {
            let task = load_task(&task)?;
            let (mut service, events) = build_service(&run, config, store)?;
            service.start_send_task(task)?;
            drive(&mut service, &run)?;
            print_events(&events);
        }
        Commands::Contacts => {
            let stored = store.load()?;
            match stored.synced_at {
                Some(at) => println!("synced {}", describe_sync_age(at, Utc::now())),
                None => println!("never synced"),
            }
            for name in &stored.contacts {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn build_service(
    run: &RunArgs,
    config: AutomationConfig,
    store: FileContactStore,
) -> Result<(AutomationService<ScriptedHost>, Receiver<ServiceEvent>)> {
    let script = Script::load(&run.script)?;
    let host = ScriptedHost::new(script)?;
    let (sink, events) = ChannelReportSink::channel();
    let service = AutomationService::new(host, config, Box::new(sink)).with_store(store);
    Ok((service, events))
}

fn load_task(path: &Path) -> Result<SendTask> {
    let text = fs::read_to_string(path).with_context(|| format!("reading task {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing task {path:?}"))
}

fn drive(service: &mut AutomationService<ScriptedHost>, run: &RunArgs) -> Result<()> {
    let idle = if run.realtime {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("building runtime")?;
        // The replay host queues its own notifications; only timers pace this mode.
        let (_, rx) = tokio::sync::mpsc::unbounded_channel();
        runtime.block_on(run_realtime(service, rx));
        !service.is_active()
    } else {
        service.run_replay(run.limit_ms)
    };
    if !idle {
        service.stop_task();
        bail!("session still running at t={}ms; stopped", service.now_ms());
    }
    relay_info!("session finished at t={}ms", service.now_ms());
    Ok(())
}

fn print_events(events: &Receiver<ServiceEvent>) {
    for event in events.try_iter() {
        match event {
            ServiceEvent::HarvestCompleted { contacts } => {
                println!("harvested {} contacts", contacts.len());
                for name in contacts {
                    println!("  {name}");
                }
            }
            ServiceEvent::Task(TaskEvent::RecipientStarted { recipient, position }) => {
                println!("[{}] {recipient}", position + 1);
            }
            ServiceEvent::Task(TaskEvent::Delivered(d)) => {
                println!("  delivered #{} ({:?})", d.index, d.kind);
            }
            ServiceEvent::Task(TaskEvent::Skipped(f)) => {
                println!("  skipped #{}: {}", f.index, f.reason);
            }
            ServiceEvent::Task(TaskEvent::Finished(report))
            | ServiceEvent::Task(TaskEvent::Stopped(report)) => {
                println!(
                    "delivered {} of {}, failed {}",
                    report.delivered.len(),
                    report.recipients * report.messages,
                    report.failed.len()
                );
            }
            ServiceEvent::Task(TaskEvent::Started { .. }) | ServiceEvent::Status(_) => {}
        }
    }
}
