use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::bounded;
use tracing::{error, info};

use devbus::config::{config_path_from_args, RuntimeConfig};
use devbus::logging::{initialize_tracing, log_runtime_environment, LOG_TARGET_STARTUP};
use devbus::messaging::{
    topology, BusConnection, CommandCode, CoreEvent, CoreRequest, DbusConnection, Dispatcher,
    HardwareCommand, QueueForwarder, RecordCommand, SignalMatch, SignalMessage, SignalReceiver,
    SignalSender,
};
use devbus::orchestrator::{BusStatusSink, CoreOrchestrator, LogStatusSink};
use devbus::runtime::ProcessRuntime;

const PROCESS_NAME: &str = "devbus-core";

fn main() {
    if let Err(e) = run() {
        error!("Fatal: {:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config_path = match config_path_from_args(std::env::args().skip(1)) {
        Some(path) => path,
        None => RuntimeConfig::default_path(PROCESS_NAME)?,
    };
    let config = RuntimeConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let log_dir = initialize_tracing(PROCESS_NAME, &config)?;
    log_runtime_environment(PROCESS_NAME);
    info!(target: LOG_TARGET_STARTUP, "Configuration: {}", config_path.display());
    info!(target: LOG_TARGET_STARTUP, "Log directory: {}", log_dir.display());

    let bus: Arc<dyn BusConnection> = Arc::new(
        DbusConnection::connect(config.bus, &config.service_name)
            .with_context(|| format!("Cannot join the {} bus", config.bus))?,
    );

    let runtime = ProcessRuntime::<CoreEvent>::new(PROCESS_NAME, &config);
    if let Err(e) = start_workers(&runtime, &bus, &config) {
        runtime.shutdown();
        return Err(e);
    }
    info!("{} running on the {} bus as {}", PROCESS_NAME, config.bus, bus.name());

    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .context("Failed to install the signal handler")?;

    // Block until Ctrl-C or SIGTERM
    let _ = rx.recv();
    info!("Termination requested");
    runtime.shutdown();
    Ok(())
}

fn start_workers(
    runtime: &ProcessRuntime<CoreEvent>,
    bus: &Arc<dyn BusConnection>,
    config: &RuntimeConfig,
) -> anyhow::Result<()> {
    runtime.start().context("Failed to start the timer service")?;

    let orchestrator = Arc::new(CoreOrchestrator::new(
        SignalSender::new(bus.clone(), topology::core_record_route),
        SignalSender::new(bus.clone(), topology::core_hardware_route),
        runtime.timers().clone(),
        config.confirmation_timeout(),
        (LogStatusSink, BusStatusSink::new(bus.clone())),
    ));
    let dispatcher = Dispatcher::new("core-dispatcher", runtime.queue().clone(), orchestrator)
        .with_wait(config.dispatcher_wait());
    runtime
        .spawn_dispatcher(dispatcher)
        .context("Failed to start the dispatcher")?;

    let [requests, record, hardware] = topology::core_subscriptions();
    spawn_receiver::<CoreRequest>(runtime, bus, config, "core-requests", requests, CoreEvent::User)?;
    spawn_receiver::<RecordCommand>(
        runtime,
        bus,
        config,
        "record-notifications",
        record,
        CoreEvent::Record,
    )?;
    spawn_receiver::<HardwareCommand>(
        runtime,
        bus,
        config,
        "hardware-notifications",
        hardware,
        CoreEvent::Hardware,
    )?;
    Ok(())
}

fn spawn_receiver<C: CommandCode>(
    runtime: &ProcessRuntime<CoreEvent>,
    bus: &Arc<dyn BusConnection>,
    config: &RuntimeConfig,
    name: &str,
    rule: SignalMatch,
    wrap: fn(SignalMessage<C>) -> CoreEvent,
) -> anyhow::Result<()> {
    let forwarder = QueueForwarder::new(runtime.queue().clone(), wrap);
    let receiver = SignalReceiver::subscribe(name, bus.clone(), rule, forwarder)
        .with_context(|| format!("Failed to subscribe {}", name))?
        .with_poll_interval(config.receiver_poll());
    runtime
        .spawn(receiver)
        .with_context(|| format!("Failed to start {}", name))?;
    Ok(())
}
