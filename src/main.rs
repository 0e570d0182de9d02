mod app;
mod cli;
mod config;
mod input;
mod k8s;
mod model;
mod route;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, ViewOptions};
use clap::Parser;
use cli::CliArgs;
use config::{ConsoleConfig, SENSOR_LIST_CREATION, SettingsStore};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::KubeGateway;
use model::Sensor;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use route::Route;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::{self, Stdout, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Results of background fetches, delivered back to the UI loop.
#[derive(Debug)]
enum FetchEvent {
    SensorList {
        seq: u64,
        result: std::result::Result<Vec<Sensor>, String>,
    },
    Namespaces(std::result::Result<Vec<String>, String>),
    SensorDetail {
        namespace: String,
        name: String,
        result: std::result::Result<Sensor, String>,
    },
    SensorLogs {
        namespace: String,
        name: String,
        result: std::result::Result<String, String>,
    },
}

struct Runtime {
    gateway: KubeGateway,
    settings: SettingsStore,
    fetch_tx: mpsc::UnboundedSender<FetchEvent>,
    fetch_timeout: Duration,
    log_tail_lines: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let config = ConsoleConfig::load(args.config.as_deref())?;
    if let Some(source) = &config.source {
        debug!(config = %source, "loaded config");
    }
    let settings = SettingsStore::open(config.settings_path.clone()).unwrap_or_else(|error| {
        warn!("settings unavailable, using defaults: {error:#}");
        SettingsStore::default()
    });

    let gateway = KubeGateway::new().await?;
    let route = resolve_initial_route(&args, gateway.default_namespace())?;
    let managed_namespace = args
        .managed_namespace
        .clone()
        .or_else(|| config.managed_namespace.clone())
        .map(|namespace| namespace.trim().to_string())
        .filter(|namespace| !namespace.is_empty());

    let mut app = App::new(
        route,
        ViewOptions {
            managed_namespace,
            history_mode: config.history,
            display_iso_format: settings.flag(SENSOR_LIST_CREATION),
        },
    );
    app.set_kube_target(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
    );

    let (fetch_tx, fetch_rx) = mpsc::unbounded_channel();
    let mut runtime = Runtime {
        gateway,
        settings,
        fetch_tx,
        fetch_timeout: Duration::from_secs(config.fetch_timeout_secs.max(1)),
        log_tail_lines: config.log_tail_lines,
    };

    run(&mut app, &mut runtime, fetch_rx).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // The terminal belongs to the UI; events go to a file or nowhere.
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

fn resolve_initial_route(args: &CliArgs, default_namespace: &str) -> Result<Route> {
    if let Some(raw) = args.route.as_deref() {
        if args.namespace.is_some() || args.all_namespaces {
            warn!("an explicit route was provided, ignoring namespace flags");
        }
        return Route::parse(raw);
    }

    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }
    if args.all_namespaces {
        return Ok(Route::sensor_list(""));
    }
    let namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| default_namespace.to_string());
    Ok(Route::sensor_list(namespace))
}

async fn run(
    app: &mut App,
    runtime: &mut Runtime,
    fetch_rx: mpsc::UnboundedReceiver<FetchEvent>,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, runtime, fetch_rx).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    runtime: &mut Runtime,
    mut fetch_rx: mpsc::UnboundedReceiver<FetchEvent>,
) -> Result<()> {
    let mount = app.mount();
    execute_app_command(terminal, app, runtime, mount).await;

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(terminal, app, runtime, command).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            Some(event) = fetch_rx.recv() => apply_fetch_event(app, event),
        }
    }

    Ok(())
}

async fn execute_app_command(
    terminal: &mut TuiTerminal,
    app: &mut App,
    runtime: &mut Runtime,
    command: AppCommand,
) {
    let mut pending = VecDeque::from(command.into_commands());
    while let Some(command) = pending.pop_front() {
        match command {
            AppCommand::None | AppCommand::Batch(_) => {}
            AppCommand::CollectEvent { name } => {
                info!(event = %name, namespace = app.namespace(), "telemetry");
            }
            AppCommand::LoadSensors { seq, namespace } => {
                let gateway = runtime.gateway.clone();
                let tx = runtime.fetch_tx.clone();
                let limit = runtime.fetch_timeout;
                tokio::spawn(async move {
                    let result =
                        bounded(limit, "listing sensors", gateway.list_sensors(&namespace)).await;
                    let _ = tx.send(FetchEvent::SensorList { seq, result });
                });
            }
            AppCommand::LoadNamespaces => {
                let gateway = runtime.gateway.clone();
                let tx = runtime.fetch_tx.clone();
                let limit = runtime.fetch_timeout;
                tokio::spawn(async move {
                    let result =
                        bounded(limit, "listing namespaces", gateway.list_namespaces()).await;
                    let _ = tx.send(FetchEvent::Namespaces(result));
                });
            }
            AppCommand::LoadSensorDetail { namespace, name } => {
                let gateway = runtime.gateway.clone();
                let tx = runtime.fetch_tx.clone();
                let limit = runtime.fetch_timeout;
                tokio::spawn(async move {
                    let result =
                        bounded(limit, "loading sensor", gateway.get_sensor(&namespace, &name))
                            .await;
                    let _ = tx.send(FetchEvent::SensorDetail {
                        namespace,
                        name,
                        result,
                    });
                });
            }
            AppCommand::LoadSensorLogs { namespace, name } => {
                let gateway = runtime.gateway.clone();
                let tx = runtime.fetch_tx.clone();
                let limit = runtime.fetch_timeout;
                let tail_lines = runtime.log_tail_lines;
                tokio::spawn(async move {
                    let result = bounded(
                        limit,
                        "loading sensor logs",
                        gateway.fetch_sensor_logs(&namespace, &name, tail_lines),
                    )
                    .await;
                    let _ = tx.send(FetchEvent::SensorLogs {
                        namespace,
                        name,
                        result,
                    });
                });
            }
            AppCommand::CreateSensor {
                namespace,
                template,
            } => match edit_manifest(terminal, &template).await {
                Ok(Some(manifest)) => {
                    match runtime.gateway.create_sensor(&namespace, &manifest).await {
                        Ok(sensor) => {
                            info!(
                                namespace = sensor.namespace(),
                                name = sensor.name(),
                                "created sensor"
                            );
                            pending.extend(app.on_sensor_created(&sensor).into_commands());
                        }
                        Err(error) => {
                            app.set_status(format!("Create failed: {}", compact_error(&error)));
                        }
                    }
                }
                Ok(None) => app.set_status("Create cancelled (template unchanged)"),
                Err(error) => app.set_status(format!("Editor failed: {error:#}")),
            },
            AppCommand::PersistSetting { key, value } => {
                if let Err(error) = runtime.settings.set_flag(&key, value) {
                    warn!("failed to persist setting {key}: {error:#}");
                    app.set_status(format!("Setting not saved: {}", compact_error(&error)));
                }
            }
        }
    }
}

fn apply_fetch_event(app: &mut App, event: FetchEvent) {
    match event {
        FetchEvent::SensorList { seq, result } => {
            if let Err(error) = &result {
                warn!(seq, "sensor list failed: {error}");
            }
            app.apply_sensor_list(seq, result);
        }
        FetchEvent::Namespaces(Ok(namespaces)) => app.set_namespaces(namespaces),
        FetchEvent::Namespaces(Err(error)) => {
            debug!("namespace discovery failed: {error}");
        }
        FetchEvent::SensorDetail {
            namespace,
            name,
            result,
        } => app.set_sensor_detail(&namespace, &name, result),
        FetchEvent::SensorLogs {
            namespace,
            name,
            result,
        } => app.set_sensor_logs(&namespace, &name, result),
    }
}

async fn bounded<T>(
    limit: Duration,
    what: &str,
    future: impl Future<Output = Result<T>>,
) -> std::result::Result<T, String> {
    match timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(compact_error(&error)),
        Err(_) => Err(format!("Timed out {what} after {}s", limit.as_secs())),
    }
}

/// Opens `template` in the user's editor. Returns `None` when the buffer
/// comes back unchanged or empty.
async fn edit_manifest(terminal: &mut TuiTerminal, template: &str) -> Result<Option<String>> {
    let mut file = tempfile::Builder::new()
        .prefix("sensor-")
        .suffix(".yaml")
        .tempfile()
        .context("failed to create temporary manifest")?;
    file.write_all(template.as_bytes())
        .context("failed to write temporary manifest")?;
    file.flush().context("failed to flush temporary manifest")?;

    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");
    let mut cmd = TokioCommand::new(program);
    cmd.args(parts)
        .arg(file.path())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    suspend_terminal_for_subprocess(terminal)?;
    let run_result = cmd
        .status()
        .await
        .with_context(|| format!("failed to run editor '{editor}'"));
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };
    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }

    let edited = fs::read_to_string(file.path()).context("failed to read edited manifest")?;
    Ok(changed_manifest(template, edited))
}

fn changed_manifest(template: &str, edited: String) -> Option<String> {
    if edited.trim().is_empty() || edited.trim() == template.trim() {
        None
    } else {
        Some(edited)
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
