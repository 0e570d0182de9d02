use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sensorscope",
    version,
    about = "A terminal console for Argo Events sensors."
)]
pub struct CliArgs {
    /// Initial route, for example `sensors/argo-events?sidePanel=true`
    pub route: Option<String>,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Pin the console to a single namespace (overrides the config file)
    #[arg(long)]
    pub managed_namespace: Option<String>,

    /// Path to a config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
