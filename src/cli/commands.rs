use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "sqlcannon", version, about = "SQL injection probe for a single request parameter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe one parameter of a target with SQL injection payloads
    Probe(ProbeArgs),
    /// Render the HTML report from an existing scan log
    Report(ReportArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ProbeArgs {
    /// Target URL, e.g. http://shop.test/item?id=1
    #[arg(short, long)]
    pub target: String,

    /// Name of the parameter to inject into
    #[arg(short, long)]
    pub param: String,

    /// HTTP method: GET or POST
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Comma-separated payloads
    #[arg(long)]
    pub payloads: Option<String>,

    /// File with one payload per line
    #[arg(long)]
    pub payloads_file: Option<String>,

    /// JSON or YAML configuration file (default: ./config.json if present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory for log, results, report and resume files
    #[arg(short, long)]
    pub output: Option<String>,

    /// Concurrent workers (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Requests per second (overrides config)
    #[arg(long)]
    pub rate_limit: Option<f64>,
}

#[derive(Args, Clone)]
pub struct ReportArgs {
    /// Scan log to read
    #[arg(long, default_value = "output.log")]
    pub log: String,

    /// HTML file to write
    #[arg(long, default_value = "output.html")]
    pub html: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
