use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cctvscan")]
#[command(about = "Authorized IP camera discovery and assessment", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(required = true, help = "Targets: IP, CIDR, localhost, or a file with one target per line")]
    pub targets: Vec<String>,

    #[arg(
        long,
        default_value = "0-65535",
        help = "Ports: list (80,443), range (8000-8100), or 0-65535/all for the camera port list"
    )]
    pub ports: String,

    #[arg(long, help = "Discovery packets (or connects) per second [config default: 1000]")]
    pub rate: Option<u32>,

    #[arg(long, help = "Extra connect attempts per port [config default: 3]")]
    pub retry: Option<u32>,

    #[arg(long, help = "Seconds to wait for late replies [config default: 1]")]
    pub wait: Option<u64>,

    #[arg(long, help = "Network adapter for the SYN scanner")]
    pub adapter: Option<String>,

    #[arg(long = "adapter-ip", help = "Source IP for the SYN scanner")]
    pub adapter_ip: Option<String>,

    #[arg(long, default_value = "30m", value_parser = parse_duration, help = "Overall run deadline (e.g. 90s, 30m, 1h)")]
    pub timeout: Duration,

    #[arg(long, help = "Credentials file, one user:pass per line")]
    pub creds: Option<PathBuf>,

    #[arg(short, long, help = "Output directory for results.jsonl, report.md and snapshots")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Maximum hosts assessed at once [config default: 5]")]
    pub concurrency: Option<usize>,

    #[arg(long, help = "Skip opportunistic snapshot capture")]
    pub no_snapshots: bool,

    #[arg(long, help = "Path to a cctvscan.toml configuration file")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Informational logging")]
    pub verbose: bool,

    #[arg(long, help = "Debug logging")]
    pub debug: bool,
}

/// Accepts `90s`, `30m`, `1h`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: {:?}", input))?;

    let secs = match unit {
        "" | "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(3600),
        _ => return Err(format!("Invalid duration unit in {:?} (use s, m or h)", input)),
    }
    .ok_or_else(|| format!("Duration {:?} is too large", input))?;

    if secs == 0 {
        return Err("Duration must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(secs))
}
