use colored::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Picks the log filter: `--verbose` wins, then `RUST_LOG`, then the
/// configured level.
pub fn log_filter(verbose: bool, configured: Option<&str>) -> String {
    choose_filter(verbose, std::env::var("RUST_LOG").ok(), configured)
}

fn choose_filter(verbose: bool, from_env: Option<String>, configured: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    if let Some(from_env) = from_env.filter(|v| !v.trim().is_empty()) {
        return from_env;
    }
    match configured.map(|l| l.trim().to_lowercase()) {
        Some(level) if matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") => {
            level
        }
        _ => DEFAULT_LOG_LEVEL.to_string(),
    }
}

/// Logs go to stderr so command output on stdout stays clean
pub fn setup_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_new(log_filter(verbose, configured))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_wins() {
        assert_eq!(log_filter(true, Some("error")), "debug");
    }

    #[test]
    fn test_unknown_level_falls_back() {
        assert_eq!(choose_filter(false, None, Some("chatty")), DEFAULT_LOG_LEVEL);
        assert_eq!(choose_filter(false, None, Some(" INFO ")), "info");
        assert_eq!(choose_filter(false, None, None), DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_rust_log_beats_configured_level() {
        assert_eq!(
            choose_filter(false, Some("sfmemo_core=trace".to_string()), Some("error")),
            "sfmemo_core=trace"
        );
        assert_eq!(choose_filter(false, Some("  ".to_string()), Some("info")), "info");
        assert_eq!(choose_filter(true, Some("error".to_string()), None), "debug");
    }
}
