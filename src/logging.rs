//! Process-wide log verbosity, read once from the environment. An explicit
//! initializer the binary calls from `main`; the library itself never
//! calls this.

const LEPTON_LOG: &str = "LEPTON_LOG";
const RUST_LOG: &str = "RUST_LOG";
const DEFAULT_FILTER: &str = "info";

/// Initializes `env_logger` using `LEPTON_LOG`, falling back to `RUST_LOG`,
/// falling back to `info`. Safe to call more than once per process; later
/// calls are no-ops (matches `env_logger::Builder::try_init`'s contract).
pub fn init_logging() {
    let filter = std::env::var(LEPTON_LOG)
        .or_else(|_| std::env::var(RUST_LOG))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    let _ = env_logger::Builder::new().parse_filters(&filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lepton_log_takes_precedence_over_rust_log() {
        std::env::set_var(RUST_LOG, "error");
        std::env::set_var(LEPTON_LOG, "debug");
        let resolved = std::env::var(LEPTON_LOG)
            .or_else(|_| std::env::var(RUST_LOG))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        assert_eq!(resolved, "debug");
        std::env::remove_var(LEPTON_LOG);
        std::env::remove_var(RUST_LOG);
    }

    #[test]
    fn falls_back_to_rust_log_then_default() {
        std::env::remove_var(LEPTON_LOG);
        std::env::remove_var(RUST_LOG);
        let resolved = std::env::var(LEPTON_LOG)
            .or_else(|_| std::env::var(RUST_LOG))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        assert_eq!(resolved, DEFAULT_FILTER);

        std::env::set_var(RUST_LOG, "warn");
        let resolved = std::env::var(LEPTON_LOG)
            .or_else(|_| std::env::var(RUST_LOG))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        assert_eq!(resolved, "warn");
        std::env::remove_var(RUST_LOG);
    }
}
