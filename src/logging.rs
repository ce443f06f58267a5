//! ログ初期化
//!
//! RUST_LOG があればそれに従い、なければ --verbose で debug、通常は warn

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_level = if verbose {
        "fashion_finder=debug,warn"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 二重初期化（テスト等）は無視
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
