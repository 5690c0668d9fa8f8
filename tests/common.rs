//! Shared test setup. `init_tracing` is cheap to call from every test
//! that wants log output under `--nocapture`; `tracing_subscriber`'s
//! `try_init` means only the first caller in a test binary actually
//! installs a subscriber.

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
