use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` directives are honoured;
/// the service and client crates log at `info` by default.
pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for directive in ["energy_service=info", "energy_client=info"] {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
