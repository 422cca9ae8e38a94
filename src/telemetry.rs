//! Capture the commands issued through client handles as structured logs

use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Compose multiple layers into a `tracing` subscriber that writes JSON formatted records
/// to `sink`. `RUST_LOG`, when set, takes precedence over `env_filter`.
///
/// # Implementation note
///
/// We're using `impl Subscriber` to avoid having to type out the full
/// name of the type. We also mark the returned subscriber to be
/// `Send + Sync` so it can be used with `init_subscriber`.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // A `Sink` implements `MakeWriter` for all possible choices of the lifetime `'a`
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);
    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Register a subscriber as global default to process span data, and forward records
/// emitted through `log` to it.
///
/// It should only be called once, later calls fail.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
