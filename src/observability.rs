use biometrics::{Collector, Counter, Moments};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub(crate) static RELAY_REQUESTS: Counter = Counter::new("apex.relay.requests");
pub(crate) static RELAY_REJECTED: Counter = Counter::new("apex.relay.rejected");
pub(crate) static RELAY_UPSTREAM_ERRORS: Counter = Counter::new("apex.relay.upstream_errors");
pub(crate) static RELAY_FRAGMENTS: Counter = Counter::new("apex.relay.fragments");
pub(crate) static RELAY_STREAM_DURATION: Moments =
    Moments::new("apex.relay.stream_duration_seconds");

pub(crate) static UPSTREAM_REQUESTS: Counter = Counter::new("apex.upstream.requests");
pub(crate) static UPSTREAM_REQUEST_ERRORS: Counter = Counter::new("apex.upstream.request_errors");

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("apex.client.requests");
pub(crate) static CLIENT_CHUNKS: Counter = Counter::new("apex.client.chunks");
pub(crate) static CLIENT_ERRORS: Counter = Counter::new("apex.client.errors");
pub(crate) static CLIENT_DANGLING_STREAMS: Counter =
    Counter::new("apex.client.dangling_streams");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&RELAY_REQUESTS);
    collector.register_counter(&RELAY_REJECTED);
    collector.register_counter(&RELAY_UPSTREAM_ERRORS);
    collector.register_counter(&RELAY_FRAGMENTS);
    collector.register_moments(&RELAY_STREAM_DURATION);

    collector.register_counter(&UPSTREAM_REQUESTS);
    collector.register_counter(&UPSTREAM_REQUEST_ERRORS);

    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_CHUNKS);
    collector.register_counter(&CLIENT_ERRORS);
    collector.register_counter(&CLIENT_DANGLING_STREAMS);
}

/// Install the global tracing subscriber for a binary.
///
/// `RUST_LOG` overrides `default_directive`.  Logs go to stderr so they never
/// mix with streamed output on stdout.
pub fn init_tracing(default_directive: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_with_a_collector() {
        register_biometrics(Collector::new());
    }

    #[test]
    fn bad_default_directive_is_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(init_tracing("apex=notalevel").is_err());
        }
    }
}
