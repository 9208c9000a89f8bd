/// Trip Planner Client - typed access to the trip-itinerary generation backend.
///
/// The crate covers three concerns:
/// 1. A credential store that persists user-supplied third-party API keys
/// 2. A request client for one-shot plan generation and note previews
/// 3. A streaming client that reports generation progress as it arrives
///
/// # Architecture
///
/// The client uses:
/// - reqwest for HTTP and the chunked progress stream
/// - serde / serde_json for the wire types
/// - a pluggable `KeyValueStore` (in memory or a JSON file) for credentials
/// - tracing for structured logs
///
/// # Example
///
/// ```no_run
/// use trip_planner_client::api::PlannerClient;
/// use trip_planner_client::core::config::ClientConfig;
/// use trip_planner_client::core::models::{ApiKeys, TripPlanRequest};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     trip_planner_client::setup_logging();
///
///     let client = PlannerClient::new(&ClientConfig::from_env()?)?;
///     client.credentials().save(&ApiKeys {
///         llm_api_key: Some("sk-1234567890".to_string()),
///         ..ApiKeys::default()
///     })?;
///
///     let request = TripPlanRequest::new("北京", "2025-06-01", "2025-06-03")?
///         .with_preferences("历史文化")
///         .with_accommodation("经济型酒店");
///
///     let plan = client
///         .generate_plan_stream(&request, |p| {
///             println!("[{}] {} ({})", p.step, p.status, p.progress);
///         })
///         .await?;
///
///     println!("{} days planned for {}", plan.days.len(), plan.city);
///     Ok(())
/// }
/// ```
// Module declarations
pub mod api;
pub mod core;
pub mod errors;

pub use crate::api::PlannerClient;
pub use crate::core::credentials::{CredentialStore, mask_key};
pub use crate::errors::PlannerError;

/// Configure structured logging with a JSON formatter.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// trip_planner_client::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
