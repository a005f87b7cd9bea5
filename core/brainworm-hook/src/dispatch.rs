//! Per-invocation wiring: parse stdin, locate the project, construct the
//! collaborators, route to the handler, append the event row, write stdout.
//!
//! Handlers never construct their own stores; they receive the capability
//! set built here. The event append happens exactly once per invocation,
//! after the handler returns, enriched with the universal fields.

use std::path::PathBuf;

use brainworm_core::config::Config;
use brainworm_core::correlation::CorrelationManager;
use brainworm_core::events::EventStore;
use brainworm_core::flags::Flags;
use brainworm_core::state::StateStore;
use brainworm_core::ProjectPaths;
use brainworm_protocol::{HookInput, HookOutput};
use serde_json::{json, Value};

use crate::diagnostics;
use crate::handlers;
use crate::logging;

/// Capability set handed to every handler.
pub struct HookContext {
    pub paths: ProjectPaths,
    pub config: Config,
    pub state: StateStore,
    pub correlation: CorrelationManager,
    pub events: EventStore,
    pub flags: Flags,
}

/// What a handler produces: the stdout document, the event payload, and an
/// optional top-level duration for fast aggregation.
pub struct HandlerResult {
    pub output: HookOutput,
    pub event_data: Value,
    pub duration_ms: Option<i64>,
}

impl HandlerResult {
    pub fn new(output: HookOutput, event_data: Value) -> Self {
        Self {
            output,
            event_data,
            duration_ms: None,
        }
    }
}

/// Runs one hook invocation end to end. Returns the process exit code.
pub fn run(raw_input: &str, event_override: Option<&str>) -> i32 {
    if raw_input.trim().is_empty() {
        // Nothing to handle; the host sometimes probes with an empty body.
        return 0;
    }

    let input: HookInput = match serde_json::from_str(raw_input) {
        Ok(input) => input,
        Err(err) => {
            // Malformed input is a validation outcome: the host must
            // continue, so answer on stdout and exit clean.
            let output = HookOutput::Invalid {
                field: "hook_event_name",
                message: format!("payload is not a recognized hook input: {err}"),
            };
            print_output(&output.to_json(brainworm_protocol::HookEventName::Notification));
            return 0;
        }
    };

    let event = input.hook_event_name;

    let cwd = input
        .cwd
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let paths = ProjectPaths::locate(&cwd);

    let config = match Config::load(&paths.config_file()) {
        Ok(config) => config,
        Err(err) => {
            diagnostics::print_fatal_error("loading .brainworm/config.toml", &err);
            return 1;
        }
    };

    logging::init(&paths.logs_dir(), &config);

    if let Some(claimed) = event_override {
        if claimed != event.as_str() {
            tracing::warn!(
                claimed,
                actual = event.as_str(),
                "event name argument disagrees with payload; payload wins"
            );
        }
    }

    // The event store must open before any handler runs; a hook that cannot
    // record its invocation must not pretend it handled one.
    let events = match EventStore::open(&paths.events_db()) {
        Ok(events) => events,
        Err(err) => {
            diagnostics::print_fatal_error("opening the event database", &err);
            return 1;
        }
    };

    let ctx = HookContext {
        state: StateStore::new(paths.unified_state_file()),
        correlation: CorrelationManager::new(paths.correlation_file()),
        flags: Flags::new(paths.flags_dir()),
        paths,
        config,
        events,
    };

    let execution_id = input
        .execution_id
        .clone()
        .unwrap_or_else(|| ulid::Ulid::new().to_string().to_lowercase());

    tracing::debug!(
        event = event.as_str(),
        session = input.session_id.as_deref().unwrap_or("-"),
        execution = %execution_id,
        "dispatching hook event"
    );

    let result = match input.missing_field() {
        Some(field) => HandlerResult::new(
            HookOutput::Invalid {
                field,
                message: format!("{} requires the {field} field", event.as_str()),
            },
            json!({ "validation_failed": { "missing_field": field } }),
        ),
        None => match handlers::dispatch(event, &ctx, &input) {
            Ok(result) => result,
            Err(err) if err.is_fatal() => {
                diagnostics::print_fatal_error(
                    &format!("handling {} event", event.as_str()),
                    &err,
                );
                return 1;
            }
            Err(err) => {
                tracing::warn!(error = %err, event = event.as_str(), "handler reported a validation error");
                HandlerResult::new(
                    HookOutput::Invalid {
                        field: "input",
                        message: err.to_string(),
                    },
                    json!({ "validation_failed": { "message": err.to_string() } }),
                )
            }
        },
    };

    let mut event_data = result.event_data;
    if let Value::Object(map) = &mut event_data {
        if let Some(mode) = &input.permission_mode {
            map.insert("permission_mode".to_string(), json!(mode));
        }
        map.insert("cwd".to_string(), json!(cwd.to_string_lossy()));
    }

    let correlation_id = resolve_correlation(&ctx, input.session_id.as_deref());

    if let Err(err) = ctx.events.log(
        event.as_str(),
        input.session_id.as_deref(),
        correlation_id.as_deref(),
        Some(&execution_id),
        &event_data,
        result.duration_ms,
    ) {
        diagnostics::print_fatal_error("appending to the event log", &err);
        return 1;
    }

    print_output(&result.output.to_json(event));
    0
}

/// The correlation manager is authoritative for session↔task linkage; the
/// unified state's correlation field is the fallback for sessions the
/// manager has not seen.
fn resolve_correlation(ctx: &HookContext, session_id: Option<&str>) -> Option<String> {
    if let Some(session_id) = session_id {
        match ctx.correlation.lookup(session_id) {
            Ok(Some(correlation_id)) => return Some(correlation_id),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "correlation lookup failed; falling back to unified state");
            }
        }
    }
    ctx.state
        .get_state()
        .ok()
        .and_then(|state| state.correlation_id)
}

fn print_output(value: &Value) {
    // stdout is the host contract; a broken pipe here is the host's problem
    // and not worth a panic.
    let serialized = value.to_string();
    println!("{serialized}");
}
