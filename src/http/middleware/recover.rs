//! Panic recovery middleware.
//!
//! # Responsibilities
//! - Catch panics raised anywhere inside the wrapped handler
//! - Log a [`PanicReport`] with the request details, the panic location and
//!   a backtrace of the panicking frames
//! - Answer 500 instead of tearing down the connection
//!
//! # Design Decisions
//! - The inner call happens inside the caught future, so panics raised while
//!   building the future are caught too
//! - A process-wide panic hook (installed once, chained to the previous hook)
//!   records location and backtrace in a thread-local slot before unwinding;
//!   the catching poll runs on the same thread and takes the slot

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::FutureExt;
use serde::Serialize;

use crate::http::handler::{BoxedHandler, Middleware};
use crate::http::{Request, Response};

/// Structured record of a recovered panic.
#[derive(Debug, Clone, Serialize)]
pub struct PanicReport {
    pub timestamp_ms: u128,
    pub trace_id: Option<String>,
    pub url: String,
    pub method: String,
    pub error: String,
    /// `file:line:column` of the panic, when the hook saw it.
    pub location: Option<String>,
    pub backtrace: String,
    pub user_agent: Option<String>,
    pub remote_addr: Option<SocketAddr>,
}

/// Where and how a panic was raised, as seen by the panic hook.
struct PanicSite {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

fn install_panic_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let site = PanicSite {
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
                backtrace: Backtrace::force_capture().to_string(),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(site));
            previous(info);
        }));
    });
}

fn take_panic_site() -> Option<PanicSite> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Recover panics and log the report.
pub fn recover() -> impl Middleware {
    recover_with(log_panic)
}

/// Recover panics and hand each report to `on_panic`.
pub fn recover_with<F>(on_panic: F) -> impl Middleware
where
    F: Fn(&PanicReport) + Send + Sync + 'static,
{
    install_panic_hook();
    let on_panic = Arc::new(on_panic);

    move |next: BoxedHandler| -> BoxedHandler {
        let on_panic = on_panic.clone();
        Arc::new(move |req: Request| {
            let next = next.clone();
            let on_panic = on_panic.clone();
            async move {
                let trace_id = req.context().trace_id().map(str::to_string);
                let url = req.url();
                let method = req.method.clone();
                let user_agent = req.user_agent.clone();
                let remote_addr = req.remote_addr;

                let outcome = AssertUnwindSafe(async move { next.call(req).await })
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(response) => response,
                    Err(payload) => {
                        let site = take_panic_site();
                        let report = PanicReport {
                            timestamp_ms: SystemTime::now()
                                .duration_since(UNIX_EPOCH)
                                .map(|d| d.as_millis())
                                .unwrap_or_default(),
                            trace_id,
                            url,
                            method,
                            error: panic_message(payload.as_ref()),
                            location: site.as_ref().and_then(|s| s.location.clone()),
                            backtrace: site
                                .map(|s| s.backtrace)
                                .unwrap_or_else(|| Backtrace::force_capture().to_string()),
                            user_agent,
                            remote_addr,
                        };
                        on_panic(&report);
                        Response::internal_error("internal server error")
                    }
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_panic(report: &PanicReport) {
    match serde_json::to_string(report) {
        Ok(json) => tracing::error!(
            trace_id = report.trace_id.as_deref().unwrap_or_default(),
            error = %report.error,
            location = report.location.as_deref().unwrap_or_default(),
            report = %json,
            "Recovered from panic"
        ),
        Err(e) => tracing::error!(
            error = %report.error,
            serialize_error = %e,
            "Recovered from panic"
        ),
    }
}
