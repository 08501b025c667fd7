//! Fault isolation.
//!
//! Three nets catch what the session itself does not:
//!
//! - [`Supervisor::render`] runs view code inside a boundary. An error or
//!   panic there is reported once as a render failure and replaces the view
//!   with a fatal notice for the rest of the process.
//! - [`install_global_handlers`] installs a panic hook that reports panics
//!   raised outside any boundary.
//! - [`spawn_watched`] runs a background task and reports it if it panics or
//!   returns an error nobody awaits.

use std::any::Any;
use std::cell::Cell;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use snapper_common::error::SnapperResult;

use crate::reporter::{ErrorRecord, ErrorReporter, ErrorSource};
use crate::view::render_fatal;

thread_local! {
    static BOUNDARY_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Marks the current thread as inside a boundary that reports its own
/// panics.
struct BoundaryGuard;

impl BoundaryGuard {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|d| d.set(d.get() + 1));
        BoundaryGuard
    }
}

impl Drop for BoundaryGuard {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn in_boundary() -> bool {
    BOUNDARY_DEPTH.with(|d| d.get() > 0)
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owns the render boundary of one view.
pub struct Supervisor {
    reporter: Arc<dyn ErrorReporter>,
    fatal: Mutex<Option<String>>,
}

impl Supervisor {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            reporter,
            fatal: Mutex::new(None),
        }
    }

    /// Run `render` inside the boundary.
    ///
    /// Once any render has failed, `render` is no longer called and the
    /// fatal notice is returned instead.
    pub fn render<F>(&self, render: F) -> String
    where
        F: FnOnce() -> SnapperResult<String>,
    {
        if let Some(message) = self.fatal_message() {
            return render_fatal(&message);
        }

        let outcome = {
            let _guard = BoundaryGuard::enter();
            catch_unwind(AssertUnwindSafe(render))
        };

        let record = match outcome {
            Ok(Ok(view)) => return view,
            Ok(Err(e)) => ErrorRecord::from_error(ErrorSource::Render, &e),
            Err(payload) => ErrorRecord::new(ErrorSource::Render, panic_message(payload.as_ref()))
                .with_detail("panicked while rendering"),
        };
        let message = record.message.clone();
        self.reporter.report(record.with_context("phase", "render"));

        if let Ok(mut fatal) = self.fatal.lock() {
            fatal.get_or_insert(message.clone());
        }
        tracing::warn!("View abandoned after render failure");
        render_fatal(&message)
    }

    /// Message of the failure that abandoned the view, if any.
    pub fn fatal_message(&self) -> Option<String> {
        self.fatal.lock().ok().and_then(|f| f.clone())
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal_message().is_some()
    }
}

/// Keeps the global panic hook installed. Dropping it puts back whatever
/// hook was installed before.
#[must_use = "the panic hook is removed when this guard is dropped"]
pub struct GlobalHandlers {
    restore: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for GlobalHandlers {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            restore();
        }
    }
}

/// Report every panic that happens outside a boundary as a global error.
/// Panics inside a boundary are left to that boundary.
pub fn install_global_handlers(reporter: Arc<dyn ErrorReporter>) -> GlobalHandlers {
    let previous = Arc::new(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    std::panic::set_hook(Box::new(move |info| {
        if in_boundary() {
            return;
        }
        let mut record = ErrorRecord::new(ErrorSource::Global, panic_message(info.payload()));
        if let Some(location) = info.location() {
            record = record.with_detail(format!(
                "at {}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ));
        }
        if let Some(name) = std::thread::current().name() {
            record = record.with_context("thread", name);
        }
        reporter.report(record);
        (*chained)(info);
    }));
    GlobalHandlers {
        restore: Some(Box::new(move || {
            let _ = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| (*previous)(info)));
        })),
    }
}

/// Polls a task with the boundary flag set, so the panic hook leaves its
/// panics to [`spawn_watched`].
struct Watched<F> {
    inner: Pin<Box<F>>,
}

impl<F: Future> Future for Watched<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _guard = BoundaryGuard::enter();
        self.inner.as_mut().poll(cx)
    }
}

/// Spawn a background task whose failure is reported as unhandled.
pub fn spawn_watched<F>(reporter: Arc<dyn ErrorReporter>, name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = SnapperResult<()>> + Send + 'static,
{
    let inner = tokio::spawn(Watched {
        inner: Box::pin(task),
    });
    tokio::spawn(async move {
        match inner.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                reporter.report(ErrorRecord::from_error(ErrorSource::Unhandled, &e).with_context("task", name));
            }
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                reporter.report(
                    ErrorRecord::new(ErrorSource::Unhandled, panic_message(payload.as_ref()))
                        .with_detail("task panicked")
                        .with_context("task", name),
                );
            }
            Err(e) => tracing::debug!(task = name, error = %e, "Watched task cancelled"),
        }
    })
}
