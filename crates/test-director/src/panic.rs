//! Panic capture while procedures run
//!
//! A process-wide hook is installed on first use. While a procedure is being
//! called or polled, panics on that thread are recorded (location and trace)
//! instead of printed; everything else is forwarded to the previous hook.

use crate::registry::TestResult;
use crate::thrown::{capture_trace, Thrown};
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::cell::{Cell, RefCell};
use std::future::poll_fn;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

struct PanicCapture {
    location: Option<String>,
    trace: Option<String>,
}

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST: RefCell<Option<PanicCapture>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }

            let capture = PanicCapture {
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
                trace: capture_trace(),
            };
            LAST.with(|last| *last.borrow_mut() = Some(capture));
        }));
    });
}

/// Marks the current thread as running a procedure
struct Capturing;

impl Capturing {
    fn enter() -> Self {
        install_hook();
        // A panic the previous procedure caught itself leaves its capture behind
        LAST.with(|last| last.borrow_mut().take());
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Capturing
    }
}

impl Drop for Capturing {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn caught(payload: Box<dyn std::any::Any + Send>) -> Thrown {
    let capture = LAST.with(|last| last.borrow_mut().take());
    let (location, trace) = match capture {
        Some(capture) => (capture.location, capture.trace),
        None => (None, None),
    };
    Thrown::from_panic(payload, location, trace)
}

/// Call `f`, turning a panic into a [`Thrown`]
pub(crate) fn call<R>(f: impl FnOnce() -> R) -> Result<R, Thrown> {
    let _capturing = Capturing::enter();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(caught)
}

/// Drive a procedure's future to completion, turning a panic into a [`Thrown`]
pub(crate) async fn settle(future: LocalBoxFuture<'static, TestResult>) -> TestResult {
    let mut future = AssertUnwindSafe(future).catch_unwind();
    let outcome = poll_fn(|cx| {
        let _capturing = Capturing::enter();
        future.poll_unpin(cx)
    })
    .await;

    outcome.unwrap_or_else(|payload| Err(caught(payload)))
}
