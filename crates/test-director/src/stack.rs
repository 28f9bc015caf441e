//! Trace cleaning
//!
//! Turns a raw trace (a rendered `std::backtrace::Backtrace`, or lines of the
//! form `at symbol (path:line:col)`) into the frames worth showing: header
//! lines are dropped, frames from the runner and the Rust runtime are removed
//! and paths under the working directory are made relative.

use director_config::DirectorConfig;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Crates whose frames never belong to the test itself
pub const INTERNAL_CRATES: &[&str] = &[
    "test_director",
    "std",
    "core",
    "alloc",
    "__rustc",
    "panic_unwind",
    "test",
    "tokio",
    "futures_util",
    "futures_core",
    "futures_executor",
    "futures_task",
];

/// Runtime start-up and unwinding symbols
const INTERNAL_SYMBOLS: &[&str] = &[
    "rust_begin_unwind",
    "_start",
    "main",
    "start_thread",
    "clone",
    "clone3",
    "BaseThreadInitThunk",
    "RtlUserThreadStart",
    "<unknown>",
];

static NUMBERED_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+:\s+(\S.*)$").expect("valid regex"));
static AT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*at\s+(\S.*)$").expect("valid regex"));
static SYMBOL_AND_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+) \((.+:\d+:\d+)\)$").expect("valid regex"));
static LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):(\d+):(\d+)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    symbol: Option<String>,
    location: Option<String>,
}

/// Removes runner and runtime noise from traces
#[derive(Debug, Clone)]
pub struct StackCleaner {
    enabled: bool,
    ignored_crates: Vec<String>,
    cwd: Option<PathBuf>,
}

impl Default for StackCleaner {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_crates: INTERNAL_CRATES.iter().map(|s| s.to_string()).collect(),
            cwd: std::env::current_dir().ok(),
        }
    }
}

impl StackCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cleaner that removes every trace
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn from_config(config: &DirectorConfig) -> Self {
        let mut cleaner = Self::default();
        cleaner.enabled = config.trace_enabled;
        if !config.relative_paths {
            cleaner.cwd = None;
        }
        for name in &config.ignored_crates {
            cleaner = cleaner.ignore_crate(name.as_str());
        }
        cleaner
    }

    /// Also drop frames from `name`
    pub fn ignore_crate(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.ignored_crates.contains(&name) {
            self.ignored_crates.push(name);
        }
        self
    }

    /// Directory paths are made relative to; `None` keeps paths as they are
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clean a trace; an empty string means nothing is left to show
    pub fn clean(&self, trace: &str) -> String {
        if !self.enabled {
            return String::new();
        }

        parse_frames(trace)
            .into_iter()
            .filter(|frame| !self.is_internal(frame))
            .map(|frame| self.render(&frame))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_internal(&self, frame: &Frame) -> bool {
        if frame
            .location
            .as_deref()
            .is_some_and(|location| location.contains("/rustc/"))
        {
            return true;
        }

        match &frame.symbol {
            Some(symbol) => {
                // libc and unwinder entry points, `__rust_begin_short_backtrace` and the like
                symbol.starts_with("__")
                    || INTERNAL_SYMBOLS.contains(&symbol.as_str())
                    || self.ignored_crates.iter().any(|c| c == crate_of(symbol))
            }
            None => frame.location.is_none(),
        }
    }

    fn render(&self, frame: &Frame) -> String {
        let location = frame.location.as_deref().map(|l| self.relativize(l));
        match (&frame.symbol, location) {
            (Some(symbol), Some(location)) => format!("at {} ({})", symbol, location),
            (Some(symbol), None) => format!("at {}", symbol),
            (None, Some(location)) => format!("at {}", location),
            (None, None) => String::new(),
        }
    }

    fn relativize(&self, location: &str) -> String {
        let (path, position) = match LOCATION.captures(location) {
            Some(caps) => (
                caps.get(1).map_or(location, |m| m.as_str()),
                format!(":{}:{}", &caps[2], &caps[3]),
            ),
            None => (location, String::new()),
        };

        let path = path.strip_prefix("./").unwrap_or(path);
        let relative = self
            .cwd
            .as_deref()
            .and_then(|cwd| Path::new(path).strip_prefix(cwd).ok())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| path.to_string());

        format!("{}{}", relative, position)
    }
}

/// The crate a symbol path belongs to, e.g. `core` for
/// `<core::pin::Pin<P> as core::future::Future>::poll`
///
/// For `<Type as Trait>` the crate of the type wins; a generic parameter or a
/// function type has no crate, so the trait's crate is used instead.
fn crate_of(symbol: &str) -> &str {
    let Some((self_ty, trait_path)) = split_qualified(symbol) else {
        return path_crate(symbol);
    };

    let self_ty = strip_type_prefixes(self_ty);
    let has_crate = self_ty.contains("::") && !self_ty.starts_with("fn(");
    match trait_path {
        Some(trait_path) if !has_crate => path_crate(strip_type_prefixes(trait_path)),
        _ => path_crate(self_ty),
    }
}

/// First path segment, without generic arguments
fn path_crate(path: &str) -> &str {
    path.split(|c: char| c == ':' || c == '<')
        .next()
        .unwrap_or(path)
}

fn strip_type_prefixes(mut ty: &str) -> &str {
    loop {
        let stripped = ty
            .trim_start_matches(|c: char| c == '&' || c == '[')
            .trim_start_matches("mut ")
            .trim_start_matches("dyn ")
            .trim_start_matches("*const ")
            .trim_start_matches("*mut ")
            .trim_start_matches("unsafe ")
            .trim_start_matches("extern \"C\" ");
        if stripped == ty {
            return ty;
        }
        ty = stripped;
    }
}

/// Split `<Type as Trait>::rest` into the type and the trait; `<Type>::rest`
/// has no trait
fn split_qualified(symbol: &str) -> Option<(&str, Option<&str>)> {
    let inner = symbol.strip_prefix('<')?;
    let mut depth = 0usize;
    let mut self_end = None;
    let mut prev = '\0';

    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            // `->` in a function type is not a closing bracket
            '>' if prev != '-' => {
                if depth == 0 {
                    return Some(match self_end {
                        Some(end) => (&inner[..end], Some(&inner[end + 4..i])),
                        None => (&inner[..i], None),
                    });
                }
                depth -= 1;
            }
            ' ' if depth == 0 && self_end.is_none() && inner[i..].starts_with(" as ") => {
                self_end = Some(i);
            }
            _ => {}
        }
        prev = c;
    }

    None
}

/// Whether `text` reads as a symbol path rather than prose
fn is_symbol_path(text: &str) -> bool {
    if !text.contains("::") {
        return false;
    }

    let mut depth = 0usize;
    let mut prev = '\0';
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if prev != '-' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return false,
            _ => {}
        }
        prev = c;
    }
    true
}

fn parse_frames(trace: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    // Set while the last frame came from a numbered line and may still get its location
    let mut open = false;

    for line in trace.lines() {
        if let Some(caps) = NUMBERED_FRAME.captures(line) {
            frames.push(Frame {
                symbol: Some(caps[1].trim().to_string()),
                location: None,
            });
            open = true;
        } else if let Some(caps) = AT_LINE.captures(line) {
            let text = caps[1].trim();
            match frames.last_mut() {
                Some(frame) if open && frame.location.is_none() && LOCATION.is_match(text) => {
                    frame.location = Some(text.to_string());
                }
                _ => frames.extend(parse_at(text)),
            }
            open = false;
        } else {
            open = false;
        }
    }

    frames
}

/// A standalone `at ...` line; prose that happens to start with "at" is not a frame
fn parse_at(text: &str) -> Option<Frame> {
    if let Some(caps) = SYMBOL_AND_LOCATION.captures(text) {
        return Some(Frame {
            symbol: Some(caps[1].to_string()),
            location: Some(caps[2].to_string()),
        });
    }

    if LOCATION.is_match(text) {
        Some(Frame {
            symbol: None,
            location: Some(text.to_string()),
        })
    } else if is_symbol_path(text) {
        Some(Frame {
            symbol: Some(text.to_string()),
            location: None,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const BACKTRACE: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::create
             at /rustc/abc/library/std/src/backtrace.rs:331:13
   2: __rustc::rust_begin_unwind
             at /rustc/abc/library/std/src/panicking.rs:689:5
   3: test_director::thrown::capture_trace
             at /work/crates/test-director/src/thrown.rs:138:21
   4: fixtures::suites::fails::{{closure}}
             at /work/crates/director-fixtures/src/suites.rs:12:9
   5: core::ops::function::Fn::call
             at /rustc/abc/library/core/src/ops/function.rs:79:5
   6: <core::pin::Pin<P> as core::future::future::Future>::poll
             at /rustc/abc/library/core/src/future/future.rs:124:9
   7: <fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5
   8: test::run_test::{{closure}}
             at /rustc/abc/library/test/src/lib.rs:666:41
   9: test::__rust_begin_short_backtrace
  10: fixtures::main
             at ./src/main.rs:40:5
  11: std::rt::lang_start::{{closure}}
  12: main
  13: __libc_start_main
  14: _start";

    fn cleaner() -> StackCleaner {
        StackCleaner::new().with_cwd(Some(PathBuf::from("/work")))
    }

    #[test]
    fn test_clean_backtrace() {
        assert_eq!(
            cleaner().clean(BACKTRACE),
            "at fixtures::suites::fails::{{closure}} (crates/director-fixtures/src/suites.rs:12:9)\n\
             at fixtures::main (src/main.rs:40:5)"
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = cleaner().clean(BACKTRACE);
        assert_eq!(cleaner().clean(&once), once);
    }

    #[test]
    fn test_leading_message_lines_removed() {
        let trace = "Error: Message.\nsecond line\n    at app::run (src/app.rs:3:1)\n";
        assert_eq!(cleaner().clean(trace), "at app::run (src/app.rs:3:1)");
    }

    #[test]
    fn test_prose_starting_with_at_is_not_a_frame() {
        let trace = "at least one item failed\n    at app::run (src/app.rs:3:1)";
        assert_eq!(cleaner().clean(trace), "at app::run (src/app.rs:3:1)");
    }

    #[test]
    fn test_runtime_frame_with_symbol_dropped_by_location() {
        let trace = "at <F as app::Check>::run (/rustc/abc/library/core/src/ops/function.rs:250:5)\n\
                     at app::run (src/app.rs:3:1)";
        assert_eq!(cleaner().clean(trace), "at app::run (src/app.rs:3:1)");
    }

    #[test]
    fn test_trace_identical_to_message_is_empty() {
        assert_eq!(cleaner().clean("Message."), "");
    }

    #[test]
    fn test_only_internal_frames_is_empty() {
        let trace = "at std::rt::lang_start (/rustc/x/library/std/src/rt.rs:1:1)\nat main";
        assert_eq!(cleaner().clean(trace), "");
    }

    #[test]
    fn test_location_only_frames() {
        let trace = "at /work/tests/fixture.rs:5:9\nat /rustc/x/library/core/src/ops.rs:1:1";
        assert_eq!(cleaner().clean(trace), "at tests/fixture.rs:5:9");
    }

    #[test]
    fn test_without_cwd_keeps_absolute_paths() {
        let trace = "at app::run (/work/src/app.rs:3:1)";
        let cleaner = StackCleaner::new().with_cwd(None);
        assert_eq!(cleaner.clean(trace), "at app::run (/work/src/app.rs:3:1)");
    }

    #[test]
    fn test_extra_ignored_crate() {
        let trace = "at harness::step (src/h.rs:1:1)\nat app::run (src/app.rs:3:1)";
        let cleaner = cleaner().ignore_crate("harness");
        assert_eq!(cleaner.clean(trace), "at app::run (src/app.rs:3:1)");
    }

    #[test]
    fn test_disabled_cleaner_removes_everything() {
        let trace = "at app::run (src/app.rs:3:1)";
        assert_eq!(StackCleaner::disabled().clean(trace), "");
    }

    #[test]
    fn test_from_config() {
        let config = DirectorConfig {
            relative_paths: false,
            ignored_crates: vec!["harness".to_string()],
            ..DirectorConfig::default()
        };
        let cleaner = StackCleaner::from_config(&config);
        assert!(cleaner.is_enabled());
        assert_eq!(
            cleaner.clean("at harness::x (/a/b.rs:1:1)\nat app::y (/a/c.rs:2:2)"),
            "at app::y (/a/c.rs:2:2)"
        );
    }

    #[rstest]
    #[case("test_director::runner::run", "test_director")]
    #[case("<core::pin::Pin<P> as core::future::Future>::poll", "core")]
    #[case("<&mut F as core::ops::FnOnce>::call_once", "core")]
    #[case("<&F as core::ops::FnOnce>::call_once", "core")]
    #[case(
        "<fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>>::call_once",
        "core"
    )]
    #[case("<app::Checker as core::ops::Fn<()>>::call", "app")]
    #[case("<alloc::vec::Vec<T>>::push", "alloc")]
    #[case("__rustc::rust_begin_unwind", "__rustc")]
    #[case("test::run_test::{{closure}}", "test")]
    #[case("app::main::{{closure}}", "app")]
    #[case("main", "main")]
    fn test_crate_of(#[case] symbol: &str, #[case] expected: &str) {
        assert_eq!(crate_of(symbol), expected);
    }
}
