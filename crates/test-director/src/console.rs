//! Grouped console output
//!
//! Every line written through a [`Console`] is indented by the current group
//! depth. Groups are scoped: [`Console::group`] returns a guard and the depth
//! drops back when the guard is dropped, on unwinding too.

use director_config::loader::DEFAULT_INDENT;
use director_config::ColorChoice;
use std::cell::{Cell, RefCell};
use std::io::{self, Write};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

struct Inner {
    depth: Cell<usize>,
    indent: Cell<usize>,
    stdout: RefCell<Box<dyn Write>>,
    stderr: RefCell<Box<dyn Write>>,
}

/// Shared handle to an indentation-aware pair of output streams
#[derive(Clone)]
pub struct Console {
    inner: Rc<Inner>,
}

thread_local! {
    static STDIO: Console = Console::new(io::stdout(), io::stderr());
}

impl Console {
    /// Console over arbitrary writers
    pub fn new(stdout: impl Write + 'static, stderr: impl Write + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                depth: Cell::new(0),
                indent: Cell::new(DEFAULT_INDENT),
                stdout: RefCell::new(Box::new(stdout)),
                stderr: RefCell::new(Box::new(stderr)),
            }),
        }
    }

    /// The process streams; one shared handle per thread so nested runs and
    /// procedure output line up
    pub fn stdio() -> Self {
        STDIO.with(Console::clone)
    }

    /// Console that records everything written to it
    pub fn capture() -> (Self, Captured) {
        let captured = Captured::default();
        let console = Self::new(captured.stdout.clone(), captured.stderr.clone());
        (console, captured)
    }

    pub fn set_indent(&self, indent: usize) {
        self.inner.indent.set(indent);
    }

    /// Spaces per group level
    pub fn indent(&self) -> usize {
        self.inner.indent.get()
    }

    /// Current group depth
    pub fn depth(&self) -> usize {
        self.inner.depth.get()
    }

    /// Write to stdout
    pub fn info(&self, text: &str) {
        self.write(Stream::Stdout, text);
    }

    /// Write to stderr
    pub fn error(&self, text: &str) {
        self.write(Stream::Stderr, text);
    }

    /// Write `label` to stdout and indent until the guard drops
    pub fn group(&self, label: &str) -> Group {
        self.write(Stream::Stdout, label);
        self.inner.depth.set(self.inner.depth.get() + 1);
        Group {
            console: self.clone(),
        }
    }

    fn close(&self) {
        let depth = self.inner.depth.get();
        self.inner.depth.set(depth.saturating_sub(1));
    }

    fn write(&self, stream: Stream, text: &str) {
        let prefix = " ".repeat(self.inner.depth.get() * self.inner.indent.get());

        let mut out = String::with_capacity(text.len() + prefix.len() + 1);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&prefix);
            out.push_str(line);
        }
        out.push('\n');

        let sink = match stream {
            Stream::Stdout => &self.inner.stdout,
            Stream::Stderr => &self.inner.stderr,
        };
        let mut sink = sink.borrow_mut();
        // Console output is best effort
        let _ = sink.write_all(out.as_bytes());
        let _ = sink.flush();
    }
}

/// Open report group; closes on drop
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct Group {
    console: Console,
}

impl Drop for Group {
    fn drop(&mut self) {
        self.console.close();
    }
}

/// In-memory buffer shared between a writer and its reader
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Output recorded by [`Console::capture`]
#[derive(Clone, Default)]
pub struct Captured {
    stdout: SharedBuffer,
    stderr: SharedBuffer,
}

impl Captured {
    pub fn stdout(&self) -> String {
        self.stdout.contents()
    }

    pub fn stderr(&self) -> String {
        self.stderr.contents()
    }
}

/// Apply a color choice to all styled output of the process
pub fn set_color_choice(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => colored::control::unset_override(),
    }
}

/// Print to stdout through this thread's shared console
pub fn info(text: &str) {
    Console::stdio().info(text);
}

/// Print to stderr through this thread's shared console
pub fn error(text: &str) {
    Console::stdio().error(text);
}
