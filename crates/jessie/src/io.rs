//! Output plumbing for the `print` builtin.
//!
//! Scripts never write to stdout directly; everything goes through a
//! [`PrintWriter`] supplied by the host, so output can be captured in tests
//! or redirected by embedders.

/// Sink for script output.
pub trait PrintWriter {
    /// Writes raw text. The `print` builtin appends its own newline.
    fn write(&mut self, text: &str);
}

/// Writes script output to stdout.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write(&mut self, text: &str) {
        print!("{text}");
    }
}

/// Discards all script output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write(&mut self, _text: &str) {}
}

/// Collects script output into a string, for tests and embedders.
#[derive(Debug, Default)]
pub struct CollectStringPrint {
    buffer: String,
}

impl PrintWriter for CollectStringPrint {
    fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }
}

impl CollectStringPrint {
    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Consumes the writer and returns the collected output.
    #[must_use]
    pub fn into_output(self) -> String {
        self.buffer
    }
}
