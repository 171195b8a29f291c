//! Minimal multipart/form-data writer for JSON file parts.
//!
//! The receiving service splits the body on the literal boundary markers, so framing has to be
//! byte-exact:
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{field}"; filename="{file}"\r\n
//! Content-Type: application/json; charset=UTF-8\r\n
//! Content-Transfer-Encoding: binary\r\n
//! \r\n
//! {content}\r\n
//! --{boundary}--
//! ```
//!
//! The terminator is written exactly once, by [`MultipartWriter::close`].
//! [`MultipartWriter::scoped`] closes the writer even when attaching fails, and dropping an open
//! writer writes the terminator on a best-effort basis.

use std::io::Write;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::MultipartError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
}

pub struct MultipartWriter<W: Write> {
    sink: Option<W>,
    boundary: String,
    state: State,
}

impl<W: Write> MultipartWriter<W> {
    pub fn new(sink: W, boundary: impl Into<String>) -> Self {
        Self {
            sink: Some(sink),
            boundary: boundary.into(),
            state: State::Open,
        }
    }

    /// Runs `body` against a fresh writer and always closes it afterwards.
    ///
    /// An error from `body` takes precedence over an error from closing.
    pub fn scoped<F>(sink: W, boundary: impl Into<String>, body: F) -> Result<W, MultipartError>
    where
        F: FnOnce(&mut Self) -> Result<(), MultipartError>,
    {
        let mut writer = Self::new(sink, boundary);
        let result = body(&mut writer);
        let closed = writer.close();
        result?;
        closed?;
        writer.into_inner()
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// `multipart/form-data; boundary=...` header value for this writer.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    fn sink(&mut self) -> Result<&mut W, MultipartError> {
        match (self.state, self.sink.as_mut()) {
            (State::Open, Some(sink)) => Ok(sink),
            _ => Err(MultipartError::IllegalState("writer is already closed")),
        }
    }

    /// Reads `path` and writes it as one part, using the file's base name as `filename`.
    pub fn attach_file(&mut self, field_name: &str, path: &Path) -> Result<(), MultipartError> {
        // Fail on misuse before touching the file system.
        self.sink()?;
        let content = crate::crawl::read_file(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.attach_bytes(field_name, &file_name, &content)
    }

    /// Writes `content` as one part. Content is decoded as UTF-8; invalid sequences are replaced.
    pub fn attach_bytes(
        &mut self,
        field_name: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), MultipartError> {
        let boundary = self.boundary.clone();
        let name = escape_parameter(field_name);
        let filename = escape_parameter(file_name);
        let sink = self.sink()?;
        write!(sink, "--{boundary}\r\n")?;
        write!(
            sink,
            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
        )?;
        sink.write_all(b"Content-Type: application/json; charset=UTF-8\r\n")?;
        sink.write_all(b"Content-Transfer-Encoding: binary\r\n\r\n")?;
        sink.write_all(String::from_utf8_lossy(content).as_bytes())?;
        sink.write_all(b"\r\n")?;
        debug!(
            field = field_name,
            file = file_name,
            bytes = content.len(),
            "Attached multipart field"
        );
        Ok(())
    }

    /// Writes `--{boundary}--` and flushes. Calling it twice is an `IllegalState` error.
    pub fn close(&mut self) -> Result<(), MultipartError> {
        self.sink()?;
        self.state = State::Closed;
        let sink = self
            .sink
            .as_mut()
            .ok_or(MultipartError::IllegalState("sink already released"))?;
        write!(sink, "--{}--", self.boundary)?;
        sink.flush()?;
        Ok(())
    }

    /// Releases the sink. Only valid once the writer is closed.
    pub fn into_inner(mut self) -> Result<W, MultipartError> {
        if self.state != State::Closed {
            return Err(MultipartError::IllegalState("writer must be closed first"));
        }
        self.sink
            .take()
            .ok_or(MultipartError::IllegalState("sink already released"))
    }
}

/// Percent-escapes `"`, CR and LF in a quoted `Content-Disposition` parameter, as HTML form
/// submission does.
fn escape_parameter(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl<W: Write> Drop for MultipartWriter<W> {
    fn drop(&mut self) {
        if self.state == State::Open && self.sink.is_some() {
            if let Err(e) = self.close() {
                warn!(error = %e, "Failed to terminate multipart body on drop");
            }
        }
    }
}
