//! File content printers.

use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use console::style;
use serde::Serialize;

/// How printed files are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStyle {
    /// Path header followed by the raw content and a blank line.
    Plain { color: bool },
    /// `file: <path>` followed by the content in a fenced block.
    Markdown,
    /// A JSON array of `{"path", "content"}` objects, content base64-encoded.
    Json,
}

#[derive(Serialize)]
struct JsonFileEntry<'a> {
    path: &'a str,
    content: String,
}

struct Sink<W> {
    writer: W,
    json_started: bool,
}

/// Writes files to an output stream. Safe to call from several workers; each
/// file is written as one unit.
pub struct Printer<W: Write> {
    sink: Mutex<Sink<W>>,
    style: OutputStyle,
    files: AtomicU64,
    bytes: AtomicU64,
}

impl<W: Write> Printer<W> {
    pub fn new(writer: W, style: OutputStyle) -> Self {
        Self {
            sink: Mutex::new(Sink {
                writer,
                json_started: false,
            }),
            style,
            files: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Print one file.
    pub fn print_file(&self, rel_path: &str, content: &[u8]) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.style {
            OutputStyle::Plain { color } => {
                if color {
                    writeln!(sink.writer, "{}", style(rel_path).cyan().bold().force_styling(true))?;
                } else {
                    writeln!(sink.writer, "{rel_path}")?;
                }
                sink.writer.write_all(content)?;
                sink.writer.write_all(b"\n\n")?;
            }
            OutputStyle::Markdown => {
                write!(sink.writer, "file: {rel_path}\n\n```\n")?;
                sink.writer.write_all(content)?;
                sink.writer.write_all(b"\n```\n\n")?;
            }
            OutputStyle::Json => {
                let separator = if sink.json_started { ",\n" } else { "[\n" };
                sink.json_started = true;
                let entry = JsonFileEntry {
                    path: rel_path,
                    content: STANDARD.encode(content),
                };
                let json = serde_json::to_string_pretty(&entry).map_err(io::Error::other)?;
                sink.writer.write_all(separator.as_bytes())?;
                for (i, line) in json.lines().enumerate() {
                    if i > 0 {
                        sink.writer.write_all(b"\n")?;
                    }
                    write!(sink.writer, "  {line}")?;
                }
            }
        }

        self.files.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(content.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Close any open structure and flush.
    pub fn finalize(&self) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.style == OutputStyle::Json {
            if sink.json_started {
                sink.writer.write_all(b"\n]\n")?;
            } else {
                sink.writer.write_all(b"[]\n")?;
            }
        }
        sink.writer.flush()
    }

    /// Number of files printed.
    pub fn count(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    /// Content bytes printed, before any encoding.
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.sink
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .writer
    }
}
