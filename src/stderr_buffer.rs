use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

static BUFFER: Mutex<Option<Vec<String>>> = Mutex::new(None);

fn buffer() -> MutexGuard<'static, Option<Vec<String>>> {
    BUFFER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Activate buffering. While active, log output is stored instead of being
/// written to stderr, so it does not tear the TUI.
pub fn activate() {
    *buffer() = Some(Vec::new());
}

/// Deactivate buffering and return all collected messages.
pub fn drain() -> Vec<String> {
    buffer().take().unwrap_or_default()
}

pub fn is_active() -> bool {
    buffer().is_some()
}

/// Log writer for the tracing subscriber. Each formatted event arrives in
/// one write; it is buffered while the TUI is up and goes to stderr
/// otherwise.
pub struct StderrBufferWriter;

/// Constructor passed to `fmt().with_writer(...)`
pub fn make_writer() -> StderrBufferWriter {
    StderrBufferWriter
}

impl Write for StderrBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = buffer();
        if let Some(lines) = guard.as_mut() {
            let text = String::from_utf8_lossy(buf);
            lines.push(text.trim_end_matches('\n').to_string());
            Ok(buf.len())
        } else {
            drop(guard);
            io::stderr().write(buf)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if is_active() {
            Ok(())
        } else {
            io::stderr().flush()
        }
    }
}
