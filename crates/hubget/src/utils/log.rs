use std::io;

use indicatif::MultiProgress;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Installs the global subscriber. `RUST_LOG` replaces the level chosen on
/// the command line.
pub fn init(level: Level, multi: &MultiProgress) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,hubget={level},hubget_fetch={level},hubget_fs={level}"))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(console::colors_enabled_stderr())
        .with_writer(BarWriter {
            multi: multi.clone(),
        })
        .try_init();
}

/// Writes log lines above the progress bars instead of through them.
#[derive(Clone)]
struct BarWriter {
    multi: MultiProgress,
}

impl<'a> MakeWriter<'a> for BarWriter {
    type Writer = BarLine;

    fn make_writer(&'a self) -> Self::Writer {
        BarLine {
            multi: self.multi.clone(),
            buf:   Vec::new(),
        }
    }
}

/// One formatted event, emitted on drop.
struct BarLine {
    multi: MultiProgress,
    buf:   Vec<u8>,
}

impl io::Write for BarLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl Drop for BarLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end_matches('\n');
        // A hidden MultiProgress swallows println.
        if self.multi.is_hidden() || self.multi.println(line).is_err() {
            eprintln!("{line}");
        }
    }
}
