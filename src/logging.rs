use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Appends log lines to the shared log file and optionally echoes them to stdout.
#[derive(Clone)]
pub(crate) struct FileMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
    pub echo_stdout: bool,
}

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: self.file.clone(),
            echo_stdout: self.echo_stdout,
        }
    }
}

pub(crate) struct FileWriter {
    file: Option<Arc<Mutex<File>>>,
    echo_stdout: bool,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = file.write_all(buf); // A full disk must not take the monitor down
        }
        if self.echo_stdout {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = file.flush();
        }
        if self.echo_stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

fn open_log_file(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}

/// Installs the global subscriber. Verbosity follows `RUST_LOG`, default `info`.
///
/// With `echo_stdout` off (interactive screen) log lines only go to the file,
/// and if the file cannot be opened they go nowhere but stderr diagnostics.
pub fn init(log_path: Option<&Path>, echo_stdout: bool) {
    let file = log_path
        .and_then(open_log_file)
        .map(|f| Arc::new(Mutex::new(f)));

    let make_writer = FileMakeWriter { file, echo_stdout };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
