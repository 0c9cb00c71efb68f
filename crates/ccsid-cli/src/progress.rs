//! Progress display shared with the log output
//!
//! Log lines and the bar both go to stderr. Every log write suspends the bar
//! so a line never lands in the middle of a redraw.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

/// Bar that stays hidden until [`show`] is called
pub fn progress_bar() -> ProgressBar {
    ProgressBar::hidden()
}

/// Size the bar for `len` CCSIDs and start drawing it if `visible`
pub fn show(progress: &ProgressBar, len: usize, visible: bool) {
    progress.set_length(len as u64);
    progress.set_position(0);
    if !visible {
        return;
    }

    if let Ok(style) =
        ProgressStyle::default_bar().template("{bar:40.green/white} {pos}/{len} {msg}")
    {
        progress.set_style(style);
    }
    progress.set_draw_target(ProgressDrawTarget::stderr());
}

/// Log writer that clears the bar around each write
pub struct LogWriter<W> {
    progress: ProgressBar,
    inner: W,
}

impl<W: Write> LogWriter<W> {
    pub fn new(progress: ProgressBar, inner: W) -> Self {
        Self { progress, inner }
    }
}

impl LogWriter<io::Stderr> {
    pub fn stderr(progress: ProgressBar) -> Self {
        Self::new(progress, io::stderr())
    }
}

impl<W: Write> Write for LogWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.progress.suspend(|| inner.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        let inner = &mut self.inner;
        self.progress.suspend(|| inner.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_log_writer_passes_bytes_through() {
        let progress = progress_bar();
        let mut writer = LogWriter::new(progress, Vec::new());

        writer.write_all(b"ccsid: 37 1100\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.inner, b"ccsid: 37 1100\n".to_vec());
    }

    #[test]
    fn test_hidden_bar_is_sized() {
        let progress = progress_bar();
        progress.inc(3);

        show(&progress, 65534, false);

        assert!(progress.is_hidden());
        assert_eq!(progress.length(), Some(65534));
        assert_eq!(progress.position(), 0);
    }

    #[test]
    fn test_clones_share_the_bar() {
        let progress = progress_bar();
        let writer = LogWriter::stderr(progress.clone());

        show(&progress, 10, false);
        progress.inc(4);

        assert_eq!(writer.progress.position(), 4);
        assert_eq!(writer.progress.length(), Some(10));
    }
}
