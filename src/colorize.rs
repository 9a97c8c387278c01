use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::palette::{Color, RESET};

/// Forwards lines to a writer, tagging the whole stream with one foreground
/// color.
///
/// With no color this is a transparent pass-through. With a color, the
/// select sequence is written once before the first line and the reset
/// sequence exactly once when the stream is finished, even if no lines were
/// written. Lines are forwarded as they arrive; nothing is buffered, so
/// interleaving with a live process is preserved.
pub struct LineColorizer<W> {
    writer: W,
    color: Option<Color>,
    selected: bool,
}

impl<W: AsyncWrite + Unpin> LineColorizer<W> {
    pub fn new(writer: W, color: Option<Color>) -> Self {
        Self {
            writer,
            color,
            selected: false,
        }
    }

    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if let Some(color) = self.color {
            if !self.selected {
                self.writer.write_all(color.select().as_bytes()).await?;
                self.selected = true;
            }
        }
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Close out the stream. Emits the reset sequence when a color is
    /// configured, then flushes and returns the writer.
    pub async fn finish(mut self) -> std::io::Result<W> {
        if self.color.is_some() {
            self.writer.write_all(RESET.as_bytes()).await?;
        }
        self.writer.flush().await?;
        Ok(self.writer)
    }
}
