use std::io::{self, Stderr, Write};
use std::time::{Duration, Instant};

const BAR_WIDTH: usize = 40;

/// Iterator adapter that draws a textual progress bar while items are
/// consumed. When disabled it yields items and writes nothing.
pub(crate) struct Progress<I, W: Write = Stderr> {
    inner: I,
    total: usize,
    done: usize,
    started: Instant,
    drawn: Option<usize>,
    finished: bool,
    writer: Option<W>,
}

impl<I: ExactSizeIterator> Progress<I, Stderr> {
    pub(crate) fn stderr(inner: I, enabled: bool) -> Self {
        Self::new(inner, enabled.then(io::stderr))
    }
}

impl<I: ExactSizeIterator, W: Write> Progress<I, W> {
    pub(crate) fn new(inner: I, writer: Option<W>) -> Self {
        let total = inner.len();
        Self {
            inner,
            total,
            done: 0,
            started: Instant::now(),
            drawn: None,
            finished: false,
            writer,
        }
    }

    fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        }
    }

    fn draw(&mut self, last: bool) {
        let percent = self.percent();
        if self.drawn == Some(percent) && !last {
            return;
        }
        self.drawn = Some(percent);
        let elapsed = self.started.elapsed();
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let line = render(percent, elapsed);
        let _ = write!(writer, "\r{line}");
        if last {
            let _ = writeln!(writer);
        }
        let _ = writer.flush();
    }

    #[cfg(test)]
    pub(crate) fn into_writer(self) -> Option<W> {
        self.writer
    }
}

impl<I: ExactSizeIterator, W: Write> Iterator for Progress<I, W> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.writer.is_none() || self.finished {
            return self.inner.next();
        }
        if self.drawn.is_none() {
            self.draw(false);
        }
        match self.inner.next() {
            Some(item) => {
                self.done += 1;
                self.draw(false);
                Some(item)
            }
            None => {
                self.draw(true);
                self.finished = true;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

fn render(percent: usize, elapsed: Duration) -> String {
    let filled = BAR_WIDTH * percent.min(100) / 100;
    format!(
        "[{}{}] {:>3}% Completed | {}",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        percent,
        format_elapsed(elapsed)
    )
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}hr {:2}min", secs / 3600, secs % 3600 / 60)
    } else if secs >= 60 {
        format!("{}min {:4.1}s", secs / 60, elapsed.as_secs_f64() % 60.0)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
