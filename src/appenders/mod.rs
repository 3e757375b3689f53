//! Byte sinks and writers
//!
//! A [`Sink`] is the destination formatters' bytes end up in: a file, a
//! rotating file, stderr, or several of them at once. Flushing is an
//! optional capability: a sink without it returns `None` from
//! [`Sink::flush`].
//!
//! [`ChannelWriter`] decouples producers from slow sinks by queueing
//! buffers to a background thread.

pub mod channel_writer;
pub mod log_rotate;
pub mod rotating_file;

pub use channel_writer::{ChannelWriter, ChannelWriterBuilder, WriterState};
pub use log_rotate::{LogRotator, RotateConfig};
pub use rotating_file::{RotatingFileWriter, RotationPolicy, RotationStrategy};

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

/// Destination for whole log buffers
pub trait Sink: Send {
    /// Write the whole buffer
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush buffered data, if the sink buffers at all.
    ///
    /// `None` means the sink has no flush capability.
    fn flush(&mut self) -> Option<io::Result<()>> {
        None
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        (**self).flush()
    }
}

impl<W: Write + Send> Sink for BufWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        Some(Write::flush(self))
    }
}

impl Sink for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }
}

impl Sink for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }
}

impl Sink for io::Stderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        Some(Write::flush(self))
    }
}

impl Sink for io::Stdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        Some(Write::flush(self))
    }
}

/// A sink shared between owners
///
/// Clones write to the same underlying sink. Also usable as an
/// [`io::Write`], so a formatter can write straight into it.
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedSink<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Run `f` with exclusive access to the sink
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Sink> Sink for SharedSink<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> Option<io::Result<()>> {
        self.inner.lock().flush()
    }
}

impl<S: Sink> Write for SharedSink<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Sink::write(&mut *self.inner.lock(), buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Sink::flush(&mut *self.inner.lock()).unwrap_or(Ok(()))
    }
}

/// Tee: every buffer goes to each sink in order
///
/// A failing sink does not stop the others; the first error is returned
/// once all sinks have been tried.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn Sink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for MultiSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.write(buf) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Flushes every sink that can be flushed; `None` if none can.
    fn flush(&mut self) -> Option<io::Result<()>> {
        let mut flushed = false;
        let mut first_err = None;
        for sink in &mut self.sinks {
            match sink.flush() {
                None => {}
                Some(Ok(())) => flushed = true,
                Some(Err(e)) => {
                    flushed = true;
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Some(Err(e)),
            None if flushed => Some(Ok(())),
            None => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sink;
    use parking_lot::Mutex;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Records every buffer and flush it receives
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
        pub flushes: Arc<AtomicUsize>,
        pub flushable: bool,
    }

    impl RecordingSink {
        pub fn flushable() -> Self {
            Self {
                flushable: true,
                ..Self::default()
            }
        }

        pub fn num_writes(&self) -> usize {
            self.writes.lock().len()
        }

        pub fn num_flushes(&self) -> usize {
            self.flushes.load(Ordering::SeqCst)
        }

        pub fn contents(&self) -> Vec<Vec<u8>> {
            self.writes.lock().clone()
        }
    }

    impl Sink for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            self.writes.lock().push(buf.to_vec());
            Ok(())
        }

        fn flush(&mut self) -> Option<io::Result<()>> {
            if !self.flushable {
                return None;
            }
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Some(Ok(()))
        }
    }

    /// Fails every write
    pub struct FailingSink;

    impl Sink for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            Err(io::Error::other("disk on fire"))
        }
    }
}
