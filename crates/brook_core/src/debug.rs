//! Debugging taps

use crate::stream::Stream;
use std::fmt;

/// Log every value written to `stream` as a `tracing` event
///
/// Events are emitted at INFO level under the `brook::log` target with the
/// label and the value's `Debug` rendering. Returns the same stream so the
/// tap can sit inside an expression.
pub fn log<'a, T>(stream: &'a Stream<T>, label: &str) -> &'a Stream<T>
where
    T: Clone + fmt::Debug + 'static,
{
    let label = label.to_owned();
    stream.subscribe(move |value: &T| {
        tracing::info!(target: "brook::log", label = %label, value = ?value, "stream emitted");
    });
    stream
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_returns_same_stream() {
        let s = Stream::<i32>::new();
        assert!(log(&s, "clicks").ptr_eq(&s));
        assert_eq!(s.dependent_count(), 1);
    }

    #[test]
    fn test_log_emits_tracing_event() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let s = Stream::new();
            log(&s, "clicks").set(3);
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("stream emitted"));
        assert!(output.contains("label=clicks"));
        assert!(output.contains("value=3"));
    }
}
