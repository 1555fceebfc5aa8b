use std::{
    sync::{mpsc, Arc},
    time::Duration,
};

use log::warn;

use super::{FetchOutcome, Transport, TransportError};

/// Bounds every call of the wrapped transport.
///
/// The call runs on a helper thread; when the deadline passes the caller gets
/// `TimedOut` and the helper's eventual answer is dropped.
pub struct TimeoutTransport {
    inner: Arc<dyn Transport>,
    timeout: Duration,
}

impl TimeoutTransport {
    pub fn new(inner: Arc<dyn Transport>, timeout: Duration) -> TimeoutTransport {
        TimeoutTransport { inner, timeout }
    }

    fn call<T, F>(&self, location: &str, f: F) -> Result<T, TransportError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Transport, &str) -> Result<T, TransportError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let inner = self.inner.clone();
        let owned_location = location.to_owned();
        std::thread::spawn(move || {
            let _ = sender.send(f(inner.as_ref(), &owned_location));
        });
        match receiver.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("Gave up on {} after {:?}", location, self.timeout);
                Err(TransportError::TimedOut {
                    location: location.to_owned(),
                    timeout: self.timeout,
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(TransportError::Interrupted {
                location: location.to_owned(),
            }),
        }
    }
}

impl Transport for TimeoutTransport {
    fn fetch(&self, location: &str) -> Result<FetchOutcome, TransportError> {
        self.call(location, |transport, location| transport.fetch(location))
    }

    fn probe_exists(&self, location: &str) -> Result<bool, TransportError> {
        self.call(location, |transport, location| transport.probe_exists(location))
    }
}
