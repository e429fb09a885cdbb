//! Asynchronous single-GET HTTP client over raw `std::net` sockets.
//!
//! Each `HttpRequest` owns one worker thread which resolves, connects, sends
//! the request, and receives a `Content-Length` delimited body. The owner
//! polls progress and completion without blocking; dropping the request
//! joins the worker.

mod error;
mod response;
mod target;
mod worker;

pub use error::RequestError;

use crate::config::RequestOptions;
use socket2::Socket;
use std::net::Shutdown;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

/// State shared between the owner and the worker. Every field is read and
/// written under the one lock; nothing blocks on I/O while holding it.
#[derive(Debug, Default)]
struct RequestState {
    progress: u64,
    expected_size: Option<u64>,
    canceled: bool,
    /// Second handle to the socket, published before connect, so `cancel`
    /// can shut it down at any point after creation.
    socket: Option<Socket>,
    /// `Some` exactly once the worker has finished.
    outcome: Option<Result<Vec<u8>, RequestError>>,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: Mutex<RequestState>,
    /// Test hook: the worker waits on this after resolving, before it
    /// creates a socket.
    #[cfg(test)]
    hold_before_socket: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.lock().canceled
    }

    /// Publish the socket before connecting. Fails if `cancel` already ran,
    /// in which case nobody else will ever shut the socket down.
    pub(crate) fn attach_socket(&self, socket: &Socket) -> Result<(), RequestError> {
        let mut state = self.lock();
        if state.canceled {
            return Err(RequestError::Canceled);
        }
        let handle = socket.try_clone().map_err(RequestError::Socket)?;
        state.socket = Some(handle);
        Ok(())
    }

    pub(crate) fn detach_socket(&self) {
        self.lock().socket = None;
    }

    pub(crate) fn set_expected_size(&self, size: u64) {
        self.lock().expected_size = Some(size);
    }

    pub(crate) fn set_progress(&self, bytes: u64) {
        let mut state = self.lock();
        state.progress = state.progress.max(bytes);
    }

    #[cfg(test)]
    pub(crate) fn wait_before_socket(&self) {
        let hold = self
            .hold_before_socket
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(rx) = hold {
            let _ = rx.recv();
        }
    }

    #[cfg(not(test))]
    pub(crate) fn wait_before_socket(&self) {}

    fn finish(&self, outcome: Result<Vec<u8>, RequestError>) {
        let mut state = self.lock();
        state.socket = None;
        state.outcome = Some(outcome);
    }
}

/// One asynchronous HTTP GET. The worker starts in [`HttpRequest::start`].
#[derive(Debug)]
pub struct HttpRequest {
    url: String,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl HttpRequest {
    /// Start a GET for `url` on a new worker thread. Never blocks.
    ///
    /// If the thread cannot be spawned the request is returned already done
    /// and failed.
    pub fn start(url: impl Into<String>, options: RequestOptions) -> Self {
        Self::spawn(url.into(), options, Arc::new(Shared::default()))
    }

    fn spawn(url: String, options: RequestOptions, shared: Arc<Shared>) -> Self {
        let worker_shared = Arc::clone(&shared);
        let worker_url = url.clone();
        let spawned = std::thread::Builder::new()
            .name("dlcache-request".to_string())
            .spawn(move || {
                let outcome = worker::fetch(&worker_url, &worker_shared, options);
                match &outcome {
                    Ok(body) => {
                        tracing::debug!(url = %worker_url, bytes = body.len(), "request succeeded")
                    }
                    Err(e) if e.is_canceled() => {
                        tracing::debug!(url = %worker_url, "request canceled")
                    }
                    Err(e) => tracing::debug!(url = %worker_url, "request failed: {}", e),
                }
                worker_shared.finish(outcome);
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(url = %url, "could not spawn request worker: {}", e);
                shared.finish(Err(RequestError::Spawn(e)));
                None
            }
        };

        Self {
            url,
            shared,
            worker,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body bytes received so far. Monotonic; 0 until headers are parsed.
    pub fn progress(&self) -> u64 {
        self.shared.lock().progress
    }

    /// `Content-Length` once the response headers are parsed.
    pub fn expected_size(&self) -> Option<u64> {
        self.shared.lock().expected_size
    }

    pub fn is_done(&self) -> bool {
        self.shared.lock().outcome.is_some()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.shared.lock().outcome, Some(Ok(_)))
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.is_canceled()
    }

    /// Length of the finished body, or `None` unless done and successful.
    pub fn result_len(&self) -> Option<usize> {
        match &self.shared.lock().outcome {
            Some(Ok(body)) => Some(body.len()),
            _ => None,
        }
    }

    /// Request cancellation. Safe from any thread and safe to repeat.
    ///
    /// Sets the flag and, once the worker has created its socket, shuts it
    /// down both ways so a blocked connect, send or recv returns and the
    /// worker exits.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        state.canceled = true;
        if let Some(socket) = &state.socket {
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    /// Hand over the body (or the failure) of a finished request.
    ///
    /// A request that is not done yet comes back unchanged in `Err`; this
    /// never waits on the network. Once done, the worker has published its
    /// outcome and joining it only waits for the thread to return.
    pub fn into_result(mut self) -> Result<Result<Vec<u8>, RequestError>, Self> {
        if !self.is_done() {
            return Err(self);
        }
        self.join_worker();
        let outcome = self
            .shared
            .lock()
            .outcome
            .take()
            .unwrap_or(Err(RequestError::Canceled));
        Ok(outcome)
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!(url = %self.url, "request worker panicked");
                let mut state = self.shared.lock();
                if state.outcome.is_none() {
                    state.outcome = Some(Err(RequestError::Canceled));
                }
            }
        }
    }
}

impl Drop for HttpRequest {
    fn drop(&mut self) {
        self.join_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn wait_done(req: &HttpRequest) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !req.is_done() {
            assert!(Instant::now() < deadline, "request did not finish");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn finished(req: HttpRequest) -> Result<Vec<u8>, RequestError> {
        req.into_result().expect("request is done")
    }

    #[test]
    fn malformed_urls_finish_failed() {
        for url in ["not-a-url", "ftp://host/"] {
            let req = HttpRequest::start(url, RequestOptions::default());
            wait_done(&req);
            assert!(!req.is_success());
            assert_eq!(req.progress(), 0);
            assert_eq!(req.expected_size(), None);
            assert!(req.result_len().is_none());
            assert!(matches!(
                finished(req),
                Err(RequestError::InvalidUrl { .. })
            ));
        }
    }

    #[test]
    fn cancel_is_repeatable_and_flags_request() {
        let req = HttpRequest::start("not-a-url", RequestOptions::default());
        req.cancel();
        req.cancel();
        assert!(req.is_canceled());
        wait_done(&req);
        assert!(!req.is_success());
    }

    #[test]
    fn cancel_before_socket_never_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let (release, hold) = mpsc::channel();
        let shared = Shared {
            hold_before_socket: Mutex::new(Some(hold)),
            ..Shared::default()
        };
        let req = HttpRequest::spawn(
            format!("http://{addr}/a"),
            RequestOptions::default(),
            Arc::new(shared),
        );
        req.cancel();
        release.send(()).unwrap();
        wait_done(&req);

        assert!(req.is_canceled());
        assert!(matches!(finished(req), Err(RequestError::Canceled)));
        // Nothing reached the listen backlog.
        let accepted = listener.accept();
        assert!(matches!(accepted, Err(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn into_result_hands_back_running_request() {
        // Accepted by the kernel, never answered.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let req = HttpRequest::start(format!("http://{addr}/slow"), RequestOptions::default());

        let started = Instant::now();
        let req = match req.into_result() {
            Err(req) => req,
            Ok(outcome) => panic!("stalled request finished: {outcome:?}"),
        };
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!req.is_done());

        req.cancel();
        wait_done(&req);
        assert!(matches!(finished(req), Err(RequestError::Canceled)));
    }

    #[test]
    fn connection_refused_fails() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let req = HttpRequest::start(
            format!("http://127.0.0.1:{port}/gone"),
            RequestOptions::default(),
        );
        wait_done(&req);
        assert!(!req.is_success());
        assert!(matches!(
            finished(req),
            Err(RequestError::Connect { .. })
        ));
    }
}
