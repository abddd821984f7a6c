//! The body conduit: a bounded, thread-safe byte-buffer pipe between a
//! network-reader thread (producer) and a handler thread (consumer).
//!
//! Implements spec.md §4.2. The conduit starts in pull mode; at most one
//! listener may be installed, switching it to push mode. Producer calls
//! never block; pull reads may block up to `read_timeout`.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use bytes::Bytes;

use crate::error::ConduitError;

/// Acknowledgement callback chained from `hand_off`'s `on_delivered`
/// through to a listener's own ack, per spec.md §4.2.
pub type Ack = Box<dyn FnOnce(Result<(), ConduitError>) + Send>;

/// Push-mode sink installed via [`BodyConduit::switch_to_listener`].
pub trait BodyListener: Send + Sync {
    /// A buffer has arrived. Call `ack` once it has been consumed so the
    /// producer's backpressure signal can fire.
    fn on_data(&self, data: Bytes, ack: Ack);
    /// The body is complete; delivered strictly after the last `on_data`.
    fn on_complete(&self);
    /// The body failed; `on_complete` will not follow.
    fn on_error(&self, cause: ConduitError);
}

struct ConduitState {
    queue: VecDeque<Bytes>,
    current: Option<(Bytes, usize)>,
    ended: bool,
    listener: Option<Arc<dyn BodyListener>>,
    total_bytes: usize,
    error: Option<ConduitError>,
}

/// FIFO byte-buffer pipe carrying one request body from parser to handler.
pub struct BodyConduit {
    state: Mutex<ConduitState>,
    not_empty: Condvar,
    max_body_size: usize,
    read_timeout: Duration,
}

impl BodyConduit {
    pub fn new(max_body_size: usize, read_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(ConduitState {
                queue: VecDeque::new(),
                current: None,
                ended: false,
                listener: None,
                total_bytes: 0,
                error: None,
            }),
            not_empty: Condvar::new(),
            max_body_size,
            read_timeout,
        }
    }

    /// The canonical, already-closed conduit handed to `on_headers` for a
    /// `Content-Length: 0` request (spec.md §4.1 framing rule 2).
    pub fn empty() -> Arc<Self> {
        let conduit = Self::new(0, Duration::from_secs(0));
        conduit.close();
        Arc::new(conduit)
    }

    // ----- producer side (network-reader thread) --------------------------

    /// Hand an owned buffer off to the conduit. Never blocks. Forwards
    /// directly to an installed listener, or enqueues for the pull reader.
    pub fn hand_off(&self, bytes: Bytes, on_delivered: Ack) -> Result<(), ConduitError> {
        let mut guard = self.state.lock().unwrap();

        if let Some(err) = guard.error {
            drop(guard);
            on_delivered(Err(err));
            return Err(err);
        }

        let new_total = guard.total_bytes + bytes.len();
        if new_total > self.max_body_size {
            guard.error = Some(ConduitError::BudgetExceeded);
            let listener = guard.listener.clone();
            drop(guard);
            log::warn!("body conduit budget exceeded: max {} bytes", self.max_body_size);
            if let Some(listener) = listener {
                listener.on_error(ConduitError::BudgetExceeded);
            }
            on_delivered(Err(ConduitError::BudgetExceeded));
            return Err(ConduitError::BudgetExceeded);
        }
        guard.total_bytes = new_total;

        match guard.listener.clone() {
            Some(listener) => {
                drop(guard);
                listener.on_data(bytes, on_delivered);
            }
            None => {
                guard.queue.push_back(bytes);
                drop(guard);
                self.not_empty.notify_all();
                on_delivered(Ok(()));
            }
        }
        Ok(())
    }

    /// Signal end-of-body. Idempotent: a second call is a no-op. Never
    /// blocks.
    pub fn close(&self) {
        let mut guard = self.state.lock().unwrap();
        if guard.ended || guard.error.is_some() {
            return;
        }
        guard.ended = true;
        let listener = guard.listener.clone();
        drop(guard);
        self.not_empty.notify_all();
        if let Some(listener) = listener {
            listener.on_complete();
        }
    }

    // ----- consumer side (handler thread) ----------------------------------

    /// Read up to `buf.len()` bytes. Blocks up to `read_timeout` when no
    /// bytes are currently available. Returns `Ok(0)` once the END
    /// sentinel has been observed and fully drained.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut guard = self.state.lock().unwrap();
        loop {
            if guard.listener.is_some() {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "pull interface unavailable: a listener has been installed",
                ));
            }
            if let Some((data, pos)) = guard.current.take() {
                if pos < data.len() {
                    let remaining = data.len() - pos;
                    let n = remaining.min(buf.len());
                    buf[..n].copy_from_slice(&data[pos..pos + n]);
                    let new_pos = pos + n;
                    if new_pos < data.len() {
                        guard.current = Some((data, new_pos));
                    }
                    return Ok(n);
                }
            }

            if let Some(next) = guard.queue.pop_front() {
                guard.current = Some((next, 0));
                continue;
            }

            if let Some(err) = guard.error {
                return Err(err.into());
            }

            if guard.ended {
                return Ok(0);
            }

            let (next_guard, wait_result) =
                self.not_empty.wait_timeout(guard, self.read_timeout).unwrap();
            guard = next_guard;
            if wait_result.timed_out() {
                log::warn!("body conduit read timed out after {:?}", self.read_timeout);
                return Err(ConduitError::Timeout.into());
            }
        }
    }

    /// Read a single byte, or `None` at end-of-body.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Number of bytes currently buffered, without waiting.
    pub fn available(&self) -> usize {
        let guard = self.state.lock().unwrap();
        let current = guard.current.as_ref().map(|(b, pos)| b.len() - pos).unwrap_or(0);
        current + guard.queue.iter().map(Bytes::len).sum::<usize>()
    }

    /// Install a push-mode listener, draining any queued buffers to it in
    /// FIFO order first. A conduit accepts at most one listener; a second
    /// call fails with [`ConduitError::ListenerAlreadyInstalled`] rather
    /// than silently replacing it (spec.md §9 open question, resolved in
    /// favor of the fail-fast option).
    pub fn switch_to_listener(&self, listener: Arc<dyn BodyListener>) -> Result<(), ConduitError> {
        let mut guard = self.state.lock().unwrap();
        if guard.listener.is_some() {
            return Err(ConduitError::ListenerAlreadyInstalled);
        }

        let mut drained = Vec::new();
        if let Some((buf, pos)) = guard.current.take() {
            if pos < buf.len() {
                drained.push(buf.slice(pos..));
            }
        }
        drained.extend(guard.queue.drain(..));

        let ended = guard.ended;
        let error = guard.error;
        guard.listener = Some(listener.clone());
        drop(guard);

        log::debug!("body conduit switched to push-mode listener");
        for chunk in drained {
            listener.on_data(chunk, Box::new(|_| {}));
        }
        if let Some(err) = error {
            listener.on_error(err);
        } else if ended {
            listener.on_complete();
        }
        Ok(())
    }
}

impl io::Read for &BodyConduit {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        BodyConduit::read(self, buf)
    }
}
