// WebSocketSource - live feed over a WebSocket connection
//
// The websocket client only offers a blocking `recv_message`, so a
// dedicated reader thread owns the connection and pushes frames into a
// lock-free SPSC ring. The ingest loop pops from the ring, which keeps it
// free to observe shutdown while no frames arrive.
//
// Frame flow:
// 1. Reader thread blocks on `recv_message`
// 2. Text/binary payloads are pushed to the ring as `ReaderEvent::Frame`
// 3. Pings are answered in place; a close or error ends the thread after
//    pushing a terminal event
// 4. `next_frame` pops events and maps terminal events to errors
//
// Dropping the source raises a closing flag the reader checks after every
// receive and while waiting on a full ring, then shuts the socket so a
// pending receive returns.

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rtrb::{Consumer, PopError, Producer, RingBuffer};
use websocket::client::ClientBuilder;
use websocket::sync::Client;
use websocket::OwnedMessage;

use crate::error::ConnectionError;

use super::{Frame, MessageSource};

/// Poll interval while the ring is empty or full
const POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
enum ReaderEvent {
    Frame(Frame),
    Closed,
    Failed(String),
}

/// Live feed source backed by a WebSocket connection
pub struct WebSocketSource {
    url: String,
    events: Consumer<ReaderEvent>,
    stream: Option<TcpStream>,
    reader: Option<JoinHandle<()>>,
    closing: Arc<AtomicBool>,
    shutdown: Option<Arc<AtomicBool>>,
    finished: bool,
}

impl WebSocketSource {
    /// Connect to `url` and start the reader thread
    ///
    /// # Arguments
    /// * `url` - `ws://` endpoint of the pitch/loudness producer
    /// * `queue_capacity` - Frames buffered between reader and ingest
    pub fn connect(url: &str, queue_capacity: usize) -> Result<Self, ConnectionError> {
        let mut builder = ClientBuilder::new(url).map_err(|err| ConnectionError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

        let client = builder
            .connect_insecure()
            .map_err(|err| ConnectionError::ConnectFailed {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        // Kept so Drop can unblock the reader's pending recv
        let stream = client.stream_ref().try_clone().ok();

        let (producer, events) = RingBuffer::new(queue_capacity.max(1));
        let closing = Arc::new(AtomicBool::new(false));
        let reader_closing = Arc::clone(&closing);
        let reader = thread::Builder::new()
            .name("moodscope-ws-reader".to_string())
            .spawn(move || read_loop(client, producer, &reader_closing))
            .map_err(|err| ConnectionError::ConnectFailed {
                url: url.to_string(),
                reason: format!("failed to spawn reader thread: {}", err),
            })?;

        log::info!("[WebSocket] Connected to {}", url);

        Ok(Self {
            url: url.to_string(),
            events,
            stream,
            reader: Some(reader),
            closing,
            shutdown: None,
            finished: false,
        })
    }

    /// Stop waiting for frames once `flag` is set
    ///
    /// Without a flag `next_frame` waits until the peer sends something or
    /// the connection ends.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn read_loop(
    mut client: Client<TcpStream>,
    mut producer: Producer<ReaderEvent>,
    closing: &AtomicBool,
) {
    loop {
        let received = client.recv_message();
        if closing.load(Ordering::SeqCst) {
            break;
        }

        let event = match received {
            Ok(OwnedMessage::Text(text)) => ReaderEvent::Frame(Frame::Text(text)),
            Ok(OwnedMessage::Binary(bytes)) => ReaderEvent::Frame(Frame::Binary(bytes)),
            Ok(OwnedMessage::Ping(payload)) => {
                if let Err(err) = client.send_message(&OwnedMessage::Pong(payload)) {
                    log::warn!("[WebSocket] Failed to answer ping: {}", err);
                }
                continue;
            }
            Ok(OwnedMessage::Pong(_)) => continue,
            Ok(OwnedMessage::Close(_)) => {
                let _ = client.send_message(&OwnedMessage::Close(None));
                ReaderEvent::Closed
            }
            Err(err) => ReaderEvent::Failed(err.to_string()),
        };

        let terminal = !matches!(event, ReaderEvent::Frame(_));
        if !push_blocking(&mut producer, event, closing) || terminal {
            break;
        }
    }
    log::debug!("[WebSocket] Reader thread exiting");
}

/// Push with backpressure; returns false once the consumer is gone or closing
fn push_blocking(
    producer: &mut Producer<ReaderEvent>,
    mut event: ReaderEvent,
    closing: &AtomicBool,
) -> bool {
    loop {
        match producer.push(event) {
            Ok(()) => return true,
            Err(rtrb::PushError::Full(rejected)) => {
                if producer.is_abandoned() || closing.load(Ordering::SeqCst) {
                    return false;
                }
                event = rejected;
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

impl MessageSource for WebSocketSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            match self.events.pop() {
                Ok(ReaderEvent::Frame(frame)) => return Ok(Some(frame)),
                Ok(ReaderEvent::Closed) => {
                    self.finished = true;
                    return Err(ConnectionError::Closed);
                }
                Ok(ReaderEvent::Failed(reason)) => {
                    self.finished = true;
                    return Err(ConnectionError::ReceiveFailed { reason });
                }
                Err(PopError::Empty) => {
                    if self.shutdown_requested()
                        || (self.events.is_abandoned() && self.events.is_empty())
                    {
                        self.finished = true;
                        return Ok(None);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

impl Drop for WebSocketSource {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::SeqCst);

        let Some(reader) = self.reader.take() else {
            return;
        };
        match self.stream.take() {
            Some(stream) => {
                let _ = stream.shutdown(Shutdown::Both);
                if reader.join().is_err() {
                    log::warn!("[WebSocket] Reader thread panicked");
                }
            }
            // Without a socket handle a pending receive cannot be interrupted;
            // the reader exits on its own at the next frame or disconnect.
            None => log::warn!(
                "[WebSocket] Detaching reader for {} (no socket handle to shut down)",
                self.url
            ),
        }
    }
}
