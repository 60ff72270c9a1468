//! Realtime voice consultation over a bidirectional websocket.
//!
//! One session owns the microphone, the playback sink and a socket
//! thread. Captured frames go out as base64 PCM16 at 16 kHz; response
//! audio comes back at 24 kHz and is queued on the playback timeline.
//! The microphone is acquired before any network work so a missing
//! device fails fast without a half-open connection.

pub mod wire;

use crate::audio::{codec, MicrophoneCapture, PlaybackHandle, PlaybackSink};
use crate::config::LiveConfig;
use crate::{EngenheiroError, Result};
use crossbeam_channel::{bounded, Receiver};
use native_tls::TlsStream;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tungstenite::{Message, WebSocket};

type WsStream = WebSocket<TlsStream<TcpStream>>;

/// Called with each transcript fragment of the spoken response
pub type TranscriptCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Called once when the session ends, locally or remotely
pub type ClosedCallback = Arc<dyn Fn() + Send + Sync>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval for the duplex socket loop
const READ_TIMEOUT: Duration = Duration::from_millis(20);

pub struct LiveSession {
    config: LiveConfig,
    capture: Option<MicrophoneCapture>,
    sink: Option<PlaybackSink>,
    shutdown: Arc<AtomicBool>,
    socket_thread: Option<JoinHandle<()>>,
}

impl LiveSession {
    pub fn new(config: LiveConfig) -> Self {
        Self {
            config,
            capture: None,
            sink: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            socket_thread: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.socket_thread
            .as_ref()
            .map(|thread| !thread.is_finished())
            .unwrap_or(false)
    }

    /// Open the session: microphone first, then the socket handshake,
    /// then streaming starts. On any error nothing is left half-open.
    pub fn connect(
        &mut self,
        on_transcript: TranscriptCallback,
        on_closed: ClosedCallback,
    ) -> Result<()> {
        if self.is_connected() {
            warn!("Live session already connected");
            return Ok(());
        }
        // Reap a previous session that ended remotely
        self.disconnect();

        let mut capture = MicrophoneCapture::new()?;

        let mut sink = PlaybackSink::new()?;
        sink.start()?;

        let mut socket = connect_websocket(&self.config.api_key)?;
        send_text(&mut socket, wire::setup_message(&self.config))?;
        wait_setup_complete(&mut socket)?;

        // Switch to short read timeouts for the duplex poll loop
        socket
            .get_ref()
            .get_ref()
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(EngenheiroError::from)?;

        let (frame_tx, frame_rx) = bounded::<Vec<f32>>(64);
        capture.start(frame_tx, self.config.frame_size)?;

        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = Arc::clone(&self.shutdown);
        let playback = sink.handle();

        self.socket_thread = Some(std::thread::spawn(move || {
            run_socket_loop(socket, frame_rx, playback, shutdown, on_transcript, on_closed);
        }));

        self.capture = Some(capture);
        self.sink = Some(sink);
        info!("Live session connected");
        Ok(())
    }

    /// Tear the session down: stop the microphone, hard-stop playback,
    /// close the socket. Safe before connect and safe to repeat.
    pub fn disconnect(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        if let Some(mut sink) = self.sink.take() {
            sink.shutdown();
        }
        if let Some(thread) = self.socket_thread.take() {
            if thread.join().is_err() {
                error!("Live socket thread panicked");
            }
            info!("Live session disconnected");
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn live_error(detail: impl std::fmt::Display) -> EngenheiroError {
    EngenheiroError::LiveSessionError(detail.to_string())
}

fn connect_websocket(api_key: &str) -> Result<WsStream> {
    let ws_url = wire::endpoint_url(api_key);
    let url = url::Url::parse(&ws_url).map_err(live_error)?;
    let host = url
        .host_str()
        .ok_or_else(|| live_error("endpoint URL has no host"))?;

    let addr = format!("{}:443", host)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| live_error(format!("failed to resolve {}", host)))?;

    let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))?;
    tcp.set_write_timeout(Some(Duration::from_secs(30)))?;
    tcp.set_nodelay(true)?;

    let connector = native_tls::TlsConnector::new().map_err(live_error)?;
    let tls = connector.connect(host, tcp).map_err(live_error)?;

    let (socket, _response) = tungstenite::client::client(&ws_url, tls).map_err(live_error)?;
    Ok(socket)
}

fn send_text(socket: &mut WsStream, payload: String) -> Result<()> {
    socket
        .write(Message::Text(payload))
        .and_then(|_| socket.flush())
        .map_err(live_error)
}

fn wait_setup_complete(socket: &mut WsStream) -> Result<()> {
    let deadline = Instant::now() + SETUP_TIMEOUT;

    loop {
        if Instant::now() > deadline {
            return Err(live_error("timed out waiting for setup acknowledgment"));
        }

        match socket.read() {
            Ok(Message::Text(raw)) => {
                if wire::parse_server_message(&raw).setup_complete {
                    debug!("Live setup acknowledged");
                    return Ok(());
                }
            }
            Ok(Message::Binary(data)) => {
                if let Ok(raw) = String::from_utf8(data) {
                    if wire::parse_server_message(&raw).setup_complete {
                        return Ok(());
                    }
                }
            }
            Ok(Message::Close(_)) => {
                return Err(live_error("connection closed during setup"));
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(live_error(e)),
        }
    }
}

fn is_timeout(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

/// Full-duplex poll loop: drain outbound microphone frames, then take
/// one inbound frame. Exits on shutdown, remote close, or socket error.
fn run_socket_loop(
    mut socket: WsStream,
    frame_rx: Receiver<Vec<f32>>,
    playback: PlaybackHandle,
    shutdown: Arc<AtomicBool>,
    on_transcript: TranscriptCallback,
    on_closed: ClosedCallback,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            let _ = socket.close(None);
            break;
        }

        let mut wrote = false;
        while let Ok(frame) = frame_rx.try_recv() {
            let message = wire::audio_frame(&codec::encode_frame(&frame));
            if socket.write(Message::Text(message)).is_err() {
                break;
            }
            wrote = true;
        }
        if wrote {
            if let Err(e) = socket.flush() {
                error!("Live socket write failed: {}", e);
                break;
            }
        }

        match socket.read() {
            Ok(Message::Text(raw)) => {
                handle_server_frame(&raw, &playback, &on_transcript);
            }
            Ok(Message::Binary(data)) => {
                if let Ok(raw) = String::from_utf8(data) {
                    handle_server_frame(&raw, &playback, &on_transcript);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Live session closed by remote");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e)) if is_timeout(e) => {}
            Err(e) => {
                error!("Live socket read failed: {}", e);
                break;
            }
        }
    }

    // Leave no response audio behind regardless of how we exited
    playback.clear();
    shutdown.store(true, Ordering::SeqCst);
    on_closed();
}

fn handle_server_frame(raw: &str, playback: &PlaybackHandle, on_transcript: &TranscriptCallback) {
    let event = wire::parse_server_message(raw);

    if event.interrupted {
        let cancelled = playback.clear();
        debug!("Barge-in: dropped {} pending sources", cancelled);
    }

    for chunk in &event.audio_chunks {
        match codec::pcm_to_samples(chunk) {
            Ok(samples) => {
                if let Err(e) = playback.enqueue(&samples) {
                    warn!("Failed to enqueue audio chunk: {}", e);
                }
            }
            Err(e) => warn!("Skipping malformed audio chunk: {}", e),
        }
    }

    if let Some(text) = &event.transcript {
        on_transcript(text);
    }

    if event.turn_complete {
        debug!("Response turn complete");
        if let Err(e) = playback.flush() {
            warn!("Failed to flush playback tail: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_before_connect_is_safe() {
        let mut session = LiveSession::new(LiveConfig::default());
        assert!(!session.is_connected());

        session.disconnect();
        session.disconnect();
        assert!(!session.is_connected());
    }

    #[test]
    fn test_barge_in_drops_pending_playback() {
        if let Ok(sink) = PlaybackSink::new() {
            let playback = sink.handle();
            playback.enqueue(&vec![0.1f32; 2400]).unwrap();
            playback.enqueue(&vec![0.1f32; 2400]).unwrap();

            let fragments = Arc::new(parking_lot::Mutex::new(Vec::new()));
            let seen = Arc::clone(&fragments);
            let on_transcript: TranscriptCallback =
                Arc::new(move |text| seen.lock().push(text.to_string()));

            let raw = r#"{"serverContent":{
                "interrupted":true,
                "outputTranscription":{"text":"Corrigindo:"}
            }}"#;
            handle_server_frame(raw, &playback, &on_transcript);

            assert_eq!(playback.active_sources(), 0);
            assert_eq!(fragments.lock().as_slice(), ["Corrigindo:"]);
        }
    }
}
