#![allow(dead_code)]

//! Shared fakes for engine integration tests.
//!
//! In-memory implementations of the bridge traits, scriptable where the
//! tests need to provoke specific transport or network behavior.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, HttpResponse};
use bridge_traits::remote::{NowPlaying, RemoteCommand, RemoteControlSurface};
use bridge_traits::storage::{FileMetadata, FileSystemAccess, SettingsStore};
use bridge_traits::transport::{MediaSource, MediaTransport, TransportEvent};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Fake transport
// ============================================================================

/// Scriptable media transport.
///
/// `load` emits `Ready` by default; queue faults with `fail_next_load` to
/// exercise the retry path. Tests drive mid-playback behavior by emitting
/// events directly.
pub struct FakeTransport {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    scripted_faults: Mutex<VecDeque<(String, bool)>>,
    loads: Mutex<Vec<(MediaSource, Duration)>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            scripted_faults: Mutex::new(VecDeque::new()),
            loads: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Queue a fault to be emitted instead of `Ready` on the next load.
    pub fn fail_next_load(&self, message: &str, transient: bool) {
        self.scripted_faults
            .lock()
            .unwrap()
            .push_back((message.to_string(), transient));
    }

    /// Emit a transport event as if the platform player produced it.
    pub fn emit(&self, event: TransportEvent) {
        self.events_tx.send(event).unwrap();
    }

    /// Sources the engine has loaded, in order.
    pub fn loads(&self) -> Vec<(MediaSource, Duration)> {
        self.loads.lock().unwrap().clone()
    }

    /// Names of all control calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn load(&self, source: MediaSource, start_at: Duration) -> BridgeResult<()> {
        self.record("load");
        self.loads.lock().unwrap().push((source, start_at));

        let fault = self.scripted_faults.lock().unwrap().pop_front();
        match fault {
            Some((message, transient)) => {
                self.emit(TransportEvent::Fault { message, transient });
            }
            None => {
                self.emit(TransportEvent::Ready { duration: None });
            }
        }
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record("play");
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    async fn seek(&self, _position: Duration) -> BridgeResult<()> {
        self.record("seek");
        Ok(())
    }

    async fn set_rate(&self, _rate: f32) -> BridgeResult<()> {
        self.record("set_rate");
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        Ok(Duration::ZERO)
    }

    fn take_event_stream(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.lock().unwrap().take()
    }
}

// ============================================================================
// In-memory filesystem
// ============================================================================

type FileMap = Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>;

/// Filesystem backed by a shared map; the media directory is `/media`.
pub struct MemoryFileSystem {
    files: FileMap,
}

impl MemoryFileSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            files: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn media_dir() -> PathBuf {
        PathBuf::from("/media")
    }

    /// Overwrite file contents out-of-band (cache corruption tests).
    pub fn tamper(&self, path: &Path, contents: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_vec());
    }

    /// All stored paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

struct MemWriter {
    files: FileMap,
    path: PathBuf,
}

impl tokio::io::AsyncWrite for MemWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.files
            .lock()
            .unwrap()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFileSystem {
    async fn get_media_directory(&self) -> BridgeResult<PathBuf> {
        Ok(Self::media_dir())
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        let files = self.files.lock().unwrap();
        let data = files.get(path).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))
        })?;

        Ok(FileMetadata {
            size: data.len() as u64,
            modified_at: None,
            is_directory: false,
        })
    }

    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .map(|data| Bytes::from(data.clone()))
            .ok_or_else(|| {
                BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file",
                ))
            })
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.files.lock().unwrap().remove(path).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))
        })?;
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        let mut files = self.files.lock().unwrap();
        let data = files.remove(from).ok_or_else(|| {
            BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))
        })?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    async fn open_write_stream(
        &self,
        path: &Path,
    ) -> BridgeResult<Box<dyn tokio::io::AsyncWrite + Send + Unpin>> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Vec::new());
        Ok(Box::new(MemWriter {
            files: self.files.clone(),
            path: path.to_path_buf(),
        }))
    }

    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }
}

// ============================================================================
// In-memory settings store
// ============================================================================

pub struct MemorySettings {
    strings: Mutex<HashMap<String, String>>,
    bools: Mutex<HashMap<String, bool>>,
}

impl MemorySettings {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            strings: Mutex::new(HashMap::new()),
            bools: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.strings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.strings.lock().unwrap().get(key).cloned())
    }

    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.bools.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.bools.lock().unwrap().get(key).copied())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.strings.lock().unwrap().remove(key);
        self.bools.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Stub HTTP client
// ============================================================================

enum StubBody {
    /// Serve these bytes, then end the stream.
    Complete(Vec<u8>),
    /// Serve these bytes, then stall until cancelled.
    Stall(Vec<u8>),
    /// Fail to open the stream.
    Error,
}

/// HTTP client serving canned responses per URL.
pub struct StubHttpClient {
    bodies: Mutex<HashMap<String, StubBody>>,
}

impl StubHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(HashMap::new()),
        })
    }

    pub fn serve(&self, url: &str, body: &[u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), StubBody::Complete(body.to_vec()));
    }

    /// Serve a prefix, then hang: the transfer only ends by cancellation.
    pub fn serve_stalling(&self, url: &str, prefix: &[u8]) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), StubBody::Stall(prefix.to_vec()));
    }

    pub fn fail(&self, url: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), StubBody::Error);
    }
}

/// Reader yielding one chunk and then pending forever.
struct StallingReader {
    chunk: Option<Vec<u8>>,
}

impl tokio::io::AsyncRead for StallingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.chunk.take() {
            Some(chunk) => {
                buf.put_slice(&chunk);
                Poll::Ready(Ok(()))
            }
            // Deliberately never wakes; the download loop's cancellation
            // branch is the way out.
            None => Poll::Pending,
        }
    }
}

#[async_trait]
impl HttpClient for StubHttpClient {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::new(),
        })
    }

    async fn download_stream(&self, request: HttpRequest) -> BridgeResult<ByteStream> {
        let bodies = self.bodies.lock().unwrap();
        match bodies.get(&request.url) {
            Some(StubBody::Complete(data)) => Ok(ByteStream {
                content_length: Some(data.len() as u64),
                reader: Box::new(std::io::Cursor::new(data.clone())),
            }),
            Some(StubBody::Stall(prefix)) => Ok(ByteStream {
                content_length: None,
                reader: Box::new(StallingReader {
                    chunk: Some(prefix.clone()),
                }),
            }),
            Some(StubBody::Error) | None => Err(BridgeError::OperationFailed(format!(
                "HTTP 503 for {}",
                request.url
            ))),
        }
    }
}

// ============================================================================
// Fake remote-control surface
// ============================================================================

pub struct FakeRemoteSurface {
    mirrored: Mutex<Vec<NowPlaying>>,
    cleared: Mutex<usize>,
    commands_rx: Mutex<Option<mpsc::UnboundedReceiver<RemoteCommand>>>,
}

impl FakeRemoteSurface {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<RemoteCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let surface = Arc::new(Self {
            mirrored: Mutex::new(Vec::new()),
            cleared: Mutex::new(0),
            commands_rx: Mutex::new(Some(rx)),
        });
        (surface, tx)
    }

    pub fn mirrored(&self) -> Vec<NowPlaying> {
        self.mirrored.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteControlSurface for FakeRemoteSurface {
    async fn update_now_playing(&self, snapshot: NowPlaying) -> BridgeResult<()> {
        self.mirrored.lock().unwrap().push(snapshot);
        Ok(())
    }

    async fn clear(&self) -> BridgeResult<()> {
        *self.cleared.lock().unwrap() += 1;
        Ok(())
    }

    fn take_command_stream(&self) -> Option<mpsc::UnboundedReceiver<RemoteCommand>> {
        self.commands_rx.lock().unwrap().take()
    }
}
