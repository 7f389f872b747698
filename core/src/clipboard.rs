use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// How long a "copied" acknowledgement stays visible.
pub const COPY_ACK_DURATION: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn set_text(&self, text: &str) -> Result<()>;
}

struct ClipboardRequest {
    text: String,
    reply: oneshot::Sender<Result<()>>,
}

/// The platform clipboard, owned by a dedicated thread.
///
/// `arboard` wants a long-lived handle (on X11 the contents vanish with it),
/// so one thread keeps the handle and serves requests from a channel.
pub struct SystemClipboard {
    tx: mpsc::UnboundedSender<ClipboardRequest>,
}

impl SystemClipboard {
    pub fn start() -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ClipboardRequest>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();
        std::thread::Builder::new()
            .name("parley-clipboard".into())
            .spawn(move || {
                let mut clipboard = match arboard::Clipboard::new() {
                    Ok(clipboard) => {
                        ready_tx.send(Ok(())).ok();
                        clipboard
                    }
                    Err(err) => {
                        ready_tx.send(Err(err.to_string())).ok();
                        return;
                    }
                };
                while let Some(request) = rx.blocking_recv() {
                    let result = clipboard
                        .set_text(request.text)
                        .map_err(|err| anyhow!("clipboard write failed: {err}"));
                    request.reply.send(result).ok();
                }
            })
            .context("failed to spawn clipboard thread")?;

        ready_rx
            .recv()
            .context("clipboard thread exited during startup")?
            .map_err(|err| anyhow!("clipboard unavailable: {err}"))?;
        Ok(Self { tx })
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn set_text(&self, text: &str) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ClipboardRequest {
                text: text.to_owned(),
                reply,
            })
            .map_err(|_| anyhow!("clipboard thread has stopped"))?;
        response
            .await
            .map_err(|_| anyhow!("clipboard thread dropped the request"))?
    }
}

/// Stand-in for platforms without a clipboard; every copy fails.
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn set_text(&self, _text: &str) -> Result<()> {
        Err(anyhow!("no clipboard is available on this platform"))
    }
}

/// Keeps everything it is given; useful for tests and headless runs.
#[derive(Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn set_text(&self, text: &str) -> Result<()> {
        *self.contents.lock() = Some(text.to_owned());
        Ok(())
    }
}

#[derive(Default)]
struct CopyState {
    copied: Option<Uuid>,
    generation: u64,
}

/// Remembers which message was copied last, for a short acknowledgement.
///
/// Each copy bumps a generation counter; a timer only clears the mark if no
/// newer copy happened in the meantime.
#[derive(Clone)]
pub struct CopyTracker {
    state: Arc<Mutex<CopyState>>,
    ttl: Duration,
}

impl Default for CopyTracker {
    fn default() -> Self {
        Self::new(COPY_ACK_DURATION)
    }
}

impl CopyTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CopyState::default())),
            ttl,
        }
    }

    pub fn copied(&self) -> Option<Uuid> {
        self.state.lock().copied
    }

    /// Must be called from within a tokio runtime.
    pub fn mark(&self, id: Uuid) {
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.copied = Some(id);
            state.generation
        };
        let state = self.state.clone();
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = state.lock();
            if state.generation == generation {
                state.copied = None;
            }
        });
    }
}
