use crate::download::NotDownloaded;
use crate::error::{Error, ErrorKind, Result};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

const CHANNEL_CAPACITY: usize = 8;

/// Progress of an operation run through [`auto_download`].
#[derive(Debug)]
pub enum Message<T> {
    /// The operation succeeded. Always the last message.
    Done(T),
    /// The operation, or a download it needed, failed. Always the last message.
    Error(Error),
    /// A book was missing and is being downloaded; the operation will be
    /// retried afterwards.
    Download(NotDownloaded),
}

impl<T> Message<T> {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Download(_))
    }
}

impl<T: fmt::Display> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(value) => write!(f, "{value}"),
            Self::Error(err) => write!(f, "error: {}", &**err),
            Self::Download(missing) => write!(f, "downloading {}", missing.book()),
        }
    }
}

/// Run `open` until it succeeds, downloading whatever books it reports as
/// missing along the way.
///
/// Progress is reported on the returned channel, which closes once the
/// operation has finished. Each missing book produces a
/// [`Message::Download`]; the stream then ends with [`Message::Done`] or
/// [`Message::Error`]. If a download completes but `open` then fails in
/// exactly the same way again, the stream closes without a final message
/// rather than downloading the same book forever.
///
/// The work runs on its own task: dropping the receiver does not stop an
/// in-flight download.
pub fn auto_download<T, F, Fut>(open: F) -> mpsc::Receiver<Message<T>>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(orchestrate(open, tx));
    rx
}

#[instrument(level = "debug", skip_all)]
async fn orchestrate<T, F, Fut>(open: F, tx: mpsc::Sender<Message<T>>)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut previous: Option<NotDownloaded> = None;
    loop {
        let err = match open().await {
            Ok(value) => {
                send(&tx, Message::Done(value)).await;
                return;
            },
            Err(err) => err,
        };
        let missing = match &*err {
            ErrorKind::NotDownloaded(missing) => Some(missing.clone()),
            _ => None,
        };
        let Some(missing) = missing else {
            send(&tx, Message::Error(err)).await;
            return;
        };
        if previous.as_ref() == Some(&missing) {
            warn!(%missing, "Book still missing after download; giving up");
            return;
        }
        send(&tx, Message::Download(missing.clone())).await;
        if let Err(err) = missing.download().await {
            send(&tx, Message::Error(err)).await;
            return;
        }
        debug!(book = %missing.book(), "Download finished; retrying");
        previous = Some(missing);
    }
}

async fn send<T>(tx: &mpsc::Sender<Message<T>>, message: Message<T>) {
    if tx.send(message).await.is_err() {
        debug!("Receiver dropped; continuing without reporting");
    }
}
