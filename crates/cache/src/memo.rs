use futures::future::BoxFuture;
use std::fmt;
use tokio::sync::Mutex;

/// Boxed constructor stored inside a [`Memo`].
pub type Construct<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Lazily constructed, cached single value.
///
/// The first successful [`get()`](Self::get) stores the constructed value and
/// every later call returns a clone of it without running the constructor
/// again. A failed construction is handed back to the caller and **not**
/// cached: the next `get()` tries again from scratch.
///
/// Construction happens while holding the slot's lock, so concurrent callers
/// wait for the in-flight attempt instead of racing their own.
///
/// `T` is expected to be cheap to clone (an [`Arc`](std::sync::Arc) around
/// the real resource, usually).
///
/// # Examples
///
/// ```
/// use ldss_cache::Memo;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let memo: Memo<u32, String> = Memo::new(|| async { Ok(42) });
/// assert_eq!(memo.get().await, Ok(42));
/// assert_eq!(memo.take().await, Some(42));
/// assert!(!memo.is_populated().await);
/// # }
/// ```
pub struct Memo<T, E> {
    slot: Mutex<Option<T>>,
    construct: Construct<T, E>,
}

impl<T, E> Memo<T, E>
where
    T: Clone + Send,
{
    pub fn new<F, Fut>(construct: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            slot: Mutex::new(None),
            construct: Box::new(move || Box::pin(construct())),
        }
    }

    /// Return the cached value, constructing it first if the slot is empty.
    pub async fn get(&self) -> Result<T, E> {
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = (self.construct)().await?;
        *slot = Some(value.clone());
        Ok(value)
    }

    /// Empty the slot, returning whatever it held so the caller can release it.
    ///
    /// The next [`get()`](Self::get) constructs a fresh value.
    pub async fn take(&self) -> Option<T> {
        self.slot.lock().await.take()
    }

    pub async fn is_populated(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<T, E> fmt::Debug for Memo<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated = self.slot.try_lock().map(|slot| slot.is_some()).ok();
        f.debug_struct("Memo").field("populated", &populated).finish_non_exhaustive()
    }
}
