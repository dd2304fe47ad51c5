use crate::errors::FetchError;
use crate::registry::ChainId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Identity of one polled dataset, used for logging and loop supersession.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PollKey {
    /// The multi-chain overview refresh.
    Overview,
    /// Live stats for one chain's detail view.
    Stats(ChainId),
    /// Recent transactions for one chain's detail view.
    Transactions(ChainId),
    /// A wallet lookup on one chain.
    Wallet(ChainId, String),
}

impl fmt::Display for PollKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overview => write!(f, "overview"),
            Self::Stats(chain) => write!(f, "stats:{chain}"),
            Self::Transactions(chain) => write!(f, "txs:{chain}"),
            Self::Wallet(chain, address) => write!(f, "wallet:{chain}:{address}"),
        }
    }
}

/// Snapshot of one polled dataset.
///
/// `loading` is true only until the first settle; afterwards refreshes and
/// even failures leave it false, so consumers keep rendering the last good
/// value. A failure sets `error` without touching `value`; the next success
/// clears it. `version` increments on every settle.
#[derive(Debug)]
pub struct PollState<T> {
    pub value: Option<Arc<T>>,
    pub error: Option<Arc<FetchError>>,
    pub loading: bool,
    pub version: u64,
}

impl<T> PollState<T> {
    pub(crate) fn initial() -> Self {
        Self {
            value: None,
            error: None,
            loading: true,
            version: 0,
        }
    }

    pub(crate) fn apply_success(&mut self, value: T) {
        self.value = Some(Arc::new(value));
        self.error = None;
        self.loading = false;
        self.version += 1;
    }

    pub(crate) fn apply_failure(&mut self, error: FetchError) {
        self.error = Some(Arc::new(error));
        self.loading = false;
        self.version += 1;
    }

    /// True once at least one fetch has settled, successfully or not.
    pub fn settled(&self) -> bool {
        !self.loading
    }
}

// Manual impl: T itself need not be Clone, the value is shared by Arc.
impl<T> Clone for PollState<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            error: self.error.clone(),
            loading: self.loading,
            version: self.version,
        }
    }
}

/// Handle to one polling loop.
///
/// Cloning shares the same loop; when every clone is dropped the loop
/// notices on its next wakeup and stops.
#[derive(Clone, Debug)]
pub struct PollSubscription<T> {
    key: PollKey,
    rx: watch::Receiver<PollState<T>>,
}

impl<T> PollSubscription<T> {
    pub(crate) fn new(key: PollKey, rx: watch::Receiver<PollState<T>>) -> Self {
        Self { key, rx }
    }

    pub fn key(&self) -> &PollKey {
        &self.key
    }

    /// Current state, cloned out of the channel.
    pub fn state(&self) -> PollState<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change. Returns an error only if the
    /// polling loop is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }

    /// Wait until at least one more fetch settles and return the state.
    pub async fn next_settled(&mut self) -> Result<PollState<T>, watch::error::RecvError> {
        let seen = self.rx.borrow().version;
        loop {
            self.rx.changed().await?;
            let state = self.rx.borrow().clone();
            if state.version > seen {
                return Ok(state);
            }
        }
    }
}
