//! # Connectivity
//!
//! Whether the remote leg should be attempted at all, and how reads choose a
//! backend.
//!
//! The oracle is polled before every remote operation and must be cheap and
//! side-effect free. Probing the network is someone else's job: the CLI pings
//! the remote once at startup and feeds the answer into a
//! [`ConnectivityFlag`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether the remote store is worth trying.
pub trait ConnectivityOracle: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// A shared on/off switch.
///
/// Starts in the given state; whoever runs the remote ping flips it.
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        ConnectivityFlag {
            online: AtomicBool::new(online),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::offline()
    }
}

impl ConnectivityOracle for ConnectivityFlag {
    fn is_reachable(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Which backend a read goes to.
///
/// Passed per call; there is no process-wide offline switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMode {
    /// Read the local store only, whatever the connectivity.
    #[default]
    LocalOnly,

    /// Read the remote when reachable and signed in, else fall back to local.
    PreferRemote,
}

impl std::fmt::Display for ReadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadMode::LocalOnly => write!(f, "local_only"),
            ReadMode::PreferRemote => write!(f, "prefer_remote"),
        }
    }
}
