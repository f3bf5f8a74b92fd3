#![forbid(unsafe_code)]

//! Typed messages between the vortex and the surrounding page.
//!
//! Inbound [`VortexIntent`]s arrive either through
//! [`Vortex::dispatch`](crate::Vortex::dispatch) or through an
//! [`IntentSender`] whose queue is drained at the start of every advance.
//! Outbound [`VortexSignal`]s go out on the receiver returned by
//! [`Vortex::new`](crate::Vortex::new). A dropped receiver is not an error;
//! signals are then discarded.

use std::sync::mpsc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collapse/expand request from the page.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "intent", rename_all = "snake_case"))]
pub enum VortexIntent {
    Collapse {
        #[cfg_attr(feature = "serde", serde(default))]
        boost: Option<f64>,
    },
    Expand {
        #[cfg_attr(feature = "serde", serde(default))]
        boost: Option<f64>,
    },
}

impl VortexIntent {
    #[must_use]
    pub const fn collapse() -> Self {
        Self::Collapse { boost: None }
    }

    #[must_use]
    pub const fn expand() -> Self {
        Self::Expand { boost: None }
    }

    #[must_use]
    pub const fn boost(&self) -> Option<f64> {
        match *self {
            Self::Collapse { boost } | Self::Expand { boost } => boost,
        }
    }
}

/// Notification to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VortexSignal {
    /// Stacks and positions are computed.
    Ready,
    /// The collapse settled; navigation should happen now.
    DoneCollapsing,
    /// The expand settled.
    DoneExpanding,
}

impl VortexSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::DoneCollapsing => "done_collapsing",
            Self::DoneExpanding => "done_expanding",
        }
    }
}

/// Cloneable handle for posting intents from outside the orchestrator.
#[derive(Debug, Clone)]
pub struct IntentSender {
    tx: mpsc::Sender<VortexIntent>,
}

impl IntentSender {
    pub(crate) fn new(tx: mpsc::Sender<VortexIntent>) -> Self {
        Self { tx }
    }

    /// Queue an intent. Returns `false` when the orchestrator is gone.
    pub fn send(&self, intent: VortexIntent) -> bool {
        self.tx.send(intent).is_ok()
    }

    pub fn collapse(&self, boost: Option<f64>) -> bool {
        self.send(VortexIntent::Collapse { boost })
    }

    pub fn expand(&self, boost: Option<f64>) -> bool {
        self.send(VortexIntent::Expand { boost })
    }
}

/// Outbound side held by the orchestrator.
#[derive(Debug)]
pub(crate) struct SignalOutlet {
    tx: mpsc::Sender<VortexSignal>,
    receiver_gone: bool,
}

impl SignalOutlet {
    pub(crate) fn new(tx: mpsc::Sender<VortexSignal>) -> Self {
        Self {
            tx,
            receiver_gone: false,
        }
    }

    pub(crate) fn emit(&mut self, signal: VortexSignal) {
        if self.tx.send(signal).is_ok() {
            tracing::debug!(target: "vortex.signal", signal = signal.as_str(), "signal emitted");
        } else if !self.receiver_gone {
            self.receiver_gone = true;
            tracing::debug!(
                target: "vortex.signal",
                signal = signal.as_str(),
                "signal receiver dropped; discarding signals"
            );
        }
    }
}
