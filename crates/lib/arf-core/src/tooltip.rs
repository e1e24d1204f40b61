//! Hover-driven description cache.
//!
//! The first hover over a describable node records a pending tooltip and
//! spawns one fetch against the oracle. Whatever comes back (text or a
//! fallback built from the node's static description) settles the tooltip for
//! the rest of the session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::oracle::DescriptionSource;
use crate::tree::NodeId;

pub const IDLE_TEXT: &str = "Hover to summon an insight from the oracle...";
pub const PENDING_TEXT: &str = "The oracle is contemplating...";
pub const SILENT_TEXT: &str = "The oracle is silent on this matter.";
pub const FALLBACK_PREFIX: &str = "Oracle consultation failed. Relying on the old scrolls: ";

/// What the hover handler needs to know about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverTarget {
    pub id: NodeId,
    pub name: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl HoverTarget {
    fn is_link(&self) -> bool {
        self.url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Tooltip text used when the oracle could not be reached.
    #[must_use]
    pub fn fallback_text(&self) -> String {
        format!(
            "{FALLBACK_PREFIX}{}",
            self.description.as_deref().unwrap_or_default()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipStatus {
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub status: TooltipStatus,
    pub text: String,
}

impl Tooltip {
    fn pending() -> Self {
        Self {
            status: TooltipStatus::Pending,
            text: PENDING_TEXT.to_string(),
        }
    }
}

/// Result of a single hover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    /// A fetch was spawned for the node.
    Started,
    /// The node links to an external page and is never described.
    Link,
    /// The node was hovered before; nothing was sent.
    AlreadyRequested(TooltipStatus),
}

/// Session-wide tooltip cache and in-flight fetch table.
pub struct TooltipRegistry<S> {
    inner: Arc<TooltipRegistryInner<S>>,
}

impl<S> Clone for TooltipRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct TooltipRegistryInner<S> {
    source: S,
    tooltips: Mutex<HashMap<NodeId, Slot>>,
    in_flight: Mutex<HashMap<NodeId, Fetch>>,
    next_ticket: AtomicU64,
}

/// Cached tooltip plus the ticket of the fetch allowed to settle it.
struct Slot {
    tooltip: Tooltip,
    ticket: u64,
}

/// A spawned fetch and the text to show if the task dies.
struct Fetch {
    task: JoinHandle<()>,
    ticket: u64,
    fallback: String,
}

/// Replaces a pending tooltip with `tooltip` when `ticket` still owns it.
/// Results of cancelled fetches land nowhere.
fn settle_slot(
    tooltips: &Mutex<HashMap<NodeId, Slot>>,
    id: NodeId,
    ticket: u64,
    tooltip: Tooltip,
) {
    let mut tooltips = tooltips.lock();
    if let Some(slot) = tooltips.get_mut(&id)
        && slot.ticket == ticket
        && slot.tooltip.status == TooltipStatus::Pending
    {
        slot.tooltip = tooltip;
    }
}

impl<S> TooltipRegistry<S>
where
    S: DescriptionSource + 'static,
{
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            inner: Arc::new(TooltipRegistryInner {
                source,
                tooltips: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                next_ticket: AtomicU64::new(0),
            }),
        }
    }

    /// Handles a pointer entering `target`.
    ///
    /// The pending tooltip is recorded before the fetch is spawned, so a
    /// second hover arriving while the first is in flight sends nothing.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn hover(&self, target: &HoverTarget) -> HoverOutcome {
        if target.is_link() {
            return HoverOutcome::Link;
        }

        let ticket = {
            let mut tooltips = self.inner.tooltips.lock();
            if let Some(existing) = tooltips.get(&target.id) {
                return HoverOutcome::AlreadyRequested(existing.tooltip.status);
            }
            let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
            tooltips.insert(
                target.id,
                Slot {
                    tooltip: Tooltip::pending(),
                    ticket,
                },
            );
            ticket
        };
        debug!(id = %target.id, tool = %target.name, "consulting oracle");

        let inner = self.inner.clone();
        let target = target.clone();
        let id = target.id;
        let fallback = target.fallback_text();
        let task = tokio::spawn(async move {
            let tooltip = match inner.source.describe(&target.name).await {
                Ok(payload) => Tooltip {
                    status: TooltipStatus::Loaded,
                    text: payload.text().unwrap_or(SILENT_TEXT).to_string(),
                },
                Err(err) => {
                    warn!(id = %target.id, tool = %target.name, error = %err, "failed to fetch from oracle");
                    Tooltip {
                        status: TooltipStatus::Failed,
                        text: target.fallback_text(),
                    }
                }
            };
            settle_slot(&inner.tooltips, target.id, ticket, tooltip);
        });
        self.inner
            .in_flight
            .lock()
            .insert(
                id,
                Fetch {
                    task,
                    ticket,
                    fallback,
                },
            );
        HoverOutcome::Started
    }

    #[must_use]
    pub fn tooltip(&self, id: NodeId) -> Option<Tooltip> {
        self.inner
            .tooltips
            .lock()
            .get(&id)
            .map(|slot| slot.tooltip.clone())
    }

    #[must_use]
    pub fn status(&self, id: NodeId) -> Option<TooltipStatus> {
        self.inner
            .tooltips
            .lock()
            .get(&id)
            .map(|slot| slot.tooltip.status)
    }

    /// Text currently shown for `target`: the cached tooltip, else the static
    /// description, else the idle hint.
    #[must_use]
    pub fn text_for(&self, target: &HoverTarget) -> String {
        if let Some(slot) = self.inner.tooltips.lock().get(&target.id) {
            return slot.tooltip.text.clone();
        }
        target
            .description
            .clone()
            .unwrap_or_else(|| IDLE_TEXT.to_string())
    }

    /// Number of fetches that have not completed yet.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .values()
            .filter(|fetch| !fetch.task.is_finished())
            .count()
    }

    /// Waits for the fetch spawned for `id`, if any. Returns whether one was
    /// awaited.
    pub async fn settle(&self, id: NodeId) -> bool {
        let fetch = self.inner.in_flight.lock().remove(&id);
        match fetch {
            Some(fetch) => {
                self.finish(id, fetch).await;
                true
            }
            None => false,
        }
    }

    /// Waits for every fetch spawned so far.
    pub async fn settle_all(&self) {
        let fetches: Vec<_> = self.inner.in_flight.lock().drain().collect();
        join_all(
            fetches
                .into_iter()
                .map(|(id, fetch)| self.finish(id, fetch)),
        )
        .await;
    }

    /// Awaits one fetch. A task that died without storing a result leaves
    /// the fallback text in place of the pending marker.
    async fn finish(&self, id: NodeId, fetch: Fetch) {
        let Err(err) = fetch.task.await else {
            return;
        };
        if err.is_cancelled() {
            return;
        }
        warn!(%id, error = %err, "oracle fetch task died");
        settle_slot(
            &self.inner.tooltips,
            id,
            fetch.ticket,
            Tooltip {
                status: TooltipStatus::Failed,
                text: fetch.fallback,
            },
        );
    }

    /// Aborts the fetch for `id`. A tooltip still pending is dropped so a
    /// later hover fetches again; settled tooltips are kept. A result the
    /// aborted task still produces is discarded.
    pub fn cancel(&self, id: NodeId) -> bool {
        let Some(fetch) = self.inner.in_flight.lock().remove(&id) else {
            return false;
        };
        fetch.task.abort();
        let mut tooltips = self.inner.tooltips.lock();
        if tooltips
            .get(&id)
            .is_some_and(|slot| slot.tooltip.status == TooltipStatus::Pending)
        {
            tooltips.remove(&id);
        }
        true
    }
}
