use crate::placement::{Placement, PlacementConfig, Rect, Size, TooltipPosition, compute_position};
use derive_more::{Display, From};
use fnv::FnvHashMap;
use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};
use tracing::debug;

/// Identifies the element a tooltip is anchored to, e.g. the index of a KPI card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
pub struct AnchorId(pub usize);

/// Viewport changes that invalidate a computed tooltip position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Resize(Size),
    Scroll,
}

#[derive(Debug, Default)]
struct Listeners {
    next_id: u64,
    queues: FnvHashMap<u64, VecDeque<ViewportEvent>>,
}

/// Fan-out of [`ViewportEvent`]s to whoever currently subscribes.
///
/// Subscriptions are RAII guards: dropping a [`ViewportSubscription`] unsubscribes it.
#[derive(Debug, Clone, Default)]
pub struct ViewportNotifier {
    listeners: Arc<Mutex<Listeners>>,
}

impl ViewportNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ViewportSubscription {
        let mut listeners = self.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.queues.insert(id, VecDeque::new());

        ViewportSubscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    /// Queue `event` for every live subscription, returning how many received it.
    pub fn notify(&self, event: ViewportEvent) -> usize {
        let mut listeners = self.listeners.lock();
        for queue in listeners.queues.values_mut() {
            queue.push_back(event);
        }
        listeners.queues.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().queues.len()
    }
}

/// Live subscription to a [`ViewportNotifier`]. Unsubscribes on drop.
#[derive(Debug)]
pub struct ViewportSubscription {
    id: u64,
    listeners: Arc<Mutex<Listeners>>,
}

impl ViewportSubscription {
    /// Take every event queued since the last drain.
    pub fn drain(&self) -> Vec<ViewportEvent> {
        self.listeners
            .lock()
            .queues
            .get_mut(&self.id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for ViewportSubscription {
    fn drop(&mut self) {
        self.listeners.lock().queues.remove(&self.id);
    }
}

/// Coarse tooltip lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipPhase {
    Closed,
    /// Open, waiting for the tooltip's own size to be measured.
    Positioning,
    Visible,
}

/// What the caller should do with a pointer-down event after the tooltip has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Inside the tooltip: stop propagation.
    Consumed,
    /// Outside tooltip and anchor: the tooltip closed, keep propagating.
    Dismissed,
    /// Not the tooltip's business, keep propagating.
    Ignored,
}

#[derive(Debug)]
enum State<T> {
    Closed,
    Open(OpenTooltip<T>),
}

#[derive(Debug)]
struct OpenTooltip<T> {
    anchor: AnchorId,
    anchor_rect: Rect,
    content: T,
    size: Option<Size>,
    position: Option<TooltipPosition>,
    viewport: Option<Size>,
    subscription: ViewportSubscription,
}

/// A floating panel anchored to an element, with its dismissal state machine.
///
/// `closed -> positioning` on anchor click, `positioning -> visible` once [`Tooltip::measure`]
/// supplies the size, and back to `closed` on Escape, an outside pointer-down, the close button
/// or a re-click of the same anchor. While open the tooltip holds a viewport subscription and
/// recomputes its position on resize/scroll.
#[derive(Debug)]
pub struct Tooltip<T> {
    state: State<T>,
    preferred: Placement,
    config: PlacementConfig,
    notifier: ViewportNotifier,
}

impl<T> Tooltip<T> {
    pub fn new(notifier: ViewportNotifier, preferred: Placement, config: PlacementConfig) -> Self {
        Self {
            state: State::Closed,
            preferred,
            config,
            notifier,
        }
    }

    pub fn phase(&self) -> TooltipPhase {
        match &self.state {
            State::Closed => TooltipPhase::Closed,
            State::Open(open) if open.position.is_some() => TooltipPhase::Visible,
            State::Open(_) => TooltipPhase::Positioning,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn anchor(&self) -> Option<AnchorId> {
        match &self.state {
            State::Open(open) => Some(open.anchor),
            State::Closed => None,
        }
    }

    pub fn content(&self) -> Option<&T> {
        match &self.state {
            State::Open(open) => Some(&open.content),
            State::Closed => None,
        }
    }

    pub fn position(&self) -> Option<TooltipPosition> {
        match &self.state {
            State::Open(open) => open.position,
            State::Closed => None,
        }
    }

    /// Size supplied by the last [`Tooltip::measure`].
    pub fn size(&self) -> Option<Size> {
        match &self.state {
            State::Open(open) => open.size,
            State::Closed => None,
        }
    }

    /// Screen rectangle of the tooltip once it is visible.
    pub fn rect(&self) -> Option<Rect> {
        match &self.state {
            State::Open(open) => Some(open.position?.rect(open.size?)),
            State::Closed => None,
        }
    }

    /// Anchor clicked: re-click of the open anchor closes, any other anchor (re)opens.
    /// Returns whether the tooltip is open afterwards.
    pub fn click_anchor(&mut self, anchor: AnchorId, anchor_rect: Rect, content: T) -> bool {
        if self.anchor() == Some(anchor) {
            self.close();
            return false;
        }

        debug!(%anchor, "tooltip opening");
        self.state = State::Open(OpenTooltip {
            anchor,
            anchor_rect,
            content,
            size: None,
            position: None,
            viewport: None,
            subscription: self.notifier.subscribe(),
        });
        true
    }

    /// Supply the tooltip's measured size; computes the position and makes it visible.
    /// Called again whenever the content re-lays out to a different size.
    pub fn measure(&mut self, size: Size, viewport: Size) {
        if let State::Open(open) = &mut self.state {
            open.size = Some(size);
            open.viewport = Some(viewport);
            open.position = Some(compute_position(
                open.anchor_rect,
                size,
                self.preferred,
                viewport,
                self.config,
            ));
        }
    }

    /// The anchor moved (e.g. re-laid out after a scroll). Recomputes if already measured.
    pub fn update_anchor(&mut self, anchor: AnchorId, anchor_rect: Rect) {
        if let State::Open(open) = &mut self.state {
            if open.anchor == anchor && open.anchor_rect != anchor_rect {
                open.anchor_rect = anchor_rect;
                self.recompute(None);
            }
        }
    }

    /// Drain pending viewport events and recompute the position if any arrived.
    /// Returns whether a recompute happened.
    pub fn poll_viewport(&mut self) -> bool {
        let events = match &self.state {
            State::Open(open) => open.subscription.drain(),
            State::Closed => return false,
        };
        if events.is_empty() {
            return false;
        }

        let resized = events.iter().rev().find_map(|event| match event {
            ViewportEvent::Resize(size) => Some(*size),
            ViewportEvent::Scroll => None,
        });
        self.recompute(resized)
    }

    fn recompute(&mut self, viewport: Option<Size>) -> bool {
        let State::Open(open) = &mut self.state else {
            return false;
        };
        if let Some(viewport) = viewport {
            open.viewport = Some(viewport);
        }
        match (open.size, open.viewport) {
            (Some(size), Some(viewport)) => {
                open.position = Some(compute_position(
                    open.anchor_rect,
                    size,
                    self.preferred,
                    viewport,
                    self.config,
                ));
                true
            }
            _ => false,
        }
    }

    /// Route a pointer-down at `(x, y)`.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Disposition {
        let State::Open(open) = &self.state else {
            return Disposition::Ignored;
        };

        let inside_tooltip = self.rect().is_some_and(|rect| rect.contains(x, y));
        if inside_tooltip {
            return Disposition::Consumed;
        }
        if open.anchor_rect.contains(x, y) {
            return Disposition::Ignored;
        }

        self.close();
        Disposition::Dismissed
    }

    /// Escape key. Returns whether the tooltip was open.
    pub fn escape(&mut self) -> bool {
        let was_open = self.is_open();
        self.close();
        was_open
    }

    /// Close and release the viewport subscription.
    pub fn close(&mut self) {
        if let State::Open(open) = std::mem::replace(&mut self.state, State::Closed) {
            debug!(anchor = %open.anchor, "tooltip closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size {
        width: 800.0,
        height: 600.0,
    };

    fn tooltip(notifier: &ViewportNotifier) -> Tooltip<&'static str> {
        Tooltip::new(notifier.clone(), Placement::Above, PlacementConfig::default())
    }

    fn card(index: usize) -> (AnchorId, Rect) {
        (
            AnchorId(index),
            Rect::new(300.0, 100.0 + index as f64 * 200.0, 150.0, 60.0),
        )
    }

    #[test]
    fn test_open_measure_visible() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        assert_eq!(tooltip.phase(), TooltipPhase::Closed);

        let (anchor, rect) = card(0);
        assert!(tooltip.click_anchor(anchor, rect, "P/E"));
        assert_eq!(tooltip.phase(), TooltipPhase::Positioning);
        assert!(tooltip.rect().is_none());

        tooltip.measure(Size::new(200.0, 100.0), VIEWPORT);
        assert_eq!(tooltip.phase(), TooltipPhase::Visible);
        assert_eq!(tooltip.content(), Some(&"P/E"));
        assert_eq!(tooltip.position().unwrap().placement, Placement::Above);
    }

    #[test]
    fn test_remeasure_replaces_size_and_position() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (anchor, rect) = card(0);
        tooltip.click_anchor(anchor, rect, "P/E");
        tooltip.measure(Size::new(300.0, 100.0), VIEWPORT);
        assert_eq!(tooltip.size(), Some(Size::new(300.0, 100.0)));

        let narrow = Size::new(260.0, 600.0);
        tooltip.measure(Size::new(200.0, 120.0), narrow);
        assert_eq!(tooltip.phase(), TooltipPhase::Visible);
        assert_eq!(tooltip.size(), Some(Size::new(200.0, 120.0)));

        let placed = tooltip.rect().unwrap();
        assert_eq!(placed.width, 200.0);
        assert!(placed.left >= 10.0 && placed.right() <= narrow.width - 10.0);
    }

    #[test]
    fn test_reclick_same_anchor_closes_and_unsubscribes() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (anchor, rect) = card(0);

        tooltip.click_anchor(anchor, rect, "P/E");
        assert_eq!(notifier.listener_count(), 1);

        assert!(!tooltip.click_anchor(anchor, rect, "P/E"));
        assert_eq!(tooltip.phase(), TooltipPhase::Closed);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn test_click_other_anchor_retargets() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (first, first_rect) = card(0);
        let (second, second_rect) = card(1);

        tooltip.click_anchor(first, first_rect, "P/E");
        tooltip.measure(Size::new(200.0, 100.0), VIEWPORT);
        assert!(tooltip.click_anchor(second, second_rect, "Beta"));

        assert_eq!(tooltip.anchor(), Some(second));
        assert_eq!(tooltip.phase(), TooltipPhase::Positioning);
        assert_eq!(notifier.listener_count(), 1);
    }

    #[test]
    fn test_pointer_down_routing() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (anchor, rect) = card(0);
        tooltip.click_anchor(anchor, rect, "P/E");
        tooltip.measure(Size::new(200.0, 100.0), VIEWPORT);

        let inside = tooltip.rect().unwrap();
        assert_eq!(
            tooltip.pointer_down(inside.center_x(), inside.center_y()),
            Disposition::Consumed
        );
        assert!(tooltip.is_open());

        assert_eq!(
            tooltip.pointer_down(rect.center_x(), rect.center_y()),
            Disposition::Ignored
        );
        assert!(tooltip.is_open());

        assert_eq!(tooltip.pointer_down(790.0, 590.0), Disposition::Dismissed);
        assert!(!tooltip.is_open());
        assert_eq!(notifier.listener_count(), 0);

        assert_eq!(tooltip.pointer_down(790.0, 590.0), Disposition::Ignored);
    }

    #[test]
    fn test_escape_and_close() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        assert!(!tooltip.escape());

        let (anchor, rect) = card(0);
        tooltip.click_anchor(anchor, rect, "P/E");
        assert!(tooltip.escape());
        assert_eq!(notifier.listener_count(), 0);

        tooltip.click_anchor(anchor, rect, "P/E");
        tooltip.close();
        assert_eq!(tooltip.phase(), TooltipPhase::Closed);
    }

    #[test]
    fn test_resize_recomputes_position() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (anchor, rect) = card(2);
        tooltip.click_anchor(anchor, rect, "Beta");
        tooltip.measure(Size::new(200.0, 100.0), VIEWPORT);
        let before = tooltip.position().unwrap();

        assert!(!tooltip.poll_viewport());
        assert_eq!(notifier.notify(ViewportEvent::Resize(Size::new(560.0, 600.0))), 1);
        assert!(tooltip.poll_viewport());

        let after = tooltip.position().unwrap();
        assert_ne!(before.left, after.left);
        assert!(after.left + 200.0 <= 560.0 - 10.0);
    }

    #[test]
    fn test_scroll_moves_with_anchor() {
        let notifier = ViewportNotifier::new();
        let mut tooltip = tooltip(&notifier);
        let (anchor, rect) = card(0);
        tooltip.click_anchor(anchor, rect, "P/E");
        tooltip.measure(Size::new(200.0, 100.0), VIEWPORT);

        notifier.notify(ViewportEvent::Scroll);
        tooltip.update_anchor(anchor, Rect { top: 250.0, ..rect });
        assert!(tooltip.poll_viewport());
        assert_eq!(tooltip.position().unwrap().top, 250.0 - 100.0 - 10.0);
    }

    #[test]
    fn test_notifier_without_subscribers() {
        let notifier = ViewportNotifier::new();
        assert_eq!(notifier.notify(ViewportEvent::Scroll), 0);

        let subscription = notifier.subscribe();
        notifier.notify(ViewportEvent::Scroll);
        assert_eq!(subscription.drain(), vec![ViewportEvent::Scroll]);
        assert!(subscription.drain().is_empty());

        drop(subscription);
        assert_eq!(notifier.listener_count(), 0);
    }
}
