use crate::{
    common::LockExt,
    events::Subscription,
    item::{Item, ItemId},
    model::{Model, ModelEvent},
    schedule::{Scheduler, TaskHandle},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use smallvec::SmallVec;
use std::{
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

/// Display binding capability
///
/// One materialized renderable per model item. The controller drives the
/// flags, how they look is entirely up to the host.
pub trait Display: Send + 'static {
    /// Height of the display in viewport units
    fn height(&self) -> f64;

    /// Selection marker on/off
    fn set_selected(&mut self, _selected: bool) {}

    /// Shortcut digit 1..9, `0` clears the overlay
    fn set_shortcut(&mut self, _digit: u8) {}

    /// Exit transition started, any transient visual effect will do
    fn removal_started(&mut self) {}
}

/// Renderer capability, materializes displays on demand
pub trait Renderer<M: Model>: Send + 'static {
    type Display: Display;

    /// Create the display for `model[index]`, `None` when out of range
    fn get_display(&mut self, model: &M, index: usize) -> Option<Self::Display>;
}

/// Scroll window abstraction
///
/// Values are re-read at the moment of use, never cached, the host (or the
/// user dragging a scrollbar) may change them between event-loop turns.
pub trait Viewport: Send + Sync + 'static {
    /// Current scroll position
    fn value(&self) -> f64;

    /// Visible extent
    fn page_size(&self) -> f64;

    /// Total scrollable extent
    fn upper(&self) -> f64;

    fn set_value(&self, value: f64);
}

/// Plain shared-state [Viewport] for hosts without a native scroll model
#[derive(Debug, Default)]
pub struct ScrollRegion {
    state: Mutex<ScrollState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ScrollState {
    value: f64,
    page_size: f64,
    upper: f64,
}

impl ScrollRegion {
    pub fn new(page_size: f64, upper: f64) -> Self {
        Self {
            state: Mutex::new(ScrollState {
                value: 0.0,
                page_size,
                upper,
            }),
        }
    }

    pub fn set_upper(&self, upper: f64) {
        self.state.with_mut(|state| state.upper = upper);
    }

    pub fn set_page_size(&self, page_size: f64) {
        self.state.with_mut(|state| state.page_size = page_size);
    }
}

impl Viewport for ScrollRegion {
    fn value(&self) -> f64 {
        self.state.with(|state| state.value)
    }

    fn page_size(&self) -> f64 {
        self.state.with(|state| state.page_size)
    }

    fn upper(&self) -> f64 {
        self.state.with(|state| state.upper)
    }

    fn set_value(&self, value: f64) {
        self.state.with_mut(|state| {
            let max = (state.upper - state.page_size).max(0.0);
            state.value = value.clamp(0.0, max);
        });
    }
}

/// Event generated by [ListView]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListViewEvent {
    /// Model contents changed
    ItemsChanged,
    /// Set of materialized displays changed
    DisplayedItemsChanged,
    /// Forwarded host click, see [ListView::notify_clicked]
    ItemClicked { button: u8, index: usize },
}

#[derive(Debug, Clone)]
pub struct ListViewOptions {
    /// Fraction of the total extent past which scrolling triggers a preload
    pub preload_point: f64,
    /// Pages worth of displays materialized by one preload pass
    pub preload_pages: f64,
    /// Debounce interval coalescing bursts of scroll events
    pub debounce: Duration,
    /// Duration of the removal exit transition
    pub removal_duration: Duration,
}

impl Default for ListViewOptions {
    fn default() -> Self {
        Self {
            preload_point: 0.85,
            preload_pages: 1.1,
            debounce: Duration::from_millis(200),
            removal_duration: Duration::from_millis(300),
        }
    }
}

struct Binding<D> {
    id: ItemId,
    inactive: bool,
    height: f64,
    display: D,
}

struct RemovalEntry<D> {
    id: ItemId,
    /// Binding index at removal start, selection advances from here once
    /// the exit transition completes
    position: usize,
    select_after: bool,
    handle: TaskHandle,
    // kept alive for the duration of the exit transition
    _display: D,
}

struct ListViewInner<M, R>
where
    M: Model,
    R: Renderer<M>,
{
    model: M,
    renderer: R,
    viewport: Arc<dyn Viewport>,
    scheduler: Arc<dyn Scheduler>,
    options: ListViewOptions,
    /// Materialized displays, a prefix of the model in model order
    bindings: Vec<Binding<R::Display>>,
    /// Displays mid exit-transition, already detached from `bindings`
    removing: Vec<RemovalEntry<R::Display>>,
    /// Stable identity of the selected display, looked up by id since
    /// pending removals shift indices
    selected: Option<ItemId>,
    /// Digit n is bound to `shortcuts[n - 1]`
    shortcuts: SmallVec<[ItemId; 9]>,
    preload_busy: bool,
    debounce: Option<TaskHandle>,
    model_sub: Option<Subscription>,
    events: Sender<ListViewEvent>,
    destroyed: bool,
}

impl<M, R> ListViewInner<M, R>
where
    M: Model,
    R: Renderer<M>,
{
    /// Materialize displays in model order starting at the count already
    /// materialized, until one preload window worth of height is added or
    /// the model is exhausted. Returns the number of new displays.
    fn preload(&mut self) -> usize {
        if self.preload_busy {
            return 0;
        }
        self.preload_busy = true;
        let budget = self.viewport.page_size() * self.options.preload_pages;
        let mut added = 0.0;
        let mut count = 0;
        while added < budget {
            let index = self.bindings.len();
            let item = match self.model.get(index) {
                Some(item) => item,
                None => break,
            };
            let display = match self.renderer.get_display(&self.model, index) {
                Some(display) => display,
                None => break,
            };
            added += display.height();
            self.bindings.push(Binding {
                id: item.id(),
                inactive: item.inactive(),
                height: display.height(),
                display,
            });
            count += 1;
        }
        // must be cleared even when nothing was materialized
        self.preload_busy = false;
        if count > 0 {
            tracing::debug!(count, total = self.bindings.len(), "preload pass");
        }
        count
    }

    fn emit(&self, event: ListViewEvent) {
        let _ = self.events.send(event);
    }

    fn selected_index(&self) -> Option<usize> {
        let id = self.selected?;
        self.bindings.iter().position(|binding| binding.id == id)
    }

    fn set_selection(&mut self, index: Option<usize>) {
        if let Some(id) = self.selected.take() {
            if let Some(binding) = self.bindings.iter_mut().find(|binding| binding.id == id) {
                binding.display.set_selected(false);
            }
        }
        if let Some(index) = index {
            let binding = &mut self.bindings[index];
            self.selected = Some(binding.id);
            binding.display.set_selected(true);
        }
    }

    fn offset_of(&self, index: usize) -> f64 {
        self.bindings[..index]
            .iter()
            .map(|binding| binding.height)
            .sum()
    }

    /// Scroll just enough to fully expose `index`: forward aligns the
    /// display's bottom edge with the viewport's bottom, backward its top
    /// edge with the viewport's top
    fn scroll_into_view(&self, index: usize, forward: bool) {
        let top = self.offset_of(index);
        let bottom = top + self.bindings[index].height;
        let value = self.viewport.value();
        let page_size = self.viewport.page_size();
        if top >= value && bottom <= value + page_size {
            return;
        }
        if forward {
            self.viewport.set_value(bottom - page_size);
        } else {
            self.viewport.set_value(top);
        }
    }

    fn first_eligible(&self, from: usize) -> Option<usize> {
        self.bindings
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, binding)| !binding.inactive)
            .map(|(index, _)| index)
    }

    fn select_step(&mut self, forward: bool) {
        let next = match (self.selected_index(), forward) {
            (Some(current), true) => self.first_eligible(current + 1),
            (Some(current), false) => self.bindings[..current]
                .iter()
                .enumerate()
                .rev()
                .find(|(_, binding)| !binding.inactive)
                .map(|(index, _)| index),
            // nothing selected yet, moving forward starts from the top
            (None, true) => self.first_eligible(0),
            (None, false) => None,
        };
        if let Some(next) = next {
            self.set_selection(Some(next));
            self.scroll_into_view(next, forward);
        }
    }

    fn clear_shortcuts(&mut self) {
        if self.shortcuts.is_empty() {
            return;
        }
        self.shortcuts.clear();
        for binding in self.bindings.iter_mut() {
            binding.display.set_shortcut(0);
        }
    }

    fn items_set(&mut self) {
        for entry in self.removing.drain(..) {
            entry.handle.cancel();
        }
        self.bindings.clear();
        self.selected = None;
        self.shortcuts.clear();
        self.preload();
        self.emit(ListViewEvent::DisplayedItemsChanged);
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(handle) = self.debounce.take() {
            handle.cancel();
        }
        for entry in self.removing.drain(..) {
            entry.handle.cancel();
        }
        self.bindings.clear();
        self.selected = None;
        self.shortcuts.clear();
        if let Some(subscription) = self.model_sub.take() {
            self.model.unsubscribe(subscription);
        }
        tracing::debug!("list view destroyed");
    }
}

/// Virtualized list controller
///
/// Consumes a [Model] and a [Viewport], lazily materializes display
/// bindings through a [Renderer], and owns selection, shortcut overlays and
/// removal transitions. All timers go through the injected [Scheduler] and
/// are cancelled on teardown.
pub struct ListView<M, R>
where
    M: Model,
    R: Renderer<M>,
{
    inner: Arc<Mutex<ListViewInner<M, R>>>,
    events: Receiver<ListViewEvent>,
}

impl<M, R> ListView<M, R>
where
    M: Model,
    R: Renderer<M>,
{
    pub fn new(
        model: M,
        renderer: R,
        viewport: Arc<dyn Viewport>,
        scheduler: Arc<dyn Scheduler>,
        options: ListViewOptions,
    ) -> Self {
        let (events_send, events_recv) = unbounded();
        let inner = Arc::new(Mutex::new(ListViewInner {
            model,
            renderer,
            viewport,
            scheduler,
            options,
            bindings: Vec::new(),
            removing: Vec::new(),
            selected: None,
            shortcuts: SmallVec::new(),
            preload_busy: false,
            debounce: None,
            model_sub: None,
            events: events_send,
            destroyed: false,
        }));

        let subscription = {
            let weak = Arc::downgrade(&inner);
            inner.with(|view| {
                view.model.subscribe(Box::new(move |event| {
                    Self::on_model_event(&weak, event)
                }))
            })
        };
        inner.with_mut(|view| {
            view.model_sub = Some(subscription);
            // populate eagerly when the model is already non-empty
            if view.preload() > 0 {
                view.emit(ListViewEvent::DisplayedItemsChanged);
            }
        });

        Self {
            inner,
            events: events_recv,
        }
    }

    fn on_model_event(
        weak: &Weak<Mutex<ListViewInner<M, R>>>,
        event: &ModelEvent<M::Item>,
    ) {
        let inner = match weak.upgrade() {
            Some(inner) => inner,
            None => return,
        };
        match event {
            ModelEvent::ItemsSet => inner.with_mut(|view| view.items_set()),
            ModelEvent::Changed => inner.with(|view| view.emit(ListViewEvent::ItemsChanged)),
            ModelEvent::ItemDeleted { item, .. } => {
                Self::on_item_deleted(&inner, weak, item.id())
            }
        }
    }

    fn on_item_deleted(
        inner: &Arc<Mutex<ListViewInner<M, R>>>,
        weak: &Weak<Mutex<ListViewInner<M, R>>>,
        id: ItemId,
    ) {
        inner.with_mut(|view| {
            // locate by stable identity, pending removals shift raw indices
            let position = match view.bindings.iter().position(|binding| binding.id == id) {
                Some(position) => position,
                // not materialized, nothing displayed changes
                None => return,
            };
            let mut binding = view.bindings.remove(position);
            let select_after = view.selected == Some(id);
            if select_after {
                view.selected = None;
                binding.display.set_selected(false);
            }
            binding.display.removal_started();
            view.emit(ListViewEvent::DisplayedItemsChanged);
            tracing::debug!(%id, position, "display removal scheduled");

            let handle = view.scheduler.schedule(view.options.removal_duration, {
                let weak = weak.clone();
                Box::new(move || {
                    let inner = match weak.upgrade() {
                        Some(inner) => inner,
                        None => return,
                    };
                    inner.with_mut(|view| {
                        let position = match view
                            .removing
                            .iter()
                            .position(|entry| entry.id == id)
                        {
                            Some(position) => position,
                            None => return,
                        };
                        let entry = view.removing.remove(position);
                        if entry.select_after {
                            // removed display held the selection, advance to
                            // the next eligible one
                            let next = view
                                .first_eligible(entry.position)
                                .or_else(|| {
                                    view.bindings[..entry.position.min(view.bindings.len())]
                                        .iter()
                                        .enumerate()
                                        .rev()
                                        .find(|(_, binding)| !binding.inactive)
                                        .map(|(index, _)| index)
                                });
                            if let Some(next) = next {
                                view.set_selection(Some(next));
                                view.scroll_into_view(next, true);
                            }
                        }
                    });
                })
            });
            view.removing.push(RemovalEntry {
                id,
                position,
                select_after,
                handle,
                _display: binding.display,
            });
        });
    }

    /// Host-facing event stream
    pub fn events(&self) -> &Receiver<ListViewEvent> {
        &self.events
    }

    /// Number of currently materialized displays
    pub fn displayed_len(&self) -> usize {
        self.inner.with(|view| view.bindings.len())
    }

    /// Index of the materialized display bound to `id`, `None` is an
    /// expected transient condition during preload
    pub fn display_index_of(&self, id: ItemId) -> Option<usize> {
        self.inner.with(|view| {
            view.bindings.iter().position(|binding| binding.id == id)
        })
    }

    /// Currently selected display index
    pub fn selected(&self) -> Option<usize> {
        self.inner.with(|view| view.selected_index())
    }

    pub fn selected_id(&self) -> Option<ItemId> {
        self.inner.with(|view| view.selected)
    }

    /// Select the display at `index`, refused for inactive items
    pub fn select(&self, index: usize) -> bool {
        self.inner.with_mut(|view| {
            match view.bindings.get(index) {
                Some(binding) if !binding.inactive => {
                    view.set_selection(Some(index));
                    true
                }
                _ => false,
            }
        })
    }

    pub fn unselect(&self) {
        self.inner.with_mut(|view| view.set_selection(None));
    }

    pub fn select_next(&self) {
        self.inner.with_mut(|view| view.select_step(true));
    }

    pub fn select_previous(&self) {
        self.inner.with_mut(|view| view.select_step(false));
    }

    /// First eligible display in model order, regardless of visibility
    pub fn select_first(&self) {
        self.inner.with_mut(|view| {
            if let Some(index) = view.first_eligible(0) {
                view.set_selection(Some(index));
                view.scroll_into_view(index, false);
            }
        });
    }

    /// First eligible display intersecting the visible scroll window
    pub fn select_first_visible(&self) {
        self.inner.with_mut(|view| {
            let value = view.viewport.value();
            let page_size = view.viewport.page_size();
            let mut top = 0.0;
            for (index, binding) in view.bindings.iter().enumerate() {
                let bottom = top + binding.height;
                let visible = bottom > value && top < value + page_size;
                top = bottom;
                if visible && !binding.inactive {
                    view.set_selection(Some(index));
                    return;
                }
            }
        });
    }

    /// Assign digits 1..9 to the first nine eligible displays visible right
    /// now; re-invoking after a scroll recomputes from scratch
    pub fn show_shortcuts(&self) {
        self.inner.with_mut(|view| {
            view.clear_shortcuts();
            let value = view.viewport.value();
            let page_size = view.viewport.page_size();
            let mut top = 0.0;
            let mut digit = 1u8;
            for binding in view.bindings.iter_mut() {
                let bottom = top + binding.height;
                let visible = bottom > value && top < value + page_size;
                top = bottom;
                if !visible || binding.inactive {
                    continue;
                }
                binding.display.set_shortcut(digit);
                view.shortcuts.push(binding.id);
                digit += 1;
                if digit > 9 {
                    break;
                }
            }
        });
    }

    /// Clear every assigned shortcut digit back to 0
    pub fn hide_shortcuts(&self) {
        self.inner.with_mut(|view| view.clear_shortcuts());
    }

    /// Display index bound to shortcut digit `n`
    pub fn get_index_for_shortcut(&self, digit: u8) -> Option<usize> {
        self.inner.with(|view| {
            let id = *view.shortcuts.get((digit as usize).checked_sub(1)?)?;
            view.bindings.iter().position(|binding| binding.id == id)
        })
    }

    pub fn scroll_to_value(&self, value: f64) {
        self.inner.with(|view| view.viewport.set_value(value));
    }

    pub fn reset_scroll(&self) {
        self.scroll_to_value(0.0);
    }

    /// Scroll position changed, schedules a debounced preload pass when the
    /// position crossed the preload point
    pub fn notify_scroll(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.with_mut(|view| {
            if view.destroyed {
                return;
            }
            let value = view.viewport.value();
            let page_size = view.viewport.page_size();
            let upper = view.viewport.upper();
            if upper <= 0.0 || value + page_size < view.options.preload_point * upper {
                return;
            }
            if view.preload_busy {
                return;
            }
            // a pending timer already covers this burst of scroll events
            if view.debounce.as_ref().map_or(false, TaskHandle::is_pending) {
                return;
            }
            let handle = view.scheduler.schedule(
                view.options.debounce,
                Box::new(move || {
                    let inner = match weak.upgrade() {
                        Some(inner) => inner,
                        None => return,
                    };
                    inner.with_mut(|view| {
                        if view.destroyed {
                            return;
                        }
                        if view.preload() > 0 {
                            view.emit(ListViewEvent::DisplayedItemsChanged);
                        }
                    });
                }),
            );
            view.debounce = Some(handle);
        });
    }

    /// Forward a host click on the display at `index`
    pub fn notify_clicked(&self, button: u8, index: usize) {
        self.inner
            .with(|view| view.emit(ListViewEvent::ItemClicked { button, index }));
    }

    /// Cancel pending timers, finalize in-flight removals without invoking
    /// completion callbacks, and detach from the model
    pub fn destroy(&self) {
        self.inner.with_mut(|view| view.teardown());
    }
}

impl<M, R> Drop for ListView<M, R>
where
    M: Model,
    R: Renderer<M>,
{
    fn drop(&mut self) {
        self.destroy();
    }
}
