use crate::{
    common::LockExt,
    events::{EventRegistry, Subscription},
    item::Item,
};
use std::sync::{Arc, Mutex};

/// Change notification emitted by [ListModel]
#[derive(Debug, Clone)]
pub enum ModelEvent<I> {
    /// Contents were replaced wholesale
    ItemsSet,
    /// Anything changed (follows ItemsSet and ItemDeleted, also emitted on
    /// append)
    Changed,
    /// Exactly one element was removed, `index` is its pre-removal position
    ItemDeleted { item: I, index: usize },
}

pub type Validator<I> = Arc<dyn Fn(&I) -> bool + Send + Sync>;

/// Model capability consumed by the list controller
pub trait Model: Send + Sync + 'static {
    type Item: Item;

    fn len(&self) -> usize;

    fn get(&self, index: usize) -> Option<Self::Item>;

    fn subscribe(
        &self,
        callback: Box<dyn FnMut(&ModelEvent<Self::Item>) + Send>,
    ) -> Subscription;

    fn unsubscribe(&self, subscription: Subscription) -> bool;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered, validated collection of items with change notifications
///
/// When a validator is configured only items passing it survive `set_items`
/// and `append`; order is always the input order, `append` never re-sorts.
pub struct ListModel<I> {
    items: Mutex<Vec<I>>,
    validator: Mutex<Option<Validator<I>>>,
    events: EventRegistry<ModelEvent<I>>,
}

impl<I: Item> Default for ListModel<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Item> ListModel<I> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            validator: Mutex::new(None),
            events: EventRegistry::new(),
        }
    }

    pub fn with_validator(validator: Validator<I>) -> Self {
        let model = Self::new();
        model.validator_set(Some(validator));
        model
    }

    pub fn validator_set(&self, validator: Option<Validator<I>>) {
        self.validator.with_mut(|slot| *slot = validator);
    }

    fn accepts(&self, item: &I) -> bool {
        self.validator
            .with(|validator| validator.as_ref().map_or(true, |validator| validator(item)))
    }

    /// Replace contents with the validated subset of `items`, in input order
    pub fn set_items(&self, items: impl IntoIterator<Item = I>) {
        let items: Vec<_> = items.into_iter().filter(|item| self.accepts(item)).collect();
        self.items.with_mut(|slot| *slot = items);
        self.events.emit(&ModelEvent::ItemsSet);
        self.events.emit(&ModelEvent::Changed);
    }

    /// Add one item at the end, returns `false` when the validator rejected
    /// it. Never reorders and never emits ItemsSet.
    pub fn append(&self, item: I) -> bool {
        if !self.accepts(&item) {
            return false;
        }
        self.items.with_mut(|items| items.push(item));
        self.events.emit(&ModelEvent::Changed);
        true
    }

    /// Remove exactly one element, reporting it with its pre-removal index
    pub fn delete(&self, index: usize) -> Option<I> {
        let item = self.items.with_mut(|items| {
            (index < items.len()).then(|| items.remove(index))
        })?;
        self.events.emit(&ModelEvent::ItemDeleted {
            item: item.clone(),
            index,
        });
        self.events.emit(&ModelEvent::Changed);
        Some(item)
    }

    pub fn items(&self) -> Vec<I> {
        self.items.with(|items| items.clone())
    }
}

impl<I: Item> Model for ListModel<I> {
    type Item = I;

    fn len(&self) -> usize {
        self.items.with(|items| items.len())
    }

    fn get(&self, index: usize) -> Option<I> {
        self.items.with(|items| items.get(index).cloned())
    }

    fn subscribe(&self, callback: Box<dyn FnMut(&ModelEvent<I>) + Send>) -> Subscription {
        self.events.subscribe(callback)
    }

    fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }
}

impl<I: Item> Model for Arc<ListModel<I>> {
    type Item = I;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Option<I> {
        (**self).get(index)
    }

    fn subscribe(&self, callback: Box<dyn FnMut(&ModelEvent<I>) + Send>) -> Subscription {
        (**self).subscribe(callback)
    }

    fn unsubscribe(&self, subscription: Subscription) -> bool {
        (**self).unsubscribe(subscription)
    }
}
