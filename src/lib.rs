#![deny(warnings)]

pub mod matcher;
pub use matcher::{FuzzyMatcher, MatchResult, MatcherOptions, Score};
mod rank;
pub use rank::{RankOptions, RankedEntry, RankedSearch};
mod item;
pub use item::{ClipEntry, Item, ItemId};
mod events;
pub use events::{EventRegistry, Subscription};
mod model;
pub use model::{ListModel, Model, ModelEvent, Validator};
mod schedule;
pub use schedule::{ManualScheduler, Scheduler, Task, TaskHandle, TokioScheduler};
mod view;
pub use view::{
    Display, ListView, ListViewEvent, ListViewOptions, Renderer, ScrollRegion, Viewport,
};
mod browser;
pub use browser::Browser;
mod common;
pub use common::LockExt;
