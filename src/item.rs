use serde::{Deserialize, Serialize};
use std::{
    borrow::Cow,
    fmt::{self, Debug},
};

/// Stable item identity assigned by the host (clipboard daemon record id)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Item
///
/// Record exposed to the search/list core by the host. The core never
/// mutates item content, it only reads the flags to decide filtering and
/// navigation eligibility.
pub trait Item: Debug + Clone + Send + 'static {
    /// Stable identity, used to locate displays across index shifts
    fn id(&self) -> ItemId;

    /// Display text, also the default projection for ranked search
    fn text(&self) -> &str;

    /// Excluded from keyboard navigation and selection but still rendered
    fn inactive(&self) -> bool {
        false
    }

    /// Excluded from the model by the default validator
    fn hidden(&self) -> bool {
        false
    }

    /// Searchable projection, hosts can override per filter invocation
    fn searchable(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text())
    }
}

/// Single clipboard-history record
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipEntry {
    pub id: ItemId,
    pub text: String,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl ClipEntry {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id: ItemId(id),
            text: text.into(),
            inactive: false,
            hidden: false,
        }
    }

    pub fn inactive(self, inactive: bool) -> Self {
        Self { inactive, ..self }
    }

    pub fn hidden(self, hidden: bool) -> Self {
        Self { hidden, ..self }
    }
}

impl Debug for ClipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClipEntry({}, {:?})", self.id, self.text)
    }
}

impl Item for ClipEntry {
    fn id(&self) -> ItemId {
        self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn inactive(&self) -> bool {
        self.inactive
    }

    fn hidden(&self) -> bool {
        self.hidden
    }
}
