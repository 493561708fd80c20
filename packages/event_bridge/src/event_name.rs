use std::borrow::Cow;
use std::fmt::{self, Display};
use std::slice;

/// Identifies a kind of event raised by an emitter.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EventName(Cow<'static, str>);

impl EventName {
    /// Creates an event name from a string literal without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&EventName> for EventName {
    fn from(name: &EventName) -> Self {
        name.clone()
    }
}

impl PartialEq<str> for EventName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for EventName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// An ordered set of event names.
///
/// Duplicates are dropped when the set is built, keeping the first occurrence. Anything that
/// converts into an [`EventName`] also converts into a single-element set, so callers can pass
/// either `"data"` or `["data", "chunk"]` wherever a set is expected.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventNames(Vec<EventName>);

impl EventNames {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a name to the end of the set unless it is already present.
    pub fn insert(&mut self, name: impl Into<EventName>) {
        let name = name.into();

        if !self.contains(&name) {
            self.0.push(name);
        }
    }

    /// Whether the set contains the given name.
    #[must_use]
    pub fn contains(&self, name: &EventName) -> bool {
        self.0.contains(name)
    }

    /// Number of distinct names in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the names in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, EventName> {
        self.0.iter()
    }

    /// Returns the names of `self` that do not appear in any of `excluded`.
    pub(crate) fn without(&self, excluded: &[&Self]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|name| !excluded.iter().any(|set| set.contains(name)))
                .cloned()
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a EventNames {
    type Item = &'a EventName;
    type IntoIter = slice::Iter<'a, EventName>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<N> FromIterator<N> for EventNames
where
    N: Into<EventName>,
{
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        let mut names = Self::new();

        for name in iter {
            names.insert(name);
        }

        names
    }
}

impl From<EventName> for EventNames {
    fn from(name: EventName) -> Self {
        Self(vec![name])
    }
}

impl From<&'static str> for EventNames {
    fn from(name: &'static str) -> Self {
        EventName::from(name).into()
    }
}

impl From<String> for EventNames {
    fn from(name: String) -> Self {
        EventName::from(name).into()
    }
}

impl<N, const LEN: usize> From<[N; LEN]> for EventNames
where
    N: Into<EventName>,
{
    fn from(names: [N; LEN]) -> Self {
        names.into_iter().collect()
    }
}

impl<N> From<Vec<N>> for EventNames
where
    N: Into<EventName>,
{
    fn from(names: Vec<N>) -> Self {
        names.into_iter().collect()
    }
}
