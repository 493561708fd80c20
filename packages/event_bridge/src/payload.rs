/// The value produced by one event, packed from the arguments the emitter passed to its listeners.
///
/// Which variant is produced depends on [`Options::multi_args`][crate::Options::multi_args]:
/// by default only the first argument is kept, which fits the common case of emitters that pass
/// a single value. Emitters that pass several arguments per event can opt into receiving all of
/// them in order.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "mirrors the two packing modes, callers match on it"
)]
pub enum Payload<V> {
    /// The first callback argument, or `None` if the event carried no arguments.
    First(Option<V>),

    /// Every callback argument, in the order the emitter passed them.
    All(Vec<V>),
}

impl<V> Payload<V> {
    /// Packs callback arguments according to the `multi_args` option.
    pub(crate) fn pack(args: &[V], multi_args: bool) -> Self
    where
        V: Clone,
    {
        if multi_args {
            Self::All(args.to_vec())
        } else {
            Self::First(args.first().cloned())
        }
    }

    /// Returns the first callback argument, whichever variant this is.
    #[must_use]
    pub fn first(&self) -> Option<&V> {
        match self {
            Self::First(value) => value.as_ref(),
            Self::All(values) => values.first(),
        }
    }

    /// Consumes the payload, returning the first callback argument.
    #[must_use]
    pub fn into_first(self) -> Option<V> {
        match self {
            Self::First(value) => value,
            Self::All(values) => values.into_iter().next(),
        }
    }

    /// Consumes the payload, returning every argument it holds.
    ///
    /// A [`Payload::First`] yields zero or one element.
    #[must_use]
    pub fn into_all(self) -> Vec<V> {
        match self {
            Self::First(value) => value.into_iter().collect(),
            Self::All(values) => values,
        }
    }
}

impl<V> From<V> for Payload<V> {
    fn from(value: V) -> Self {
        Self::First(Some(value))
    }
}
