use std::sync::Arc;

use crate::number::NumberKind;

/// Describes the instrument an aggregator is attached to.
///
/// Aggregators only look at the numeric kind, to convert values in and out of the sketch, and at the name, to identify
/// the instrument in errors.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Descriptor {
    name: Arc<str>,
    number_kind: NumberKind,
}

impl Descriptor {
    /// Creates a new `Descriptor`.
    pub fn new<N>(name: N, number_kind: NumberKind) -> Self
    where
        N: Into<Arc<str>>,
    {
        Self {
            name: name.into(),
            number_kind,
        }
    }

    /// Returns the name of the instrument.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the numeric kind of the instrument.
    pub fn number_kind(&self) -> NumberKind {
        self.number_kind
    }
}
