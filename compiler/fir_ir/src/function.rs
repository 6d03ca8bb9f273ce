//! Functions: a name plus versions in dispatch order.

use crate::{AbstractionId, FunctionId};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Function {
    id: FunctionId,
    name: String,
    /// Most specific first; see [`fir_types::cmp_specificity`].
    versions: Vec<AbstractionId>,
}

impl Function {
    pub(crate) fn new(id: FunctionId, name: String) -> Self {
        Self {
            id,
            name,
            versions: Vec::new(),
        }
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Versions in dispatch order.
    pub fn versions(&self) -> &[AbstractionId] {
        &self.versions
    }

    pub(crate) fn insert_version(&mut self, position: usize, version: AbstractionId) {
        self.versions.insert(position, version);
    }

    pub(crate) fn remove_version(&mut self, version: AbstractionId) -> bool {
        let before = self.versions.len();
        self.versions.retain(|&v| v != version);
        self.versions.len() != before
    }
}
