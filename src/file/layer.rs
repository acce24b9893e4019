//! Layer references and the per-file layer log.

/// A named layer and the internal partition that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layer {
    pub name: String,
    /// Internal name of the owning partition.
    pub parent: String,
}

impl Layer {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self { name: name.into(), parent: parent.into() }
    }
}

/// One entry of the layer log: `(parent partition, layer, components)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    pub parent_name: String,
    pub name: String,
    pub components: usize,
}

impl LayerInfo {
    pub fn new(parent_name: impl Into<String>, name: impl Into<String>, components: usize) -> Self {
        Self {
            parent_name: parent_name.into(),
            name: name.into(),
            components,
        }
    }
}
