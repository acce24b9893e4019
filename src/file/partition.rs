//! Partitions: layers sharing one spatial mapping.

use std::sync::Arc;

use super::Layer;
use crate::field::{FieldMapping, LayerKind};
use crate::util::{Error, Result};

/// Layers that share a mapping, split into scalar and vector collections.
///
/// Layer names are unique within each collection, so a scalar and a vector
/// layer may carry the same name.
#[derive(Clone, Debug)]
pub struct Partition {
    /// Internal name, possibly carrying a `.N` suffix.
    pub name: String,
    mapping: Arc<FieldMapping>,
    scalar_layers: Vec<Layer>,
    vector_layers: Vec<Layer>,
}

impl Partition {
    pub fn new(name: impl Into<String>, mapping: Arc<FieldMapping>) -> Self {
        Self {
            name: name.into(),
            mapping,
            scalar_layers: Vec::new(),
            vector_layers: Vec::new(),
        }
    }

    #[inline]
    pub fn mapping(&self) -> &Arc<FieldMapping> {
        &self.mapping
    }

    pub fn set_mapping(&mut self, mapping: Arc<FieldMapping>) {
        self.mapping = mapping;
    }

    fn layers(&self, kind: LayerKind) -> &[Layer] {
        match kind {
            LayerKind::Scalar => &self.scalar_layers,
            LayerKind::Vector => &self.vector_layers,
        }
    }

    /// Append a layer of `kind`. Fails with [`Error::DuplicateLayerName`]
    /// when the collection already holds that name.
    pub fn add_layer(&mut self, layer: Layer, kind: LayerKind) -> Result<()> {
        if self.has_layer(&layer.name, kind) {
            return Err(Error::DuplicateLayerName {
                partition: self.name.clone(),
                layer: layer.name,
            });
        }
        match kind {
            LayerKind::Scalar => self.scalar_layers.push(layer),
            LayerKind::Vector => self.vector_layers.push(layer),
        }
        Ok(())
    }

    pub fn add_scalar_layer(&mut self, layer: Layer) -> Result<()> {
        self.add_layer(layer, LayerKind::Scalar)
    }

    pub fn add_vector_layer(&mut self, layer: Layer) -> Result<()> {
        self.add_layer(layer, LayerKind::Vector)
    }

    pub fn layer(&self, name: &str, kind: LayerKind) -> Option<&Layer> {
        self.layers(kind).iter().find(|l| l.name == name)
    }

    pub fn scalar_layer(&self, name: &str) -> Option<&Layer> {
        self.layer(name, LayerKind::Scalar)
    }

    pub fn vector_layer(&self, name: &str) -> Option<&Layer> {
        self.layer(name, LayerKind::Vector)
    }

    pub fn has_layer(&self, name: &str, kind: LayerKind) -> bool {
        self.layer(name, kind).is_some()
    }

    /// Layer names of `kind` in insertion order.
    pub fn layer_names(&self, kind: LayerKind) -> Vec<&str> {
        self.layers(kind).iter().map(|l| l.name.as_str()).collect()
    }

    pub fn scalar_layer_names(&self) -> Vec<&str> {
        self.layer_names(LayerKind::Scalar)
    }

    pub fn vector_layer_names(&self) -> Vec<&str> {
        self.layer_names(LayerKind::Vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition() -> Partition {
        Partition::new("smoke", Arc::new(FieldMapping::default()))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut p = partition();
        p.add_scalar_layer(Layer::new("density", "smoke")).unwrap();
        p.add_scalar_layer(Layer::new("temperature", "smoke")).unwrap();
        p.add_vector_layer(Layer::new("vel", "smoke")).unwrap();

        assert_eq!(p.scalar_layer_names(), vec!["density", "temperature"]);
        assert_eq!(p.vector_layer_names(), vec!["vel"]);
        assert_eq!(p.scalar_layer("density").map(|l| l.parent.as_str()), Some("smoke"));
        assert!(p.vector_layer("density").is_none());
        assert!(p.scalar_layer("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected_per_kind() {
        let mut p = partition();
        p.add_scalar_layer(Layer::new("density", "smoke")).unwrap();

        let err = p.add_scalar_layer(Layer::new("density", "smoke")).unwrap_err();
        assert!(matches!(err, Error::DuplicateLayerName { ref layer, .. } if layer == "density"));

        // Same name in the other collection is fine.
        p.add_vector_layer(Layer::new("density", "smoke")).unwrap();
        assert!(p.has_layer("density", LayerKind::Vector));
        assert_eq!(p.scalar_layer_names().len(), 1);
    }
}
