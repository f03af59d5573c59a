use std::collections::HashMap;

use codec::Parameters;

use crate::{
    error::{FedErr, Result},
    training::Trainer,
};

/// A freshly built model: its parameter schema plus its training
/// collaborator. Every participant builds its own copy; the schemas must
/// match because tensor order is the wire format.
pub struct ModelBuild {
    pub params: Parameters,
    pub trainer: Box<dyn Trainer>,
}

type ModelFactory = Box<dyn Fn(usize, usize) -> ModelBuild + Send + Sync>;

/// Explicit registration table mapping a model name to a factory.
///
/// Populated at startup by the embedding binary; looking up an unregistered
/// name is an error, never a fallback.
#[derive(Default)]
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, replacing any previous entry.
    ///
    /// # Arguments
    /// * `factory` - Called with `(num_features, num_labels)` per build.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(usize, usize) -> ModelBuild + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Builds a model by name.
    ///
    /// # Returns
    /// `UnknownModel` if nothing is registered under `name`.
    pub fn build(&self, name: &str, num_features: usize, num_labels: usize) -> Result<ModelBuild> {
        let factory = self.factories.get(name).ok_or_else(|| FedErr::UnknownModel {
            name: name.to_string(),
        })?;
        Ok(factory(num_features, num_labels))
    }
}

#[cfg(test)]
mod tests {
    use codec::Tensor;

    use super::*;
    use crate::data::Batch;

    struct NoopTrainer;

    impl Trainer for NoopTrainer {
        fn step(&mut self, _params: &mut Parameters, _batch: &Batch) -> f32 {
            0.0
        }
    }

    #[test]
    fn builds_registered_models_and_rejects_unknown_names() {
        let mut registry = ModelRegistry::new();
        registry.register("noop", |num_features, num_labels| ModelBuild {
            params: Parameters::new(vec![Tensor::zeros(vec![num_labels, num_features])]),
            trainer: Box::new(NoopTrainer),
        });

        let build = registry.build("noop", 4, 3).unwrap();
        assert_eq!(build.params.num_values(), 12);

        assert!(matches!(
            registry.build("missing", 4, 3),
            Err(FedErr::UnknownModel { .. })
        ));
    }
}
