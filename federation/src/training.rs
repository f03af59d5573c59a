use codec::Parameters;

use crate::data::Batch;

/// The external model/optimizer collaborator.
///
/// The federation core never looks inside the model: one call runs forward
/// and backward over a single (already standardized) batch, updates the
/// parameters in place and reports the batch loss. Anything differentiable
/// fits behind this seam.
pub trait Trainer: Send {
    /// Backpropagates one batch against `params`.
    ///
    /// # Arguments
    /// * `params` - The current local model parameters, updated in place.
    /// * `batch` - A standardized batch of rows and labels.
    ///
    /// # Returns
    /// The mean loss over the batch.
    fn step(&mut self, params: &mut Parameters, batch: &Batch) -> f32;
}
