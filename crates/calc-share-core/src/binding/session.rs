//! A mounted calculator: inputs, current result and its binding.

use crate::binding::{CalculatorBinding, FieldMapping, LocalFields};
use crate::broker::SharedStateBroker;
use crate::fields::{FieldValue, SharedField};
use crate::registry::CalculatorRegistry;

/// A calculator formula module.
///
/// Implementors are pure: `compute` must depend only on its inputs.
pub trait Calculator {
    /// Registry id of this calculator.
    const ID: &'static str;

    type Inputs: LocalFields + Clone;
    type Output: Clone + PartialEq;

    fn default_inputs() -> Self::Inputs;

    fn compute(inputs: &Self::Inputs) -> Self::Output;

    /// How this calculator's local keys map onto shared fields.
    fn field_mapping() -> FieldMapping;

    /// Shared values derived from a result rather than read from inputs.
    fn derived_exports(_output: &Self::Output) -> Vec<(SharedField, FieldValue)> {
        Vec::new()
    }
}

/// Inputs and result of one mounted calculator.
///
/// Recomputes on every input change and exports whenever the result
/// changes. Mounting does not export, so opening a calculator never
/// overwrites shared values with its defaults.
pub struct CalculatorSession<C: Calculator> {
    inputs: C::Inputs,
    output: C::Output,
    binding: CalculatorBinding,
}

impl<C: Calculator> CalculatorSession<C> {
    pub fn mount(broker: SharedStateBroker, registry: &CalculatorRegistry) -> Self {
        let inputs = C::default_inputs();
        let output = C::compute(&inputs);
        let binding = CalculatorBinding::new(broker, registry, C::ID, C::field_mapping());
        Self {
            inputs,
            output,
            binding,
        }
    }

    pub fn inputs(&self) -> &C::Inputs {
        &self.inputs
    }

    pub fn output(&self) -> &C::Output {
        &self.output
    }

    pub fn binding(&self) -> &CalculatorBinding {
        &self.binding
    }

    pub fn binding_mut(&mut self) -> &mut CalculatorBinding {
        &mut self.binding
    }

    /// Change inputs through `edit`. Returns true if the new result was
    /// exported.
    pub fn update(&mut self, edit: impl FnOnce(&mut C::Inputs)) -> bool {
        edit(&mut self.inputs);
        self.recompute()
    }

    /// Set one local input. Returns true if the new result was exported.
    pub fn set_field(&mut self, key: &str, value: FieldValue) -> bool {
        let mut accepted = false;
        let exported = self.update(|inputs| accepted = inputs.set_field(key, value));
        accepted && exported
    }

    /// Accept every available import. Returns how many values were applied.
    pub fn import_all(&mut self) -> usize {
        let applied = self.binding.import_all(&mut self.inputs);
        if applied > 0 {
            self.recompute();
        }
        applied
    }

    /// Accept the given imports. Returns how many values were applied.
    pub fn import_fields(&mut self, keys: &[SharedField]) -> usize {
        let applied = self.binding.import_fields(keys, &mut self.inputs);
        if applied > 0 {
            self.recompute();
        }
        applied
    }

    /// Export the current inputs and result unconditionally.
    pub fn export_now(&mut self) -> bool {
        let derived = C::derived_exports(&self.output);
        self.binding.export_data_with(&self.inputs, derived)
    }

    fn recompute(&mut self) -> bool {
        let output = C::compute(&self.inputs);
        if output == self.output {
            return false;
        }
        self.output = output;
        self.export_now()
    }
}
