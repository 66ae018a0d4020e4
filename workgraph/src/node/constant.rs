//! Constant node.

use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::resource::ConstantValue;

use super::{NodeIo, PortDesc};

/// Publishes a fixed value on its `value` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantNode {
    name: String,
    value: ConstantValue,
}

impl ConstantNode {
    pub const KIND: &'static str = "constant";
    pub const OUTPUT: &'static str = "value";

    pub fn new(name: impl Into<String>, value: ConstantValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> ConstantValue {
        self.value
    }

    pub fn set_value(&mut self, value: ConstantValue) {
        self.value = value;
    }

    pub(super) fn ports(&self) -> Vec<PortDesc> {
        vec![PortDesc::output(Self::OUTPUT)]
    }

    pub(super) fn execute(&mut self, io: &mut NodeIo<'_>) -> Result<(), NodeError> {
        io.publish(Self::OUTPUT, self.value.into());
        Ok(())
    }
}
