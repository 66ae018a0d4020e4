//! Resource copy node.

use serde::{Deserialize, Serialize};

use crate::context::{Access, ExecutionContext};
use crate::error::NodeError;
use crate::profiling::profile_scope;
use crate::resource::{ConstantValue, Resource};

use super::{NodeIo, PortDesc};

/// Writes into the resource connected to `dst` and republishes it on `out`.
///
/// With `src` connected, a device resource is copied and a constant is used
/// as a fill pattern. Without `src`, `dst` is filled with the configured
/// fill value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyResourceNode {
    name: String,
    #[serde(default)]
    fill_value: ConstantValue,
}

impl CopyResourceNode {
    pub const KIND: &'static str = "copy_resource";
    pub const DESTINATION: &'static str = "dst";
    pub const SOURCE: &'static str = "src";
    pub const OUTPUT: &'static str = "out";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fill_value: ConstantValue::default(),
        }
    }

    pub fn with_fill_value(mut self, value: ConstantValue) -> Self {
        self.fill_value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fill_value(&self) -> ConstantValue {
        self.fill_value
    }

    pub fn set_fill_value(&mut self, value: ConstantValue) {
        self.fill_value = value;
    }

    pub(super) fn ports(&self) -> Vec<PortDesc> {
        vec![
            PortDesc::required(Self::DESTINATION),
            PortDesc::optional(Self::SOURCE),
            PortDesc::output(Self::OUTPUT),
        ]
    }

    pub(super) fn execute(
        &mut self,
        ctx: &mut dyn ExecutionContext,
        io: &mut NodeIo<'_>,
    ) -> Result<(), NodeError> {
        profile_scope!("copy_resource");

        let dst = io.require(Self::DESTINATION)?.clone();
        if !dst.is_gpu() {
            return Err(NodeError::InvalidInput {
                port: Self::DESTINATION.to_owned(),
                reason: "a constant cannot be written to".into(),
            });
        }

        match io.input(Self::SOURCE) {
            Some(Resource::Constant(value)) => {
                ctx.barrier(&dst, Access::Write);
                ctx.fill(&dst, value)?;
            }
            Some(src) => {
                ctx.barrier(src, Access::Read);
                ctx.barrier(&dst, Access::Write);
                ctx.copy(src, &dst)?;
            }
            None => {
                ctx.barrier(&dst, Access::Write);
                ctx.fill(&dst, &self.fill_value)?;
            }
        }

        io.publish(Self::OUTPUT, dst);
        Ok(())
    }
}
