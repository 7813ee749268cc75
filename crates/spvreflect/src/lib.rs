mod assembler;
pub mod consts;
mod error;
mod module;
mod stage;
mod types;

pub use assembler::{encode_string, Assembler};
pub use error::{Error, Result};
pub use module::{DescriptorBinding, EntryPoint, Header, Instruction, InterfaceVariable, Module};
pub use stage::ShaderStage;
pub use types::{DescriptorKind, StructMember, TypeInfo};
