use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid SPIR-V length: {0} bytes is not a whole number of words or is shorter than the header")]
    InvalidLength(usize),

    #[error("incorrect magic word: expected SPIR-V magic, got {0:#010X}")]
    IncorrectMagic(u32),

    #[error("unsupported SPIR-V version {major}.{minor}; the newest understood version is 1.6")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("instruction at word {offset} has a word count of zero")]
    ZeroWordCount { offset: usize },

    #[error("instruction at word {offset} declares {word_count} words but the stream ends first")]
    TruncatedInstruction { offset: usize, word_count: usize },

    #[error("instruction with opcode {opcode} is missing operand {index}")]
    MalformedInstruction { opcode: u32, index: usize },

    #[error("id {0} does not name a type")]
    UnknownType(u32),

    #[error("id {0} does not name a constant")]
    UnknownConstant(u32),

    #[error("type nesting too deep while resolving id {0}")]
    TypeNestingTooDeep(u32),

    #[error("array type {id} has length {length}, which does not fit in 32 bits")]
    ArrayLengthOverflow { id: u32, length: u64 },

    #[error("variable {0} occupies more descriptors than fit in 32 bits")]
    DescriptorCountOverflow(u32),

    #[error("variable {id} is missing its {decoration} decoration")]
    MissingDecoration { id: u32, decoration: &'static str },

    #[error("variable {0} has a type that cannot be bound through a descriptor")]
    UnsupportedDescriptor(u32),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
