//! Minimal SPIR-V word emitter.
//!
//! Produces syntactically valid modules for fixtures and tests without an
//! external compiler. It performs no validation beyond word counting; callers
//! are expected to emit instructions in the order the SPIR-V logical layout
//! requires when the output is meant for a driver.

use crate::consts::{op, MAGIC_NUMBER};

/// SPIR-V 1.0 version word.
const DEFAULT_VERSION: u32 = 0x0001_0000;

#[derive(Debug, Clone)]
pub struct Assembler {
    version: u32,
    next_id: u32,
    body: Vec<u32>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            version: DEFAULT_VERSION,
            next_id: 1,
            body: Vec::new(),
        }
    }

    pub fn with_version(mut self, major: u32, minor: u32) -> Self {
        self.version = (major << 16) | (minor << 8);
        self
    }

    /// Reserves a fresh result id.
    pub fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn instruction(&mut self, opcode: u32, operands: &[u32]) {
        let word_count = operands.len() as u32 + 1;
        self.body.push((word_count << 16) | (opcode & 0xFFFF));
        self.body.extend_from_slice(operands);
    }

    /// Emits an instruction whose operands contain a literal string between
    /// `leading` and `trailing` words.
    pub fn instruction_with_string(
        &mut self,
        opcode: u32,
        leading: &[u32],
        text: &str,
        trailing: &[u32],
    ) {
        let mut operands = leading.to_vec();
        operands.extend(encode_string(text));
        operands.extend_from_slice(trailing);
        self.instruction(opcode, &operands);
    }

    pub fn name(&mut self, target: u32, name: &str) {
        self.instruction_with_string(op::NAME, &[target], name, &[]);
    }

    pub fn member_name(&mut self, ty: u32, member: u32, name: &str) {
        self.instruction_with_string(op::MEMBER_NAME, &[ty, member], name, &[]);
    }

    pub fn decorate(&mut self, target: u32, decoration: u32, literals: &[u32]) {
        let mut operands = vec![target, decoration];
        operands.extend_from_slice(literals);
        self.instruction(op::DECORATE, &operands);
    }

    pub fn member_decorate(&mut self, ty: u32, member: u32, decoration: u32, literals: &[u32]) {
        let mut operands = vec![ty, member, decoration];
        operands.extend_from_slice(literals);
        self.instruction(op::MEMBER_DECORATE, &operands);
    }

    pub fn entry_point(&mut self, execution_model: u32, function: u32, name: &str, interface: &[u32]) {
        self.instruction_with_string(
            op::ENTRY_POINT,
            &[execution_model, function],
            name,
            interface,
        );
    }

    fn typed(&mut self, opcode: u32, rest: &[u32]) -> u32 {
        let id = self.id();
        let mut operands = vec![id];
        operands.extend_from_slice(rest);
        self.instruction(opcode, &operands);
        id
    }

    pub fn type_void(&mut self) -> u32 {
        self.typed(op::TYPE_VOID, &[])
    }

    pub fn type_bool(&mut self) -> u32 {
        self.typed(op::TYPE_BOOL, &[])
    }

    pub fn type_int(&mut self, width: u32, signed: bool) -> u32 {
        self.typed(op::TYPE_INT, &[width, u32::from(signed)])
    }

    pub fn type_float(&mut self, width: u32) -> u32 {
        self.typed(op::TYPE_FLOAT, &[width])
    }

    pub fn type_vector(&mut self, component: u32, count: u32) -> u32 {
        self.typed(op::TYPE_VECTOR, &[component, count])
    }

    pub fn type_matrix(&mut self, column: u32, columns: u32) -> u32 {
        self.typed(op::TYPE_MATRIX, &[column, columns])
    }

    /// `OpTypeImage` with the given dimensionality and `sampled` operand
    /// (1 = used with a sampler, 2 = storage image).
    pub fn type_image(&mut self, sampled_type: u32, dim: u32, sampled: u32) -> u32 {
        self.typed(op::TYPE_IMAGE, &[sampled_type, dim, 0, 0, 0, sampled, 0])
    }

    pub fn type_sampler(&mut self) -> u32 {
        self.typed(op::TYPE_SAMPLER, &[])
    }

    pub fn type_sampled_image(&mut self, image: u32) -> u32 {
        self.typed(op::TYPE_SAMPLED_IMAGE, &[image])
    }

    pub fn type_array(&mut self, element: u32, length_id: u32) -> u32 {
        self.typed(op::TYPE_ARRAY, &[element, length_id])
    }

    pub fn type_runtime_array(&mut self, element: u32) -> u32 {
        self.typed(op::TYPE_RUNTIME_ARRAY, &[element])
    }

    pub fn type_struct(&mut self, members: &[u32]) -> u32 {
        self.typed(op::TYPE_STRUCT, members)
    }

    pub fn type_pointer(&mut self, storage_class: u32, pointee: u32) -> u32 {
        self.typed(op::TYPE_POINTER, &[storage_class, pointee])
    }

    pub fn type_function(&mut self, return_type: u32) -> u32 {
        self.typed(op::TYPE_FUNCTION, &[return_type])
    }

    /// 32-bit scalar constant of type `ty`.
    pub fn constant(&mut self, ty: u32, value: u32) -> u32 {
        let id = self.id();
        self.instruction(op::CONSTANT, &[ty, id, value]);
        id
    }

    pub fn variable(&mut self, pointer_type: u32, storage_class: u32) -> u32 {
        let id = self.id();
        self.instruction(op::VARIABLE, &[pointer_type, id, storage_class]);
        id
    }

    /// Emits an empty `void main()` body for `function`.
    pub fn empty_function(&mut self, function: u32, void_type: u32, function_type: u32) {
        self.instruction(op::FUNCTION, &[void_type, function, 0, function_type]);
        let label = self.id();
        self.instruction(op::LABEL, &[label]);
        self.instruction(op::RETURN, &[]);
        self.instruction(op::FUNCTION_END, &[]);
    }

    pub fn words(&self) -> Vec<u32> {
        let mut words = vec![MAGIC_NUMBER, self.version, 0, self.next_id, 0];
        words.extend_from_slice(&self.body);
        words
    }

    pub fn finish(&self) -> Vec<u8> {
        self.words()
            .into_iter()
            .flat_map(|word| word.to_le_bytes())
            .collect()
    }
}

/// Encodes a nul-terminated, word-padded SPIR-V literal string.
pub fn encode_string(text: &str) -> Vec<u32> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
