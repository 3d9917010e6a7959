use crate::lang::ReserveTable;
use serde::{Deserialize, Serialize};

/// A three-address instruction.
///
/// Operands are symbol-table indices, except op3 of the branch opcodes which
/// is a quad address. The opcode is kept as a raw integer so tables loaded
/// from elsewhere can carry codes the interpreter must reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quad {
    pub opcode: i32,
    pub op1: i32,
    pub op2: i32,
    pub op3: i32,
}

impl Quad {
    pub fn new(opcode: impl Into<i32>, op1: i32, op2: i32, op3: i32) -> Self {
        Quad {
            opcode: opcode.into(),
            op1,
            op2,
            op3,
        }
    }
}

/// Append-only list of quads. An index, once handed out, is that quad's
/// permanent address; the only mutation is patching in place.
#[derive(Debug, Clone)]
pub struct QuadTable {
    quads: Vec<Quad>,
    opcodes: ReserveTable,
}

impl Default for QuadTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadTable {
    pub fn new() -> Self {
        Self::from_quads(Vec::new())
    }

    pub fn from_quads(quads: Vec<Quad>) -> Self {
        QuadTable {
            quads,
            opcodes: ReserveTable::opcodes(),
        }
    }

    /// Address the next `add_quad` will occupy.
    pub fn next_quad(&self) -> usize {
        self.quads.len()
    }

    pub fn add_quad(&mut self, opcode: impl Into<i32>, op1: i32, op2: i32, op3: i32) -> usize {
        let index = self.quads.len();
        let quad = Quad::new(opcode, op1, op2, op3);
        log::trace!("quad {:>4}: {:?}", index, quad);
        self.quads.push(quad);
        index
    }

    /// Panics when `index` is past the end.
    pub fn get_quad(&self, index: usize) -> Quad {
        self.quads[index]
    }

    pub fn set_quad(&mut self, index: usize, opcode: impl Into<i32>, op1: i32, op2: i32, op3: i32) {
        self.quads[index] = Quad::new(opcode, op1, op2, op3);
    }

    /// Patches the jump target of an already emitted quad.
    pub fn set_quad_op3(&mut self, index: usize, op3: i32) {
        log::debug!("patch quad {} op3 -> {}", index, op3);
        self.quads[index].op3 = op3;
    }

    pub fn get_mnemonic(&self, opcode: i32) -> Option<&str> {
        self.opcodes.lookup_code(opcode)
    }

    pub fn opcodes(&self) -> &ReserveTable {
        &self.opcodes
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Opcode;

    #[test]
    fn test_add_returns_sequential_addresses() {
        let mut table = QuadTable::new();
        assert_eq!(table.next_quad(), 0);
        assert_eq!(table.add_quad(Opcode::Mov, 1, 0, 2), 0);
        assert_eq!(table.add_quad(Opcode::Stop, 0, 0, 0), 1);
        assert_eq!(table.next_quad(), 2);
        assert_eq!(table.get_quad(0), Quad::new(5, 1, 0, 2));
    }

    #[test]
    fn test_patch_only_touches_target() {
        let mut table = QuadTable::new();
        let branch = table.add_quad(Opcode::Bp, 3, 0, 0);
        table.add_quad(Opcode::Print, 3, 0, 0);
        table.set_quad_op3(branch, table.next_quad() as i32);
        assert_eq!(table.get_quad(branch), Quad::new(Opcode::Bp, 3, 0, 2));

        table.set_quad(1, Opcode::Br, 0, 0, 0);
        assert_eq!(table.get_quad(1).opcode, 14);
    }

    #[test]
    fn test_mnemonic_lookup() {
        let table = QuadTable::new();
        assert_eq!(table.get_mnemonic(15), Some("BINDR"));
        assert_eq!(table.get_mnemonic(42), None);
    }
}
