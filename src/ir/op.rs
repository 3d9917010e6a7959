use crate::lang::TokenCode;

// =============================================================================
// OPCODE - quad instruction set
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    Stop = 0,

    // arithmetic: op3 := op1 <op> op2
    Div = 1,
    Mul = 2,
    Sub = 3,
    Add = 4,

    // data movement
    Mov = 5,
    /// Indexed store: sym[op2 + op3] := sym[op1]
    Sti = 6,
    /// Indexed load: sym[op3] := sym[op1 + op2]
    Ldi = 7,

    // ==========================================================================
    // Conditional branches on sym[op1]; target address in op3
    // ==========================================================================
    Bnz = 8,
    Bnp = 9,
    Bnn = 10,
    Bz = 11,
    Bp = 12,
    Bn = 13,

    /// Unconditional jump to op3.
    Br = 14,
    /// Unconditional jump to the address stored in sym[op3].
    Bindr = 15,

    Print = 16,
}

impl Opcode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Opcode> {
        let op = match code {
            0 => Opcode::Stop,
            1 => Opcode::Div,
            2 => Opcode::Mul,
            3 => Opcode::Sub,
            4 => Opcode::Add,
            5 => Opcode::Mov,
            6 => Opcode::Sti,
            7 => Opcode::Ldi,
            8 => Opcode::Bnz,
            9 => Opcode::Bnp,
            10 => Opcode::Bnn,
            11 => Opcode::Bz,
            12 => Opcode::Bp,
            13 => Opcode::Bn,
            14 => Opcode::Br,
            15 => Opcode::Bindr,
            16 => Opcode::Print,
            _ => return None,
        };
        Some(op)
    }

    /// Number of operands shown in trace output.
    pub fn arity(self) -> usize {
        match self {
            Opcode::Stop => 0,
            Opcode::Br | Opcode::Bindr | Opcode::Print => 1,
            Opcode::Mov
            | Opcode::Bnz
            | Opcode::Bnp
            | Opcode::Bnn
            | Opcode::Bz
            | Opcode::Bp
            | Opcode::Bn => 2,
            Opcode::Div | Opcode::Mul | Opcode::Sub | Opcode::Add | Opcode::Sti | Opcode::Ldi => 3,
        }
    }

    /// True for the opcodes whose op3 is a literal quad address.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Bnz
                | Opcode::Bnp
                | Opcode::Bnn
                | Opcode::Bz
                | Opcode::Bp
                | Opcode::Bn
                | Opcode::Br
        )
    }

    /// Whether a conditional branch is taken for the tested value.
    pub fn branch_taken(self, value: i64) -> bool {
        match self {
            Opcode::Bnz => value != 0,
            Opcode::Bnp => value <= 0,
            Opcode::Bnn => value >= 0,
            Opcode::Bz => value == 0,
            Opcode::Bp => value > 0,
            Opcode::Bn => value < 0,
            _ => false,
        }
    }

    /// Branch emitted after `SUB left, right, temp` for a relational operator.
    ///
    /// The branch skips the guarded code, so it tests the negation of the
    /// written comparison.
    pub fn branch_for_false(relop: TokenCode) -> Option<Opcode> {
        let op = match relop {
            TokenCode::Equal => Opcode::Bnz,
            TokenCode::NotEqual => Opcode::Bz,
            TokenCode::Less => Opcode::Bnn,
            TokenCode::Greater => Opcode::Bnp,
            TokenCode::LessEq => Opcode::Bp,
            TokenCode::GreaterEq => Opcode::Bn,
            _ => return None,
        };
        Some(op)
    }
}

impl From<Opcode> for i32 {
    fn from(op: Opcode) -> i32 {
        op.code()
    }
}
