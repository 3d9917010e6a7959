use crate::diagnostics::Sink;
use crate::ir::{Opcode, Quad, QuadTable, SymbolTable};
use crate::lang::Value;
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterConfig {
    /// Print each instruction before it executes.
    pub trace: bool,
    /// Abort with a fault after this many executed instructions.
    pub max_steps: Option<usize>,
}

/// Fetch-decode-execute loop over a quad table.
///
/// The symbol table is the machine's memory: operands are symbol indices
/// and results are written back into it. Guest faults (division by zero, bad
/// indices, non-integer arithmetic) end the run with a `FATAL ERROR` line on
/// the sink and an `Err` to the caller; they never panic.
pub struct Interpreter {
    config: InterpreterConfig,
    steps: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self { config, steps: 0 }
    }

    /// Instructions executed by the last run.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn run(
        &mut self,
        quads: &QuadTable,
        symbols: &mut SymbolTable,
        out: &mut dyn Sink,
    ) -> Result<(), RuntimeError> {
        self.steps = 0;
        let halt = quads.len();
        let mut pc = 0;

        while pc < halt {
            let quad = quads.get_quad(pc);

            if !quads.opcodes().is_valid_opcode(quad.opcode, out) {
                pc += 1;
                continue;
            }
            let Some(opcode) = Opcode::from_code(quad.opcode) else {
                pc += 1;
                continue;
            };

            if self.config.trace {
                out.line(&trace_line(quads, pc, opcode, &quad));
            }

            let result = self
                .check_limits()
                .and_then(|_| execute(opcode, &quad, pc, halt, symbols, out));

            match result {
                Ok(next) => pc = next,
                Err(e) => {
                    out.line(&format!("FATAL ERROR: {}", e.message));
                    log::debug!("run aborted at quad {} after {} steps", pc, self.steps);
                    return Err(e.at(pc));
                }
            }
        }

        log::debug!("run finished after {} steps", self.steps);
        Ok(())
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::new(&format!(
                    "step limit exceeded ({})",
                    max
                )));
            }
        }
        Ok(())
    }
}

/// Executes one instruction and returns the next pc.
fn execute(
    opcode: Opcode,
    quad: &Quad,
    pc: usize,
    halt: usize,
    symbols: &mut SymbolTable,
    out: &mut dyn Sink,
) -> Result<usize, RuntimeError> {
    let next = pc + 1;

    match opcode {
        Opcode::Stop => Ok(halt),

        Opcode::Div | Opcode::Mul | Opcode::Sub | Opcode::Add => {
            // both operands are copied out before the result is written, so
            // op3 may alias op1 or op2
            let a = read_int(symbols, quad.op1 as i64)?;
            let b = read_int(symbols, quad.op2 as i64)?;
            let result = arithmetic(opcode, a, b)?;
            store(symbols, quad.op3 as i64, Value::Int(result))?;
            Ok(next)
        }

        Opcode::Mov => {
            let value = read(symbols, quad.op1 as i64)?;
            store(symbols, quad.op3 as i64, value)?;
            Ok(next)
        }

        Opcode::Sti => {
            let value = read(symbols, quad.op1 as i64)?;
            store(symbols, quad.op2 as i64 + quad.op3 as i64, value)?;
            Ok(next)
        }

        Opcode::Ldi => {
            let value = read(symbols, quad.op1 as i64 + quad.op2 as i64)?;
            store(symbols, quad.op3 as i64, value)?;
            Ok(next)
        }

        Opcode::Bnz | Opcode::Bnp | Opcode::Bnn | Opcode::Bz | Opcode::Bp | Opcode::Bn => {
            let tested = read_int(symbols, quad.op1 as i64)?;
            if opcode.branch_taken(tested) {
                jump_target(quad.op3 as i64, halt)
            } else {
                Ok(next)
            }
        }

        Opcode::Br => jump_target(quad.op3 as i64, halt),

        Opcode::Bindr => {
            let address = read_int(symbols, quad.op3 as i64)?;
            jump_target(address, halt)
        }

        Opcode::Print => {
            let symbol = symbols.get_symbol(slot(symbols, quad.op1 as i64)?);
            out.line(&format!("{} = {}", symbol.name, symbol.value));
            Ok(next)
        }
    }
}

fn arithmetic(opcode: Opcode, a: i64, b: i64) -> Result<i64, RuntimeError> {
    let result = match opcode {
        Opcode::Div => {
            if b == 0 {
                return Err(RuntimeError::new("division by zero"));
            }
            a.checked_div(b)
        }
        Opcode::Mul => a.checked_mul(b),
        Opcode::Sub => a.checked_sub(b),
        Opcode::Add => a.checked_add(b),
        _ => None,
    };
    result.ok_or_else(|| RuntimeError::new(&format!("integer overflow in {:?}", opcode)))
}

fn out_of_range(index: i64) -> RuntimeError {
    RuntimeError::new(&format!("symbol index {} is out of range", index))
}

fn slot(symbols: &SymbolTable, index: i64) -> Result<usize, RuntimeError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < symbols.len())
        .ok_or_else(|| out_of_range(index))
}

fn read(symbols: &SymbolTable, index: i64) -> Result<Value, RuntimeError> {
    let i = slot(symbols, index)?;
    Ok(symbols.get_symbol(i).value.clone())
}

fn read_int(symbols: &SymbolTable, index: i64) -> Result<i64, RuntimeError> {
    let symbol = symbols.get_symbol(slot(symbols, index)?);
    symbol.value.as_int().ok_or_else(|| {
        RuntimeError::new(&format!(
            "'{}' holds a {} value where an integer is required",
            symbol.name,
            symbol.value.type_name()
        ))
    })
}

fn store(symbols: &mut SymbolTable, index: i64, value: Value) -> Result<(), RuntimeError> {
    let i = slot(symbols, index)?;
    symbols.set_value(i, value);
    Ok(())
}

/// Branch targets may be any quad address or the halt address just past
/// the end.
fn jump_target(address: i64, halt: usize) -> Result<usize, RuntimeError> {
    usize::try_from(address)
        .ok()
        .filter(|&a| a <= halt)
        .ok_or_else(|| RuntimeError::new(&format!("branch target {} is out of range", address)))
}

fn trace_line(quads: &QuadTable, pc: usize, opcode: Opcode, quad: &Quad) -> String {
    let mnemonic = quads.get_mnemonic(quad.opcode).unwrap_or("?");
    let operands = match opcode {
        Opcode::Stop => String::new(),
        Opcode::Br | Opcode::Bindr => format!(" {}", quad.op3),
        Opcode::Print => format!(" {}", quad.op1),
        _ if opcode.arity() == 2 => format!(" {}, {}", quad.op1, quad.op3),
        _ => format!(" {}, {}, {}", quad.op1, quad.op2, quad.op3),
    };
    format!("PC = {}: {}{}", pc, mnemonic, operands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SymbolKind;

    fn run_with(
        quads: &QuadTable,
        symbols: &mut SymbolTable,
        config: InterpreterConfig,
    ) -> (Result<(), RuntimeError>, Vec<String>) {
        let mut out: Vec<String> = Vec::new();
        let result = Interpreter::with_config(config).run(quads, symbols, &mut out);
        (result, out)
    }

    fn run(quads: &QuadTable, symbols: &mut SymbolTable) -> (Result<(), RuntimeError>, Vec<String>) {
        run_with(quads, symbols, InterpreterConfig::default())
    }

    fn var(symbols: &mut SymbolTable, name: &str, value: i64) -> i32 {
        symbols.add_symbol(name, SymbolKind::Variable, Value::Int(value)) as i32
    }

    fn int(symbols: &SymbolTable, index: i32) -> i64 {
        symbols.get_symbol(index as usize).value.as_int().unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let mut symbols = SymbolTable::new();
        let a = var(&mut symbols, "A", 17);
        let b = var(&mut symbols, "B", 5);
        let sum = var(&mut symbols, "SUM", 0);
        let diff = var(&mut symbols, "DIFF", 0);
        let prod = var(&mut symbols, "PROD", 0);
        let quot = var(&mut symbols, "QUOT", 0);

        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Add, a, b, sum);
        quads.add_quad(Opcode::Sub, a, b, diff);
        quads.add_quad(Opcode::Mul, a, b, prod);
        quads.add_quad(Opcode::Div, a, b, quot);

        let (result, _) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert_eq!(int(&symbols, sum), 22);
        assert_eq!(int(&symbols, diff), 12);
        assert_eq!(int(&symbols, prod), 85);
        assert_eq!(int(&symbols, quot), 3);
    }

    #[test]
    fn test_result_may_alias_operand() {
        let mut symbols = SymbolTable::new();
        let x = var(&mut symbols, "X", 6);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Mul, x, x, x);
        quads.add_quad(Opcode::Sub, x, x, x);
        let (result, _) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert_eq!(int(&symbols, x), 0);
    }

    #[test]
    fn test_conditional_branches() {
        let cases = [
            (Opcode::Bnz, [true, false, true]),
            (Opcode::Bnp, [true, true, false]),
            (Opcode::Bnn, [false, true, true]),
            (Opcode::Bz, [false, true, false]),
            (Opcode::Bp, [false, false, true]),
            (Opcode::Bn, [true, false, false]),
        ];

        for (opcode, expected) in cases {
            for (value, taken) in [-4, 0, 9].into_iter().zip(expected) {
                let mut symbols = SymbolTable::new();
                let v = var(&mut symbols, "V", value);
                let hit = var(&mut symbols, "HIT", 0);
                let one = var(&mut symbols, "ONE", 1);

                // 0: branch to 2; 1: HIT := 1
                let mut quads = QuadTable::new();
                quads.add_quad(opcode, v, 0, 2);
                quads.add_quad(Opcode::Mov, one, 0, hit);

                let (result, _) = run(&quads, &mut symbols);
                assert!(result.is_ok());
                assert_eq!(int(&symbols, hit) == 0, taken, "{:?} with {}", opcode, value);
            }
        }
    }

    #[test]
    fn test_stop_halts() {
        let mut symbols = SymbolTable::new();
        let x = var(&mut symbols, "X", 1);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Stop, 0, 0, 0);
        quads.add_quad(Opcode::Print, x, 0, 0);
        let (result, out) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert!(out.is_empty());
    }

    #[test]
    fn test_print_any_value() {
        let mut symbols = SymbolTable::new();
        let s = symbols.add_symbol("hello", SymbolKind::Constant, Value::Text("hello".into()));
        let r = symbols.add_symbol("R", SymbolKind::Variable, Value::Real(2.5));
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Print, s as i32, 0, 0);
        quads.add_quad(Opcode::Print, r as i32, 0, 0);
        let (_, out) = run(&quads, &mut symbols);
        assert_eq!(out, vec!["hello = hello".to_string(), "R = 2.5".to_string()]);
    }

    #[test]
    fn test_indexed_store_and_load() {
        let mut symbols = SymbolTable::new();
        let src = var(&mut symbols, "SRC", 42);
        let base = var(&mut symbols, "BASE", 0);
        let _slot = var(&mut symbols, "SLOT", 0);
        let dst = var(&mut symbols, "DST", 0);

        let mut quads = QuadTable::new();
        // sym[base + 1] := sym[src]; sym[dst] := sym[base + 1]
        quads.add_quad(Opcode::Sti, src, base, 1);
        quads.add_quad(Opcode::Ldi, base, 1, dst);

        let (result, _) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert_eq!(int(&symbols, base + 1), 42);
        assert_eq!(int(&symbols, dst), 42);
    }

    #[test]
    fn test_indirect_branch() {
        let mut symbols = SymbolTable::new();
        let target = var(&mut symbols, "T", 2);
        let x = var(&mut symbols, "X", 0);
        let one = var(&mut symbols, "ONE", 1);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Bindr, 0, 0, target);
        quads.add_quad(Opcode::Mov, one, 0, x);
        quads.add_quad(Opcode::Stop, 0, 0, 0);
        let (result, _) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert_eq!(int(&symbols, x), 0);
    }

    #[test]
    fn test_division_by_zero_is_fatal() {
        let mut symbols = SymbolTable::new();
        let a = var(&mut symbols, "A", 1);
        let z = var(&mut symbols, "Z", 0);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Print, a, 0, 0);
        quads.add_quad(Opcode::Div, a, z, a);
        quads.add_quad(Opcode::Print, a, 0, 0);

        let (result, out) = run(&quads, &mut symbols);
        let err = result.unwrap_err();
        assert_eq!(err.pc, Some(1));
        assert_eq!(err.message, "division by zero");
        assert_eq!(
            out,
            vec!["A = 1".to_string(), "FATAL ERROR: division by zero".to_string()]
        );
    }

    #[test]
    fn test_bad_symbol_index_is_fatal() {
        let mut symbols = SymbolTable::new();
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Mov, 7, 0, 0);
        let (result, out) = run(&quads, &mut symbols);
        assert!(result.unwrap_err().message.contains("out of range"));
        assert!(out[0].starts_with("FATAL ERROR"));
    }

    #[test]
    fn test_arithmetic_on_real_is_fatal() {
        let mut symbols = SymbolTable::new();
        let r = symbols.add_symbol("R", SymbolKind::Variable, Value::Real(1.0)) as i32;
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Add, r, r, r);
        let (result, _) = run(&quads, &mut symbols);
        assert!(result.unwrap_err().message.contains("integer is required"));
    }

    #[test]
    fn test_overflow_is_fatal() {
        let mut symbols = SymbolTable::new();
        let big = var(&mut symbols, "BIG", i64::MAX);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Add, big, big, big);
        let (result, _) = run(&quads, &mut symbols);
        assert!(result.unwrap_err().message.contains("overflow"));
    }

    #[test]
    fn test_invalid_opcode_is_skipped() {
        let mut symbols = SymbolTable::new();
        let x = var(&mut symbols, "X", 3);
        let quads = QuadTable::from_quads(vec![
            Quad::new(40, 0, 0, 0),
            Quad::new(Opcode::Print, x, 0, 0),
        ]);
        let (result, out) = run(&quads, &mut symbols);
        assert!(result.is_ok());
        assert_eq!(
            out,
            vec!["40 is not a valid Op Code.".to_string(), "X = 3".to_string()]
        );
    }

    #[test]
    fn test_step_limit() {
        let mut symbols = SymbolTable::new();
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Br, 0, 0, 0);
        let config = InterpreterConfig {
            max_steps: Some(50),
            ..InterpreterConfig::default()
        };
        let (result, _) = run_with(&quads, &mut symbols, config);
        assert!(result.unwrap_err().message.contains("step limit exceeded"));
    }

    #[test]
    fn test_branch_out_of_range_is_fatal() {
        let mut symbols = SymbolTable::new();
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Br, 0, 0, 9);
        let (result, _) = run(&quads, &mut symbols);
        assert!(result.unwrap_err().message.contains("branch target 9"));
    }

    #[test]
    fn test_trace_lines() {
        let mut symbols = SymbolTable::new();
        let x = var(&mut symbols, "X", 0);
        let mut quads = QuadTable::new();
        quads.add_quad(Opcode::Add, x, x, x);
        quads.add_quad(Opcode::Mov, x, 0, x);
        quads.add_quad(Opcode::Bz, x, 0, 3);
        quads.add_quad(Opcode::Stop, 0, 0, 0);
        let config = InterpreterConfig {
            trace: true,
            ..InterpreterConfig::default()
        };
        let (_, out) = run_with(&quads, &mut symbols, config);
        assert_eq!(
            out,
            vec![
                "PC = 0: ADD 0, 0, 0".to_string(),
                "PC = 1: MOV 0, 0".to_string(),
                "PC = 2: BZ 0, 3".to_string(),
                "PC = 3: STOP".to_string(),
            ]
        );
    }
}
