use crate::diagnostics::Sink;
use crate::ir::{Opcode, Quad, QuadTable, SymbolTable};
use crate::lang::{ReserveTable, Value};

/// Writes the symbol table, one row per slot, in index order.
pub fn write_symbol_table(symbols: &SymbolTable, out: &mut dyn Sink) {
    out.line("SYMBOL TABLE");
    out.line("════════════════════════════════════════════════════════");
    out.line(&format!(
        "{:>4} | {:<16} | {:<8} | {:<8} | {}",
        "#", "Name", "Kind", "Type", "Value"
    ));
    out.line("────────────────────────────────────────────────────────");
    for (index, symbol) in symbols.symbols().iter().enumerate() {
        out.line(&format!(
            "{:>4} | {:<16} | {:<8} | {:<8} | {}",
            index,
            symbol.name,
            symbol.kind.to_string(),
            symbol.data_type().to_string(),
            format_value(&symbol.value)
        ));
    }
    out.line("════════════════════════════════════════════════════════");
}

/// Writes the quad table. Addresses that some branch jumps to are marked.
pub fn write_quad_table(quads: &QuadTable, out: &mut dyn Sink) {
    let jump_targets = collect_jump_targets(quads.quads());

    out.line("QUAD TABLE");
    out.line("════════════════════════════════════════");
    out.line(&format!(
        "{:>4}   {:<7}| {:>5} | {:>5} | {:>5}",
        "addr", "Opcode", "Op1", "Op2", "Op3"
    ));
    out.line("────────────────────────────────────────");
    for (address, quad) in quads.quads().iter().enumerate() {
        let marker = if jump_targets.contains(&address) {
            "►"
        } else {
            " "
        };
        out.line(&format!(
            "{:04} {} {}",
            address,
            marker,
            format_quad(quads, quad)
        ));
    }
    out.line("════════════════════════════════════════");
}

/// Writes a reserve table in insertion order.
pub fn write_reserve_table(title: &str, table: &ReserveTable, out: &mut dyn Sink) {
    out.line(title);
    out.line("────────────────");
    out.line(&format!("|{:<9}|{:>5}|", "Name", "Code"));
    out.line("────────────────");
    for word in table.iter() {
        out.line(&format!("|{:<9}|{:>5}|", word.name, word.code));
    }
    out.line("────────────────");
}

fn format_quad(quads: &QuadTable, quad: &Quad) -> String {
    let mnemonic = quads
        .get_mnemonic(quad.opcode)
        .map(str::to_string)
        .unwrap_or_else(|| format!("?{}", quad.opcode));
    format!(
        "{:<7}| {:>5} | {:>5} | {:>5}",
        mnemonic, quad.op1, quad.op2, quad.op3
    )
}

fn collect_jump_targets(quads: &[Quad]) -> Vec<usize> {
    let mut targets = Vec::new();

    for quad in quads {
        let is_jump = Opcode::from_code(quad.opcode)
            .map(Opcode::is_jump)
            .unwrap_or(false);
        if is_jump && quad.op3 >= 0 {
            let target = quad.op3 as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Int(n) => format!("{}", n),
        Value::Real(f) => format!("{:?}", f),
        Value::Text(s) => format!("{:?}", s),
    }
}
