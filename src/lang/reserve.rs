use crate::diagnostics::Sink;

/// A name/code pair in a [`ReserveTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedWord {
    pub name: String,
    pub code: i32,
}

/// Static bidirectional lookup between mnemonics and integer codes.
///
/// Three tables are built from this type: the language's reserved words and
/// punctuation ([`ReserveTable::reserved_words`]), the four-letter token
/// mnemonics used in trace output ([`ReserveTable::token_mnemonics`]), and
/// the quad opcodes ([`ReserveTable::opcodes`]). Lookups are linear; none of
/// the tables exceeds a few dozen entries. Name comparison is exact, so the
/// scanner uppercases identifiers before asking.
#[derive(Debug, Clone, Default)]
pub struct ReserveTable {
    words: Vec<ReservedWord>,
}

impl ReserveTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_pairs(pairs: &[(&str, i32)]) -> Self {
        let mut table = ReserveTable::new();
        for (name, code) in pairs {
            table.add(name, *code);
        }
        table
    }

    /// Appends an entry and returns its position. Duplicates are not checked.
    pub fn add(&mut self, name: &str, code: i32) -> usize {
        self.words.push(ReservedWord {
            name: name.to_string(),
            code,
        });
        self.words.len() - 1
    }

    pub fn lookup_name(&self, name: &str) -> Option<i32> {
        self.words.iter().find(|w| w.name == name).map(|w| w.code)
    }

    pub fn lookup_code(&self, code: i32) -> Option<&str> {
        self.words
            .iter()
            .find(|w| w.code == code)
            .map(|w| w.name.as_str())
    }

    /// Checks that `code` names an entry, reporting to `out` when it does not.
    pub fn is_valid_opcode(&self, code: i32, out: &mut dyn Sink) -> bool {
        if self.lookup_code(code).is_some() {
            true
        } else {
            out.line(&format!("{} is not a valid Op Code.", code));
            false
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ReservedWord> {
        self.words.iter()
    }

    /// Reserved words and operator punctuation of the source language.
    pub fn reserved_words() -> Self {
        Self::from_pairs(&[
            ("GOTO", 0),
            ("INTEGER", 1),
            ("TO", 2),
            ("DO", 3),
            ("IF", 4),
            ("THEN", 5),
            ("ELSE", 6),
            ("FOR", 7),
            ("OF", 8),
            ("WRITELN", 9),
            ("READLN", 10),
            ("BEGIN", 11),
            ("END", 12),
            ("VAR", 13),
            ("WHILE", 14),
            ("UNIT", 15),
            ("LABEL", 16),
            ("REPEAT", 17),
            ("UNTIL", 18),
            ("PROCEDURE", 19),
            ("DOWNTO", 20),
            ("FUNCTION", 21),
            ("RETURN", 22),
            ("REAL", 23),
            ("STRING", 24),
            ("ARRAY", 25),
            ("/", 30),
            ("*", 31),
            ("+", 32),
            ("-", 33),
            ("(", 34),
            (")", 35),
            (";", 36),
            (":=", 37),
            (">", 38),
            ("<", 39),
            (">=", 40),
            ("<=", 41),
            ("=", 42),
            ("<>", 43),
            (",", 44),
            ("[", 45),
            ("]", 46),
            (":", 47),
            (".", 48),
        ])
    }

    /// Fixed-width mnemonics for every token code, including the classes the
    /// automaton assigns (identifier, constants, undefined).
    pub fn token_mnemonics() -> Self {
        Self::from_pairs(&[
            ("GOTO", 0),
            ("_INT", 1),
            ("__TO", 2),
            ("__DO", 3),
            ("__IF", 4),
            ("THEN", 5),
            ("ELSE", 6),
            ("_FOR", 7),
            ("__OF", 8),
            ("WTLN", 9),
            ("RDLN", 10),
            ("_BEG", 11),
            ("_END", 12),
            ("_VAR", 13),
            ("WHIL", 14),
            ("UNIT", 15),
            ("LABL", 16),
            ("REPT", 17),
            ("UNTL", 18),
            ("PROC", 19),
            ("DOWN", 20),
            ("FUNC", 21),
            ("RTRN", 22),
            ("REAL", 23),
            ("_STR", 24),
            ("ARRY", 25),
            ("_DIV", 30),
            ("_MUL", 31),
            ("_ADD", 32),
            ("_SUB", 33),
            ("LPAR", 34),
            ("RPAR", 35),
            ("SEMI", 36),
            ("ASGN", 37),
            ("__GT", 38),
            ("__LT", 39),
            ("GTEQ", 40),
            ("LTEQ", 41),
            ("__EQ", 42),
            ("NTEQ", 43),
            ("COMM", 44),
            ("LBRC", 45),
            ("RBRC", 46),
            ("COLN", 47),
            ("_DOT", 48),
            ("IDNT", 50),
            ("INTC", 51),
            ("FLTC", 52),
            ("STRC", 53),
            ("UNDF", 99),
        ])
    }

    /// Quad opcode mnemonics, codes 0..=16.
    pub fn opcodes() -> Self {
        Self::from_pairs(&[
            ("STOP", 0),
            ("DIV", 1),
            ("MUL", 2),
            ("SUB", 3),
            ("ADD", 4),
            ("MOV", 5),
            ("STI", 6),
            ("LDI", 7),
            ("BNZ", 8),
            ("BNP", 9),
            ("BNN", 10),
            ("BZ", 11),
            ("BP", 12),
            ("BN", 13),
            ("BR", 14),
            ("BINDR", 15),
            ("PRINT", 16),
        ])
    }
}
