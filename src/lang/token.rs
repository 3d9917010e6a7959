/// Token classes produced by the scanner.
///
/// The discriminants are the codes stored in the reserved-word table, so a
/// reserve lookup can be turned back into a `TokenCode` with
/// [`TokenCode::from_code`]. Both the lexer and the parser use this one
/// enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TokenCode {
    // Reserved words
    Goto = 0,
    Integer = 1,
    To = 2,
    Do = 3,
    If = 4,
    Then = 5,
    Else = 6,
    For = 7,
    Of = 8,
    Writeln = 9,
    Readln = 10,
    Begin = 11,
    End = 12,
    Var = 13,
    While = 14,
    Unit = 15,
    Label = 16,
    Repeat = 17,
    Until = 18,
    Procedure = 19,
    Downto = 20,
    Function = 21,
    Return = 22,
    Real = 23,
    String = 24,
    Array = 25,

    // Operators and punctuation
    Divide = 30,
    Multiply = 31,
    Plus = 32,
    Minus = 33,
    LPar = 34,
    RPar = 35,
    Semicolon = 36,
    Assign = 37,
    Greater = 38,
    Less = 39,
    GreaterEq = 40,
    LessEq = 41,
    Equal = 42,
    NotEqual = 43,
    Comma = 44,
    LBracket = 45,
    RBracket = 46,
    Colon = 47,
    Period = 48,

    // Classified by the automaton rather than by table lookup
    Identifier = 50,
    IntConst = 51,
    FloatConst = 52,
    StringConst = 53,

    // Also used as the end-of-file marker once the source is exhausted
    Undefined = 99,
}

impl TokenCode {
    const ALL: [TokenCode; 50] = [
        TokenCode::Goto,
        TokenCode::Integer,
        TokenCode::To,
        TokenCode::Do,
        TokenCode::If,
        TokenCode::Then,
        TokenCode::Else,
        TokenCode::For,
        TokenCode::Of,
        TokenCode::Writeln,
        TokenCode::Readln,
        TokenCode::Begin,
        TokenCode::End,
        TokenCode::Var,
        TokenCode::While,
        TokenCode::Unit,
        TokenCode::Label,
        TokenCode::Repeat,
        TokenCode::Until,
        TokenCode::Procedure,
        TokenCode::Downto,
        TokenCode::Function,
        TokenCode::Return,
        TokenCode::Real,
        TokenCode::String,
        TokenCode::Array,
        TokenCode::Divide,
        TokenCode::Multiply,
        TokenCode::Plus,
        TokenCode::Minus,
        TokenCode::LPar,
        TokenCode::RPar,
        TokenCode::Semicolon,
        TokenCode::Assign,
        TokenCode::Greater,
        TokenCode::Less,
        TokenCode::GreaterEq,
        TokenCode::LessEq,
        TokenCode::Equal,
        TokenCode::NotEqual,
        TokenCode::Comma,
        TokenCode::LBracket,
        TokenCode::RBracket,
        TokenCode::Colon,
        TokenCode::Period,
        TokenCode::Identifier,
        TokenCode::IntConst,
        TokenCode::FloatConst,
        TokenCode::StringConst,
        TokenCode::Undefined,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric code back to its token class.
    pub fn from_code(code: i32) -> Option<TokenCode> {
        TokenCode::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Returns true for tokens that may begin a statement; used as the
    /// resynchronization set after a syntax error.
    pub fn is_statement_start(self) -> bool {
        matches!(
            self,
            TokenCode::Identifier
                | TokenCode::Begin
                | TokenCode::If
                | TokenCode::While
                | TokenCode::Repeat
                | TokenCode::For
                | TokenCode::Goto
                | TokenCode::Writeln
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            TokenCode::Equal
                | TokenCode::NotEqual
                | TokenCode::Less
                | TokenCode::Greater
                | TokenCode::LessEq
                | TokenCode::GreaterEq
        )
    }

    pub fn is_add_op(self) -> bool {
        matches!(self, TokenCode::Plus | TokenCode::Minus)
    }

    pub fn is_mul_op(self) -> bool {
        matches!(self, TokenCode::Multiply | TokenCode::Divide)
    }
}

impl std::fmt::Display for TokenCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenCode::Goto => "GOTO",
            TokenCode::Integer => "INTEGER",
            TokenCode::To => "TO",
            TokenCode::Do => "DO",
            TokenCode::If => "IF",
            TokenCode::Then => "THEN",
            TokenCode::Else => "ELSE",
            TokenCode::For => "FOR",
            TokenCode::Of => "OF",
            TokenCode::Writeln => "WRITELN",
            TokenCode::Readln => "READLN",
            TokenCode::Begin => "BEGIN",
            TokenCode::End => "END",
            TokenCode::Var => "VAR",
            TokenCode::While => "WHILE",
            TokenCode::Unit => "UNIT",
            TokenCode::Label => "LABEL",
            TokenCode::Repeat => "REPEAT",
            TokenCode::Until => "UNTIL",
            TokenCode::Procedure => "PROCEDURE",
            TokenCode::Downto => "DOWNTO",
            TokenCode::Function => "FUNCTION",
            TokenCode::Return => "RETURN",
            TokenCode::Real => "REAL",
            TokenCode::String => "STRING",
            TokenCode::Array => "ARRAY",
            TokenCode::Divide => "DIVIDE",
            TokenCode::Multiply => "MULTIPLY",
            TokenCode::Plus => "PLUS",
            TokenCode::Minus => "MINUS",
            TokenCode::LPar => "LPAR",
            TokenCode::RPar => "RPAR",
            TokenCode::Semicolon => "SEMICOLON",
            TokenCode::Assign => "ASSIGN",
            TokenCode::Greater => "GREATER_THAN",
            TokenCode::Less => "LESS_THAN",
            TokenCode::GreaterEq => "GREATER_THAN_OR_EQUAL",
            TokenCode::LessEq => "LESS_THAN_OR_EQUAL",
            TokenCode::Equal => "EQUAL",
            TokenCode::NotEqual => "NOT_EQUAL",
            TokenCode::Comma => "COMMA",
            TokenCode::LBracket => "LEFT_BRACKET",
            TokenCode::RBracket => "RIGHT_BRACKET",
            TokenCode::Colon => "COLON",
            TokenCode::Period => "PERIOD",
            TokenCode::Identifier => "IDENTIFIER",
            TokenCode::IntConst => "INTTYPE",
            TokenCode::FloatConst => "FLOAT",
            TokenCode::StringConst => "STRINGTYPE",
            TokenCode::Undefined => "UNDEFINED",
        };
        write!(f, "{}", name)
    }
}

/// One scanned token.
///
/// `symbol` is the symbol-table index the scanner registered (or found) for
/// identifiers and literals; reserved words and punctuation carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub code: TokenCode,
    pub lexeme: std::string::String,
    pub symbol: Option<usize>,
    /// 1-based source line the token ended on.
    pub line: usize,
}

impl Token {
    pub fn new(code: TokenCode, lexeme: impl Into<std::string::String>, line: usize) -> Self {
        Token {
            code,
            lexeme: lexeme.into(),
            symbol: None,
            line,
        }
    }

    /// Marker returned once the source is exhausted.
    pub fn eof(line: usize) -> Self {
        Token::new(TokenCode::Undefined, "", line)
    }

    pub fn is_eof(&self) -> bool {
        self.code == TokenCode::Undefined && self.lexeme.is_empty()
    }

    pub fn with_symbol(mut self, index: usize) -> Self {
        self.symbol = Some(index);
        self
    }
}
