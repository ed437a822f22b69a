//! Lexer implementation.

use lexgen_util::Loc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Token<'input> {
    /// `->`, the separator between the left- and right-hand side.
    Arrow,
    /// `|`, the separator between alternatives.
    VertBar,
    Newline,
    Symbol(&'input str),
}

pub type Spanned<'input> = (Loc, Token<'input>, Loc);

lexgen::lexer! {
    pub Lexer -> Token<'input>;

    let space = [' ' '\t'];
    let newline = '\r'* '\n' | '\r';
    let symbol_char = _ # [' ' '\t' '\r' '\n' '|'];

    rule Init {
        $space+,
        $newline = Token::Newline,
        "->" = Token::Arrow,
        "|" = Token::VertBar,
        $symbol_char+ => |lexer| {
            let token = Token::Symbol(lexer.match_());
            lexer.return_(token)
        },
    }
}
