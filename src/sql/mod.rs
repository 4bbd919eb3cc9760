pub mod ast;
pub mod lexer;
pub mod parser;
pub mod restore;

pub use parser::parse_statement;
pub use restore::restore;
