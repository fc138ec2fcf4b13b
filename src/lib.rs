pub mod ast;
pub mod codegen;
pub mod dot;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;
pub mod value;
