//! Command-line arguments and subcommands, declared with `clap` derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tanka",
    version,
    about = "A small language front end with declarative macros."
)]
pub struct TankaArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a source file and report the first error, if any.
    Check {
        /// The path to the source file to check.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the Abstract Syntax Tree (AST) for a source file as JSON.
    Ast {
        /// The path to the source file to parse.
        #[arg(required = true)]
        file: PathBuf,
        /// Print the tree on a single line instead of pretty-printing.
        #[arg(long)]
        compact: bool,
    },
    /// Print the token stream for a source file, one token per line.
    Tokens {
        /// The path to the source file to scan.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the token stream with every macro call expanded.
    Expand {
        /// The path to the source file to expand.
        #[arg(required = true)]
        file: PathBuf,
    },
}
