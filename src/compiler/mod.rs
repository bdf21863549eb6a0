//! Compile driver: tokenize every section into one stream, then parse it.
pub mod options;

use std::{fs::read_to_string, path::Path};

use anyhow::Context;
use log::{debug, info};
pub use options::CompileOptions;

use crate::{
	CompileError, CompiledScript, parser::Parser, symbol_table::SymbolTable, token_stream::TokenStream,
	tokenizer::Tokenizer,
};

/// One named piece of source, e.g. a header or the main script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
	pub name: String,
	pub text: String,
}

impl Section {
	pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
		Self { name: name.into(), text: text.into() }
	}
}

/// Compiler is the entry point for turning script source into bytecode.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compiler {
	options: CompileOptions,
}

impl Compiler {
	pub fn new(options: CompileOptions) -> Self { Self { options } }

	pub fn options(&self) -> CompileOptions { self.options }

	/// Compile a single unnamed section.
	pub fn compile(&self, source: &str) -> Result<CompiledScript, CompileError> {
		self.compile_sections(&[Section::new("", source)])
	}

	/// Compile a file, the file name becomes the section name.
	pub fn compile_file<P: AsRef<Path>>(&self, path: P) -> Result<CompiledScript, CompileError> {
		let path = path.as_ref();
		let source = read_to_string(path).with_context(|| format!("Failed open source file {}", path.display()))?;
		self.compile_sections(&[Section::new(path.display().to_string(), source)])
	}

	/// Compile consecutive sections as one unit.
	pub fn compile_sections(&self, sections: &[Section]) -> Result<CompiledScript, CompileError> {
		let mut sym = SymbolTable::new();
		self.compile_with(sections, &mut sym)
	}

	/// Like [`Compiler::compile_sections`], but the symbol table is the
	/// caller's and can be inspected afterwards.
	pub fn compile_with(&self, sections: &[Section], sym: &mut SymbolTable) -> Result<CompiledScript, CompileError> {
		sym.reset();
		let tokens = self.tokenize(sections, sym)?;
		debug!("Tokenized {} sections into {} symbols", sections.len(), tokens.len());

		let scrip = Parser::new(sym, &tokens, self.options).parse()?;
		info!(
			"Compiled {} sections: {} code cells, {} bytes of global data",
			sections.len(),
			scrip.codesize(),
			scrip.global_data.len()
		);
		Ok(scrip)
	}

	/// Tokenize the sections without compiling them.
	pub fn tokenize(&self, sections: &[Section], sym: &mut SymbolTable) -> Result<TokenStream, CompileError> {
		let mut tokens = TokenStream::new();
		let mut tokenizer = Tokenizer::new(sym, &mut tokens);
		for section in sections {
			if let Err(e) = tokenizer.tokenize(&section.name, &section.text) {
				return Err(CompileError::from_scanner(e, tokenizer.section()));
			}
		}
		Ok(tokens)
	}
}
