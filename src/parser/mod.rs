//! Single pass parser and code generator.
//!
//! The parser walks the [`TokenStream`] once, from the first declaration to
//! the last, and writes bytecode into a [`CompiledScript`] as it recognizes
//! each construct. Nothing is kept in between: there is no syntax tree.
//!
//! Statements are read front to back with a cursor. An expression is first
//! delimited as a sub view of the stream, then split recursively at its
//! loosest binding operator:
//!
//! |Priority|Operators|
//! --|--
//! 1|`!` `~` (unary)
//! 3|`*` `/` `%`
//! 5|`+` `-`
//! 7|`<<` `>>`
//! 9|`&`
//! 10|`\|` `^`
//! 12|`==` `!=` `<` `>` `<=` `>=`
//! 18|`&&`
//! 19|`\|\|`
//! 20|`?:`
//!
//! Values travel in `AX`; the left operand of a binary operator waits on the
//! stack while the right one is computed. Code whose target is not known yet
//! (forward jumps, calls to functions defined further down) is emitted with a
//! placeholder and patched once the target turns up.
mod access;
mod declaration;
mod expression;
mod function;
mod literal;
mod statement;
mod types;

use log::debug;

use crate::{
	compiled_script::{CompiledScript, ExportKind},
	compiler::CompileOptions,
	error::parser::{ParseError, ParseErrorType, ParserError},
	symbol_table::{Punct, Qualifiers, Symbol, SymbolFlags, SymbolKind, SymbolTable, Vartype},
	token_stream::{SrcList, TokenStream},
};

/// The function whose body is being compiled.
struct FunctionContext {
	symbol:      Symbol,
	/// Struct that `this` points at, `None` in static and global functions
	this_type:   Option<Symbol>,
	/// Struct the function is a member of
	owner:       Option<Symbol>,
	return_type: Vartype,
}

/// A loop or switch whose `break` and `continue` jumps wait for their
/// targets.
struct LoopContext {
	/// Nesting level the statement sits at
	level:     usize,
	/// `continue` passes switches by to the loop around them
	switch:    bool,
	breaks:    Vec<usize>,
	continues: Vec<usize>,
}

/// A call to a function whose body has not been compiled yet.
struct PendingCall {
	function: Symbol,
	/// Code cell that receives the function's offset
	operand:  usize,
	line:     usize,
	section:  String,
}

/// A name listed after `export`, resolved once the whole unit is compiled.
struct PendingExport {
	symbol:  Symbol,
	line:    usize,
	section: String,
}

pub struct Parser<'a> {
	sym:           &'a mut SymbolTable,
	src:           SrcList<'a>,
	scrip:         CompiledScript,
	options:       CompileOptions,
	function:      Option<FunctionContext>,
	/// Parameters and local variables in declaration order
	locals:        Vec<Symbol>,
	/// Block depth inside the current function, 0 outside of functions
	nesting:       usize,
	loops:         Vec<LoopContext>,
	pending_calls: Vec<PendingCall>,
	exports:       Vec<PendingExport>,
	section:       Option<String>,
}

impl<'a> Parser<'a> {
	pub fn new(sym: &'a mut SymbolTable, tokens: &'a TokenStream, options: CompileOptions) -> Self {
		Self {
			sym,
			src: tokens.view(),
			scrip: CompiledScript::new(),
			options,
			function: None,
			locals: vec![],
			nesting: 0,
			loops: vec![],
			pending_calls: vec![],
			exports: vec![],
			section: None,
		}
	}

	/// Compile the whole token stream.
	pub fn parse(mut self) -> Result<CompiledScript, ParserError> {
		while !self.src.reached_eof() {
			self.track_section();
			self.parse_top_level()?;
		}
		self.check_pending_calls()?;
		self.emit_exports()?;
		debug!(
			"Compiled {} code cells, {} fixups, {} functions",
			self.scrip.codesize(),
			self.scrip.fixups.len(),
			self.scrip.functions.len()
		);
		Ok(self.scrip)
	}

	fn track_section(&mut self) {
		let section = self.src.section_at(self.src.cursor());
		if self.section.as_deref() != Some(section) {
			debug!("Entering section {section:?}");
			self.scrip.start_new_section(section);
			self.section = Some(section.to_string());
		}
	}

	fn check_pending_calls(&self) -> Result<(), ParserError> {
		match self.pending_calls.first() {
			None => Ok(()),
			Some(call) => Err(self.error_at(
				call.line,
				&call.section,
				ParseErrorType::NeverDefined(self.name(call.function)),
			)),
		}
	}

	fn emit_exports(&mut self) -> Result<(), ParserError> {
		for export in std::mem::take(&mut self.exports) {
			let entry = &self.sym[export.symbol];
			match entry.kind {
				SymbolKind::Function if entry.flags.contains(SymbolFlags::HAS_BODY) => {
					let arity = entry.signature.as_ref().map_or(0, function::arity);
					let name = format!("{}${arity}", entry.name);
					self.scrip.add_export(name, ExportKind::Function, entry.offset as usize);
				}
				SymbolKind::GlobalVar if !entry.is_imported() => {
					self.scrip.add_export(entry.name.clone(), ExportKind::Data, entry.offset as usize);
				}
				_ => {
					return Err(self.error_at(
						export.line,
						&export.section,
						ParseErrorType::ExportUndefined(self.name(export.symbol)),
					));
				}
			}
		}

		if self.options.contains(CompileOptions::EXPORT_ALL) {
			for function in self.scrip.functions.clone() {
				let arity = self
					.sym
					.find(&function.name)
					.and_then(|f| self.sym[f].signature.as_ref().map(function::arity))
					.unwrap_or(function.num_args);
				self.scrip.add_export(format!("{}${arity}", function.name), ExportKind::Function, function.offset);
			}
		}
		Ok(())
	}
}

/// Error construction and token helpers.
impl<'a> Parser<'a> {
	fn error(&self, r#type: ParseErrorType) -> ParserError {
		let scope = self.function.as_ref().map(|f| self.name(f.symbol));
		ParseError::new(self.src.lineno(), self.src.section(), scope, r#type).into()
	}

	fn error_at(&self, line: usize, section: &str, r#type: ParseErrorType) -> ParserError {
		ParseError::new(line, section, None, r#type).into()
	}

	fn name(&self, symbol: Symbol) -> String { self.sym.name(symbol).to_string() }

	fn expected(&self, expected: &str, found: Symbol) -> ParserError {
		self.error(ParseErrorType::Expected { expected: expected.to_string(), found: self.name(found) })
	}

	fn unexpected(&self, symbol: Symbol) -> ParserError { self.error(ParseErrorType::Unexpected(self.name(symbol))) }

	fn peek_is(&self, punct: Punct) -> bool { self.sym.is_punct(self.src.peek_next(), punct) }

	fn peek_kind(&self) -> SymbolKind { self.sym.kind(self.src.peek_next()) }

	/// Consume the next symbol if it is `punct`.
	fn next_if(&mut self, punct: Punct) -> bool {
		let matched = self.peek_is(punct);
		if matched {
			self.src.get_next();
		}
		matched
	}

	fn expect(&mut self, punct: Punct, expected: &str) -> Result<(), ParserError> {
		let symbol = self.src.get_next();
		if self.sym.is_punct(symbol, punct) { Ok(()) } else { Err(self.expected(expected, symbol)) }
	}

	/// Reject symbols that cannot name anything.
	fn expect_identifier(&self, symbol: Symbol) -> Result<(), ParserError> {
		use SymbolKind::*;
		match self.sym.kind(symbol) {
			Keyword(_) | Operator(_) | Assign | CompoundAssign(_) | Crement(_) | Punct(_) | LiteralInt
			| LiteralFloat | LiteralString | Null => Err(self.expected("an identifier", symbol)),
			NoType if symbol.is_eof() => Err(self.expected("an identifier", symbol)),
			_ => Ok(()),
		}
	}

	/// Record the position of the symbol consumed last as `symbol`'s
	/// declaration.
	fn declare_here(&mut self, symbol: Symbol) {
		let (section, line) = (self.src.section(), self.src.lineno());
		self.sym.set_declared(symbol, section, line);
	}

	fn parse_qualifiers(&mut self) -> Qualifiers {
		let mut qualifiers = Qualifiers::empty();
		while let SymbolKind::Keyword(keyword) = self.peek_kind() {
			let Some(qualifier) = keyword.qualifier() else { break };
			qualifiers |= qualifier;
			self.src.get_next();
		}
		qualifiers
	}

	fn check_qualifiers(&self, found: Qualifiers, allowed: Qualifiers, context: &str) -> Result<(), ParserError> {
		match found.difference(allowed).iter_names().next() {
			None => Ok(()),
			Some((name, _)) => Err(self.error(ParseErrorType::QualifierNotAllowed {
				qualifier: name.to_lowercase(),
				context:   context.to_string(),
			})),
		}
	}

	/// Position of the bracket closing the one at `open`.
	fn find_closer(&self, list: &SrcList<'a>, open: usize) -> Option<usize> {
		let mut depth = 0usize;
		for pos in open..list.len() {
			match self.sym.kind(list[pos]) {
				SymbolKind::Punct(Punct::OpenParen | Punct::OpenBracket | Punct::OpenBrace) => depth += 1,
				SymbolKind::Punct(Punct::CloseParen | Punct::CloseBracket | Punct::CloseBrace) => {
					depth = depth.checked_sub(1)?;
					if depth == 0 {
						return Some(pos);
					}
				}
				_ => {}
			}
		}
		None
	}

	/// First position from `from` on, outside of any brackets, whose kind is
	/// `wanted`.
	fn find_top_level(&self, list: &SrcList<'a>, from: usize, wanted: impl Fn(SymbolKind) -> bool) -> Option<usize> {
		let mut depth = 0usize;
		for pos in from..list.len() {
			let kind = self.sym.kind(list[pos]);
			if depth == 0 && wanted(kind) {
				return Some(pos);
			}
			match kind {
				SymbolKind::Punct(Punct::OpenParen | Punct::OpenBracket | Punct::OpenBrace) => depth += 1,
				SymbolKind::Punct(Punct::CloseParen | Punct::CloseBracket | Punct::CloseBrace) => {
					depth = depth.saturating_sub(1)
				}
				_ => {}
			}
		}
		None
	}

	/// Split at top level `separator`s.
	fn split_top_level(&self, list: &SrcList<'a>, separator: Punct) -> Vec<SrcList<'a>> {
		let mut parts = vec![];
		let mut start = 0;
		while let Some(pos) = self.find_top_level(list, start, |k| k == SymbolKind::Punct(separator)) {
			parts.push(list.sub_view(start, pos));
			start = pos + 1;
		}
		parts.push(list.sub_view(start, list.len()));
		parts
	}

	/// Consume `( ... )` and return what is inside.
	fn parenthesized(&mut self) -> Result<SrcList<'a>, ParserError> {
		self.expect(Punct::OpenParen, "'('")?;
		let open = self.src.cursor() - 1;
		let Some(close) = self.find_closer(&self.src, open) else {
			self.src.set_cursor(self.src.len());
			return Err(self.expected("')'", Symbol::EOF));
		};
		let inner = self.src.sub_view(open + 1, close);
		self.src.set_cursor(close + 1);
		Ok(inner)
	}

	/// The symbols up to the next top level `terminator`, which stays
	/// unconsumed.
	fn until(&mut self, terminator: Punct, expected: &str) -> Result<SrcList<'a>, ParserError> {
		self.until_any(&[terminator], expected)
	}

	fn until_any(&mut self, terminators: &[Punct], expected: &str) -> Result<SrcList<'a>, ParserError> {
		let start = self.src.cursor();
		let found = self.find_top_level(&self.src, start, |k| matches!(k, SymbolKind::Punct(p) if terminators.contains(&p)));
		let Some(end) = found else {
			self.src.set_cursor(self.src.len());
			return Err(self.expected(expected, Symbol::EOF));
		};
		self.src.set_cursor(end);
		Ok(self.src.sub_view(start, end))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{compiled_script::Opcode, tokenizer::tokenize};

	pub(super) fn compile(source: &str) -> Result<CompiledScript, ParserError> {
		compile_with(source, CompileOptions::empty())
	}

	pub(super) fn compile_with(source: &str, options: CompileOptions) -> Result<CompiledScript, ParserError> {
		let mut sym = SymbolTable::new();
		let tokens = tokenize(&mut sym, "Test", source).expect("tokenizes");
		Parser::new(&mut sym, &tokens, options).parse()
	}

	pub(super) fn message(source: &str) -> String {
		match compile(source) {
			Ok(_) => panic!("compiled without an error: {source}"),
			Err(ParserError::ParseError(err)) => err.r#type.to_string(),
			Err(err) => panic!("internal error: {err}"),
		}
	}

	/// Opcodes of the code, operands skipped.
	pub(super) fn opcodes(scrip: &CompiledScript) -> Vec<Opcode> {
		let mut ops = vec![];
		let mut pos = 0;
		while let Some(op) = scrip.code.get(pos).and_then(|&c| Opcode::from_code(c)) {
			ops.push(op);
			pos += 1 + op.arity();
		}
		ops
	}

	/// Instructions with their start cell and operands.
	pub(super) fn instructions(scrip: &CompiledScript) -> Vec<(usize, Opcode, Vec<i32>)> {
		let mut instructions = vec![];
		let mut pos = 0;
		while let Some(op) = scrip.code.get(pos).and_then(|&c| Opcode::from_code(c)) {
			let args = scrip.code[pos + 1..pos + 1 + op.arity()].to_vec();
			instructions.push((pos, op, args));
			pos += 1 + op.arity();
		}
		instructions
	}

	#[test]
	fn empty_unit() {
		let scrip = compile("").unwrap();
		assert!(scrip.code.is_empty());
		assert!(scrip.fixups.is_empty());
	}

	#[test]
	fn sections_are_recorded() {
		let mut sym = SymbolTable::new();
		let mut tokens = TokenStream::new();
		let mut tokenizer = crate::tokenizer::Tokenizer::new(&mut sym, &mut tokens);
		tokenizer.tokenize("Header", "int a;").unwrap();
		tokenizer.tokenize("Main", "void f() { a = 1; }").unwrap();
		let scrip = Parser::new(&mut sym, &tokens, CompileOptions::empty()).parse().unwrap();
		let names: Vec<_> = scrip.sections.iter().map(|s| s.name.as_str()).collect();
		assert_eq!(names, ["Header", "Main"]);
		assert_eq!(scrip.sections[1].offset, 0);
	}

	#[test]
	fn errors_carry_position_and_scope() {
		let Err(ParserError::ParseError(err)) = compile("int a;\nvoid f()\n{\n  a = b;\n}") else {
			panic!("expected a parse error");
		};
		assert_eq!(err.line, 4);
		assert_eq!(err.section, "Test");
		assert_eq!(err.scope.as_deref(), Some("f"));
		assert_eq!(err.r#type, ParseErrorType::Undefined("b".to_string()));
	}

	#[test]
	fn qualifier_checks_name_the_qualifier() {
		assert_eq!(message("static enum E { A };"), "'static' is not allowed in front of 'enum'");
		assert_eq!(message("void f(static int a);"), "'static' is not allowed in a parameter list");
		assert_eq!(message("void f() { import int a; }"), "'import' is not allowed inside a function body");
	}
}
