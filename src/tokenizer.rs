//! Interns scanner output into the symbol table and appends it to a
//! [`TokenStream`].
//!
//! Names declared inside a struct body are interned mangled, so for
//! `struct B { String B; float A; };` the stream holds `B::B` and `B::A`.
//! Type names, names following a qualifier and array sizes keep their bare
//! spelling. Brackets are matched on the way.
use log::trace;

use crate::{
	ScanError, ScanErrorType, ScannerError,
	scanner::{LexemeType, Scanner},
	symbol_table::{Keyword, Punct, Symbol, SymbolKind, SymbolTable},
	token_stream::TokenStream,
};

/// Prefix of the string literal the preprocessor writes where a new section
/// starts.
pub const NEW_SECTION_MARKER: &str = "\"__NEWSCRIPTSTART_";

/// Where the tokenizer is with respect to a struct declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StructState {
	Outside,
	/// Seen `struct`, the name comes next
	ExpectName,
	/// Seen `struct Name`, waiting for `{` or `;`
	Header(String),
	/// Inside the braces of struct `name`
	Body { name: String, depth: usize, parens: usize },
}

/// Turns source sections into symbols.
pub struct Tokenizer<'a> {
	sym:      &'a mut SymbolTable,
	tokens:   &'a mut TokenStream,
	section:  String,
	line:     Option<usize>,
	state:    StructState,
	previous: Option<Symbol>,
	/// Open brackets with the line they were opened on
	brackets: Vec<(char, usize)>,
}

impl<'a> Tokenizer<'a> {
	pub fn new(sym: &'a mut SymbolTable, tokens: &'a mut TokenStream) -> Self {
		Self {
			sym,
			tokens,
			section: String::new(),
			line: None,
			state: StructState::Outside,
			previous: None,
			brackets: vec![],
		}
	}

	/// Section of the token tokenized last.
	pub fn section(&self) -> &str { &self.section }

	/// Tokenize one section. Brackets must balance within the section.
	pub fn tokenize(&mut self, section: &str, source: &str) -> Result<(), ScannerError> {
		trace!("Tokenizing section {section:?}, {} bytes", source.len());
		self.enter_section(section);
		let mut scanner = Scanner::new(source);
		while let Some(lexeme) = scanner.next_lexeme()? {
			if lexeme.r#type == LexemeType::StringLiteral && lexeme.text.starts_with(NEW_SECTION_MARKER) {
				let name = &lexeme.text[NEW_SECTION_MARKER.len()..lexeme.text.len() - 1];
				self.check_all_closed(lexeme.line)?;
				self.enter_section(name);
				scanner.set_line(0);
				continue;
			}

			if self.line != Some(lexeme.line) {
				self.tokens.new_line(lexeme.line);
				self.line = Some(lexeme.line);
			}
			let symbol = match lexeme.r#type {
				LexemeType::Identifier => self.intern_identifier(&lexeme.text),
				LexemeType::IntLiteral => self.intern_literal(&lexeme.text, SymbolKind::LiteralInt),
				LexemeType::FloatLiteral => self.intern_literal(&lexeme.text, SymbolKind::LiteralFloat),
				LexemeType::StringLiteral => self.intern_literal(&lexeme.text, SymbolKind::LiteralString),
				LexemeType::NonChar => {
					let symbol = self.sym.find_or_add(&lexeme.text);
					self.track_punctuation(symbol, lexeme.line)?;
					symbol
				}
			};
			self.tokens.append(symbol);
			self.previous = Some(symbol);
		}
		self.check_all_closed(scanner.line())
	}

	fn enter_section(&mut self, name: &str) {
		self.section = name.to_string();
		self.tokens.new_section(name);
		self.line = None;
		self.state = StructState::Outside;
		self.previous = None;
	}

	fn intern_literal(&mut self, text: &str, kind: SymbolKind) -> Symbol {
		let symbol = self.sym.find_or_add(text);
		if self.sym.kind(symbol) == SymbolKind::NoType {
			self.sym[symbol].kind = kind;
		}
		symbol
	}

	fn intern_identifier(&mut self, name: &str) -> Symbol {
		let predefined = self.sym.find(name).is_some_and(|s| self.sym.kind(s) != SymbolKind::NoType);
		let mangled = match &self.state {
			StructState::Body { name: owner, depth: 1, parens: 0 } if !predefined && self.member_position() => {
				Some(SymbolTable::mangle(owner, name))
			}
			_ => None,
		};
		if self.state == StructState::ExpectName {
			self.state = StructState::Header(name.to_string());
		}

		let symbol = self.sym.find_or_add(mangled.as_deref().unwrap_or(name));
		if self.sym.is_keyword(symbol, Keyword::Struct) {
			self.state = StructState::ExpectName;
		}
		symbol
	}

	/// Whether an identifier at this point of a struct body names a member.
	/// Type names follow `{`, `;` or a qualifier; array sizes follow `[`.
	fn member_position(&self) -> bool {
		let Some(previous) = self.previous else {
			return false;
		};
		match self.sym.kind(previous) {
			SymbolKind::Punct(Punct::OpenBrace | Punct::Semicolon | Punct::OpenBracket) => false,
			SymbolKind::Keyword(keyword) => keyword.qualifier().is_none(),
			_ => true,
		}
	}

	fn track_punctuation(&mut self, symbol: Symbol, line: usize) -> Result<(), ScanError> {
		let SymbolKind::Punct(punct) = self.sym.kind(symbol) else {
			return Ok(());
		};
		match (&mut self.state, punct) {
			(StructState::ExpectName | StructState::Header(_), Punct::Semicolon) => self.state = StructState::Outside,
			(StructState::Header(name), Punct::OpenBrace) => {
				self.state = StructState::Body { name: std::mem::take(name), depth: 1, parens: 0 };
			}
			(StructState::Body { depth, .. }, Punct::OpenBrace) => *depth += 1,
			(StructState::Body { depth, .. }, Punct::CloseBrace) => {
				*depth -= 1;
				if *depth == 0 {
					self.state = StructState::Outside;
				}
			}
			(StructState::Body { parens, .. }, Punct::OpenParen) => *parens += 1,
			(StructState::Body { parens, .. }, Punct::CloseParen) => *parens = parens.saturating_sub(1),
			_ => {}
		}

		let (opener, closer) = match punct {
			Punct::OpenParen | Punct::OpenBracket | Punct::OpenBrace => {
				self.brackets.push((bracket_char(punct), line));
				return Ok(());
			}
			Punct::CloseParen => ('(', ')'),
			Punct::CloseBracket => ('[', ']'),
			Punct::CloseBrace => ('{', '}'),
			_ => return Ok(()),
		};
		match self.brackets.pop() {
			None => Err(ScanError::new(line, ScanErrorType::UnopenedBracket(closer))),
			Some((open, _)) if open == opener => Ok(()),
			Some((open, opener_line)) => Err(ScanError::new(
				line,
				ScanErrorType::BracketMismatch { closer, opener: open, opener_line, same_line: opener_line == line },
			)),
		}
	}

	fn check_all_closed(&mut self, line: usize) -> Result<(), ScannerError> {
		match self.brackets.pop() {
			None => Ok(()),
			Some((opener, opener_line)) => {
				Err(ScanError::new(line, ScanErrorType::UnclosedBracket { opener, opener_line }).into())
			}
		}
	}
}

fn bracket_char(punct: Punct) -> char {
	match punct {
		Punct::OpenParen => '(',
		Punct::OpenBracket => '[',
		_ => '{',
	}
}

/// Convenience for callers that only need the token stream.
pub fn tokenize(sym: &mut SymbolTable, section: &str, source: &str) -> Result<TokenStream, ScannerError> {
	let mut tokens = TokenStream::new();
	Tokenizer::new(sym, &mut tokens).tokenize(section, source)?;
	Ok(tokens)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(sym: &SymbolTable, tokens: &TokenStream) -> Vec<String> {
		tokens.symbols().iter().map(|&s| sym.name(s).to_string()).collect()
	}

	#[test]
	fn operators_are_interned_greedily() {
		let mut sym = SymbolTable::new();
		let tokens = tokenize(&mut sym, "", "i++<=j").unwrap();
		assert_eq!(names(&sym, &tokens), ["i", "++", "<=", "j"]);
	}

	#[test]
	fn struct_members_are_mangled() {
		let mut sym = SymbolTable::new();
		let source = "struct B { String B; float A; };\nint C;";
		let tokens = tokenize(&mut sym, "", source).unwrap();
		assert_eq!(names(&sym, &tokens), [
			"struct", "B", "{", "String", "B::B", ";", "float", "B::A", ";", "}", ";", "int", "C", ";"
		]);
		assert!(sym.find("B::B").is_some());
		assert!(sym.find("B::A").is_some());
		assert!(sym.find("A").is_none());
		assert!(sym.find("C").is_some());
		assert!(sym.find("B::C").is_none());
		assert!(sym.find("TestIt::Outside").is_none());
	}

	#[test]
	fn member_declarations_keep_types_and_parameters_bare() {
		let mut sym = SymbolTable::new();
		let source = "managed struct S extends T {\n\
			import static S* Create(int x, float y = 1.5);\n\
			readonly attribute int Size[];\n\
			protected Thing *items[MAX], other;\n\
			};";
		let tokens = tokenize(&mut sym, "", source).unwrap();
		let names = names(&sym, &tokens);
		for mangled in ["S::Create", "S::Size", "S::items", "S::other"] {
			assert!(names.iter().any(|n| n == mangled), "{mangled} missing from {names:?}");
		}
		for bare in ["S", "T", "x", "y", "Thing", "MAX"] {
			assert!(names.iter().any(|n| n == bare), "{bare} missing from {names:?}");
		}
		assert!(sym.find("S::T").is_none());
	}

	#[test]
	fn forward_declaration_does_not_start_a_body() {
		let mut sym = SymbolTable::new();
		let tokens = tokenize(&mut sym, "", "managed struct F; struct G { int x; };").unwrap();
		assert_eq!(names(&sym, &tokens)[8], "G::x");
	}

	#[test]
	fn lines_and_sections_are_recorded() {
		let mut sym = SymbolTable::new();
		let source = "int a;\n\"__NEWSCRIPTSTART_Second\"\nint b;\n\nint c;";
		let tokens = tokenize(&mut sym, "First", source).unwrap();
		let src = tokens.view();
		assert_eq!(tokens.len(), 9);
		assert_eq!((src.line_at(0), src.section_at(0)), (1, "First"));
		assert_eq!((src.line_at(3), src.section_at(3)), (1, "Second"));
		assert_eq!((src.line_at(6), src.section_at(6)), (3, "Second"));
	}

	#[test]
	fn mismatched_bracket_names_the_opener_line() {
		let mut sym = SymbolTable::new();
		let err = tokenize(&mut sym, "", "struct B\n{\n String B;\n float A;\n]").unwrap_err();
		let ScannerError::ScanError(err) = err else { panic!("expected a scan error") };
		assert_eq!(err.line, 5);
		assert_eq!(err.r#type, ScanErrorType::BracketMismatch {
			closer:      ']',
			opener:      '{',
			opener_line: 2,
			same_line:   false,
		});
		assert!(err.to_string().contains("does not match the '{' on line 2"));
	}

	#[test]
	fn unbalanced_brackets() {
		let mut sym = SymbolTable::new();
		let err = tokenize(&mut sym, "", "f(a[1)];").unwrap_err();
		assert!(err.to_string().contains("on this line"));
		let err = tokenize(&mut sym, "", "}").unwrap_err();
		assert!(err.to_string().contains("closing '}'"));
		let err = tokenize(&mut sym, "", "void f() {\n").unwrap_err();
		assert!(err.to_string().contains("The '{' on line 1 has not been closed"));
	}
}
