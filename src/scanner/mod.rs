//! Turns script source text into classified lexemes.
//!
//! The scanner knows nothing about keywords, symbols or structs. It only
//! groups characters by `maximal munch`: the longest operator spelling wins,
//! so `i++<=j` is `i`, `++`, `<=`, `j`.
//!
//! Two kinds of literal get special treatment while scanning:
//!
//! - A character literal `'G'` is replaced by its character code, `71`, and
//!   reported as an int literal.
//! - A backslash inside a string or character literal keeps the byte after
//!   it and drops itself. `"\n"` is the two characters `"n"` inside quotes,
//!   not a line feed; line feeds are written as `[` in this language.
mod lexeme;

use std::{iter::Peekable, str::CharIndices};

use LexemeType::*;
pub use lexeme::*;

use crate::{ScanError, ScanErrorType};

/// A scanner for script source code
pub struct Scanner<'a> {
	/// User input source code
	source:      &'a str,
	/// User input source code iterator
	source_iter: Peekable<CharIndices<'a>>,
	/// Points at the beginning of the current lexeme
	start:       usize,
	/// Points just past the character consumed last
	cursor:      usize,
	/// Line of the character consumed last
	line:        usize,
}

impl<'a> Scanner<'a> {
	pub fn new(source: &'a str) -> Self {
		let source_iter = source.char_indices().peekable();

		Self { source, source_iter, start: 0, cursor: 0, line: 1 }
	}

	/// Current line number.
	pub fn line(&self) -> usize { self.line }

	/// Restart line counting, used when a new section begins mid-text.
	pub fn set_line(&mut self, line: usize) { self.line = line; }

	/// Whether the whole input has been consumed.
	pub fn reached_eof(&mut self) -> bool { self.source_iter.peek().is_none() }

	/// Scan the next lexeme, `None` once only whitespace and comments remain.
	///
	/// After an error, [`Scanner::reached_eof`] tells whether the input ended
	/// inside the offending literal.
	pub fn next_lexeme(&mut self) -> Result<Option<Lexeme<'a>>, ScanError> {
		self.skip_whitespace_and_comments()?;
		let Some(&(index, _)) = self.source_iter.peek() else {
			return Ok(None);
		};
		// We are at the beginning of the next lexeme.
		self.start = index;
		self.cursor = index;
		let Some(next_char) = self.advance() else {
			return Ok(None);
		};
		self.scan_lexeme(next_char).map(Some)
	}

	/// Scan all remaining lexemes.
	pub fn scan_all(&mut self) -> Result<Vec<Lexeme<'a>>, ScanError> {
		let mut lexemes = Vec::new();
		while let Some(lexeme) = self.next_lexeme()? {
			lexemes.push(lexeme);
		}
		Ok(lexemes)
	}
}

impl<'a> Scanner<'a> {
	/// Scan a single lexeme that starts with `next_char`
	fn scan_lexeme(&mut self, next_char: char) -> Result<Lexeme<'a>, ScanError> {
		match next_char {
			'"' => return self.string(),
			'\'' => return self.character(),
			c if c.is_ascii_digit() => return self.number(c),
			c if c.is_ascii_alphabetic() || c == '_' => return Ok(self.identifier()),
			_ => {}
		}

		#[rustfmt::skip]
		let valid = match next_char {
			'(' | ')' | ',' | ';' | '?' | '[' | ']' | '{' | '}' | '~' => true,
			'!' | '%' | '*' | '/' | '=' | '^' => { self.match_next('='); true }
			'&' => { let _ = self.match_next('&') || self.match_next('='); true }
			'|' => { let _ = self.match_next('|') || self.match_next('='); true }
			'+' => { let _ = self.match_next('+') || self.match_next('='); true }
			'-' => { let _ = self.match_next('-') || self.match_next('=') || self.match_next('>'); true }
			':' => { self.match_next(':'); true }
			'<' => { self.match_next('<'); self.match_next('='); true }
			'>' => { self.match_next('>'); self.match_next('='); true }
			'.' => {
				if self.match_next('.') && !self.match_next('.') {
					return Err(self.error(ScanErrorType::DoubleDot));
				}
				true
			}
			_ => false,
		};
		if !valid {
			return Err(self.error(ScanErrorType::UnexpectedCharacter(next_char)));
		}
		Ok(Lexeme::new(&self.source[self.start..self.cursor], NonChar, self.line))
	}

	fn error(&self, r#type: ScanErrorType) -> ScanError { ScanError::new(self.line, r#type) }

	/// Skip blanks, line breaks and both comment styles
	fn skip_whitespace_and_comments(&mut self) -> Result<(), ScanError> {
		while let Some(c) = self.peek() {
			match c {
				' ' | '\t' | '\r' | '\x0B' | '\x0C' => {
					self.advance();
				}
				'\n' => {
					self.advance();
					self.line += 1;
				}
				'/' if self.peek_second() == Some('/') => {
					while self.peek().is_some_and(|c| c != '\n') {
						self.advance();
					}
				}
				'/' if self.peek_second() == Some('*') => {
					self.advance(); // consume '/'
					self.advance(); // consume '*'
					loop {
						match self.advance() {
							None => return Err(self.error(ScanErrorType::UnterminatedBlockComment)),
							Some('*') if self.peek() == Some('/') => {
								self.advance();
								break;
							}
							Some('\n') => self.line += 1,
							Some(_) => {}
						}
					}
				}
				_ => break,
			}
		}
		Ok(())
	}

	/// Match the next character if it is the expected one
	fn match_next(&mut self, expected: char) -> bool {
		matches!(self.peek(), Some(c) if c == expected && { self.advance(); true })
	}

	/// Advance to the next character
	fn advance(&mut self) -> Option<char> {
		let (i, c) = self.source_iter.next()?;
		self.cursor = i + c.len_utf8();
		Some(c)
	}

	/// Peek the current character
	fn peek(&mut self) -> Option<char> { self.source_iter.peek().map(|&(_, c)| c) }

	/// Peek the second character ahead
	fn peek_second(&mut self) -> Option<char> {
		let mut it = self.source_iter.clone();
		it.next()?;
		it.peek().map(|&(_, c)| c)
	}

	/// Read one literal character, resolving a backslash escape.
	/// `None` when the input ends first.
	fn literal_char(&mut self) -> Option<char> {
		let c = match self.advance()? {
			'\\' => self.advance()?,
			c => c,
		};
		if c == '\n' {
			self.line += 1;
		}
		Some(c)
	}

	/// Scan a string literal, the opening `"` is consumed
	fn string(&mut self) -> Result<Lexeme<'a>, ScanError> {
		let mut text = String::from("\"");
		loop {
			match self.peek() {
				None => return Err(self.error(ScanErrorType::StringInputEnded)),
				Some('"') => {
					self.advance();
					break;
				}
				Some('\n') => {
					self.advance();
					self.line += 1;
					return Err(self.error(ScanErrorType::StringLineEnded));
				}
				Some(_) => {
					let c = self.literal_char().ok_or_else(|| self.error(ScanErrorType::StringInputEnded))?;
					text.push(c);
				}
			}
		}
		text.push('"');
		Ok(Lexeme::new(text, StringLiteral, self.line))
	}

	/// Scan a character literal, the opening `'` is consumed
	fn character(&mut self) -> Result<Lexeme<'a>, ScanError> {
		let c = self.literal_char().ok_or_else(|| self.error(ScanErrorType::CharLiteralInputEnded))?;
		match self.advance() {
			Some('\'') => Ok(Lexeme::new((c as u32).to_string(), IntLiteral, self.line)),
			Some(other) => Err(self.error(ScanErrorType::ExpectedApostrophe(other))),
			None => Err(self.error(ScanErrorType::ApostropheInputEnded)),
		}
	}

	/// Scan a number literal, `first` is its first digit
	fn number(&mut self, first: char) -> Result<Lexeme<'a>, ScanError> {
		if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
			self.advance();
			let digits_start = self.cursor;
			while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
				self.advance();
			}
			if self.cursor == digits_start {
				return Err(self.error(ScanErrorType::EmptyHexLiteral));
			}
			return Ok(Lexeme::new(&self.source[self.start..self.cursor], IntLiteral, self.line));
		}

		while self.peek().is_some_and(|c| c.is_ascii_digit()) {
			self.advance();
		}

		// Look for a fractional part.
		let mut r#type = IntLiteral;
		if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
			self.advance(); // consume '.'
			while self.peek().is_some_and(|c| c.is_ascii_digit()) {
				self.advance();
			}
			r#type = FloatLiteral;
		}

		Ok(Lexeme::new(&self.source[self.start..self.cursor], r#type, self.line))
	}

	/// Scan an identifier or keyword
	fn identifier(&mut self) -> Lexeme<'a> {
		while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
			self.advance();
		}
		Lexeme::new(&self.source[self.start..self.cursor], Identifier, self.line)
	}
}
