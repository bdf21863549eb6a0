use std::borrow::Cow;

/// A lexeme produced by the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<'a> {
	pub text:   Cow<'a, str>,
	pub r#type: LexemeType,
	/// Line the lexeme ends on
	pub line:   usize,
}

impl<'a> Lexeme<'a> {
	pub fn new(text: impl Into<Cow<'a, str>>, r#type: LexemeType, line: usize) -> Self {
		Self { text: text.into(), r#type, line }
	}
}

/// Classification of a raw lexeme. Keywords are not told apart from
/// identifiers here; that happens when the lexeme is interned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeType {
	/// `[A-Za-z_][A-Za-z0-9_]*`
	Identifier,
	/// Decimal or `0x` hex digits. Character literals are reported as their
	/// decimal character code.
	IntLiteral,
	/// Digits, one `.`, digits.
	FloatLiteral,
	/// Text between double quotes. The quotes are kept, escapes are resolved.
	StringLiteral,
	/// Operators and punctuation.
	NonChar,
}
