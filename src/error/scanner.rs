/// Errors raised while turning source text into tokens.
#[derive(thiserror::Error, Debug)]
pub enum ScannerError {
	/// Internal compiler error, should never happen
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	/// Errors encountered during scanning
	#[error(transparent)]
	ScanError(#[from] ScanError),
}

/// A specific scanning error with line number and type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {type}")]
pub struct ScanError {
	/// The line number where the error occurred.
	pub line:   usize,
	/// The type of scanning error.
	pub r#type: ScanErrorType,
}

impl ScanError {
	pub fn new(line: usize, r#type: ScanErrorType) -> Self { Self { line, r#type } }
}

/// Types of scanning errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorType {
	/// A character that cannot start any lexeme.
	UnexpectedCharacter(char),
	/// `..` is neither the member dot nor the varargs ellipsis.
	DoubleDot,
	/// `0x` without any hex digit following.
	EmptyHexLiteral,
	/// A `/*` comment that is never closed.
	UnterminatedBlockComment,
	/// The input ended inside a character literal.
	CharLiteralInputEnded,
	/// The input ended before the closing apostrophe.
	ApostropheInputEnded,
	/// Something other than the closing apostrophe.
	ExpectedApostrophe(char),
	/// The input ended inside a string literal.
	StringInputEnded,
	/// A raw line break inside a string literal.
	StringLineEnded,
	/// A closer that does not match the innermost opener.
	BracketMismatch { closer: char, opener: char, opener_line: usize, same_line: bool },
	/// A closer without any opener.
	UnopenedBracket(char),
	/// An opener still open at the end of the input.
	UnclosedBracket { opener: char, opener_line: usize },
}

impl std::fmt::Display for ScanErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ScanErrorType::*;
		match self {
			UnexpectedCharacter(c) => {
				write!(f, "The character '{c}' is not legal in this context")
			}
			DoubleDot => {
				write!(f, "Must either use '.' or '...'")
			}
			EmptyHexLiteral => {
				write!(f, "Expected hexadecimal digits after '0x'")
			}
			UnterminatedBlockComment => {
				write!(f, "Comment was never closed")
			}
			CharLiteralInputEnded => {
				write!(f, "Expected a character and an apostrophe, but input ended instead")
			}
			ApostropheInputEnded => {
				write!(f, "Expected an apostrophe, but input ended instead")
			}
			ExpectedApostrophe(c) => {
				write!(f, "Expected apostrophe, but found '{c}' instead")
			}
			StringInputEnded => {
				write!(f, "Input ended within a string literal")
			}
			StringLineEnded => {
				write!(f, "Line ended within a string literal (Use '[' for line feed)")
			}
			BracketMismatch { closer, opener, same_line: true, .. } => {
				write!(f, "This closing '{closer}' does not match the '{opener}' on this line")
			}
			BracketMismatch { closer, opener, opener_line, same_line: false } => {
				write!(f, "This closing '{closer}' does not match the '{opener}' on line {opener_line}")
			}
			UnopenedBracket(c) => {
				write!(f, "There isn't any opening symbol that matches this closing '{c}'")
			}
			UnclosedBracket { opener, opener_line } => {
				write!(f, "The '{opener}' on line {opener_line} has not been closed")
			}
		}
	}
}
