pub mod parser;
pub mod scanner;

use parser::ParserError;
use scanner::ScannerError;

/// CompileError is the top-level error type for the script compiler.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
	/// Internal compiler error, should never happen
	#[error("CompilerInternalError: {0}")]
	InternalError(#[from] anyhow::Error),
	/// The script was rejected
	#[error(transparent)]
	Diagnostic(#[from] Diagnostic),
}

impl CompileError {
	/// The diagnostic, unless the compiler itself failed.
	pub fn diagnostic(&self) -> Option<&Diagnostic> {
		match self {
			CompileError::Diagnostic(diagnostic) => Some(diagnostic),
			CompileError::InternalError(_) => None,
		}
	}
}

/// What callers are shown when a script does not compile.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{}line {line}: {message}", section_prefix(.section))]
pub struct Diagnostic {
	pub message: String,
	pub line:    usize,
	pub section: String,
	/// Function being compiled, if any
	pub scope:   Option<String>,
}

fn section_prefix(section: &str) -> String {
	if section.is_empty() { String::new() } else { format!("{section}: ") }
}

impl CompileError {
	pub(crate) fn from_scanner(error: ScannerError, section: &str) -> Self {
		match error {
			ScannerError::InternalError(e) => CompileError::InternalError(e),
			ScannerError::ScanError(e) => CompileError::Diagnostic(Diagnostic {
				message: e.r#type.to_string(),
				line:    e.line,
				section: section.to_string(),
				scope:   None,
			}),
		}
	}
}

impl From<ParserError> for CompileError {
	fn from(error: ParserError) -> Self {
		match error {
			ParserError::InternalError(e) => CompileError::InternalError(e),
			ParserError::ParseError(e) => CompileError::Diagnostic(Diagnostic {
				message: e.r#type.to_string(),
				line:    e.line,
				section: e.section,
				scope:   e.scope,
			}),
		}
	}
}
