use super::Parser;
use crate::{
	error::parser::{ParseErrorType, ParserError},
	symbol_table::{Operator, SymbolKind, Vartype},
};

/// Where a literal is read. Parameter defaults report out of range values
/// against the limits of `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LiteralContext {
	DefaultValue,
	General,
}

/// Value of an integer literal. Hex literals denote a bit pattern, so
/// `0xFFFFFFFF` is -1.
pub(super) fn parse_int_literal(text: &str, negative: bool, context: LiteralContext) -> Result<i32, ParseErrorType> {
	let shown = if negative { format!("-{text}") } else { text.to_string() };
	if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
		let value = u32::from_str_radix(digits, 16).map_err(|_| ParseErrorType::LiteralOverflow(shown))? as i32;
		return Ok(if negative { value.wrapping_neg() } else { value });
	}

	let out_of_range = |shown: String| match context {
		LiteralContext::General => ParseErrorType::LiteralOverflow(shown),
		LiteralContext::DefaultValue if negative => {
			ParseErrorType::LiteralTooSmall { literal: shown, min: i32::MIN.to_string() }
		}
		LiteralContext::DefaultValue => ParseErrorType::LiteralTooLarge { literal: shown, max: i32::MAX.to_string() },
	};
	match shown.parse::<i64>().ok().and_then(|v| i32::try_from(v).ok()) {
		Some(value) => Ok(value),
		None => Err(out_of_range(shown)),
	}
}

pub(super) fn parse_float_literal(text: &str, negative: bool) -> Result<f32, ParseErrorType> {
	let value = text.parse::<f32>().ok().filter(|v| v.is_finite());
	let value = value.ok_or_else(|| ParseErrorType::FloatOutOfRange(text.to_string()))?;
	Ok(if negative { -value } else { value })
}

impl<'a> Parser<'a> {
	/// Consume a `-` if one comes next.
	fn next_is_minus(&mut self) -> bool {
		let minus = self.peek_kind() == SymbolKind::Operator(Operator::Sub);
		if minus {
			self.src.get_next();
		}
		minus
	}

	/// An integer literal or enum constant, optionally negated.
	pub(super) fn parse_constant_int(&mut self) -> Result<i32, ParserError> {
		let negative = self.next_is_minus();
		let symbol = self.src.get_next();
		match self.sym.kind(symbol) {
			SymbolKind::LiteralInt => {
				parse_int_literal(self.sym.name(symbol), negative, LiteralContext::General).map_err(|t| self.error(t))
			}
			SymbolKind::Constant => {
				let value = self.sym[symbol].value;
				Ok(if negative { value.wrapping_neg() } else { value })
			}
			_ => Err(self.expected("an integer constant", symbol)),
		}
	}

	/// Default value of a parameter of type `vartype`. Floats are returned as
	/// their bit pattern.
	pub(super) fn parse_default_value(&mut self, vartype: &Vartype) -> Result<i32, ParserError> {
		let negative = self.next_is_minus();
		let symbol = self.src.get_next();
		let kind = self.sym.kind(symbol);
		let text = self.sym.name(symbol).to_string();

		if vartype.is_handle() {
			return match kind {
				SymbolKind::Null if !negative => Ok(0),
				SymbolKind::LiteralInt if parse_int_literal(&text, negative, LiteralContext::DefaultValue) == Ok(0) => {
					Ok(0)
				}
				_ => Err(self.error(ParseErrorType::PointerDefault)),
			};
		}
		if self.sym.is_float(vartype) {
			let value = match kind {
				SymbolKind::LiteralFloat => parse_float_literal(&text, negative).map_err(|t| self.error(t))?,
				SymbolKind::LiteralInt => {
					parse_int_literal(&text, negative, LiteralContext::DefaultValue).map_err(|t| self.error(t))? as f32
				}
				_ => return Err(self.error(ParseErrorType::DefaultNotLiteral)),
			};
			return Ok(value.to_bits() as i32);
		}
		if self.sym.is_int_like(vartype) {
			return match kind {
				SymbolKind::LiteralInt => {
					parse_int_literal(&text, negative, LiteralContext::DefaultValue).map_err(|t| self.error(t))
				}
				SymbolKind::Constant => {
					let value = self.sym[symbol].value;
					Ok(if negative { value.wrapping_neg() } else { value })
				}
				SymbolKind::LiteralFloat => Err(self.error(ParseErrorType::TypeMismatch {
					from: "float".to_string(),
					to:   self.sym.vartype_name(vartype),
				})),
				_ => Err(self.error(ParseErrorType::DefaultNotLiteral)),
			};
		}
		Err(self.error(ParseErrorType::DefaultNotLiteral))
	}

	/// Initial bytes of a global variable, the cursor is after `=`.
	pub(super) fn parse_global_initializer(&mut self, vartype: &Vartype, name: &str) -> Result<Vec<u8>, ParserError> {
		let not_literal = || ParseErrorType::GlobalInitializer(name.to_string());
		if vartype.is_array() || vartype.is_dynarray() {
			return Err(self.error(not_literal()));
		}
		if self.sym.is_old_string(vartype) {
			let symbol = self.src.get_next();
			if self.sym.kind(symbol) != SymbolKind::LiteralString {
				return Err(self.error(not_literal()));
			}
			let text = self.sym.name(symbol);
			let mut bytes = text[1..text.len() - 1].as_bytes().to_vec();
			bytes.push(0);
			return Ok(bytes);
		}
		if vartype.is_handle() {
			let symbol = self.src.get_next();
			if self.sym.kind(symbol) != SymbolKind::Null {
				return Err(self.error(not_literal()));
			}
			return Ok(vec![0; 4]);
		}
		if self.sym.is_float(vartype) {
			let negative = self.next_is_minus();
			let symbol = self.src.get_next();
			let text = self.sym.name(symbol).to_string();
			let value = match self.sym.kind(symbol) {
				SymbolKind::LiteralFloat => parse_float_literal(&text, negative).map_err(|t| self.error(t))?,
				SymbolKind::LiteralInt => {
					parse_int_literal(&text, negative, LiteralContext::General).map_err(|t| self.error(t))? as f32
				}
				_ => return Err(self.error(not_literal())),
			};
			return Ok(value.to_le_bytes().to_vec());
		}
		if self.sym.is_int_like(vartype) {
			let size = self.sym.size_of(vartype);
			let value = self.parse_constant_int()?;
			return Ok(value.to_le_bytes()[..size.min(4)].to_vec());
		}
		Err(self.error(not_literal()))
	}
}

#[cfg(test)]
mod tests {
	use super::{LiteralContext::*, *};
	use crate::{compiled_script::Opcode, parser::tests::{compile, message}};

	#[test]
	fn int_literals() {
		assert_eq!(parse_int_literal("2147483647", false, General), Ok(i32::MAX));
		assert_eq!(parse_int_literal("2147483648", true, General), Ok(i32::MIN));
		assert_eq!(parse_int_literal("0x7F", false, General), Ok(127));
		assert_eq!(parse_int_literal("0xFFFFFFFF", false, General), Ok(-1));
		assert_eq!(parse_int_literal("0x10", true, General), Ok(-16));
		assert_eq!(
			parse_int_literal("2147483648", false, General),
			Err(ParseErrorType::LiteralOverflow("2147483648".to_string()))
		);
		assert_eq!(
			parse_int_literal("99999999999999999999999", false, General),
			Err(ParseErrorType::LiteralOverflow("99999999999999999999999".to_string()))
		);
	}

	#[test]
	fn default_values_report_the_limits() {
		assert_eq!(
			parse_int_literal("2147483648", false, DefaultValue),
			Err(ParseErrorType::LiteralTooLarge { literal: "2147483648".to_string(), max: "2147483647".to_string() })
		);
		assert_eq!(
			message("void f(int a = -2147483649);"),
			"Literal value '-2147483649' is too small (min. is -2147483648)"
		);
		assert_eq!(message("void f(int a = 4200000000);"), "Literal value '4200000000' is too large (max. is 2147483647)");
	}

	#[test]
	fn float_literals() {
		assert_eq!(parse_float_literal("1.5", true), Ok(-1.5));
		let huge = format!("1{}.0", "0".repeat(40));
		assert_eq!(parse_float_literal(&huge, false), Err(ParseErrorType::FloatOutOfRange(huge.clone())));
	}

	#[test]
	fn default_values() {
		assert!(compile("enum E { A = 3 };\nvoid f(int a = -A, float b = 2, float c = -0.5);").is_ok());
		assert_eq!(message("void f(int a = 1.5);"), "Type mismatch: cannot convert 'float' to 'int'");
		assert_eq!(message("int g;\nvoid f(int a = g);"), "Parameter default value must be literal");
		assert_eq!(message("managed struct M { };\nvoid f(M *m = 1);"), "A pointer parameter can only default to 0 or 'null'");
		assert!(compile("managed struct M { };\nvoid f(M *m = null, M *n = 0);").is_ok());
	}

	#[test]
	fn float_defaults_are_bit_patterns() {
		let scrip = compile("float g(float x = 0.25) { return x; }\nfloat f() { return g(); }").unwrap();
		let bits = 0.25f32.to_bits() as i32;
		let code = &scrip.code;
		assert!(code.windows(3).any(|w| w == [Opcode::LitToReg as i32, 3, bits]));
	}
}
