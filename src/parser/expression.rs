use super::{
	Parser,
	literal::{LiteralContext, parse_float_literal, parse_int_literal},
};
use crate::{
	compiled_script::{FixupKind, Opcode, Register},
	compiler::CompileOptions,
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{Keyword, Operator, Punct, Symbol, SymbolFlags, SymbolKind, Vartype},
	token_stream::SrcList,
};

impl<'a> Parser<'a> {
	/// Compile `expr` so that its value ends up in AX, and return its type.
	pub(super) fn parse_expression(&mut self, expr: SrcList<'a>) -> Result<Vartype, ParserError> {
		if expr.is_empty() {
			return Err(self.error(ExpectedExpression));
		}
		let len = expr.len();
		if self.sym.is_punct(expr[0], Punct::OpenParen) && self.find_closer(&expr, 0) == Some(len - 1) {
			return self.parse_expression(expr.sub_view(1, len - 1));
		}
		if let Some(question) = self.find_top_level(&expr, 0, |k| k == SymbolKind::Punct(Punct::Question)) {
			return self.parse_ternary(&expr, question);
		}
		if let Some((pos, op)) = self.binary_split(&expr) {
			return self.parse_binary(&expr, pos, op);
		}

		let first = expr[0];
		let operand = expr.sub_view(1, len);
		match self.sym.kind(first) {
			SymbolKind::Operator(Operator::Sub) => self.parse_negation(operand, first),
			SymbolKind::Operator(Operator::Not) => {
				let vartype = self.parse_expression(operand)?;
				self.check_condition(&vartype)?;
				self.scrip.write_cmd1(Opcode::NotReg, Register::Ax as i32);
				Ok(self.sym.int_type())
			}
			SymbolKind::Operator(Operator::BitNeg) => {
				let vartype = self.parse_expression(operand)?;
				if !self.sym.is_int_like(&vartype) {
					return Err(self.operator_type(first, &vartype));
				}
				self.scrip.write_lit(Register::Bx, -1);
				self.scrip.write_reg2(Opcode::XorReg, Register::Ax, Register::Bx);
				Ok(self.sym.int_type())
			}
			SymbolKind::Keyword(Keyword::New) => self.parse_new(operand),
			SymbolKind::Operator(_) => Err(self.unexpected(first)),
			_ => self.parse_operand(&expr),
		}
	}

	fn operator_type(&self, operator: Symbol, vartype: &Vartype) -> ParserError {
		self.error(OperatorType { operator: self.name(operator), vartype: self.sym.vartype_name(vartype) })
	}

	/// The binary operator to split `expr` at: the loosest binding one at top
	/// level. Among equally loose operators the leftmost wins, or the
	/// rightmost when evaluating from left to right.
	fn binary_split(&self, expr: &SrcList<'a>) -> Option<(usize, Operator)> {
		let left_to_right = self.options.contains(CompileOptions::LEFT_TO_RIGHT);
		let mut best: Option<(usize, Operator)> = None;
		let mut depth = 0usize;
		for pos in 0..expr.len() {
			let kind = self.sym.kind(expr[pos]);
			match kind {
				SymbolKind::Punct(Punct::OpenParen | Punct::OpenBracket) => depth += 1,
				SymbolKind::Punct(Punct::CloseParen | Punct::CloseBracket) => depth = depth.saturating_sub(1),
				SymbolKind::Operator(op) if depth == 0 && pos > 0 && !op.is_unary_only() => {
					// an operator right after another one is a unary minus
					if matches!(self.sym.kind(expr[pos - 1]), SymbolKind::Operator(_)) {
						continue;
					}
					let better = match best {
						None => true,
						Some((_, current)) if left_to_right => op.priority() >= current.priority(),
						Some((_, current)) => op.priority() > current.priority(),
					};
					if better {
						best = Some((pos, op));
					}
				}
				_ => {}
			}
		}
		best
	}

	fn parse_binary(&mut self, expr: &SrcList<'a>, pos: usize, op: Operator) -> Result<Vartype, ParserError> {
		let operator = expr[pos];
		let left = expr.sub_view(0, pos);
		let right = expr.sub_view(pos + 1, expr.len());
		if right.is_empty() {
			return Err(self.error(ExpectedExpression));
		}

		if op.is_logical() {
			// `&&` stops at a false left side, `||` at a true one
			let left_type = self.parse_expression(left)?;
			self.check_condition(&left_type)?;
			let short_circuit = self.scrip.write_jump(if op == Operator::And { Opcode::Jz } else { Opcode::Jnz });
			self.scrip.push_reg(Register::Ax);
			let right_type = self.parse_expression(right)?;
			self.check_condition(&right_type)?;
			self.scrip.pop_reg(Register::Bx);
			self.emit_binary(op, operator, &left_type, &right_type, Register::Bx, Register::Ax)?;
			self.scrip.write_reg2(Opcode::RegToReg, Register::Bx, Register::Ax);
			self.scrip.patch_jump(short_circuit, self.scrip.codesize());
			return Ok(self.sym.int_type());
		}

		let left_type = self.parse_expression(left)?;
		self.scrip.push_reg(Register::Ax);
		let right_type = self.parse_expression(right)?;
		self.scrip.pop_reg(Register::Bx);
		let result = self.emit_binary(op, operator, &left_type, &right_type, Register::Bx, Register::Ax)?;
		self.scrip.write_reg2(Opcode::RegToReg, Register::Bx, Register::Ax);
		Ok(result)
	}

	/// Emit `lreg = lreg op rreg` for operands of the given types.
	pub(super) fn emit_binary(
		&mut self,
		op: Operator,
		operator: Symbol,
		left: &Vartype,
		right: &Vartype,
		lreg: Register,
		rreg: Register,
	) -> Result<Vartype, ParserError> {
		let int = self.sym.int_type();
		let equality = matches!(op, Operator::Eq | Operator::Ne);

		let (opcode, result) = if self.sym.is_int_like(left) && self.sym.is_int_like(right) {
			(op.int_opcode(), int)
		} else if self.sym.is_float(left) && self.sym.is_float(right) {
			let result = if op.is_comparison() { int } else { self.sym.float_type() };
			(op.float_opcode(), result)
		} else if equality && self.is_string_like(left) && self.is_string_like(right) {
			let opcode = if op == Operator::Eq { Opcode::StringsEqual } else { Opcode::StringsNotEq };
			(Some(opcode), int)
		} else if equality && self.comparable_handles(left, right) {
			(op.int_opcode(), int)
		} else if op.is_logical() && self.is_condition(left) && self.is_condition(right) {
			(op.int_opcode(), int)
		} else if self.sym.is_float(left) != self.sym.is_float(right)
			&& (self.sym.is_int_like(left) || self.sym.is_int_like(right))
		{
			let from = self.sym.vartype_name(right);
			let to = self.sym.vartype_name(left);
			return Err(self.error(TypeMismatch { from, to }));
		} else {
			(None, int)
		};

		let Some(opcode) = opcode else {
			return Err(self.operator_type(operator, left));
		};
		self.scrip.write_reg2(opcode, lreg, rreg);
		Ok(result)
	}

	/// `condition ? a : b`, split at the `?` at `question`.
	fn parse_ternary(&mut self, expr: &SrcList<'a>, question: usize) -> Result<Vartype, ParserError> {
		let Some(colon) = self.find_ternary_colon(expr, question) else {
			return Err(self.expected("':'", Symbol::EOF));
		};
		let condition = expr.sub_view(0, question);
		let then = expr.sub_view(question + 1, colon);
		let otherwise = expr.sub_view(colon + 1, expr.len());

		let vartype = self.parse_expression(condition)?;
		self.check_condition(&vartype)?;
		let to_else = self.scrip.write_jump(Opcode::Jz);
		let then_type = self.parse_expression(then)?;
		let to_end = self.scrip.write_jump(Opcode::Jmp);
		self.scrip.patch_jump(to_else, self.scrip.codesize());
		let else_type = self.parse_expression(otherwise)?;
		self.scrip.patch_jump(to_end, self.scrip.codesize());

		if self.is_assignable(&else_type, &then_type) {
			Ok(then_type)
		} else if self.is_assignable(&then_type, &else_type) {
			Ok(else_type)
		} else {
			Err(self.error(TypeMismatch {
				from: self.sym.vartype_name(&else_type),
				to:   self.sym.vartype_name(&then_type),
			}))
		}
	}

	/// The `:` that belongs to the `?` (or `case`) at `question`, skipping
	/// nested ones.
	pub(super) fn find_ternary_colon(&self, expr: &SrcList<'a>, question: usize) -> Option<usize> {
		let mut pending = 0usize;
		let mut from = question + 1;
		while let Some(pos) = self.find_top_level(expr, from, |k| {
			matches!(k, SymbolKind::Punct(Punct::Question | Punct::Colon))
		}) {
			if self.sym.is_punct(expr[pos], Punct::Question) {
				pending += 1;
			} else if pending == 0 {
				return Some(pos);
			} else {
				pending -= 1;
			}
			from = pos + 1;
		}
		None
	}

	/// Unary minus. Literals are folded, so `-2147483648` is a valid int.
	fn parse_negation(&mut self, operand: SrcList<'a>, minus: Symbol) -> Result<Vartype, ParserError> {
		if operand.len() == 1 {
			let symbol = operand[0];
			match self.sym.kind(symbol) {
				SymbolKind::LiteralInt => {
					let value = parse_int_literal(self.sym.name(symbol), true, LiteralContext::General)
						.map_err(|t| self.error(t))?;
					self.scrip.write_lit(Register::Ax, value);
					return Ok(self.sym.int_type());
				}
				SymbolKind::LiteralFloat => {
					let value = parse_float_literal(self.sym.name(symbol), true).map_err(|t| self.error(t))?;
					self.load_float(value);
					return Ok(self.sym.float_type());
				}
				_ => {}
			}
		}

		let vartype = self.parse_expression(operand)?;
		if self.sym.is_int_like(&vartype) {
			self.scrip.write_cmd2(Opcode::Mul, Register::Ax as i32, -1);
			Ok(self.sym.int_type())
		} else if self.sym.is_float(&vartype) {
			self.scrip.write_lit(Register::Bx, 0);
			self.scrip.write_reg2(Opcode::FSubReg, Register::Bx, Register::Ax);
			self.scrip.write_reg2(Opcode::RegToReg, Register::Bx, Register::Ax);
			Ok(self.sym.float_type())
		} else {
			Err(self.operator_type(minus, &vartype))
		}
	}

	/// `new Type` or `new Type[count]`, the `new` consumed.
	fn parse_new(&mut self, expr: SrcList<'a>) -> Result<Vartype, ParserError> {
		let type_sym = expr[0];
		if !self.sym.is_vartype(type_sym) {
			return Err(self.error(ExpectedVartype(self.name(type_sym))));
		}
		let name = self.name(type_sym);

		if self.sym.is_punct(expr[1], Punct::OpenBracket) {
			let close = self.find_closer(&expr, 1).ok_or_else(|| self.expected("']'", Symbol::EOF))?;
			if close + 1 != expr.len() {
				return Err(self.unexpected(expr[close + 1]));
			}
			let count_type = self.parse_expression(expr.sub_view(2, close))?;
			let int = self.sym.int_type();
			self.convert(&count_type, &int)?;

			let mut element = Vartype::new(type_sym);
			if self.sym.is_managed_type(type_sym) {
				element = element.pointer();
			}
			let array = element.clone().dynarray();
			self.check_variable_type(&array)?;
			let size = self.sym.size_of(&element) as i32;
			let managed = element.is_pointer() as i32;
			self.scrip.write_cmd(Opcode::NewArray, &[Register::Ax as i32, size, managed]);
			return Ok(array);
		}
		if expr.len() > 1 {
			return Err(self.unexpected(expr[1]));
		}

		let entry = &self.sym[type_sym];
		if !entry.is_struct() || !entry.is_managed() {
			return Err(self.error(NewNonManaged(name)));
		}
		if entry.flags.contains(SymbolFlags::BUILTIN) {
			return Err(self.error(NewBuiltin(name)));
		}
		let size = entry.size as i32;
		self.scrip.write_cmd2(Opcode::NewUserObject, Register::Ax as i32, size);
		Ok(Vartype::new(type_sym).pointer())
	}

	/// Load a float literal through the literal pool.
	fn load_float(&mut self, value: f32) {
		let offset = self.scrip.add_float_literal(value);
		self.scrip.write_lit(Register::Mar, offset as i32);
		self.scrip.fixup_previous(FixupKind::GlobalData);
		self.scrip.write_cmd1(Opcode::MemRead, Register::Ax as i32);
	}

	/// Literals, constants and access chains.
	fn parse_operand(&mut self, expr: &SrcList<'a>) -> Result<Vartype, ParserError> {
		let first = expr[0];
		if expr.len() == 1 {
			match self.sym.kind(first) {
				SymbolKind::LiteralInt => {
					let value = parse_int_literal(self.sym.name(first), false, LiteralContext::General)
						.map_err(|t| self.error(t))?;
					self.scrip.write_lit(Register::Ax, value);
					return Ok(self.sym.int_type());
				}
				SymbolKind::LiteralFloat => {
					let value = parse_float_literal(self.sym.name(first), false).map_err(|t| self.error(t))?;
					self.load_float(value);
					return Ok(self.sym.float_type());
				}
				SymbolKind::LiteralString => {
					let text = self.sym.name(first);
					let offset = self.scrip.add_string_literal(&text[1..text.len() - 1]);
					self.scrip.write_lit(Register::Ax, offset as i32);
					self.scrip.fixup_previous(FixupKind::GlobalData);
					return Ok(self.sym.string_literal_type());
				}
				SymbolKind::Null => {
					self.scrip.write_lit(Register::Ax, 0);
					return Ok(self.sym.null_type());
				}
				SymbolKind::Constant => {
					let entry = &self.sym[first];
					let vartype = entry.vartype.clone().unwrap_or_else(|| self.sym.int_type());
					self.scrip.write_lit(Register::Ax, entry.value);
					return Ok(vartype);
				}
				_ => {}
			}
		}
		let location = self.access(expr)?;
		self.read_location(&location)
	}
}
