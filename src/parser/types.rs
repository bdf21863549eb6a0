use super::Parser;
use crate::{
	compiled_script::{Opcode, Register},
	error::parser::{ParseErrorType::*, ParserError},
	symbol_table::{Symbol, SymbolKind, Vartype},
};

impl<'a> Parser<'a> {
	/// Whether a value of type `from` can be stored where `to` is expected
	/// without any conversion code.
	pub(super) fn is_assignable(&self, from: &Vartype, to: &Vartype) -> bool {
		let wk = &self.sym.well_known;
		if from.base == wk.void || to.base == wk.void {
			return false;
		}
		if self.sym.is_old_string(to) {
			return self.sym.is_old_string(from) && (to.is_const() || !from.is_const());
		}
		if from.without_const() == to.without_const() {
			return true;
		}
		if self.sym.is_int_like(from) && self.sym.is_int_like(to) {
			return true;
		}
		if from.base == wk.null {
			return to.is_handle();
		}
		if from.is_pointer() && to.is_pointer() && from.is_dynarray() == to.is_dynarray() && !from.is_array() {
			return !to.is_array() && self.sym.is_derived_from(from.base, to.base);
		}
		false
	}

	/// Make the value in AX, of type `from`, fit `to`.
	pub(super) fn convert(&mut self, from: &Vartype, to: &Vartype) -> Result<(), ParserError> {
		if from.base == self.sym.well_known.void {
			return Err(self.error(VoidValue));
		}
		if self.is_assignable(from, to) {
			return Ok(());
		}
		// an old string stored into a String becomes a new String object
		let to_string_object = self.sym.string_struct.is_some_and(|s| to.base == s && to.is_handle() && !to.is_dynarray());
		if to_string_object && self.sym.is_old_string(from) {
			self.scrip.write_cmd1(Opcode::CreateString, Register::Ax as i32);
			return Ok(());
		}
		// a String can be passed where a `const string` is expected
		if self.sym.is_old_string(to) && to.is_const() && self.is_string_object(from) {
			return Ok(());
		}
		Err(self.error(TypeMismatch { from: self.sym.vartype_name(from), to: self.sym.vartype_name(to) }))
	}

	fn is_string_object(&self, vartype: &Vartype) -> bool {
		self.sym.string_struct.is_some_and(|s| vartype.base == s) && vartype.is_pointer() && !vartype.is_dynarray()
	}

	/// Old strings and `String` objects.
	pub(super) fn is_string_like(&self, vartype: &Vartype) -> bool {
		self.sym.is_old_string(vartype) || self.is_string_object(vartype)
	}

	/// Whether two handles (or `null`) may be compared with `==` and `!=`.
	pub(super) fn comparable_handles(&self, left: &Vartype, right: &Vartype) -> bool {
		let null = self.sym.well_known.null;
		let handle = |v: &Vartype| v.base == null || v.is_handle();
		if !handle(left) || !handle(right) {
			return false;
		}
		if left.base == null || right.base == null {
			return true;
		}
		left.is_dynarray() == right.is_dynarray()
			&& (self.sym.is_derived_from(left.base, right.base) || self.sym.is_derived_from(right.base, left.base))
	}

	/// Byte size of a variable of type `vartype`, which must fit in an `i32`.
	pub(super) fn variable_size(&self, vartype: &Vartype, name: Symbol) -> Result<i32, ParserError> {
		let size = self.sym.size_of(vartype);
		i32::try_from(size).map_err(|_| self.error(VariableTooLarge { name: self.member_name(name), size }))
	}

	/// Conditions of `if`, loops, `!`, `&&`, `||` and `?:`.
	pub(super) fn is_condition(&self, vartype: &Vartype) -> bool {
		self.sym.is_int_like(vartype) || vartype.is_handle() || vartype.base == self.sym.well_known.null
	}

	pub(super) fn check_condition(&self, vartype: &Vartype) -> Result<(), ParserError> {
		if vartype.base == self.sym.well_known.void {
			return Err(self.error(VoidValue));
		}
		if self.is_condition(vartype) {
			return Ok(());
		}
		Err(self.error(TypeMismatch { from: self.sym.vartype_name(vartype), to: "int".to_string() }))
	}

	/// Types that variables (global, local or member) cannot have.
	pub(super) fn check_variable_type(&self, vartype: &Vartype) -> Result<(), ParserError> {
		let base = vartype.base;
		if base == self.sym.well_known.void {
			return Err(self.error(VoidVariable));
		}
		if self.sym.is_struct_type(base) && vartype.is_dynarray() && !vartype.is_pointer() {
			return Err(self.error(if self.sym.is_managed_type(base) { NonPointerStructArray } else { NonManagedStructArray }));
		}
		if vartype.is_pointer() {
			return Ok(());
		}
		if self.sym.kind(base) == SymbolKind::UndefinedStruct {
			return Err(self.error(ForwardDeclaredStruct(self.name(base))));
		}
		if self.sym.is_managed_type(base) {
			return Err(self.error(ManagedByValue(self.name(base))));
		}
		Ok(())
	}

	pub(super) fn check_parameter_type(&self, vartype: &Vartype) -> Result<(), ParserError> {
		self.check_variable_type(vartype)?;
		if self.sym.is_struct_type(vartype.base) && !vartype.is_pointer() {
			return Err(self.error(StructAsValue(self.name(vartype.base))));
		}
		Ok(())
	}

	pub(super) fn check_return_type(&self, vartype: &Vartype) -> Result<(), ParserError> {
		if vartype.base == self.sym.well_known.void && vartype.flags.is_empty() {
			return Ok(());
		}
		self.check_parameter_type(vartype)
	}

	/// Store AX at MAR. A handle stored into fresh memory does not release
	/// whatever was there.
	pub(super) fn write_ax_to_mar(&mut self, vartype: &Vartype, fresh: bool) {
		let op = if vartype.is_handle() {
			if fresh { Opcode::MemInitPtr } else { Opcode::MemWritePtr }
		} else {
			match self.sym.size_of(vartype) {
				1 => Opcode::MemWriteB,
				2 => Opcode::MemWriteW,
				_ => Opcode::MemWrite,
			}
		};
		self.scrip.write_cmd1(op, Register::Ax as i32);
	}

	pub(super) fn read_mar_into_ax(&mut self, vartype: &Vartype) {
		let op = if vartype.is_handle() {
			Opcode::MemReadPtr
		} else {
			match self.sym.size_of(vartype) {
				1 => Opcode::MemReadB,
				2 => Opcode::MemReadW,
				_ => Opcode::MemRead,
			}
		};
		self.scrip.write_cmd1(op, Register::Ax as i32);
	}
}
