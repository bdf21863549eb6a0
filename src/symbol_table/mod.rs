//! Interned names and what the compiler knows about them.
//!
//! Every lexeme of a compile unit ends up as a [`Symbol`], an index into the
//! [`SymbolTable`]. Keywords, operators and the primitive types are entered
//! on [`SymbolTable::reset`]; identifiers and literals are interned by the
//! tokenizer and classified by the parser as it meets their declarations.
//!
//! Struct members are stored under their mangled name `Struct::member`, so a
//! member never collides with a global of the same bare name.
mod entry;
mod predefined;

use std::ops::{Index, IndexMut};

pub use entry::*;
use rustc_hash::FxHashMap;

/// Index of an entry in the [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(usize);

impl Symbol {
	/// Returned when reading past the end of a token stream.
	pub const EOF: Symbol = Symbol(usize::MAX);

	pub fn index(self) -> usize { self.0 }

	pub fn is_eof(self) -> bool { self == Self::EOF }
}

impl From<usize> for Symbol {
	fn from(index: usize) -> Self { Symbol(index) }
}

/// Symbols that the compiler refers to directly.
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
	pub char:   Symbol,
	pub short:  Symbol,
	pub int:    Symbol,
	pub long:   Symbol,
	pub float:  Symbol,
	pub string: Symbol,
	pub void:   Symbol,
	pub null:   Symbol,
	pub this:   Symbol,
}

/// Name to id interning of source sections.
#[derive(Debug, Default, Clone)]
pub struct SectionMap {
	names: Vec<String>,
	ids:   FxHashMap<String, usize>,
}

impl SectionMap {
	pub fn id(&mut self, name: &str) -> usize {
		if let Some(&id) = self.ids.get(name) {
			return id;
		}
		self.names.push(name.to_string());
		self.ids.insert(name.to_string(), self.names.len() - 1);
		self.names.len() - 1
	}

	pub fn name(&self, id: usize) -> &str { self.names.get(id).map_or("", String::as_str) }
}

/// The symbol table of one compile unit.
#[derive(Debug, Clone)]
pub struct SymbolTable {
	entries:           Vec<SymbolEntry>,
	index:             FxHashMap<String, Symbol>,
	pub sections:      SectionMap,
	pub well_known:    WellKnown,
	/// Struct declared `internalstring`, the type string literals convert to
	pub string_struct: Option<Symbol>,
}

impl Default for SymbolTable {
	fn default() -> Self { Self::new() }
}

impl SymbolTable {
	pub fn new() -> Self {
		let eof = Symbol::EOF;
		let well_known = WellKnown {
			char:   eof,
			short:  eof,
			int:    eof,
			long:   eof,
			float:  eof,
			string: eof,
			void:   eof,
			null:   eof,
			this:   eof,
		};
		let mut table = Self {
			entries: vec![],
			index: FxHashMap::default(),
			sections: SectionMap::default(),
			well_known,
			string_struct: None,
		};
		table.reset();
		table
	}

	/// Drop everything and enter the predefined symbols again.
	pub fn reset(&mut self) {
		self.entries.clear();
		self.index.clear();
		self.sections = SectionMap::default();
		self.string_struct = None;
		self.well_known = predefined::enter(self);
	}

	/// Look a name up.
	pub fn find(&self, name: &str) -> Option<Symbol> { self.index.get(name).copied() }

	/// Look a name up, interning it as an undeclared symbol if it is new.
	pub fn find_or_add(&mut self, name: &str) -> Symbol {
		match self.find(name) {
			Some(symbol) => symbol,
			None => self.add(SymbolEntry::new(name, SymbolKind::NoType)),
		}
	}

	/// Intern a new entry. The name must not be present yet.
	pub(crate) fn add(&mut self, entry: SymbolEntry) -> Symbol {
		let symbol = Symbol(self.entries.len());
		self.index.insert(entry.name.clone(), symbol);
		self.entries.push(entry);
		symbol
	}

	pub fn len(&self) -> usize { self.entries.len() }

	pub fn is_empty(&self) -> bool { self.entries.is_empty() }

	pub fn get(&self, symbol: Symbol) -> Option<&SymbolEntry> { self.entries.get(symbol.0) }

	/// Name for messages, also valid for [`Symbol::EOF`].
	pub fn name(&self, symbol: Symbol) -> &str { self.get(symbol).map_or("(end of input)", |e| e.name.as_str()) }

	/// Kind of a symbol, [`SymbolKind::NoType`] for [`Symbol::EOF`].
	pub fn kind(&self, symbol: Symbol) -> SymbolKind { self.get(symbol).map_or(SymbolKind::NoType, |e| e.kind) }

	pub fn is_punct(&self, symbol: Symbol, punct: Punct) -> bool { self.kind(symbol) == SymbolKind::Punct(punct) }

	pub fn is_keyword(&self, symbol: Symbol, keyword: Keyword) -> bool {
		self.kind(symbol) == SymbolKind::Keyword(keyword)
	}

	pub fn is_vartype(&self, symbol: Symbol) -> bool {
		matches!(self.kind(symbol), SymbolKind::Vartype | SymbolKind::UndefinedStruct)
	}

	/// Record where a symbol got declared.
	pub fn set_declared(&mut self, symbol: Symbol, section: &str, line: usize) {
		let section = self.sections.id(section);
		let entry = &mut self[symbol];
		entry.decl_section = section;
		entry.decl_line = line;
	}

	/// Key a struct member is stored under.
	pub fn mangle(owner: &str, member: &str) -> String { format!("{owner}::{member}") }

	/// Bare member name of a mangled name.
	pub fn unmangle(name: &str) -> &str { name.rsplit_once("::").map_or(name, |(_, member)| member) }

	/// Find a declared member of `strct` or of one of its ancestors.
	pub fn find_member(&self, strct: Symbol, member: &str) -> Option<Symbol> {
		let mut current = Some(strct);
		while let Some(s) = current {
			let found = self.find(&Self::mangle(self.name(s), member)).filter(|&m| self.kind(m) != SymbolKind::NoType);
			if found.is_some() {
				return found;
			}
			current = self.get(s).and_then(|e| e.extends);
		}
		None
	}

	/// Whether `child` is `ancestor` or extends it, directly or not.
	pub fn is_derived_from(&self, child: Symbol, ancestor: Symbol) -> bool {
		let mut current = Some(child);
		while let Some(s) = current {
			if s == ancestor {
				return true;
			}
			current = self.get(s).and_then(|e| e.extends);
		}
		false
	}

	/// Size of a value of this type in bytes.
	pub fn size_of(&self, vartype: &Vartype) -> usize {
		if vartype.is_dynarray() {
			return 4;
		}
		let element = if vartype.is_pointer() { 4 } else { self.get(vartype.base).map_or(0, |e| e.size) };
		element.saturating_mul(vartype.array.unwrap_or(1))
	}

	/// Render a type the way messages show it, e.g. `const string`, `Foo*[]`.
	pub fn vartype_name(&self, vartype: &Vartype) -> String {
		let mut name = String::new();
		if vartype.is_const() {
			name.push_str("const ");
		}
		name.push_str(self.name(vartype.base));
		if vartype.is_pointer() {
			name.push('*');
		}
		if let Some(len) = vartype.array {
			name.push_str(&format!("[{len}]"));
		}
		if vartype.is_dynarray() {
			name.push_str("[]");
		}
		name
	}

	pub fn is_struct_type(&self, symbol: Symbol) -> bool { self.get(symbol).is_some_and(SymbolEntry::is_struct) }

	pub fn is_managed_type(&self, symbol: Symbol) -> bool { self.get(symbol).is_some_and(SymbolEntry::is_managed) }

	/// `char`, `short`, `int`, `long` and enums.
	pub fn is_int_like(&self, vartype: &Vartype) -> bool {
		let wk = &self.well_known;
		vartype.flags.difference(VartypeFlags::CONST).is_empty()
			&& vartype.array.is_none()
			&& ([wk.char, wk.short, wk.int, wk.long].contains(&vartype.base)
				|| self.get(vartype.base).is_some_and(|e| e.flags.contains(SymbolFlags::ENUM)))
	}

	pub fn is_float(&self, vartype: &Vartype) -> bool {
		vartype.base == self.well_known.float && vartype.flags.difference(VartypeFlags::CONST).is_empty() && !vartype.is_array()
	}

	/// Old style fixed buffer string, `const string` included.
	pub fn is_old_string(&self, vartype: &Vartype) -> bool {
		vartype.base == self.well_known.string && !vartype.is_pointer() && !vartype.is_dynarray() && !vartype.is_array()
	}

	pub fn int_type(&self) -> Vartype { Vartype::new(self.well_known.int) }

	pub fn float_type(&self) -> Vartype { Vartype::new(self.well_known.float) }

	pub fn void_type(&self) -> Vartype { Vartype::new(self.well_known.void) }

	pub fn null_type(&self) -> Vartype { Vartype::new(self.well_known.null) }

	/// Type of a string literal.
	pub fn string_literal_type(&self) -> Vartype { Vartype::new(self.well_known.string).constant() }
}

impl Index<Symbol> for SymbolTable {
	type Output = SymbolEntry;

	fn index(&self, symbol: Symbol) -> &SymbolEntry { &self.entries[symbol.0] }
}

impl IndexMut<Symbol> for SymbolTable {
	fn index_mut(&mut self, symbol: Symbol) -> &mut SymbolEntry { &mut self.entries[symbol.0] }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reset_enters_predefined_symbols() {
		let mut sym = SymbolTable::new();
		let predefined = sym.len();
		assert_eq!(sym.kind(sym.find("while").unwrap()), SymbolKind::Keyword(Keyword::While));
		assert_eq!(sym.kind(sym.find("_tryimport").unwrap()), SymbolKind::Keyword(Keyword::Import));
		assert_eq!(sym.kind(sym.find("<<=").unwrap()), SymbolKind::CompoundAssign(Operator::Shl));
		assert_eq!(sym[sym.well_known.int].size, 4);
		assert_eq!(sym[sym.well_known.string].size, 200);

		let foo = sym.find_or_add("Foo");
		assert_eq!(sym.find_or_add("Foo"), foo);
		assert_eq!(sym.kind(foo), SymbolKind::NoType);
		sym.reset();
		assert_eq!(sym.find("Foo"), None);
		assert_eq!(sym.len(), predefined);
	}

	#[test]
	fn eof_is_harmless() {
		let sym = SymbolTable::new();
		assert_eq!(sym.kind(Symbol::EOF), SymbolKind::NoType);
		assert_eq!(sym.name(Symbol::EOF), "(end of input)");
	}

	#[test]
	fn member_lookup_walks_ancestors() {
		let mut sym = SymbolTable::new();
		let base = sym.find_or_add("Base");
		let derived = sym.find_or_add("Derived");
		sym[derived].extends = Some(base);
		let member = sym.find_or_add("Base::X");
		sym[member].kind = SymbolKind::StructComponent;
		sym.find_or_add("Derived::Y");

		assert_eq!(sym.find_member(derived, "X"), Some(member));
		assert_eq!(sym.find_member(derived, "Y"), None);
		assert_eq!(sym.find_member(base, "Z"), None);
		assert!(sym.is_derived_from(derived, base));
		assert!(!sym.is_derived_from(base, derived));
	}

	#[test]
	fn vartype_names_and_sizes() {
		let mut sym = SymbolTable::new();
		let sprite = sym.find_or_add("DynamicSprite");
		sym[sprite].size = 12;
		let int = sym.int_type();

		assert_eq!(sym.vartype_name(&Vartype::new(sprite).pointer().dynarray()), "DynamicSprite*[]");
		assert_eq!(sym.vartype_name(&int.clone().dynarray()), "int[]");
		assert_eq!(sym.vartype_name(&int.clone().with_array(5)), "int[5]");
		assert_eq!(sym.vartype_name(&sym.string_literal_type()), "const string");

		assert_eq!(sym.size_of(&Vartype::new(sprite)), 12);
		assert_eq!(sym.size_of(&Vartype::new(sprite).with_array(3)), 36);
		assert_eq!(sym.size_of(&Vartype::new(sprite).pointer().with_array(3)), 12);
		assert_eq!(sym.size_of(&int.dynarray()), 4);
	}

	#[test]
	fn signature_defaults() {
		let sym = SymbolTable::new();
		let mut signature = FunctionSignature::new(sym.void_type());
		signature.param_types = vec![sym.int_type(); 3];
		signature.param_defaults = vec![None, Some(7), Some(-1)];
		assert!(!signature.param_has_default(0));
		assert_eq!(signature.param_default_value(1), Some(7));
		assert_eq!(signature.param_default_value(5), None);
		assert_eq!(signature.required_args(), 1);
	}
}
