use super::{Keyword, Operator, Punct, Symbol, SymbolEntry, SymbolKind, SymbolTable, WellKnown};

#[rustfmt::skip]
const KEYWORDS: &[(&str, Keyword)] = &[
	("attribute", Keyword::Attribute), ("autoptr", Keyword::Autoptr), ("break", Keyword::Break),
	("builtin", Keyword::Builtin), ("case", Keyword::Case), ("const", Keyword::Const),
	("continue", Keyword::Continue), ("default", Keyword::Default), ("do", Keyword::Do), ("else", Keyword::Else),
	("enum", Keyword::Enum), ("export", Keyword::Export), ("extends", Keyword::Extends), ("for", Keyword::For),
	("if", Keyword::If), ("import", Keyword::Import), ("_tryimport", Keyword::Import),
	("internalstring", Keyword::InternalString), ("managed", Keyword::Managed), ("new", Keyword::New),
	("noloopcheck", Keyword::NoLoopCheck), ("protected", Keyword::Protected), ("readonly", Keyword::ReadOnly),
	("return", Keyword::Return), ("static", Keyword::Static), ("struct", Keyword::Struct),
	("switch", Keyword::Switch), ("this", Keyword::This), ("while", Keyword::While),
	("writeprotected", Keyword::WriteProtected),
];

#[rustfmt::skip]
const OPERATORS: &[(&str, SymbolKind)] = {
	use Operator::*;
	use SymbolKind::{CompoundAssign as Ca, Crement, Operator as Op};
	&[
		("!", Op(Not)), ("~", Op(BitNeg)), ("*", Op(Mul)), ("/", Op(Div)), ("%", Op(Mod)),
		("+", Op(Add)), ("-", Op(Sub)), ("<<", Op(Shl)), (">>", Op(Shr)), ("&", Op(BitAnd)),
		("|", Op(BitOr)), ("^", Op(Xor)), ("==", Op(Eq)), ("!=", Op(Ne)), (">", Op(Gt)),
		("<", Op(Lt)), (">=", Op(Ge)), ("<=", Op(Le)), ("&&", Op(And)), ("||", Op(Or)),
		("=", SymbolKind::Assign),
		("+=", Ca(Add)), ("-=", Ca(Sub)), ("*=", Ca(Mul)), ("/=", Ca(Div)), ("%=", Ca(Mod)),
		("&=", Ca(BitAnd)), ("|=", Ca(BitOr)), ("^=", Ca(Xor)), ("<<=", Ca(Shl)), (">>=", Ca(Shr)),
		("++", Crement(Add)), ("--", Crement(Sub)),
	]
};

#[rustfmt::skip]
const PUNCTUATION: &[(&str, Punct)] = &[
	("(", Punct::OpenParen), (")", Punct::CloseParen), ("[", Punct::OpenBracket), ("]", Punct::CloseBracket),
	("{", Punct::OpenBrace), ("}", Punct::CloseBrace), (",", Punct::Comma), (";", Punct::Semicolon),
	(".", Punct::Dot), ("::", Punct::ScopeRes), (":", Punct::Colon), ("?", Punct::Question),
	("...", Punct::Ellipsis), ("->", Punct::Arrow),
];

/// Enter keywords, operators and primitive types into an empty table.
pub(super) fn enter(table: &mut SymbolTable) -> WellKnown {
	for &(name, keyword) in KEYWORDS {
		table.add(SymbolEntry::new(name, SymbolKind::Keyword(keyword)));
	}
	for &(name, kind) in OPERATORS {
		table.add(SymbolEntry::new(name, kind));
	}
	for &(name, punct) in PUNCTUATION {
		table.add(SymbolEntry::new(name, SymbolKind::Punct(punct)));
	}

	let mut vartype = |name: &str, size: usize| {
		let mut entry = SymbolEntry::new(name, SymbolKind::Vartype);
		entry.size = size;
		table.add(entry)
	};
	let char = vartype("char", 1);
	let short = vartype("short", 2);
	let int = vartype("int", 4);
	let long = vartype("long", 4);
	let float = vartype("float", 4);
	let string = vartype("string", 200);
	let void = vartype("void", 0);

	let null = table.add(SymbolEntry::new("null", SymbolKind::Null));
	let this = table.find("this").unwrap_or(Symbol::EOF);

	WellKnown { char, short, int, long, float, string, void, null, this }
}
