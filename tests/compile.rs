use std::path::PathBuf;

use scom::{
	CompileError, CompileOptions, CompiledScript, Compiler, Section,
	compiled_script::{ExportKind, FixupKind, Opcode},
	symbol_table::SymbolTable,
};

const HEADER: &str = include_str!("scripts/header.ash");
const GAME: &str = include_str!("scripts/game.asc");

fn game_sections() -> [Section; 2] { [Section::new("header.ash", HEADER), Section::new("game.asc", GAME)] }

fn diagnostic(source: &str) -> (String, usize) {
	match Compiler::default().compile(source) {
		Ok(_) => panic!("compiled without an error: {source}"),
		Err(CompileError::Diagnostic(d)) => (d.message, d.line),
		Err(e) => panic!("internal error: {e}"),
	}
}

fn message(source: &str) -> String { diagnostic(source).0 }

fn enum_values(source: &str, names: &[&str]) -> Vec<i32> {
	let mut sym = SymbolTable::new();
	Compiler::default().compile_with(&[Section::new("", source)], &mut sym).unwrap();
	names.iter().map(|name| sym[sym.find(name).unwrap()].value).collect()
}

fn opcodes(scrip: &CompiledScript) -> Vec<Opcode> {
	let mut ops = vec![];
	let mut pos = 0;
	while let Some(op) = scrip.code.get(pos).and_then(|&c| Opcode::from_code(c)) {
		ops.push(op);
		pos += 1 + op.arity();
	}
	ops
}

#[test]
fn game_script_compiles() {
	let scrip = Compiler::default().compile_sections(&game_sections()).unwrap();
	let functions: Vec<_> = scrip.functions.iter().map(|f| f.name.as_str()).collect();
	assert_eq!(functions, ["clamp", "move", "visit", "greet"]);
	let sections: Vec<_> = scrip.sections.iter().map(|s| s.name.as_str()).collect();
	assert_eq!(sections, ["header.ash", "game.asc"]);
	assert!(scrip.exports.iter().any(|e| e.name == "score" && e.kind == ExportKind::Data));
	assert!(scrip.exports.iter().any(|e| e.name == "greet$0" && e.kind == ExportKind::Function));
	assert!(scrip.imports.iter().any(|i| i == "Character::Say^101"));
	assert!(scrip.imports.iter().any(|i| i == "Character::set_X^1"));

	// every fixup points into the code and names a relocatable value
	for fixup in &scrip.fixups {
		assert!(fixup.offset < scrip.code.len());
	}
	assert!(scrip.fixups.iter().any(|f| f.kind == FixupKind::Import));
	assert!(scrip.fixups.iter().any(|f| f.kind == FixupKind::GlobalData));
	assert!(opcodes(&scrip).contains(&Opcode::CallObj));
	assert!(!scrip.to_string().is_empty());
}

#[test]
fn compile_file_names_the_section() {
	let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("scripts").join("header.ash");
	let scrip = Compiler::default().compile_file(&path).unwrap();
	assert_eq!(scrip.sections[0].name, path.display().to_string());
}

#[test]
fn section_markers_restart_the_lines() {
	let source = "int a;\n\"__NEWSCRIPTSTART_Second\"\nint b;\n\nvoid f() { b = c; }";
	let error = Compiler::default().compile(source).unwrap_err();
	let diagnostic = error.diagnostic().unwrap();
	assert_eq!(diagnostic.section, "Second");
	assert_eq!(diagnostic.line, 3);
	assert_eq!(diagnostic.message, "Identifier 'c' is undeclared");
}

#[test]
fn enum_numbering() {
	let source = "enum E { cat, dog, fish, money = 100, death, taxes, popularity = -3, x, y, z, intmin = -2147483648, \
	              intmax = 2147483647 };";
	let names = ["cat", "dog", "fish", "money", "death", "taxes", "popularity", "x", "y", "z", "intmin", "intmax"];
	assert_eq!(enum_values(source, &names), [1, 2, 3, 100, 101, 102, -3, -2, -1, 0, i32::MIN, i32::MAX]);
}

#[test]
fn enum_hex_values() {
	let source = "enum E { a = 0x12345, b = 0xFF, c = 0x7FFFFFFF, d = 0xFFFFFFFF };";
	assert_eq!(enum_values(source, &["a", "b", "c", "d"]), [0x12345, 0xFF, 0x7FFFFFFF, -1]);
	assert_eq!(
		message("enum E { a = 0x1FFFFFFFF };"),
		"Could not parse integer symbol '0x1FFFFFFFF' because of overflow."
	);
}

#[test]
fn default_value_range() {
	assert!(Compiler::default().compile("void f(int a = -2147483648, int b = 2147483647);").is_ok());
	assert_eq!(
		message("void f(int a = -2147483649);"),
		"Literal value '-2147483649' is too small (min. is -2147483648)"
	);
	assert_eq!(message("void f(int a = 2147483648);"), "Literal value '2147483648' is too large (max. is 2147483647)");
	assert_eq!(message("void f(int a = - -69);"), "Parameter default value must be literal");
}

#[test]
fn default_values_are_stored() {
	let mut sym = SymbolTable::new();
	let source = "void f(int a = -2147483648, int b = 0x7FFFFFFF, int c);";
	Compiler::default().compile_with(&[Section::new("", source)], &mut sym).unwrap();
	let entry = &sym[sym.find("f").unwrap()];
	let signature = entry.signature.as_ref().unwrap();
	assert_eq!(signature.param_default_value(0), Some(i32::MIN));
	assert_eq!(signature.param_default_value(1), Some(i32::MAX));
	assert!(!signature.param_has_default(2));
}

#[test]
fn general_expression_overflow() {
	assert_eq!(
		message("int f() { return -2147483649; }"),
		"Could not parse integer symbol '-2147483649' because of overflow."
	);
	assert!(Compiler::default().compile("int f() { return 2-4 + -2147483648 - -f(); }").is_ok());
}

#[test]
fn managed_struct_arrays() {
	let sprite = "builtin managed struct DynamicSprite { };\n";
	assert_eq!(message(&format!("{sprite}DynamicSprite[] f();")), "cannot pass non-pointer struct array");
	assert_eq!(message(&format!("{sprite}DynamicSprite s[];")), "cannot pass non-pointer struct array");
	assert!(Compiler::default().compile(&format!("{sprite}DynamicSprite *[] f();")).is_ok());
}

#[test]
fn struct_scope_ends_at_its_brace() {
	let mut sym = SymbolTable::new();
	let source = "managed struct B { int A; float C; };\nint C;\nvoid f() { C = 1; }";
	Compiler::default().compile_with(&[Section::new("", source)], &mut sym).unwrap();
	assert!(sym.find("B::C").is_some());
	assert!(sym.find("C").is_some());
	assert_ne!(sym.find("B::C"), sym.find("C"));
	assert!(sym.find("B::Outside").is_none());
}

#[test]
fn qualifiers_in_any_order() {
	let source = "managed struct S {\n  readonly import attribute int A;\n  import readonly attribute int B;\n  attribute \
	              readonly import int C;\n  writeprotected protected int D;\n};";
	let error = Compiler::default().compile(source).unwrap_err();
	assert_eq!(error.diagnostic().unwrap().line, 5);

	let source = source.replace("writeprotected protected int D;", "protected int D;");
	let mut sym = SymbolTable::new();
	Compiler::default().compile_with(&[Section::new("", &source)], &mut sym).unwrap();
	for name in ["S::A", "S::B", "S::C"] {
		let entry = &sym[sym.find(name).unwrap()];
		assert!(entry.getter.is_some());
		assert!(entry.setter.is_none());
	}
}

#[test]
fn brackets_report_the_opener_line() {
	let (message, line) = diagnostic("struct B {\n  String B;\n  float A;\n]");
	assert_eq!(line, 4);
	assert_eq!(message, "This closing ']' does not match the '{' on line 1");
}

#[test]
fn left_to_right_changes_the_split() {
	let source = "int f(int a, int b, int c) { return a - b - c; }";
	let default = Compiler::default().compile(source).unwrap();
	let left = Compiler::new(CompileOptions::LEFT_TO_RIGHT).compile(source).unwrap();
	assert_ne!(default.code, left.code);
}

#[test]
fn first_error_wins() {
	let (message, line) = diagnostic("int a;\nvoid f() {\n  a = b;\n  a = c;\n}");
	assert_eq!(message, "Identifier 'b' is undeclared");
	assert_eq!(line, 3);
}

#[test]
fn declarations_remember_their_section() {
	let mut sym = SymbolTable::new();
	Compiler::default().compile_with(&game_sections(), &mut sym).unwrap();
	let clamp = &sym[sym.find("clamp").unwrap()];
	assert_eq!(sym.sections.name(clamp.decl_section), "game.asc");
	let player = &sym[sym.find("player").unwrap()];
	assert_eq!(sym.sections.name(player.decl_section), "header.ash");
}
