use bitflags::bitflags;

bitflags! {
	/// Switches that change what the compiler accepts or emits.
	#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct CompileOptions: u32 {
		/// Export every function that has a body
		const EXPORT_ALL = 0x01;
		/// Emit a line marker in front of each statement
		const LINE_NUMBERS = 0x04;
		/// A local definition may not replace an import of the same name
		const NO_IMPORT_OVERRIDE = 0x20;
		/// Operators of equal priority bind from left to right
		const LEFT_TO_RIGHT = 0x40;
		/// Allow the fixed size `string` type
		const OLD_STRINGS = 0x80;
	}
}
