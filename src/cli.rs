use std::path::PathBuf;

use palc::{Args, Parser, Subcommand};

use crate::CompileOptions;

#[derive(Parser)]
#[command(name = "scom", after_long_help = "Compiles game scripts into bytecode for the script engine.")]
pub struct Cli {
	#[command(subcommand)]
	pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
	/// Compile files as consecutive sections and print the listing
	Compile {
		/// Input files, headers first
		files:   Vec<PathBuf>,
		#[command(flatten)]
		options: OptionFlags,
		/// Log what the compiler does
		#[arg(short, long)]
		verbose: bool,
	},
	/// Print the token stream of a file
	Tokens { path: PathBuf },
}

#[derive(Args, Debug)]
pub struct OptionFlags {
	/// Operators of equal priority bind from left to right
	#[arg(long)]
	pub left_to_right:      bool,
	/// Allow the fixed size `string` type
	#[arg(long)]
	pub old_strings:        bool,
	/// Export every function that has a body
	#[arg(long)]
	pub export_all:         bool,
	/// Emit a line marker in front of each statement
	#[arg(long)]
	pub line_numbers:       bool,
	/// Reject definitions that replace an import
	#[arg(long)]
	pub no_import_override: bool,
}

impl From<&OptionFlags> for CompileOptions {
	fn from(flags: &OptionFlags) -> Self {
		let mut options = CompileOptions::empty();
		options.set(CompileOptions::LEFT_TO_RIGHT, flags.left_to_right);
		options.set(CompileOptions::OLD_STRINGS, flags.old_strings);
		options.set(CompileOptions::EXPORT_ALL, flags.export_all);
		options.set(CompileOptions::LINE_NUMBERS, flags.line_numbers);
		options.set(CompileOptions::NO_IMPORT_OVERRIDE, flags.no_import_override);
		options
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flags_map_to_options() {
		let flags = OptionFlags {
			left_to_right:      true,
			old_strings:        false,
			export_all:         true,
			line_numbers:       false,
			no_import_override: true,
		};
		let options = CompileOptions::from(&flags);
		assert_eq!(
			options,
			CompileOptions::LEFT_TO_RIGHT | CompileOptions::EXPORT_ALL | CompileOptions::NO_IMPORT_OVERRIDE
		);
	}
}
