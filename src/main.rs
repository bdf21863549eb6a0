use std::{
	fs::read_to_string,
	path::{Path, PathBuf},
	process::ExitCode,
};

use anyhow::Context;
use log::{LevelFilter, Log, Metadata, Record};
use palc::Parser;
use scom::{CompileError, Compiler, Section, cli::*, symbol_table::SymbolTable};

/// Writes log records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
		}
	}

	fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: bool) {
	if let Err(e) = log::set_logger(&LOGGER) {
		eprintln!("Failed set logger: {e}");
		return;
	}
	log::set_max_level(if verbose { LevelFilter::Debug } else { LevelFilter::Warn });
}

fn read_sections(files: &[PathBuf]) -> Result<Vec<Section>, CompileError> {
	files
		.iter()
		.map(|path| -> Result<Section, CompileError> {
			let text = read_to_string(path).with_context(|| format!("Failed open source file {}", path.display()))?;
			Ok(Section::new(path.display().to_string(), text))
		})
		.collect()
}

fn compile(files: &[PathBuf], options: &OptionFlags) -> Result<(), CompileError> {
	let sections = read_sections(files)?;
	let scrip = Compiler::new(options.into()).compile_sections(&sections)?;
	print!("{scrip}");
	Ok(())
}

fn tokens(path: &Path) -> Result<(), CompileError> {
	let sections = read_sections(&[path.to_path_buf()])?;
	let mut sym = SymbolTable::new();
	let tokens = Compiler::default().tokenize(&sections, &mut sym)?;
	for (pos, &symbol) in tokens.symbols().iter().enumerate() {
		println!("{:5}  {:<24} {:?}", tokens.line_at(pos), sym.name(symbol), sym.kind(symbol));
	}
	Ok(())
}

fn main() -> ExitCode {
	let result = match Cli::parse().mode {
		Mode::Compile { files, options, verbose } => {
			init_logger(verbose);
			if files.is_empty() {
				eprintln!("Failed compile: no input files");
				return ExitCode::FAILURE;
			}
			compile(&files, &options)
		}
		Mode::Tokens { path } => {
			init_logger(false);
			tokens(&path)
		}
	};
	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("Failed compile: {e}");
			ExitCode::FAILURE
		}
	}
}
