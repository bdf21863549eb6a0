//! The tokenized compile unit.
//!
//! A [`TokenStream`] owns the symbols of all sections in source order plus
//! two sparse side tables: the line and the section each token comes from.
//! A tag applies from the position it was set at until the next tag, so only
//! changes are stored.
//!
//! The parser reads through [`SrcList`] views. A view covers a range of the
//! stream with its own cursor and local indices starting at 0, which lets an
//! expression be re-examined as a slice of its own.
use std::ops::Index;

use crate::symbol_table::Symbol;

/// Values tagged onto positions, each holding until the next tag.
#[derive(Debug, Clone)]
struct StickyTags<T> {
	tags:    Vec<(usize, T)>,
	default: T,
}

impl<T: PartialEq> StickyTags<T> {
	fn new(default: T) -> Self { Self { tags: vec![], default } }

	fn set(&mut self, pos: usize, value: T) {
		let at = self.tags.partition_point(|(p, _)| *p < pos);
		match self.tags.get_mut(at) {
			Some((p, v)) if *p == pos => *v = value,
			_ => self.tags.insert(at, (pos, value)),
		}
	}

	fn get(&self, pos: usize) -> &T {
		let at = self.tags.partition_point(|(p, _)| *p <= pos);
		at.checked_sub(1).map_or(&self.default, |i| &self.tags[i].1)
	}
}

/// Interned symbols with line and section provenance.
#[derive(Debug, Clone)]
pub struct TokenStream {
	symbols:  Vec<Symbol>,
	lines:    StickyTags<usize>,
	sections: StickyTags<String>,
}

impl Default for TokenStream {
	fn default() -> Self { Self::new() }
}

impl TokenStream {
	/// An empty stream, in section `""` at line 0.
	pub fn new() -> Self { Self { symbols: vec![], lines: StickyTags::new(0), sections: StickyTags::new(String::new()) } }

	pub fn append(&mut self, symbol: Symbol) { self.symbols.push(symbol); }

	/// Tokens appended from now on come from `line`.
	pub fn new_line(&mut self, line: usize) { self.lines.set(self.symbols.len(), line); }

	/// Tokens appended from now on come from section `name`.
	pub fn new_section(&mut self, name: &str) { self.sections.set(self.symbols.len(), name.to_string()); }

	pub fn len(&self) -> usize { self.symbols.len() }

	pub fn is_empty(&self) -> bool { self.symbols.is_empty() }

	pub fn symbols(&self) -> &[Symbol] { &self.symbols }

	pub fn line_at(&self, pos: usize) -> usize { *self.lines.get(pos) }

	pub fn section_at(&self, pos: usize) -> &str { self.sections.get(pos) }

	/// A view over the whole stream.
	pub fn view(&self) -> SrcList<'_> { SrcList { stream: self, offset: 0, len: self.len(), cursor: 0 } }
}

impl FromIterator<Symbol> for TokenStream {
	fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
		let mut stream = TokenStream::new();
		stream.symbols.extend(iter);
		stream
	}
}

/// A cursor over a range of a [`TokenStream`].
#[derive(Debug, Clone)]
pub struct SrcList<'a> {
	stream: &'a TokenStream,
	/// Absolute position of local index 0
	offset: usize,
	len:    usize,
	cursor: usize,
}

impl<'a> SrcList<'a> {
	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	pub fn in_range(&self, pos: usize) -> bool { pos < self.len }

	/// Symbol at local position `pos`, [`Symbol::EOF`] out of range.
	pub fn get(&self, pos: usize) -> Symbol {
		if self.in_range(pos) { self.stream.symbols[self.offset + pos] } else { Symbol::EOF }
	}

	pub fn cursor(&self) -> usize { self.cursor }

	pub fn set_cursor(&mut self, pos: usize) { self.cursor = pos; }

	/// Consume the symbol at the cursor.
	pub fn get_next(&mut self) -> Symbol {
		let symbol = self.get(self.cursor);
		if self.in_range(self.cursor) {
			self.cursor += 1;
		}
		symbol
	}

	/// The symbol [`SrcList::get_next`] would return.
	pub fn peek_next(&self) -> Symbol { self.get(self.cursor) }

	/// Un-consume the symbol before the cursor.
	pub fn back_up(&mut self) { self.cursor = self.cursor.saturating_sub(1); }

	pub fn reached_eof(&self) -> bool { self.cursor >= self.len }

	/// Absolute position of local position `pos`, clamped to the stream.
	fn absolute(&self, pos: usize) -> usize {
		let last = self.stream.len().saturating_sub(1);
		(self.offset + pos).min(last)
	}

	pub fn line_at(&self, pos: usize) -> usize { self.stream.line_at(self.absolute(pos)) }

	pub fn section_at(&self, pos: usize) -> &'a str { self.stream.section_at(self.absolute(pos)) }

	/// Line of the symbol consumed last.
	pub fn lineno(&self) -> usize { self.line_at(self.cursor.saturating_sub(1)) }

	/// Section of the symbol consumed last.
	pub fn section(&self) -> &'a str { self.section_at(self.cursor.saturating_sub(1)) }

	/// A view over local range `[from, to)`, clipped to this view.
	pub fn sub_view(&self, from: usize, to: usize) -> SrcList<'a> {
		let from = from.min(self.len);
		let to = to.clamp(from, self.len);
		SrcList { stream: self.stream, offset: self.offset + from, len: to - from, cursor: 0 }
	}

	/// Symbols of this view.
	pub fn symbols(&self) -> &'a [Symbol] { &self.stream.symbols[self.offset..self.offset + self.len] }
}

impl Index<usize> for SrcList<'_> {
	type Output = Symbol;

	fn index(&self, pos: usize) -> &Symbol {
		if self.in_range(pos) { &self.stream.symbols[self.offset + pos] } else { &Symbol::EOF }
	}
}
