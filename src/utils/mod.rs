/*
 * Utilities
 *
 * Logging and console line input on top of the descriptor table.
 */

pub mod line_editor;
pub mod logger;

pub use line_editor::read_line;
