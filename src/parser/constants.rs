// Constants for the Lua parser

/// Default nesting limit for expressions, blocks and operator chains.
/// Matches the C-level recursion limit of the reference Lua implementation
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Worker stack reserved per nesting level, with headroom for debug builds
pub const STACK_PER_LEVEL: usize = 64 * 1024;

/// Worker stack reserved on top of the per-level share
pub const STACK_BASE: usize = 1024 * 1024;

/// Filename used in error messages when the caller gives none
pub const DEFAULT_FILENAME: &str = "input";

/// Reserved words, which can never be used as names
pub const KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];
