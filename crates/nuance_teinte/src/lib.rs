//! # nuance_teinte
//!
//! Teinte - The expression evaluator for nuance.
//!
//! ## Name Origin
//!
//! **Teinte** (/tɛ̃t/) is French for *tint* or *hue*. This crate turns the raw
//! text of a property or variable value into the literal a browser would see:
//! it resolves variable references, does unit-aware arithmetic and runs the
//! LESS/SCSS color functions.
//!
//! ## Usage
//!
//! ```
//! use nuance_teinte::{Context, DivisionMode};
//!
//! let mut ctx = Context::new([("@base", "10px"), ("@brand", "#fc0")]);
//! assert_eq!(ctx.evaluate("@base * 2 - 1").unwrap().to_string(), "19px");
//! assert_eq!(ctx.evaluate("darken(@brand, 10%)").unwrap().to_string(), "#cca300");
//!
//! ctx.set_division_mode(DivisionMode::Never);
//! assert_eq!(ctx.evaluate("14px/20px").unwrap().to_string(), "14px/20px");
//! ```

mod color;
mod error;
mod eval;
mod functions;
mod lexer;
mod parser;
mod value;

pub use color::Color;
pub use error::EvalError;
pub use eval::{evaluate, Context, DivisionMode};
pub use value::{format_number, Number, Separator, Value};
