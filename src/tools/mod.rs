//! Tools that agents can invoke.
//!
//! - Calculator: arithmetic expression evaluation

pub mod calculator;

pub use calculator::{calculator_toolkit, CalculatorInput, CalculatorOutput, CalculatorTool};
