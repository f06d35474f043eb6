//! Evaluation contexts and the tree-walking evaluator.

use std::cell::RefCell;

use nuance_trousse::{CompactString, FxHashMap};

use crate::{
    functions,
    parser::{parse, BinaryOp, Expr},
    Color, EvalError, Number, Separator, Value,
};

/// How a `/` between two operands is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DivisionMode {
    /// Slash always divides
    #[default]
    Always = 0,
    /// Slash is literal text unless inside parentheses (`font: 14px/20px`)
    Never = 1,
    /// Slash divides only when an operand is a variable, a function result or
    /// a parenthesized group, or when the expression does other arithmetic
    Sass = 2,
}

/// Deepest evaluation recursion, variable references included
const MAX_EVAL_DEPTH: usize = 256;

type CacheKey = (CompactString, DivisionMode);

/// Variables visible to an expression plus evaluation settings.
///
/// Variables are stored as raw text and evaluated lazily the first time an
/// expression references them; results are memoized per division mode.
#[derive(Debug, Default)]
pub struct Context {
    variables: FxHashMap<CompactString, CompactString>,
    division_mode: DivisionMode,
    cache: RefCell<FxHashMap<CacheKey, Result<Value, EvalError>>>,
}

impl Context {
    pub fn new<K, V>(variables: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<CompactString>,
        V: Into<CompactString>,
    {
        Self {
            variables: variables
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            division_mode: DivisionMode::default(),
            cache: RefCell::default(),
        }
    }

    #[inline]
    pub fn set_division_mode(&mut self, mode: DivisionMode) {
        self.division_mode = mode;
    }

    /// Evaluate raw expression text
    pub fn evaluate(&self, text: &str) -> Result<Value, EvalError> {
        evaluate(text, self)
    }

    /// Evaluate the variable `name` (memoized)
    pub fn evaluate_variable(&self, name: &str) -> Result<Value, EvalError> {
        Evaluator::new(self).variable(name)
    }
}

/// Evaluate `text` against `ctx`
pub fn evaluate(text: &str, ctx: &Context) -> Result<Value, EvalError> {
    let expr = parse(text)?;
    Evaluator::new(ctx).top_level(&expr)
}

struct Evaluator<'c> {
    ctx: &'c Context,
    /// Variables currently being evaluated, for cycle detection
    stack: Vec<CompactString>,
    paren_depth: u32,
    depth: usize,
    /// Whether the current list item does arithmetic besides division
    arithmetic: bool,
}

impl<'c> Evaluator<'c> {
    fn new(ctx: &'c Context) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
            paren_depth: 0,
            depth: 0,
            arithmetic: false,
        }
    }

    fn top_level(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::List(items, sep) if self.paren_depth == 0 => {
                let values = items
                    .iter()
                    .map(|item| self.top_level(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values, *sep))
            }
            _ => {
                let saved = self.arithmetic;
                self.arithmetic = expr.uses_arithmetic();
                let value = self.eval(expr);
                self.arithmetic = saved;
                value
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.depth += 1;
        let value = if self.depth > MAX_EVAL_DEPTH {
            Err(EvalError::TooDeep(MAX_EVAL_DEPTH))
        } else {
            self.eval_node(expr)
        };
        self.depth -= 1;
        value
    }

    fn eval_node(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(n.clone())),
            Expr::Color(c) => Ok(Value::Color(*c)),
            Expr::Keyword(k) => Ok(Value::Keyword(k.clone())),
            Expr::Quoted { text, quote } => Ok(Value::Quoted {
                text: text.clone(),
                quote: *quote,
            }),
            Expr::Variable(name) => self.variable(name),
            Expr::List(items, sep) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values, *sep))
            }
            Expr::Paren(inner) => {
                self.paren_depth += 1;
                let value = self.eval(inner);
                self.paren_depth -= 1;
                value
            }
            Expr::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call(name, &values)
            }
            Expr::Negate(inner) => negate(self.eval(inner)?),
            Expr::Binary { op, lhs, rhs } => {
                if *op == BinaryOp::Div && !self.divides(lhs, rhs) {
                    let lhs = self.eval(lhs)?;
                    let rhs = self.eval(rhs)?;
                    return Ok(Value::List(vec![lhs, rhs], Separator::Slash));
                }
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                operate(*op, lhs, rhs)
            }
        }
    }

    fn divides(&self, lhs: &Expr, rhs: &Expr) -> bool {
        match self.ctx.division_mode {
            DivisionMode::Always => true,
            DivisionMode::Never => self.paren_depth > 0,
            DivisionMode::Sass => {
                self.paren_depth > 0 || self.arithmetic || !lhs.is_plain() || !rhs.is_plain()
            }
        }
    }

    fn variable(&mut self, name: &str) -> Result<Value, EvalError> {
        let key = (CompactString::from(name), self.ctx.division_mode);
        if let Some(cached) = self.ctx.cache.borrow().get(&key) {
            return cached.clone();
        }
        if self.stack.iter().any(|n| n == name) {
            return Err(EvalError::RecursiveVariable(name.into()));
        }
        let Some(raw) = self.ctx.variables.get(name) else {
            return Err(EvalError::UnknownVariable(name.into()));
        };

        self.stack.push(key.0.clone());
        let saved = (self.paren_depth, self.arithmetic);
        self.paren_depth = 0;
        let result = parse(raw).and_then(|expr| self.top_level(&expr));
        (self.paren_depth, self.arithmetic) = saved;
        self.stack.pop();

        // depth failures depend on where the chain was entered
        if !matches!(result, Err(EvalError::TooDeep(_))) {
            self.ctx.cache.borrow_mut().insert(key, result.clone());
        }
        result
    }
}

fn negate(value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Number(n) => Ok(Value::number(-n.value, n.unit)),
        Value::Keyword(k) if !k.starts_with('-') => Ok(Value::keyword(format!("-{k}"))),
        other => Err(EvalError::IncompatibleOperands {
            op: '-',
            lhs: "nothing",
            rhs: other.type_name(),
        }),
    }
}

fn apply(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
    }
}

pub(crate) fn operate(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => {
            if op == BinaryOp::Div && b.value == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let unit = if a.unit.is_empty() { &b.unit } else { &a.unit };
            Ok(Value::Number(Number::new(
                apply(op, a.value, b.value),
                unit.clone(),
            )))
        }
        (Value::Number(n), other) | (other, Value::Number(n)) if other.is_color() => {
            let color = other.as_color().unwrap_or_else(|| Color::rgb(0.0, 0.0, 0.0));
            let n = n.value;
            let number_first = matches!(lhs, Value::Number(_));
            let scalar = Color::rgba(n, n, n, color.alpha());
            Ok(Value::Color(if number_first {
                scalar.zip_channels(color, |a, b| apply(op, a, b))
            } else {
                color.zip_channels(scalar, |a, b| apply(op, a, b))
            }))
        }
        _ => match (lhs.as_color(), rhs.as_color()) {
            (Some(a), Some(b)) => Ok(Value::Color(a.zip_channels(b, |x, y| apply(op, x, y)))),
            _ => Err(EvalError::IncompatibleOperands {
                op: op.symbol(),
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(ctx: &Context, text: &str) -> String {
        ctx.evaluate(text).unwrap().to_string()
    }

    #[test]
    fn test_arithmetic_and_units() {
        let ctx = Context::new([("@w", "10px")]);
        assert_eq!(eval(&ctx, "@w * 2 - 1"), "19px");
        assert_eq!(eval(&ctx, "2 * @w"), "20px");
        assert_eq!(eval(&ctx, "(1 + 2) * 3em"), "9em");
        assert_eq!(eval(&ctx, "-@w"), "-10px");
        assert_eq!(eval(&ctx, "1px -2px"), "1px -2px");
        assert_eq!(eval(&ctx, "10px/2"), "5px");
    }

    #[test]
    fn test_color_arithmetic() {
        let ctx = Context::default();
        assert_eq!(eval(&ctx, "#111 + #222"), "#333333");
        assert_eq!(eval(&ctx, "#fff - 17"), "#eeeeee");
        assert_eq!(eval(&ctx, "red * 0.5"), "#800000");
        assert_eq!(eval(&ctx, "#f00 + #f00"), "#ff0000");
    }

    #[test]
    fn test_division_modes() {
        let mut ctx = Context::new([("@lh", "20px"), ("$lh", "20px")]);
        assert_eq!(eval(&ctx, "14px/20px"), "0.7px");

        ctx.set_division_mode(DivisionMode::Never);
        assert_eq!(eval(&ctx, "14px/20px"), "14px/20px");
        assert_eq!(eval(&ctx, "bold 14px/20px sans-serif"), "bold 14px/20px sans-serif");
        assert_eq!(eval(&ctx, "(14px/2)"), "7px");

        ctx.set_division_mode(DivisionMode::Sass);
        assert_eq!(eval(&ctx, "14px/20px"), "14px/20px");
        assert_eq!(eval(&ctx, "40px/$lh"), "2px");
        assert_eq!(eval(&ctx, "(10px/2)"), "5px");
        assert_eq!(eval(&ctx, "10px/2 + 1"), "6px");
        assert_eq!(eval(&ctx, "round(7.6px)/2"), "4px");
    }

    #[test]
    fn test_variable_failures() {
        let ctx = Context::new([("@a", "@b"), ("@b", "@a + 1"), ("@c", "@missing")]);
        assert_eq!(
            ctx.evaluate("@a"),
            Err(EvalError::RecursiveVariable("@a".into()))
        );
        assert_eq!(
            ctx.evaluate("@c"),
            Err(EvalError::UnknownVariable("@missing".into()))
        );
        assert_eq!(ctx.evaluate("1px / 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(
            ctx.evaluate("1px + solid"),
            Err(EvalError::IncompatibleOperands {
                op: '+',
                lhs: "number",
                rhs: "keyword"
            })
        ));
    }

    #[test]
    fn test_long_variable_chain_fails_cleanly() {
        let names: Vec<String> = (0..=10_000).map(|i| format!("@v{i}")).collect();
        let mut vars: Vec<(String, String)> = names
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect();
        vars.push((names[10_000].clone(), "1px".into()));
        let ctx = Context::new(vars);
        assert_eq!(
            ctx.evaluate("@v0"),
            Err(EvalError::TooDeep(MAX_EVAL_DEPTH))
        );
        // deep entries are not cached as failures
        assert_eq!(eval(&ctx, "@v9990"), "1px");

        let ctx = Context::new([("@a", "@b"), ("@b", "@c"), ("@c", "2px")]);
        assert_eq!(eval(&ctx, "@a * 2"), "4px");
    }

    #[test]
    fn test_variables_are_memoized_per_mode() {
        let mut ctx = Context::new([("@font", "12px/1.5")]);
        assert_eq!(eval(&ctx, "@font"), "8px");
        ctx.set_division_mode(DivisionMode::Never);
        assert_eq!(eval(&ctx, "@font"), "12px/1.5");
        assert_eq!(ctx.cache.borrow().len(), 2);
    }

    #[test]
    fn test_passthrough_values() {
        let ctx = Context::default();
        assert_eq!(eval(&ctx, "url(img/a.png) no-repeat"), "url(img/a.png) no-repeat");
        assert_eq!(eval(&ctx, r#"~"calc(100% - 1px)""#), "calc(100% - 1px)");
        assert_eq!(eval(&ctx, "'Helvetica', sans-serif"), "'Helvetica', sans-serif");
        assert_eq!(eval(&ctx, "red !important"), "red !important");
    }
}
