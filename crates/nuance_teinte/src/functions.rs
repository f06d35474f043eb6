//! Built-in color and math functions.

use crate::{Color, EvalError, Number, Value};

pub(crate) fn call(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let lower = name.to_ascii_lowercase();
    let f = Args { name, args };
    match lower.as_str() {
        "rgb" => {
            f.arity(3, 3)?;
            Ok(Value::Color(Color::rgb(
                f.channel(0)?,
                f.channel(1)?,
                f.channel(2)?,
            )))
        }
        "rgba" => {
            if args.len() == 2 {
                return Ok(Value::Color(f.color(0)?.with_alpha(f.fraction(1)?)));
            }
            f.arity(4, 4)?;
            Ok(Value::Color(Color::rgba(
                f.channel(0)?,
                f.channel(1)?,
                f.channel(2)?,
                f.fraction(3)?,
            )))
        }
        "hsl" | "hsla" => {
            f.arity(3, 4)?;
            let alpha = if args.len() == 4 { f.fraction(3)? } else { 1.0 };
            Ok(Value::Color(Color::from_hsla(
                f.number(0)?.value,
                f.fraction(1)?,
                f.fraction(2)?,
                alpha,
            )))
        }
        "darken" => f.adjust_hsl(|(h, s, l), amount| (h, s, l - amount)),
        "lighten" => f.adjust_hsl(|(h, s, l), amount| (h, s, l + amount)),
        "saturate" => f.adjust_hsl(|(h, s, l), amount| (h, s + amount, l)),
        "desaturate" => f.adjust_hsl(|(h, s, l), amount| (h, s - amount, l)),
        "spin" => {
            f.arity(2, 2)?;
            let color = f.color(0)?;
            let (h, s, l) = color.to_hsl();
            let degrees = f.number(1)?.value;
            Ok(Value::Color(Color::from_hsla(
                h + degrees,
                s,
                l,
                color.alpha(),
            )))
        }
        "greyscale" | "grayscale" => {
            f.arity(1, 1)?;
            let color = f.color(0)?;
            let (h, _, l) = color.to_hsl();
            Ok(Value::Color(Color::from_hsla(h, 0.0, l, color.alpha())))
        }
        "fade" => {
            f.arity(2, 2)?;
            Ok(Value::Color(f.color(0)?.with_alpha(f.fraction(1)?)))
        }
        "mix" => {
            f.arity(2, 3)?;
            let weight = if args.len() == 3 { f.fraction(2)? } else { 0.5 };
            Ok(Value::Color(mix(f.color(0)?, f.color(1)?, weight)))
        }
        "percentage" => {
            f.arity(1, 1)?;
            Ok(Value::number(f.number(0)?.value * 100.0, "%"))
        }
        "round" => {
            f.arity(1, 2)?;
            let n = f.number(0)?;
            let places = if args.len() == 2 {
                f.number(1)?.value.max(0.0)
            } else {
                0.0
            };
            let factor = 10f64.powi(places as i32);
            Ok(Value::number((n.value * factor).round() / factor, n.unit.clone()))
        }
        "ceil" => f.map_number(f64::ceil),
        "floor" => f.map_number(f64::floor),
        "abs" => f.map_number(f64::abs),
        _ => Err(EvalError::UnknownFunction(name.into())),
    }
}

/// Weighted blend; `weight` is the share of `a` in `0.0..=1.0`
pub(crate) fn mix(a: Color, b: Color, weight: f64) -> Color {
    let p = weight.clamp(0.0, 1.0);
    let w = p * 2.0 - 1.0;
    let alpha_delta = a.alpha() - b.alpha();
    let w1 = if w * alpha_delta == -1.0 {
        w
    } else {
        (w + alpha_delta) / (1.0 + w * alpha_delta)
    };
    let w1 = (w1 + 1.0) / 2.0;
    let w2 = 1.0 - w1;

    let (ar, ag, ab) = a.channels();
    let (br, bg, bb) = b.channels();
    Color::rgba(
        ar * w1 + br * w2,
        ag * w1 + bg * w2,
        ab * w1 + bb * w2,
        a.alpha() * p + b.alpha() * (1.0 - p),
    )
}

struct Args<'a> {
    name: &'a str,
    args: &'a [Value],
}

impl Args<'_> {
    fn invalid(&self, message: &'static str) -> EvalError {
        EvalError::InvalidArgument {
            function: self.name.into(),
            message,
        }
    }

    fn arity(&self, min: usize, max: usize) -> Result<(), EvalError> {
        let n = self.args.len();
        if n < min {
            Err(self.invalid("too few arguments"))
        } else if n > max {
            Err(self.invalid("too many arguments"))
        } else {
            Ok(())
        }
    }

    fn get(&self, index: usize) -> Result<&Value, EvalError> {
        self.args
            .get(index)
            .ok_or_else(|| self.invalid("too few arguments"))
    }

    fn number(&self, index: usize) -> Result<&Number, EvalError> {
        self.get(index)?
            .as_number()
            .ok_or_else(|| self.invalid("expected a number"))
    }

    fn color(&self, index: usize) -> Result<Color, EvalError> {
        self.get(index)?
            .as_color()
            .ok_or_else(|| self.invalid("expected a color"))
    }

    /// RGB channel: `50%` is half of 255
    fn channel(&self, index: usize) -> Result<f64, EvalError> {
        let n = self.number(index)?;
        Ok(if n.unit == "%" {
            n.value * 2.55
        } else {
            n.value
        })
    }

    /// Amount in `0.0..=1.0`: `10%` and `10` mean a tenth, `0.1` too
    fn fraction(&self, index: usize) -> Result<f64, EvalError> {
        let n = self.number(index)?;
        Ok(if n.unit == "%" || n.value > 1.0 {
            n.value / 100.0
        } else {
            n.value
        })
    }

    fn adjust_hsl(
        &self,
        adjust: impl Fn((f64, f64, f64), f64) -> (f64, f64, f64),
    ) -> Result<Value, EvalError> {
        self.arity(2, 2)?;
        let color = self.color(0)?;
        let amount = self.fraction(1)?;
        let (h, s, l) = adjust(color.to_hsl(), amount);
        Ok(Value::Color(Color::from_hsla(h, s, l, color.alpha())))
    }

    fn map_number(&self, f: impl Fn(f64) -> f64) -> Result<Value, EvalError> {
        self.arity(1, 1)?;
        let n = self.number(0)?;
        Ok(Value::number(f(n.value), n.unit.clone()))
    }
}
