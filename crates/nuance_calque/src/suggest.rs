//! Variable suggestions for literal property values.
//!
//! A property written as a literal (`color: #fb0`) may be better expressed
//! through a variable already in scope. Color literals are matched by
//! perceptual distance, anything else by value equality.

use nuance_teinte::Color;
use nuance_trousse::{CompactString, FxIndexMap};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::{AnalysisContext, WrapperId};

/// A candidate variable for a literal value.
///
/// Serialized as `[name, raw, value]`, with the distance appended in color
/// mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub name: CompactString,
    pub raw: CompactString,
    /// Evaluated value of the variable
    pub value: String,
    /// Color distance to the literal; `None` for exact matches
    pub distance: Option<f64>,
}

impl Serialize for Suggestion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.distance.is_some() { 4 } else { 3 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.name)?;
        seq.serialize_element(&self.raw)?;
        seq.serialize_element(&self.value)?;
        if let Some(distance) = self.distance {
            seq.serialize_element(&distance)?;
        }
        seq.end()
    }
}

/// Weighted Euclidean distance between two colors on rounded 0-255
/// channels (the "redmean" approximation). Alpha is ignored.
pub fn color_distance(a: &Color, b: &Color) -> f64 {
    let (r1, g1, b1) = (a.red() as i64, a.green() as i64, a.blue() as i64);
    let (r2, g2, b2) = (b.red() as i64, b.green() as i64, b.blue() as i64);
    let rmean = (r1 + r2) as f64 / 2.0;
    let (dr, dg, db) = ((r1 - r2) as f64, g1 - g2, (b1 - b2) as f64);

    let red = ((512.0 + rmean) * dr * dr) as i64 >> 8;
    let green = 4 * dg * dg;
    let blue = ((767.0 - rmean) * db * db) as i64 >> 8;
    ((red + green + blue) as f64).sqrt()
}

/// Suggestions for every source property with a literal value
pub fn suggest(cx: &AnalysisContext<'_>) -> FxIndexMap<WrapperId, Vec<Suggestion>> {
    let mut out = FxIndexMap::default();

    for node in cx.source.root().list() {
        if !node.is_property() {
            continue;
        }
        let Some(literal) = node.value().map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        let Some(result) = cx.lookup(node) else {
            continue;
        };

        let (ctx, listed) = cx.visible_variables(result);
        let own_name = node.name();
        let candidates = listed
            .into_iter()
            .filter(|(name, _)| name.as_str() != own_name)
            .filter_map(|(name, raw)| match ctx.evaluate_variable(&name) {
                Ok(value) => Some((name, raw, value)),
                Err(err) => {
                    tracing::trace!(node = %node.id(), variable = %name, %err, "suggestion candidate skipped");
                    None
                }
            });

        let suggestions: Vec<Suggestion> = match Color::parse(literal) {
            Some(target) => {
                let mut found: Vec<Suggestion> = candidates
                    .filter_map(|(name, raw, value)| {
                        let distance = color_distance(&target, &value.as_color()?);
                        (distance <= cx.options.max_color_distance).then(|| Suggestion {
                            name,
                            raw,
                            value: value.to_string(),
                            distance: Some(distance),
                        })
                    })
                    .collect();
                found.sort_by(|a, b| {
                    a.distance
                        .unwrap_or_default()
                        .total_cmp(&b.distance.unwrap_or_default())
                });
                found
            }
            None => candidates
                .filter(|(_, _, value)| value.loose_eq(literal))
                .map(|(name, raw, value)| Suggestion {
                    name,
                    raw,
                    value: value.to_string(),
                    distance: None,
                })
                .collect(),
        };

        if !suggestions.is_empty() {
            out.insert(node.id(), suggestions);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hex(text: &str) -> Color {
        Color::parse(text).unwrap()
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance(&hex("#fc0"), &hex("#fc0")), 0.0);
        assert_eq!(color_distance(&hex("#fc0"), &hex("#fb0")), 34.0);
        assert!(color_distance(&hex("#000"), &hex("#fff")) > 700.0);
    }

    #[test]
    fn test_suggestion_serialization() {
        let color = Suggestion {
            name: "@c1".into(),
            raw: "#fc0".into(),
            value: "#ffcc00".into(),
            distance: Some(0.0),
        };
        let exact = Suggestion {
            distance: None,
            ..color.clone()
        };
        insta::assert_snapshot!(
            serde_json::to_string(&[color, exact]).unwrap(),
            @r##"[["@c1","#fc0","#ffcc00",0.0],["@c1","#fc0","#ffcc00"]]"##
        );
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(
            a in any::<(u8, u8, u8)>(),
            b in any::<(u8, u8, u8)>(),
        ) {
            let ca = Color::rgb(a.0 as f64, a.1 as f64, a.2 as f64);
            let cb = Color::rgb(b.0 as f64, b.1 as f64, b.2 as f64);
            prop_assert_eq!(color_distance(&ca, &ca), 0.0);
            prop_assert_eq!(color_distance(&ca, &cb), color_distance(&cb, &ca));
            prop_assert!(color_distance(&ca, &cb) >= 0.0);
        }
    }
}
