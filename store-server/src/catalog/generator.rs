//! Attribute Combinator
//!
//! Expands a compact set of option axes into concrete variant drafts.
//! Pure CPU work: no I/O, deterministic for identical input, bounded by
//! the configured combination maximum.

use serde::{Deserialize, Serialize};
use shared::models::{Axis, VariantAttributes, VariantCreate};
use std::collections::BTreeMap;
use thiserror::Error;

/// Price/stock override for the combinations matching a predicate.
///
/// The predicate is an explicit axis-name → expected-value map; a
/// combination matches when every pair holds. An empty map matches every
/// combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOverride {
    #[serde(rename = "match", default)]
    pub when: BTreeMap<String, String>,
    /// Minor currency units
    pub price: Option<i64>,
    pub original_price: Option<i64>,
    pub stock: Option<i64>,
}

/// Policy for generation requests that carry zero axes.
///
/// The ambiguity is resolved by the caller, never silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyAxes {
    /// Zero axes is an input error
    Reject,
    /// Produce one default variant carrying the base price/stock
    SingleDefault,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("at least one option axis is required")]
    NoAxes,

    #[error("axis name cannot be empty")]
    EmptyAxisName,

    #[error("duplicate axis '{0}'")]
    DuplicateAxis(String),

    #[error("axis '{0}' has no values")]
    EmptyAxis(String),

    #[error("{count} combinations exceed the maximum of {max}")]
    TooManyCombinations { count: usize, max: usize },
}

/// Everything the combinator needs; assembled by the caller from the
/// product payload.
pub struct GenerationInput<'a> {
    pub product_name: &'a str,
    /// Base SKU when the admin supplied one, else the product slug
    pub sku_prefix: &'a str,
    /// Minor currency units
    pub base_price: i64,
    pub base_stock: i64,
    /// Axes in declaration order — combination order follows it
    pub axes: &'a [Axis],
    /// Checked in declaration order; first full match wins
    pub overrides: &'a [VariantOverride],
    /// Axis value → image URL
    pub image_map: &'a BTreeMap<String, String>,
    /// Usually the product main image
    pub fallback_image: Option<&'a str>,
}

/// Compute the Cartesian product of the axes' value sets and produce one
/// variant draft per combination.
pub fn generate_variants(
    input: &GenerationInput<'_>,
    on_empty: EmptyAxes,
    max_variants: usize,
) -> Result<Vec<VariantCreate>, GenerateError> {
    let axes = normalize_axes(input.axes)?;

    if axes.is_empty() {
        return match on_empty {
            EmptyAxes::Reject => Err(GenerateError::NoAxes),
            EmptyAxes::SingleDefault => Ok(vec![VariantCreate {
                name: input.product_name.to_string(),
                sku: sanitize_sku(input.sku_prefix),
                price: input.base_price,
                original_price: None,
                stock: input.base_stock,
                attributes: VariantAttributes::new(),
                image: input.fallback_image.map(str::to_string),
                description: None,
            }]),
        };
    }

    // Bound check before any combination is materialized
    let mut count: usize = 1;
    for axis in &axes {
        count = count
            .checked_mul(axis.values.len())
            .ok_or(GenerateError::TooManyCombinations {
                count: usize::MAX,
                max: max_variants,
            })?;
    }
    if count > max_variants {
        return Err(GenerateError::TooManyCombinations {
            count,
            max: max_variants,
        });
    }

    // Cartesian product, preserving axis declaration order
    let mut combinations: Vec<Vec<&str>> = vec![Vec::new()];
    for axis in &axes {
        combinations = combinations
            .iter()
            .flat_map(|combo| {
                axis.values.iter().map(move |value| {
                    let mut next = combo.clone();
                    next.push(value.as_str());
                    next
                })
            })
            .collect();
    }

    let variants = combinations
        .into_iter()
        .map(|combo| {
            let attributes: VariantAttributes = axes
                .iter()
                .zip(&combo)
                .map(|(axis, value)| (axis.name.clone(), value.to_string()))
                .collect();

            let name = format!("{} - {}", input.product_name, combo.join(" / "));
            let sku = sanitize_sku(&format!("{}-{}", input.sku_prefix, combo.join("-")));

            // First override (declaration order) fully satisfied by this combination
            let matched = input.overrides.iter().find(|o| {
                o.when
                    .iter()
                    .all(|(axis, expected)| attributes.get(axis) == Some(expected))
            });

            // First axis value (declaration order) carrying an image entry
            let image = combo
                .iter()
                .find_map(|value| input.image_map.get(*value))
                .map(String::clone)
                .or_else(|| input.fallback_image.map(str::to_string));

            VariantCreate {
                name,
                sku,
                price: matched.and_then(|o| o.price).unwrap_or(input.base_price),
                original_price: matched.and_then(|o| o.original_price),
                stock: matched.and_then(|o| o.stock).unwrap_or(input.base_stock),
                attributes,
                image,
                description: None,
            }
        })
        .collect();

    Ok(variants)
}

/// Validate axis names and de-duplicate values, preserving first
/// occurrence order. Blank values are dropped.
fn normalize_axes(axes: &[Axis]) -> Result<Vec<Axis>, GenerateError> {
    let mut seen_names = std::collections::HashSet::new();
    let mut normalized = Vec::with_capacity(axes.len());

    for axis in axes {
        let name = axis.name.trim();
        if name.is_empty() {
            return Err(GenerateError::EmptyAxisName);
        }
        if !seen_names.insert(name.to_string()) {
            return Err(GenerateError::DuplicateAxis(name.to_string()));
        }

        let mut values = Vec::with_capacity(axis.values.len());
        for value in &axis.values {
            let value = value.trim();
            if !value.is_empty() && !values.iter().any(|v: &String| v == value) {
                values.push(value.to_string());
            }
        }
        if values.is_empty() {
            return Err(GenerateError::EmptyAxis(name.to_string()));
        }

        normalized.push(Axis {
            name: name.to_string(),
            values,
        });
    }

    Ok(normalized)
}

/// Uppercase and strip everything outside `[A-Z0-9-]`
fn sanitize_sku(raw: &str) -> String {
    raw.to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(name: &str, values: &[&str]) -> Axis {
        Axis {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn input<'a>(
        axes: &'a [Axis],
        overrides: &'a [VariantOverride],
        image_map: &'a BTreeMap<String, String>,
    ) -> GenerationInput<'a> {
        GenerationInput {
            product_name: "Protein Powder",
            sku_prefix: "protein-powder",
            base_price: 999,
            base_stock: 50,
            axes,
            overrides,
            image_map,
            fallback_image: Some("main.jpg"),
        }
    }

    #[test]
    fn test_emits_full_cartesian_product() {
        let axes = [
            axis("Flavor", &["Chocolate", "Vanilla"]),
            axis("Size", &["500g", "1kg"]),
        ];
        let images = BTreeMap::new();
        let variants = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();

        assert_eq!(variants.len(), 4);

        // Pairwise-distinct combinations, unique SKUs
        let mut skus: Vec<&str> = variants.iter().map(|v| v.sku.as_str()).collect();
        skus.sort();
        skus.dedup();
        assert_eq!(skus.len(), 4);

        let mut combos: Vec<String> = variants
            .iter()
            .map(|v| format!("{:?}", v.attributes))
            .collect();
        combos.sort();
        combos.dedup();
        assert_eq!(combos.len(), 4);

        // Axis declaration order drives both the name and the SKU
        assert_eq!(variants[0].name, "Protein Powder - Chocolate / 500g");
        assert_eq!(variants[0].sku, "PROTEIN-POWDER-CHOCOLATE-500G");
    }

    #[test]
    fn test_first_matching_override_wins() {
        let axes = [
            axis("Flavor", &["Chocolate", "Vanilla"]),
            axis("Size", &["500g", "1kg"]),
        ];
        let overrides = [
            VariantOverride {
                when: [("Flavor".into(), "Vanilla".into()), ("Size".into(), "1kg".into())]
                    .into_iter()
                    .collect(),
                price: Some(1199),
                original_price: None,
                stock: None,
            },
            VariantOverride {
                when: [("Flavor".into(), "Vanilla".into())].into_iter().collect(),
                price: Some(1099),
                original_price: None,
                stock: Some(10),
            },
        ];
        let images = BTreeMap::new();
        let variants =
            generate_variants(&input(&axes, &overrides, &images), EmptyAxes::Reject, 256).unwrap();

        let by_combo = |f: &str, s: &str| {
            variants
                .iter()
                .find(|v| v.attributes["Flavor"] == f && v.attributes["Size"] == s)
                .unwrap()
        };

        // Vanilla/1kg hits the first override, not the broader second one
        assert_eq!(by_combo("Vanilla", "1kg").price, 1199);
        assert_eq!(by_combo("Vanilla", "1kg").stock, 50);
        // Vanilla/500g only satisfies the second override
        assert_eq!(by_combo("Vanilla", "500g").price, 1099);
        assert_eq!(by_combo("Vanilla", "500g").stock, 10);
        // Chocolate rows fall back to base values
        assert_eq!(by_combo("Chocolate", "1kg").price, 999);
        assert_eq!(by_combo("Chocolate", "500g").stock, 50);
    }

    #[test]
    fn test_empty_match_override_applies_everywhere() {
        let axes = [axis("Size", &["S", "M"])];
        let overrides = [VariantOverride {
            when: BTreeMap::new(),
            price: Some(500),
            original_price: Some(700),
            stock: None,
        }];
        let images = BTreeMap::new();
        let variants =
            generate_variants(&input(&axes, &overrides, &images), EmptyAxes::Reject, 256).unwrap();
        assert!(variants.iter().all(|v| v.price == 500));
        assert!(variants.iter().all(|v| v.original_price == Some(700)));
    }

    #[test]
    fn test_image_from_first_axis_value_in_map() {
        let axes = [
            axis("Flavor", &["Chocolate", "Vanilla"]),
            axis("Size", &["500g"]),
        ];
        let images: BTreeMap<String, String> = [
            ("Vanilla".to_string(), "vanilla.jpg".to_string()),
            ("500g".to_string(), "bag.jpg".to_string()),
        ]
        .into_iter()
        .collect();
        let variants = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();

        let vanilla = variants
            .iter()
            .find(|v| v.attributes["Flavor"] == "Vanilla")
            .unwrap();
        let chocolate = variants
            .iter()
            .find(|v| v.attributes["Flavor"] == "Chocolate")
            .unwrap();

        // Flavor is declared before Size, so its mapping wins
        assert_eq!(vanilla.image.as_deref(), Some("vanilla.jpg"));
        // Chocolate has no mapping; Size's does
        assert_eq!(chocolate.image.as_deref(), Some("bag.jpg"));
    }

    #[test]
    fn test_duplicate_axis_values_collapse() {
        let axes = [axis("Size", &["S", "S", "M", " M "])];
        let images = BTreeMap::new();
        let variants = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();
        assert_eq!(variants.len(), 2);
    }

    #[test]
    fn test_zero_axes_policies() {
        let images = BTreeMap::new();
        assert_eq!(
            generate_variants(&input(&[], &[], &images), EmptyAxes::Reject, 256),
            Err(GenerateError::NoAxes)
        );

        let variants =
            generate_variants(&input(&[], &[], &images), EmptyAxes::SingleDefault, 256).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].sku, "PROTEIN-POWDER");
        assert_eq!(variants[0].price, 999);
        assert!(variants[0].attributes.is_empty());
    }

    #[test]
    fn test_combination_bound_rejected() {
        let axes = [axis("A", &["1", "2", "3"]), axis("B", &["1", "2", "3"])];
        let images = BTreeMap::new();
        assert_eq!(
            generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 8),
            Err(GenerateError::TooManyCombinations { count: 9, max: 8 })
        );
    }

    #[test]
    fn test_invalid_axes_rejected() {
        let images = BTreeMap::new();
        let dup = [axis("Size", &["S"]), axis("Size", &["M"])];
        assert_eq!(
            generate_variants(&input(&dup, &[], &images), EmptyAxes::Reject, 256),
            Err(GenerateError::DuplicateAxis("Size".into()))
        );

        let blank = [axis("Size", &["", "  "])];
        assert_eq!(
            generate_variants(&input(&blank, &[], &images), EmptyAxes::Reject, 256),
            Err(GenerateError::EmptyAxis("Size".into()))
        );
    }

    #[test]
    fn test_sku_strips_non_alphanumerics() {
        let axes = [axis("Pack", &["2 x 500g (box)"])];
        let images = BTreeMap::new();
        let variants = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();
        assert_eq!(variants[0].sku, "PROTEIN-POWDER-2X500GBOX");
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let axes = [
            axis("Flavor", &["Chocolate", "Vanilla"]),
            axis("Size", &["500g", "1kg"]),
        ];
        let images = BTreeMap::new();
        let a = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();
        let b = generate_variants(&input(&axes, &[], &images), EmptyAxes::Reject, 256).unwrap();
        assert_eq!(a, b);
    }
}
