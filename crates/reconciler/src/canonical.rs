//! Canonical field-name normalization.

const CANONICAL_FIELDS: [&str; 9] = [
    "grossPotentialRent",
    "effectiveGrossIncome",
    "netOperatingIncome",
    "vacancyRate",
    "operatingExpenses",
    "totalUnits",
    "totalSqft",
    "purchasePrice",
    "capRate",
];

/// snake_case / camelCase / common abbreviation -> canonical field name.
fn aliases(canonical: &str) -> &'static [&'static str] {
    match canonical {
        "grossPotentialRent" => &["gross_potential_rent", "grosspotentialrent", "gpr"],
        "effectiveGrossIncome" => &["effective_gross_income", "effectivegrossincome", "egi"],
        "netOperatingIncome" => &["net_operating_income", "netoperatingincome", "noi"],
        "vacancyRate" => &["vacancy_rate", "vacancyrate", "vacancy"],
        "operatingExpenses" => &["operating_expenses", "operatingexpenses", "opex"],
        "totalUnits" => &["total_units", "totalunits", "units", "unit_count"],
        "totalSqft" => &["total_sqft", "totalsqft", "sqft", "square_feet", "squarefeet"],
        "purchasePrice" => &["purchase_price", "purchaseprice", "price"],
        "capRate" => &["cap_rate", "caprate"],
        _ => &[],
    }
}

/// Normalize an arbitrary field-name spelling into the canonical vocabulary,
/// or `None` if it isn't a recognized financial field.
pub fn normalize_field(raw: &str) -> Option<&'static str> {
    let lower = raw.trim().to_lowercase();
    for canonical in CANONICAL_FIELDS {
        if canonical.to_lowercase() == lower {
            return Some(canonical);
        }
        if aliases(canonical).iter().any(|alias| *alias == lower) {
            return Some(canonical);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_map_to_canonical() {
        assert_eq!(normalize_field("noi"), Some("netOperatingIncome"));
        assert_eq!(normalize_field("NOI"), Some("netOperatingIncome"));
        assert_eq!(normalize_field("gpr"), Some("grossPotentialRent"));
        assert_eq!(normalize_field("cap_rate"), Some("capRate"));
    }

    #[test]
    fn camel_case_passes_through() {
        assert_eq!(normalize_field("netOperatingIncome"), Some("netOperatingIncome"));
    }

    #[test]
    fn unknown_field_is_none() {
        assert_eq!(normalize_field("favorite_color"), None);
    }
}
