use super::types::TaxConfig;

/// One row per fiscal year. The first row is the fallback for years the
/// table does not know.
static TAX_CONFIGS: [TaxConfig; 1] = [TaxConfig {
    year: 2025,
    cap75_amount: 1000.0,
    cap20_rate: 0.2,
    rate75: 0.75,
    rate66: 0.66,
}];

pub fn tax_configs() -> &'static [TaxConfig] {
    &TAX_CONFIGS
}

pub fn default_tax_config() -> TaxConfig {
    TAX_CONFIGS[0]
}

// Unknown years silently fall back to the default row. Kept as-is pending a
// product decision on whether a missing year should be surfaced.
pub fn resolve_tax_config(year: i32) -> TaxConfig {
    TAX_CONFIGS
        .iter()
        .find(|config| config.year == year)
        .copied()
        .unwrap_or_else(default_tax_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_year_resolves_to_its_row() {
        let config = resolve_tax_config(2025);
        assert_eq!(config.year, 2025);
        assert_eq!(config.cap75_amount, 1000.0);
        assert_eq!(config.cap20_rate, 0.2);
        assert_eq!(config.rate75, 0.75);
        assert_eq!(config.rate66, 0.66);
    }

    #[test]
    fn unknown_year_falls_back_to_default_row() {
        assert_eq!(resolve_tax_config(1999), default_tax_config());
        assert_eq!(resolve_tax_config(0), default_tax_config());
    }

    #[test]
    fn table_has_one_row_per_year() {
        let configs = tax_configs();
        for (i, a) in configs.iter().enumerate() {
            for b in &configs[i + 1..] {
                assert_ne!(a.year, b.year);
            }
        }
    }
}
