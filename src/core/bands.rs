use serde::Serialize;

use super::config::{
    Assumptions, DEFAULT_ADDITIONAL_RATE, DEFAULT_BASIC_RATE, DEFAULT_BASIC_RATE_LIMIT,
    DEFAULT_HIGHER_RATE, DEFAULT_HIGHER_RATE_LIMIT, DEFAULT_PERSONAL_ALLOWANCE,
};
use super::error::{ModelError, ModelResult};

/// One marginal bracket: `[lower, upper)` taxed at `rate`. `upper == None`
/// marks the unbounded top band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBand {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate: f64,
}

/// Withdrawal of the zero-rate allowance above `threshold`, at
/// `withdrawal_rate` pounds of allowance per pound of income.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceTaper {
    pub threshold: f64,
    pub withdrawal_rate: f64,
}

/// Ordered marginal bands covering `[0, inf)` without gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSchedule {
    bands: Vec<TaxBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    taper: Option<AllowanceTaper>,
}

impl BandSchedule {
    pub fn new(bands: Vec<TaxBand>) -> ModelResult<Self> {
        validate_bands(&bands)?;
        Ok(Self { bands, taper: None })
    }

    pub fn with_taper(mut self, taper: AllowanceTaper) -> ModelResult<Self> {
        if !taper.threshold.is_finite() || taper.threshold < 0.0 {
            return Err(ModelError::InvalidParameters(
                "allowance taper threshold must be finite and >= 0".to_string(),
            ));
        }
        if !taper.withdrawal_rate.is_finite() || taper.withdrawal_rate <= 0.0 {
            return Err(ModelError::InvalidParameters(
                "allowance taper withdrawal rate must be finite and > 0".to_string(),
            ));
        }
        if self.bands[0].rate != 0.0 {
            return Err(ModelError::InvalidParameters(
                "allowance taper needs a zero-rate first band".to_string(),
            ));
        }
        self.taper = Some(taper);
        Ok(self)
    }

    pub fn bands(&self) -> &[TaxBand] {
        &self.bands
    }

    pub fn taper(&self) -> Option<AllowanceTaper> {
        self.taper
    }

    /// Width of the leading zero-rate band, or 0 when the schedule taxes
    /// from the first pound.
    pub fn personal_allowance(&self) -> f64 {
        let first = &self.bands[0];
        match (first.rate == 0.0, first.upper) {
            (true, Some(upper)) => upper,
            _ => 0.0,
        }
    }

    /// Finite band edges in ascending order.
    pub fn thresholds(&self) -> Vec<f64> {
        self.bands.iter().filter_map(|b| b.upper).collect()
    }

    /// Same rates and taper, every finite bound multiplied by `factor`.
    /// Fails if a scaled bound leaves the finite, strictly increasing range.
    pub(crate) fn scaled(&self, factor: f64) -> ModelResult<Self> {
        let bands: Vec<TaxBand> = self
            .bands
            .iter()
            .map(|b| TaxBand {
                lower: b.lower * factor,
                upper: b.upper.map(|u| u * factor),
                rate: b.rate,
            })
            .collect();
        validate_bands(&bands)?;
        Ok(Self {
            bands,
            taper: self.taper,
        })
    }

    fn taper_reduction(&self, income: f64) -> f64 {
        match self.taper {
            Some(taper) if income > taper.threshold => ((income - taper.threshold)
                * taper.withdrawal_rate)
                .min(self.personal_allowance()),
            _ => 0.0,
        }
    }

    // Tapering the allowance by `r` slides every positive-rate band down by
    // `r`, which is the same as taxing `income + r` on the untapered bands.
    pub(crate) fn tax_unchecked(&self, income: f64) -> f64 {
        let taxed = income + self.taper_reduction(income);
        self.bands
            .iter()
            .take_while(|band| band.lower < taxed)
            .map(|band| {
                let top = band.upper.map_or(taxed, |upper| upper.min(taxed));
                (top - band.lower) * band.rate
            })
            .sum()
    }
}

fn validate_bands(bands: &[TaxBand]) -> ModelResult<()> {
    let Some(first) = bands.first() else {
        return Err(ModelError::InvalidParameters(
            "band schedule must contain at least one band".to_string(),
        ));
    };
    if first.lower != 0.0 {
        return Err(ModelError::InvalidParameters(
            "first band must start at 0".to_string(),
        ));
    }

    for (idx, band) in bands.iter().enumerate() {
        if !band.rate.is_finite() || !(0.0..=1.0).contains(&band.rate) {
            return Err(ModelError::InvalidParameters(format!(
                "band {idx} rate {} must be between 0 and 1",
                band.rate
            )));
        }

        let is_last = idx + 1 == bands.len();
        match (band.upper, is_last) {
            (None, true) => {}
            (None, false) => {
                return Err(ModelError::InvalidParameters(format!(
                    "only the last band may be unbounded (band {idx})"
                )));
            }
            (Some(_), true) => {
                return Err(ModelError::InvalidParameters(
                    "last band must be unbounded".to_string(),
                ));
            }
            (Some(upper), false) => {
                if !upper.is_finite() || upper <= band.lower {
                    return Err(ModelError::InvalidParameters(format!(
                        "band {idx} upper bound {upper} must exceed its lower bound {}",
                        band.lower
                    )));
                }
                if bands[idx + 1].lower != upper {
                    return Err(ModelError::InvalidParameters(format!(
                        "band {} must start where band {idx} ends ({upper})",
                        idx + 1
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn tax_owed(income: f64, schedule: &BandSchedule) -> ModelResult<f64> {
    if !income.is_finite() || income < 0.0 {
        return Err(ModelError::InvalidIncome(income));
    }
    Ok(schedule.tax_unchecked(income))
}

pub fn effective_rate(income: f64, schedule: &BandSchedule) -> ModelResult<f64> {
    let tax = tax_owed(income, schedule)?;
    if income > 0.0 {
        Ok(tax / income)
    } else {
        Ok(0.0)
    }
}

/// Base-year schedule built from the configured thresholds and rates.
pub fn base_schedule(assumptions: &Assumptions) -> ModelResult<BandSchedule> {
    let schedule = BandSchedule::new(uk_bands(
        assumptions.personal_allowance,
        assumptions.basic_rate_limit,
        assumptions.higher_rate_limit,
        [
            assumptions.basic_rate,
            assumptions.higher_rate,
            assumptions.additional_rate,
        ],
    ))?;
    if assumptions.allowance_taper {
        schedule.with_taper(AllowanceTaper {
            threshold: assumptions.taper_threshold,
            withdrawal_rate: 0.5,
        })
    } else {
        Ok(schedule)
    }
}

/// The default 2024/25 schedule.
pub fn get_base_schedule() -> BandSchedule {
    BandSchedule {
        bands: uk_bands(
            DEFAULT_PERSONAL_ALLOWANCE,
            DEFAULT_BASIC_RATE_LIMIT,
            DEFAULT_HIGHER_RATE_LIMIT,
            [
                DEFAULT_BASIC_RATE,
                DEFAULT_HIGHER_RATE,
                DEFAULT_ADDITIONAL_RATE,
            ],
        ),
        taper: None,
    }
}

fn uk_bands(
    personal_allowance: f64,
    basic_limit: f64,
    higher_limit: f64,
    [basic, higher, additional]: [f64; 3],
) -> Vec<TaxBand> {
    vec![
        TaxBand {
            lower: 0.0,
            upper: Some(personal_allowance),
            rate: 0.0,
        },
        TaxBand {
            lower: personal_allowance,
            upper: Some(basic_limit),
            rate: basic,
        },
        TaxBand {
            lower: basic_limit,
            upper: Some(higher_limit),
            rate: higher,
        },
        TaxBand {
            lower: higher_limit,
            upper: None,
            rate: additional,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn tapered_schedule() -> BandSchedule {
        let assumptions = Assumptions {
            allowance_taper: true,
            ..Assumptions::default()
        };
        base_schedule(&assumptions).expect("valid schedule")
    }

    #[test]
    fn default_base_schedule_matches_configured_constants() {
        let configured = base_schedule(&Assumptions::default()).expect("valid schedule");
        assert_eq!(configured, get_base_schedule());
        assert_eq!(configured.thresholds(), vec![12_570.0, 50_270.0, 125_140.0]);
        assert_eq!(configured.bands().last().and_then(|b| b.upper), None);
        assert_approx(configured.personal_allowance(), 12_570.0);
    }

    #[test]
    fn income_at_or_below_allowance_pays_nothing() {
        let schedule = get_base_schedule();
        assert_eq!(tax_owed(0.0, &schedule).unwrap(), 0.0);
        assert_eq!(tax_owed(10_000.0, &schedule).unwrap(), 0.0);
        assert_eq!(tax_owed(12_570.0, &schedule).unwrap(), 0.0);
    }

    #[test]
    fn basic_rate_applies_only_above_allowance() {
        let schedule = get_base_schedule();
        assert_approx(tax_owed(22_570.0, &schedule).unwrap(), 2_000.0);
    }

    #[test]
    fn higher_rate_applies_only_to_income_above_basic_limit() {
        let schedule = get_base_schedule();
        let expected = (50_270.0 - 12_570.0) * 0.20 + 10_000.0 * 0.40;
        assert_approx(tax_owed(60_270.0, &schedule).unwrap(), expected);
        assert_approx(tax_owed(60_000.0, &schedule).unwrap(), 11_432.0);
    }

    #[test]
    fn additional_rate_applies_above_higher_limit() {
        let schedule = get_base_schedule();
        let expected =
            37_700.0 * 0.20 + (125_140.0 - 50_270.0) * 0.40 + 20_000.0 * 0.45;
        assert_approx(tax_owed(145_140.0, &schedule).unwrap(), expected);
    }

    #[test]
    fn one_pound_over_threshold_is_taxed_at_higher_rate_only_on_that_pound() {
        let schedule = get_base_schedule();
        let at = tax_owed(50_270.0, &schedule).unwrap();
        let over = tax_owed(50_271.0, &schedule).unwrap();
        assert_approx(over - at, 0.40);
    }

    #[test]
    fn negative_or_nan_income_is_rejected() {
        let schedule = get_base_schedule();
        assert_eq!(
            tax_owed(-1.0, &schedule),
            Err(ModelError::InvalidIncome(-1.0))
        );
        assert!(matches!(
            tax_owed(f64::NAN, &schedule),
            Err(ModelError::InvalidIncome(_))
        ));
        assert!(effective_rate(-5.0, &schedule).is_err());
    }

    #[test]
    fn effective_rate_is_zero_for_zero_income() {
        let schedule = get_base_schedule();
        assert_eq!(effective_rate(0.0, &schedule).unwrap(), 0.0);
        assert_approx(effective_rate(22_570.0, &schedule).unwrap(), 2_000.0 / 22_570.0);
    }

    #[test]
    fn new_rejects_gaps_overlaps_and_bad_rates() {
        let gap = vec![
            TaxBand {
                lower: 0.0,
                upper: Some(10.0),
                rate: 0.0,
            },
            TaxBand {
                lower: 11.0,
                upper: None,
                rate: 0.2,
            },
        ];
        assert!(BandSchedule::new(gap).is_err());

        let not_from_zero = vec![TaxBand {
            lower: 5.0,
            upper: None,
            rate: 0.2,
        }];
        assert!(BandSchedule::new(not_from_zero).is_err());

        let bounded_top = vec![TaxBand {
            lower: 0.0,
            upper: Some(10.0),
            rate: 0.2,
        }];
        assert!(BandSchedule::new(bounded_top).is_err());

        let inverted = vec![
            TaxBand {
                lower: 0.0,
                upper: Some(0.0),
                rate: 0.0,
            },
            TaxBand {
                lower: 0.0,
                upper: None,
                rate: 0.2,
            },
        ];
        assert!(BandSchedule::new(inverted).is_err());

        let bad_rate = vec![TaxBand {
            lower: 0.0,
            upper: None,
            rate: 1.5,
        }];
        assert!(BandSchedule::new(bad_rate).is_err());

        assert!(BandSchedule::new(Vec::new()).is_err());
    }

    #[test]
    fn base_schedule_rejects_misordered_thresholds() {
        let assumptions = Assumptions {
            basic_rate_limit: 10_000.0,
            ..Assumptions::default()
        };
        assert!(matches!(
            base_schedule(&assumptions),
            Err(ModelError::InvalidParameters(_))
        ));
    }

    #[test]
    fn taper_withdraws_allowance_above_threshold() {
        let untapered = get_base_schedule();
        let tapered = tapered_schedule();

        assert_approx(
            tax_owed(100_000.0, &tapered).unwrap(),
            tax_owed(100_000.0, &untapered).unwrap(),
        );
        // 10k over the threshold removes 5k of allowance, taxed at 40%.
        assert_approx(
            tax_owed(110_000.0, &tapered).unwrap() - tax_owed(110_000.0, &untapered).unwrap(),
            5_000.0 * 0.40,
        );
    }

    #[test]
    fn taper_removes_allowance_exactly_once() {
        let tapered = tapered_schedule();
        let untapered = get_base_schedule();
        // Fully tapered: the whole allowance is taxed, but never more.
        for income in [125_140.0, 150_000.0, 500_000.0] {
            let extra = tax_owed(income, &tapered).unwrap() - tax_owed(income, &untapered).unwrap();
            assert!(extra <= 12_570.0 * 0.45 + EPS, "income {income}: extra {extra}");
            assert!(extra >= 12_570.0 * 0.40 - EPS, "income {income}: extra {extra}");
        }
        let zero_point = 100_000.0 + 2.0 * 12_570.0;
        let expected = 37_700.0 * 0.20 + (125_140.0 - 50_270.0) * 0.40 + 12_570.0 * 0.45;
        assert_approx(tax_owed(zero_point, &tapered).unwrap(), expected);
    }

    #[test]
    fn taper_requires_zero_rate_first_band() {
        let flat = BandSchedule::new(vec![TaxBand {
            lower: 0.0,
            upper: None,
            rate: 0.2,
        }])
        .expect("valid schedule");
        assert!(
            flat.with_taper(AllowanceTaper {
                threshold: 100_000.0,
                withdrawal_rate: 0.5,
            })
            .is_err()
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(256))]

        #[test]
        fn prop_below_allowance_is_untaxed(income in 0.0f64..12_570.0) {
            prop_assert!(tax_owed(income, &get_base_schedule()).unwrap() == 0.0);
        }

        #[test]
        fn prop_tax_is_monotone_in_income(
            a in 0.0f64..1_000_000.0,
            b in 0.0f64..1_000_000.0,
            taper in proptest::bool::ANY,
        ) {
            let schedule = if taper { tapered_schedule() } else { get_base_schedule() };
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tax_owed(lo, &schedule).unwrap() <= tax_owed(hi, &schedule).unwrap());
        }

        #[test]
        fn prop_tax_never_exceeds_income(income in 0.0f64..5_000_000.0) {
            let tax = tax_owed(income, &tapered_schedule()).unwrap();
            prop_assert!(tax >= 0.0 && tax <= income);
        }
    }

    #[test]
    fn tax_is_continuous_at_every_band_edge() {
        for schedule in [get_base_schedule(), tapered_schedule()] {
            let mut edges = schedule.thresholds();
            edges.push(100_000.0);
            edges.push(100_000.0 + 2.0 * 12_570.0);
            for edge in edges {
                let at = tax_owed(edge, &schedule).unwrap();
                let below = tax_owed(edge - 1e-6, &schedule).unwrap();
                assert!((at - below).abs() < 1e-5, "jump at {edge}: {below} -> {at}");
            }
        }
    }
}
