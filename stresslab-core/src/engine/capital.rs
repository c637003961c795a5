//! Capital roll-forward.

/// Capital and CET1 ratio per projected quarter.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalPath {
    pub capital: Vec<f64>,
    pub cet1_ratio: Vec<f64>,
}

/// `capital[0] = start_ratio × rwa[0]`, then each later quarter's expected
/// loss is written off: `capital[q] = capital[q−1] − el[q]`.
///
/// The first quarter's loss is not deducted; the opening capital is set on
/// that quarter's RWA. Ratios are `capital / rwa`; callers reject zero RWA.
pub fn roll_forward(el: &[f64], rwa: &[f64], start_ratio: f64) -> CapitalPath {
    debug_assert_eq!(el.len(), rwa.len());
    let mut capital = Vec::with_capacity(el.len());
    for loss in el {
        let value = match capital.last() {
            None => start_ratio * rwa[0],
            Some(prev) => prev - loss,
        };
        capital.push(value);
    }
    let cet1_ratio = capital.iter().zip(rwa).map(|(c, r)| c / r).collect();
    CapitalPath {
        capital,
        cet1_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn first_quarter_is_opening_capital() {
        let path = roll_forward(&[5.0, 1.0, 2.0], &[100.0, 100.0, 50.0], 0.12);
        assert_relative_eq!(path.capital[0], 12.0);
        assert_relative_eq!(path.capital[1], 11.0);
        assert_relative_eq!(path.capital[2], 9.0);
        assert_relative_eq!(path.cet1_ratio[2], 9.0 / 50.0);
    }

    #[test]
    fn empty_input_yields_empty_path() {
        let path = roll_forward(&[], &[], 0.12);
        assert!(path.capital.is_empty());
        assert!(path.cet1_ratio.is_empty());
    }

    proptest! {
        #[test]
        fn capital_recurrence_holds(
            rows in prop::collection::vec((0.0f64..1e3, 1.0f64..1e6), 1..20),
            ratio in 0.01f64..0.5,
        ) {
            let (el, rwa): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
            let path = roll_forward(&el, &rwa, ratio);

            prop_assert!((path.capital[0] - ratio * rwa[0]).abs() <= 1e-9 * rwa[0]);
            for q in 1..el.len() {
                let expected = path.capital[q - 1] - el[q];
                prop_assert!((path.capital[q] - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
            for q in 0..el.len() {
                prop_assert!((path.cet1_ratio[q] - path.capital[q] / rwa[q]).abs() <= 1e-12);
            }
        }
    }
}
