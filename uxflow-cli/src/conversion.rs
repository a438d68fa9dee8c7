//! Built-in currency conversion program.
//!
//! Converts an amount at a rate drawn uniformly between two bounds, so the
//! result is an uncertain value the service can plot.

use anyhow::{bail, Result};
use uxflow::core::{Language, SourceArtifact};

const PROGRAM: &str = r#"#include <stdio.h>
#include <stdlib.h>
#include <uxhw.h>

int main(int argc, char *argv[])
{
	double amount;
	double minConversionRate;
	double maxConversionRate;
	double conversionRate;
	double convertedAmount;

	if (argc < 4) {
		fprintf(stderr, "Usage: amount minConversion maxConversion\n");
		return 1;
	}

	amount = atof(argv[1]);
	minConversionRate = atof(argv[2]);
	maxConversionRate = atof(argv[3]);

	conversionRate = UxHwDoubleUniformDist(minConversionRate, maxConversionRate);
	convertedAmount = amount * conversionRate;

	printf("%lf\n", convertedAmount);
	return 0;
}
"#;

/// Inputs of the conversion program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Conversion {
    /// Rejects a rate range the uniform distribution cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if !(self.amount.is_finite() && self.min_rate.is_finite() && self.max_rate.is_finite()) {
            bail!("amount and rates must be finite numbers");
        }
        if self.max_rate <= self.min_rate {
            bail!(
                "max rate ({}) must be greater than min rate ({})",
                self.max_rate,
                self.min_rate
            );
        }
        Ok(())
    }

    /// Program arguments: `"{amount} {min} {max}"`.
    pub fn arguments(&self) -> String {
        format!("{} {} {}", self.amount, self.min_rate, self.max_rate)
    }

    pub fn into_artifact(self) -> Result<SourceArtifact> {
        self.validate()?;
        Ok(SourceArtifact::new(PROGRAM, Language::C).with_arguments(self.arguments()))
    }
}
