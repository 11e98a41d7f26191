//! Fixed body-measurement dataset, query points and feature standardization

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Number of features per sample (weight, height)
pub const N_FEATURES: usize = 2;

/// Training weights in kilograms, paired index-wise with [`HEIGHTS_CM`]
pub const WEIGHTS_KG: [f64; 10] = [45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0, 90.0];

/// Training heights in centimeters
pub const HEIGHTS_CM: [f64; 10] = [
    150.0, 155.0, 160.0, 162.0, 165.0, 170.0, 172.0, 175.0, 178.0, 180.0,
];

/// Accepted weight range for a query, in kilograms
pub const WEIGHT_RANGE: (f64, f64) = (30.0, 150.0);

/// Accepted height range for a query, in centimeters
pub const HEIGHT_RANGE: (f64, f64) = (100.0, 220.0);

pub const DEFAULT_WEIGHT_KG: f64 = 70.0;
pub const DEFAULT_HEIGHT_CM: f64 = 170.0;

/// One (weight, height) measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub weight_kg: f64,
    pub height_cm: f64,
}

impl Sample {
    pub fn new(weight_kg: f64, height_cm: f64) -> Self {
        Self {
            weight_kg,
            height_cm,
        }
    }

    /// Feature vector in dataset column order
    pub fn features(&self) -> [f64; N_FEATURES] {
        [self.weight_kg, self.height_cm]
    }
}

/// The ten training samples in their fixed order
pub fn fixed_samples() -> Vec<Sample> {
    WEIGHTS_KG
        .iter()
        .zip(HEIGHTS_CM.iter())
        .map(|(&w, &h)| Sample::new(w, h))
        .collect()
}

/// The fixed dataset as a (10, 2) matrix, one row per sample
pub fn fixed_dataset() -> Array2<f64> {
    Array2::from_shape_fn((WEIGHTS_KG.len(), N_FEATURES), |(row, col)| match col {
        0 => WEIGHTS_KG[row],
        _ => HEIGHTS_CM[row],
    })
}

/// A user-supplied sample, validated against the accepted input ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint(Sample);

impl QueryPoint {
    pub fn new(weight_kg: f64, height_cm: f64) -> crate::Result<Self> {
        check_range("weight", weight_kg, WEIGHT_RANGE)?;
        check_range("height", height_cm, HEIGHT_RANGE)?;
        Ok(Self(Sample::new(weight_kg, height_cm)))
    }

    pub fn sample(&self) -> Sample {
        self.0
    }

    pub fn weight_kg(&self) -> f64 {
        self.0.weight_kg
    }

    pub fn height_cm(&self) -> f64 {
        self.0.height_cm
    }

    /// Body-mass index, rounded to one decimal
    pub fn bmi(&self) -> f64 {
        bmi(self.0.weight_kg, self.0.height_cm)
    }
}

impl Default for QueryPoint {
    fn default() -> Self {
        Self(Sample::new(DEFAULT_WEIGHT_KG, DEFAULT_HEIGHT_CM))
    }
}

fn check_range(name: &str, value: f64, (lo, hi): (f64, f64)) -> crate::Result<()> {
    if !value.is_finite() || value < lo || value > hi {
        anyhow::bail!("{} must be between {} and {}, got {}", name, lo, hi, value);
    }
    Ok(())
}

/// Weight over height in meters squared, rounded to one decimal place
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    let raw = weight_kg / (height_m * height_m);
    (raw * 10.0).round() / 10.0
}

/// Per-feature standardizer: subtracts the training mean and divides by the
/// training (population) standard deviation.
///
/// Parameters are fixed by [`StandardScaler::fit`]; there is no partial fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl StandardScaler {
    /// Fit on a (n_samples, n_features) matrix
    pub fn fit(records: &Array2<f64>) -> crate::Result<Self> {
        if records.nrows() == 0 {
            anyhow::bail!("Cannot fit a scaler on an empty dataset");
        }

        let mean = records
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Failed to compute feature means"))?;
        // Constant features keep unit scale so transform stays finite
        let std = records
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 { 1.0 } else { s });

        Ok(Self { mean, std })
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check parameters read back from storage: one finite mean and one
    /// finite, strictly positive scale per feature
    pub fn validate(&self) -> crate::Result<()> {
        if self.mean.len() != self.std.len() {
            anyhow::bail!(
                "mean has {} entries but std has {}",
                self.mean.len(),
                self.std.len()
            );
        }
        if self.mean.is_empty() {
            anyhow::bail!("scaler has no features");
        }
        if let Some(m) = self.mean.iter().find(|m| !m.is_finite()) {
            anyhow::bail!("non-finite mean {}", m);
        }
        if let Some(s) = self.std.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            anyhow::bail!("std must be finite and positive, found {}", s);
        }
        Ok(())
    }

    fn check_width(&self, width: usize) -> crate::Result<()> {
        if self.std.len() != self.mean.len() {
            anyhow::bail!("Scaler parameters are inconsistent");
        }
        if width != self.n_features() {
            anyhow::bail!("Expected {} features, got {}", self.n_features(), width);
        }
        Ok(())
    }

    /// Standardize every row of `records`
    pub fn transform(&self, records: &Array2<f64>) -> crate::Result<Array2<f64>> {
        self.check_width(records.ncols())?;
        Ok((records - &self.mean) / &self.std)
    }

    /// Standardize a single sample
    pub fn transform_sample(&self, sample: &Sample) -> crate::Result<Array1<f64>> {
        let row = Array1::from(sample.features().to_vec());
        self.transform_row(row.view())
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> crate::Result<Array1<f64>> {
        self.check_width(row.len())?;
        Ok((&row - &self.mean) / &self.std)
    }

    /// Map standardized rows back to raw units
    pub fn inverse_transform(&self, scaled: &Array2<f64>) -> crate::Result<Array2<f64>> {
        self.check_width(scaled.ncols())?;
        Ok(scaled * &self.std + &self.mean)
    }
}
