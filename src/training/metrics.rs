//! Training metrics for monitoring adversarial progress
//!
//! Records the four scalar losses per optimization step and persists the
//! history as CSV for external monitoring of the loss curves.

/// Metrics collected during training, one entry per optimization step
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Step numbers, monotonically increasing
    pub steps: Vec<i64>,
    /// Discriminator loss on real pairs
    pub d_real: Vec<f64>,
    /// Discriminator loss on synthesized pairs
    pub d_fake: Vec<f64>,
    /// Total discriminator loss
    pub d_loss: Vec<f64>,
    /// Generator loss (adversarial + reconstruction)
    pub g_loss: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one optimization step.
    pub fn record_step(&mut self, step: i64, d_real: f64, d_fake: f64, g_loss: f64) {
        self.steps.push(step);
        self.d_real.push(d_real);
        self.d_fake.push(d_fake);
        self.d_loss.push(d_real + d_fake);
        self.g_loss.push(g_loss);
    }

    /// Number of recorded steps.
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Latest discriminator loss.
    pub fn latest_d_loss(&self) -> Option<f64> {
        self.d_loss.last().copied()
    }

    /// Latest generator loss.
    pub fn latest_g_loss(&self) -> Option<f64> {
        self.g_loss.last().copied()
    }

    /// Moving average of the discriminator loss over the last `window` steps.
    pub fn d_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.d_loss, window)
    }

    /// Moving average of the generator loss over the last `window` steps.
    pub fn g_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.g_loss, window)
    }

    /// Heuristic collapse check: the discriminator wins outright while the
    /// generator's loss diverges.
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_steps() < window {
            return false;
        }
        self.d_loss_ma(window) < 0.1 && self.g_loss_ma(window) > 100.0
    }

    /// Save the full step history to a CSV file.
    pub fn save_csv(&self, path: &str) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["step", "d_loss_real", "d_loss_fake", "d_loss", "g_loss"])?;

        for i in 0..self.num_steps() {
            writer.write_record([
                self.steps[i].to_string(),
                self.d_real[i].to_string(),
                self.d_fake[i].to_string(),
                self.d_loss[i].to_string(),
                self.g_loss[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load a step history from a CSV file.
    pub fn load_csv(path: &str) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            metrics.steps.push(record[0].parse()?);
            metrics.d_real.push(record[1].parse()?);
            metrics.d_fake.push(record[2].parse()?);
            metrics.d_loss.push(record[3].parse()?);
            metrics.g_loss.push(record[4].parse()?);
        }

        Ok(metrics)
    }
}

/// Average of the last `window` values.
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_step_sums_d_loss() {
        let mut metrics = TrainingMetrics::new();
        metrics.record_step(1, 0.4, 0.6, 12.0);
        metrics.record_step(2, 0.3, 0.5, 11.0);

        assert_eq!(metrics.num_steps(), 2);
        assert_eq!(metrics.latest_d_loss(), Some(0.8));
        assert_eq!(metrics.latest_g_loss(), Some(11.0));
    }

    #[test]
    fn test_moving_average_window() {
        let mut metrics = TrainingMetrics::new();
        for step in 1..=4 {
            metrics.record_step(step, 0.0, step as f64, 0.0);
        }
        // d_loss history: 1, 2, 3, 4
        assert_eq!(metrics.d_loss_ma(2), 3.5);
        assert_eq!(metrics.d_loss_ma(10), 2.5);
    }

    #[test]
    fn test_csv_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("losses.csv");
        let path = path.to_str().unwrap();

        let mut metrics = TrainingMetrics::new();
        metrics.record_step(1, 0.25, 0.75, 10.5);
        metrics.record_step(2, 0.5, 0.5, 9.0);
        metrics.save_csv(path).unwrap();

        let loaded = TrainingMetrics::load_csv(path).unwrap();
        assert_eq!(loaded.steps, vec![1, 2]);
        assert_eq!(loaded.d_loss, vec![1.0, 1.0]);
        assert_eq!(loaded.g_loss, vec![10.5, 9.0]);
    }

    #[test]
    fn test_mode_collapse_detection() {
        let mut metrics = TrainingMetrics::new();
        for step in 1..=10 {
            metrics.record_step(step, 0.01, 0.01, 150.0);
        }
        assert!(metrics.check_mode_collapse(10));

        let mut healthy = TrainingMetrics::new();
        for step in 1..=10 {
            healthy.record_step(step, 0.6, 0.7, 20.0);
        }
        assert!(!healthy.check_mode_collapse(10));
    }
}
