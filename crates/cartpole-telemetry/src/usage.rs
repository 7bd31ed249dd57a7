// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Smoothed load figure of the real-time loop.
//!
//! Every processed deadline reports how much of its interval was used. The
//! estimator averages those samples over half a second worth of ticks and
//! publishes the mean, so the figure is stable enough to display.

/// Aggregates per-tick load samples into a percentage.
#[derive(Debug, Clone, Default)]
pub struct UsageEstimator {
    frequency: u32,
    usage: f64,
    sum: f64,
    count: u32,
}

impl UsageEstimator {
    /// Creates an estimator for a loop ticking `frequency` times per second.
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            ..Default::default()
        }
    }

    /// Changes the tick frequency. Accumulated samples are kept.
    pub fn set_frequency(&mut self, frequency: u32) {
        self.frequency = frequency;
    }

    /// Forgets every sample and the published figure.
    pub fn clear(&mut self) {
        self.usage = 0.0;
        self.sum = 0.0;
        self.count = 0;
    }

    /// Number of samples averaged per published figure (at least one).
    pub fn window(&self) -> u32 {
        (self.frequency / 2).max(1)
    }

    /// Records one load sample (fraction of the interval, `1.0` = fully used).
    pub fn report(&mut self, sample: f64) {
        self.sum += sample;
        self.count += 1;

        if self.count >= self.window() {
            self.usage = self.sum / f64::from(self.count);
            self.sum = 0.0;
            self.count = 0;
            log::trace!("Loop usage updated: {:.1}%", self.usage());
        }
    }

    /// The last published mean, as a percentage.
    pub fn usage(&self) -> f64 {
        100.0 * self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn publishes_after_half_a_second_of_samples() {
        let mut estimator = UsageEstimator::new(10);
        for _ in 0..4 {
            estimator.report(0.5);
        }
        assert_eq!(estimator.usage(), 0.0);

        estimator.report(0.5);
        assert_relative_eq!(estimator.usage(), 50.0);
    }

    #[test]
    fn each_window_starts_fresh() {
        let mut estimator = UsageEstimator::new(4);
        estimator.report(0.2);
        estimator.report(0.4);
        assert_relative_eq!(estimator.usage(), 30.0, epsilon = 1e-9);

        estimator.report(1.0);
        assert_relative_eq!(estimator.usage(), 30.0, epsilon = 1e-9);
        estimator.report(0.6);
        assert_relative_eq!(estimator.usage(), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn low_frequency_publishes_every_sample() {
        let mut estimator = UsageEstimator::new(1);
        estimator.report(0.25);
        assert_relative_eq!(estimator.usage(), 25.0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut estimator = UsageEstimator::new(2);
        estimator.report(0.9);
        estimator.clear();
        assert_eq!(estimator.usage(), 0.0);
    }
}
