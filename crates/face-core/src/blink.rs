use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::BlinkConfig;

/// Values this close to an endpoint are treated as having reached it,
/// so that repeated float steps land on exactly 0 or 1.
const SNAP_EPSILON: f32 = 1e-4;

/// Idle blink driver.
///
/// A single closedness scalar ramps up once the randomized interval has
/// elapsed and ramps back down otherwise. After a full close there is a
/// chance of an immediate second blink.
#[derive(Debug)]
pub struct BlinkCycle {
    progress: f32,
    interval_ms: f64,
    last_blink_at_ms: f64,
    repeat_pending: bool,
    config: BlinkConfig,
    rng: StdRng,
}

impl BlinkCycle {
    /// Start fully open, with the interval measured from `now_ms`.
    pub fn new(config: BlinkConfig, now_ms: f64) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let interval_ms = random_interval(&config, &mut rng);
        Self {
            progress: 0.0,
            interval_ms,
            last_blink_at_ms: now_ms,
            repeat_pending: false,
            config,
            rng,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn last_blink_at_ms(&self) -> f64 {
        self.last_blink_at_ms
    }

    pub fn repeat_pending(&self) -> bool {
        self.repeat_pending
    }

    /// Advance one frame and return the brightness multiplier.
    pub fn tick(&mut self, now_ms: f64) -> f32 {
        let step = self.config.step;

        if now_ms - self.last_blink_at_ms > self.interval_ms {
            self.progress = snap((self.progress + step).min(1.0));
            if self.progress == 1.0 {
                self.last_blink_at_ms = now_ms;
                if self.rng.gen_bool(self.config.repeat_chance) {
                    self.repeat_pending = true;
                }
                debug!("blink closed (repeat: {})", self.repeat_pending);
            }
        } else if self.progress > 0.0 {
            self.progress = snap((self.progress - step).max(0.0));
            if self.progress == 0.0 {
                self.interval_ms = random_interval(&self.config, &mut self.rng);
                if self.repeat_pending {
                    self.last_blink_at_ms = now_ms - self.interval_ms;
                    self.repeat_pending = false;
                }
            }
        }

        self.brightness()
    }

    pub fn brightness(&self) -> f32 {
        (1.0 - self.progress).max(0.0)
    }
}

fn snap(v: f32) -> f32 {
    if v < SNAP_EPSILON {
        0.0
    } else if v > 1.0 - SNAP_EPSILON {
        1.0
    } else {
        v
    }
}

fn random_interval(config: &BlinkConfig, rng: &mut StdRng) -> f64 {
    if config.jitter_ms <= 0.0 {
        return config.interval_ms;
    }
    rng.gen_range(config.interval_ms - config.jitter_ms..=config.interval_ms + config.jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(repeat_chance: f64) -> BlinkConfig {
        BlinkConfig {
            repeat_chance,
            seed: Some(42),
            ..BlinkConfig::default()
        }
    }

    const FRAME_MS: f64 = 1000.0 / 60.0;

    #[test]
    fn stays_open_until_the_interval_elapses() {
        let mut blink = BlinkCycle::new(config(0.0), 0.0);
        let interval = blink.interval_ms();
        assert!((2000.0..=4000.0).contains(&interval));

        let mut t = 0.0;
        while t + FRAME_MS <= interval {
            t += FRAME_MS;
            assert_eq!(blink.tick(t), 1.0);
        }
        assert_eq!(blink.progress(), 0.0);
    }

    #[test]
    fn closes_in_five_ticks_then_reopens() {
        let mut blink = BlinkCycle::new(config(0.0), 0.0);
        let mut t = blink.interval_ms() + 1.0;

        for i in 1..=5 {
            blink.tick(t);
            t += FRAME_MS;
            if i < 5 {
                assert!(blink.progress() < 1.0);
            }
        }
        assert_eq!(blink.progress(), 1.0);
        assert_eq!(blink.brightness(), 0.0);

        for _ in 0..5 {
            blink.tick(t);
            t += FRAME_MS;
        }
        assert_eq!(blink.progress(), 0.0);
        assert_eq!(blink.brightness(), 1.0);
    }

    #[test]
    fn interval_is_redrawn_on_reopen() {
        let mut blink = BlinkCycle::new(config(0.0), 0.0);
        let mut t = blink.interval_ms() + 1.0;
        let mut intervals = vec![blink.interval_ms()];
        for _ in 0..5 {
            for _ in 0..10 {
                blink.tick(t);
                t += FRAME_MS;
            }
            intervals.push(blink.interval_ms());
            t += 5000.0;
        }
        assert!(intervals.windows(2).any(|w| w[0] != w[1]));
        for i in intervals {
            assert!((2000.0..=4000.0).contains(&i));
        }
    }

    #[test]
    fn pending_repeat_retriggers_immediately() {
        let mut blink = BlinkCycle::new(config(1.0), 0.0);
        let mut t = blink.interval_ms() + 1.0;
        for _ in 0..5 {
            blink.tick(t);
            t += FRAME_MS;
        }
        assert!(blink.repeat_pending());

        for _ in 0..5 {
            blink.tick(t);
            t += FRAME_MS;
        }
        assert_eq!(blink.progress(), 0.0);
        assert!(!blink.repeat_pending());

        blink.tick(t);
        assert!(blink.progress() > 0.0, "second blink should start right away");
    }

    #[test]
    fn zero_jitter_gives_a_fixed_interval() {
        let blink = BlinkCycle::new(
            BlinkConfig {
                jitter_ms: 0.0,
                ..config(0.0)
            },
            0.0,
        );
        assert_eq!(blink.interval_ms(), 3000.0);
    }
}
